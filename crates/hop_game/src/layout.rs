//! Block layout loading.
//!
//! The layout is a small JSON document listing colored rectangles in grid
//! units. It is read on a worker thread (`LayoutLoader`) so the first frames
//! render immediately with an empty layout, and the file is polled for
//! modification (`LayoutWatcher`) so edits show up without a restart.
//!
//! A failed load is never fatal: `LayoutState` logs it and keeps whatever
//! blocks it already had, which on startup means none. A single malformed
//! block is skipped with a warning and does not fail the load.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::SystemTime;

/// A validated, immutable rectangle in grid units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// sRGB, alpha always 1.0.
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutFile {
    pub blocks: Vec<Block>,
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct LayoutFileJson {
    #[serde(default)]
    blocks: Vec<BlockJson>,
}

#[derive(Debug, Deserialize)]
struct BlockJson {
    color: String,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// Parse `#rrggbb` into sRGB components.
pub fn parse_hex_color(text: &str) -> Result<[f32; 4], String> {
    let hex = text
        .strip_prefix('#')
        .ok_or_else(|| format!("color '{}' must start with '#'", text))?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("color '{}' is not of the form #rrggbb", text));
    }
    let value = u32::from_str_radix(hex, 16)
        .map_err(|e| format!("color '{}' is not valid hex: {e}", text))?;
    let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
    Ok([channel(16), channel(8), channel(0), 1.0])
}

/// Only an unreadable document is an error. Invalid blocks are dropped and
/// the rest keep their authored order.
pub fn parse_layout(raw: &str) -> Result<LayoutFile, String> {
    let json: LayoutFileJson =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse layout JSON: {e}"))?;

    let mut blocks = Vec::with_capacity(json.blocks.len());
    for (i, block) in json.blocks.into_iter().enumerate() {
        match validate_block(i, block) {
            Ok(block) => blocks.push(block),
            Err(err) => log::warn!("{err}; skipping block {i}"),
        }
    }
    Ok(LayoutFile { blocks })
}

fn validate_block(index: usize, block: BlockJson) -> Result<Block, String> {
    let coords = [block.x, block.y, block.width, block.height];
    if coords.iter().any(|v| !v.is_finite()) {
        return Err(format!(
            "Layout validation failed: block {} has a non-finite coordinate",
            index
        ));
    }
    if block.width <= 0.0 || block.height <= 0.0 {
        return Err(format!(
            "Layout validation failed: block {} has non-positive size {}x{}",
            index, block.width, block.height
        ));
    }
    let color = parse_hex_color(&block.color)
        .map_err(|e| format!("Layout validation failed: block {}: {e}", index))?;

    Ok(Block {
        x: block.x,
        y: block.y,
        width: block.width,
        height: block.height,
        color,
    })
}

pub fn load_layout_from_path(path: &Path) -> Result<LayoutFile, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read layout file {}: {e}", path.display()))?;
    parse_layout(&raw).map_err(|e| format!("{} ({})", e, path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Loading,
    Loaded,
    Failed,
}

impl LayoutStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        }
    }
}

/// The accepted block list and where the latest load stands.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutState {
    blocks: Vec<Block>,
    status: LayoutStatus,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutState {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            status: LayoutStatus::Loading,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn status(&self) -> LayoutStatus {
        self.status
    }

    pub fn begin_load(&mut self) {
        self.status = LayoutStatus::Loading;
    }

    /// Apply a finished load. Returns `true` when the block list was replaced
    /// and the layout mesh needs rebuilding. A failure keeps the old blocks.
    pub fn accept(&mut self, result: Result<LayoutFile, String>) -> bool {
        match result {
            Ok(layout) => {
                log::info!("Layout loaded: {} blocks", layout.blocks.len());
                if layout.blocks.is_empty() {
                    log::info!("No blocks to display");
                }
                self.blocks = layout.blocks;
                self.status = LayoutStatus::Loaded;
                true
            }
            Err(err) => {
                log::error!("Layout load failed: {err}");
                self.status = LayoutStatus::Failed;
                false
            }
        }
    }
}

/// One in-flight load running on its own thread.
pub struct LayoutLoader {
    path: PathBuf,
    receiver: Receiver<Result<LayoutFile, String>>,
}

impl LayoutLoader {
    pub fn spawn(path: PathBuf) -> Result<Self, String> {
        let (tx, rx) = mpsc::channel();
        let worker_path = path.clone();
        thread::Builder::new()
            .name("layout-loader".to_string())
            .spawn(move || {
                let result = load_layout_from_path(&worker_path);
                // The receiver is gone if the engine shut down mid-load.
                let _ = tx.send(result);
            })
            .map_err(|e| format!("Failed to start layout loader thread: {e}"))?;
        log::debug!("Layout load started: {}", path.display());
        Ok(Self { path, receiver: rx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking. Returns the result once; drop the loader afterwards.
    pub fn poll(&self) -> Option<Result<LayoutFile, String>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(format!(
                "Layout loader for {} exited without a result",
                self.path.display()
            ))),
        }
    }
}

pub struct LayoutWatcher {
    layout_path: PathBuf,
    last_seen_modified: Option<SystemTime>,
}

impl LayoutWatcher {
    pub fn new(layout_path: PathBuf) -> Self {
        let last_seen_modified = modified_time(&layout_path);
        Self {
            layout_path,
            last_seen_modified,
        }
    }

    pub fn should_reload(&mut self) -> bool {
        let current = modified_time(&self.layout_path);
        match (self.last_seen_modified, current) {
            (Some(old), Some(now)) if now > old => {
                self.last_seen_modified = Some(now);
                true
            }
            (None, Some(now)) => {
                self.last_seen_modified = Some(now);
                true
            }
            _ => false,
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "hop_layout_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn wait_for(loader: &LayoutLoader) -> Result<LayoutFile, String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = loader.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "layout loader timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn parses_single_red_block() {
        let layout = parse_layout(
            r##"{ "blocks": [{ "color": "#ff0000", "x": 2, "y": 3, "width": 1, "height": 1 }] }"##,
        )
        .expect("valid layout");
        assert_eq!(
            layout.blocks,
            vec![Block {
                x: 2.0,
                y: 3.0,
                width: 1.0,
                height: 1.0,
                color: [1.0, 0.0, 0.0, 1.0],
            }]
        );
    }

    #[test]
    fn missing_blocks_key_is_empty_layout() {
        let layout = parse_layout("{}").expect("empty object is a valid layout");
        assert!(layout.blocks.is_empty());
    }

    #[test]
    fn preserves_authored_order() {
        let layout = parse_layout(
            r##"{ "blocks": [
                { "color": "#0000ff", "x": 0, "y": 0, "width": 1, "height": 1 },
                { "color": "#00ff00", "x": 5, "y": 1, "width": 2, "height": 1 }
            ] }"##,
        )
        .expect("valid layout");
        assert_eq!(layout.blocks.len(), 2);
        assert_eq!(layout.blocks[0].color, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(layout.blocks[1].x, 5.0);
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!(parse_hex_color("#ffffff").expect("white"), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(parse_hex_color("#00FF00").expect("green"), [0.0, 1.0, 0.0, 1.0]);
        let gray = parse_hex_color("#808080").expect("gray");
        assert!((gray[0] - 128.0 / 255.0).abs() < 1e-6);

        assert!(parse_hex_color("ff0000").is_err());
        assert!(parse_hex_color("#ff00").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("#+f0000").is_err());
    }

    fn block_json(color: &str, width: f32) -> BlockJson {
        BlockJson {
            color: color.to_string(),
            x: 0.0,
            y: 0.0,
            width,
            height: 1.0,
        }
    }

    fn red_block() -> Block {
        Block {
            x: 2.0,
            y: 3.0,
            width: 1.0,
            height: 1.0,
            color: [1.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn rejects_bad_color() {
        let err = validate_block(0, block_json("red", 1.0))
            .expect_err("named colors are not accepted");
        assert!(err.contains("block 0"));
        assert!(err.contains("must start with '#'"));
    }

    #[test]
    fn rejects_non_positive_size() {
        let err = validate_block(4, block_json("#ffffff", 0.0))
            .expect_err("zero width should fail");
        assert!(err.contains("block 4"));
        assert!(err.contains("non-positive size"));
    }

    #[test]
    fn invalid_blocks_are_skipped_and_valid_ones_kept() {
        let layout = parse_layout(
            r##"{ "blocks": [
                { "color": "#ff0000", "x": 2, "y": 3, "width": 1, "height": 1 },
                { "color": "#ff00", "x": 4, "y": 1, "width": 1, "height": 1 },
                { "color": "#00ff00", "x": 1, "y": 1, "width": -1, "height": 1 }
            ] }"##,
        )
        .expect("bad blocks do not fail the whole layout");
        assert_eq!(layout.blocks, vec![red_block()]);
    }

    #[test]
    fn initial_failure_leaves_no_blocks() {
        let mut state = LayoutState::new();
        assert_eq!(state.status(), LayoutStatus::Loading);

        let changed = state.accept(Err("Failed to read layout file".to_string()));
        assert!(!changed);
        assert_eq!(state.status(), LayoutStatus::Failed);
        assert!(state.blocks().is_empty());
    }

    #[test]
    fn successful_load_replaces_blocks() {
        let mut state = LayoutState::new();
        let changed = state.accept(Ok(LayoutFile {
            blocks: vec![red_block()],
        }));
        assert!(changed);
        assert_eq!(state.status(), LayoutStatus::Loaded);
        assert_eq!(state.blocks(), &[red_block()]);
    }

    #[test]
    fn reload_failure_keeps_accepted_blocks() {
        let mut state = LayoutState::new();
        state.accept(Ok(LayoutFile {
            blocks: vec![red_block()],
        }));

        state.begin_load();
        assert_eq!(state.status(), LayoutStatus::Loading);
        assert_eq!(state.blocks().len(), 1, "blocks stay visible while reloading");

        let changed = state.accept(Err("Failed to parse layout JSON".to_string()));
        assert!(!changed, "a failed reload must not trigger a mesh rebuild");
        assert_eq!(state.status(), LayoutStatus::Failed);
        assert_eq!(state.blocks(), &[red_block()]);
    }

    #[test]
    fn reload_success_replaces_previous_blocks() {
        let mut state = LayoutState::new();
        state.accept(Ok(LayoutFile {
            blocks: vec![red_block()],
        }));

        let blue = Block {
            color: [0.0, 0.0, 1.0, 1.0],
            ..red_block()
        };
        state.begin_load();
        let changed = state.accept(Ok(LayoutFile {
            blocks: vec![blue, blue],
        }));
        assert!(changed);
        assert_eq!(state.status(), LayoutStatus::Loaded);
        assert_eq!(state.blocks(), &[blue, blue]);
    }

    #[test]
    fn rejects_missing_field() {
        let err = parse_layout(r##"{ "blocks": [{ "color": "#ffffff", "x": 0, "y": 0 }] }"##)
            .expect_err("missing width should fail");
        assert!(err.contains("Failed to parse layout JSON"));
    }

    #[test]
    fn load_from_missing_path_reports_read_error() {
        let path = temp_file_path("missing");
        let _ = fs::remove_file(&path);
        let err = load_layout_from_path(&path).expect_err("missing file should fail");
        assert!(err.contains("Failed to read layout file"));
    }

    #[test]
    fn loader_delivers_layout_from_worker_thread() {
        let path = temp_file_path("loader_ok");
        fs::write(
            &path,
            r##"{ "blocks": [{ "color": "#ff0000", "x": 2, "y": 3, "width": 1, "height": 1 }] }"##,
        )
        .expect("write layout");

        let loader = LayoutLoader::spawn(path.clone()).expect("spawn loader");
        let layout = wait_for(&loader).expect("layout should load");
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(loader.path(), path.as_path());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn loader_delivers_errors_instead_of_panicking() {
        let path = temp_file_path("loader_err");
        fs::write(&path, "{ not json").expect("write layout");

        let loader = LayoutLoader::spawn(path.clone()).expect("spawn loader");
        let err = wait_for(&loader).expect_err("malformed JSON should fail");
        assert!(err.contains("Failed to parse layout JSON"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn watcher_detects_newly_created_file() {
        let path = temp_file_path("watcher_create");
        let _ = fs::remove_file(&path);

        let mut watcher = LayoutWatcher::new(path.clone());
        assert!(!watcher.should_reload(), "missing file should not reload");

        fs::write(&path, r#"{ "blocks": [] }"#).expect("write layout");
        assert!(
            watcher.should_reload(),
            "creating file should trigger reload once"
        );
        assert!(
            !watcher.should_reload(),
            "without changes, second poll should not reload"
        );

        let _ = fs::remove_file(path);
    }
}
