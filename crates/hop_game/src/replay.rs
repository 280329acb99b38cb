use crate::controller::Controls;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    pub frames: Vec<ReplayFrame>,
}

/// Keys held for `repeat` consecutive ticks. `jump` is a key-down edge and
/// only applies to the first of those ticks.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_controls(&self) -> Vec<Controls> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for tick in 0..frame.repeat.max(1) {
                out.push(Controls {
                    move_left: frame.left,
                    move_right: frame.right,
                    jump_pressed: frame.jump && tick == 0,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationSet, ClipId, CLIP_SPECS};
    use crate::controller::{advance, MotionConfig, Player};
    use crate::grid::GRID;
    use hop_core::time::FIXED_TICK_US;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "hop_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn play(controls: &[Controls]) -> Player {
        let config = MotionConfig::default();
        let animations =
            AnimationSet::from_specs(&CLIP_SPECS, FIXED_TICK_US).expect("standard clips");
        let mut player = Player::spawn(&config, &GRID);
        for c in controls {
            player = advance(&player, *c, &config, &animations);
        }
        player
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 3 },
                { "jump": true, "repeat": 2 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_controls();
        assert_eq!(expanded.len(), 5);
        assert!(expanded[0].move_right);
        assert!(expanded[3].jump_pressed);
        assert!(!expanded[4].jump_pressed, "jump is an edge, not a hold");

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = temp_file_path("deterministic");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 60 },
                { "right": true, "jump": true, "repeat": 1 },
                { "right": true, "repeat": 50 },
                { "left": true, "repeat": 45 },
                { "repeat": 10 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_controls();

        let run_a = play(&inputs);
        let run_b = play(&inputs);
        assert_eq!(run_a, run_b);

        // 111 ticks right, 45 ticks left.
        assert_eq!(run_a.x, 400.0 + 5.0 * 111.0 - 5.0 * 45.0);
        assert_eq!(run_a.y, 500.0);
        assert!(!run_a.airborne);
        assert_eq!(run_a.animation.clip, ClipId::Idle);

        let _ = fs::remove_file(path);
    }
}
