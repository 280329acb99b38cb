//! Frame-based sprite animation types and deterministic tick logic.
//!
//! Animation clips are sequences of texture frames with per-frame durations.
//! All timing uses integer microseconds (`u64`) so advancement is identical on
//! every platform under the fixed-timestep model -- no floating-point drift.
//!
//! Clips are usually authored as a playback speed in frames per tick (0.3 means
//! "move 0.3 of a frame every simulation tick"). `frame_duration_us` converts
//! that speed into a per-frame duration once, at construction time.

/// A single frame in an animation clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub texture_key: String,
    pub duration_us: u64,
}

/// An ordered sequence of frames that can loop or play once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    pub looping: bool,
}

impl AnimationClip {
    /// Build a clip whose frames all share one duration.
    pub fn uniform<I>(texture_keys: I, frame_duration_us: u64, looping: bool) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            frames: texture_keys
                .into_iter()
                .map(|texture_key| AnimationFrame {
                    texture_key,
                    duration_us: frame_duration_us,
                })
                .collect(),
            looping,
        }
    }

    /// Total duration of one full cycle in microseconds.
    pub fn total_duration_us(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_us).sum()
    }

    pub fn validate(&self, name: &str) -> Result<(), String> {
        if self.frames.is_empty() {
            return Err(format!(
                "Animation validation failed: clip '{}' has no frames",
                name
            ));
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.texture_key.is_empty() {
                return Err(format!(
                    "Animation validation failed: clip '{}' frame {} has empty texture_key",
                    name, i
                ));
            }
            if frame.duration_us == 0 {
                return Err(format!(
                    "Animation validation failed: clip '{}' frame {} has zero duration",
                    name, i
                ));
            }
        }
        Ok(())
    }
}

/// Convert a playback speed in frames per tick into a per-frame duration.
pub fn frame_duration_us(frames_per_tick: f32, tick_us: u64) -> Result<u64, String> {
    if !frames_per_tick.is_finite() || frames_per_tick <= 0.0 {
        return Err(format!(
            "Animation speed must be a positive number of frames per tick, got {}",
            frames_per_tick
        ));
    }
    let duration = (tick_us as f64 / frames_per_tick as f64).round() as u64;
    Ok(duration.max(1))
}

/// Runtime playback position inside one clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationState {
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub finished: bool,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to frame 0.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// Texture key of the frame currently on screen.
    pub fn current_key<'a>(&self, clip: &'a AnimationClip) -> &'a str {
        if let Some(frame) = clip.frames.get(self.frame_index) {
            &frame.texture_key
        } else if let Some(frame) = clip.frames.last() {
            &frame.texture_key
        } else {
            ""
        }
    }

    /// Advance the animation by `dt_us` microseconds. Returns the current
    /// frame's texture key. Integer arithmetic only.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> &'a str {
        if clip.frames.is_empty() || self.finished {
            return self.current_key(clip);
        }

        self.elapsed_us += dt_us;

        loop {
            let current_frame = &clip.frames[self.frame_index];
            if self.elapsed_us < current_frame.duration_us {
                break;
            }

            self.elapsed_us -= current_frame.duration_us;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                if clip.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        &clip.frames[self.frame_index].texture_key
    }
}
