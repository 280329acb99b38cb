//! The player's three animation clips and clip switching.
//!
//! Clips are identified by `ClipId`, and "is this clip already playing" is a
//! plain id comparison. Switching to the active clip does nothing, so callers
//! can request a clip every tick without restarting it.

use hop_core::animation::{frame_duration_us, AnimationClip, AnimationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipId {
    Idle,
    Run,
    Jump,
}

impl ClipId {
    pub const ALL: [ClipId; 3] = [ClipId::Idle, ClipId::Run, ClipId::Jump];

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
        }
    }

    /// Base color for generated stand-in frames when the PNGs are missing.
    pub fn placeholder_tint(self) -> [u8; 3] {
        match self {
            Self::Idle => [90, 140, 230],
            Self::Run => [240, 150, 40],
            Self::Jump => [170, 80, 220],
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Run => 1,
            Self::Jump => 2,
        }
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClipSpec {
    pub id: ClipId,
    /// Frame textures are named `{prefix}1` .. `{prefix}{frame_count}`.
    pub texture_prefix: &'static str,
    pub frame_count: usize,
    pub frames_per_tick: f32,
}

pub const CLIP_SPECS: [ClipSpec; 3] = [
    ClipSpec {
        id: ClipId::Idle,
        texture_prefix: "Idle",
        frame_count: 10,
        frames_per_tick: 0.3,
    },
    ClipSpec {
        id: ClipId::Run,
        texture_prefix: "Run",
        frame_count: 8,
        frames_per_tick: 0.3,
    },
    ClipSpec {
        id: ClipId::Jump,
        texture_prefix: "Jump",
        frame_count: 12,
        frames_per_tick: 0.2,
    },
];

#[derive(Debug, Clone)]
pub struct AnimationSet {
    clips: [AnimationClip; 3],
}

impl AnimationSet {
    /// Build one looping clip per spec. `specs` must name each `ClipId` once.
    pub fn from_specs(specs: &[ClipSpec; 3], tick_us: u64) -> Result<Self, String> {
        let mut clips: [Option<AnimationClip>; 3] = [None, None, None];
        for spec in specs {
            let duration = frame_duration_us(spec.frames_per_tick, tick_us)
                .map_err(|e| format!("Clip '{}': {e}", spec.id))?;
            let keys = (1..=spec.frame_count).map(|i| format!("{}{}", spec.texture_prefix, i));
            let clip = AnimationClip::uniform(keys, duration, true);
            clip.validate(spec.id.label())?;

            let slot = &mut clips[spec.id.index()];
            if slot.is_some() {
                return Err(format!("Clip '{}' is defined more than once", spec.id));
            }
            *slot = Some(clip);
        }

        let [Some(idle), Some(run), Some(jump)] = clips else {
            return Err("Animation set must define idle, run and jump clips".to_string());
        };
        Ok(Self {
            clips: [idle, run, jump],
        })
    }

    pub fn clip(&self, id: ClipId) -> &AnimationClip {
        &self.clips[id.index()]
    }

    /// Every frame texture key with the clip and frame index it belongs to.
    pub fn texture_keys(&self) -> impl Iterator<Item = (ClipId, usize, &str)> + '_ {
        ClipId::ALL.into_iter().flat_map(move |id| {
            self.clip(id)
                .frames
                .iter()
                .enumerate()
                .map(move |(i, frame)| (id, i, frame.texture_key.as_str()))
        })
    }
}

/// Which clip the player sprite shows and where playback is inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerAnimation {
    pub clip: ClipId,
    pub state: AnimationState,
}

impl PlayerAnimation {
    pub fn new(clip: ClipId) -> Self {
        Self {
            clip,
            state: AnimationState::new(),
        }
    }

    /// Activate `clip` from frame 0 unless it is already active.
    /// Returns whether a switch happened.
    pub fn switch_to(&mut self, clip: ClipId) -> bool {
        if self.clip == clip {
            return false;
        }
        log::debug!("Switching to {} animation", clip);
        self.clip = clip;
        self.state.restart();
        true
    }

    pub fn tick<'a>(&mut self, dt_us: u64, set: &'a AnimationSet) -> &'a str {
        self.state.tick(dt_us, set.clip(self.clip))
    }

    pub fn texture_key<'a>(&self, set: &'a AnimationSet) -> &'a str {
        self.state.current_key(set.clip(self.clip))
    }
}
