//! Per-tick player motion and animation selection.
//!
//! `advance` is a pure function of the previous `Player`, the tick's `Controls`
//! snapshot and the constant tables. Every unit is "per fixed tick": speeds are
//! pixels per tick and gravity is pixels per tick squared. Screen y grows
//! downward, so a positive vertical velocity moves the player up.

use hop_core::input::{InputState, Key};
use hop_core::time::FIXED_TICK_US;

use crate::animation::{AnimationSet, ClipId, PlayerAnimation};
use crate::grid::{GridSpec, GRID};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    pub move_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub sprite_width: f32,
    pub sprite_height: f32,
    /// Center y of a sprite standing on the bottom edge of the surface.
    pub resting_y: f32,
}

impl MotionConfig {
    pub const MOVE_SPEED: f32 = 5.0;
    pub const JUMP_SPEED: f32 = 15.0;
    pub const GRAVITY: f32 = 0.9;
    pub const SPRITE_SIZE: f32 = 200.0;

    pub fn for_grid(grid: &GridSpec) -> Self {
        Self {
            move_speed: Self::MOVE_SPEED,
            jump_speed: Self::JUMP_SPEED,
            gravity: Self::GRAVITY,
            sprite_width: Self::SPRITE_SIZE,
            sprite_height: Self::SPRITE_SIZE,
            resting_y: grid.pixel_height() - Self::SPRITE_SIZE * 0.5,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::for_grid(&GRID)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// Horizontal scale sign applied to the sprite quad.
    pub fn scale(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// What the player asked for during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub move_left: bool,
    pub move_right: bool,
    pub jump_pressed: bool,
}

impl Controls {
    pub fn from_input(input: &InputState) -> Self {
        Self {
            move_left: input.is_held(Key::Left),
            move_right: input.is_held(Key::Right),
            jump_pressed: input.is_just_pressed(Key::Up),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub velocity_y: f32,
    pub airborne: bool,
    pub jump_origin_y: f32,
    pub animation: PlayerAnimation,
}

impl Player {
    /// Idle, facing right, centered horizontally on the resting line.
    pub fn spawn(config: &MotionConfig, grid: &GridSpec) -> Self {
        Self {
            x: grid.pixel_width() * 0.5,
            y: config.resting_y,
            facing: Facing::Right,
            velocity_y: 0.0,
            airborne: false,
            jump_origin_y: config.resting_y,
            animation: PlayerAnimation::new(ClipId::Idle),
        }
    }
}

/// Run one fixed tick.
pub fn advance(
    player: &Player,
    controls: Controls,
    config: &MotionConfig,
    animations: &AnimationSet,
) -> Player {
    let mut next = *player;

    if controls.jump_pressed && !next.airborne {
        next.airborne = true;
        next.velocity_y = config.jump_speed;
        next.jump_origin_y = next.y;
        log::debug!("Jump from y={:.1}", next.y);
    }

    // The run clip may only take over from a tick that started on the ground;
    // this is also what leaves a single idle frame on landing. Letting run win
    // in the air instead would restart it at frame 0 on every airborne tick.
    let started_airborne = next.airborne;

    if next.airborne {
        next.animation.switch_to(ClipId::Jump);
        next.y -= next.velocity_y;
        next.velocity_y -= config.gravity;
        if next.y >= config.resting_y {
            next.y = config.resting_y;
            next.airborne = false;
            next.velocity_y = 0.0;
            next.animation.switch_to(ClipId::Idle);
            log::debug!("Landed at x={:.1}", next.x);
        }
    }

    // Left is checked first, so holding both keys moves left.
    let direction = if controls.move_left {
        Some(Facing::Left)
    } else if controls.move_right {
        Some(Facing::Right)
    } else {
        None
    };

    match direction {
        Some(facing) => {
            next.x += facing.scale() * config.move_speed;
            next.facing = facing;
            if !started_airborne {
                next.animation.switch_to(ClipId::Run);
            }
        }
        None => {
            if !next.airborne {
                next.animation.switch_to(ClipId::Idle);
            }
        }
    }

    next.animation.tick(FIXED_TICK_US, animations);
    next
}
