//! CPU-side quad mesh and draw-call batching.
//!
//! The layout (grid lines, blocks, ground) becomes one static `Mesh` that is
//! rebuilt only when the block list changes. Each frame clones it and appends
//! the player quad, then streams the result into the GPU buffers.

use std::sync::Arc;

use hop_render::{SpriteVertex, QUAD_INDICES};

use crate::controller::{MotionConfig, Player};
use crate::grid::RectPrimitive;

/// 1x1 opaque white texture used for flat-colored rectangles.
pub const WHITE_TEXTURE: &str = "__white";

/// A contiguous run of indices that share the same texture binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

pub struct QuadSpec<'a> {
    pub texture_key: &'a str,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    /// Linear RGBA multiplied with the texture sample.
    pub color: [f32; 4],
    pub flip_x: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl Mesh {
    pub fn with_quad_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
            draw_calls: Vec::with_capacity(8),
        }
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn add_quad(&mut self, spec: QuadSpec<'_>) {
        let half_w = spec.width * 0.5;
        let half_h = spec.height * 0.5;
        let (left, top) = (spec.center_x - half_w, spec.center_y - half_h);
        let (right, bottom) = (spec.center_x + half_w, spec.center_y + half_h);
        let (u0, u1) = if spec.flip_x { (1.0, 0.0) } else { (0.0, 1.0) };

        // y grows downward: the top edge samples v = 0.
        let base_index = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&[
            SpriteVertex {
                position: [left, top],
                tex_coords: [u0, 0.0],
                color: spec.color,
            },
            SpriteVertex {
                position: [right, top],
                tex_coords: [u1, 0.0],
                color: spec.color,
            },
            SpriteVertex {
                position: [right, bottom],
                tex_coords: [u1, 1.0],
                color: spec.color,
            },
            SpriteVertex {
                position: [left, bottom],
                tex_coords: [u0, 1.0],
                color: spec.color,
            },
        ]);

        let draw_start = self.indices.len() as u32;
        self.indices
            .extend(QUAD_INDICES.iter().map(|&index| base_index + index));

        push_draw_call(
            &mut self.draw_calls,
            Arc::from(spec.texture_key),
            draw_start,
            QUAD_INDICES.len() as u32,
        );
    }
}

/// Append a draw call, merging with the previous one when the texture matches
/// and indices are contiguous.
pub fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture_key: Arc<str>,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if *last.texture_key == *texture_key && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture_key,
        index_start,
        index_count,
    });
}

pub fn count_texture_binds(draw_calls: &[DrawCall]) -> usize {
    let mut binds = 0usize;
    let mut current: Option<&str> = None;
    for draw in draw_calls {
        let key: &str = &draw.texture_key;
        if current != Some(key) {
            current = Some(key);
            binds += 1;
        }
    }
    binds
}

pub fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert an authored sRGB color for the sRGB render target. Alpha is linear.
pub fn linear_color(srgb: [f32; 4]) -> [f32; 4] {
    [
        srgb_to_linear(srgb[0]),
        srgb_to_linear(srgb[1]),
        srgb_to_linear(srgb[2]),
        srgb[3],
    ]
}

pub fn build_layout_mesh(prims: &[RectPrimitive]) -> Mesh {
    let mut mesh = Mesh::with_quad_capacity(prims.len() + 1);
    for rect in prims {
        mesh.add_quad(QuadSpec {
            texture_key: WHITE_TEXTURE,
            center_x: rect.x + rect.width * 0.5,
            center_y: rect.y + rect.height * 0.5,
            width: rect.width,
            height: rect.height,
            color: linear_color(rect.color),
            flip_x: false,
        });
    }
    mesh
}

/// The player sprite, centered on its position and mirrored when facing left.
pub fn add_player_quad(
    mesh: &mut Mesh,
    player: &Player,
    config: &MotionConfig,
    texture_key: &str,
) {
    mesh.add_quad(QuadSpec {
        texture_key,
        center_x: player.x,
        center_y: player.y,
        width: config.sprite_width,
        height: config.sprite_height,
        color: [1.0, 1.0, 1.0, 1.0],
        flip_x: player.facing.scale() < 0.0,
    });
}
