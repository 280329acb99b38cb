//! Background grid and static block geometry.
//!
//! Everything here works in surface pixels with the origin at the top-left and
//! y growing downward. Layout data is authored in grid units and mapped with
//! `pixel = grid_value * cell_size`.
//!
//! `build_layout_primitives` is the whole "draw the level" step: it returns a
//! fresh list every call, so a layout change replaces the previous geometry
//! instead of stacking on top of it.

use crate::layout::Block;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub cell_size: f32,
    pub width_cells: u32,
    pub height_cells: u32,
}

pub const GRID: GridSpec = GridSpec {
    cell_size: 100.0,
    width_cells: 8,
    height_cells: 6,
};

pub const GRID_LINE_WIDTH: f32 = 1.0;
/// `0xaaaaaa` at half opacity.
pub const GRID_LINE_COLOR: [f32; 4] = [170.0 / 255.0, 170.0 / 255.0, 170.0 / 255.0, 0.5];
/// `#00ff00`
pub const GROUND_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
pub const GROUND_HEIGHT_CELLS: u32 = 1;

impl GridSpec {
    pub fn to_pixels(&self, grid_value: f32) -> f32 {
        grid_value * self.cell_size
    }

    pub fn pixel_width(&self) -> f32 {
        self.width_cells as f32 * self.cell_size
    }

    pub fn pixel_height(&self) -> f32 {
        self.height_cells as f32 * self.cell_size
    }

    /// Size of the drawing surface in whole pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            self.pixel_width().round() as u32,
            self.pixel_height().round() as u32,
        )
    }

    /// Row index of the top of the ground strip.
    pub fn ground_row(&self) -> u32 {
        self.height_cells.saturating_sub(GROUND_HEIGHT_CELLS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectKind {
    GridLine,
    Block,
    Ground,
}

/// Axis-aligned filled rectangle in surface pixels. `color` is sRGB as authored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub kind: RectKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 4],
}

fn block_rect(grid: &GridSpec, kind: RectKind, block: &Block) -> RectPrimitive {
    RectPrimitive {
        kind,
        x: grid.to_pixels(block.x),
        y: grid.to_pixels(block.y),
        width: grid.to_pixels(block.width),
        height: grid.to_pixels(block.height),
        color: block.color,
    }
}

/// One one-cell block per column along the bottom row.
pub fn ground_blocks(grid: &GridSpec) -> Vec<Block> {
    let row = grid.ground_row() as f32;
    (0..grid.width_cells)
        .map(|column| Block {
            x: column as f32,
            y: row,
            width: 1.0,
            height: GROUND_HEIGHT_CELLS as f32,
            color: GROUND_COLOR,
        })
        .collect()
}

/// Grid lines first, then the layout blocks in authored order, then the ground.
pub fn build_layout_primitives(grid: &GridSpec, blocks: &[Block]) -> Vec<RectPrimitive> {
    let line_count = (grid.width_cells + 1 + grid.height_cells + 1) as usize;
    let mut prims = Vec::with_capacity(line_count + blocks.len() + grid.width_cells as usize);
    let half_line = GRID_LINE_WIDTH * 0.5;

    for column in 0..=grid.width_cells {
        prims.push(RectPrimitive {
            kind: RectKind::GridLine,
            x: grid.to_pixels(column as f32) - half_line,
            y: 0.0,
            width: GRID_LINE_WIDTH,
            height: grid.pixel_height(),
            color: GRID_LINE_COLOR,
        });
    }
    for row in 0..=grid.height_cells {
        prims.push(RectPrimitive {
            kind: RectKind::GridLine,
            x: 0.0,
            y: grid.to_pixels(row as f32) - half_line,
            width: grid.pixel_width(),
            height: GRID_LINE_WIDTH,
            color: GRID_LINE_COLOR,
        });
    }

    prims.extend(
        blocks
            .iter()
            .map(|block| block_rect(grid, RectKind::Block, block)),
    );
    prims.extend(
        ground_blocks(grid)
            .iter()
            .map(|block| block_rect(grid, RectKind::Ground, block)),
    );

    prims
}
