// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sprite layer.
//!
//! Rendering a line is two steps. [`collect_line`] walks the linked
//! attribute table and keeps the sprites that touch the line.
//! [`draw_line`] draws that list back to front, so the first sprite in link
//! order ends up on top.
//!
//! Each attribute table entry is 8 bytes:
//!
//! ```text
//! +0  ------yy yyyyyyyy   y position, 128 = top of screen
//! +2  ----wwhh -lllllll   size in cells minus one, link
//! +4  pccvhnnn nnnnnnnn   priority, palette, flips, pattern
//! +6  -------x xxxxxxxx   x position, 128 = left of screen
//! ```

use bitvec::prelude::*;

use super::memory::VideoMemory;
use super::pixel::{ScanlinePixel, TileAttributes, pattern_row};
use super::registers::DisplayConfig;

pub const MAX_SPRITES_PER_LINE: usize = 20;
const MAX_SPRITE_TABLE: usize = 80;
const SPRITE_ENTRY_BYTES: u32 = 8;
const SCREEN_OFFSET: i32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteAttribute {
    pub y: u16,
    pub width_cells: u8,
    pub height_cells: u8,
    pub link: u8,
    pub tile: TileAttributes,
    pub x: u16,
}

impl SpriteAttribute {
    pub fn read(memory: &VideoMemory, table_base: u16, index: usize) -> Self {
        let addr = table_base as u32 + index as u32 * SPRITE_ENTRY_BYTES;
        let y = memory.vram_word(addr) & 0x03FF;
        let size = memory.vram_byte(addr + 2);
        let link = memory.vram_byte(addr + 3) & 0x7F;
        let tile = TileAttributes::decode(memory.vram_word(addr + 4));
        let x = memory.vram_word(addr + 6) & 0x01FF;
        Self {
            y,
            width_cells: ((size >> 2) & 0x03) + 1,
            height_cells: (size & 0x03) + 1,
            link,
            tile,
            x,
        }
    }

    pub fn screen_y(&self) -> i32 {
        self.y as i32 - SCREEN_OFFSET
    }

    pub fn screen_x(&self) -> i32 {
        self.x as i32 - SCREEN_OFFSET
    }

    pub fn covers_line(&self, line: usize) -> bool {
        let top = self.screen_y();
        let line = line as i32;
        line >= top && line < top + self.height_cells as i32 * 8
    }
}

/// A sprite that touches the current line, with its row already chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSprite {
    pub index: usize,
    pub x: i32,
    pub tile: TileAttributes,
    pub width_cells: u8,
    pub height_cells: u8,
    /// Row within the sprite, 0..height*8, before vertical flip.
    pub row: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteLine {
    pub sprites: Vec<LineSprite>,
    /// More than 20 sprites wanted this line.
    pub overflow: bool,
    /// An x=0 sprite cut off the rest of the list.
    pub masked: bool,
}

/// Walks the link chain from entry 0 and gathers the sprites on `line`.
///
/// `previous_line_overflowed` arms x=0 masking even when no other sprite has
/// been seen on this line yet.
pub fn collect_line(
    memory: &VideoMemory,
    cfg: &DisplayConfig,
    line: usize,
    previous_line_overflowed: bool,
) -> SpriteLine {
    let limit = cfg.sprite_limit();
    let mut visited = bitarr![0; MAX_SPRITE_TABLE];
    let mut out = SpriteLine {
        sprites: Vec::with_capacity(MAX_SPRITES_PER_LINE),
        ..SpriteLine::default()
    };
    let mut mask_armed = previous_line_overflowed;
    let mut index = 0usize;
    // Cleared by every exit except a revisited entry or the iteration bound.
    let mut runaway = true;

    for _ in 0..limit {
        if visited[index] {
            log::trace!("sprite link cycle at entry {}", index);
            break;
        }
        visited.set(index, true);

        let sprite = SpriteAttribute::read(memory, cfg.sprite_table_base, index);
        if sprite.covers_line(line) {
            if sprite.x == 0 && mask_armed {
                out.masked = true;
                runaway = false;
                break;
            }
            if sprite.x != 0 {
                mask_armed = true;
            }
            if out.sprites.len() == MAX_SPRITES_PER_LINE {
                out.overflow = true;
                runaway = false;
                break;
            }
            out.sprites.push(LineSprite {
                index,
                x: sprite.screen_x(),
                tile: sprite.tile,
                width_cells: sprite.width_cells,
                height_cells: sprite.height_cells,
                row: (line as i32 - sprite.screen_y()) as u32,
            });
        }

        let link = sprite.link as usize;
        if link == 0 || link >= limit {
            runaway = false;
            break;
        }
        index = link;
    }
    if runaway {
        out.overflow = true;
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawOutcome {
    pub collision: bool,
    /// Pixel budget for the line ran out.
    pub dot_overflow: bool,
}

/// Draws a collected line into `out`. At most `width` sprite pixels are
/// fetched per line, counted in link order.
pub fn draw_line(
    memory: &VideoMemory,
    sprites: &SpriteLine,
    width: usize,
    out: &mut [ScanlinePixel],
) -> DrawOutcome {
    let mut outcome = DrawOutcome::default();

    // Pixels each sprite may draw once the per-line dot budget is applied.
    let mut budget = width;
    let allowed: Vec<usize> = sprites
        .sprites
        .iter()
        .map(|s| {
            let want = s.width_cells as usize * 8;
            let got = want.min(budget);
            if got < want {
                outcome.dot_overflow = true;
            }
            budget -= got;
            got
        })
        .collect();

    let visible = width.min(out.len()) as i32;
    for (sprite, &pixels) in sprites.sprites.iter().zip(allowed.iter()).rev() {
        let height_px = sprite.height_cells as u32 * 8;
        let row = if sprite.tile.vflip { height_px - 1 - sprite.row } else { sprite.row };
        let cell_row = (row / 8) as u16;

        for col in 0..sprite.width_cells as u16 {
            let first_px = col as usize * 8;
            if first_px >= pixels {
                break;
            }
            let tile_col = if sprite.tile.hflip {
                sprite.width_cells as u16 - 1 - col
            } else {
                col
            };
            let pattern = sprite
                .tile
                .pattern
                .wrapping_add(tile_col * sprite.height_cells as u16 + cell_row)
                & 0x07FF;
            let row_pixels = pattern_row(memory, pattern, row & 7, sprite.tile.hflip);

            for (i, &color) in row_pixels.iter().enumerate() {
                if first_px + i >= pixels {
                    break;
                }
                let x = sprite.x + (first_px + i) as i32;
                if color == 0 || x < 0 || x >= visible {
                    continue;
                }
                let slot = &mut out[x as usize];
                if slot.is_opaque() {
                    outcome.collision = true;
                }
                *slot = ScanlinePixel::opaque(color, sprite.tile.palette, sprite.tile.priority);
            }
        }
    }
    outcome
}

/// How a sprite pixel acts on the layers below it in shadow/highlight mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteEffect {
    Shadow,
    Highlight,
}

impl SpriteEffect {
    pub fn of(pixel: &ScanlinePixel, shadow_highlight: bool) -> Option<Self> {
        if !shadow_highlight || pixel.palette != 3 {
            return None;
        }
        match pixel.color_index {
            14 => Some(SpriteEffect::Shadow),
            15 => Some(SpriteEffect::Highlight),
            _ => None,
        }
    }
}
