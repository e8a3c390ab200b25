// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Intermediate per-layer pixels and the tile data shared by all layers.

use super::memory::VideoMemory;

/// Widest line the chip produces (H40).
pub const MAX_LINE_WIDTH: usize = 320;

pub const TILE_BYTES: u32 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanlinePixel {
    /// 0 is transparent.
    pub color_index: u8,
    pub palette: u8,
    pub priority: bool,
    pub shadow: bool,
    pub highlight: bool,
}

impl ScanlinePixel {
    pub const TRANSPARENT: Self = Self {
        color_index: 0,
        palette: 0,
        priority: false,
        shadow: false,
        highlight: false,
    };

    pub fn opaque(color_index: u8, palette: u8, priority: bool) -> Self {
        Self {
            color_index: color_index & 0x0F,
            palette: palette & 0x03,
            priority,
            shadow: false,
            highlight: false,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.color_index != 0
    }

    pub fn cram_index(&self) -> usize {
        (self.palette as usize) * 16 + self.color_index as usize
    }
}

pub type LineBuffer = [ScanlinePixel; MAX_LINE_WIDTH];

pub fn blank_line() -> LineBuffer {
    [ScanlinePixel::TRANSPARENT; MAX_LINE_WIDTH]
}

/// Name table and sprite attribute words share this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAttributes {
    pub pattern: u16,
    pub hflip: bool,
    pub vflip: bool,
    pub palette: u8,
    pub priority: bool,
}

impl TileAttributes {
    pub fn decode(word: u16) -> Self {
        Self {
            pattern: word & 0x07FF,
            hflip: word & 0x0800 != 0,
            vflip: word & 0x1000 != 0,
            palette: ((word >> 13) & 0x03) as u8,
            priority: word & 0x8000 != 0,
        }
    }
}

/// Unpacks one 8-pixel row of `pattern`. High nibble is the left pixel.
pub fn pattern_row(memory: &VideoMemory, pattern: u16, row: u32, hflip: bool) -> [u8; 8] {
    let addr = (pattern as u32 & 0x07FF) * TILE_BYTES + (row & 7) * 4;
    let mut out = [0u8; 8];
    for i in 0..4u32 {
        let byte = memory.vram_byte(addr + i);
        out[i as usize * 2] = byte >> 4;
        out[i as usize * 2 + 1] = byte & 0x0F;
    }
    if hflip {
        out.reverse();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_word_layout() {
        let attr = TileAttributes::decode(0xF9FF);
        assert_eq!(
            attr,
            TileAttributes {
                pattern: 0x1FF,
                hflip: true,
                vflip: true,
                palette: 3,
                priority: true
            }
        );
        let plain = TileAttributes::decode(0x2005);
        assert_eq!(plain.palette, 1);
        assert!(!plain.priority && !plain.hflip && !plain.vflip);
    }

    #[test]
    fn pattern_row_nibble_order_and_flip() {
        let mut mem = VideoMemory::new();
        let base = 3 * TILE_BYTES + 2 * 4;
        for (i, b) in [0x12u8, 0x34, 0x56, 0x78].iter().enumerate() {
            mem.set_vram_byte(base + i as u32, *b);
        }
        assert_eq!(pattern_row(&mem, 3, 2, false), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(pattern_row(&mem, 3, 2, true), [8, 7, 6, 5, 4, 3, 2, 1]);
    }
}
