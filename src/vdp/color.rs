// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! 12-bit colour to `0x00RRGGBB` conversion.
//!
//! All three intensity variants are tabulated for the whole 4,096-value
//! space up front, so resolving a pixel is one CRAM read and one lookup.

use super::memory::VideoMemory;
use super::pixel::ScanlinePixel;

pub const COLOR_SPACE: usize = 4096;

#[derive(Debug, Clone)]
pub struct ColorTables {
    normal: Vec<u32>,
    shadow: Vec<u32>,
    highlight: Vec<u32>,
}

impl ColorTables {
    pub fn new() -> Self {
        let mut normal = Vec::with_capacity(COLOR_SPACE);
        let mut shadow = Vec::with_capacity(COLOR_SPACE);
        let mut highlight = Vec::with_capacity(COLOR_SPACE);
        for color in 0..COLOR_SPACE as u16 {
            normal.push(pack(color, |c| c));
            shadow.push(pack(color, |c| c >> 1));
            highlight.push(pack(color, |c| (c as u16 + (c as u16 >> 2)).min(255) as u8));
        }
        Self {
            normal,
            shadow,
            highlight,
        }
    }

    pub fn normal(&self, color: u16) -> u32 {
        self.normal[color as usize & (COLOR_SPACE - 1)]
    }

    pub fn shadow(&self, color: u16) -> u32 {
        self.shadow[color as usize & (COLOR_SPACE - 1)]
    }

    pub fn highlight(&self, color: u16) -> u32 {
        self.highlight[color as usize & (COLOR_SPACE - 1)]
    }

    pub fn pixel_to_color(&self, pixel: &ScanlinePixel, memory: &VideoMemory) -> u32 {
        let color = memory.cram(pixel.cram_index());
        if pixel.shadow {
            self.shadow(color)
        } else if pixel.highlight {
            self.highlight(color)
        } else {
            self.normal(color)
        }
    }
}

impl Default for ColorTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands each 4-bit channel of `0x0RGB` to 8 bits, then applies `f`.
fn pack(color: u16, f: impl Fn(u8) -> u8) -> u32 {
    let expand = |nibble: u16| {
        let c = (nibble & 0x0F) as u8;
        f((c << 4) | c) as u32
    };
    (expand(color >> 8) << 16) | (expand(color >> 4) << 8) | expand(color)
}
