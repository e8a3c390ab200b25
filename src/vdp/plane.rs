// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Scrolling tile planes A and B, and the fixed window plane.

use super::memory::VideoMemory;
use super::pixel::{ScanlinePixel, TileAttributes, pattern_row};
use super::registers::{DisplayConfig, HScrollMode, VScrollMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    A,
    B,
}

impl Plane {
    fn name_table(self, cfg: &DisplayConfig) -> u32 {
        match self {
            Plane::A => cfg.plane_a_base as u32,
            Plane::B => cfg.plane_b_base as u32,
        }
    }

    /// Offset of this plane's value inside a scroll table pair.
    fn scroll_slot(self) -> u32 {
        match self {
            Plane::A => 0,
            Plane::B => 1,
        }
    }
}

/// Screen area covered by the window plane, from registers 17 and 18.
///
/// A point belongs to the window when it lies in the vertical band or in the
/// horizontal band. With both positions at zero and both bits clear the
/// window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRegion {
    right: bool,
    split_x: usize,
    down: bool,
    split_y: usize,
}

impl WindowRegion {
    pub fn from_config(cfg: &DisplayConfig) -> Self {
        Self {
            right: cfg.window_right,
            split_x: cfg.window_h_cells as usize * 16,
            down: cfg.window_down,
            split_y: cfg.window_v_cells as usize * 8,
        }
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        let in_v = if self.down { y >= self.split_y } else { y < self.split_y };
        let in_h = if self.right { x >= self.split_x } else { x < self.split_x };
        in_v || in_h
    }
}

/// Decoded tile row kept while consecutive pixels hit the same cell.
struct RowCache {
    key: Option<(u32, u32)>,
    attr: TileAttributes,
    pixels: [u8; 8],
}

impl RowCache {
    fn new() -> Self {
        Self {
            key: None,
            attr: TileAttributes::decode(0),
            pixels: [0; 8],
        }
    }

    fn fetch(&mut self, memory: &VideoMemory, entry_addr: u32, fine_y: u32) -> (&TileAttributes, &[u8; 8]) {
        if self.key != Some((entry_addr, fine_y)) {
            let attr = TileAttributes::decode(memory.vram_word(entry_addr));
            let row = if attr.vflip { 7 - fine_y } else { fine_y };
            self.pixels = pattern_row(memory, attr.pattern, row, attr.hflip);
            self.attr = attr;
            self.key = Some((entry_addr, fine_y));
        }
        (&self.attr, &self.pixels)
    }
}

fn hscroll_value(memory: &VideoMemory, cfg: &DisplayConfig, plane: Plane, line: usize) -> u32 {
    let entry = match cfg.hscroll_mode {
        HScrollMode::Full => 0,
        HScrollMode::FirstEightLines => line & 7,
        HScrollMode::PerCell => line & !7,
        HScrollMode::PerLine => line,
    } as u32;
    let addr = cfg.hscroll_base as u32 + entry * 4 + plane.scroll_slot() * 2;
    (memory.vram_word(addr) & 0x03FF) as u32
}

fn vscroll_value(memory: &VideoMemory, cfg: &DisplayConfig, plane: Plane, x: usize) -> u32 {
    let column = match cfg.vscroll_mode {
        VScrollMode::Full => 0,
        VScrollMode::TwoCell => x / 16,
    };
    memory.vsram(column * 2 + plane.scroll_slot() as usize) as u32
}

/// Draws the opaque pixels of `plane` for `line` into `out`.
pub fn render_plane_line(
    memory: &VideoMemory,
    cfg: &DisplayConfig,
    plane: Plane,
    line: usize,
    out: &mut [ScanlinePixel],
) {
    let width = cfg.screen_width().min(out.len());
    let cells_w = cfg.plane_width_cells as u32;
    let mask_x = cells_w * 8 - 1;
    let mask_y = cfg.plane_height_cells as u32 * 8 - 1;
    let base = plane.name_table(cfg);
    let hscroll = hscroll_value(memory, cfg, plane, line);
    let mut cache = RowCache::new();

    for (x, slot) in out.iter_mut().enumerate().take(width) {
        let vscroll = vscroll_value(memory, cfg, plane, x);
        let py = (line as u32).wrapping_add(vscroll) & mask_y;
        let px = (x as u32).wrapping_sub(hscroll) & mask_x;
        let entry_addr = base + ((py / 8) * cells_w + px / 8) * 2;
        let (attr, pixels) = cache.fetch(memory, entry_addr, py & 7);
        let color = pixels[(px & 7) as usize];
        if color != 0 {
            *slot = ScanlinePixel::opaque(color, attr.palette, attr.priority);
        }
    }
}

/// Draws the window plane for `line`, only where the window covers the screen.
pub fn render_window_line(
    memory: &VideoMemory,
    cfg: &DisplayConfig,
    line: usize,
    out: &mut [ScanlinePixel],
) {
    let region = WindowRegion::from_config(cfg);
    let width = cfg.screen_width().min(out.len());
    let cells_w = cfg.window_width_cells() as u32;
    let row_base = cfg.window_base as u32 + (line as u32 / 8) * cells_w * 2;
    let mut cache = RowCache::new();

    for (x, slot) in out.iter_mut().enumerate().take(width) {
        if !region.contains(x, line) {
            continue;
        }
        let entry_addr = row_base + (x as u32 / 8) * 2;
        let (attr, pixels) = cache.fetch(memory, entry_addr, line as u32 & 7);
        let color = pixels[x & 7];
        if color != 0 {
            *slot = ScanlinePixel::opaque(color, attr.palette, attr.priority);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdp::pixel::{TILE_BYTES, blank_line};
    use crate::vdp::registers::{REG_MODE3, REG_PLANE_A, REG_PLANE_B, REG_WINDOW_H, REG_WINDOW_V, Registers};

    /// Pattern `n` with every pixel set to colour `n`.
    fn solid_tile(mem: &mut VideoMemory, n: u8) {
        let byte = (n << 4) | n;
        for i in 0..TILE_BYTES {
            mem.set_vram_byte(n as u32 * TILE_BYTES + i, byte);
        }
    }

    fn setup() -> (VideoMemory, Registers) {
        let mut mem = VideoMemory::new();
        for n in 1..4 {
            solid_tile(&mut mem, n);
        }
        let mut regs = Registers::new();
        regs.write(REG_PLANE_A, 0x30); // 0xC000
        regs.write(REG_PLANE_B, 0x07); // 0xE000
        regs.write(13, 0x3F); // hscroll 0xFC00
        (mem, regs)
    }

    #[test]
    fn plane_renders_tile_with_attributes() {
        let (mut mem, regs) = setup();
        mem.set_vram_word(0xC000, 0x8000 | 0x4000 | 1);
        let mut out = blank_line();
        render_plane_line(&mem, regs.config(), Plane::A, 0, &mut out);
        assert_eq!(out[0], ScanlinePixel::opaque(1, 2, true));
        assert_eq!(out[7], ScanlinePixel::opaque(1, 2, true));
        assert_eq!(out[8], ScanlinePixel::TRANSPARENT);
    }

    #[test]
    fn full_hscroll_shifts_plane_right() {
        let (mut mem, regs) = setup();
        mem.set_vram_word(0xE000, 2);
        mem.set_vram_word(0xFC02, 4);
        let mut out = blank_line();
        render_plane_line(&mem, regs.config(), Plane::B, 0, &mut out);
        assert!(!out[3].is_opaque());
        assert_eq!(out[4].color_index, 2);
        assert_eq!(out[11].color_index, 2);
        assert!(!out[12].is_opaque());
    }

    #[test]
    fn per_line_hscroll_reads_each_line() {
        let (mut mem, mut regs) = setup();
        regs.write(REG_MODE3, 0x03);
        mem.set_vram_word(0xC000, 1);
        mem.set_vram_word(0xC000 + 64, 1); // row 1, 32-cell plane
        mem.set_vram_word(0xFC00 + 9 * 4, 8);
        let mut line8 = blank_line();
        let mut line9 = blank_line();
        render_plane_line(&mem, regs.config(), Plane::A, 8, &mut line8);
        render_plane_line(&mem, regs.config(), Plane::A, 9, &mut line9);
        assert!(line8[0].is_opaque());
        assert!(!line9[0].is_opaque());
        assert!(line9[8].is_opaque());
    }

    #[test]
    fn per_cell_hscroll_holds_for_eight_line_strips() {
        let (mut mem, mut regs) = setup();
        regs.write(REG_MODE3, 0x02);
        mem.set_vram_word(0xC000, 1);
        mem.set_vram_word(0xC000 + 64, 1);
        mem.set_vram_word(0xFC00 + 8 * 4, 8);
        let mut line7 = blank_line();
        render_plane_line(&mem, regs.config(), Plane::A, 7, &mut line7);
        assert!(line7[0].is_opaque());
        assert!(!line7[8].is_opaque());
        for line in [8, 9, 15] {
            let mut out = blank_line();
            render_plane_line(&mem, regs.config(), Plane::A, line, &mut out);
            assert!(!out[0].is_opaque(), "line {line}");
            assert!(out[8].is_opaque(), "line {line}");
        }
    }

    #[test]
    fn first_eight_lines_hscroll_repeats_every_eight() {
        let (mut mem, mut regs) = setup();
        regs.write(REG_MODE3, 0x01);
        mem.set_vram_word(0xC000, 1);
        mem.set_vram_word(0xC000 + 64, 1);
        mem.set_vram_word(0xFC00 + 4, 8);
        mem.set_vram_word(0xFC00 + 9 * 4, 16);
        let mut line8 = blank_line();
        let mut line9 = blank_line();
        render_plane_line(&mem, regs.config(), Plane::A, 8, &mut line8);
        render_plane_line(&mem, regs.config(), Plane::A, 9, &mut line9);
        assert!(line8[0].is_opaque());
        assert!(!line9[0].is_opaque());
        assert!(line9[8].is_opaque());
        assert!(!line9[16].is_opaque());
    }

    #[test]
    fn vscroll_wraps_plane_height() {
        let (mut mem, regs) = setup();
        // Row 31 of a 32x32 plane.
        mem.set_vram_word(0xC000 + 31 * 64, 3);
        mem.set_vsram(0, 31 * 8 + 256);
        let mut out = blank_line();
        render_plane_line(&mem, regs.config(), Plane::A, 0, &mut out);
        assert_eq!(out[0].color_index, 3);
    }

    #[test]
    fn two_cell_vscroll_uses_column_entries() {
        let (mut mem, mut regs) = setup();
        regs.write(REG_MODE3, 0x04);
        mem.set_vram_word(0xE000 + 64, 2); // row 1, column 0
        mem.set_vram_word(0xE000 + 64 + 2 * 2, 2); // row 1, column 2
        mem.set_vsram(3, 8); // plane B, second 16-pixel column
        let mut out = blank_line();
        render_plane_line(&mem, regs.config(), Plane::B, 0, &mut out);
        assert!(!out[0].is_opaque());
        assert!(out[16].is_opaque());
    }

    #[test]
    fn window_region_union_of_bands() {
        let mut regs = Registers::new();
        regs.write(REG_WINDOW_V, 0x02); // top 16 lines
        regs.write(REG_WINDOW_H, 0x85); // right of x=80
        let region = WindowRegion::from_config(regs.config());
        assert!(region.contains(0, 0));
        assert!(region.contains(0, 15));
        assert!(!region.contains(0, 16));
        assert!(region.contains(80, 100));
        assert!(!region.contains(79, 100));
    }

    #[test]
    fn window_empty_when_unset() {
        let regs = Registers::new();
        let region = WindowRegion::from_config(regs.config());
        assert!(!region.contains(0, 0));
        assert!(!region.contains(255, 223));
    }

    #[test]
    fn window_plane_is_unscrolled_and_gated() {
        let (mut mem, mut regs) = setup();
        regs.write(3, 0x2C); // 0xB000
        regs.write(REG_WINDOW_H, 0x01); // left 16 pixels
        for col in 0..4 {
            mem.set_vram_word(0xB000 + col * 2, 1);
        }
        mem.set_vram_word(0xFC00, 5);
        let mut out = blank_line();
        render_window_line(&mem, regs.config(), 0, &mut out);
        assert!(out[0].is_opaque());
        assert!(out[15].is_opaque());
        assert!(!out[16].is_opaque());
    }
}
