// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Register file and the display configuration derived from it.
//!
//! The raw 24-byte array is the only source of truth. [`DisplayConfig`] is
//! rebuilt from it after every write, so derived fields can never drift from
//! the bytes a save state persists.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const REGISTER_COUNT: usize = 24;

pub const REG_MODE1: usize = 0;
pub const REG_MODE2: usize = 1;
pub const REG_PLANE_A: usize = 2;
pub const REG_WINDOW: usize = 3;
pub const REG_PLANE_B: usize = 4;
pub const REG_SPRITE_TABLE: usize = 5;
pub const REG_BACKGROUND: usize = 7;
pub const REG_HINT_RELOAD: usize = 10;
pub const REG_MODE3: usize = 11;
pub const REG_MODE4: usize = 12;
pub const REG_HSCROLL: usize = 13;
pub const REG_AUTO_INCREMENT: usize = 15;
pub const REG_PLANE_SIZE: usize = 16;
pub const REG_WINDOW_H: usize = 17;
pub const REG_WINDOW_V: usize = 18;
pub const REG_DMA_LEN_LO: usize = 19;
pub const REG_DMA_LEN_HI: usize = 20;
pub const REG_DMA_SRC_LO: usize = 21;
pub const REG_DMA_SRC_MID: usize = 22;
pub const REG_DMA_SRC_HI: usize = 23;

/// Largest plane the chip can address, in cells.
const MAX_PLANE_CELLS: u16 = 4096;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode1: u8 {
        const HINT_ENABLE = 0x10;
        const HV_LATCH = 0x02;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode2: u8 {
        const DISPLAY_ENABLE = 0x40;
        const VINT_ENABLE = 0x20;
        const DMA_ENABLE = 0x10;
        const V30 = 0x08;
        const MODE5 = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode4: u8 {
        const H40_HI = 0x80;
        const SHADOW_HIGHLIGHT = 0x08;
        const H40_LO = 0x01;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HScrollMode {
    Full,
    /// Undocumented mode 01: the first eight table entries repeat down the screen.
    FirstEightLines,
    PerCell,
    PerLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VScrollMode {
    Full,
    TwoCell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterlaceMode {
    Off,
    Normal,
    DoubleResolution,
}

/// What a DMA request issued through the control port will do, from register 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaMode {
    MemoryToVdp,
    Fill,
    Copy,
}

/// Everything the renderers, DMA engine and timing read from the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub hint_enabled: bool,
    pub hv_latch: bool,
    pub display_enabled: bool,
    pub vint_enabled: bool,
    pub dma_enabled: bool,
    pub v30: bool,
    pub mode5: bool,
    pub h40: bool,
    pub shadow_highlight: bool,
    pub interlace: InterlaceMode,
    pub plane_a_base: u16,
    pub window_base: u16,
    pub plane_b_base: u16,
    pub sprite_table_base: u16,
    pub hscroll_base: u16,
    pub background_palette: u8,
    pub background_index: u8,
    pub hint_reload: u8,
    pub hscroll_mode: HScrollMode,
    pub vscroll_mode: VScrollMode,
    pub auto_increment: u8,
    pub plane_width_cells: u16,
    pub plane_height_cells: u16,
    pub window_right: bool,
    pub window_h_cells: u8,
    pub window_down: bool,
    pub window_v_cells: u8,
    /// Transfer length in words. Zero means 0x10000.
    pub dma_length: u16,
    pub dma_mode: DmaMode,
    /// Byte address in external memory for memory-to-VDP transfers.
    pub dma_memory_source: u32,
    /// VRAM byte address for copies.
    pub dma_copy_source: u16,
}

impl DisplayConfig {
    pub fn derive(raw: &[u8; REGISTER_COUNT]) -> Self {
        let mode1 = Mode1::from_bits_truncate(raw[REG_MODE1]);
        let mode2 = Mode2::from_bits_truncate(raw[REG_MODE2]);
        let mode4 = Mode4::from_bits_truncate(raw[REG_MODE4]);
        let h40 = mode4.intersects(Mode4::H40_HI | Mode4::H40_LO);

        let mode3 = raw[REG_MODE3];
        let hscroll_mode = match mode3 & 0x03 {
            0 => HScrollMode::Full,
            1 => HScrollMode::FirstEightLines,
            2 => HScrollMode::PerCell,
            _ => HScrollMode::PerLine,
        };
        let vscroll_mode = if mode3 & 0x04 != 0 {
            VScrollMode::TwoCell
        } else {
            VScrollMode::Full
        };
        let interlace = match (raw[REG_MODE4] >> 1) & 0x03 {
            1 => InterlaceMode::Normal,
            3 => InterlaceMode::DoubleResolution,
            _ => InterlaceMode::Off,
        };

        let (plane_width_cells, plane_height_cells) = plane_size(raw[REG_PLANE_SIZE]);

        // H40 ignores the lowest usable bit of the window and sprite bases.
        let window_mask = if h40 { 0x3C } else { 0x3E };
        let sprite_mask = if h40 { 0x7E } else { 0x7F };

        let src_hi = raw[REG_DMA_SRC_HI];
        let dma_mode = match src_hi >> 6 {
            2 => DmaMode::Fill,
            3 => DmaMode::Copy,
            _ => DmaMode::MemoryToVdp,
        };

        Self {
            hint_enabled: mode1.contains(Mode1::HINT_ENABLE),
            hv_latch: mode1.contains(Mode1::HV_LATCH),
            display_enabled: mode2.contains(Mode2::DISPLAY_ENABLE),
            vint_enabled: mode2.contains(Mode2::VINT_ENABLE),
            dma_enabled: mode2.contains(Mode2::DMA_ENABLE),
            v30: mode2.contains(Mode2::V30),
            mode5: mode2.contains(Mode2::MODE5),
            h40,
            shadow_highlight: mode4.contains(Mode4::SHADOW_HIGHLIGHT),
            interlace,
            plane_a_base: ((raw[REG_PLANE_A] & 0x38) as u16) << 10,
            window_base: ((raw[REG_WINDOW] & window_mask) as u16) << 10,
            plane_b_base: ((raw[REG_PLANE_B] & 0x07) as u16) << 13,
            sprite_table_base: ((raw[REG_SPRITE_TABLE] & sprite_mask) as u16) << 9,
            hscroll_base: ((raw[REG_HSCROLL] & 0x3F) as u16) << 10,
            background_palette: (raw[REG_BACKGROUND] >> 4) & 0x03,
            background_index: raw[REG_BACKGROUND] & 0x0F,
            hint_reload: raw[REG_HINT_RELOAD],
            hscroll_mode,
            vscroll_mode,
            auto_increment: raw[REG_AUTO_INCREMENT],
            plane_width_cells,
            plane_height_cells,
            window_right: raw[REG_WINDOW_H] & 0x80 != 0,
            window_h_cells: raw[REG_WINDOW_H] & 0x1F,
            window_down: raw[REG_WINDOW_V] & 0x80 != 0,
            window_v_cells: raw[REG_WINDOW_V] & 0x1F,
            dma_length: u16::from_le_bytes([raw[REG_DMA_LEN_LO], raw[REG_DMA_LEN_HI]]),
            dma_mode,
            dma_memory_source: ((src_hi & 0x7F) as u32) << 17
                | (raw[REG_DMA_SRC_MID] as u32) << 9
                | (raw[REG_DMA_SRC_LO] as u32) << 1,
            dma_copy_source: u16::from_le_bytes([raw[REG_DMA_SRC_LO], raw[REG_DMA_SRC_MID]]),
        }
    }

    pub fn screen_width(&self) -> usize {
        if self.h40 { 320 } else { 256 }
    }

    pub fn active_lines(&self) -> u16 {
        if self.v30 { 240 } else { 224 }
    }

    /// Sprite table entries the link walk may visit.
    pub fn sprite_limit(&self) -> usize {
        if self.h40 { 80 } else { 64 }
    }

    pub fn window_width_cells(&self) -> u16 {
        if self.h40 { 64 } else { 32 }
    }
}

fn plane_size(value: u8) -> (u16, u16) {
    let cells = |bits: u8| match bits & 0x03 {
        1 => 64,
        3 => 128,
        _ => 32,
    };
    let mut width = cells(value);
    let mut height = cells(value >> 4);
    if width * height > MAX_PLANE_CELLS {
        if width == 128 {
            height = 32;
        } else {
            width = 32;
        }
    }
    (width, height)
}

/// The 24 raw registers plus their derived view.
#[derive(Debug, Clone)]
pub struct Registers {
    raw: [u8; REGISTER_COUNT],
    config: DisplayConfig,
}

impl Registers {
    pub fn new() -> Self {
        let raw = [0; REGISTER_COUNT];
        Self {
            raw,
            config: DisplayConfig::derive(&raw),
        }
    }

    /// Out-of-range indices read as zero.
    pub fn read(&self, index: usize) -> u8 {
        self.raw.get(index).copied().unwrap_or(0)
    }

    /// Returns false when `index` is out of range and the write was dropped.
    pub fn write(&mut self, index: usize, value: u8) -> bool {
        let Some(slot) = self.raw.get_mut(index) else {
            log::warn!("write to nonexistent register {} ignored", index);
            return false;
        };
        *slot = value;
        self.config = DisplayConfig::derive(&self.raw);
        log::debug!("register {:02} = 0x{:02X}", index, value);
        true
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn raw(&self) -> &[u8; REGISTER_COUNT] {
        &self.raw
    }

    pub fn load_raw(&mut self, raw: [u8; REGISTER_COUNT]) {
        self.raw = raw;
        self.config = DisplayConfig::derive(&self.raw);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
