// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! The three memories owned by the VDP.
//!
//! Every accessor masks its address, so no caller can index out of range.
//! VRAM is big-endian when accessed as words: the even byte is the high half.

use super::port::AccessTarget;

pub const VRAM_SIZE: usize = 0x1_0000;
pub const CRAM_ENTRIES: usize = 64;
pub const VSRAM_ENTRIES: usize = 40;

const CRAM_VALUE_MASK: u16 = 0x0FFF;
const VSRAM_VALUE_MASK: u16 = 0x03FF;

/// VRAM, CRAM and VSRAM as one owned bank set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoMemory {
    vram: Vec<u8>,
    cram: [u16; CRAM_ENTRIES],
    vsram: [u16; VSRAM_ENTRIES],
}

impl VideoMemory {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            cram: [0; CRAM_ENTRIES],
            vsram: [0; VSRAM_ENTRIES],
        }
    }

    pub fn clear(&mut self) {
        self.vram.fill(0);
        self.cram = [0; CRAM_ENTRIES];
        self.vsram = [0; VSRAM_ENTRIES];
    }

    #[inline]
    pub fn vram_byte(&self, addr: u32) -> u8 {
        self.vram[addr as usize & (VRAM_SIZE - 1)]
    }

    #[inline]
    pub fn set_vram_byte(&mut self, addr: u32, value: u8) {
        self.vram[addr as usize & (VRAM_SIZE - 1)] = value;
    }

    /// Big-endian word at `addr`. An odd address reads the word swapped, as
    /// the chip does.
    #[inline]
    pub fn vram_word(&self, addr: u32) -> u16 {
        let hi = self.vram_byte(addr) as u16;
        let lo = self.vram_byte(addr ^ 1) as u16;
        (hi << 8) | lo
    }

    #[inline]
    pub fn set_vram_word(&mut self, addr: u32, value: u16) {
        self.set_vram_byte(addr, (value >> 8) as u8);
        self.set_vram_byte(addr ^ 1, value as u8);
    }

    #[inline]
    pub fn cram(&self, index: usize) -> u16 {
        self.cram[index % CRAM_ENTRIES]
    }

    #[inline]
    pub fn set_cram(&mut self, index: usize, value: u16) {
        self.cram[index % CRAM_ENTRIES] = value & CRAM_VALUE_MASK;
    }

    #[inline]
    pub fn vsram(&self, index: usize) -> u16 {
        self.vsram[index % VSRAM_ENTRIES]
    }

    #[inline]
    pub fn set_vsram(&mut self, index: usize, value: u16) {
        self.vsram[index % VSRAM_ENTRIES] = value & VSRAM_VALUE_MASK;
    }

    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    pub fn cram_entries(&self) -> &[u16; CRAM_ENTRIES] {
        &self.cram
    }

    pub fn vsram_entries(&self) -> &[u16; VSRAM_ENTRIES] {
        &self.vsram
    }

    /// Word write through the data port. Byte addresses are turned into
    /// entry indices for CRAM and VSRAM.
    pub fn write_target(&mut self, target: AccessTarget, addr: u16, value: u16) {
        match target {
            AccessTarget::VramWrite => self.set_vram_word(addr as u32, value),
            AccessTarget::CramWrite => self.set_cram(cram_index(addr), value),
            AccessTarget::VsramWrite => self.set_vsram(vsram_index(addr), value),
            other => log::warn!("data port write ignored, target is {:?}", other),
        }
    }

    pub fn read_target(&self, target: AccessTarget, addr: u16) -> u16 {
        match target {
            AccessTarget::VramRead => self.vram_word(addr as u32 & !1),
            AccessTarget::CramRead => self.cram(cram_index(addr)),
            AccessTarget::VsramRead => self.vsram(vsram_index(addr)),
            other => {
                log::warn!("data port read ignored, target is {:?}", other);
                0
            }
        }
    }

    pub(crate) fn load(&mut self, vram: &[u8], cram: &[u16], vsram: &[u16]) -> bool {
        if vram.len() != VRAM_SIZE || cram.len() != CRAM_ENTRIES || vsram.len() != VSRAM_ENTRIES {
            return false;
        }
        self.vram.copy_from_slice(vram);
        for (i, &c) in cram.iter().enumerate() {
            self.set_cram(i, c);
        }
        for (i, &v) in vsram.iter().enumerate() {
            self.set_vsram(i, v);
        }
        true
    }
}

impl Default for VideoMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub(crate) fn cram_index(addr: u16) -> usize {
    ((addr & 0x7F) >> 1) as usize
}

#[inline]
pub(crate) fn vsram_index(addr: u16) -> usize {
    ((addr >> 1) as usize) % VSRAM_ENTRIES
}
