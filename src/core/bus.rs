// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::vdp::dma::DmaSource;

/// Flat host memory in the 24-bit CPU address space: ROM from 0x000000 and
/// 64KB work RAM mirrored across 0xE00000..=0xFFFFFF. DMA reads come from here.
pub struct WorkRam {
    rom: Vec<u8>,
    ram: Vec<u8>,
}

impl WorkRam {
    pub const RAM_SIZE: usize = 0x1_0000;
    pub const RAM_START: u32 = 0xE0_0000;
    pub const ROM_LIMIT: usize = 0x40_0000;

    pub fn new() -> Self {
        Self {
            rom: Vec::new(),
            ram: vec![0; Self::RAM_SIZE],
        }
    }

    /// Maps `image` at address 0. Anything past 4MB is dropped.
    pub fn load_rom(&mut self, image: &[u8]) {
        let len = image.len().min(Self::ROM_LIMIT);
        if len < image.len() {
            log::warn!("ROM image truncated to {} bytes", len);
        }
        self.rom = image[..len].to_vec();
    }

    /// Read a byte from the 24-bit address space
    pub fn read_u8(&self, addr: u32) -> u8 {
        let a = addr & 0x00FF_FFFF;
        if a >= Self::RAM_START {
            self.ram[a as usize & (Self::RAM_SIZE - 1)]
        } else {
            // unmapped reads return 0xff
            self.rom.get(a as usize).copied().unwrap_or(0xFF)
        }
    }

    /// Write a byte to the 24-bit address space. ROM is read-only.
    pub fn write_u8(&mut self, addr: u32, value: u8) {
        let a = addr & 0x00FF_FFFF;
        if a >= Self::RAM_START {
            self.ram[a as usize & (Self::RAM_SIZE - 1)] = value;
        }
    }

    /// Read big-endian u16
    pub fn read_u16(&self, addr: u32) -> u16 {
        let hi = self.read_u8(addr) as u16;
        let lo = self.read_u8(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Write big-endian u16
    pub fn write_u16(&mut self, addr: u32, v: u16) {
        self.write_u8(addr, (v >> 8) as u8);
        self.write_u8(addr.wrapping_add(1), (v & 0xFF) as u8);
    }

    pub fn write_words(&mut self, addr: u32, words: &[u16]) {
        for (i, &w) in words.iter().enumerate() {
            self.write_u16(addr.wrapping_add(i as u32 * 2), w);
        }
    }
}

impl Default for WorkRam {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaSource for WorkRam {
    fn read_byte(&mut self, address: u32) -> u8 {
        self.read_u8(address)
    }
}
