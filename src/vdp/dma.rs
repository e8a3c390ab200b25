// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! DMA engine.
//!
//! Transfers are byte oriented and resumable: [`DmaEngine::tick`] moves at
//! most the budget it is given and remembers where it stopped. Nothing moves
//! unless somebody ticks it.

use serde::{Deserialize, Serialize};

use super::memory::{VideoMemory, cram_index, vsram_index};

/// External memory as seen by memory-to-VDP transfers.
pub trait DmaSource {
    fn read_byte(&mut self, address: u32) -> u8;
}

impl<F> DmaSource for F
where
    F: FnMut(u32) -> u8,
{
    fn read_byte(&mut self, address: u32) -> u8 {
        self(address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmaKind {
    Fill { value: u8 },
    Copy,
    MemoryToVram,
    MemoryToCram,
    MemoryToVsram,
}

impl DmaKind {
    pub fn is_copy(self) -> bool {
        matches!(self, DmaKind::Copy)
    }

    fn reads_external(self) -> bool {
        matches!(
            self,
            DmaKind::MemoryToVram | DmaKind::MemoryToCram | DmaKind::MemoryToVsram
        )
    }
}

/// Bytes per scanline the chip can move, by display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaBudget {
    pub h32_active: usize,
    pub h40_active: usize,
    pub h32_blank: usize,
    pub h40_blank: usize,
}

impl DmaBudget {
    pub const HARDWARE: Self = Self {
        h32_active: 16,
        h40_active: 18,
        h32_blank: 167,
        h40_blank: 205,
    };

    /// VRAM copies need a read and a write slot per byte, so they get half.
    pub fn for_line(&self, kind: DmaKind, h40: bool, blanking: bool) -> usize {
        let bytes = match (h40, blanking) {
            (false, false) => self.h32_active,
            (true, false) => self.h40_active,
            (false, true) => self.h32_blank,
            (true, true) => self.h40_blank,
        };
        if kind.is_copy() { (bytes / 2).max(1) } else { bytes }
    }
}

impl Default for DmaBudget {
    fn default() -> Self {
        Self::HARDWARE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaState {
    pub active: bool,
    pub kind: DmaKind,
    pub source: u32,
    pub destination: u32,
    pub remaining: u32,
    pub increment: u8,
    pub transferred: u32,
    /// High byte of a CRAM/VSRAM word waiting for its low half.
    pub word_latch: u8,
}

impl Default for DmaState {
    fn default() -> Self {
        Self {
            active: false,
            kind: DmaKind::Copy,
            source: 0,
            destination: 0,
            remaining: 0,
            increment: 1,
            transferred: 0,
            word_latch: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DmaEngine {
    state: DmaState,
}

impl DmaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a transfer of `length` bytes. Fill and copy step the destination
    /// by one byte, memory transfers by one word per byte pair.
    pub fn start(&mut self, kind: DmaKind, source: u32, destination: u32, length: u32) -> bool {
        let increment = if kind.reads_external() { 2 } else { 1 };
        self.start_stepped(kind, source, destination, length, increment)
    }

    /// Like [`start`](Self::start) with the destination step taken from the
    /// auto-increment register.
    pub fn start_stepped(
        &mut self,
        kind: DmaKind,
        source: u32,
        destination: u32,
        length: u32,
        increment: u8,
    ) -> bool {
        if length == 0 {
            log::debug!("zero-length DMA ignored");
            return false;
        }
        if self.state.active {
            log::warn!("DMA request ignored, a {:?} transfer is still running", self.state.kind);
            return false;
        }
        self.state = DmaState {
            active: true,
            kind,
            source,
            destination,
            remaining: length,
            increment,
            transferred: 0,
            word_latch: 0,
        };
        log::debug!(
            "DMA {:?} started: src=0x{:06X} dst=0x{:04X} len={} inc={}",
            kind,
            source,
            destination,
            length,
            increment
        );
        true
    }

    /// Moves up to `budget` bytes. Returns the number moved.
    pub fn tick(
        &mut self,
        budget: usize,
        memory: &mut VideoMemory,
        mut source: Option<&mut (dyn DmaSource + '_)>,
    ) -> usize {
        if !self.state.active {
            return 0;
        }
        let count = budget.min(self.state.remaining as usize);
        for _ in 0..count {
            let n = self.state.transferred;
            let step = self.state.increment as u32;
            match self.state.kind {
                DmaKind::Fill { value } => {
                    memory.set_vram_byte(self.state.destination.wrapping_add(n.wrapping_mul(step)), value);
                }
                DmaKind::Copy => {
                    let byte = memory.vram_byte(self.state.source.wrapping_add(n));
                    memory.set_vram_byte(self.state.destination.wrapping_add(n.wrapping_mul(step)), byte);
                }
                kind => {
                    // No source attached: bytes are consumed without effect.
                    if let Some(src) = source.as_deref_mut() {
                        let byte = src.read_byte(self.state.source.wrapping_add(n) & 0x00FF_FFFF);
                        let word_addr = self.state.destination.wrapping_add((n / 2).wrapping_mul(step));
                        self.store_external(kind, memory, word_addr, n & 1 == 1, byte);
                    }
                }
            }
            self.state.transferred += 1;
            self.state.remaining -= 1;
        }
        if self.state.remaining == 0 {
            self.state.active = false;
            log::debug!("DMA {:?} complete after {} bytes", self.state.kind, self.state.transferred);
        }
        count
    }

    fn store_external(
        &mut self,
        kind: DmaKind,
        memory: &mut VideoMemory,
        word_addr: u32,
        low_half: bool,
        byte: u8,
    ) {
        match kind {
            DmaKind::MemoryToVram => {
                let addr = if low_half { word_addr ^ 1 } else { word_addr };
                memory.set_vram_byte(addr, byte);
            }
            DmaKind::MemoryToCram | DmaKind::MemoryToVsram if !low_half => {
                self.state.word_latch = byte;
            }
            DmaKind::MemoryToCram => {
                let word = u16::from_be_bytes([self.state.word_latch, byte]);
                memory.set_cram(cram_index(word_addr as u16), word);
            }
            DmaKind::MemoryToVsram => {
                let word = u16::from_be_bytes([self.state.word_latch, byte]);
                memory.set_vsram(vsram_index(word_addr as u16), word);
            }
            DmaKind::Fill { .. } | DmaKind::Copy => {}
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &DmaState {
        &self.state
    }

    pub(crate) fn restore(&mut self, state: DmaState) {
        self.state = state;
    }
}
