// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Two-phase control port decoding.
//!
//! A command is split over two 16-bit writes:
//!
//! ```text
//! first:  CD1 CD0 A13 A12 A11 A10 A9 A8 A7 A6 A5 A4 A3 A2 A1 A0
//! second:  0   0   0   0   0   0   0  0 CD5 CD4 CD3 CD2 0 0 A15 A14
//! ```
//!
//! A first word of the form `10xR RRRR VVVV VVVV` is a register set and is
//! handled on its own.

use serde::{Deserialize, Serialize};

/// Memory and direction selected by the command code. The set is closed, so
/// all routing is a `match` on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTarget {
    VramRead,
    VramWrite,
    CramRead,
    CramWrite,
    VsramRead,
    VsramWrite,
    Invalid,
}

impl AccessTarget {
    pub fn from_code(code: u8) -> Self {
        match code & 0x0F {
            0x0 => AccessTarget::VramRead,
            0x1 => AccessTarget::VramWrite,
            0x3 => AccessTarget::CramWrite,
            0x4 => AccessTarget::VsramRead,
            0x5 => AccessTarget::VsramWrite,
            0x8 => AccessTarget::CramRead,
            _ => AccessTarget::Invalid,
        }
    }
}

/// What a single control port write turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWrite {
    Register { index: usize, value: u8 },
    FirstHalf,
    Command {
        target: AccessTarget,
        address: u16,
        dma: bool,
    },
}

const CD5_DMA: u8 = 0x20;

/// Latch state of the control port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPort {
    pending: bool,
    code: u8,
    address: u16,
    first_word: u16,
}

impl AccessPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_control(&mut self, word: u16) -> ControlWrite {
        if !self.pending {
            if word & 0xC000 == 0x8000 {
                return ControlWrite::Register {
                    index: ((word >> 8) & 0x1F) as usize,
                    value: word as u8,
                };
            }
            // Address low bits and CD1-CD0 take effect immediately.
            self.first_word = word;
            self.pending = true;
            self.code = (self.code & !0x03) | (word >> 14) as u8;
            self.address = (self.address & 0xC000) | (word & 0x3FFF);
            return ControlWrite::FirstHalf;
        }

        self.pending = false;
        self.code = ((self.first_word >> 14) as u8 & 0x03) | ((word >> 2) as u8 & 0x3C);
        self.address = ((word & 0x0003) << 14) | (self.first_word & 0x3FFF);
        ControlWrite::Command {
            target: self.target(),
            address: self.address,
            dma: self.code & CD5_DMA != 0,
        }
    }

    pub fn target(&self) -> AccessTarget {
        AccessTarget::from_code(self.code)
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending = false;
    }

    pub fn advance(&mut self, increment: u8) {
        self.address = self.address.wrapping_add(increment as u16);
    }

    /// Drops the DMA request bit once the engine has taken the command.
    pub fn clear_dma_request(&mut self) {
        self.code &= !CD5_DMA;
    }
}
