// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beam position, blanking and the interrupt line counter.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const NTSC_LINES: u16 = 262;
pub const PAL_LINES: u16 = 313;
pub const H32_DOTS: u16 = 342;
pub const H40_DOTS: u16 = 420;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoRegion {
    #[default]
    Ntsc,
    Pal,
}

impl VideoRegion {
    pub fn total_lines(self) -> u16 {
        match self {
            VideoRegion::Ntsc => NTSC_LINES,
            VideoRegion::Pal => PAL_LINES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    ActiveDisplay,
    VBlankStart,
    VBlank,
}

bitflags! {
    /// What happened during one [`run_scanline`](crate::Vdp::run_scanline) call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LineEvents: u8 {
        const VINT = 0x01;
        const HINT = 0x02;
        const VBLANK_START = 0x04;
        const FRAME_END = 0x08;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingState {
    pub h_counter: u16,
    pub v_counter: u16,
    pub in_vblank: bool,
    pub hint_counter: u8,
    pub hint_pending: bool,
    pub vint_pending: bool,
    pub frame: u64,
    pub odd_frame: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Timing {
    pub state: TimingState,
    region: VideoRegion,
}

impl Timing {
    pub fn new(region: VideoRegion) -> Self {
        Self {
            state: TimingState::default(),
            region,
        }
    }

    pub(crate) fn restore(region: VideoRegion, state: TimingState) -> Self {
        Self { state, region }
    }

    pub fn region(&self) -> VideoRegion {
        self.region
    }

    pub fn scanline(&self) -> u16 {
        self.state.v_counter
    }

    pub fn phase(&self, active_lines: u16) -> FramePhase {
        let v = self.state.v_counter;
        if v < active_lines {
            FramePhase::ActiveDisplay
        } else if v == active_lines {
            FramePhase::VBlankStart
        } else {
            FramePhase::VBlank
        }
    }

    pub fn in_hblank(&self, active_width: usize) -> bool {
        self.state.h_counter as usize >= active_width
    }

    /// Moves the pixel counter, wrapping at the end of the line.
    pub fn advance_dots(&mut self, dots: u16, h40: bool) {
        let total = if h40 { H40_DOTS } else { H32_DOTS };
        self.state.h_counter = ((self.state.h_counter as u32 + dots as u32) % total as u32) as u16;
    }

    /// Steps the line counter for the current line. It counts down on the
    /// active lines and the first blanked line, and is reloaded on every other
    /// line. Returns true on underflow.
    pub fn clock_hint_counter(&mut self, active_lines: u16, reload: u8) -> bool {
        if self.state.v_counter > active_lines {
            self.state.hint_counter = reload;
            return false;
        }
        if self.state.hint_counter == 0 {
            self.state.hint_counter = reload;
            true
        } else {
            self.state.hint_counter -= 1;
            false
        }
    }

    /// Moves to the next line. Returns true when a new frame begins.
    pub fn next_line(&mut self, interlaced: bool) -> bool {
        self.state.h_counter = 0;
        self.state.v_counter += 1;
        if self.state.v_counter < self.region.total_lines() {
            return false;
        }
        self.state.v_counter = 0;
        self.state.in_vblank = false;
        self.state.frame += 1;
        self.state.odd_frame = interlaced && !self.state.odd_frame;
        true
    }

    /// 8-bit V and H positions packed the way the HV counter port reads them.
    pub fn hv_counter(&self) -> u16 {
        ((self.state.v_counter & 0xFF) << 8) | ((self.state.h_counter >> 1) & 0xFF)
    }
}
