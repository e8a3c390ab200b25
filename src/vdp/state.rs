// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Save states.
//!
//! The blob holds the memories, raw registers, port latch, DMA progress,
//! video region and beam position. Loading a blob adopts its region. Derived register fields and colour tables are rebuilt on
//! load and never stored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{StatusFlags, Vdp};
use super::dma::DmaState;
use super::port::AccessPort;
use super::registers::REGISTER_COUNT;
use super::timing::{Timing, TimingState, VideoRegion};

pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("snapshot {0} has the wrong size")]
    Size(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    vram: Vec<u8>,
    cram: Vec<u16>,
    vsram: Vec<u16>,
    registers: Vec<u8>,
    port: AccessPort,
    fill_armed: bool,
    dma: DmaState,
    region: VideoRegion,
    timing: TimingState,
    sticky_status: u16,
    hv_latch: Option<u16>,
    previous_line_overflowed: bool,
}

impl Vdp {
    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            vram: self.memory.vram().to_vec(),
            cram: self.memory.cram_entries().to_vec(),
            vsram: self.memory.vsram_entries().to_vec(),
            registers: self.registers.raw().to_vec(),
            port: self.port,
            fill_armed: self.fill_armed,
            dma: *self.dma.state(),
            region: self.timing.region(),
            timing: self.timing.state,
            sticky_status: self.sticky.bits(),
            hv_latch: self.hv_latch,
            previous_line_overflowed: self.previous_line_overflowed,
        };
        serde_json::to_vec(&snapshot).map_err(StateError::Encode)
    }

    /// Restores a blob from [`save_state`](Self::save_state). On error the
    /// VDP is left untouched.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        let snapshot: Snapshot = serde_json::from_slice(bytes).map_err(StateError::Decode)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StateError::Version(snapshot.version));
        }
        let registers: [u8; REGISTER_COUNT] = snapshot
            .registers
            .as_slice()
            .try_into()
            .map_err(|_| StateError::Size("register file"))?;

        // Validated before anything is written.
        if !self.memory.load(&snapshot.vram, &snapshot.cram, &snapshot.vsram) {
            return Err(StateError::Size("memory"));
        }
        self.registers.load_raw(registers);
        self.port = snapshot.port;
        self.fill_armed = snapshot.fill_armed;
        self.dma.restore(snapshot.dma);
        self.timing = Timing::restore(snapshot.region, snapshot.timing);
        self.sticky = StatusFlags::from_bits_truncate(snapshot.sticky_status) & StatusFlags::STICKY;
        self.hv_latch = snapshot.hv_latch;
        self.previous_line_overflowed = snapshot.previous_line_overflowed;
        log::debug!("state restored at line {}", self.timing.scanline());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdp::dma::DmaKind;

    #[test]
    fn round_trip_preserves_everything_persistent() {
        let mut vdp = Vdp::new();
        vdp.write_register(1, 0x54);
        vdp.write_register(15, 2);
        vdp.write_control_port(0x4000 | 0x0123);
        vdp.write_data_port(0xBEEF);
        vdp.dma_start(DmaKind::Fill { value: 0x33 }, 0, 0x2000, 100);
        vdp.dma_tick(10);
        vdp.write_control_port(0x4000);

        let blob = vdp.save_state().expect("save");
        let mut restored = Vdp::new();
        restored.load_state(&blob).expect("load");

        assert_eq!(restored.memory(), vdp.memory());
        assert_eq!(restored.registers().raw(), vdp.registers().raw());
        assert_eq!(restored.config(), vdp.config());
        assert_eq!(restored.dma_state(), vdp.dma_state());
        assert_eq!(restored.port, vdp.port);
        assert_eq!(restored.timing.state, vdp.timing.state);
    }

    #[test]
    fn region_travels_with_the_snapshot() {
        let mut pal = Vdp::with_config(&crate::config::VdpConfig {
            region: VideoRegion::Pal,
            ..Default::default()
        });
        for _ in 0..300 {
            pal.run_scanline(&mut [], 0);
        }
        let blob = pal.save_state().expect("save");

        let mut target = Vdp::new();
        target.load_state(&blob).expect("load");
        assert!(target.is_pal());
        assert_ne!(target.status() & StatusFlags::PAL.bits(), 0);
        assert_eq!(target.scanline(), 300);
        target.run_scanline(&mut [], 0);
        assert_eq!(target.scanline(), 301);
    }

    #[test]
    fn garbage_is_rejected_without_side_effects() {
        let mut vdp = Vdp::new();
        vdp.write_register(7, 0x21);
        assert!(matches!(vdp.load_state(b"not a snapshot"), Err(StateError::Decode(_))));
        assert_eq!(vdp.read_register(7), 0x21);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let vdp = Vdp::new();
        let blob = vdp.save_state().expect("save");
        let mut value: serde_json::Value = serde_json::from_slice(&blob).expect("json");
        value["version"] = serde_json::json!(99);
        let bad = serde_json::to_vec(&value).expect("encode");
        let mut target = Vdp::new();
        assert!(matches!(target.load_state(&bad), Err(StateError::Version(99))));
    }

    #[test]
    fn truncated_memory_is_rejected() {
        let vdp = Vdp::new();
        let blob = vdp.save_state().expect("save");
        let mut value: serde_json::Value = serde_json::from_slice(&blob).expect("json");
        value["cram"] = serde_json::json!([0, 1, 2]);
        let bad = serde_json::to_vec(&value).expect("encode");
        let mut target = Vdp::new();
        assert!(matches!(target.load_state(&bad), Err(StateError::Size("memory"))));
    }
}
