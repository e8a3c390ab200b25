// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! MD-VDP video display processor emulator
//!
//! This library emulates the tile-and-sprite video chip of a 16-bit console:
//! its memories, register file, DMA engine, line renderer and interrupt
//! timing. CPU cores and host presentation live outside this crate.

pub mod config;
pub mod core;
pub mod vdp;

// Re-export commonly used types
pub use config::{ConfigError, VdpConfig};
pub use core::WorkRam;
pub use vdp::dma::{DmaKind, DmaSource};
pub use vdp::plane::Plane;
pub use vdp::state::StateError;
pub use vdp::timing::{LineEvents, VideoRegion};
pub use vdp::{ModeBits, Vdp};
