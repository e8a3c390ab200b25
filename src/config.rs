// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host-side VDP configuration.
//!
//! ```yaml
//! region: pal
//! dma_budget:
//!   h32_active: 16
//!   h40_active: 18
//!   h32_blank: 167
//!   h40_blank: 205
//! registers:
//!   1: 0x44
//!   12: 0x81
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vdp::dma::DmaBudget;
use crate::vdp::registers::REGISTER_COUNT;
use crate::vdp::timing::VideoRegion;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("DMA budget must be non-zero for every display state")]
    ZeroBudget,
    #[error("register {0} does not exist")]
    Register(u8),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VdpConfig {
    pub region: VideoRegion,
    pub dma_budget: DmaBudget,
    /// Register values applied after reset, keyed by register index.
    pub registers: BTreeMap<u8, u8>,
}

impl VdpConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.dma_budget;
        if [b.h32_active, b.h40_active, b.h32_blank, b.h40_blank].contains(&0) {
            return Err(ConfigError::ZeroBudget);
        }
        if let Some((&index, _)) = self.registers.iter().find(|(i, _)| **i as usize >= REGISTER_COUNT) {
            return Err(ConfigError::Register(index));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_gives_defaults() {
        let config = VdpConfig::from_yaml_str("{}").expect("parse");
        assert_eq!(config, VdpConfig::default());
        assert_eq!(config.region, VideoRegion::Ntsc);
        assert_eq!(config.dma_budget, DmaBudget::HARDWARE);
    }

    #[test]
    fn parses_region_and_registers() {
        let config = VdpConfig::from_yaml_str("region: pal\nregisters:\n  1: 0x44\n  12: 129\n").expect("parse");
        assert_eq!(config.region, VideoRegion::Pal);
        assert_eq!(config.registers.get(&1), Some(&0x44));
        assert_eq!(config.registers.get(&12), Some(&0x81));
    }

    #[test]
    fn rejects_zero_budget() {
        let text = "dma_budget: {h32_active: 0, h40_active: 18, h32_blank: 167, h40_blank: 205}";
        assert!(matches!(VdpConfig::from_yaml_str(text), Err(ConfigError::ZeroBudget)));
    }

    #[test]
    fn rejects_unknown_register() {
        assert!(matches!(
            VdpConfig::from_yaml_str("registers: {30: 1}"),
            Err(ConfigError::Register(30))
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(VdpConfig::from_yaml_str("colour: red"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = VdpConfig::default();
        config.region = VideoRegion::Pal;
        config.registers.insert(7, 0x21);
        let text = config.to_yaml().expect("encode");
        assert_eq!(VdpConfig::from_yaml_str(&text).expect("parse"), config);
    }
}
