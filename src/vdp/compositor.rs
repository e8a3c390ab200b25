// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Layer priority and shadow/highlight composition.

use super::pixel::{LineBuffer, ScanlinePixel};
use super::plane::WindowRegion;
use super::sprite::SpriteEffect;

/// Per-layer buffers for one line, filled by the plane and sprite renderers.
pub struct LineLayers {
    pub plane_a: LineBuffer,
    pub plane_b: LineBuffer,
    pub window: LineBuffer,
    pub sprites: LineBuffer,
}

impl LineLayers {
    pub fn new() -> Self {
        let blank = super::pixel::blank_line();
        Self {
            plane_a: blank,
            plane_b: blank,
            window: blank,
            sprites: blank,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for LineLayers {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Layer {
    B,
    Sprites,
    AOrWindow,
}

const LAYER_ORDER: [Layer; 3] = [Layer::B, Layer::Sprites, Layer::AOrWindow];

pub struct Composition<'a> {
    pub layers: &'a LineLayers,
    pub window: WindowRegion,
    pub line: usize,
    pub width: usize,
    pub background: ScanlinePixel,
    pub shadow_highlight: bool,
}

impl Composition<'_> {
    /// Merges the layers into `out`. Each of the two passes, low priority
    /// then high, draws plane B, sprites and plane A or window in that order.
    pub fn combine_line(&self, out: &mut [ScanlinePixel]) {
        let width = self.width.min(out.len());
        for (x, acc) in out.iter_mut().enumerate().take(width) {
            *acc = self.background;
            let a_or_window = if self.window.contains(x, self.line) {
                &self.layers.window[x]
            } else {
                &self.layers.plane_a[x]
            };

            for high in [false, true] {
                for layer in LAYER_ORDER {
                    let pixel = match layer {
                        Layer::B => &self.layers.plane_b[x],
                        Layer::Sprites => &self.layers.sprites[x],
                        Layer::AOrWindow => a_or_window,
                    };
                    if !pixel.is_opaque() || pixel.priority != high {
                        continue;
                    }
                    if let Layer::Sprites = layer {
                        if let Some(effect) = SpriteEffect::of(pixel, self.shadow_highlight) {
                            apply_effect(acc, effect);
                            continue;
                        }
                    }
                    *acc = *pixel;
                }
            }
        }
    }
}

fn apply_effect(acc: &mut ScanlinePixel, effect: SpriteEffect) {
    match effect {
        SpriteEffect::Shadow => {
            acc.shadow = true;
            acc.highlight = false;
        }
        SpriteEffect::Highlight => {
            if acc.shadow {
                acc.shadow = false;
            } else {
                acc.highlight = true;
            }
        }
    }
}
