// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

//! The video display processor.
//!
//! [`Vdp`] owns VRAM, CRAM, VSRAM, the register file, the control port
//! latch, the DMA engine and the beam counters. A host drives it in two ways:
//!
//! * bus accesses through [`Vdp::write_control_port`], [`Vdp::write_data_port`],
//!   [`Vdp::read_status`] and friends (or [`Vdp::read_port`] /
//!   [`Vdp::write_port`] for the raw port map);
//! * one [`Vdp::run_scanline`] call per line, which renders, runs DMA and
//!   raises interrupts.
//!
//! Nothing here fails at runtime. Out-of-range writes and impossible
//! commands are dropped the same way the chip drops them.

pub mod color;
pub mod compositor;
pub mod dma;
pub mod memory;
pub mod pixel;
pub mod plane;
pub mod port;
pub mod registers;
pub mod sprite;
pub mod state;
pub mod timing;

use bitflags::bitflags;

use crate::config::VdpConfig;
use color::ColorTables;
use compositor::{Composition, LineLayers};
use dma::{DmaBudget, DmaEngine, DmaKind, DmaSource, DmaState};
use memory::VideoMemory;
use pixel::{LineBuffer, ScanlinePixel, blank_line};
use plane::{Plane, WindowRegion};
use port::{AccessPort, AccessTarget, ControlWrite};
use registers::{DisplayConfig, DmaMode, InterlaceMode, REG_MODE1, Registers};
use sprite::SpriteLine;
use timing::{FramePhase, LineEvents, Timing, VideoRegion};

bitflags! {
    /// Status port bits. Bits 13, 12 and 10 always read as one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u16 {
        const FIXED = 0x3400;
        const FIFO_EMPTY = 0x0200;
        const VINT_PENDING = 0x0080;
        const SPRITE_OVERFLOW = 0x0040;
        const SPRITE_COLLISION = 0x0020;
        const ODD_FRAME = 0x0010;
        const VBLANK = 0x0008;
        const HBLANK = 0x0004;
        const DMA_BUSY = 0x0002;
        const PAL = 0x0001;

        const STICKY = Self::SPRITE_OVERFLOW.bits() | Self::SPRITE_COLLISION.bits();
    }
}

/// Display mode as a CPU-side collaborator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeBits {
    pub h40: bool,
    pub v30: bool,
    pub interlace: InterlaceMode,
    pub pal: bool,
    pub shadow_highlight: bool,
}

type InterruptHandler = Box<dyn FnMut()>;

pub struct Vdp {
    memory: VideoMemory,
    registers: Registers,
    port: AccessPort,
    dma: DmaEngine,
    /// A fill was requested and waits for the data word that starts it.
    fill_armed: bool,
    timing: Timing,
    sticky: StatusFlags,
    hv_latch: Option<u16>,
    previous_line_overflowed: bool,
    budget: DmaBudget,
    colors: ColorTables,
    layers: Box<LineLayers>,
    composed: LineBuffer,
    dma_source: Option<Box<dyn DmaSource>>,
    on_vint: Option<InterruptHandler>,
    on_hint: Option<InterruptHandler>,
}

impl Vdp {
    pub fn new() -> Self {
        Self::with_config(&VdpConfig::default())
    }

    pub fn with_config(config: &VdpConfig) -> Self {
        let mut vdp = Self {
            memory: VideoMemory::new(),
            registers: Registers::new(),
            port: AccessPort::new(),
            dma: DmaEngine::new(),
            fill_armed: false,
            timing: Timing::new(config.region),
            sticky: StatusFlags::empty(),
            hv_latch: None,
            previous_line_overflowed: false,
            budget: config.dma_budget,
            colors: ColorTables::new(),
            layers: Box::new(LineLayers::new()),
            composed: blank_line(),
            dma_source: None,
            on_vint: None,
            on_hint: None,
        };
        for (&index, &value) in &config.registers {
            vdp.write_register(index as usize, value);
        }
        vdp
    }

    /// Clears memories, registers and counters. Attached callbacks and the
    /// region stay.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers = Registers::new();
        self.port = AccessPort::new();
        self.dma = DmaEngine::new();
        self.fill_armed = false;
        self.timing = Timing::new(self.timing.region());
        self.sticky = StatusFlags::empty();
        self.hv_latch = None;
        self.previous_line_overflowed = false;
        log::debug!("VDP reset");
    }

    // Collaborators

    pub fn set_dma_source(&mut self, source: impl DmaSource + 'static) {
        self.dma_source = Some(Box::new(source));
    }

    pub fn set_vint_handler(&mut self, handler: impl FnMut() + 'static) {
        self.on_vint = Some(Box::new(handler));
    }

    pub fn set_hint_handler(&mut self, handler: impl FnMut() + 'static) {
        self.on_hint = Some(Box::new(handler));
    }

    // Registers and ports

    pub fn read_register(&self, index: usize) -> u8 {
        self.registers.read(index)
    }

    pub fn write_register(&mut self, index: usize, value: u8) {
        let was_latched = self.registers.config().hv_latch;
        if !self.registers.write(index, value) {
            return;
        }
        if index == REG_MODE1 {
            match (was_latched, self.registers.config().hv_latch) {
                (false, true) => self.hv_latch = Some(self.timing.hv_counter()),
                (true, false) => self.hv_latch = None,
                _ => {}
            }
        }
    }

    pub fn write_control_port(&mut self, word: u16) {
        #[cfg(feature = "trace-ports")]
        log::trace!("control <- 0x{:04X}", word);
        match self.port.write_control(word) {
            ControlWrite::Register { index, value } => self.write_register(index, value),
            ControlWrite::FirstHalf => {}
            ControlWrite::Command { target, address, dma } => {
                log::trace!("port command {:?} at 0x{:04X}", target, address);
                if dma && self.registers.config().dma_enabled {
                    self.request_dma(target, address);
                }
            }
        }
    }

    fn request_dma(&mut self, target: AccessTarget, address: u16) {
        self.port.clear_dma_request();
        if self.dma.is_active() || self.fill_armed {
            log::warn!("DMA request at 0x{:04X} ignored, transfer already running", address);
            return;
        }
        let cfg = *self.registers.config();
        let words = match cfg.dma_length {
            0 => 0x1_0000,
            n => n as u32,
        };
        let destination = address as u32;
        match cfg.dma_mode {
            DmaMode::MemoryToVdp => {
                let kind = match target {
                    AccessTarget::VramWrite => DmaKind::MemoryToVram,
                    AccessTarget::CramWrite => DmaKind::MemoryToCram,
                    AccessTarget::VsramWrite => DmaKind::MemoryToVsram,
                    other => {
                        log::warn!("memory DMA to {:?} ignored", other);
                        return;
                    }
                };
                self.dma.start_stepped(
                    kind,
                    cfg.dma_memory_source,
                    destination,
                    words * 2,
                    cfg.auto_increment,
                );
            }
            DmaMode::Fill => {
                log::debug!("DMA fill armed at 0x{:04X}", address);
                self.fill_armed = true;
            }
            DmaMode::Copy => {
                self.dma.start_stepped(
                    DmaKind::Copy,
                    cfg.dma_copy_source as u32,
                    destination,
                    words,
                    cfg.auto_increment,
                );
            }
        }
    }

    pub fn write_data_port(&mut self, word: u16) {
        #[cfg(feature = "trace-ports")]
        log::trace!("data <- 0x{:04X}", word);
        self.port.clear_pending();
        let target = self.port.target();
        let address = self.port.address();
        self.memory.write_target(target, address, word);

        if self.fill_armed {
            self.fill_armed = false;
            let cfg = self.registers.config();
            if target == AccessTarget::VramWrite {
                let length = match cfg.dma_length {
                    0 => 0x1_0000,
                    n => n as u32,
                };
                let (increment, value) = (cfg.auto_increment, (word >> 8) as u8);
                self.dma.start_stepped(DmaKind::Fill { value }, 0, address as u32, length, increment);
            } else {
                log::warn!("DMA fill to {:?} ignored", target);
            }
        }
        self.port.advance(self.registers.config().auto_increment);
    }

    pub fn read_data_port(&mut self) -> u16 {
        self.port.clear_pending();
        let value = self.memory.read_target(self.port.target(), self.port.address());
        self.port.advance(self.registers.config().auto_increment);
        #[cfg(feature = "trace-ports")]
        log::trace!("data -> 0x{:04X}", value);
        value
    }

    /// Status word without the read side effects.
    pub fn status(&self) -> u16 {
        let cfg = self.registers.config();
        let t = &self.timing.state;
        let mut flags = StatusFlags::FIXED | StatusFlags::FIFO_EMPTY | self.sticky;
        flags.set(StatusFlags::VINT_PENDING, t.vint_pending);
        flags.set(StatusFlags::ODD_FRAME, t.odd_frame);
        flags.set(StatusFlags::VBLANK, t.in_vblank || !cfg.display_enabled);
        flags.set(StatusFlags::HBLANK, self.in_hblank());
        flags.set(StatusFlags::DMA_BUSY, self.dma.is_active() || self.fill_armed);
        flags.set(StatusFlags::PAL, self.is_pal());
        flags.bits()
    }

    /// Reads the status port. Clears the collision latch and any half-written
    /// command.
    pub fn read_status(&mut self) -> u16 {
        let value = self.status();
        self.port.clear_pending();
        self.sticky.remove(StatusFlags::SPRITE_COLLISION);
        value
    }

    pub fn read_hv_counter(&self) -> u16 {
        self.hv_latch.unwrap_or_else(|| self.timing.hv_counter())
    }

    /// Port map as seen from the CPU bus: data at 0x0-0x3, control and status
    /// at 0x4-0x7, HV counter at 0x8-0xF.
    pub fn read_port(&mut self, offset: u32) -> u16 {
        match offset & 0x0F {
            0x0..=0x3 => self.read_data_port(),
            0x4..=0x7 => self.read_status(),
            _ => self.read_hv_counter(),
        }
    }

    pub fn write_port(&mut self, offset: u32, word: u16) {
        match offset & 0x0F {
            0x0..=0x3 => self.write_data_port(word),
            0x4..=0x7 => self.write_control_port(word),
            _ => log::warn!("write to read-only VDP port 0x{:X} ignored", offset & 0x0F),
        }
    }

    // DMA

    pub fn dma_start(&mut self, kind: DmaKind, source: u32, destination: u32, length: u32) -> bool {
        self.dma.start(kind, source, destination, length)
    }

    /// Runs the engine for `budget` bytes. Returns the number moved.
    pub fn dma_tick(&mut self, budget: usize) -> usize {
        self.dma.tick(budget, &mut self.memory, self.dma_source.as_deref_mut())
    }

    pub fn dma_active(&self) -> bool {
        self.dma.is_active()
    }

    pub fn dma_state(&self) -> &DmaState {
        self.dma.state()
    }

    // Rendering

    pub fn render_plane_line(&self, plane: Plane, line: usize, out: &mut [ScanlinePixel]) {
        plane::render_plane_line(&self.memory, self.registers.config(), plane, line, out);
    }

    pub fn render_window_line(&self, line: usize, out: &mut [ScanlinePixel]) {
        plane::render_window_line(&self.memory, self.registers.config(), line, out);
    }

    pub fn is_point_in_window(&self, x: usize, y: usize) -> bool {
        WindowRegion::from_config(self.registers.config()).contains(x, y)
    }

    pub fn collect_sprites(&self, line: usize) -> SpriteLine {
        sprite::collect_line(
            &self.memory,
            self.registers.config(),
            line,
            self.previous_line_overflowed,
        )
    }

    /// Draws the sprite layer for `line` into `out` and updates the overflow
    /// and collision flags.
    pub fn render_sprites_line(&mut self, line: usize, out: &mut [ScanlinePixel]) {
        let sprites = self.collect_sprites(line);
        let width = self.screen_width();
        let outcome = sprite::draw_line(&self.memory, &sprites, width, out);
        let overflow = sprites.overflow || outcome.dot_overflow;
        if overflow {
            self.sticky.insert(StatusFlags::SPRITE_OVERFLOW);
        }
        if outcome.collision {
            self.sticky.insert(StatusFlags::SPRITE_COLLISION);
        }
        self.previous_line_overflowed = overflow;
    }

    /// Fills the internal layer buffers for `line`.
    fn render_layers(&mut self, line: usize) {
        self.layers.clear();
        let cfg = self.registers.config();
        plane::render_plane_line(&self.memory, cfg, Plane::B, line, &mut self.layers.plane_b);
        plane::render_plane_line(&self.memory, cfg, Plane::A, line, &mut self.layers.plane_a);
        plane::render_window_line(&self.memory, cfg, line, &mut self.layers.window);
        let mut sprites = blank_line();
        self.render_sprites_line(line, &mut sprites);
        self.layers.sprites = sprites;
    }

    fn background_pixel(&self) -> ScanlinePixel {
        let cfg = self.registers.config();
        ScanlinePixel {
            color_index: cfg.background_index,
            palette: cfg.background_palette,
            ..ScanlinePixel::TRANSPARENT
        }
    }

    /// Composites the layer buffers of `line` into the output line. With the
    /// display off the line is solid background.
    pub fn combine_line(&mut self, line: usize) {
        let cfg = *self.registers.config();
        let background = self.background_pixel();
        if !cfg.display_enabled {
            self.composed.fill(background);
            return;
        }
        let composition = Composition {
            layers: &self.layers,
            window: WindowRegion::from_config(&cfg),
            line,
            width: cfg.screen_width(),
            background,
            shadow_highlight: cfg.shadow_highlight,
        };
        composition.combine_line(&mut self.composed);
    }

    pub fn composed_line(&self) -> &[ScanlinePixel] {
        &self.composed[..self.screen_width()]
    }

    pub fn pixel_to_color(&self, pixel: &ScanlinePixel) -> u32 {
        self.colors.pixel_to_color(pixel, &self.memory)
    }

    /// Writes the composed line into row `line` of `frame`. Rows that do not
    /// fit in the buffer are skipped.
    pub fn render_line_to_framebuffer(&self, line: usize, frame: &mut [u32], stride: usize) {
        let width = self.screen_width().min(stride);
        let start = line * stride;
        let Some(row) = frame.get_mut(start..start + width) else {
            return;
        };
        for (dst, px) in row.iter_mut().zip(self.composed.iter()) {
            *dst = self.colors.pixel_to_color(px, &self.memory);
        }
    }

    /// Full pipeline for one line: layers, composition, colour conversion.
    pub fn render_line(&mut self, line: usize, frame: &mut [u32], stride: usize) {
        if self.registers.config().display_enabled {
            self.render_layers(line);
        }
        self.combine_line(line);
        self.render_line_to_framebuffer(line, frame, stride);
    }

    // Timing

    /// Runs one scanline: render if visible, clock the line counter, enter
    /// vertical blanking, spend the DMA budget, then move to the next line.
    pub fn run_scanline(&mut self, frame: &mut [u32], stride: usize) -> LineEvents {
        let mut events = LineEvents::empty();
        let cfg = *self.registers.config();
        let active = cfg.active_lines();
        let line = self.timing.scanline();
        let phase = self.timing.phase(active);

        if phase == FramePhase::ActiveDisplay {
            self.render_line(line as usize, frame, stride);
        }

        if self.timing.clock_hint_counter(active, cfg.hint_reload) && cfg.hint_enabled {
            self.timing.state.hint_pending = true;
            events |= LineEvents::HINT;
            if let Some(handler) = self.on_hint.as_mut() {
                handler();
            }
        }

        if phase == FramePhase::VBlankStart {
            self.timing.state.in_vblank = true;
            events |= LineEvents::VBLANK_START;
            if cfg.vint_enabled {
                self.timing.state.vint_pending = true;
                events |= LineEvents::VINT;
                if let Some(handler) = self.on_vint.as_mut() {
                    handler();
                }
            }
        }

        if self.dma.is_active() {
            let blanking = phase != FramePhase::ActiveDisplay || !cfg.display_enabled;
            let budget = self.budget.for_line(self.dma.state().kind, cfg.h40, blanking);
            self.dma_tick(budget);
        }

        if self.timing.next_line(cfg.interlace != InterlaceMode::Off) {
            events |= LineEvents::FRAME_END;
            log::trace!("frame {} complete", self.timing.state.frame);
        }
        events
    }

    /// Runs scanlines until the frame wraps. Returns every event raised.
    pub fn run_frame(&mut self, frame: &mut [u32], stride: usize) -> LineEvents {
        let mut events = LineEvents::empty();
        loop {
            let line_events = self.run_scanline(frame, stride);
            events |= line_events;
            if line_events.contains(LineEvents::FRAME_END) {
                return events;
            }
        }
    }

    pub fn advance_dots(&mut self, dots: u16) {
        let h40 = self.registers.config().h40;
        self.timing.advance_dots(dots, h40);
    }

    pub fn acknowledge_vint(&mut self) {
        self.timing.state.vint_pending = false;
    }

    pub fn acknowledge_hint(&mut self) {
        self.timing.state.hint_pending = false;
    }

    // Queries

    pub fn scanline(&self) -> u16 {
        self.timing.scanline()
    }

    pub fn frame_count(&self) -> u64 {
        self.timing.state.frame
    }

    pub fn in_hblank(&self) -> bool {
        self.timing.in_hblank(self.screen_width())
    }

    pub fn in_vblank(&self) -> bool {
        self.timing.state.in_vblank
    }

    pub fn vint_pending(&self) -> bool {
        self.timing.state.vint_pending
    }

    pub fn hint_pending(&self) -> bool {
        self.timing.state.hint_pending
    }

    pub fn sprite_overflow(&self) -> bool {
        self.sticky.contains(StatusFlags::SPRITE_OVERFLOW)
    }

    pub fn sprite_collision(&self) -> bool {
        self.sticky.contains(StatusFlags::SPRITE_COLLISION)
    }

    pub fn clear_sprite_overflow(&mut self) {
        self.sticky.remove(StatusFlags::SPRITE_OVERFLOW);
    }

    pub fn clear_sprite_collision(&mut self) {
        self.sticky.remove(StatusFlags::SPRITE_COLLISION);
    }

    pub fn mode_bits(&self) -> ModeBits {
        let cfg = self.registers.config();
        ModeBits {
            h40: cfg.h40,
            v30: cfg.v30,
            interlace: cfg.interlace,
            pal: self.is_pal(),
            shadow_highlight: cfg.shadow_highlight,
        }
    }

    pub fn is_pal(&self) -> bool {
        self.timing.region() == VideoRegion::Pal
    }

    pub fn is_h40(&self) -> bool {
        self.registers.config().h40
    }

    pub fn interlace(&self) -> InterlaceMode {
        self.registers.config().interlace
    }

    pub fn screen_width(&self) -> usize {
        self.registers.config().screen_width()
    }

    pub fn screen_height(&self) -> usize {
        self.registers.config().active_lines() as usize
    }

    pub fn config(&self) -> &DisplayConfig {
        self.registers.config()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &VideoMemory {
        &self.memory
    }

    pub fn color_tables(&self) -> &ColorTables {
        &self.colors
    }
}

impl Default for Vdp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn set_address(vdp: &mut Vdp, first: u16, second: u16) {
        vdp.write_control_port(first);
        vdp.write_control_port(second);
    }

    #[test]
    fn register_write_through_control_port() {
        let mut vdp = Vdp::new();
        vdp.write_control_port(0x8C81);
        assert_eq!(vdp.read_register(12), 0x81);
        assert!(vdp.is_h40());
        assert_eq!(vdp.screen_width(), 320);
        vdp.write_control_port(0x9F55); // register 31
        assert_eq!(vdp.read_register(31), 0);
    }

    #[test]
    fn vram_write_then_read_with_increment() {
        let mut vdp = Vdp::new();
        vdp.write_register(15, 2);
        set_address(&mut vdp, 0x4000 | 0x0100, 0x0000);
        for w in [0x1111, 0x2222, 0x3333] {
            vdp.write_data_port(w);
        }
        set_address(&mut vdp, 0x0100, 0x0000);
        let got: Vec<u16> = (0..3).map(|_| vdp.read_data_port()).collect();
        assert_eq!(got, vec![0x1111, 0x2222, 0x3333]);
    }

    #[test]
    fn cram_write_masks_to_twelve_bits() {
        let mut vdp = Vdp::new();
        vdp.write_register(15, 2);
        set_address(&mut vdp, 0xC000 | (3 << 1), 0x0000);
        vdp.write_data_port(0xFEEE);
        assert_eq!(vdp.memory().cram(3), 0x0EEE);
        set_address(&mut vdp, 3 << 1, 0x0020);
        assert_eq!(vdp.read_data_port(), 0x0EEE);
    }

    #[test]
    fn status_read_clears_collision_and_pending() {
        let mut vdp = Vdp::new();
        vdp.sticky.insert(StatusFlags::SPRITE_COLLISION | StatusFlags::SPRITE_OVERFLOW);
        vdp.write_control_port(0x4000);
        let status = vdp.read_status();
        assert_ne!(status & StatusFlags::SPRITE_COLLISION.bits(), 0);
        assert_eq!(status & 0x3600, 0x3600);
        assert!(!vdp.sprite_collision());
        assert!(vdp.sprite_overflow());
        assert!(!vdp.port.is_pending());
        vdp.clear_sprite_overflow();
        assert!(!vdp.sprite_overflow());
    }

    #[test]
    fn sprite_link_cycle_raises_overflow_status() {
        let mut vdp = Vdp::new();
        vdp.write_register(5, 0x78); // sprite table at 0xF000
        vdp.write_register(15, 2);
        set_address(&mut vdp, 0x4000 | 0x3000, 0x0003);
        // 0 -> 1 -> 2 -> 1
        for (link, x) in [(1u16, 130u16), (2, 140), (1, 150)] {
            for word in [128, link, 1, x] {
                vdp.write_data_port(word);
            }
        }
        let mut out = blank_line();
        vdp.render_sprites_line(0, &mut out);
        assert!(vdp.sprite_overflow());
        assert_ne!(vdp.read_status() & StatusFlags::SPRITE_OVERFLOW.bits(), 0);
    }

    #[test]
    fn status_reports_blanking_when_display_off() {
        let vdp = Vdp::new();
        assert_ne!(vdp.status() & StatusFlags::VBLANK.bits(), 0);
        let pal = Vdp::with_config(&VdpConfig {
            region: VideoRegion::Pal,
            ..VdpConfig::default()
        });
        assert_ne!(pal.status() & StatusFlags::PAL.bits(), 0);
    }

    #[test]
    fn fill_dma_via_ports() {
        let mut vdp = Vdp::new();
        vdp.write_register(1, 0x14); // DMA on, mode 5
        vdp.write_register(15, 1);
        vdp.write_register(19, 0x10); // 16 bytes
        vdp.write_register(20, 0x00);
        vdp.write_register(23, 0x80);
        set_address(&mut vdp, 0x4000 | 0x0200, 0x0080);
        assert!(!vdp.dma_active());
        vdp.write_data_port(0xAA00);
        assert!(vdp.dma_active());
        vdp.dma_tick(1000);
        assert!(!vdp.dma_active());
        assert!((0x200..0x210).all(|a| vdp.memory().vram_byte(a) == 0xAA));
    }

    #[test]
    fn copy_dma_via_ports() {
        let mut vdp = Vdp::new();
        vdp.write_register(15, 2);
        set_address(&mut vdp, 0x4000 | 0x0040, 0x0000);
        vdp.write_data_port(0x1234);
        vdp.write_data_port(0x5678);
        vdp.write_register(1, 0x14);
        vdp.write_register(15, 1);
        vdp.write_register(19, 4);
        vdp.write_register(21, 0x40);
        vdp.write_register(22, 0x00);
        vdp.write_register(23, 0xC0);
        set_address(&mut vdp, 0x0800, 0x00C0);
        assert!(vdp.dma_active());
        vdp.dma_tick(4);
        assert_eq!(vdp.memory().vram_word(0x0800), 0x1234);
        assert_eq!(vdp.memory().vram_word(0x0802), 0x5678);
    }

    #[test]
    fn memory_dma_via_ports_reads_source() {
        let mut vdp = Vdp::new();
        vdp.set_dma_source(|addr: u32| addr as u8);
        vdp.write_register(1, 0x14);
        vdp.write_register(15, 2);
        vdp.write_register(19, 2); // two words
        vdp.write_register(21, 0x00);
        vdp.write_register(22, 0x08); // source 0x1000
        vdp.write_register(23, 0x00);
        set_address(&mut vdp, 0xC000, 0x0080);
        assert_eq!(vdp.dma_state().kind, DmaKind::MemoryToCram);
        vdp.dma_tick(4);
        assert!(!vdp.dma_active());
        assert_eq!(vdp.memory().cram(0), 0x0001);
        assert_eq!(vdp.memory().cram(1), 0x0203);
    }

    #[test]
    fn dma_bit_ignored_when_disabled() {
        let mut vdp = Vdp::new();
        vdp.write_register(19, 4);
        vdp.write_register(23, 0xC0);
        set_address(&mut vdp, 0x4000, 0x0080);
        assert!(!vdp.dma_active());
    }

    #[test]
    fn hv_counter_latches_while_bit_set() {
        let mut vdp = Vdp::new();
        vdp.advance_dots(100);
        let before = vdp.read_hv_counter();
        vdp.write_register(0, 0x02);
        vdp.advance_dots(50);
        assert_eq!(vdp.read_hv_counter(), before);
        vdp.write_register(0, 0x00);
        assert_ne!(vdp.read_hv_counter(), before);
    }

    #[test]
    fn port_map_routes_offsets() {
        let mut vdp = Vdp::new();
        vdp.write_port(0x4, 0x8F02);
        vdp.write_port(0x4, 0x4000);
        vdp.write_port(0x6, 0x0000);
        vdp.write_port(0x0, 0xCAFE);
        assert_eq!(vdp.memory().vram_word(0), 0xCAFE);
        assert_eq!(vdp.read_port(0x4) & 0x3400, 0x3400);
        assert_eq!(vdp.read_port(0x8), vdp.read_hv_counter());
    }

    #[test]
    fn vint_fires_on_first_blank_line() {
        let mut vdp = Vdp::new();
        vdp.write_register(1, 0x64);
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);
        vdp.set_vint_handler(move || seen.set(seen.get() + 1));
        let mut vint_line = None;
        for _ in 0..262 {
            let line = vdp.scanline();
            if vdp.run_scanline(&mut [], 0).contains(LineEvents::VINT) {
                vint_line = Some(line);
            }
        }
        assert_eq!(vint_line, Some(224));
        assert_eq!(count.get(), 1);
        assert!(vdp.vint_pending());
        vdp.acknowledge_vint();
        assert!(!vdp.vint_pending());
        assert_eq!(vdp.frame_count(), 1);
    }

    #[test]
    fn hint_fires_on_reload_cadence() {
        let mut vdp = Vdp::new();
        vdp.write_register(0, 0x10);
        vdp.write_register(10, 15);
        let mut lines = Vec::new();
        for _ in 0..262 {
            let line = vdp.scanline();
            if vdp.run_scanline(&mut [], 0).contains(LineEvents::HINT) {
                lines.push(line);
            }
        }
        assert_eq!(lines.first(), Some(&0));
        assert!(lines.windows(2).all(|w| w[1] - w[0] == 16));
        assert!(lines.iter().all(|&l| l <= 224));
        assert!(vdp.hint_pending());
    }

    #[test]
    fn dma_progresses_only_when_lines_run() {
        let mut vdp = Vdp::new();
        vdp.dma_start(DmaKind::Fill { value: 1 }, 0, 0, 1000);
        assert_eq!(vdp.dma_state().remaining, 1000);
        // Display off counts as blanking: 167 bytes per H32 line.
        vdp.run_scanline(&mut [], 0);
        assert_eq!(vdp.dma_state().remaining, 1000 - 167);
        vdp.run_scanline(&mut [], 0);
        assert_eq!(vdp.dma_state().remaining, 1000 - 2 * 167);
    }

    #[test]
    fn display_off_renders_background_only() {
        let mut vdp = Vdp::new();
        vdp.write_register(7, 0x05);
        vdp.write_register(15, 2);
        set_address(&mut vdp, 0xC000 | (5 << 1), 0x0000);
        vdp.write_data_port(0x0F00);
        let mut frame = vec![0u32; 256];
        vdp.render_line(0, &mut frame, 256);
        assert!(frame.iter().all(|&p| p == 0x00FF_0000));
    }

    #[test]
    fn config_registers_applied_at_construction() {
        let mut config = VdpConfig::default();
        config.registers.insert(12, 0x81);
        let vdp = Vdp::with_config(&config);
        assert!(vdp.is_h40());
        assert!(vdp.mode_bits().h40);
    }
}
