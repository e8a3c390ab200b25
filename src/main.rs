// Copyright (C) 2025 Dayton Fishell
// MD-VDP Video Display Processor Emulator
// This file is part of MD-VDP.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version. See the LICENSE file in the project root for details.
// SPDX-License-Identifier: GPL-3.0-or-later

// A simple demo program for the MD-VDP emulator.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result};
use mdvdp_core::{LineEvents, Vdp, VdpConfig, WorkRam};

const SOURCE: u32 = 0xFF_0000;

fn dma_from_ram(vdp: &mut Vdp, source: u32, words: u16, command: (u16, u16)) {
    vdp.write_control_port(0x9300 | (words & 0xFF));
    vdp.write_control_port(0x9400 | (words >> 8));
    vdp.write_control_port(0x9500 | ((source >> 1) & 0xFF) as u16);
    vdp.write_control_port(0x9600 | ((source >> 9) & 0xFF) as u16);
    vdp.write_control_port(0x9700 | ((source >> 17) & 0x7F) as u16);
    vdp.write_control_port(command.0);
    vdp.write_control_port(command.1 | 0x0080);
}

fn main() -> Result<()> {
    env_logger::init();

    println!("MD-VDP Emulator v0.1.0");
    println!("======================");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            VdpConfig::from_path(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => VdpConfig::default(),
    };
    println!("Region: {:?}", config.region);

    let mut vdp = Vdp::with_config(&config);
    let ram = Rc::new(RefCell::new(WorkRam::new()));
    let dma_ram = Rc::clone(&ram);
    vdp.set_dma_source(move |addr: u32| dma_ram.borrow().read_u8(addr));

    let vints = Rc::new(Cell::new(0u32));
    let seen = Rc::clone(&vints);
    vdp.set_vint_handler(move || seen.set(seen.get() + 1));

    // Mode 5, H32, DMA on; plane A at 0xC000, plane B at 0xE000, sprites at 0xF000.
    for word in [0x8004, 0x8174, 0x8230, 0x8407, 0x8578, 0x8700, 0x8B00, 0x8C00, 0x8D3F, 0x8F02, 0x9000] {
        vdp.write_control_port(word);
    }

    // Two solid tiles and a four-colour palette staged in work RAM.
    let tiles: Vec<u16> = std::iter::repeat_n(0x1111, 16).chain(std::iter::repeat_n(0x2222, 16)).collect();
    ram.borrow_mut().write_words(SOURCE, &tiles);
    ram.borrow_mut().write_words(SOURCE + 0x100, &[0x0000, 0x0F00, 0x00F0, 0x000F]);

    println!("Uploading tiles and palette by DMA...");
    dma_from_ram(&mut vdp, SOURCE, 32, (0x4020, 0x0000));
    while vdp.dma_active() {
        vdp.run_scanline(&mut [], 0);
    }
    dma_from_ram(&mut vdp, SOURCE + 0x100, 4, (0xC000, 0x0000));
    while vdp.dma_active() {
        vdp.run_scanline(&mut [], 0);
    }

    // Checkerboard of tiles 1 and 2 on plane A.
    vdp.write_control_port(0x4000);
    vdp.write_control_port(0x0003);
    for row in 0..28u16 {
        for col in 0..32u16 {
            vdp.write_data_port(if (row + col) % 2 == 0 { 0x0001 } else { 0x0002 });
        }
    }

    let width = vdp.screen_width();
    let mut frame = vec![0u32; width * 240];
    let mut events = LineEvents::empty();
    for _ in 0..2 {
        events |= vdp.run_frame(&mut frame, width);
    }

    println!("Frame complete!");
    println!();
    println!("Final state:");
    println!("  Frames:        {}", vdp.frame_count());
    println!("  VINTs:         {}", vints.get());
    println!("  Events:        {:?}", events);
    println!("  Status:        0x{:04X}", vdp.status());
    println!("  Screen:        {}x{}", vdp.screen_width(), vdp.screen_height());
    println!("  Pixel (0,0):   0x{:06X}", frame[0]);
    println!("  Pixel (8,0):   0x{:06X}", frame[8]);
    println!();

    let checksum = frame.iter().fold(0u32, |acc, &p| acc.rotate_left(5) ^ p);
    println!("Framebuffer checksum: 0x{:08X}", checksum);

    if frame[0] == 0xFF0000 && frame[8] == 0x00FF00 {
        println!("✓ Demo scene rendered as expected!");
    } else {
        println!("✗ Demo scene did not render as expected.");
    }

    Ok(())
}
