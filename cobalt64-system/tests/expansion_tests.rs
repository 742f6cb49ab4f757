// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use cobalt64_core::device::{Cartridge, CartridgeKind, ChipType, Packet};
use cobalt64_core::factory::SystemModel;
use cobalt64_core::util::new_shared;
use cobalt64_system::{C64, C64Factory, Config, FrameBuffer, Palette, SoundBuffer};

fn setup_c64() -> C64 {
    let config = Rc::new(Config::new(SystemModel::from("pal")));
    let factory = C64Factory::new(config.clone());
    let frame_buffer = new_shared(FrameBuffer::new(504, 312, Palette::default()));
    let sound_buffer = Arc::new(SoundBuffer::new(4096));
    let mut c64 = C64::build(config, &factory, frame_buffer, sound_buffer);
    c64.reset(true);
    c64
}

fn make_packet(bank: u8, offset: u16, fill: u8) -> Packet {
    Packet {
        chip_type: ChipType::Rom,
        bank_number: bank,
        offset,
        size: 0x2000,
        data: vec![fill; 0x2000],
    }
}

#[test]
fn ocean_bank_switch_through_the_bus() {
    let mut c64 = setup_c64();
    let mut cartridge = Cartridge::new(CartridgeKind::Ocean, false, true);
    for bank in 0..8 {
        cartridge.add(make_packet(bank, 0x8000, 0x40 + bank));
    }
    c64.attach_cartridge(cartridge);
    // writing the bank register at $de00 switches the page visible at $8000
    c64.get_cpu_mut().write(0xde00, 0x00);
    assert_eq!(0x40, c64.get_cpu().read(0x8000));
    c64.get_cpu_mut().write(0xde00, 0x03);
    assert_eq!(0x43, c64.get_cpu().read(0x8000));
}

#[test]
fn reu_stash_copies_c64_memory() {
    let mut c64 = setup_c64();
    c64.attach_cartridge(Cartridge::reu(256));
    // source data at $c000
    let pattern: Vec<u8> = (0..=255).collect();
    c64.load(&pattern, 0xc000);
    // program the register file: c64 base, reu base, bank, length
    {
        let cpu = c64.get_cpu_mut();
        cpu.write(0xdf02, 0x00);
        cpu.write(0xdf03, 0xc0);
        cpu.write(0xdf04, 0x00);
        cpu.write(0xdf05, 0x00);
        cpu.write(0xdf06, 0x00);
        cpu.write(0xdf07, 0x00);
        cpu.write(0xdf08, 0x01);
        // interrupt on end of block
        cpu.write(0xdf09, 0xc0);
        // stash with immediate execution
        cpu.write(0xdf01, 0x90);
    }
    // the transfer takes one cycle per byte plus stalls
    for _ in 0..200 {
        c64.step();
        let done = {
            let expansion_port = c64.get_expansion_port();
            let port = expansion_port.borrow();
            let cartridge = port.get_cartridge().unwrap();
            let reu = cartridge.get_reu().unwrap();
            !reu.is_active() && reu.peek_ram(255) == 255
        };
        if done {
            break;
        }
    }
    let expansion_port = c64.get_expansion_port();
    let port = expansion_port.borrow();
    let reu = port.get_cartridge().unwrap().get_reu().unwrap();
    for i in 0..256 {
        assert_eq!(i as u8, reu.peek_ram(i));
    }
    // END_OF_BLOCK and the interrupt flag are visible in the status register
    assert!(!reu.is_active());
}

#[test]
fn reu_status_reports_end_of_block() {
    let mut c64 = setup_c64();
    c64.attach_cartridge(Cartridge::reu(256));
    c64.load(&[0x5a; 16], 0x4000);
    {
        let cpu = c64.get_cpu_mut();
        cpu.write(0xdf02, 0x00);
        cpu.write(0xdf03, 0x40);
        cpu.write(0xdf07, 0x10);
        cpu.write(0xdf08, 0x00);
        cpu.write(0xdf01, 0x90);
    }
    for _ in 0..100 {
        c64.step();
    }
    let status = c64.get_cpu_mut().read(0xdf00);
    assert_eq!(0x40, status & 0x40);
}

#[test]
fn detached_cartridge_restores_memory_map() {
    let mut c64 = setup_c64();
    let mut cartridge = Cartridge::new(CartridgeKind::Ocean, false, true);
    cartridge.add(make_packet(0, 0x8000, 0x77));
    c64.attach_cartridge(cartridge);
    assert_eq!(0x77, c64.get_cpu().read(0x8000));
    c64.detach_cartridge();
    c64.get_cpu_mut().write(0x8000, 0x11);
    assert_eq!(0x11, c64.get_cpu().read(0x8000));
}
