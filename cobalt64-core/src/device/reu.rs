// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

use crate::util::interrupt_source;
use crate::util::Slot;

use super::cartridge::Wiring;

// Spec: Commodore 1764 RAM Expansion Module User's Guide
// Design:
//   Register file at $df00-$df0a; a DMA transfer walks the C64 and REU
//   addresses one byte per master cycle while the CPU is held off the bus
//   through the RDY line. Progression is driven by events in the expansion
//   slot so a transfer can be stalled by the VIC claiming the bus and
//   canceled by a register write or reset.

mod sr {
    pub const INTERRUPT_PENDING: usize = 7;
    pub const END_OF_BLOCK: usize = 6;
    pub const VERIFY_ERROR: usize = 5;
    pub const SIZE: usize = 4;
}

mod cr {
    pub const EXECUTE: usize = 7;
    pub const AUTOLOAD: usize = 5;
    pub const FF00_DISABLED: usize = 4;
}

mod imr {
    pub const INTERRUPT_ENABLE: usize = 7;
    pub const END_OF_BLOCK: usize = 6;
    pub const VERIFY_ERROR: usize = 5;
}

pub mod event {
    pub const INITIATE: u8 = 0;
    pub const TRANSFER: u8 = 1;
    pub const FINALIZE: u8 = 2;
}

#[derive(Clone, Copy, PartialEq)]
enum DmaMode {
    Stash,
    Fetch,
    Swap,
    Verify,
}

impl DmaMode {
    fn from(cr: u8) -> DmaMode {
        match cr & 0x03 {
            0 => DmaMode::Stash,
            1 => DmaMode::Fetch,
            2 => DmaMode::Swap,
            3 => DmaMode::Verify,
            _ => unreachable!(),
        }
    }
}

pub struct Reu {
    // Memory
    ram: Vec<u8>,
    // Register file
    sr: u8,
    cr: u8,
    c64_base: u16,
    c64_base_latch: u16,
    reu_base: u16,
    reu_base_latch: u16,
    bank: u8,
    bank_latch: u8,
    tlength: u16,
    tlength_latch: u16,
    imr: u8,
    acr: u8,
    upper_bank_bits: u32,
    // DMA state
    dma: Option<DmaMode>,
    swap_ff: bool,
}

impl Reu {
    pub fn new(kb: usize) -> Self {
        assert!(
            kb.is_power_of_two() && kb >= 128 && kb <= 16384,
            "invalid REU capacity {}",
            kb
        );
        Self {
            ram: vec![0; kb * 1024],
            sr: 0,
            cr: 0,
            c64_base: 0,
            c64_base_latch: 0,
            reu_base: 0,
            reu_base_latch: 0,
            bank: 0,
            bank_latch: 0,
            tlength: 0xffff,
            tlength_latch: 0xffff,
            imr: 0,
            acr: 0,
            upper_bank_bits: 0,
            dma: None,
            swap_ff: false,
        }
    }

    pub fn reset(&mut self) {
        // the size bit distinguishes the 1700 from the larger models
        self.sr = if self.ram.len() == 0x20000 {
            0x00
        } else {
            1 << sr::SIZE
        };
        self.cr = 0x10;
        self.c64_base = 0;
        self.c64_base_latch = 0;
        self.reu_base = 0;
        self.reu_base_latch = 0;
        self.bank = 0;
        self.bank_latch = 0;
        self.tlength = 0xffff;
        self.tlength_latch = 0xffff;
        self.imr = 0;
        self.acr = 0;
        self.upper_bank_bits = 0;
        self.dma = None;
        self.swap_ff = false;
    }

    /// Peek into expander memory, used by tests and the debugger.
    pub fn peek_ram(&self, address: usize) -> u8 {
        self.ram[address % self.ram.len()]
    }

    /// Command armed for a $ff00 trigger.
    pub fn is_armed(&self) -> bool {
        self.cr.get_bit(cr::EXECUTE) && !self.cr.get_bit(cr::FF00_DISABLED)
    }

    pub fn is_active(&self) -> bool {
        self.dma.is_some()
    }

    pub fn read_io2(&mut self, address: u16, wiring: &Wiring) -> u8 {
        let value = match address & 0x1f {
            0x00 => {
                let result = self.sr;
                // reading the status register clears the flags and releases
                // the interrupt line
                self.sr &= 0x1f;
                wiring
                    .irq_line
                    .borrow_mut()
                    .set_low(interrupt_source::EXPANSION, false);
                result
            }
            0x01 => self.cr,
            0x02 => (self.c64_base & 0xff) as u8,
            0x03 => (self.c64_base >> 8) as u8,
            0x04 => (self.reu_base & 0xff) as u8,
            0x05 => (self.reu_base >> 8) as u8,
            0x06 => self.bank | 0xf8,
            0x07 => (self.tlength & 0xff) as u8,
            0x08 => (self.tlength >> 8) as u8,
            0x09 => self.imr | 0x1f,
            0x0a => self.acr | 0x3f,
            _ => 0xff,
        };
        if log_enabled!(Level::Trace) {
            trace!(target: "reu::reg", "Read 0x{:02x} = 0x{:02x}", address & 0x1f, value);
        }
        value
    }

    pub fn write_io2(&mut self, address: u16, value: u8, wiring: &Wiring) {
        if log_enabled!(Level::Trace) {
            trace!(target: "reu::reg", "Write 0x{:02x} = 0x{:02x}", address & 0x1f, value);
        }
        match address & 0x1f {
            0x00 => {}
            0x01 => {
                // writing the command register aborts a running transfer
                if self.dma.is_some() {
                    self.cancel_dma(wiring);
                }
                self.cr = value;
                if value.get_bit(cr::EXECUTE) && value.get_bit(cr::FF00_DISABLED) {
                    self.initiate_dma(wiring);
                }
            }
            0x02 => {
                self.c64_base_latch = (self.c64_base_latch & 0xff00) | value as u16;
                self.c64_base = self.c64_base_latch;
            }
            0x03 => {
                self.c64_base_latch = (self.c64_base_latch & 0x00ff) | ((value as u16) << 8);
                self.c64_base = self.c64_base_latch;
            }
            0x04 => {
                self.reu_base_latch = (self.reu_base_latch & 0xff00) | value as u16;
                self.reu_base = self.reu_base_latch;
            }
            0x05 => {
                self.reu_base_latch = (self.reu_base_latch & 0x00ff) | ((value as u16) << 8);
                self.reu_base = self.reu_base_latch;
            }
            0x06 => {
                self.bank_latch = value & 0x07;
                self.bank = self.bank_latch;
                self.upper_bank_bits = match self.ram.len() {
                    0x100000 => ((value & 0b0000_1000) as u32) << 16,
                    0x200000 => ((value & 0b0001_1000) as u32) << 16,
                    0x400000 => ((value & 0b0011_1000) as u32) << 16,
                    0x800000 => ((value & 0b0111_1000) as u32) << 16,
                    0x1000000 => ((value & 0b1111_1000) as u32) << 16,
                    _ => 0,
                };
            }
            0x07 => {
                self.tlength_latch = (self.tlength_latch & 0xff00) | value as u16;
                self.tlength = self.tlength_latch;
            }
            0x08 => {
                self.tlength_latch = (self.tlength_latch & 0x00ff) | ((value as u16) << 8);
                self.tlength = self.tlength_latch;
            }
            0x09 => {
                self.imr = value;
                self.trigger_end_of_block_irq(wiring);
                self.trigger_verify_error_irq(wiring);
            }
            0x0a => {
                self.acr = value;
            }
            _ => {}
        }
    }

    pub fn initiate_dma(&mut self, wiring: &Wiring) {
        debug!(target: "reu", "Initiating DMA, mode {}", self.cr & 0x03);
        wiring.scheduler.borrow_mut().schedule(
            Slot::Expansion,
            event::INITIATE,
            wiring.clock.get(),
        );
    }

    pub fn process_event(&mut self, id: u8, wiring: &Wiring) {
        match id {
            event::INITIATE => {
                // execute bit clears, ff00 trigger disarms
                self.cr.set_bit(cr::EXECUTE, false);
                self.cr.set_bit(cr::FF00_DISABLED, true);
                self.dma = Some(DmaMode::from(self.cr));
                self.swap_ff = false;
                wiring
                    .rdy_line
                    .borrow_mut()
                    .set_low(interrupt_source::EXPANSION, true);
                self.schedule_next(wiring, event::TRANSFER);
            }
            event::TRANSFER => {
                // the VIC keeps the bus during badlines and sprite fetches
                if wiring.ba_line.borrow().is_low() {
                    self.schedule_next(wiring, event::TRANSFER);
                    return;
                }
                let done = self.do_dma(wiring);
                if done {
                    self.schedule_next(wiring, event::FINALIZE);
                } else {
                    self.schedule_next(wiring, event::TRANSFER);
                }
            }
            event::FINALIZE => {
                self.finalize_dma(wiring);
            }
            _ => panic!("invalid expansion event {}", id),
        }
    }

    /// One DMA cycle; returns true when the transfer is finished.
    fn do_dma(&mut self, wiring: &Wiring) -> bool {
        let mode = match self.dma {
            Some(mode) => mode,
            None => return true,
        };
        match mode {
            DmaMode::Stash => {
                let value = wiring.ram_64.borrow().read(self.c64_base);
                self.write_reu_ram(value);
                self.advance_addresses();
            }
            DmaMode::Fetch => {
                let value = self.read_reu_ram();
                wiring.ram_64.borrow_mut().write(self.c64_base, value);
                self.advance_addresses();
            }
            DmaMode::Swap => {
                // a swap moves a byte in each direction and takes two cycles
                self.swap_ff = !self.swap_ff;
                if self.swap_ff {
                    return false;
                }
                let c64_value = wiring.ram_64.borrow().read(self.c64_base);
                let reu_value = self.read_reu_ram();
                wiring.ram_64.borrow_mut().write(self.c64_base, reu_value);
                self.write_reu_ram(c64_value);
                self.advance_addresses();
            }
            DmaMode::Verify => {
                let c64_value = wiring.ram_64.borrow().read(self.c64_base);
                let reu_value = self.read_reu_ram();
                self.advance_addresses();
                if c64_value != reu_value {
                    debug!(
                        target: "reu",
                        "Verify error at 0x{:04x}", self.c64_base
                    );
                    self.sr.set_bit(sr::VERIFY_ERROR, true);
                    self.trigger_verify_error_irq(wiring);
                    return true;
                }
            }
        }
        if self.tlength == 1 {
            self.sr.set_bit(sr::END_OF_BLOCK, true);
            self.trigger_end_of_block_irq(wiring);
            true
        } else {
            self.tlength = self.tlength.wrapping_sub(1);
            false
        }
    }

    fn finalize_dma(&mut self, wiring: &Wiring) {
        self.dma = None;
        wiring
            .rdy_line
            .borrow_mut()
            .set_low(interrupt_source::EXPANSION, false);
        wiring.scheduler.borrow_mut().cancel(Slot::Expansion);
        if self.cr.get_bit(cr::AUTOLOAD) {
            self.c64_base = self.c64_base_latch;
            self.reu_base = self.reu_base_latch;
            self.bank = self.bank_latch;
            self.tlength = self.tlength_latch;
        }
    }

    /// Register writes or a reset abort a running transfer.
    pub fn cancel_dma(&mut self, wiring: &Wiring) {
        if self.dma.is_some() {
            self.finalize_dma(wiring);
        }
    }

    fn schedule_next(&self, wiring: &Wiring, id: u8) {
        wiring
            .scheduler
            .borrow_mut()
            .schedule(Slot::Expansion, id, wiring.clock.get() + 1);
    }

    fn reu_address(&self) -> u32 {
        (((self.bank as u32) << 16) | self.reu_base as u32) | self.upper_bank_bits
    }

    fn read_reu_ram(&self) -> u8 {
        let address = self.reu_address() as usize;
        self.ram[address % self.ram.len()]
    }

    fn write_reu_ram(&mut self, value: u8) {
        let address = self.reu_address() as usize % self.ram.len();
        self.ram[address] = value;
    }

    fn advance_addresses(&mut self) {
        // address control register bits fix either side of the transfer
        if !self.acr.get_bit(7) {
            self.c64_base = self.c64_base.wrapping_add(1);
        }
        if !self.acr.get_bit(6) {
            let expanded = (((self.bank as u32) << 16) | self.reu_base as u32).wrapping_add(1)
                & (self.ram.len() as u32 - 1);
            self.bank = ((expanded >> 16) & 0x07) as u8;
            self.reu_base = (expanded & 0xffff) as u16;
        }
    }

    fn trigger_end_of_block_irq(&mut self, wiring: &Wiring) {
        if self.imr.get_bit(imr::INTERRUPT_ENABLE)
            && self.imr.get_bit(imr::END_OF_BLOCK)
            && self.sr.get_bit(sr::END_OF_BLOCK)
        {
            self.sr.set_bit(sr::INTERRUPT_PENDING, true);
            wiring
                .irq_line
                .borrow_mut()
                .set_low(interrupt_source::EXPANSION, true);
        }
    }

    fn trigger_verify_error_irq(&mut self, wiring: &Wiring) {
        if self.imr.get_bit(imr::INTERRUPT_ENABLE)
            && self.imr.get_bit(imr::VERIFY_ERROR)
            && self.sr.get_bit(sr::VERIFY_ERROR)
        {
            self.sr.set_bit(sr::INTERRUPT_PENDING, true);
            wiring
                .irq_line
                .borrow_mut()
                .set_low(interrupt_source::EXPANSION, true);
        }
    }
}
