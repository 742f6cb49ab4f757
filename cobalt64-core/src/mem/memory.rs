// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Spec: COMMODORE 64 MEMORY MAPS p. 263
// Design:
//   Inspired by UAE memory address64k/bank concepts. The address space is
//   split into sixteen 4K zones resolved against the MMU configuration;
//   after the base lookup the attached cartridge gets the last word, which
//   is how freezers overlay their RAM and the REU watches $ff00. In Ultimax
//   configurations writes to the cartridge windows reach the cartridge
//   instead of the shadow RAM.

use crate::factory::{Addressable, AddressableFaded, Bank, Mmu};
use crate::util::{Ram, Rom, Shared};

use super::pla::is_ultimax_mode;
use super::{ExpansionPort, Mmio};

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct Memory {
    // Configuration
    mmu: Shared<dyn Mmu>,
    // Addressable
    basic: Shared<Rom>,
    charset: Shared<Rom>,
    expansion_port: Shared<ExpansionPort>,
    io: Mmio,
    kernal: Shared<Rom>,
    ram: Shared<Ram>,
}

impl Memory {
    pub fn new(
        mmu: Shared<dyn Mmu>,
        expansion_port: Shared<ExpansionPort>,
        io: Mmio,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
    ) -> Self {
        Memory {
            mmu,
            basic: rom_basic,
            charset: rom_charset,
            expansion_port,
            io,
            kernal: rom_kernal,
            ram,
        }
    }

    fn map(&self, address: u16) -> Bank {
        let zone = (address >> 12) as u8;
        if let Some(bank) = self.expansion_port.borrow().peek_override(zone) {
            bank
        } else {
            self.mmu.borrow().map(address)
        }
    }

    fn map_write(&self, address: u16) -> Bank {
        let zone = (address >> 12) as u8;
        if let Some(bank) = self.expansion_port.borrow().poke_override(zone) {
            bank
        } else {
            self.mmu.borrow().map(address)
        }
    }
}

impl Addressable for Memory {
    fn read(&self, address: u16) -> u8 {
        match self.map(address) {
            Bank::Ram => self.ram.borrow().read(address),
            Bank::Basic => self.basic.borrow().read(address),
            Bank::Charset => self
                .charset
                .borrow()
                .read(address - BaseAddr::Charset.addr()),
            Bank::Kernal => self.kernal.borrow().read(address),
            Bank::RomL | Bank::RomH => self
                .expansion_port
                .borrow_mut()
                .read(address)
                .unwrap_or_else(|| self.ram.borrow().read(address)),
            Bank::Io => self.io.read(address),
            Bank::Disabled => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match self.map_write(address) {
            Bank::Ram | Bank::Basic | Bank::Charset | Bank::Kernal => {
                self.ram.borrow_mut().write(address, value)
            }
            Bank::RomL | Bank::RomH => {
                // the cartridge claims these writes when it overlays RAM or
                // the machine runs in Ultimax mode
                let ultimax = is_ultimax_mode(self.mmu.borrow().mode());
                let overridden = self
                    .expansion_port
                    .borrow()
                    .poke_override((address >> 12) as u8)
                    .is_some();
                if ultimax || overridden {
                    self.expansion_port.borrow_mut().write(address, value);
                } else {
                    self.ram.borrow_mut().write(address, value);
                }
            }
            Bank::Io => self.io.write(address, value),
            Bank::Disabled => {}
        }
    }
}
