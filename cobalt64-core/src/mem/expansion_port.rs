// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;

use bit_field::BitField;

use crate::device::cartridge::Wiring;
use crate::device::Cartridge;
use crate::factory::{AddressableFaded, Bank};
use crate::util::{Clock, IoPort, IrqLine, Pin, Ram, Shared, SharedScheduler, Slot};

#[derive(Copy, Clone)]
enum IoLine {
    Game = 3,
    Exrom = 4,
}

impl IoLine {
    pub fn value(self) -> usize {
        self as usize
    }
}

/// The expansion port hands the machine lines to whatever cartridge is
/// plugged in and routes the ROML/ROMH windows and the I/O pages to it.
pub struct ExpansionPort {
    cartridge: Option<Cartridge>,
    // I/O
    io_line: Shared<IoPort>,
    irq_line: Shared<IrqLine>,
    nmi_line: Shared<IrqLine>,
    rdy_line: Shared<IrqLine>,
    ba_line: Shared<Pin>,
    ram_64: Shared<Ram>,
    clock: Rc<Clock>,
    scheduler: SharedScheduler,
}

impl ExpansionPort {
    #![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]
    pub fn new(
        io_line: Shared<IoPort>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
        rdy_line: Shared<IrqLine>,
        ba_line: Shared<Pin>,
        ram_64: Shared<Ram>,
        clock: Rc<Clock>,
        scheduler: SharedScheduler,
    ) -> Self {
        Self {
            cartridge: None,
            io_line,
            irq_line,
            nmi_line,
            rdy_line,
            ba_line,
            ram_64,
            clock,
            scheduler,
        }
    }

    pub fn attach(&mut self, mut cartridge: Cartridge) {
        info!(target: "expansion", "Attaching cartridge {:?}", cartridge.get_kind());
        cartridge.connect(Wiring {
            io_line: self.io_line.clone(),
            irq_line: self.irq_line.clone(),
            nmi_line: self.nmi_line.clone(),
            rdy_line: self.rdy_line.clone(),
            ba_line: self.ba_line.clone(),
            ram_64: self.ram_64.clone(),
            clock: self.clock.clone(),
            scheduler: self.scheduler.clone(),
        });
        cartridge.reset();
        self.cartridge = Some(cartridge);
    }

    pub fn detach(&mut self) -> Option<Cartridge> {
        let mut cartridge = self.cartridge.take();
        if let Some(ref mut cartridge) = cartridge {
            info!(target: "expansion", "Detaching cartridge {:?}", cartridge.get_kind());
            cartridge.disconnect();
        }
        self.scheduler.borrow_mut().cancel(Slot::Expansion);
        self.rdy_line
            .borrow_mut()
            .set_low(crate::util::interrupt_source::EXPANSION, false);
        self.nmi_line
            .borrow_mut()
            .set_low(crate::util::interrupt_source::EXPANSION, false);
        self.irq_line
            .borrow_mut()
            .set_low(crate::util::interrupt_source::EXPANSION, false);
        self.set_lines_inactive();
        cartridge
    }

    pub fn get_cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn get_cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    pub fn has_cartridge(&self) -> bool {
        self.cartridge.is_some()
    }

    fn set_lines_inactive(&mut self) {
        let mut io_value = 0u8;
        io_value.set_bit(IoLine::Game.value(), true);
        io_value.set_bit(IoLine::Exrom.value(), true);
        self.io_line.borrow_mut().set_value(io_value);
    }

    pub fn reset(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.reset();
        } else {
            self.set_lines_inactive();
        }
    }

    // -- Scheduling

    pub fn execute(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.execute();
        }
    }

    pub fn process_event(&mut self, id: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.process_event(id);
        }
    }

    // -- Front panel

    pub fn press_button(&mut self, button: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.press_button(button);
        }
    }

    pub fn release_button(&mut self, button: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.release_button(button);
        }
    }

    pub fn set_switch(&mut self, pos: i8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.set_switch(pos);
        }
    }

    // -- NMI hooks

    pub fn nmi_will_trigger(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.nmi_will_trigger();
        }
    }

    pub fn nmi_did_trigger(&mut self) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.nmi_did_trigger();
        }
    }

    // -- Router overrides

    pub fn peek_override(&self, zone: u8) -> Option<Bank> {
        self.cartridge
            .as_ref()
            .and_then(|cartridge| cartridge.peek_override(zone))
    }

    pub fn poke_override(&self, zone: u8) -> Option<Bank> {
        self.cartridge
            .as_ref()
            .and_then(|cartridge| cartridge.poke_override(zone))
    }

    // -- I/O space

    pub fn read_io(&mut self, address: u16) -> Option<u8> {
        self.cartridge.as_mut().and_then(|cartridge| {
            if address < 0xdf00 {
                cartridge.read_io1(address)
            } else {
                cartridge.read_io2(address)
            }
        })
    }

    pub fn write_io(&mut self, address: u16, value: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            if address < 0xdf00 {
                cartridge.write_io1(address, value);
            } else {
                cartridge.write_io2(address, value);
            }
        }
    }
}

impl AddressableFaded for ExpansionPort {
    fn read(&mut self, address: u16) -> Option<u8> {
        self.cartridge
            .as_mut()
            .and_then(|cartridge| cartridge.read(address))
    }

    fn write(&mut self, address: u16, value: u8) {
        if let Some(ref mut cartridge) = self.cartridge {
            cartridge.write(address, value);
        }
    }
}
