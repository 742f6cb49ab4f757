// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

use crate::util::{IoPort, IrqLine, Pin, Shared, SharedCell};

// Spec: MOS 6522 VERSATILE INTERFACE ADAPTER datasheet
// Design:
//   Covers the functionality the 1541 logic board exercises: both ports
//   with direction registers, timers 1 and 2, the CA1 edge input, the
//   CA2/CB2 fixed output modes and the interrupt flag/enable pair. The
//   drive wires VIA 1 to the serial bus and VIA 2 to the drive mechanics.

pub mod reg {
    pub const ORB: u8 = 0x00;
    pub const ORA: u8 = 0x01;
    pub const DDRB: u8 = 0x02;
    pub const DDRA: u8 = 0x03;
    pub const T1CL: u8 = 0x04;
    pub const T1CH: u8 = 0x05;
    pub const T1LL: u8 = 0x06;
    pub const T1LH: u8 = 0x07;
    pub const T2CL: u8 = 0x08;
    pub const T2CH: u8 = 0x09;
    pub const SR: u8 = 0x0a;
    pub const ACR: u8 = 0x0b;
    pub const PCR: u8 = 0x0c;
    pub const IFR: u8 = 0x0d;
    pub const IER: u8 = 0x0e;
    pub const ORA_NO_HANDSHAKE: u8 = 0x0f;
}

mod int_flag {
    pub const CA2: usize = 0;
    pub const CA1: usize = 1;
    #[allow(dead_code)]
    pub const SHIFT: usize = 2;
    pub const CB2: usize = 3;
    pub const CB1: usize = 4;
    pub const TIMER_2: usize = 5;
    pub const TIMER_1: usize = 6;
}

pub struct Via {
    // Configuration
    irq_source: usize,
    // Functional units
    t1_counter: u16,
    t1_latch: u16,
    t1_running: bool,
    t2_counter: u16,
    t2_latch_lo: u8,
    t2_running: bool,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,
    sr: u8,
    // I/O
    port_a: Shared<IoPort>,
    port_b: Shared<IoPort>,
    ca1_pin: Shared<Pin>,
    ca2_out: SharedCell<bool>,
    cb2_out: SharedCell<bool>,
    irq_line: Shared<IrqLine>,
}

impl Via {
    pub fn new(
        irq_source: usize,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        ca1_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        Self {
            irq_source,
            t1_counter: 0,
            t1_latch: 0,
            t1_running: false,
            t2_counter: 0,
            t2_latch_lo: 0,
            t2_running: false,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            sr: 0,
            port_a,
            port_b,
            ca1_pin,
            ca2_out: crate::util::new_shared_cell(true),
            cb2_out: crate::util::new_shared_cell(true),
            irq_line,
        }
    }

    pub fn get_ca1_pin(&self) -> Shared<Pin> {
        self.ca1_pin.clone()
    }

    pub fn get_ca2_out(&self) -> SharedCell<bool> {
        self.ca2_out.clone()
    }

    pub fn get_cb2_out(&self) -> SharedCell<bool> {
        self.cb2_out.clone()
    }

    pub fn get_port_a(&self) -> Shared<IoPort> {
        self.port_a.clone()
    }

    pub fn get_port_b(&self) -> Shared<IoPort> {
        self.port_b.clone()
    }

    /// External CA1 transition, also delivered between clock calls.
    pub fn ca1_action(&mut self, level: bool) {
        let was_high = self.ca1_pin.borrow().is_high();
        self.ca1_pin.borrow_mut().set_active(level);
        let negative_edge = !self.pcr.get_bit(0);
        let edge = if negative_edge {
            was_high && !level
        } else {
            !was_high && level
        };
        if edge {
            self.ifr.set_bit(int_flag::CA1, true);
            self.update_irq_line();
        }
    }

    pub fn clock(&mut self) {
        // CA1 edges may also arrive through the shared pin
        if self.pcr.get_bit(0) {
            if self.ca1_pin.borrow().is_rising() {
                self.ifr.set_bit(int_flag::CA1, true);
            }
        } else if self.ca1_pin.borrow().is_falling() {
            self.ifr.set_bit(int_flag::CA1, true);
        }
        // Timer 1
        if self.t1_running {
            if self.t1_counter == 0 {
                self.ifr.set_bit(int_flag::TIMER_1, true);
                if self.acr.get_bit(6) {
                    // free running mode reloads from the latch
                    self.t1_counter = self.t1_latch;
                } else {
                    self.t1_running = false;
                }
            } else {
                self.t1_counter -= 1;
            }
        }
        // Timer 2 counts down once and sets its flag
        if self.t2_running && !self.acr.get_bit(5) {
            if self.t2_counter == 0 {
                self.ifr.set_bit(int_flag::TIMER_2, true);
                self.t2_running = false;
            } else {
                self.t2_counter -= 1;
            }
        }
        self.update_irq_line();
    }

    pub fn reset(&mut self) {
        self.t1_counter = 0;
        self.t1_latch = 0;
        self.t1_running = false;
        self.t2_counter = 0;
        self.t2_latch_lo = 0;
        self.t2_running = false;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.sr = 0;
        self.ca2_out.set(true);
        self.cb2_out.set(true);
        self.port_a.borrow_mut().reset();
        self.port_b.borrow_mut().reset();
        self.update_irq_line();
    }

    pub fn read(&mut self, reg: u8) -> u8 {
        let value = match reg & 0x0f {
            reg::ORB => {
                self.ifr.set_bit(int_flag::CB1, false);
                self.ifr.set_bit(int_flag::CB2, false);
                self.update_irq_line();
                self.port_b.borrow().get_value()
            }
            reg::ORA | reg::ORA_NO_HANDSHAKE => {
                if reg & 0x0f == reg::ORA {
                    self.ifr.set_bit(int_flag::CA1, false);
                    self.ifr.set_bit(int_flag::CA2, false);
                    self.update_irq_line();
                }
                self.port_a.borrow().get_value()
            }
            reg::DDRB => self.port_b.borrow().get_direction(),
            reg::DDRA => self.port_a.borrow().get_direction(),
            reg::T1CL => {
                self.ifr.set_bit(int_flag::TIMER_1, false);
                self.update_irq_line();
                (self.t1_counter & 0xff) as u8
            }
            reg::T1CH => (self.t1_counter >> 8) as u8,
            reg::T1LL => (self.t1_latch & 0xff) as u8,
            reg::T1LH => (self.t1_latch >> 8) as u8,
            reg::T2CL => {
                self.ifr.set_bit(int_flag::TIMER_2, false);
                self.update_irq_line();
                (self.t2_counter & 0xff) as u8
            }
            reg::T2CH => (self.t2_counter >> 8) as u8,
            reg::SR => self.sr,
            reg::ACR => self.acr,
            reg::PCR => self.pcr,
            reg::IFR => {
                let mut value = self.ifr;
                value.set_bit(7, self.ifr & self.ier & 0x7f != 0);
                value
            }
            reg::IER => self.ier | 0x80,
            _ => unreachable!(),
        };
        if log_enabled!(Level::Trace) {
            trace!(target: "via::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "via::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg & 0x0f {
            reg::ORB => {
                self.ifr.set_bit(int_flag::CB1, false);
                self.ifr.set_bit(int_flag::CB2, false);
                self.port_b.borrow_mut().set_value(value);
            }
            reg::ORA | reg::ORA_NO_HANDSHAKE => {
                if reg & 0x0f == reg::ORA {
                    self.ifr.set_bit(int_flag::CA1, false);
                    self.ifr.set_bit(int_flag::CA2, false);
                }
                self.port_a.borrow_mut().set_value(value);
            }
            reg::DDRB => self.port_b.borrow_mut().set_direction(value),
            reg::DDRA => self.port_a.borrow_mut().set_direction(value),
            reg::T1CL | reg::T1LL => {
                self.t1_latch = (self.t1_latch & 0xff00) | value as u16;
            }
            reg::T1CH => {
                self.t1_latch = (self.t1_latch & 0x00ff) | ((value as u16) << 8);
                self.t1_counter = self.t1_latch;
                self.t1_running = true;
                self.ifr.set_bit(int_flag::TIMER_1, false);
            }
            reg::T1LH => {
                self.t1_latch = (self.t1_latch & 0x00ff) | ((value as u16) << 8);
                self.ifr.set_bit(int_flag::TIMER_1, false);
            }
            reg::T2CL => {
                self.t2_latch_lo = value;
            }
            reg::T2CH => {
                self.t2_counter = ((value as u16) << 8) | self.t2_latch_lo as u16;
                self.t2_running = true;
                self.ifr.set_bit(int_flag::TIMER_2, false);
            }
            reg::SR => self.sr = value,
            reg::ACR => self.acr = value,
            reg::PCR => {
                self.pcr = value;
                // CA2 and CB2 fixed output modes drive the SOE and the
                // read/write select lines of the logic board
                match (value >> 1) & 0x07 {
                    0b110 => self.ca2_out.set(false),
                    0b111 => self.ca2_out.set(true),
                    _ => {}
                }
                match (value >> 5) & 0x07 {
                    0b110 => self.cb2_out.set(false),
                    0b111 => self.cb2_out.set(true),
                    _ => {}
                }
            }
            reg::IFR => {
                self.ifr &= !(value & 0x7f);
            }
            reg::IER => {
                if value.get_bit(7) {
                    self.ier |= value & 0x7f;
                } else {
                    self.ier &= !(value & 0x7f);
                }
            }
            _ => unreachable!(),
        }
        self.update_irq_line();
    }

    fn update_irq_line(&mut self) {
        let active = self.ifr & self.ier & 0x7f != 0;
        self.irq_line.borrow_mut().set_low(self.irq_source, active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{interrupt_source, new_shared};

    fn setup_via() -> (Via, Shared<IrqLine>, Shared<Pin>) {
        let port_a = new_shared(IoPort::new(0x00, 0xff));
        let port_b = new_shared(IoPort::new(0x00, 0xff));
        let ca1_pin = new_shared(Pin::new_high());
        let irq_line = new_shared(IrqLine::new("drive irq"));
        let mut via = Via::new(
            interrupt_source::DRIVE_VIA1,
            port_a,
            port_b,
            ca1_pin.clone(),
            irq_line.clone(),
        );
        via.reset();
        (via, irq_line, ca1_pin)
    }

    #[test]
    fn timer_1_underflow_raises_irq() {
        let (mut via, irq_line, _ca1) = setup_via();
        via.write(reg::IER, 0xc0); // enable timer 1
        via.write(reg::T1CL, 0x02);
        via.write(reg::T1CH, 0x00);
        for _ in 0..2 {
            via.clock();
            assert_eq!(false, irq_line.borrow().is_low());
        }
        via.clock();
        assert_eq!(true, irq_line.borrow().is_low());
        // reading the low counter byte acknowledges
        via.read(reg::T1CL);
        assert_eq!(false, irq_line.borrow().is_low());
    }

    #[test]
    fn ca1_edge_sets_flag() {
        let (mut via, irq_line, _ca1) = setup_via();
        via.write(reg::IER, 0x82);
        via.ca1_action(false);
        assert_eq!(true, irq_line.borrow().is_low());
        via.read(reg::ORA);
        assert_eq!(false, irq_line.borrow().is_low());
    }

    #[test]
    fn ier_set_clear_semantics() {
        let (mut via, _irq_line, _ca1) = setup_via();
        via.write(reg::IER, 0x82);
        assert_eq!(0x82 | 0x80, via.read(reg::IER));
        via.write(reg::IER, 0x02);
        assert_eq!(0x80, via.read(reg::IER));
    }
}
