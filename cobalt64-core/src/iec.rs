// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use log::Level;

use crate::util::{IoPort, Pin, Shared, SharedCell};

// Spec: SERVICE MANUAL MODEL 1540/1541 DISK DRIVE (PN-314002-01)
// Design:
//   Three open collector lines shared between CIA 2 and the VIA 1 of each
//   drive. Every peer contributes an output latch; the bus level is the
//   wired AND of the inverted latches. The bus state is recomputed once per
//   master cycle after all peers had their chance to write, which keeps the
//   result a pure function of the latched triples.

/// CIA 2 port A pin assignment on the C64 side.
mod cia_bit {
    pub const ATN_OUT: u8 = 0x08;
    pub const CLK_OUT: u8 = 0x10;
    pub const DATA_OUT: u8 = 0x20;
    pub const CLK_IN: usize = 6;
    pub const DATA_IN: usize = 7;
}

/// VIA 1 port B pin assignment on the drive side. The input pins see the
/// bus lines inverted.
mod via_bit {
    pub const DATA_IN: usize = 0;
    pub const DATA_OUT: u8 = 0x02;
    pub const CLK_IN: usize = 2;
    pub const CLK_OUT: u8 = 0x08;
    pub const ATN_ACK: u8 = 0x10;
    pub const ATN_IN: usize = 7;
}

/// Number of idle cycles after which the bus counts as quiet.
const IDLE_CYCLES: u32 = 32;

/// One drive as seen from the bus.
pub struct DrivePeer {
    /// VIA 1 port B carrying the output latches
    pub port: Shared<IoPort>,
    /// inverted ATN line, wired to VIA 1 CA1
    pub atn_pin: Shared<Pin>,
    pub connected: SharedCell<bool>,
    pub powered: SharedCell<bool>,
    pub rotating: SharedCell<bool>,
    pub wake_request: SharedCell<bool>,
    // latches sampled from the port
    atn: bool,
    clk: bool,
    data: bool,
}

impl DrivePeer {
    pub fn new(
        port: Shared<IoPort>,
        atn_pin: Shared<Pin>,
        connected: SharedCell<bool>,
        powered: SharedCell<bool>,
        rotating: SharedCell<bool>,
        wake_request: SharedCell<bool>,
    ) -> Self {
        Self {
            port,
            atn_pin,
            connected,
            powered,
            rotating,
            wake_request,
            atn: false,
            clk: false,
            data: false,
        }
    }

    fn sample(&mut self) -> bool {
        let value = self.port.borrow().get_value();
        let atn = value & via_bit::ATN_ACK != 0;
        let clk = value & via_bit::CLK_OUT != 0;
        let data = value & via_bit::DATA_OUT != 0;
        let changed = atn != self.atn || clk != self.clk || data != self.data;
        self.atn = atn;
        self.clk = clk;
        self.data = data;
        changed
    }

    fn connected_and_on(&self) -> bool {
        self.connected.get() && self.powered.get()
    }
}

pub struct IecBus {
    // C64 side latches
    cia_atn: bool,
    cia_clk: bool,
    cia_data: bool,
    // Drive side
    drives: [DrivePeer; 2],
    // Bus lines
    atn_line: bool,
    clk_line: bool,
    data_line: bool,
    // Activity tracking
    idle: u32,
    transferring: bool,
    // I/O
    cia2_port_a: Shared<IoPort>,
}

impl IecBus {
    pub fn new(cia2_port_a: Shared<IoPort>, drive8: DrivePeer, drive9: DrivePeer) -> Self {
        Self {
            cia_atn: false,
            cia_clk: false,
            cia_data: false,
            drives: [drive8, drive9],
            atn_line: true,
            clk_line: true,
            data_line: true,
            idle: 0,
            transferring: false,
            cia2_port_a,
        }
    }

    pub fn get_lines(&self) -> (bool, bool, bool) {
        (self.atn_line, self.clk_line, self.data_line)
    }

    pub fn is_transferring(&self) -> bool {
        self.transferring
    }

    pub fn reset(&mut self) {
        self.cia_atn = true;
        self.cia_clk = true;
        self.cia_data = true;
        for drive in self.drives.iter_mut() {
            drive.atn = true;
            drive.clk = true;
            drive.data = true;
        }
        self.atn_line = true;
        self.clk_line = true;
        self.data_line = true;
        self.idle = 0;
        self.transferring = false;
    }

    /// Called once per master cycle after every peer had its turn.
    pub fn execute(&mut self) {
        let mut dirty = self.sample_c64_side();
        for i in 0..2 {
            if self.drives[i].sample() {
                dirty = true;
            }
        }
        if dirty {
            self.update_lines();
        } else {
            self.idle = self.idle.saturating_add(1);
            if self.idle == IDLE_CYCLES {
                self.update_transfer_status();
            }
        }
    }

    fn sample_c64_side(&mut self) -> bool {
        let bits = self.cia2_port_a.borrow().get_value();
        let atn = bits & cia_bit::ATN_OUT != 0;
        let clk = bits & cia_bit::CLK_OUT != 0;
        let data = bits & cia_bit::DATA_OUT != 0;
        let changed = atn != self.cia_atn || clk != self.cia_clk || data != self.cia_data;
        self.cia_atn = atn;
        self.cia_clk = clk;
        self.cia_data = data;
        changed
    }

    fn update_lines(&mut self) {
        let old = (self.atn_line, self.clk_line, self.data_line);

        // Compute bus signals (inverted and "wired AND")
        self.atn_line = !self.cia_atn;
        self.clk_line = !self.cia_clk && !self.drives[0].clk && !self.drives[1].clk;
        self.data_line = !self.cia_data && !self.drives[0].data && !self.drives[1].data;

        /* Auto-acknowledge. ATN is sensed at CA1 of UC3 after being inverted
         * by UA1; ATNA is an output from PB4 of UC3 which is sensed on the
         * data line after being exclusively "ored" by UD3 and inverted by
         * UB1:
         *
         *                        ----
         * ATNA (VIA) -----------|    |    ---
         *               ---     | =1 |---| 1 |o---> & DATA (IEC)
         *  ATN (IEC) --| 1 |o---|    |    ---
         *               ---      ----     UB1
         *               UA1      UD3
         */
        for drive in self.drives.iter() {
            if drive.connected_and_on() {
                self.data_line &= self.atn_line ^ drive.atn;
            }
        }

        if old != (self.atn_line, self.clk_line, self.data_line) {
            if log_enabled!(Level::Trace) {
                trace!(
                    target: "iec", "atn {} clk {} data {}",
                    self.atn_line, self.clk_line, self.data_line
                );
            }
            let was_idle = self.idle >= IDLE_CYCLES;
            self.idle = 0;
            // the C64 reads the bus through CIA 2 port A
            self.cia2_port_a
                .borrow_mut()
                .set_input_bit(cia_bit::CLK_IN, self.clk_line);
            self.cia2_port_a
                .borrow_mut()
                .set_input_bit(cia_bit::DATA_IN, self.data_line);
            // drives read the lines inverted on VIA 1 port B, observe ATN
            // edges on CA1 and wake up
            for drive in self.drives.iter() {
                {
                    let mut port = drive.port.borrow_mut();
                    port.set_input_bit(via_bit::DATA_IN, !self.data_line);
                    port.set_input_bit(via_bit::CLK_IN, !self.clk_line);
                    port.set_input_bit(via_bit::ATN_IN, !self.atn_line);
                }
                drive.atn_pin.borrow_mut().set_active(!self.atn_line);
                drive.wake_request.set(true);
            }
            if was_idle {
                self.update_transfer_status();
            }
        }
    }

    fn update_transfer_status(&mut self) {
        let rotating = self.drives[0].rotating.get() || self.drives[1].rotating.get();
        let busy = rotating && self.idle < IDLE_CYCLES;
        if self.transferring != busy {
            self.transferring = busy;
            debug!(target: "iec", "Bus {}", if busy { "busy" } else { "idle" });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, new_shared_cell};

    fn make_peer() -> DrivePeer {
        DrivePeer::new(
            new_shared(IoPort::new(0x1a, 0xff)),
            new_shared(Pin::new_low()),
            new_shared_cell(true),
            new_shared_cell(true),
            new_shared_cell(false),
            new_shared_cell(false),
        )
    }

    fn setup_bus() -> (IecBus, Shared<IoPort>) {
        let cia2_port_a = new_shared(IoPort::new(0x3f, 0xff));
        let drive8 = make_peer();
        let drive9 = make_peer();
        let mut bus = IecBus::new(cia2_port_a.clone(), drive8, drive9);
        bus.reset();
        (bus, cia2_port_a)
    }

    #[test]
    fn lines_follow_cia_latches() {
        let (mut bus, cia2_port_a) = setup_bus();
        cia2_port_a.borrow_mut().set_value(0x08); // assert ATN
        bus.execute();
        let (atn, _clk, _data) = bus.get_lines();
        assert_eq!(false, atn);
        cia2_port_a.borrow_mut().set_value(0x00);
        bus.execute();
        let (atn, _clk, _data) = bus.get_lines();
        assert_eq!(true, atn);
    }

    #[test]
    fn auto_ack_pulls_data_low_on_atn() {
        let (mut bus, cia2_port_a) = setup_bus();
        // both drives idle with ATNA released; asserting ATN forces DATA low
        cia2_port_a.borrow_mut().set_value(0x08);
        bus.execute();
        let (atn, _clk, data) = bus.get_lines();
        assert_eq!(false, atn);
        assert_eq!(false, data);
    }

    #[test]
    fn recompute_is_pure_in_latches() {
        let (mut bus, cia2_port_a) = setup_bus();
        cia2_port_a.borrow_mut().set_value(0x30);
        bus.execute();
        let first = bus.get_lines();
        for _ in 0..10 {
            bus.execute();
        }
        assert_eq!(first, bus.get_lines());
    }

    #[test]
    fn bus_goes_quiet_after_32_idle_cycles() {
        let (mut bus, cia2_port_a) = setup_bus();
        bus.drives[0].rotating.set(true);
        // let the bus settle into its idle state first
        for _ in 0..40 {
            bus.execute();
        }
        assert_eq!(false, bus.is_transferring());
        cia2_port_a.borrow_mut().set_value(0x10);
        bus.execute();
        assert_eq!(true, bus.is_transferring());
        for _ in 0..IDLE_CYCLES {
            bus.execute();
        }
        assert_eq!(false, bus.is_transferring());
    }
}
