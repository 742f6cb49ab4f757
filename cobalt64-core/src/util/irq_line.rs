// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;
use log::Level;

/// An open-collector interrupt line shared by multiple requesters. Each
/// source owns one bit of the signal mask; the line is asserted while any
/// bit is set. The same type drives IRQ, NMI and RDY.
pub struct IrqLine {
    kind: &'static str,
    signal: u8,
}

impl IrqLine {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, signal: 0 }
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        self.signal != 0
    }

    pub fn reset(&mut self) {
        self.signal = 0;
    }

    pub fn set_low(&mut self, source: usize, value: bool) {
        if log_enabled!(Level::Trace) {
            trace!(
                target: "cpu::int", "{}.{:?} {}",
                self.kind,
                source,
                if value { "set" } else { "cleared" }
            );
        }
        self.signal.set_bit(source, value);
    }
}

/// Interrupt requesters ORed onto the CPU lines.
pub mod interrupt_source {
    pub const CIA: usize = 0;
    pub const VIC: usize = 1;
    pub const EXPANSION: usize = 2;
    pub const DRIVE_VIA1: usize = 3;
    pub const DRIVE_VIA2: usize = 4;
}
