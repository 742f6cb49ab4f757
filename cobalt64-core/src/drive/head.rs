// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{IoPort, Pin, Shared, SharedCell};

use super::disk::{Disk, MAX_HALFTRACK};

// Design:
//   The read/write electronics are clocked by carry pulses of the UF4
//   counter. A new bit passes under the head every fourth carry; the delay
//   between two carries depends on the speed zone selected through the
//   density lines. Carries are interleaved with the CPU cycles through a
//   sub-unit accumulator where one CPU cycle equals 10000 units.
//
//           74LS191                             ---
//           -------               VIA2::CA2 ---|   |
//  SYNC --o| Load  |                UF4::QB --o| & |o-- Byte Ready
//    QB ---| Clk   |                        ---|   |
//          |    QD |   ---                  |   ---
//          |    QC |--|   |    ---          |   ---
//          |    QB |--| & |o--| 1 |o-----------|   |
//          |    QA |--|   |    ---   UF4::QB --| & |o-- load UD3
//           -------    ---           UF4::QA --|   |
//             UE3                               ---

/// Sub-units between two carry pulses per speed zone; zone 3 is the
/// densest (tracks 1-17), zone 0 the outermost default.
const DELAY_BETWEEN_CARRY_PULSES: [i64; 4] = [10000, 9375, 8750, 8125];

/// Sub-units per drive CPU cycle.
pub const UNITS_PER_CYCLE: i64 = 10000;

pub struct ReadWriteHead {
    // Media
    disk: Option<Disk>,
    // Head position
    halftrack: usize,
    offset: u32,
    // Mechanics
    zone: usize,
    spinning: bool,
    stepper: u8,
    light_barrier: bool,
    // UF4 logic
    next_carry: i64,
    counter_uf4: u8,
    carry_counter: u64,
    read_shiftreg: u16,
    write_shiftreg: u8,
    byte_ready_counter: u8,
    byte_ready: bool,
    sync: bool,
    // I/O
    via2_port_a: Shared<IoPort>,
    via2_port_b: Shared<IoPort>,
    byte_ready_pin: Shared<Pin>,
    soe_line: SharedCell<bool>,
    read_mode_line: SharedCell<bool>,
    rotating_flag: SharedCell<bool>,
}

impl ReadWriteHead {
    pub fn new(
        via2_port_a: Shared<IoPort>,
        via2_port_b: Shared<IoPort>,
        byte_ready_pin: Shared<Pin>,
        soe_line: SharedCell<bool>,
        read_mode_line: SharedCell<bool>,
        rotating_flag: SharedCell<bool>,
    ) -> Self {
        Self {
            disk: None,
            halftrack: 1,
            offset: 0,
            zone: 0,
            spinning: false,
            stepper: 0,
            light_barrier: false,
            next_carry: DELAY_BETWEEN_CARRY_PULSES[0],
            counter_uf4: 0,
            carry_counter: 0,
            read_shiftreg: 0,
            write_shiftreg: 0,
            byte_ready_counter: 0,
            byte_ready: true,
            sync: true,
            via2_port_a,
            via2_port_b,
            byte_ready_pin,
            soe_line,
            read_mode_line,
            rotating_flag,
        }
    }

    pub fn get_halftrack(&self) -> usize {
        self.halftrack
    }

    pub fn get_offset(&self) -> u32 {
        self.offset
    }

    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    pub fn get_disk(&self) -> Option<&Disk> {
        self.disk.as_ref()
    }

    pub fn get_disk_mut(&mut self) -> Option<&mut Disk> {
        self.disk.as_mut()
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn set_disk(&mut self, disk: Option<Disk>) {
        self.disk = disk;
        self.offset = 0;
        self.update_write_protection();
    }

    pub fn take_disk(&mut self) -> Option<Disk> {
        let disk = self.disk.take();
        self.update_write_protection();
        disk
    }

    pub fn is_light_barrier_blocked(&self) -> bool {
        self.light_barrier
    }

    /// Blocks or unblocks the light barrier; the DOS watches this sensor
    /// to detect disk changes.
    pub fn set_light_barrier(&mut self, blocked: bool) {
        self.light_barrier = blocked;
        self.via2_port_b.borrow_mut().set_input_bit(4, !blocked);
    }

    fn update_write_protection(&mut self) {
        let blocked = match self.disk {
            Some(ref disk) => disk.is_write_protected(),
            None => false,
        };
        self.set_light_barrier(blocked);
    }

    pub fn reset(&mut self) {
        self.halftrack = 1;
        self.offset = 0;
        self.zone = 0;
        self.spinning = false;
        self.stepper = 0;
        self.next_carry = DELAY_BETWEEN_CARRY_PULSES[0];
        self.counter_uf4 = 0;
        self.carry_counter = 0;
        self.read_shiftreg = 0;
        self.write_shiftreg = 0;
        self.byte_ready_counter = 0;
        self.byte_ready = true;
        self.sync = true;
        self.rotating_flag.set(false);
        self.update_write_protection();
    }

    /// One drive CPU cycle worth of head activity.
    pub fn clock(&mut self) {
        self.poll_mechanics();
        self.next_carry -= UNITS_PER_CYCLE;
        while self.next_carry <= 0 {
            self.next_carry += DELAY_BETWEEN_CARRY_PULSES[self.zone];
            if self.spinning {
                self.execute_uf4();
            }
        }
        self.update_byte_ready();
    }

    /// Samples the VIA 2 output lines that drive the mechanics: stepper
    /// phases, motor, LED and the density select.
    fn poll_mechanics(&mut self) {
        let value = self.via2_port_b.borrow().get_value();
        let stepper = value & 0x03;
        if stepper != self.stepper {
            if stepper == (self.stepper + 1) & 0x03 {
                self.move_head_up();
            } else if stepper == self.stepper.wrapping_sub(1) & 0x03 {
                self.move_head_down();
            }
            self.stepper = stepper;
        }
        let motor = value.get_bit(2);
        if motor != self.spinning {
            self.spinning = motor;
            self.rotating_flag.set(motor);
        }
        self.zone = ((value >> 5) & 0x03) as usize;
    }

    fn execute_uf4(&mut self) {
        self.counter_uf4 = self.counter_uf4.wrapping_add(1);
        self.carry_counter += 1;

        // A new bit comes in every fourth carry pulse. An incoming one
        // resets UF4, an incoming zero leaves it counting.
        if self.carry_counter % 4 == 0 {
            if self.read_mode() && self.has_disk() && self.read_bit_from_head() == 1 {
                self.counter_uf4 = 0;
            }
            self.rotate_disk();
        }

        // SYNC is ten one bits in the read shift register while reading
        self.sync = (self.read_shiftreg & 0x3ff) != 0x3ff || !self.read_mode();
        if !self.sync {
            self.byte_ready_counter = 0;
        }

        match self.counter_uf4 & 0x03 {
            0x00 | 0x01 => {
                self.update_byte_ready();
            }
            0x02 => {
                self.raise_byte_ready();
                // byte ready counter UE3
                self.byte_ready_counter = if self.sync {
                    (self.byte_ready_counter + 1) & 0x07
                } else {
                    0
                };
                // write shift register
                if !self.read_mode() && self.has_disk() && !self.light_barrier {
                    let bit = self.write_shiftreg & 0x80 != 0;
                    self.write_bit_to_head(bit);
                }
                self.write_shiftreg <<= 1;
                // read shift register
                self.read_shiftreg <<= 1;
                self.read_shiftreg |= if (self.counter_uf4 & 0x0c) == 0 { 1 } else { 0 };
            }
            0x03 => {
                if self.byte_ready_counter == 7 {
                    self.write_shiftreg = self.via2_port_a.borrow().get_value();
                    // completed byte becomes visible on the VIA 2 input port
                    let byte = (self.read_shiftreg & 0xff) as u8;
                    self.via2_port_a.borrow_mut().set_input(byte);
                }
            }
            _ => unreachable!(),
        }
        // the SYNC sensor feeds VIA 2 PB7, active low
        self.via2_port_b.borrow_mut().set_input_bit(7, self.sync);
    }

    fn update_byte_ready(&mut self) {
        let soe = self.soe_line.get();
        let qb = self.counter_uf4 & 0x02 != 0;
        let ue3 = self.byte_ready_counter == 7;
        let new_byte_ready = !(soe && !qb && ue3);
        if self.byte_ready != new_byte_ready {
            self.byte_ready = new_byte_ready;
            self.byte_ready_pin.borrow_mut().set_active(new_byte_ready);
        }
    }

    fn raise_byte_ready(&mut self) {
        if !self.byte_ready {
            self.byte_ready = true;
            self.byte_ready_pin.borrow_mut().set_active(true);
        }
    }

    fn read_mode(&self) -> bool {
        self.read_mode_line.get()
    }

    fn read_bit_from_head(&self) -> u8 {
        match self.disk {
            Some(ref disk) => disk.read_bit(self.halftrack, self.offset),
            None => 0,
        }
    }

    fn write_bit_to_head(&mut self, bit: bool) {
        let halftrack = self.halftrack;
        let offset = self.offset;
        if let Some(ref mut disk) = self.disk {
            disk.write_bit(halftrack, offset, bit);
        }
    }

    fn rotate_disk(&mut self) {
        if let Some(ref disk) = self.disk {
            self.offset += 1;
            if self.offset >= disk.len_of_halftrack(self.halftrack) {
                self.offset = 0;
            }
        }
    }

    pub fn move_head_up(&mut self) {
        if self.halftrack < MAX_HALFTRACK {
            self.reposition(self.halftrack + 1);
            debug!(target: "drive", "Head up to halftrack {}", self.halftrack);
        }
    }

    pub fn move_head_down(&mut self) {
        if self.halftrack > 1 {
            self.reposition(self.halftrack - 1);
            debug!(target: "drive", "Head down to halftrack {}", self.halftrack);
        }
    }

    /// Keeps the relative rotation angle when stepping between halftracks
    /// of different length.
    fn reposition(&mut self, halftrack: usize) {
        if let Some(ref disk) = self.disk {
            let old_len = disk.len_of_halftrack(self.halftrack) as f64;
            let new_len = disk.len_of_halftrack(halftrack) as f64;
            let pos = self.offset as f64 / old_len;
            self.offset = (pos * new_len) as u32;
            if self.offset >= disk.len_of_halftrack(halftrack) {
                self.offset = 0;
            }
        } else {
            self.offset = 0;
        }
        self.halftrack = halftrack;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, new_shared_cell};

    fn setup_head() -> (ReadWriteHead, Shared<IoPort>, Shared<Pin>) {
        let via2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let via2_port_b = new_shared(IoPort::new(0x6f, 0xff));
        let byte_ready_pin = new_shared(Pin::new_high());
        let soe = new_shared_cell(true);
        let read_mode = new_shared_cell(true);
        let rotating = new_shared_cell(false);
        let mut head = ReadWriteHead::new(
            via2_port_a.clone(),
            via2_port_b.clone(),
            byte_ready_pin.clone(),
            soe,
            read_mode,
            rotating,
        );
        head.reset();
        (head, via2_port_b, byte_ready_pin)
    }

    #[test]
    fn motor_bit_spins_disk() {
        let (mut head, port_b, _pin) = setup_head();
        head.set_disk(Some(Disk::new()));
        port_b.borrow_mut().set_value(0x04);
        head.clock();
        assert_eq!(true, head.is_spinning());
    }

    #[test]
    fn sync_is_found_on_ff_run() {
        let (mut head, port_b, _pin) = setup_head();
        let mut disk = Disk::new();
        // a track of pure sync bytes
        disk.set_halftrack_data(1, &[0xff; 16], 128);
        head.set_disk(Some(disk));
        port_b.borrow_mut().set_value(0x04);
        // enough cycles for well over ten bits under the head
        for _ in 0..64 {
            head.clock();
        }
        // sync sensor on PB7 goes low
        assert_eq!(false, port_b.borrow().get_value().get_bit(7));
    }

    #[test]
    fn stepper_moves_head() {
        let (mut head, port_b, _pin) = setup_head();
        head.set_disk(Some(Disk::new()));
        assert_eq!(1, head.get_halftrack());
        port_b.borrow_mut().set_value(0x01);
        head.clock();
        assert_eq!(2, head.get_halftrack());
        port_b.borrow_mut().set_value(0x00);
        head.clock();
        assert_eq!(1, head.get_halftrack());
    }
}
