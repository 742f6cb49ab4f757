// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;

use crate::cpu::Cpu6510;
use crate::factory::{Addressable, Cpu, TickFn};
use crate::util::interrupt_source;
use crate::util::{
    new_shared, new_shared_cell, Clock, IoPort, IrqLine, Pin, Ram, Rom, Shared, SharedCell,
    SharedScheduler, Slot,
};

use super::disk::Disk;
use super::head::{ReadWriteHead, UNITS_PER_CYCLE};
use super::via::Via;

// Design:
//   A drive is a complete sub-machine: 6502, 2 KiB RAM, DOS ROM, two VIAs
//   and the read/write head. It runs against its own cycle account measured
//   in sub-units (10000 per drive CPU cycle) so the slightly different
//   clock rate stays in sync with the master clock over time. The carry
//   pulses of the head electronics are interleaved inside the head itself.

/// Frames the drive stays awake after the last activity.
const WAKEUP_FRAMES: i32 = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InsertionStatus {
    FullyInserted,
    PartiallyEjected,
    FullyEjected,
    PartiallyInserted,
}

#[derive(Clone)]
pub struct DriveConfig {
    /// frames from fully inserted to partially ejected
    pub eject_delay: u32,
    /// frames the drive tray stays empty during a swap
    pub swap_delay: u32,
    /// frames from partially to fully inserted
    pub insert_delay: u32,
    pub power_save: bool,
}

impl DriveConfig {
    pub fn default() -> Self {
        Self {
            eject_delay: 30,
            swap_delay: 30,
            insert_delay: 30,
            power_save: true,
        }
    }
}

pub struct Drive {
    // Configuration
    config: DriveConfig,
    slot: Slot,
    cycles_per_frame: u32,
    // Sub-machine
    cpu: Box<dyn Cpu>,
    via1: Shared<Via>,
    via2: Shared<Via>,
    head: Shared<ReadWriteHead>,
    // Scheduling
    clock: Rc<Clock>,
    scheduler: SharedScheduler,
    elapsed: u64,
    local_units: SharedCell<u64>,
    tick_fn: TickFn,
    // Disk change machinery
    insertion_status: InsertionStatus,
    disk_to_insert: Option<Disk>,
    // Power management
    connected: SharedCell<bool>,
    powered: SharedCell<bool>,
    rotating: SharedCell<bool>,
    wake_request: SharedCell<bool>,
    needs_emulation: bool,
    watchdog: i32,
}

impl Drive {
    pub fn new(
        slot: Slot,
        rom: Shared<Rom>,
        clock: Rc<Clock>,
        scheduler: SharedScheduler,
        cycles_per_frame: u32,
        config: DriveConfig,
    ) -> Self {
        info!(target: "drive", "Initializing drive {:?}", slot);
        // I/O lines of the sub-machine
        let irq_line = new_shared(IrqLine::new("drive irq"));
        let nmi_line = new_shared(IrqLine::new("drive nmi"));
        let rdy_line = new_shared(IrqLine::new("drive rdy"));
        let ba_line = new_shared(Pin::new_high());
        let via1_port_a = new_shared(IoPort::new(0xff, 0xff));
        let via1_port_b = new_shared(IoPort::new(0x1a, 0xff));
        let via1_ca1 = new_shared(Pin::new_high());
        let via2_port_a = new_shared(IoPort::new(0xff, 0xff));
        let via2_port_b = new_shared(IoPort::new(0x6f, 0xff));
        let byte_ready_pin = new_shared(Pin::new_high());
        let rotating = new_shared_cell(false);

        let via1 = new_shared(Via::new(
            interrupt_source::DRIVE_VIA1,
            via1_port_a,
            via1_port_b,
            via1_ca1,
            irq_line.clone(),
        ));
        let via2 = new_shared(Via::new(
            interrupt_source::DRIVE_VIA2,
            via2_port_a.clone(),
            via2_port_b.clone(),
            byte_ready_pin.clone(),
            irq_line.clone(),
        ));
        let head = new_shared(ReadWriteHead::new(
            via2_port_a,
            via2_port_b,
            byte_ready_pin,
            via2.borrow().get_ca2_out(),
            via2.borrow().get_cb2_out(),
            rotating.clone(),
        ));
        let ram = new_shared(Ram::new(0x0800));
        let mem = new_shared(DriveMemory::new(
            ram,
            rom,
            via1.clone(),
            via2.clone(),
        ));
        let cpu = Box::new(Cpu6510::new(
            mem,
            None,
            ba_line,
            rdy_line,
            irq_line,
            nmi_line,
        ));

        let local_units = new_shared_cell(0u64);
        let tick_fn: TickFn = {
            let via1_clone = via1.clone();
            let via2_clone = via2.clone();
            let head_clone = head.clone();
            let local_units_clone = local_units.clone();
            Rc::new(move || {
                via1_clone.borrow_mut().clock();
                via2_clone.borrow_mut().clock();
                head_clone.borrow_mut().clock();
                local_units_clone.set(local_units_clone.get() + UNITS_PER_CYCLE as u64);
            })
        };

        Self {
            config,
            slot,
            cycles_per_frame,
            cpu,
            via1,
            via2,
            head,
            clock,
            scheduler,
            elapsed: 0,
            local_units,
            tick_fn,
            insertion_status: InsertionStatus::FullyEjected,
            disk_to_insert: None,
            connected: new_shared_cell(false),
            powered: new_shared_cell(true),
            rotating,
            wake_request: new_shared_cell(false),
            needs_emulation: false,
            watchdog: 0,
        }
    }

    // -- Wiring handles for the serial bus

    pub fn get_via1(&self) -> Shared<Via> {
        self.via1.clone()
    }

    pub fn get_via2(&self) -> Shared<Via> {
        self.via2.clone()
    }

    pub fn get_via1_port_b(&self) -> Shared<IoPort> {
        self.via1.borrow().get_port_b()
    }

    /// CA1 of VIA 1 listens to the inverted ATN line.
    pub fn get_atn_pin(&self) -> Shared<Pin> {
        self.via1.borrow().get_ca1_pin()
    }

    pub fn get_connected_flag(&self) -> SharedCell<bool> {
        self.connected.clone()
    }

    pub fn get_powered_flag(&self) -> SharedCell<bool> {
        self.powered.clone()
    }

    pub fn get_rotating_flag(&self) -> SharedCell<bool> {
        self.rotating.clone()
    }

    pub fn get_wake_flag(&self) -> SharedCell<bool> {
        self.wake_request.clone()
    }

    // -- State queries

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn is_powered(&self) -> bool {
        self.powered.get()
    }

    pub fn set_powered(&mut self, powered: bool) {
        self.powered.set(powered);
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating.get()
    }

    pub fn is_idle(&self) -> bool {
        !self.needs_emulation
    }

    pub fn get_insertion_status(&self) -> InsertionStatus {
        self.insertion_status
    }

    pub fn has_disk(&self) -> bool {
        self.insertion_status == InsertionStatus::FullyInserted
            && self.head.borrow().has_disk()
    }

    pub fn get_head(&self) -> Shared<ReadWriteHead> {
        self.head.clone()
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    // -- Execution

    pub fn reset(&mut self) {
        self.via1.borrow_mut().reset();
        self.via2.borrow_mut().reset();
        self.head.borrow_mut().reset();
        self.cpu.reset();
        self.elapsed = 0;
        self.local_units.set(0);
        self.wake_up(WAKEUP_FRAMES);
    }

    pub fn wake_up(&mut self, frames: i32) {
        if !self.needs_emulation {
            debug!(target: "drive", "Exiting power-save mode");
            self.needs_emulation = true;
            // no catch-up burst after sleeping
            self.elapsed = self.local_units.get();
        }
        self.watchdog = frames;
    }

    /// Runs the drive for the elapsed duration in sub-units until its local
    /// clock meets the master.
    pub fn execute(&mut self, duration: u64) {
        if !self.connected.get() || !self.powered.get() {
            return;
        }
        if self.wake_request.get() {
            self.wake_request.set(false);
            self.wake_up(WAKEUP_FRAMES);
        }
        if !self.needs_emulation {
            return;
        }
        self.elapsed += duration;
        let tick_fn = self.tick_fn.clone();
        while self.local_units.get() < self.elapsed {
            self.cpu.step(&tick_fn);
        }
    }

    /// Frame boundary handling: power-save watchdog.
    pub fn process_vsync(&mut self) {
        if !self.connected.get() || !self.powered.get() {
            return;
        }
        if !self.is_rotating() && self.config.power_save && self.needs_emulation {
            self.watchdog -= 1;
            if self.watchdog <= 0 {
                debug!(target: "drive", "Entering power-save mode");
                self.needs_emulation = false;
            }
        }
    }

    // -- Disk change state machine

    pub fn insert_disk(&mut self, disk: Disk) {
        if self.disk_to_insert.is_some() {
            warn!(target: "drive", "Disk change in progress, ignoring new disk");
            return;
        }
        self.disk_to_insert = Some(disk);
        self.schedule_first_disk_change_event();
    }

    pub fn eject_disk(&mut self) {
        if self.insertion_status == InsertionStatus::FullyInserted && self.disk_to_insert.is_none()
        {
            self.schedule_first_disk_change_event();
        }
    }

    fn schedule_first_disk_change_event(&mut self) {
        // stay awake through the whole procedure
        self.wake_up(200);
        self.scheduler
            .borrow_mut()
            .schedule(self.slot, 0, self.clock.get());
    }

    fn reschedule(&mut self, frames: u32) {
        let trigger = self.clock.get() + frames as u64 * self.cycles_per_frame as u64;
        self.scheduler.borrow_mut().schedule(self.slot, 0, trigger);
    }

    pub fn process_disk_change_event(&mut self) {
        match self.insertion_status {
            InsertionStatus::FullyInserted => {
                // Pull the disk half out; this blocks the light barrier and
                // makes the data unreadable
                self.insertion_status = InsertionStatus::PartiallyEjected;
                {
                    let mut head = self.head.borrow_mut();
                    if let Some(disk) = head.get_disk_mut() {
                        disk.clear();
                    }
                    head.set_light_barrier(true);
                }
                let delay = self.config.eject_delay;
                self.reschedule(delay);
            }
            InsertionStatus::PartiallyEjected => {
                // Take the disk out entirely
                self.insertion_status = InsertionStatus::FullyEjected;
                self.head.borrow_mut().take_disk();
                self.head.borrow_mut().set_light_barrier(false);
                if self.disk_to_insert.is_some() {
                    let delay = self.config.swap_delay;
                    self.reschedule(delay);
                }
            }
            InsertionStatus::FullyEjected => {
                // Only proceed if a new disk is waiting
                if self.disk_to_insert.is_none() {
                    return;
                }
                self.insertion_status = InsertionStatus::PartiallyInserted;
                self.head.borrow_mut().set_light_barrier(true);
                let delay = self.config.insert_delay;
                self.reschedule(delay);
            }
            InsertionStatus::PartiallyInserted => {
                self.insertion_status = InsertionStatus::FullyInserted;
                let disk = self.disk_to_insert.take();
                self.head.borrow_mut().set_disk(disk);
                info!(target: "drive", "Disk fully inserted");
            }
        }
    }
}

/// Address decoding of the 1541 logic board.
pub struct DriveMemory {
    ram: Shared<Ram>,
    rom: Shared<Rom>,
    via1: Shared<Via>,
    via2: Shared<Via>,
}

impl DriveMemory {
    pub fn new(
        ram: Shared<Ram>,
        rom: Shared<Rom>,
        via1: Shared<Via>,
        via2: Shared<Via>,
    ) -> Self {
        Self {
            ram,
            rom,
            via1,
            via2,
        }
    }
}

impl Addressable for DriveMemory {
    fn read(&self, address: u16) -> u8 {
        match address {
            0x0000..=0x17ff => self.ram.borrow().read(address & 0x07ff),
            0x1800..=0x1bff => self.via1.borrow_mut().read((address & 0x0f) as u8),
            0x1c00..=0x1fff => self.via2.borrow_mut().read((address & 0x0f) as u8),
            0x8000..=0xbfff => self.rom.borrow().read(address | 0xc000),
            0xc000..=0xffff => self.rom.borrow().read(address),
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x17ff => self.ram.borrow_mut().write(address & 0x07ff, value),
            0x1800..=0x1bff => self.via1.borrow_mut().write((address & 0x0f) as u8, value),
            0x1c00..=0x1fff => self.via2.borrow_mut().write((address & 0x0f) as u8, value),
            _ => {}
        }
    }
}
