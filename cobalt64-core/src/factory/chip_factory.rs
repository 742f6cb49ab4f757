// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]

use std::rc::Rc;
use std::sync::Arc;

use crate::factory::system_model::{SidModel, VicModel};
use crate::factory::types::*;
use crate::mem::ExpansionPort;
use crate::util::{Clock, IoPort, IrqLine, Pin, Ram, Rom, Shared, SharedCell};

/// ChipFactory provides an interface to construct each chip of the main
/// board so that individual implementations can be swapped out. Chips never
/// hold references to each other; all interactions go through separate I/O
/// state passed into the constructors (`IrqLine`, `Pin`, `IoPort`).
///
/// The four core traits used to model system operation are `Chip`, `Cpu`,
/// `Mmu` and `Addressable`.
pub trait ChipFactory {
    /// Constructs CPU.
    ///
    /// The three least significant bits of the I/O port govern bank
    /// switching. `rdy_line` aggregates every requester that may halt the
    /// processor on read cycles (cartridge DMA among them); the VIC's BA
    /// signal arrives separately through `ba_line`.
    fn new_cpu(
        &self,
        mem: Shared<dyn Addressable>,
        io_port: Shared<IoPort>,
        ba_line: Shared<Pin>,
        rdy_line: Shared<IrqLine>,
        irq_line: Shared<IrqLine>,
        nmi_line: Shared<IrqLine>,
    ) -> Box<dyn Cpu>;

    // -- Chipset

    /// Constructs CIA 1, wired to the keyboard matrix and both control
    /// ports. Interrupt output drives the CPU IRQ line.
    fn new_cia_1(
        &self,
        joystick_1: SharedCell<u8>,
        joystick_2: SharedCell<u8>,
        keyboard_matrix: Shared<[u8; 16]>,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs CIA 2. Port A carries the IEC output latches and the VIC
    /// bank select bits; interrupt output drives the CPU NMI line.
    fn new_cia_2(
        &self,
        port_a: Shared<IoPort>,
        port_b: Shared<IoPort>,
        flag_pin: Shared<Pin>,
        nmi_line: Shared<IrqLine>,
    ) -> Shared<dyn Chip>;

    /// Constructs the SID bridge. Since sound processing may be deferred
    /// until v-sync, the system clock is provided to let the bridge catch up
    /// whenever a register is accessed.
    fn new_sid(
        &self,
        chip_model: SidModel,
        system_clock: Rc<Clock>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Shared<dyn Chip>;

    /// Constructs VIC. The memory base address visible to the VIC is
    /// defined by CIA 2 port A bits 0 and 1 and arrives pre-decoded through
    /// `vic_base_address`. The system clock feeds the delay pipelines that
    /// make register writes take effect one cycle later.
    fn new_vic(
        &self,
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        ram: Shared<Ram>,
        rom_charset: Shared<Rom>,
        vic_base_address: SharedCell<u16>,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        clock: Rc<Clock>,
    ) -> Shared<dyn Chip>;

    // -- Memory

    /// Constructs the memory controller that dispatches CPU reads and
    /// writes to the bank selected by the MMU.
    fn new_memory(
        &self,
        mmu: Shared<dyn Mmu>,
        cia_1: Shared<dyn Chip>,
        cia_2: Shared<dyn Chip>,
        color_ram: Shared<Ram>,
        expansion_port: Shared<ExpansionPort>,
        ram: Shared<Ram>,
        rom_basic: Shared<Rom>,
        rom_charset: Shared<Rom>,
        rom_kernal: Shared<Rom>,
        sid: Shared<dyn Chip>,
        vic: Shared<dyn Chip>,
    ) -> Shared<dyn Addressable>;

    fn new_ram(&self, capacity: usize) -> Shared<Ram>;

    fn new_rom(&self, data: &[u8], offset: u16) -> Shared<Rom>;
}
