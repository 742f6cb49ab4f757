// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(feature = "cargo-clippy", allow(clippy::cast_lossless))]

use std::rc::Rc;
use std::sync::Arc;

use cobalt64_core::device::{Cartridge, Joystick, Keyboard, Mouse, MouseModel};
use cobalt64_core::drive::{Disk, Drive, UNITS_PER_CYCLE};
use cobalt64_core::factory::*;
use cobalt64_core::iec::{DrivePeer, IecBus};
use cobalt64_core::mem::{ExpansionPort, Pla};
use cobalt64_core::util::*;

use super::{C64Factory, Config};

// Design:
//   C64 represents the machine itself and all of its components, bound by
//   a single master tick. One tick advances every chip by one cycle in a
//   fixed order: due events, VIC, the CIAs, the drives, cartridge logic,
//   the serial bus, and finally the clock. The CPU invokes the tick once
//   per cycle of the instruction it executes, so CPU-visible side effects
//   of the other chips always trail by exactly the documented amount.

#[allow(dead_code)]
#[derive(Copy, Clone)]
enum BaseAddr {
    Basic = 0xa000,
    Charset = 0xd000,
    Kernal = 0xe000,
    D1541 = 0xc000,
}

impl BaseAddr {
    pub fn addr(self) -> u16 {
        self as u16
    }
}

pub struct C64 {
    // Dependencies
    config: Rc<Config>,
    // Chipset
    cpu: Box<dyn Cpu>,
    cia_1: Shared<dyn Chip>,
    cia_2: Shared<dyn Chip>,
    sid: Shared<dyn Chip>,
    vic: Shared<dyn Chip>,
    // Memory
    color_ram: Shared<Ram>,
    expansion_port: Shared<ExpansionPort>,
    ram: Shared<Ram>,
    // Peripherals
    iec_bus: Shared<IecBus>,
    drive_8: Shared<Drive>,
    drive_9: Shared<Drive>,
    joystick_1: Option<Joystick>,
    joystick_2: Option<Joystick>,
    joystick_1_state: SharedCell<u8>,
    keyboard: Keyboard,
    mouse: Option<Mouse>,
    // Buffers
    frame_buffer: Shared<dyn VideoOutput>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Runtime state
    clock: Rc<Clock>,
    scheduler: SharedScheduler,
    frame_count: u32,
    nmi_line: Shared<IrqLine>,
    tick_fn: TickFn,
    vsync_flag: SharedCell<bool>,
}

impl C64 {
    pub fn build(
        config: Rc<Config>,
        factory: &dyn ChipFactory,
        frame_buffer: Shared<dyn VideoOutput>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> C64 {
        info!(target: "c64", "Initializing system");
        // Scheduling
        let clock = Rc::new(Clock::default());
        let scheduler = new_shared(EventScheduler::default());

        // Shared state
        let joystick_1_state = new_shared_cell(0u8);
        let joystick_2_state = new_shared_cell(0u8);
        let keyboard_matrix = new_shared([0xff; 16]);
        let vsync_flag = new_shared_cell(false);
        let vic_base_address = new_shared_cell(0u16);

        // I/O lines
        let ba_line = new_shared(Pin::new_high());
        let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_flag_pin = new_shared(Pin::new_low());
        let cia_1_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_1_port_b = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_flag_pin = new_shared(Pin::new_low());
        let cia_2_port_a = new_shared(IoPort::new(0x00, 0xff));
        let cia_2_port_b = new_shared(IoPort::new(0x00, 0xff));
        let exp_io_line = new_shared(IoPort::new(0xff, 0xff));
        let irq_line = new_shared(IrqLine::new("irq"));
        let nmi_line = new_shared(IrqLine::new("nmi"));
        let rdy_line = new_shared(IrqLine::new("rdy"));

        // Memory
        let color_ram = factory.new_ram(config.model.color_ram);
        let ram = factory.new_ram(config.model.memory_size);
        let rom_basic = factory.new_rom(config.roms.basic.as_slice(), BaseAddr::Basic.addr());
        let rom_charset = factory.new_rom(config.roms.charset.as_slice(), 0);
        let rom_kernal = factory.new_rom(config.roms.kernal.as_slice(), BaseAddr::Kernal.addr());
        let rom_d1541 = factory.new_rom(config.roms.d1541.as_slice(), BaseAddr::D1541.addr());

        // Chipset
        let cia_1 = factory.new_cia_1(
            joystick_1_state.clone(),
            joystick_2_state.clone(),
            keyboard_matrix.clone(),
            cia_1_port_a.clone(),
            cia_1_port_b.clone(),
            cia_1_flag_pin.clone(),
            irq_line.clone(),
        );
        let cia_2 = factory.new_cia_2(
            cia_2_port_a.clone(),
            cia_2_port_b.clone(),
            cia_2_flag_pin.clone(),
            nmi_line.clone(),
        );
        let sid = factory.new_sid(config.model.sid_model, clock.clone(), sound_buffer.clone());
        let vic = factory.new_vic(
            config.model.vic_model,
            color_ram.clone(),
            ram.clone(),
            rom_charset.clone(),
            vic_base_address.clone(),
            frame_buffer.clone(),
            vsync_flag.clone(),
            ba_line.clone(),
            irq_line.clone(),
            clock.clone(),
        );

        // Expansion port, memory controller and processor
        let expansion_port = new_shared(ExpansionPort::new(
            exp_io_line.clone(),
            irq_line.clone(),
            nmi_line.clone(),
            rdy_line.clone(),
            ba_line.clone(),
            ram.clone(),
            clock.clone(),
            scheduler.clone(),
        ));
        let mmu = new_shared(Pla::new());
        let mem = factory.new_memory(
            mmu.clone(),
            cia_1.clone(),
            cia_2.clone(),
            color_ram.clone(),
            expansion_port.clone(),
            ram.clone(),
            rom_basic.clone(),
            rom_charset.clone(),
            rom_kernal.clone(),
            sid.clone(),
            vic.clone(),
        );
        let cpu = factory.new_cpu(
            mem.clone(),
            cpu_io_port.clone(),
            ba_line.clone(),
            rdy_line.clone(),
            irq_line.clone(),
            nmi_line.clone(),
        );

        // Drives and the serial bus
        let drive_8 = new_shared(Drive::new(
            Slot::DiskChange8,
            rom_d1541.clone(),
            clock.clone(),
            scheduler.clone(),
            config.model.cycles_per_frame,
            config.drives.drive_config.clone(),
        ));
        let drive_9 = new_shared(Drive::new(
            Slot::DiskChange9,
            rom_d1541.clone(),
            clock.clone(),
            scheduler.clone(),
            config.model.cycles_per_frame,
            config.drives.drive_config.clone(),
        ));
        drive_8.borrow_mut().set_connected(config.drives.drive_8);
        drive_9.borrow_mut().set_connected(config.drives.drive_9);
        let peer_8 = {
            let drive = drive_8.borrow();
            DrivePeer::new(
                drive.get_via1_port_b(),
                drive.get_atn_pin(),
                drive.get_connected_flag(),
                drive.get_powered_flag(),
                drive.get_rotating_flag(),
                drive.get_wake_flag(),
            )
        };
        let peer_9 = {
            let drive = drive_9.borrow();
            DrivePeer::new(
                drive.get_via1_port_b(),
                drive.get_atn_pin(),
                drive.get_connected_flag(),
                drive.get_powered_flag(),
                drive.get_rotating_flag(),
                drive.get_wake_flag(),
            )
        };
        let iec_bus = new_shared(IecBus::new(cia_2_port_a.clone(), peer_8, peer_9));

        // Peripherals
        let joystick_1 = if config.joystick.joystick_1 != cobalt64_core::device::joystick::Mode::None
        {
            Some(Joystick::new(
                config.joystick.joystick_1,
                config.joystick.axis_motion_threshold,
                joystick_1_state.clone(),
            ))
        } else {
            None
        };
        let joystick_2 = if config.joystick.joystick_2 != cobalt64_core::device::joystick::Mode::None
        {
            Some(Joystick::new(
                config.joystick.joystick_2,
                config.joystick.axis_motion_threshold,
                joystick_2_state.clone(),
            ))
        } else {
            None
        };
        let keyboard = Keyboard::new(keyboard_matrix.clone());

        // Observers: the memory map is a function of the CPU port and the
        // GAME/EXROM lines of the expansion port
        let exp_io_line_clone = exp_io_line.clone();
        let mmu_clone = mmu.clone();
        cpu_io_port
            .borrow_mut()
            .set_observer(Box::new(move |cpu_port| {
                let expansion_port_io = exp_io_line_clone.borrow().get_value();
                let mode = cpu_port & 0x07 | expansion_port_io & 0x18;
                mmu_clone.borrow_mut().switch_banks(mode);
            }));
        let cpu_io_port_clone = cpu_io_port.clone();
        let mmu_clone = mmu.clone();
        exp_io_line
            .borrow_mut()
            .set_observer(Box::new(move |expansion_port_io| {
                let cpu_port_io = cpu_io_port_clone.borrow().get_value();
                let mode = cpu_port_io & 0x07 | expansion_port_io & 0x18;
                mmu_clone.borrow_mut().switch_banks(mode);
            }));
        let vic_base_address_clone = vic_base_address.clone();
        cia_2_port_a
            .borrow_mut()
            .set_observer(Box::new(move |value| {
                let base_address = ((!value & 0x03) as u16) << 14;
                vic_base_address_clone.set(base_address);
            }));

        // The master tick
        let drive_duration =
            UNITS_PER_CYCLE as u64 * config.model.drive_freq as u64 / config.model.cpu_freq as u64;
        let tick_fn: TickFn = {
            let cia_1_clone = cia_1.clone();
            let cia_2_clone = cia_2.clone();
            let clock_clone = clock.clone();
            let scheduler_clone = scheduler.clone();
            let expansion_port_clone = expansion_port.clone();
            let iec_bus_clone = iec_bus.clone();
            let drive_8_clone = drive_8.clone();
            let drive_9_clone = drive_9.clone();
            let vic_clone = vic.clone();
            Rc::new(move || {
                let now = clock_clone.get();
                let due = scheduler_clone.borrow_mut().due(Slot::Expansion, now);
                if let Some(id) = due {
                    expansion_port_clone.borrow_mut().process_event(id);
                }
                let due = scheduler_clone.borrow_mut().due(Slot::DiskChange8, now);
                if due.is_some() {
                    drive_8_clone.borrow_mut().process_disk_change_event();
                }
                let due = scheduler_clone.borrow_mut().due(Slot::DiskChange9, now);
                if due.is_some() {
                    drive_9_clone.borrow_mut().process_disk_change_event();
                }
                vic_clone.borrow_mut().clock();
                cia_1_clone.borrow_mut().clock();
                cia_2_clone.borrow_mut().clock();
                drive_8_clone.borrow_mut().execute(drive_duration);
                drive_9_clone.borrow_mut().execute(drive_duration);
                expansion_port_clone.borrow_mut().execute();
                iec_bus_clone.borrow_mut().execute();
                clock_clone.tick();
            })
        };
        C64 {
            config,
            cpu,
            cia_1,
            cia_2,
            sid,
            vic,
            color_ram,
            expansion_port,
            ram,
            iec_bus,
            drive_8,
            drive_9,
            joystick_1,
            joystick_2,
            joystick_1_state,
            keyboard,
            mouse: None,
            frame_buffer,
            sound_buffer,
            clock,
            scheduler,
            frame_count: 0,
            nmi_line,
            tick_fn,
            vsync_flag,
        }
    }

    // -- Getters

    pub fn get_clock(&self) -> Rc<Clock> {
        self.clock.clone()
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_cpu(&self) -> &dyn Cpu {
        &*self.cpu
    }

    pub fn get_cpu_mut(&mut self) -> &mut dyn Cpu {
        &mut *self.cpu
    }

    pub fn get_cycles(&self) -> u64 {
        self.clock.get()
    }

    pub fn get_cia_1(&self) -> Shared<dyn Chip> {
        self.cia_1.clone()
    }

    pub fn get_cia_2(&self) -> Shared<dyn Chip> {
        self.cia_2.clone()
    }

    pub fn get_drive_8(&self) -> Shared<Drive> {
        self.drive_8.clone()
    }

    pub fn get_drive_9(&self) -> Shared<Drive> {
        self.drive_9.clone()
    }

    pub fn get_expansion_port(&self) -> Shared<ExpansionPort> {
        self.expansion_port.clone()
    }

    pub fn get_frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn get_iec_bus(&self) -> Shared<IecBus> {
        self.iec_bus.clone()
    }

    pub fn get_joystick_1_mut(&mut self) -> &mut Option<Joystick> {
        &mut self.joystick_1
    }

    pub fn get_joystick_2_mut(&mut self) -> &mut Option<Joystick> {
        &mut self.joystick_2
    }

    pub fn get_keyboard(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn get_sid(&self) -> Shared<dyn Chip> {
        self.sid.clone()
    }

    pub fn get_vic(&self) -> Shared<dyn Chip> {
        self.vic.clone()
    }

    pub fn get_vsync(&self) -> bool {
        self.vsync_flag.get()
    }

    pub fn is_cpu_jam(&self) -> bool {
        self.cpu.is_jammed()
    }

    pub fn reset_vsync(&self) {
        self.vsync_flag.set(false)
    }

    // -- Lifecycle

    /// A machine without ROMs cannot run; surfaced before the first cycle.
    pub fn power_on(&mut self) -> Result<(), String> {
        self.config.validate_roms()?;
        self.reset(true);
        Ok(())
    }

    pub fn load(&mut self, data: &[u8], offset: u16) {
        let mut mem = self.ram.borrow_mut();
        let mut address = offset;
        for byte in data {
            mem.write(address, *byte);
            address = address.wrapping_add(1);
        }
    }

    pub fn reset(&mut self, hard: bool) {
        info!(target: "c64", "Resetting system");
        self.clock.reset();
        self.scheduler.borrow_mut().reset();
        // Memory
        if hard {
            self.ram.borrow_mut().fill(0x00);
            self.color_ram.borrow_mut().fill(0x00);
        }
        // Chipset
        self.cpu.reset();
        self.cia_1.borrow_mut().reset();
        self.cia_2.borrow_mut().reset();
        self.sid.borrow_mut().reset();
        self.vic.borrow_mut().reset();
        // I/O
        self.expansion_port.borrow_mut().reset();
        self.iec_bus.borrow_mut().reset();
        // Peripherals
        self.drive_8.borrow_mut().reset();
        self.drive_9.borrow_mut().reset();
        if let Some(ref mut joystick) = self.joystick_1 {
            joystick.reset();
        }
        if let Some(ref mut joystick) = self.joystick_2 {
            joystick.reset();
        }
        self.keyboard.reset();
        if let Some(ref mut mouse) = self.mouse {
            mouse.reset();
        }
        self.frame_buffer.borrow_mut().reset();
        self.sound_buffer.reset();
        // Runtime state
        self.frame_count = 0;
        self.vsync_flag.set(false);
    }

    /// Runs until the next v-sync; returns false when the processor hit a
    /// halting opcode.
    pub fn run_frame(&mut self) -> bool {
        let tick_fn = self.tick_fn.clone();
        while !self.vsync_flag.get() && !self.cpu.is_jammed() {
            self.step_internal(&tick_fn);
        }
        if self.vsync_flag.get() {
            self.process_vsync();
        }
        !self.cpu.is_jammed()
    }

    pub fn step(&mut self) {
        let tick_fn = self.tick_fn.clone();
        self.step_internal(&tick_fn);
        if self.vsync_flag.get() {
            self.process_vsync();
        }
    }

    fn step_internal(&mut self, tick_fn: &TickFn) {
        // freezer cartridges watch the NMI being taken; the CPU releases
        // the line when it enters the handler
        let nmi_pending = self.nmi_line.borrow().is_low();
        if nmi_pending {
            self.expansion_port.borrow_mut().nmi_will_trigger();
        }
        self.cpu.step(tick_fn);
        if nmi_pending && !self.nmi_line.borrow().is_low() {
            self.expansion_port.borrow_mut().nmi_did_trigger();
        }
    }

    fn process_vsync(&mut self) {
        self.sid.borrow_mut().process_vsync();
        self.cia_1.borrow_mut().process_vsync();
        self.cia_2.borrow_mut().process_vsync();
        self.drive_8.borrow_mut().process_vsync();
        self.drive_9.borrow_mut().process_vsync();
        if let Some(ref mut joystick) = self.joystick_1 {
            joystick.process_vsync();
        }
        if let Some(ref mut joystick) = self.joystick_2 {
            joystick.process_vsync();
        }
        if let Some(ref mut mouse) = self.mouse {
            mouse.process_vsync();
        }
        self.frame_count = self.frame_count.wrapping_add(1);
    }

    // -- Peripheral ops

    pub fn attach_cartridge(&mut self, cartridge: Cartridge) {
        self.expansion_port.borrow_mut().attach(cartridge);
    }

    pub fn detach_cartridge(&mut self) {
        self.expansion_port.borrow_mut().detach();
        self.reset(false);
    }

    pub fn attach_mouse(&mut self, model: MouseModel) {
        // the mouse shares control port 1 with the joystick
        self.mouse = Some(Mouse::new(model, self.joystick_1_state.clone()));
    }

    pub fn detach_mouse(&mut self) {
        self.mouse = None;
    }

    pub fn insert_disk_8(&mut self, disk: Disk) {
        self.drive_8.borrow_mut().insert_disk(disk);
    }

    pub fn insert_disk_9(&mut self, disk: Disk) {
        self.drive_9.borrow_mut().insert_disk(disk);
    }

    pub fn eject_disk_8(&mut self) {
        self.drive_8.borrow_mut().eject_disk();
    }

    pub fn eject_disk_9(&mut self) {
        self.drive_9.borrow_mut().eject_disk();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameBuffer, Palette, SoundBuffer};

    fn setup_c64() -> C64 {
        let config = Rc::new(Config::new(SystemModel::from("pal")));
        let factory = C64Factory::new(config.clone());
        let frame_buffer = new_shared(FrameBuffer::new(504, 312, Palette::default()));
        let sound_buffer = Arc::new(SoundBuffer::new(4096));
        let mut c64 = C64::build(config, &factory, frame_buffer, sound_buffer);
        c64.reset(true);
        c64
    }

    #[test]
    fn tick_advances_all_clocks() {
        let mut c64 = setup_c64();
        let start = c64.get_cycles();
        c64.step();
        assert!(c64.get_cycles() > start);
    }

    #[test]
    fn ram_program_executes() {
        let mut c64 = setup_c64();
        // lda #$3c, sta $0400, jam
        c64.load(&[0xa9, 0x3c, 0x8d, 0x00, 0x04, 0x02], 0x1000);
        c64.get_cpu_mut().set_pc(0x1000);
        c64.step();
        c64.step();
        assert_eq!(0x3c, c64.get_cpu().read(0x0400));
    }

    #[test]
    fn power_on_requires_roms() {
        let mut c64 = setup_c64();
        assert!(c64.power_on().is_err());
    }
}
