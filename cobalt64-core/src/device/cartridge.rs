// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;

use bit_field::BitField;
use log::Level;

use crate::factory::Bank;
use crate::util::{interrupt_source, Clock, IoPort, IrqLine, Pin, Ram, Shared, SharedScheduler};

use super::reu::Reu;

// Spec: http://ist.uwaterloo.ca/~schepers/formats/CRT.TXT
// Design:
//   A cartridge is a flat struct holding the ROM packets and the routing
//   state, with per-variant behavior dispatched over a tagged Variant enum
//   that carries the variant-specific registers. The expansion port wires
//   the cartridge to the machine lines on attach.

pub enum ChipType {
    Rom,
    Ram,
    FlashRom,
}

impl ChipType {
    pub fn from(chip_type: u16) -> ChipType {
        match chip_type {
            0x00 => ChipType::Rom,
            0x01 => ChipType::Ram,
            0x02 => ChipType::FlashRom,
            _ => panic!("invalid chip type {}", chip_type),
        }
    }
}

/// A single CHIP packet from a CRT image.
pub struct Packet {
    pub chip_type: ChipType,
    pub bank_number: u8,
    pub offset: u16,
    pub size: u16,
    pub data: Vec<u8>,
}

/// Hardware types taken from the CRT header. Only a subset is implemented;
/// attaching any other recognized type reports an unsupported-cartridge
/// error, unknown numbers an unknown-cartridge error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CartridgeKind {
    Normal,
    ActionReplay,
    KcsPower,
    FinalIii,
    SimonsBasic,
    Ocean,
    Expert,
    FunPlay,
    SuperGames,
    AtomicPower,
    EpyxFastload,
    Westermann,
    Rex,
    WarpSpeed,
    Dinamic,
    Zaxxon,
    MagicDesk,
    Comal80,
    StructuredBasic,
    MikroAssembler,
    StarDos,
    EasyFlash,
    ActionReplay3,
    GameKiller,
    FreezeFrame,
    Mach5,
    PageFox,
    Kingsoft,
    Gmod2,
    // Attached explicitly rather than through a CRT image
    Isepic,
    GeoRam,
    Reu,
}

impl CartridgeKind {
    pub fn from_hw_type(hw_type: u16) -> Option<CartridgeKind> {
        match hw_type {
            0 => Some(CartridgeKind::Normal),
            1 => Some(CartridgeKind::ActionReplay),
            2 => Some(CartridgeKind::KcsPower),
            3 => Some(CartridgeKind::FinalIii),
            4 => Some(CartridgeKind::SimonsBasic),
            5 => Some(CartridgeKind::Ocean),
            6 => Some(CartridgeKind::Expert),
            7 => Some(CartridgeKind::FunPlay),
            8 => Some(CartridgeKind::SuperGames),
            9 => Some(CartridgeKind::AtomicPower),
            10 => Some(CartridgeKind::EpyxFastload),
            11 => Some(CartridgeKind::Westermann),
            12 => Some(CartridgeKind::Rex),
            16 => Some(CartridgeKind::WarpSpeed),
            17 => Some(CartridgeKind::Dinamic),
            18 => Some(CartridgeKind::Zaxxon),
            19 => Some(CartridgeKind::MagicDesk),
            21 => Some(CartridgeKind::Comal80),
            22 => Some(CartridgeKind::StructuredBasic),
            28 => Some(CartridgeKind::MikroAssembler),
            31 => Some(CartridgeKind::StarDos),
            32 => Some(CartridgeKind::EasyFlash),
            35 => Some(CartridgeKind::ActionReplay3),
            42 => Some(CartridgeKind::GameKiller),
            45 => Some(CartridgeKind::FreezeFrame),
            51 => Some(CartridgeKind::Mach5),
            53 => Some(CartridgeKind::PageFox),
            54 => Some(CartridgeKind::Kingsoft),
            60 => Some(CartridgeKind::Gmod2),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        match self {
            CartridgeKind::Normal
            | CartridgeKind::ActionReplay
            | CartridgeKind::KcsPower
            | CartridgeKind::FinalIii
            | CartridgeKind::SimonsBasic
            | CartridgeKind::Ocean
            | CartridgeKind::Expert
            | CartridgeKind::EpyxFastload
            | CartridgeKind::Zaxxon
            | CartridgeKind::MagicDesk
            | CartridgeKind::GameKiller
            | CartridgeKind::FreezeFrame
            | CartridgeKind::PageFox
            | CartridgeKind::Isepic
            | CartridgeKind::GeoRam
            | CartridgeKind::Reu => true,
            _ => false,
        }
    }
}

/// The four configurations of the GAME/EXROM line pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CrtMode {
    Off,
    Mode8k,
    Mode16k,
    Ultimax,
}

impl CrtMode {
    /// Line levels (game, exrom), 1 = high.
    pub fn lines(self) -> (bool, bool) {
        match self {
            CrtMode::Off => (true, true),
            CrtMode::Mode8k => (true, false),
            CrtMode::Mode16k => (false, false),
            CrtMode::Ultimax => (false, true),
        }
    }
}

/// Per-variant control state.
pub enum Variant {
    Normal,
    Ocean,
    MagicDesk {
        control: u8,
    },
    FinalIii {
        control: u8,
        qd: bool,
        freeze_pressed: bool,
    },
    ActionReplay {
        control: u8,
    },
    KcsPower,
    Expert {
        active: bool,
    },
    EpyxFastload {
        discharge_cycle: u64,
    },
    Zaxxon,
    SimonsBasic,
    GameKiller {
        control: u8,
    },
    FreezeFrame,
    PageFox {
        control: u8,
    },
    Isepic {
        page: u8,
    },
    GeoRam {
        bank: u8,
        page: u8,
    },
    Reu(Reu),
}

/// Machine lines handed to the cartridge when it is plugged in.
pub struct Wiring {
    pub io_line: Shared<IoPort>,
    pub irq_line: Shared<IrqLine>,
    pub nmi_line: Shared<IrqLine>,
    pub rdy_line: Shared<IrqLine>,
    pub ba_line: Shared<Pin>,
    pub ram_64: Shared<Ram>,
    pub clock: Rc<Clock>,
    pub scheduler: SharedScheduler,
}

mod io_line {
    pub const GAME: usize = 3;
    pub const EXROM: usize = 4;
}

pub struct Cartridge {
    kind: CartridgeKind,
    variant: Variant,
    // CRT header line levels used by resetCartConfig
    crt_game: bool,
    crt_exrom: bool,
    // ROM packets in arrival order; a 16K bank may arrive as two packets
    // sharing one bank number
    packets: Vec<Packet>,
    chip_l: Option<usize>,
    chip_h: Option<usize>,
    offset_l: u16,
    offset_h: u16,
    // On-board memory
    ram: Vec<u8>,
    battery: bool,
    // Front panel
    switch_pos: i8,
    led: bool,
    // Wiring, present once attached
    wiring: Option<Wiring>,
}

impl Cartridge {
    pub fn new(kind: CartridgeKind, exrom_line: bool, game_line: bool) -> Self {
        let variant = match kind {
            CartridgeKind::Normal => Variant::Normal,
            CartridgeKind::Ocean => Variant::Ocean,
            CartridgeKind::MagicDesk => Variant::MagicDesk { control: 0 },
            CartridgeKind::FinalIii => Variant::FinalIii {
                control: 0,
                qd: true,
                freeze_pressed: false,
            },
            CartridgeKind::ActionReplay => Variant::ActionReplay { control: 0 },
            CartridgeKind::KcsPower => Variant::KcsPower,
            CartridgeKind::Expert => Variant::Expert { active: false },
            CartridgeKind::EpyxFastload => Variant::EpyxFastload { discharge_cycle: 0 },
            CartridgeKind::Zaxxon => Variant::Zaxxon,
            CartridgeKind::SimonsBasic => Variant::SimonsBasic,
            CartridgeKind::GameKiller => Variant::GameKiller { control: 0 },
            CartridgeKind::FreezeFrame => Variant::FreezeFrame,
            CartridgeKind::PageFox => Variant::PageFox { control: 0 },
            _ => panic!("unsupported cartridge kind {:?}", kind),
        };
        let ram_capacity = match kind {
            CartridgeKind::Expert => 0x2000,
            CartridgeKind::KcsPower => 0x80,
            CartridgeKind::PageFox => 0x4000,
            _ => 0,
        };
        let battery = kind == CartridgeKind::Expert;
        Self::build(kind, variant, exrom_line, game_line, ram_capacity, battery)
    }

    /// ISEPIC freezer, 2 KiB of battery-backed RAM, no ROM.
    pub fn isepic() -> Self {
        Self::build(
            CartridgeKind::Isepic,
            Variant::Isepic { page: 0 },
            true,
            true,
            0x800,
            true,
        )
    }

    /// GeoRAM expander; capacity in KiB, a power of two between 64 and 4096.
    pub fn geo_ram(kb: usize) -> Self {
        assert!(
            kb.is_power_of_two() && kb >= 64 && kb <= 4096,
            "invalid GeoRAM capacity {}",
            kb
        );
        Self::build(
            CartridgeKind::GeoRam,
            Variant::GeoRam { bank: 0, page: 0 },
            true,
            true,
            kb * 1024,
            true,
        )
    }

    /// RAM Expansion Unit; capacity in KiB, a power of two between 128 and
    /// 16384.
    pub fn reu(kb: usize) -> Self {
        Self::build(
            CartridgeKind::Reu,
            Variant::Reu(Reu::new(kb)),
            true,
            true,
            0,
            false,
        )
    }

    fn build(
        kind: CartridgeKind,
        variant: Variant,
        exrom_line: bool,
        game_line: bool,
        ram_capacity: usize,
        battery: bool,
    ) -> Self {
        Self {
            kind,
            variant,
            crt_game: game_line,
            crt_exrom: exrom_line,
            packets: Vec::new(),
            chip_l: None,
            chip_h: None,
            offset_l: 0,
            offset_h: 0,
            ram: vec![0; ram_capacity],
            battery,
            switch_pos: 0,
            led: false,
            wiring: None,
        }
    }

    pub fn add(&mut self, packet: Packet) {
        assert!(self.packets.len() < 64, "too many chip packets");
        // Expert images carry their payload in a single ROM packet that is
        // really battery RAM content
        if self.kind == CartridgeKind::Expert && packet.bank_number == 0 {
            for (i, byte) in packet.data.iter().enumerate().take(self.ram.len()) {
                self.ram[i] = *byte;
            }
        }
        self.packets.push(packet);
    }

    fn has_packets(&self) -> bool {
        !self.packets.is_empty()
    }

    pub fn get_kind(&self) -> CartridgeKind {
        self.kind
    }

    pub fn get_reu(&self) -> Option<&Reu> {
        match self.variant {
            Variant::Reu(ref reu) => Some(reu),
            _ => None,
        }
    }

    pub fn get_led(&self) -> bool {
        self.led
    }

    pub fn get_switch(&self) -> i8 {
        self.switch_pos
    }

    pub fn connect(&mut self, wiring: Wiring) {
        self.wiring = Some(wiring);
    }

    pub fn disconnect(&mut self) {
        self.wiring = None;
    }

    fn wiring(&self) -> &Wiring {
        self.wiring.as_ref().expect("cartridge is not connected")
    }

    // -- Line control

    pub fn set_game_exrom(&mut self, game: bool, exrom: bool) {
        let mut io_value = 0u8;
        io_value.set_bit(io_line::GAME, game);
        io_value.set_bit(io_line::EXROM, exrom);
        self.wiring().io_line.borrow_mut().set_value(io_value);
    }

    pub fn set_mode(&mut self, mode: CrtMode) {
        if log_enabled!(Level::Trace) {
            trace!(target: "cart::mode", "Switching to {:?}", mode);
        }
        let (game, exrom) = mode.lines();
        self.set_game_exrom(game, exrom);
    }

    // -- Bank routing

    /// Routes every packet of the given bank into its window.
    fn bank_in(&mut self, bank_number: u8) {
        let mirrored = match self.kind {
            CartridgeKind::Ocean | CartridgeKind::MagicDesk | CartridgeKind::Normal => true,
            _ => false,
        };
        let mut found = false;
        for index in 0..self.packets.len() {
            if self.packets[index].bank_number != bank_number {
                continue;
            }
            found = true;
            let offset = self.packets[index].offset;
            let size = self.packets[index].size;
            match offset {
                0x8000 => {
                    self.chip_l = Some(index);
                    self.offset_l = 0;
                    if size > 0x2000 {
                        // a 16K packet spans both windows
                        self.chip_h = Some(index);
                        self.offset_h = 0x2000;
                    } else if mirrored {
                        self.chip_h = Some(index);
                        self.offset_h = 0;
                    }
                }
                0xa000 | 0xe000 => {
                    self.chip_h = Some(index);
                    self.offset_h = 0;
                    if mirrored {
                        self.chip_l = Some(index);
                        self.offset_l = 0;
                    }
                }
                _ => panic!("invalid load address 0x{:04x}", offset),
            }
        }
        if !found {
            warn!(target: "cart", "No chip packet for bank {}", bank_number);
        }
    }

    /// Routes a bank into ROMH only, leaving ROML as it is. Packets that
    /// load into the ROMH window are preferred over a ROML chip of the
    /// same bank.
    fn bank_in_romh(&mut self, bank_number: u8, offset: u16) {
        let mut candidate = None;
        for (index, packet) in self.packets.iter().enumerate() {
            if packet.bank_number == bank_number {
                if packet.offset != 0x8000 {
                    candidate = Some(index);
                    break;
                }
                if candidate.is_none() {
                    candidate = Some(index);
                }
            }
        }
        if let Some(index) = candidate {
            self.chip_h = Some(index);
            self.offset_h = offset;
        }
    }

    fn rom_l_read(&self, offset: u16) -> Option<u8> {
        self.chip_l.map(|index| {
            let packet = &self.packets[index];
            packet.data[(self.offset_l + offset) as usize % packet.data.len()]
        })
    }

    fn rom_h_read(&self, offset: u16) -> Option<u8> {
        self.chip_h.map(|index| {
            let packet = &self.packets[index];
            packet.data[(self.offset_h + offset) as usize % packet.data.len()]
        })
    }

    // -- Main memory windows

    pub fn read(&mut self, address: u16) -> Option<u8> {
        match self.variant {
            Variant::Expert { active } => {
                let visible = self.expert_ram_visible(address, active);
                if visible {
                    Some(self.ram[(address & 0x1fff) as usize])
                } else {
                    None
                }
            }
            Variant::Isepic { page } => {
                // only the NMI vector is intercepted
                if self.switch_pos == 1 && (address == 0xfffa || address == 0xfffb) {
                    Some(self.ram[((page as usize) << 8 | (address & 0xff) as usize) & 0x7ff])
                } else {
                    None
                }
            }
            Variant::Zaxxon => match address {
                0x8000..=0x9fff => {
                    // a read in the low/high mirror of the 4K ROML chip
                    // selects the first or second ROMH bank
                    if address < 0x9000 {
                        self.bank_in_romh(0, 0);
                    } else {
                        self.bank_in_romh(1, 0);
                    }
                    self.rom_l_read(address & 0x0fff)
                }
                0xa000..=0xbfff | 0xe000..=0xffff => self.rom_h_read(address & 0x1fff),
                _ => None,
            },
            Variant::ActionReplay { control } => {
                if self.action_replay_ram_enabled(control) && (0x8000..=0x9fff).contains(&address) {
                    Some(self.ram[(address & 0x1fff) as usize])
                } else {
                    self.window_read(address)
                }
            }
            Variant::PageFox { control } => match page_fox_chip(control) {
                // chip 2 is the on-board RAM, chip 3 is not populated
                2 => match address {
                    0x8000..=0x9fff => Some(self.ram[(address & 0x1fff) as usize]),
                    0xa000..=0xbfff | 0xe000..=0xffff => {
                        Some(self.ram[0x2000 | (address & 0x1fff) as usize])
                    }
                    _ => None,
                },
                3 => None,
                _ => self.window_read(address),
            },
            _ => self.window_read(address),
        }
    }

    fn window_read(&self, address: u16) -> Option<u8> {
        match address {
            0x8000..=0x9fff => self.rom_l_read(address & 0x1fff),
            0xa000..=0xbfff => self.rom_h_read(address & 0x1fff),
            0xe000..=0xffff => self.rom_h_read(address & 0x1fff),
            _ => None,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match self.variant {
            Variant::Expert { active } => {
                let visible = self.expert_ram_visible(address, active);
                // only the ROML window is write enabled
                if visible && (0x8000..=0x9fff).contains(&address) {
                    self.ram[(address & 0x1fff) as usize] = value;
                }
            }
            Variant::Isepic { page } => {
                if self.switch_pos == 1 && (address == 0xfffa || address == 0xfffb) {
                    self.ram[((page as usize) << 8 | (address & 0xff) as usize) & 0x7ff] = value;
                }
            }
            Variant::ActionReplay { control } => {
                if self.action_replay_ram_enabled(control) && (0x8000..=0x9fff).contains(&address) {
                    self.ram[(address & 0x1fff) as usize] = value;
                }
            }
            Variant::PageFox { control } => {
                // writes always fall through to the shadowed machine RAM
                let wiring = self.wiring.as_ref().expect("cartridge is not connected");
                wiring.ram_64.borrow_mut().write(address, value);
                if page_fox_chip(control) == 2 {
                    match address {
                        0x8000..=0x9fff => {
                            self.ram[(address & 0x1fff) as usize] = value;
                        }
                        0xa000..=0xbfff => {
                            self.ram[0x2000 | (address & 0x1fff) as usize] = value;
                        }
                        _ => {}
                    }
                }
            }
            Variant::Reu(ref mut reu) => {
                // the REU watches $ff00 to trigger an armed DMA
                let wiring = self.wiring.as_ref().expect("cartridge is not connected");
                wiring.ram_64.borrow_mut().write(address, value);
                if address == 0xff00 && reu.is_armed() {
                    reu.initiate_dma(wiring);
                }
            }
            _ => {}
        }
    }

    // -- I/O space

    pub fn read_io1(&mut self, address: u16) -> Option<u8> {
        match self.variant {
            Variant::MagicDesk { control } => {
                if control.get_bit(7) {
                    Some(0)
                } else {
                    Some(control)
                }
            }
            Variant::FinalIii { .. } => self.rom_l_read(address & 0x1fff),
            Variant::ActionReplay { control } => Some(control),
            Variant::KcsPower => {
                let exrom = address.get_bit(1);
                self.set_game_exrom(true, exrom);
                self.rom_l_read(0x1e00 | (address & 0xff))
            }
            Variant::Expert { .. } => {
                // any IO1 access disables the overlay
                self.variant = Variant::Expert { active: false };
                Some(0)
            }
            Variant::EpyxFastload { .. } => {
                self.epyx_discharge();
                Some(0)
            }
            Variant::SimonsBasic => {
                self.set_mode(CrtMode::Mode8k);
                Some(0)
            }
            Variant::FreezeFrame => {
                self.set_mode(CrtMode::Mode8k);
                Some(0)
            }
            Variant::PageFox { control } => Some(control & 0x1f),
            Variant::Isepic { .. } => {
                if self.switch_pos == 1 {
                    // address bits choose the RAM page, reversed wiring
                    let page = (((address & 0b001) << 2)
                        | (address & 0b010)
                        | ((address & 0b100) >> 2)) as u8;
                    self.variant = Variant::Isepic { page };
                }
                Some(0)
            }
            Variant::GeoRam { bank, page } => {
                let offset = self.geo_ram_offset(bank, page, address);
                Some(self.ram[offset])
            }
            _ => None,
        }
    }

    pub fn write_io1(&mut self, address: u16, value: u8) {
        match self.variant {
            Variant::Ocean => {
                self.bank_in(value & 0x3f);
            }
            Variant::MagicDesk { .. } => {
                let control = value & 0x8f;
                self.variant = Variant::MagicDesk { control };
                let disabled = control.get_bit(7);
                if !disabled {
                    self.bank_in(value & 0x0f);
                }
                let game = self.crt_game;
                self.set_game_exrom(game, disabled);
            }
            Variant::ActionReplay { .. } => {
                let old = match self.variant {
                    Variant::ActionReplay { control } => control,
                    _ => unreachable!(),
                };
                if !old.get_bit(2) {
                    self.action_replay_set_control(value);
                }
            }
            Variant::KcsPower => {
                let exrom = address.get_bit(1);
                self.set_game_exrom(false, exrom);
            }
            Variant::Expert { .. } => {
                self.variant = Variant::Expert { active: false };
            }
            Variant::EpyxFastload { .. } => {
                self.epyx_discharge();
            }
            Variant::SimonsBasic => {
                self.set_mode(CrtMode::Mode16k);
            }
            Variant::GameKiller { control } => {
                self.game_killer_control(control);
            }
            Variant::PageFox { .. } => {
                self.page_fox_set_control(value);
            }
            Variant::GeoRam { bank, page } => {
                let offset = self.geo_ram_offset(bank, page, address);
                self.ram[offset] = value;
            }
            _ => {}
        }
    }

    pub fn read_io2(&mut self, address: u16) -> Option<u8> {
        match self.variant {
            Variant::FinalIii { .. } => self.rom_l_read(address & 0x1fff),
            Variant::ActionReplay { control } => {
                if self.action_replay_ram_enabled(control) {
                    Some(self.ram[(0x1f00 | (address & 0xff)) as usize])
                } else {
                    self.rom_l_read(0x1f00 | (address & 0xff))
                }
            }
            Variant::KcsPower => Some(self.ram[(address & 0x7f) as usize]),
            Variant::EpyxFastload { .. } => {
                // IO2 mirrors the last 256 ROM bytes
                self.rom_l_read(0x1f00 | (address & 0xff))
            }
            Variant::FreezeFrame => {
                self.set_mode(CrtMode::Off);
                Some(0)
            }
            Variant::Isepic { page } => {
                if self.switch_pos == 1 {
                    Some(self.ram[((page as usize) << 8 | (address & 0xff) as usize) & 0x7ff])
                } else {
                    None
                }
            }
            Variant::Reu(ref mut reu) => {
                let wiring = self.wiring.as_ref().expect("cartridge is not connected");
                Some(reu.read_io2(address, wiring))
            }
            _ => None,
        }
    }

    pub fn write_io2(&mut self, address: u16, value: u8) {
        match self.variant {
            Variant::FinalIii { .. } => {
                if address == 0xdfff {
                    self.final_iii_set_control(value);
                }
            }
            Variant::KcsPower => {
                if !address.get_bit(7) {
                    self.ram[(address & 0x7f) as usize] = value;
                }
            }
            Variant::GameKiller { control } => {
                self.game_killer_control(control);
            }
            Variant::Isepic { page } => {
                if self.switch_pos == 1 {
                    self.ram[((page as usize) << 8 | (address & 0xff) as usize) & 0x7ff] = value;
                }
            }
            Variant::GeoRam { bank, page } => {
                if address.get_bit(0) {
                    self.variant = Variant::GeoRam { bank: value, page };
                } else {
                    self.variant = Variant::GeoRam { bank, page: value };
                }
            }
            Variant::Reu(ref mut reu) => {
                let wiring = self.wiring.as_ref().expect("cartridge is not connected");
                reu.write_io2(address, value, wiring);
            }
            _ => {}
        }
    }

    // -- Router overrides

    /// Gives the cartridge the last word on the bank a zone resolves to for
    /// reads.
    pub fn peek_override(&self, zone: u8) -> Option<Bank> {
        match self.variant {
            Variant::Expert { active } => match zone {
                0x8 | 0x9 if self.expert_overlay(active) => Some(Bank::RomL),
                0xe | 0xf if self.expert_overlay(active) => Some(Bank::RomH),
                _ => None,
            },
            Variant::Isepic { .. } if self.switch_pos == 1 => match zone {
                0xf => Some(Bank::RomH),
                _ => None,
            },
            _ => None,
        }
    }

    /// Same for writes.
    pub fn poke_override(&self, zone: u8) -> Option<Bank> {
        match self.variant {
            Variant::ActionReplay { control } if self.action_replay_ram_enabled(control) => {
                match zone {
                    0x8 | 0x9 => Some(Bank::RomL),
                    _ => None,
                }
            }
            Variant::Expert { active } => match zone {
                0x8 | 0x9 if self.expert_overlay(active) => Some(Bank::RomL),
                0xe | 0xf if self.expert_overlay(active) => Some(Bank::RomH),
                _ => None,
            },
            Variant::PageFox { control } if page_fox_chip(control) == 2 => match zone {
                0x8 | 0x9 => Some(Bank::RomL),
                0xa | 0xb => Some(Bank::RomH),
                _ => None,
            },
            Variant::Isepic { .. } if self.switch_pos == 1 => match zone {
                0xf => Some(Bank::RomH),
                _ => None,
            },
            Variant::Reu(ref reu) if reu.is_armed() => match zone {
                0xf => Some(Bank::RomH),
                _ => None,
            },
            _ => None,
        }
    }

    // -- Buttons and switches

    pub fn press_button(&mut self, button: u8) {
        match self.variant {
            Variant::FinalIii { control, qd, .. } => {
                if button == 1 {
                    self.variant = Variant::FinalIii {
                        control,
                        qd,
                        freeze_pressed: true,
                    };
                    self.final_iii_update_nmi();
                }
            }
            Variant::ActionReplay { .. } => {
                if button == 1 {
                    let wiring = self.wiring();
                    wiring
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                    wiring
                        .irq_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                    // control register 0 selects ultimax until the freeze
                    // handler banks the cartridge back in
                    self.action_replay_set_control(0x03);
                }
            }
            Variant::KcsPower | Variant::FreezeFrame => {
                if button == 1 {
                    self.set_mode(CrtMode::Ultimax);
                    self.wiring()
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                }
            }
            Variant::GameKiller { .. } => {
                if button == 1 {
                    self.variant = Variant::GameKiller { control: 0 };
                    self.set_mode(CrtMode::Ultimax);
                    self.wiring()
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                }
            }
            Variant::Expert { .. } => {
                if button == 2 && self.switch_pos == 1 {
                    self.variant = Variant::Expert { active: true };
                    // two three-state buffers force the NMI line low no
                    // matter who is driving it; the CPU clears the line when
                    // it takes the interrupt
                    self.wiring()
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                }
            }
            _ => {}
        }
    }

    pub fn release_button(&mut self, button: u8) {
        match self.variant {
            Variant::FinalIii { control, .. } => {
                if button == 1 {
                    self.variant = Variant::FinalIii {
                        control,
                        qd: true,
                        freeze_pressed: false,
                    };
                    self.final_iii_update_nmi();
                    self.final_iii_update_game();
                }
            }
            Variant::ActionReplay { .. } => {
                if button == 1 {
                    let wiring = self.wiring();
                    wiring
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, false);
                    wiring
                        .irq_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, false);
                }
            }
            Variant::KcsPower | Variant::FreezeFrame | Variant::GameKiller { .. } => {
                if button == 1 {
                    self.wiring()
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, false);
                }
            }
            _ => {}
        }
    }

    pub fn set_switch(&mut self, pos: i8) {
        assert!(pos >= -1 && pos <= 1, "invalid switch position {}", pos);
        let old = self.switch_pos;
        self.switch_pos = pos;
        match self.variant {
            Variant::Isepic { .. } => {
                if pos == 1 && old != 1 {
                    // flipping the switch on raises an NMI through the
                    // overlaid vector
                    self.wiring()
                        .nmi_line
                        .borrow_mut()
                        .set_low(interrupt_source::EXPANSION, true);
                }
            }
            Variant::Expert { .. } => {
                if pos != 1 {
                    self.variant = Variant::Expert { active: false };
                }
            }
            _ => {}
        }
    }

    // -- Time dependent behavior

    pub fn execute(&mut self) {
        match self.variant {
            Variant::EpyxFastload { discharge_cycle } => {
                if self.wiring().clock.get() > discharge_cycle {
                    self.set_mode(CrtMode::Off);
                }
            }
            _ => {}
        }
    }

    /// Handler for events scheduled in the expansion slot.
    pub fn process_event(&mut self, id: u8) {
        if let Variant::Reu(ref mut reu) = self.variant {
            let wiring = self.wiring.as_ref().expect("cartridge is not connected");
            reu.process_event(id, wiring);
        }
    }

    // -- NMI hooks

    pub fn nmi_will_trigger(&mut self) {
        if let Variant::Expert { .. } = self.variant {
            if self.switch_pos == 1 {
                self.variant = Variant::Expert { active: true };
            }
        }
    }

    pub fn nmi_did_trigger(&mut self) {
        if let Variant::FinalIii {
            control,
            freeze_pressed,
            ..
        } = self.variant
        {
            if freeze_pressed {
                // the counter overflows qD to 0 once the NMI was taken,
                // which pulls the GAME line until the button is released
                self.variant = Variant::FinalIii {
                    control,
                    qd: false,
                    freeze_pressed,
                };
                self.final_iii_update_game();
            }
        }
    }

    // -- Reset

    /// Restores the GAME/EXROM configuration the cartridge powers up with.
    pub fn reset_cart_config(&mut self) {
        match self.variant {
            Variant::FinalIii { .. } => self.set_mode(CrtMode::Mode16k),
            Variant::ActionReplay { .. } => self.set_mode(CrtMode::Mode8k),
            Variant::EpyxFastload { .. } => self.set_mode(CrtMode::Mode8k),
            Variant::MagicDesk { .. } => self.set_mode(CrtMode::Mode8k),
            Variant::PageFox { .. } => self.set_mode(CrtMode::Mode16k),
            Variant::GameKiller { .. } => self.set_mode(CrtMode::Off),
            Variant::Expert { .. }
            | Variant::Isepic { .. }
            | Variant::GeoRam { .. }
            | Variant::Reu(_) => self.set_mode(CrtMode::Off),
            _ => {
                let game = self.crt_game;
                let exrom = self.crt_exrom;
                self.set_game_exrom(game, exrom);
            }
        }
    }

    pub fn reset(&mut self) {
        self.chip_l = None;
        self.chip_h = None;
        self.offset_l = 0;
        self.offset_h = 0;
        if !self.battery {
            for byte in self.ram.iter_mut() {
                *byte = 0;
            }
        }
        match self.variant {
            Variant::Normal | Variant::Ocean | Variant::MagicDesk { .. } => {
                if self.has_packets() {
                    self.bank_in(0);
                }
            }
            Variant::FinalIii { .. } => {
                self.variant = Variant::FinalIii {
                    control: 0,
                    qd: true,
                    freeze_pressed: false,
                };
                self.bank_in(0);
            }
            Variant::ActionReplay { .. } => {
                self.variant = Variant::ActionReplay { control: 0 };
                if self.has_packets() {
                    self.bank_in(0);
                }
            }
            Variant::KcsPower | Variant::SimonsBasic => {
                if self.has_packets() {
                    self.bank_in(0);
                }
            }
            Variant::Zaxxon => {
                // 4K ROML plus two 8K ROMH banks; start out on the first
                if self.has_packets() {
                    self.bank_in(0);
                    self.bank_in_romh(0, 0);
                }
            }
            Variant::EpyxFastload { .. } => {
                if self.has_packets() {
                    self.bank_in(0);
                }
                self.epyx_discharge();
            }
            Variant::GameKiller { .. } => {
                self.variant = Variant::GameKiller { control: 0 };
                if self.has_packets() {
                    self.bank_in(0);
                }
            }
            Variant::FreezeFrame => {
                if self.has_packets() {
                    self.bank_in(0);
                    // the single ROM chip shows up in ROMH as well when the
                    // freezer enters ultimax
                    self.bank_in_romh(0, 0);
                }
            }
            Variant::PageFox { .. } => {
                self.variant = Variant::PageFox { control: 0 };
                if self.has_packets() {
                    self.bank_in(0);
                }
            }
            Variant::Isepic { .. } => {
                self.variant = Variant::Isepic { page: 0 };
            }
            Variant::GeoRam { .. } => {
                self.variant = Variant::GeoRam { bank: 0, page: 0 };
            }
            Variant::Reu(ref mut reu) => {
                reu.reset();
            }
            Variant::Expert { .. } => {}
        }
        self.reset_cart_config();
    }

    // -- Variant helpers

    fn action_replay_ram_enabled(&self, control: u8) -> bool {
        control.get_bit(5)
    }

    fn action_replay_set_control(&mut self, value: u8) {
        self.variant = Variant::ActionReplay { control: value };
        if !value.get_bit(2) {
            let bank = (value >> 3) & 0x03;
            self.bank_in(bank);
        }
        // bit 0 pulls the GAME line low, bit 1 drives EXROM directly
        let game = !value.get_bit(0);
        let exrom = value.get_bit(1);
        let disabled = value.get_bit(2);
        if disabled {
            self.set_mode(CrtMode::Off);
        } else {
            self.set_game_exrom(game, exrom);
        }
    }

    fn epyx_discharge(&mut self) {
        // each access recharges the capacitor that keeps the cartridge
        // banked in for roughly 512 cycles
        let cycle = self.wiring().clock.get() + 512;
        self.variant = Variant::EpyxFastload {
            discharge_cycle: cycle,
        };
        self.set_mode(CrtMode::Mode8k);
    }

    fn expert_overlay(&self, active: bool) -> bool {
        self.switch_pos == -1 || (self.switch_pos == 1 && active)
    }

    fn expert_ram_visible(&self, address: u16, active: bool) -> bool {
        match address {
            0x8000..=0x9fff => self.switch_pos == -1 || (self.switch_pos == 1 && active),
            0xe000..=0xffff => self.switch_pos == 1 && active,
            _ => false,
        }
    }

    fn final_iii_set_control(&mut self, value: u8) {
        let (qd, freeze_pressed) = match self.variant {
            Variant::FinalIii {
                qd, freeze_pressed, ..
            } => (qd, freeze_pressed),
            _ => unreachable!(),
        };
        let hidden = match self.variant {
            Variant::FinalIii { control, .. } => control.get_bit(7),
            _ => unreachable!(),
        };
        if hidden && !freeze_pressed {
            return;
        }
        self.variant = Variant::FinalIii {
            control: value,
            qd,
            freeze_pressed,
        };
        self.final_iii_update_nmi();
        self.final_iii_update_game();
        self.bank_in(value & 0x03);
    }

    fn final_iii_update_game(&mut self) {
        let (control, qd) = match self.variant {
            Variant::FinalIii { control, qd, .. } => (control, qd),
            _ => unreachable!(),
        };
        let game = control.get_bit(5) && qd;
        let exrom = control.get_bit(4);
        self.set_game_exrom(game, exrom);
    }

    fn final_iii_update_nmi(&mut self) {
        let (control, freeze_pressed) = match self.variant {
            Variant::FinalIii {
                control,
                freeze_pressed,
                ..
            } => (control, freeze_pressed),
            _ => unreachable!(),
        };
        let nmi_high = control.get_bit(6) && !freeze_pressed;
        self.wiring()
            .nmi_line
            .borrow_mut()
            .set_low(interrupt_source::EXPANSION, !nmi_high);
    }

    fn game_killer_control(&mut self, control: u8) {
        // two writes in a row switch the cartridge off
        let control = control.saturating_add(1);
        self.variant = Variant::GameKiller { control };
        if control >= 2 {
            self.set_mode(CrtMode::Off);
        }
    }

    /// Control register layout: bits 0-1 bank, bits 2-3 chip (2 selects
    /// the on-board RAM, 3 nothing), bit 4 disable. The selected 16K unit
    /// appears in ROML and ROMH at once.
    fn page_fox_set_control(&mut self, value: u8) {
        let control = value & 0x1f;
        self.variant = Variant::PageFox { control };
        if control.get_bit(4) {
            self.set_mode(CrtMode::Off);
        } else {
            self.set_mode(CrtMode::Mode16k);
        }
        if page_fox_chip(control) < 2 {
            self.bank_in(control & 0x03);
        }
    }

    fn geo_ram_offset(&self, bank: u8, page: u8, address: u16) -> usize {
        let bank_offset = (bank as usize * 16384) % self.ram.len();
        let page_offset = (page as usize & 0x3f) * 256;
        (bank_offset + page_offset + (address & 0xff) as usize) % self.ram.len()
    }
}

fn page_fox_chip(control: u8) -> u8 {
    (control >> 2) & 0x03
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, EventScheduler};

    fn make_packet(bank: u8, offset: u16, fill: u8) -> Packet {
        Packet {
            chip_type: ChipType::Rom,
            bank_number: bank,
            offset,
            size: 0x2000,
            data: vec![fill; 0x2000],
        }
    }

    fn wire(cartridge: &mut Cartridge) {
        let wiring = Wiring {
            io_line: new_shared(IoPort::new(0xff, 0xff)),
            irq_line: new_shared(IrqLine::new("irq")),
            nmi_line: new_shared(IrqLine::new("nmi")),
            rdy_line: new_shared(IrqLine::new("rdy")),
            ba_line: new_shared(Pin::new_high()),
            ram_64: new_shared(Ram::new(0x10000)),
            clock: Rc::new(Clock::default()),
            scheduler: new_shared(EventScheduler::new()),
        };
        cartridge.connect(wiring);
    }

    #[test]
    fn ocean_bank_switch() {
        let mut cartridge = Cartridge::new(CartridgeKind::Ocean, false, true);
        for bank in 0..8 {
            cartridge.add(make_packet(bank, 0x8000, bank));
        }
        wire(&mut cartridge);
        cartridge.reset();
        cartridge.write_io1(0xde00, 0x00);
        assert_eq!(Some(0x00), cartridge.read(0x8000));
        cartridge.write_io1(0xde00, 0x03);
        assert_eq!(Some(0x03), cartridge.read(0x8000));
        // the selected page shows up in both windows
        assert_eq!(Some(0x03), cartridge.read(0xa000));
    }

    #[test]
    fn magic_desk_disable_sets_exrom() {
        let mut cartridge = Cartridge::new(CartridgeKind::MagicDesk, false, true);
        cartridge.add(make_packet(0, 0x8000, 0xaa));
        cartridge.add(make_packet(1, 0x8000, 0xbb));
        wire(&mut cartridge);
        cartridge.reset();
        cartridge.write_io1(0xde00, 0x01);
        assert_eq!(Some(0xbb), cartridge.read(0x8000));
        cartridge.write_io1(0xde00, 0x80);
        let io_value = cartridge.wiring().io_line.borrow().get_value();
        assert_eq!(true, io_value.get_bit(4));
    }

    #[test]
    fn geo_ram_window_follows_bank_and_page() {
        let mut cartridge = Cartridge::geo_ram(64);
        wire(&mut cartridge);
        cartridge.reset();
        cartridge.write_io2(0xdfff, 0x01); // bank 1
        cartridge.write_io2(0xdffe, 0x02); // page 2
        cartridge.write_io1(0xde10, 0x5a);
        assert_eq!(Some(0x5a), cartridge.read_io1(0xde10));
        cartridge.write_io2(0xdffe, 0x03);
        assert_ne!(Some(0x5a), cartridge.read_io1(0xde10));
    }

    #[test]
    fn page_fox_banks_rom_and_ram() {
        let mut cartridge = Cartridge::new(CartridgeKind::PageFox, false, false);
        // two 16K ROM banks spanning both windows
        for bank in 0..2 {
            cartridge.add(Packet {
                chip_type: ChipType::Rom,
                bank_number: bank,
                offset: 0x8000,
                size: 0x4000,
                data: vec![0x60 + bank; 0x4000],
            });
        }
        wire(&mut cartridge);
        cartridge.reset();
        assert_eq!(Some(0x60), cartridge.read(0x8000));
        assert_eq!(Some(0x60), cartridge.read(0xa000));
        cartridge.write_io1(0xde80, 0x01);
        assert_eq!(Some(0x61), cartridge.read(0x8000));
        // chip 2 swaps the on-board RAM into both windows and claims the
        // write path through the router
        cartridge.write_io1(0xde80, 0x08);
        cartridge.write(0x8000, 0x11);
        cartridge.write(0xa000, 0x22);
        assert_eq!(Some(0x11), cartridge.read(0x8000));
        assert_eq!(Some(0x22), cartridge.read(0xa000));
        assert_eq!(Some(Bank::RomL), cartridge.poke_override(0x8));
        assert_eq!(Some(Bank::RomH), cartridge.poke_override(0xa));
        // bit 4 switches the cartridge off
        cartridge.write_io1(0xde80, 0x10);
        assert_eq!(
            true,
            cartridge.wiring().io_line.borrow().get_value().get_bit(4)
        );
    }

    #[test]
    fn epyx_capacitor_discharges() {
        let clock = Rc::new(Clock::default());
        let mut cartridge = Cartridge::new(CartridgeKind::EpyxFastload, false, true);
        cartridge.add(make_packet(0, 0x8000, 0x11));
        let wiring = Wiring {
            io_line: new_shared(IoPort::new(0xff, 0xff)),
            irq_line: new_shared(IrqLine::new("irq")),
            nmi_line: new_shared(IrqLine::new("nmi")),
            rdy_line: new_shared(IrqLine::new("rdy")),
            ba_line: new_shared(Pin::new_high()),
            ram_64: new_shared(Ram::new(0x10000)),
            clock: clock.clone(),
            scheduler: new_shared(EventScheduler::new()),
        };
        cartridge.connect(wiring);
        cartridge.reset();
        // cartridge stays banked in while accesses keep recharging
        clock.tick_delta(500);
        cartridge.execute();
        assert_eq!(
            false,
            cartridge.wiring().io_line.borrow().get_value().get_bit(4)
        );
        // without further accesses the capacitor runs out
        clock.tick_delta(600);
        cartridge.execute();
        assert_eq!(
            true,
            cartridge.wiring().io_line.borrow().get_value().get_bit(4)
        );
    }
}
