// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// Spec: https://www.c64-wiki.com/index.php/Bank_Switching

use log::Level;

use crate::factory::{Bank, Mmu};

// The mode index is {EXROM, GAME, CHAREN, HIRAM, LORAM}; modes 16-23 are
// the Ultimax configurations which expose cartridge ROMH at $e000 and cut
// the machine RAM above $1000.

#[derive(Clone, Copy)]
struct Mode {
    banks: [Bank; 0x10],
}

impl Mode {
    pub fn new(config: [Bank; 7]) -> Self {
        let mut banks = [Bank::Disabled; 0x10];
        for (i, bank) in banks.iter_mut().enumerate().take(0x10) {
            *bank = match i {
                0x00 => config[0],
                0x01..=0x07 => config[1],
                0x08..=0x09 => config[2],
                0x0a..=0x0b => config[3],
                0x0c => config[4],
                0x0d => config[5],
                0x0e..=0x0f => config[6],
                _ => panic!("invalid zone {}", i),
            };
        }
        Mode { banks }
    }

    pub fn get(&self, zone: u8) -> Bank {
        self.banks[zone as usize]
    }
}

pub struct Pla {
    map: MemoryMap,
    mode: Mode,
    mode_id: u8,
}

impl Pla {
    pub fn new() -> Self {
        let map = MemoryMap::default();
        let mode = map.get(31);
        Pla {
            map,
            mode,
            mode_id: 31,
        }
    }
}

impl Mmu for Pla {
    fn map(&self, address: u16) -> Bank {
        let zone = address >> 12;
        self.mode.get(zone as u8)
    }

    fn mode(&self) -> u8 {
        self.mode_id
    }

    fn switch_banks(&mut self, mode: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "mem::banks", "Switching to mode {}", mode);
        }
        self.mode = self.map.get(mode);
        self.mode_id = mode;
    }
}

struct MemoryMap {
    modes: [Mode; 32],
}

impl Default for MemoryMap {
    fn default() -> Self {
        let m31 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Basic,
            Bank::Ram,
            Bank::Io,
            Bank::Kernal,
        ];
        let m30_14 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Io,
            Bank::Kernal,
        ];
        let m29_13 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Io,
            Bank::Ram,
        ];
        let m28_24 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
        ];
        let m27 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Basic,
            Bank::Ram,
            Bank::Charset,
            Bank::Kernal,
        ];
        let m26_10 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Charset,
            Bank::Kernal,
        ];
        let m25_9 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Charset,
            Bank::Ram,
        ];
        let m23_16 = [
            Bank::Ram,
            Bank::Disabled,
            Bank::RomL,
            Bank::Disabled,
            Bank::Disabled,
            Bank::Io,
            Bank::RomH,
        ];
        let m15 = [
            Bank::Ram,
            Bank::Ram,
            Bank::RomL,
            Bank::Basic,
            Bank::Ram,
            Bank::Io,
            Bank::Kernal,
        ];
        let m12_8_4_0 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
        ];
        let m11 = [
            Bank::Ram,
            Bank::Ram,
            Bank::RomL,
            Bank::Basic,
            Bank::Ram,
            Bank::Charset,
            Bank::Kernal,
        ];
        let m7 = [
            Bank::Ram,
            Bank::Ram,
            Bank::RomL,
            Bank::RomH,
            Bank::Ram,
            Bank::Io,
            Bank::Kernal,
        ];
        let m6 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::RomH,
            Bank::Ram,
            Bank::Io,
            Bank::Kernal,
        ];
        let m5 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Io,
            Bank::Ram,
        ];
        let m3 = [
            Bank::Ram,
            Bank::Ram,
            Bank::RomL,
            Bank::RomH,
            Bank::Ram,
            Bank::Charset,
            Bank::Kernal,
        ];
        let m2 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::RomH,
            Bank::Ram,
            Bank::Charset,
            Bank::Kernal,
        ];
        let m1 = [
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
            Bank::Ram,
        ];
        MemoryMap {
            modes: [
                Mode::new(m12_8_4_0),
                Mode::new(m1),
                Mode::new(m2),
                Mode::new(m3),
                Mode::new(m12_8_4_0),
                Mode::new(m5),
                Mode::new(m6),
                Mode::new(m7),
                Mode::new(m12_8_4_0),
                Mode::new(m25_9),
                Mode::new(m26_10),
                Mode::new(m11),
                Mode::new(m12_8_4_0),
                Mode::new(m29_13),
                Mode::new(m30_14),
                Mode::new(m15),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m23_16),
                Mode::new(m28_24),
                Mode::new(m25_9),
                Mode::new(m26_10),
                Mode::new(m27),
                Mode::new(m28_24),
                Mode::new(m29_13),
                Mode::new(m30_14),
                Mode::new(m31),
            ],
        }
    }
}

impl MemoryMap {
    pub fn get(&self, mode: u8) -> Mode {
        match mode {
            0..=31 => self.modes[mode as usize],
            _ => panic!("invalid mode {}", mode),
        }
    }
}

/// Ultimax is the configuration with GAME low and EXROM high.
pub fn is_ultimax_mode(mode: u8) -> bool {
    mode & 0x18 == 0x10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_maps_roms() {
        let pla = Pla::new();
        assert_eq!(Bank::Basic, pla.map(0xa000));
        assert_eq!(Bank::Io, pla.map(0xd000));
        assert_eq!(Bank::Kernal, pla.map(0xe000));
    }

    #[test]
    fn mode_28_is_all_ram() {
        let mut pla = Pla::new();
        pla.switch_banks(28);
        assert_eq!(Bank::Ram, pla.map(0xa000));
        assert_eq!(Bank::Ram, pla.map(0xd000));
        assert_eq!(Bank::Ram, pla.map(0xe000));
    }

    #[test]
    fn ultimax_rewires_kernal_to_cartridge() {
        let mut pla = Pla::new();
        pla.switch_banks(0x17 & 0x1f);
        assert!(is_ultimax_mode(pla.mode()));
        assert_eq!(Bank::RomL, pla.map(0x8000));
        assert_eq!(Bank::Disabled, pla.map(0xa000));
        assert_eq!(Bank::RomH, pla.map(0xe000));
    }
}
