// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use cobalt64_core::device::joystick;
use cobalt64_core::drive::DriveConfig;
use cobalt64_core::factory::SystemModel;

pub struct Config {
    pub model: SystemModel,
    pub joystick: JoystickConfig,
    pub sound: SoundConfig,
    pub roms: RomData,
    pub drives: DrivesConfig,
}

impl Config {
    pub fn new(model: SystemModel) -> Config {
        Config {
            model,
            joystick: JoystickConfig::default(),
            sound: SoundConfig::default(),
            roms: RomData::default(),
            drives: DrivesConfig::default(),
        }
    }

    pub fn new_with_roms(
        model: SystemModel,
        basic: &[u8],
        charset: &[u8],
        kernal: &[u8],
    ) -> Config {
        Config {
            model,
            joystick: JoystickConfig::default(),
            sound: SoundConfig::default(),
            roms: RomData::new(basic, charset, kernal),
            drives: DrivesConfig::default(),
        }
    }

    /// ROM images must be in place before the machine can run.
    pub fn validate_roms(&self) -> Result<(), String> {
        if !self.roms.basic_present {
            return Err("no basic rom installed".to_string());
        }
        if !self.roms.charset_present {
            return Err("no character rom installed".to_string());
        }
        if !self.roms.kernal_present {
            return Err("no kernal rom installed".to_string());
        }
        Ok(())
    }
}

pub struct JoystickConfig {
    pub axis_motion_threshold: i16,
    pub joystick_1: joystick::Mode,
    pub joystick_2: joystick::Mode,
}

impl JoystickConfig {
    pub fn default() -> JoystickConfig {
        JoystickConfig {
            axis_motion_threshold: 3200,
            joystick_1: joystick::Mode::Joy0,
            joystick_2: joystick::Mode::None,
        }
    }
}

pub struct RomData {
    pub basic: Vec<u8>,
    pub charset: Vec<u8>,
    pub kernal: Vec<u8>,
    pub d1541: Vec<u8>,
    pub basic_present: bool,
    pub charset_present: bool,
    pub kernal_present: bool,
    pub d1541_present: bool,
}

impl RomData {
    pub fn default() -> Self {
        RomData {
            basic: vec![0x00; 0x2000],
            charset: vec![0x00; 0x1000],
            kernal: vec![0x00; 0x2000],
            d1541: vec![0x00; 0x4000],
            basic_present: false,
            charset_present: false,
            kernal_present: false,
            d1541_present: false,
        }
    }

    pub fn new(basic: &[u8], charset: &[u8], kernal: &[u8]) -> Self {
        RomData {
            basic: basic.to_vec(),
            charset: charset.to_vec(),
            kernal: kernal.to_vec(),
            d1541: vec![0x00; 0x4000],
            basic_present: true,
            charset_present: true,
            kernal_present: true,
            d1541_present: false,
        }
    }

    pub fn set_d1541(&mut self, data: &[u8]) {
        self.d1541 = data.to_vec();
        self.d1541_present = true;
    }
}

pub struct SoundConfig {
    pub enable: bool,
    pub buffer_size: usize,
    pub sample_rate: u32,
    pub sid_filters: bool,
    pub num_sids: usize,
}

impl SoundConfig {
    pub fn default() -> SoundConfig {
        SoundConfig {
            enable: true,
            buffer_size: 4096,
            sample_rate: 44100,
            sid_filters: true,
            num_sids: 1,
        }
    }
}

pub struct DrivesConfig {
    pub drive_8: bool,
    pub drive_9: bool,
    pub drive_config: DriveConfig,
}

impl DrivesConfig {
    pub fn default() -> Self {
        Self {
            drive_8: true,
            drive_9: false,
            drive_config: DriveConfig::default(),
        }
    }
}
