// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#![cfg_attr(feature = "cargo-clippy", allow(clippy::cast_lossless))]

use std::rc::Rc;
use std::sync::Arc;

use log::Level;
use resid;

use crate::factory::{Chip, SidModel, SoundOutput};
use crate::util::Clock;

#[derive(Clone, Copy, PartialEq)]
pub enum SamplingMethod {
    Fast,
    Interpolate,
    Resample,
    ResampleFast,
}

/// Up to four SID chips mapped 0x20 apart in the $d4xx page. The DSP cores
/// are treated as black boxes; the bridge only routes register access and
/// catches the sample stream up to the system clock whenever sound state
/// becomes observable.
pub struct SidBridge {
    // Dependencies
    system_clock: Rc<Clock>,
    sound_buffer: Arc<dyn SoundOutput>,
    // Functional units
    chips: Vec<resid::Sid>,
    // Runtime state
    buffer: [i16; 8192],
    mix_buffer: [i16; 8192],
    cycles: u64,
}

impl SidBridge {
    pub fn new(
        chip_model: SidModel,
        num_sids: usize,
        system_clock: Rc<Clock>,
        sound_buffer: Arc<dyn SoundOutput>,
    ) -> Self {
        assert!(num_sids >= 1 && num_sids <= 4, "invalid sid count {}", num_sids);
        info!(target: "sound", "Initializing {} SID chip(s)", num_sids);
        let resid_model = match chip_model {
            SidModel::Mos6581 => resid::ChipModel::Mos6581,
            SidModel::Mos8580 => resid::ChipModel::Mos8580,
        };
        let mut chips = Vec::new();
        for _ in 0..num_sids {
            chips.push(resid::Sid::new(resid_model));
        }
        SidBridge {
            system_clock,
            sound_buffer,
            chips,
            buffer: [0i16; 8192],
            mix_buffer: [0i16; 8192],
            cycles: 0,
        }
    }

    pub fn enable_filter(&mut self, enabled: bool) {
        for chip in self.chips.iter_mut() {
            chip.enable_filter(enabled);
        }
    }

    pub fn set_sampling_parameters(
        &mut self,
        sampling_method: SamplingMethod,
        clock_freq: u32,
        sample_freq: u32,
    ) {
        let resid_sampling_method = match sampling_method {
            SamplingMethod::Fast => resid::SamplingMethod::Fast,
            SamplingMethod::Interpolate => resid::SamplingMethod::Interpolate,
            SamplingMethod::Resample => resid::SamplingMethod::Resample,
            SamplingMethod::ResampleFast => resid::SamplingMethod::ResampleFast,
        };
        for chip in self.chips.iter_mut() {
            chip.set_sampling_parameters(resid_sampling_method, clock_freq, sample_freq);
        }
    }

    fn chip_index(&self, reg: u8) -> usize {
        let slot = ((reg >> 5) & 0x03) as usize;
        if slot < self.chips.len() {
            slot
        } else {
            0
        }
    }

    fn sync(&mut self) {
        if self.cycles != self.system_clock.get() {
            let delta = (self.system_clock.get() - self.cycles) as u32;
            self.clock_delta(delta);
        }
    }
}

impl Chip for SidBridge {
    fn clock(&mut self) {
        for chip in self.chips.iter_mut() {
            chip.clock();
        }
        self.cycles = self.cycles.wrapping_add(1);
    }

    fn clock_delta(&mut self, delta: u32) {
        if delta > 0 {
            let mut delta = delta;
            while delta > 0 {
                let (samples, next_delta) = {
                    let chip = &mut self.chips[0];
                    chip.sample(delta, &mut self.buffer[..], 1)
                };
                // secondary chips are advanced in lockstep and mixed in
                for chip in self.chips.iter_mut().skip(1) {
                    chip.sample(delta, &mut self.mix_buffer[..], 1);
                    for i in 0..samples {
                        self.buffer[i] = self.buffer[i].saturating_add(self.mix_buffer[i]);
                    }
                }
                self.sound_buffer.write(&self.buffer[0..samples]);
                delta = next_delta;
            }
        }
        self.cycles = self.cycles.wrapping_add(delta as u64);
    }

    fn process_vsync(&mut self) {
        self.sync();
    }

    fn reset(&mut self) {
        for chip in self.chips.iter_mut() {
            chip.reset();
        }
        self.cycles = self.system_clock.get();
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        self.sync();
        let index = self.chip_index(reg);
        self.chips[index].read(reg & 0x1f)
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "sid::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        self.sync();
        let index = self.chip_index(reg);
        self.chips[index].write(reg & 0x1f, value);
    }
}
