// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

/// Control port device selection.
#[derive(Clone, Copy, PartialEq)]
pub enum Mode {
    None,
    Joy0,
    Joy1,
}

impl Mode {
    pub fn from(mode: &str) -> Mode {
        match mode {
            "none" => Mode::None,
            "joy0" => Mode::Joy0,
            "joy1" => Mode::Joy1,
            _ => panic!("invalid mode {}", mode),
        }
    }
}

mod state_bit {
    pub const UP: usize = 0;
    pub const DOWN: usize = 1;
    pub const LEFT: usize = 2;
    pub const RIGHT: usize = 3;
    pub const FIRE: usize = 4;
}

/// A digital joystick. The five switch states are latched into the shared
/// port state scanned by CIA 1. Autofire toggles the fire switch at frame
/// boundaries until the configured number of bullets runs out.
pub struct Joystick {
    // Configuration
    mode: Mode,
    axis_threshold: i16,
    // Autofire
    autofire_enabled: bool,
    autofire_bullets: i32,
    autofire_toggle_frames: u32,
    // Runtime state
    bullets_left: i32,
    fire_held: bool,
    fire_phase: bool,
    frame_counter: u32,
    // I/O
    state: SharedCell<u8>,
}

impl Joystick {
    pub fn new(mode: Mode, axis_threshold: i16, state: SharedCell<u8>) -> Self {
        Self {
            mode,
            axis_threshold,
            autofire_enabled: false,
            autofire_bullets: -1,
            autofire_toggle_frames: 3,
            bullets_left: -1,
            fire_held: false,
            fire_phase: false,
            frame_counter: 0,
            state,
        }
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.bullets_left = self.autofire_bullets;
        self.fire_held = false;
        self.fire_phase = false;
        self.frame_counter = 0;
        self.state.set(0);
    }

    /// Autofire configuration: a negative bullet count keeps firing forever;
    /// frequency is given in Hz and converted against the refresh rate.
    pub fn set_autofire(&mut self, enabled: bool, bullets: i32, frequency: f32, refresh_rate: f32) {
        self.autofire_enabled = enabled;
        self.autofire_bullets = bullets;
        self.bullets_left = bullets;
        let frames = (refresh_rate / (frequency * 2.0)).max(1.0);
        self.autofire_toggle_frames = frames as u32;
    }

    // -- Events

    pub fn set_up(&mut self, active: bool) {
        self.set_state_bit(state_bit::UP, active);
    }

    pub fn set_down(&mut self, active: bool) {
        self.set_state_bit(state_bit::DOWN, active);
    }

    pub fn set_left(&mut self, active: bool) {
        self.set_state_bit(state_bit::LEFT, active);
    }

    pub fn set_right(&mut self, active: bool) {
        self.set_state_bit(state_bit::RIGHT, active);
    }

    pub fn set_fire(&mut self, active: bool) {
        self.fire_held = active;
        if active && self.autofire_enabled {
            self.bullets_left = self.autofire_bullets;
            self.fire_phase = true;
            self.frame_counter = 0;
        }
        if !self.autofire_enabled {
            self.set_state_bit(state_bit::FIRE, active);
        }
    }

    pub fn on_axis_motion(&mut self, axis: u8, value: i16) {
        match axis {
            0 => {
                self.set_left(value < -self.axis_threshold);
                self.set_right(value > self.axis_threshold);
            }
            1 => {
                self.set_up(value < -self.axis_threshold);
                self.set_down(value > self.axis_threshold);
            }
            _ => panic!("invalid axis {}", axis),
        }
    }

    /// Advances the autofire machinery by one frame.
    pub fn process_vsync(&mut self) {
        if !self.autofire_enabled || !self.fire_held {
            return;
        }
        if self.autofire_bullets >= 0 && self.bullets_left == 0 {
            self.set_state_bit(state_bit::FIRE, false);
            return;
        }
        self.frame_counter += 1;
        if self.frame_counter >= self.autofire_toggle_frames {
            self.frame_counter = 0;
            self.fire_phase = !self.fire_phase;
            if !self.fire_phase && self.autofire_bullets >= 0 {
                self.bullets_left -= 1;
            }
        }
        let phase = self.fire_phase;
        self.set_state_bit(state_bit::FIRE, phase);
    }

    fn set_state_bit(&mut self, bit: usize, value: bool) {
        let mut state = self.state.get();
        state.set_bit(bit, value);
        self.state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared_cell;

    #[test]
    fn switches_latch_into_state() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 3200, state.clone());
        joystick.set_up(true);
        joystick.set_fire(true);
        assert_eq!(0b0001_0001, state.get());
        joystick.set_fire(false);
        assert_eq!(0b0000_0001, state.get());
    }

    #[test]
    fn autofire_toggles_at_frame_boundaries() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 3200, state.clone());
        joystick.set_autofire(true, -1, 10.0, 60.0);
        joystick.set_fire(true);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..12 {
            joystick.process_vsync();
            if state.get().get_bit(4) {
                seen_high = true;
            } else {
                seen_low = true;
            }
        }
        assert!(seen_high && seen_low);
    }

    #[test]
    fn autofire_runs_out_of_bullets() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 3200, state.clone());
        joystick.set_autofire(true, 2, 15.0, 60.0);
        joystick.set_fire(true);
        for _ in 0..60 {
            joystick.process_vsync();
        }
        assert_eq!(false, state.get().get_bit(4));
    }
}
