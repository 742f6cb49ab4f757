// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{CycleCounter, Pin, Shared};

// Spec: http://unusedino.de/ec64/technical/misc/cia6526/timers.html
// Design:
//   The timer is modeled as a small pipeline driven by a cycle delay line.
//   A decrement is armed two cycles ahead (Count1 -> Count2 -> Count3), so
//   a started timer takes the documented three cycles before the first
//   count and a timer programmed with value V underflows after exactly
//   V + 1 input pulses. Underflow is recognized while the counter reads
//   zero and a count pulse is in its second stage; the reload via Load1
//   suppresses the decrement that would otherwise hit the fresh latch
//   value.

pub mod cycle {
    pub const COUNT0: u16 = 1;
    pub const COUNT1: u16 = 1 << 1;
    pub const COUNT2: u16 = 1 << 2;
    pub const COUNT3: u16 = 1 << 3;
    pub const LOAD0: u16 = 1 << 4;
    pub const LOAD1: u16 = 1 << 5;
    pub const MASK: u16 = COUNT0 | COUNT1 | COUNT2 | COUNT3 | LOAD0 | LOAD1;
}

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, PartialEq)]
enum Input {
    SystemClock,
    External,
    TimerA,
    TimerAWithCnt,
}

#[derive(Copy, Clone, PartialEq)]
enum Output {
    Pulse,
    Toggle,
}

pub struct Timer {
    // Configuration
    mode: Mode,
    enabled: bool,
    input: Input,
    one_shot: bool,
    output: Output,
    pb_on: bool,
    serial_output: bool,
    // Runtime state
    counter: u16,
    latch: u16,
    pb_pulse: bool,
    pb_toggle: bool,
    delay: CycleCounter,
    // I/O
    cnt_pin: Shared<Pin>,
}

impl Timer {
    pub fn new(mode: Mode, cnt_pin: Shared<Pin>) -> Self {
        Self {
            mode,
            enabled: false,
            input: Input::SystemClock,
            one_shot: true,
            output: Output::Pulse,
            pb_on: false,
            serial_output: false,
            counter: 0,
            latch: 0xffff,
            pb_pulse: false,
            pb_toggle: false,
            delay: CycleCounter::new(cycle::MASK),
            cnt_pin,
        }
    }

    pub fn get_config(&self) -> u8 {
        let mut config = 0u8;
        config.set_bit(0, self.enabled);
        config.set_bit(1, self.pb_on);
        config.set_bit(2, self.output == Output::Toggle);
        config.set_bit(3, self.one_shot);
        match self.mode {
            Mode::TimerA => {
                config.set_bit(5, self.input == Input::External);
                config.set_bit(6, self.serial_output);
            }
            Mode::TimerB => {
                let input = match self.input {
                    Input::SystemClock => 0,
                    Input::External => 1,
                    Input::TimerA => 2,
                    Input::TimerAWithCnt => 3,
                };
                config.set_bits(5..7, input);
            }
        }
        config
    }

    pub fn get_counter(&self) -> u16 {
        self.counter
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn get_counter_lo(&self) -> u8 {
        (self.counter & 0xff) as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn get_pb_output(&self) -> bool {
        match self.output {
            Output::Pulse => self.pb_pulse,
            Output::Toggle => self.pb_toggle,
        }
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn is_running(&self) -> bool {
        self.enabled || self.delay.has_cycle(cycle::MASK)
    }

    pub fn is_serial_output(&self) -> bool {
        self.serial_output
    }

    pub fn set_config(&mut self, value: u8) {
        if value.get_bit(0) && !self.enabled {
            // the toggle output starts out high when the timer is started
            self.pb_toggle = true;
            self.delay.feed(cycle::COUNT0 | cycle::COUNT1);
        }
        self.enabled = value.get_bit(0);
        self.pb_on = value.get_bit(1);
        self.output = if value.get_bit(2) {
            Output::Toggle
        } else {
            Output::Pulse
        };
        self.one_shot = value.get_bit(3);
        if value.get_bit(4) {
            self.delay.feed(cycle::LOAD0);
        }
        self.input = match self.mode {
            Mode::TimerA => {
                self.serial_output = value.get_bit(6);
                if value.get_bit(5) {
                    Input::External
                } else {
                    Input::SystemClock
                }
            }
            Mode::TimerB => match value.get_bits(5..7) {
                0 => Input::SystemClock,
                1 => Input::External,
                2 => Input::TimerA,
                3 => Input::TimerAWithCnt,
                _ => unreachable!(),
            },
        };
        self.delay.autofeed(
            cycle::COUNT2,
            self.enabled && self.input == Input::SystemClock,
        );
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00ff) | ((value as u16) << 8);
        // a stopped timer loads the latch as soon as the high byte arrives
        if !self.enabled {
            self.delay.feed(cycle::LOAD0);
        }
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | (value as u16);
    }

    /// Feeds count pulses that do not come from the system clock. Timer B
    /// in cascaded mode counts timer A underflows.
    pub fn feed_source(&mut self, timer_a_output: bool) {
        let pulse = match self.input {
            Input::SystemClock => false,
            Input::External => self.cnt_pin.borrow().is_rising(),
            Input::TimerA => timer_a_output,
            Input::TimerAWithCnt => timer_a_output && self.cnt_pin.borrow().is_high(),
        };
        if self.enabled && pulse {
            self.delay.feed(cycle::COUNT1);
        }
    }

    pub fn clock(&mut self) -> bool {
        self.pb_pulse = false;
        // count
        if self.delay.has_cycle(cycle::COUNT3) {
            self.counter = self.counter.wrapping_sub(1);
        }
        // underflow
        let mut output = false;
        if self.counter == 0 && self.delay.has_cycle(cycle::COUNT2) && self.enabled {
            output = true;
            self.pb_pulse = true;
            self.pb_toggle = !self.pb_toggle;
            self.delay.feed(cycle::LOAD1);
            if self.one_shot {
                self.enabled = false;
                self.delay.autofeed(cycle::COUNT2, false);
            }
        }
        // load
        if self.delay.has_cycle(cycle::LOAD1) {
            self.counter = self.latch;
            // the cycle that reloads the counter must not also count
            self.delay.remove(cycle::COUNT2);
        }
        self.delay.clock();
        output
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.input = Input::SystemClock;
        self.one_shot = true;
        self.output = Output::Pulse;
        self.pb_on = false;
        self.serial_output = false;
        self.counter = 0x0000;
        self.latch = 0xffff;
        self.pb_pulse = false;
        self.pb_toggle = false;
        self.delay.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared;

    fn setup_timer() -> Timer {
        let cnt_pin = new_shared(Pin::new_high());
        let mut timer = Timer::new(Mode::TimerA, cnt_pin);
        timer.reset();
        timer
    }

    #[test]
    fn programmed_value_counts_v_plus_one_cycles() {
        let mut timer = setup_timer();
        timer.set_latch_lo(0x03);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        assert_eq!(0x0003, timer.get_counter());
        timer.set_config(0x01);
        let mut cycles = 0;
        loop {
            cycles += 1;
            if timer.clock() {
                break;
            }
            assert!(cycles < 100);
        }
        // two cycles of start delay, then the counter walks down to zero
        assert_eq!(2 + 3, cycles);
        // in continuous mode each period takes exactly V + 1 cycles since
        // the reload cycle does not count
        let mut period = 0;
        loop {
            period += 1;
            if timer.clock() {
                break;
            }
            assert!(period < 100);
        }
        assert_eq!(3 + 1, period);
    }

    #[test]
    fn one_shot_stops_after_underflow() {
        let mut timer = setup_timer();
        timer.set_latch_lo(0x01);
        timer.set_latch_hi(0x00);
        timer.clock();
        timer.clock();
        timer.set_config(0x09);
        for _ in 0..4 {
            timer.clock();
        }
        assert_eq!(false, timer.is_running());
        assert_eq!(0x0001, timer.get_counter());
    }
}
