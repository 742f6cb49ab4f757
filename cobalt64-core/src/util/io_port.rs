// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

pub type Observer = Box<dyn Fn(u8)>;

// direction - 1 is an output driven from the latch, 0 is an input pin.

pub struct IoPort {
    direction: u8,
    input: u8,
    output: u8,
    observer: Option<Observer>,
}

impl IoPort {
    pub fn new(direction: u8, input: u8) -> IoPort {
        IoPort {
            direction,
            input,
            output: 0,
            observer: None,
        }
    }

    #[inline]
    pub fn get_direction(&self) -> u8 {
        self.direction
    }

    #[inline]
    pub fn get_value(&self) -> u8 {
        (self.output & self.direction) | (self.input & !self.direction)
    }

    /// Port value with the floating input pins replaced by an external
    /// signal, used when another device drives the undriven lines.
    #[inline]
    pub fn get_value_with_input(&self, input: u8) -> u8 {
        (self.output & self.direction) | (input & !self.direction)
    }

    #[inline]
    pub fn set_direction(&mut self, direction: u8) {
        self.direction = direction;
        self.notify_observer();
    }

    #[inline]
    pub fn set_input(&mut self, value: u8) {
        self.input = value;
        self.notify_observer();
    }

    #[inline]
    pub fn set_input_bit(&mut self, bit: usize, value: bool) {
        self.input.set_bit(bit, value);
        self.notify_observer();
    }

    #[inline]
    pub fn set_observer(&mut self, observer: Observer) {
        self.observer = Some(observer);
    }

    #[inline]
    pub fn set_value(&mut self, value: u8) {
        self.output = value;
        self.notify_observer();
    }

    #[inline]
    pub fn reset(&mut self) {
        self.direction = 0x00;
        self.input = 0xff;
        self.output = 0x00;
        self.notify_observer();
    }

    #[inline]
    fn notify_observer(&self) {
        if let Some(ref observer) = self.observer {
            observer(self.get_value());
        }
    }
}
