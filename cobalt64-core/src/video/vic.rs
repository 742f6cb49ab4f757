// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;

use bit_field::BitField;
use log::Level;

use crate::factory::{Chip, VicModel, VideoOutput};
use crate::util::{
    interrupt_source, Clock, IrqControl, IrqLine, Pin, Ram, Shared, SharedCell, TimeDelayed,
};

use super::border_unit::BorderUnit;
use super::gfx_sequencer::{GfxSequencer, Mode};
use super::mux_unit::MuxUnit;
use super::spec::Spec;
use super::sprite_sequencer::{self, SpriteSequencer};
use super::vic_memory::VicMemory;

// Spec: The MOS 6567/6569 video controller (VIC-II) and its application
//       in the Commodore 64
// Design:
//   One call to clock() emulates one raster cycle: the memory access of
//   that cycle, the BA line for the next cycles, and eight output pixels
//   pushed through the graphics/sprite sequencers and the priority mux.
//   Character fetches steal the bus on badlines; sprite DMA claims it
//   around the per-sprite fetch slots at the line edges.

mod irq_event {
    pub const RASTER: usize = 0;
    pub const SPRITE_DATA_COLLISION: usize = 1;
    pub const SPRITE_SPRITE_COLLISION: usize = 2;
    #[allow(dead_code)]
    pub const LIGHTPEN: usize = 3;
}

pub struct Vic {
    // Configuration
    spec: Spec,
    // Dependencies
    color_ram: Shared<Ram>,
    mem: VicMemory,
    // Functional units
    border_unit: BorderUnit,
    gfx_seq: GfxSequencer,
    mux_unit: MuxUnit,
    sprites: [SpriteSequencer; 8],
    // Control registers; DEN goes through a delay pipeline so a write in
    // cycle N is seen by the badline and border logic in cycle N+1
    den: TimeDelayed<bool>,
    raster_compare: u16,
    x_scroll: u8,
    y_scroll: u8,
    char_base: u16,
    video_matrix: u16,
    light_pen_pos: [u8; 2],
    // Interrupts
    irq_control: IrqControl,
    raster_irq_done: bool,
    // Runtime state
    raster_y: u16,
    cycle: u16,
    vc: u16,
    vc_base: u16,
    rc: u8,
    vmli: usize,
    display_on: bool,
    badline: bool,
    badline_enable: bool,
    vm_data_line: [u8; 40],
    vm_color_line: [u8; 40],
    sprite_ptrs: [u16; 8],
    sprite_sprite_collision: u8,
    sprite_data_collision: u8,
    // I/O
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,
    frame_buffer: Shared<dyn VideoOutput>,
    vsync_flag: SharedCell<bool>,
}

impl Vic {
    #![cfg_attr(feature = "cargo-clippy", allow(clippy::too_many_arguments))]
    pub fn new(
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        mem: VicMemory,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        clock: Rc<Clock>,
    ) -> Self {
        info!(target: "video", "Initializing VIC");
        let spec = Spec::new(chip_model);
        let border_unit = BorderUnit::new(|x| spec.sprite_x_to_screen(x));
        Vic {
            spec,
            color_ram,
            mem,
            border_unit,
            gfx_seq: GfxSequencer::new(),
            mux_unit: MuxUnit::new(),
            sprites: [
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
            ],
            den: TimeDelayed::new(1, true, clock),
            raster_compare: 0,
            x_scroll: 0,
            y_scroll: 3,
            char_base: 0x1000,
            video_matrix: 0x0400,
            light_pen_pos: [0; 2],
            irq_control: IrqControl::default(),
            raster_irq_done: false,
            raster_y: 0,
            cycle: 1,
            vc: 0,
            vc_base: 0,
            rc: 0,
            vmli: 0,
            display_on: false,
            badline: false,
            badline_enable: false,
            vm_data_line: [0; 40],
            vm_color_line: [0; 40],
            sprite_ptrs: [0; 8],
            sprite_sprite_collision: 0,
            sprite_data_collision: 0,
            ba_line,
            irq_line,
            frame_buffer,
            vsync_flag,
        }
    }

    pub fn get_raster(&self) -> u16 {
        self.raster_y
    }

    pub fn get_cycle(&self) -> u16 {
        self.cycle
    }

    pub fn is_badline(&self) -> bool {
        self.badline
    }

    // -- Badline and display state

    fn update_badline(&mut self) {
        if self.raster_y == 0x30 && self.den.delayed() {
            self.badline_enable = true;
        }
        let badline = self.badline_enable
            && self.raster_y >= 0x30
            && self.raster_y <= 0xf7
            && (self.raster_y & 0x07) as u8 == self.y_scroll;
        if badline && !self.badline {
            self.display_on = true;
        }
        self.badline = badline;
    }

    // -- Memory accesses of the current cycle

    fn fetch_cycle(&mut self) {
        let cycle = self.cycle;
        // sprite pointer and data fetches at the line edges
        for n in 0..8 {
            let fetch = self.spec.sprite_fetch_cycle(n);
            if cycle == fetch {
                self.sprite_ptrs[n] =
                    (self.mem.read(self.video_matrix | 0x03f8 | n as u16) as u16) << 6;
                if self.sprites[n].dma {
                    let data = self.fetch_sprite_data(n);
                    self.sprites[n].set_data(0, data);
                }
            } else if cycle == fetch + 1 && self.sprites[n].dma {
                let data = self.fetch_sprite_data(n);
                self.sprites[n].set_data(1, data);
                let data = self.fetch_sprite_data(n);
                self.sprites[n].set_data(2, data);
            }
        }
        match cycle {
            14 => {
                self.vc = self.vc_base;
                self.vmli = 0;
                if self.badline {
                    self.rc = 0;
                }
            }
            15 => {
                for sprite in self.sprites.iter_mut() {
                    if sprite.expansion_ff {
                        sprite.mc_base = (sprite.mc_base + 2) & 0x3f;
                    }
                }
                self.c_access();
            }
            16 => {
                for sprite in self.sprites.iter_mut() {
                    if sprite.expansion_ff {
                        sprite.mc_base = (sprite.mc_base + 1) & 0x3f;
                        if sprite.mc_base == 63 {
                            sprite.dma = false;
                        }
                    }
                }
                self.g_access();
                self.c_access();
            }
            17..=54 => {
                self.g_access();
                self.c_access();
            }
            55 => {
                self.g_access();
                for sprite in self.sprites.iter_mut() {
                    if sprite.config.expand_y {
                        sprite.expansion_ff = !sprite.expansion_ff;
                    }
                }
                self.check_sprite_dma();
            }
            58 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.mc = sprite.mc_base;
                    if sprite.dma {
                        if sprite.config.y == (self.raster_y & 0xff) as u8 {
                            sprite.display = true;
                        }
                    } else {
                        sprite.display = false;
                    }
                }
                if self.rc == 7 {
                    self.vc_base = self.vc;
                    if !self.badline {
                        self.display_on = false;
                    }
                }
                if self.display_on {
                    self.rc = (self.rc + 1) & 0x07;
                }
            }
            _ => {}
        }
    }

    fn fetch_sprite_data(&mut self, n: usize) -> u8 {
        let address = self.sprite_ptrs[n] | self.sprites[n].mc as u16;
        self.sprites[n].mc = (self.sprites[n].mc + 1) & 0x3f;
        self.mem.read(address)
    }

    fn check_sprite_dma(&mut self) {
        let raster = (self.raster_y & 0xff) as u8;
        for sprite in self.sprites.iter_mut() {
            if sprite.config.enabled && sprite.config.y == raster && !sprite.dma {
                sprite.dma = true;
                sprite.mc_base = 0;
                if sprite.config.expand_y {
                    sprite.expansion_ff = false;
                }
            }
        }
    }

    fn c_access(&mut self) {
        if self.badline && self.vmli < 40 {
            let address = self.video_matrix | self.vc;
            self.vm_data_line[self.vmli] = self.mem.read(address);
            self.vm_color_line[self.vmli] = self.color_ram.borrow().read(self.vc) & 0x0f;
        }
    }

    fn g_access(&mut self) {
        if self.display_on {
            let index = if self.vmli < 40 { self.vmli } else { 39 };
            let c_data = self.vm_data_line[index];
            let c_color = self.vm_color_line[index];
            let mut address = match self.gfx_seq.config.mode {
                Mode::Bitmap | Mode::McBitmap | Mode::InvalidBitmap1 | Mode::InvalidBitmap2 => {
                    (self.char_base & 0x2000) | (self.vc << 3) | self.rc as u16
                }
                _ => self.char_base | ((c_data as u16) << 3) | self.rc as u16,
            };
            // the three extended color modes pull address lines 9 and 10 low
            if self.gfx_seq.config.mode.value() & 0x04 != 0 {
                address &= 0x39ff;
            }
            let g_data = self.mem.read(address);
            self.gfx_seq.set_data(c_data, c_color, g_data);
            self.vc = (self.vc + 1) & 0x03ff;
            self.vmli += 1;
        } else {
            // idle state accesses
            let g_data = self.mem.read(0x3fff);
            self.gfx_seq.set_data(0, 0, g_data);
        }
    }

    // -- Bus arbitration

    fn update_ba(&mut self) {
        let char_fetch = self.badline && self.cycle >= 12 && self.cycle <= 54;
        let mut sprite_fetch = false;
        for n in 0..8 {
            if self.sprites[n].dma {
                let fetch = self.spec.sprite_fetch_cycle(n);
                // BA drops three cycles ahead of the pointer fetch and
                // stays low through both data cycles
                let line_cycles = self.spec.cycles_per_raster;
                let delta = (self.cycle + line_cycles - (fetch + line_cycles - 3) % line_cycles)
                    % line_cycles;
                if delta < 5 {
                    sprite_fetch = true;
                }
            }
        }
        self.ba_line
            .borrow_mut()
            .set_active(!(char_fetch || sprite_fetch));
    }

    // -- Pixel generation

    fn draw_cycle(&mut self) {
        let y = self.raster_y;
        let x_start = (self.cycle - 1) * 8;
        let pitch = self.spec.pixels_per_raster() as usize;
        let den = self.den.delayed();
        for i in 0..8u16 {
            let x = x_start + i;
            if self.cycle >= 16 && self.cycle <= 55 && i == self.x_scroll as u16 {
                self.gfx_seq.load_data();
            }
            self.border_unit.update_main_ff(x, y, den);
            self.gfx_seq.clock();
            self.mux_unit.feed_graphics(self.gfx_seq.output());
            let mut sprite_output = [None; 8];
            for (n, sprite) in self.sprites.iter_mut().enumerate() {
                sprite.clock(x);
                sprite_output[n] = sprite.output();
            }
            let (ss_collision, sd_collision) = self.mux_unit.feed_sprites(sprite_output);
            self.record_collisions(ss_collision, sd_collision);
            let pixel = if self.border_unit.is_enabled() {
                self.border_unit.output()
            } else {
                self.mux_unit.output()
            };
            self.frame_buffer
                .borrow_mut()
                .write(y as usize * pitch + x as usize, pixel);
        }
    }

    fn record_collisions(&mut self, ss_collision: u8, sd_collision: u8) {
        if ss_collision != 0 && self.sprite_sprite_collision == 0 {
            self.set_irq_event(irq_event::SPRITE_SPRITE_COLLISION);
        }
        if sd_collision != 0 && self.sprite_data_collision == 0 {
            self.set_irq_event(irq_event::SPRITE_DATA_COLLISION);
        }
        self.sprite_sprite_collision |= ss_collision;
        self.sprite_data_collision |= sd_collision;
    }

    // -- Interrupts

    fn set_irq_event(&mut self, event: usize) {
        self.irq_control.set_event(event);
        self.update_irq_line();
    }

    fn update_irq_line(&mut self) {
        self.irq_line
            .borrow_mut()
            .set_low(interrupt_source::VIC, self.irq_control.is_triggered());
    }

    fn check_raster_irq(&mut self) {
        // the compare fires on line 0 one cycle later, a quirk shared by
        // all chip revisions
        let at_check_cycle = if self.raster_y == 0 {
            self.cycle == 2
        } else {
            self.cycle == 1
        };
        if at_check_cycle && !self.raster_irq_done && self.raster_y == self.raster_compare {
            self.raster_irq_done = true;
            self.set_irq_event(irq_event::RASTER);
        }
    }

    // -- Counters

    fn update_counters(&mut self) {
        if self.cycle == self.spec.cycles_per_raster {
            let den = self.den.delayed();
            self.border_unit.update_vertical_ff(self.raster_y, den);
            self.cycle = 1;
            self.raster_y += 1;
            self.raster_irq_done = false;
            if self.raster_y == self.spec.raster_lines {
                self.raster_y = 0;
                self.vc_base = 0;
                self.badline_enable = false;
                self.vsync_flag.set(true);
            }
        } else {
            self.cycle += 1;
        }
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        self.update_badline();
        self.check_raster_irq();
        self.fetch_cycle();
        self.update_ba();
        self.draw_cycle();
        self.update_counters();
    }

    fn clock_delta(&mut self, delta: u32) {
        for _i in 0..delta {
            self.clock();
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        self.border_unit.reset();
        self.gfx_seq.reset();
        self.mux_unit.reset();
        for sprite in self.sprites.iter_mut() {
            sprite.reset();
        }
        self.den.reset(true);
        self.raster_compare = 0;
        self.x_scroll = 0;
        self.y_scroll = 3;
        self.char_base = 0x1000;
        self.video_matrix = 0x0400;
        self.light_pen_pos = [0; 2];
        self.irq_control.reset();
        self.raster_irq_done = false;
        self.raster_y = 0;
        self.cycle = 1;
        self.vc = 0;
        self.vc_base = 0;
        self.rc = 0;
        self.vmli = 0;
        self.display_on = false;
        self.badline = false;
        self.badline_enable = false;
        self.vm_data_line = [0; 40];
        self.vm_color_line = [0; 40];
        self.sprite_ptrs = [0; 8];
        self.sprite_sprite_collision = 0;
        self.sprite_data_collision = 0;
        self.vsync_flag.set(false);
    }

    // I/O

    fn read(&mut self, reg: u8) -> u8 {
        let value = match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                (self.sprites[(reg >> 1) as usize].config.x & 0xff) as u8
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y
            }
            0x10 => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.x.get_bit(8));
                }
                result
            }
            0x11 => {
                let mut result = 0u8;
                result.set_bit(7, self.raster_y.get_bit(8));
                result.set_bit(6, self.gfx_seq.config.mode.value().get_bit(2));
                result.set_bit(5, self.gfx_seq.config.mode.value().get_bit(1));
                result.set_bit(4, self.den.current());
                result.set_bit(3, self.border_unit.config.rsel);
                result | (self.y_scroll & 0x07)
            }
            0x12 => (self.raster_y & 0xff) as u8,
            0x13 => self.light_pen_pos[0],
            0x14 => self.light_pen_pos[1],
            0x15 => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.enabled);
                }
                result
            }
            0x16 => {
                // unused bits and the RES bit read back as ones
                let mut result = 0xe0u8;
                result.set_bit(4, self.gfx_seq.config.mode.value().get_bit(0));
                result.set_bit(3, self.border_unit.config.csel);
                result | (self.x_scroll & 0x07)
            }
            0x17 => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.expand_y);
                }
                result
            }
            0x18 => {
                let vm = ((self.video_matrix >> 10) as u8) << 4;
                let cb = ((self.char_base >> 11) as u8) << 1;
                vm | cb | 0x01
            }
            0x19 => self.irq_control.get_data() | 0x70,
            0x1a => self.irq_control.get_mask() | 0xf0,
            0x1b => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.data_priority);
                }
                result
            }
            0x1c => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.mode == sprite_sequencer::Mode::Multicolor);
                }
                result
            }
            0x1d => {
                let mut result = 0u8;
                for (n, sprite) in self.sprites.iter().enumerate() {
                    result.set_bit(n, sprite.config.expand_x);
                }
                result
            }
            0x1e => {
                // collision registers clear on read
                let result = self.sprite_sprite_collision;
                self.sprite_sprite_collision = 0;
                result
            }
            0x1f => {
                let result = self.sprite_data_collision;
                self.sprite_data_collision = 0;
                result
            }
            0x20 => self.border_unit.config.border_color | 0xf0,
            0x21..=0x24 => self.gfx_seq.config.bg_color[(reg - 0x21) as usize] | 0xf0,
            0x25 => self.sprites[0].config.multicolor[0] | 0xf0,
            0x26 => self.sprites[0].config.multicolor[1] | 0xf0,
            0x27..=0x2e => self.sprites[(reg - 0x27) as usize].config.color | 0xf0,
            0x2f..=0x3f => 0xff,
            _ => panic!("invalid reg {}", reg),
        };
        if log_enabled!(Level::Trace) {
            trace!(target: "vic::reg", "Read 0x{:02x} = 0x{:02x}", reg, value);
        }
        value
    }

    fn write(&mut self, reg: u8, value: u8) {
        if log_enabled!(Level::Trace) {
            trace!(target: "vic::reg", "Write 0x{:02x} = 0x{:02x}", reg, value);
        }
        match reg {
            0x00 | 0x02 | 0x04 | 0x06 | 0x08 | 0x0a | 0x0c | 0x0e => {
                let n = (reg >> 1) as usize;
                let x = (self.sprites[n].config.x & 0x0100) | value as u16;
                self.sprites[n].config.x = x;
                self.sprites[n].config.x_screen = self.spec.sprite_x_to_screen(x);
            }
            0x01 | 0x03 | 0x05 | 0x07 | 0x09 | 0x0b | 0x0d | 0x0f => {
                self.sprites[(reg >> 1) as usize].config.y = value;
            }
            0x10 => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    let mut x = sprite.config.x;
                    x.set_bit(8, value.get_bit(n));
                    sprite.config.x = x;
                    sprite.config.x_screen = self.spec.sprite_x_to_screen(x);
                }
            }
            0x11 => {
                self.raster_compare.set_bit(8, value.get_bit(7));
                let mut mode = self.gfx_seq.config.mode.value();
                mode.set_bit(2, value.get_bit(6));
                mode.set_bit(1, value.get_bit(5));
                self.gfx_seq.config.mode = Mode::from(mode);
                self.den.write(value.get_bit(4));
                self.border_unit.config.rsel = value.get_bit(3);
                self.y_scroll = value & 0x07;
            }
            0x12 => {
                self.raster_compare = (self.raster_compare & 0x0100) | value as u16;
            }
            0x13 => self.light_pen_pos[0] = value,
            0x14 => self.light_pen_pos[1] = value,
            0x15 => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.enabled = value.get_bit(n);
                }
            }
            0x16 => {
                let mut mode = self.gfx_seq.config.mode.value();
                mode.set_bit(0, value.get_bit(4));
                self.gfx_seq.config.mode = Mode::from(mode);
                self.border_unit.config.csel = value.get_bit(3);
                self.x_scroll = value & 0x07;
            }
            0x17 => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.expand_y = value.get_bit(n);
                    // clearing the expansion bit sets the flip flop
                    if !sprite.config.expand_y {
                        sprite.expansion_ff = true;
                    }
                }
            }
            0x18 => {
                self.video_matrix = (((value & 0xf0) >> 4) as u16) << 10;
                self.char_base = (((value & 0x0e) >> 1) as u16) << 11;
            }
            0x19 => {
                // acknowledge the written interrupt sources
                self.irq_control.clear_events(value & 0x0f);
                self.update_irq_line();
            }
            0x1a => {
                self.irq_control.set_mask(value & 0x0f);
                self.update_irq_line();
            }
            0x1b => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.data_priority = value.get_bit(n);
                    self.mux_unit.data_priority[n] = value.get_bit(n);
                }
            }
            0x1c => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.mode = if value.get_bit(n) {
                        sprite_sequencer::Mode::Multicolor
                    } else {
                        sprite_sequencer::Mode::Standard
                    };
                }
            }
            0x1d => {
                for (n, sprite) in self.sprites.iter_mut().enumerate() {
                    sprite.config.expand_x = value.get_bit(n);
                }
            }
            0x1e | 0x1f => {}
            0x20 => self.border_unit.config.border_color = value & 0x0f,
            0x21..=0x24 => self.gfx_seq.config.bg_color[(reg - 0x21) as usize] = value & 0x0f,
            0x25 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.config.multicolor[0] = value & 0x0f;
                }
            }
            0x26 => {
                for sprite in self.sprites.iter_mut() {
                    sprite.config.multicolor[1] = value & 0x0f;
                }
            }
            0x27..=0x2e => {
                self.sprites[(reg - 0x27) as usize].config.color = value & 0x0f;
            }
            0x2f..=0x3f => {}
            _ => panic!("invalid reg {}", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{new_shared, new_shared_cell, Rom};

    struct NullVideo;

    impl VideoOutput for NullVideo {
        fn get_dimension(&self) -> (usize, usize) {
            (0, 0)
        }
        fn reset(&mut self) {}
        fn write(&mut self, _index: usize, _color: u8) {}
    }

    struct TestBench {
        vic: Vic,
        clock: Rc<Clock>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
        vsync_flag: SharedCell<bool>,
    }

    impl TestBench {
        // one master cycle, the way the machine root drives it
        fn step(&mut self) {
            self.vic.clock();
            self.clock.tick();
        }
    }

    fn setup_vic() -> TestBench {
        let clock = Rc::new(Clock::default());
        let ba_line = new_shared(Pin::new_high());
        let irq_line = new_shared(IrqLine::new("irq"));
        let vsync_flag = new_shared_cell(false);
        let base_address = new_shared_cell(0x0000);
        let charset = new_shared(Rom::new(0x1000, 0, 0x00));
        let ram = new_shared(Ram::new(0x10000));
        let color_ram = new_shared(Ram::new(1024));
        let mem = VicMemory::new(base_address, charset, ram);
        let mut vic = Vic::new(
            VicModel::Mos6569,
            color_ram,
            mem,
            new_shared(NullVideo {}),
            vsync_flag.clone(),
            ba_line.clone(),
            irq_line.clone(),
            clock.clone(),
        );
        vic.reset();
        TestBench {
            vic,
            clock,
            ba_line,
            irq_line,
            vsync_flag,
        }
    }

    #[test]
    fn frame_has_fixed_cycle_count() {
        let mut bench = setup_vic();
        for _ in 0..312 * 63 {
            bench.step();
        }
        assert_eq!(true, bench.vsync_flag.get());
        assert_eq!(0, bench.vic.get_raster());
    }

    #[test]
    fn badline_steals_bus() {
        let mut bench = setup_vic();
        // enable the display so line 0x30 arms badlines; y scroll 3 makes
        // 0x33 the first badline
        bench.vic.write(0x11, 0x1b);
        while bench.vic.get_raster() != 0x33 || bench.vic.get_cycle() != 20 {
            bench.step();
        }
        assert_eq!(true, bench.vic.is_badline());
        assert_eq!(true, bench.ba_line.borrow().is_low());
        // past the fetch window the bus is released
        while bench.vic.get_cycle() != 56 {
            bench.step();
        }
        assert_eq!(false, bench.ba_line.borrow().is_low());
    }

    #[test]
    fn raster_irq_fires_on_compare() {
        let mut bench = setup_vic();
        bench.vic.write(0x12, 0x40); // compare line 0x40
        bench.vic.write(0x1a, 0x01); // enable raster irq
        while bench.vic.get_raster() != 0x40 {
            bench.step();
        }
        bench.step();
        assert_eq!(true, bench.irq_line.borrow().is_low());
        assert_eq!(0x81, bench.vic.read(0x19) & 0x81);
        // acknowledging releases the line
        bench.vic.write(0x19, 0x01);
        assert_eq!(false, bench.irq_line.borrow().is_low());
    }

    #[test]
    fn read_control_registers() {
        let mut bench = setup_vic();
        bench.vic.write(0x11, 0x1b);
        assert_eq!(0x1b, bench.vic.read(0x11) & 0x7f);
        bench.vic.write(0x20, 0x0e);
        assert_eq!(0x0e | 0xf0, bench.vic.read(0x20));
    }
}
