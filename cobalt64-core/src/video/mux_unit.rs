// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

const PRIO_SCREEN_BORDER: u8 = 0;
const PRIO_FG_SPRITE: u8 = 1;
const PRIO_FG_GRAPHICS: u8 = 2;
const PRIO_BG_SPRITE: u8 = 3;
const PRIO_BG_GRAPHICS: u8 = 4;

/// Per pixel priority selection between border, graphics and sprites. The
/// unit also records which sprites met another sprite or foreground
/// graphics on the current pixel.
pub struct MuxUnit {
    pub data_priority: [bool; 8],
    gfx_foreground: bool,
    output: u8,
    output_priority: u8,
}

impl MuxUnit {
    pub fn new() -> Self {
        MuxUnit {
            data_priority: [false; 8],
            gfx_foreground: false,
            output: 0,
            output_priority: 0,
        }
    }

    #[inline]
    pub fn feed_border(&mut self, border_output: u8) {
        self.output_pixel(border_output, PRIO_SCREEN_BORDER);
    }

    #[inline]
    pub fn feed_graphics(&mut self, gfx_output: (u8, bool)) {
        self.gfx_foreground = gfx_output.1;
        if gfx_output.1 {
            self.output_pixel(gfx_output.0, PRIO_FG_GRAPHICS);
        } else {
            self.output_pixel(gfx_output.0, PRIO_BG_GRAPHICS);
        }
    }

    /// Mixes in the sprite outputs and returns the sprite-sprite and
    /// sprite-data collision masks produced by this pixel.
    #[inline]
    pub fn feed_sprites(&mut self, sprite_output: [Option<u8>; 8]) -> (u8, u8) {
        let mut visible = 0u8;
        let mut data_collision = 0u8;
        for (i, output) in sprite_output.iter().enumerate() {
            if let Some(output) = *output {
                visible |= 1 << i;
                if self.gfx_foreground {
                    data_collision |= 1 << i;
                }
                if !self.data_priority[i] {
                    self.output_sprite_pixel(output, PRIO_FG_SPRITE);
                } else {
                    self.output_sprite_pixel(output, PRIO_BG_SPRITE);
                }
            }
        }
        let sprite_collision = if visible.count_ones() >= 2 { visible } else { 0 };
        (sprite_collision, data_collision)
    }

    #[inline]
    pub fn output(&self) -> u8 {
        self.output
    }

    pub fn reset(&mut self) {
        self.data_priority = [false; 8];
        self.gfx_foreground = false;
        self.output = 0;
        self.output_priority = 0;
    }

    #[inline]
    fn output_pixel(&mut self, pixel: u8, priority: u8) {
        self.output = pixel;
        self.output_priority = priority;
    }

    #[inline]
    fn output_sprite_pixel(&mut self, pixel: u8, priority: u8) {
        if priority < self.output_priority {
            self.output = pixel;
            self.output_priority = priority;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_wins_over_background() {
        let mut mux = MuxUnit::new();
        mux.feed_graphics((0x06, false));
        let outputs = [Some(0x01), None, None, None, None, None, None, None];
        mux.feed_sprites(outputs);
        assert_eq!(0x01, mux.output());
    }

    #[inline]
    fn two_sprites() -> [Option<u8>; 8] {
        [Some(0x01), None, Some(0x02), None, None, None, None, None]
    }

    #[test]
    fn overlapping_sprites_collide() {
        let mut mux = MuxUnit::new();
        mux.feed_graphics((0x06, false));
        let (sprite_collision, data_collision) = mux.feed_sprites(two_sprites());
        assert_eq!(0b0000_0101, sprite_collision);
        assert_eq!(0, data_collision);
    }

    #[test]
    fn sprite_over_foreground_collides() {
        let mut mux = MuxUnit::new();
        mux.feed_graphics((0x05, true));
        let outputs = [None, Some(0x03), None, None, None, None, None, None];
        let (sprite_collision, data_collision) = mux.feed_sprites(outputs);
        assert_eq!(0, sprite_collision);
        assert_eq!(0b0000_0010, data_collision);
    }
}
