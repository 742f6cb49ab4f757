// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use crate::factory::VicModel;

/*
          | Video  | # of  | Visible | Cycles/ |  Visible
   Type   | system | lines |  lines  |  line   | pixels/line
 ---------+--------+-------+---------+---------+------------
 6567R56A | NTSC-M |  262  |   234   |   64    |    411
  6567R8  | NTSC-M |  263  |   235   |   65    |    418
   6569   |  PAL-B |  312  |   284   |   63    |    403
*/

#[derive(Clone, Copy)]
pub struct Spec {
    pub raster_lines: u16,
    pub cycles_per_raster: u16,
    pub first_x_coord: u16,
}

impl Spec {
    pub fn new(chip_model: VicModel) -> Spec {
        match chip_model {
            VicModel::Mos6567 => Spec::ntsc(),
            VicModel::Mos6567R56A => Spec::ntsc_old(),
            VicModel::Mos6569 => Spec::pal(),
        }
    }

    fn ntsc() -> Spec {
        Spec {
            raster_lines: 263,
            cycles_per_raster: 65,
            first_x_coord: 0x19c,
        }
    }

    fn ntsc_old() -> Spec {
        Spec {
            raster_lines: 262,
            cycles_per_raster: 64,
            first_x_coord: 0x19c,
        }
    }

    fn pal() -> Spec {
        Spec {
            raster_lines: 312,
            cycles_per_raster: 63,
            first_x_coord: 0x194,
        }
    }

    /// Pixel slots per scanline.
    pub fn pixels_per_raster(&self) -> u16 {
        self.cycles_per_raster * 8
    }

    /// Screen x coordinate for a sprite coordinate register value.
    pub fn sprite_x_to_screen(&self, x: u16) -> u16 {
        let line_px = self.pixels_per_raster();
        (x + line_px - self.first_x_coord) % line_px
    }

    /// Cycle of the sprite pointer fetch for the given sprite. Sprites 0-2
    /// are fetched at the end of a line, sprites 3-7 at the start of the
    /// next one.
    pub fn sprite_fetch_cycle(&self, sprite: usize) -> u16 {
        match sprite {
            0 => self.cycles_per_raster - 5,
            1 => self.cycles_per_raster - 3,
            2 => self.cycles_per_raster - 1,
            n => (n as u16 - 3) * 2 + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pal_sprite_fetch_cycles() {
        let spec = Spec::new(VicModel::Mos6569);
        assert_eq!(58, spec.sprite_fetch_cycle(0));
        assert_eq!(62, spec.sprite_fetch_cycle(2));
        assert_eq!(1, spec.sprite_fetch_cycle(3));
        assert_eq!(9, spec.sprite_fetch_cycle(7));
    }

    #[test]
    fn pal_sprite_screen_mapping() {
        let spec = Spec::new(VicModel::Mos6569);
        // the left edge of the visible window
        assert_eq!(0x18 + 0x64, spec.sprite_x_to_screen(0x18) as u16);
        assert_eq!(0, spec.sprite_x_to_screen(0x194));
    }
}
