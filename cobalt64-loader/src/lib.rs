// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

mod crt;
mod d64;
mod g64;
mod loaders;
mod nib;

use std::io;
use std::path::Path;

use cobalt64_system::C64;

pub use self::crt::CrtLoader;
pub use self::d64::{D64Image, D64Loader};
pub use self::g64::{G64Image, G64Loader};
pub use self::loaders::Loaders;
pub use self::nib::extract_track;

/// An image is a media payload that can be mounted into the machine.
pub trait Image {
    fn mount(&mut self, c64: &mut C64);
    fn unmount(&mut self, c64: &mut C64);
}

pub trait Loader {
    fn load(&self, path: &Path) -> Result<Box<dyn Image>, io::Error>;
}
