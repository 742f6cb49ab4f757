// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

pub mod c64;
mod c64_factory;
pub mod config;
mod frame_buffer;
mod palette;
mod sound_buffer;

pub use self::c64::C64;
pub use self::c64_factory::C64Factory;
pub use self::config::Config;
pub use self::frame_buffer::FrameBuffer;
pub use self::palette::Palette;
pub use self::sound_buffer::SoundBuffer;
