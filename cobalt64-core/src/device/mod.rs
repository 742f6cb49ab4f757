// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub mod cartridge;
pub mod joystick;
mod keyboard;
mod mouse;
mod reu;

pub use self::cartridge::{Cartridge, CartridgeKind, ChipType, CrtMode, Packet};
pub use self::joystick::Joystick;
pub use self::keyboard::{Key, KeyEvent, Keyboard};
pub use self::mouse::{Mouse, MouseModel};
pub use self::reu::Reu;
