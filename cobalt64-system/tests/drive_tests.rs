// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::rc::Rc;
use std::sync::Arc;

use cobalt64_core::drive::{Disk, InsertionStatus};
use cobalt64_core::factory::SystemModel;
use cobalt64_core::util::new_shared;
use cobalt64_system::{C64, C64Factory, Config, FrameBuffer, Palette, SoundBuffer};

fn setup_c64() -> C64 {
    let mut config = Config::new(SystemModel::from("pal"));
    // short swap delays keep the test fast
    config.drives.drive_config.eject_delay = 2;
    config.drives.drive_config.swap_delay = 2;
    config.drives.drive_config.insert_delay = 2;
    let config = Rc::new(config);
    let factory = C64Factory::new(config.clone());
    let frame_buffer = new_shared(FrameBuffer::new(504, 312, Palette::default()));
    let sound_buffer = Arc::new(SoundBuffer::new(4096));
    let mut c64 = C64::build(config, &factory, frame_buffer, sound_buffer);
    c64.reset(true);
    c64
}

fn run_cycles(c64: &mut C64, cycles: u64) {
    let target = c64.get_cycles() + cycles;
    while c64.get_cycles() < target {
        c64.step();
        if c64.get_vsync() {
            c64.reset_vsync();
        }
    }
}

fn barrier_blocked(c64: &C64) -> bool {
    let drive = c64.get_drive_8();
    let head = {
        let drive = drive.borrow();
        drive.get_head()
    };
    let blocked = head.borrow().is_light_barrier_blocked();
    blocked
}

#[test]
fn disk_change_walks_the_light_barrier() {
    let mut c64 = setup_c64();
    let cycles_per_frame = c64.get_config().model.cycles_per_frame as u64;

    // get an initial disk in place
    let mut first = Disk::new();
    first.set_write_protection(true);
    c64.insert_disk_8(first);
    run_cycles(&mut c64, 4 * cycles_per_frame);
    assert!(c64.get_drive_8().borrow().has_disk());
    assert_eq!(true, barrier_blocked(&c64));

    // swapping in a new write protected disk passes all four states
    let mut second = Disk::new();
    second.set_write_protection(true);
    c64.insert_disk_8(second);

    // partially ejected blocks the barrier and destroys the data
    run_cycles(&mut c64, 1);
    assert_eq!(
        InsertionStatus::PartiallyEjected,
        c64.get_drive_8().borrow().get_insertion_status()
    );
    assert_eq!(true, barrier_blocked(&c64));

    // fully ejected unblocks
    run_cycles(&mut c64, 3 * cycles_per_frame);
    assert_eq!(
        InsertionStatus::FullyEjected,
        c64.get_drive_8().borrow().get_insertion_status()
    );
    assert_eq!(false, barrier_blocked(&c64));

    // partially inserted blocks again
    run_cycles(&mut c64, 3 * cycles_per_frame);
    assert_eq!(
        InsertionStatus::PartiallyInserted,
        c64.get_drive_8().borrow().get_insertion_status()
    );
    assert_eq!(true, barrier_blocked(&c64));

    // and the write protected disk keeps the sensor covered once seated
    run_cycles(&mut c64, 3 * cycles_per_frame);
    assert_eq!(
        InsertionStatus::FullyInserted,
        c64.get_drive_8().borrow().get_insertion_status()
    );
    assert_eq!(true, barrier_blocked(&c64));
    assert!(c64.get_drive_8().borrow().has_disk());
}

#[test]
fn eject_without_replacement_leaves_drive_empty() {
    let mut c64 = setup_c64();
    let cycles_per_frame = c64.get_config().model.cycles_per_frame as u64;
    c64.insert_disk_8(Disk::new());
    run_cycles(&mut c64, 4 * cycles_per_frame);
    assert!(c64.get_drive_8().borrow().has_disk());
    c64.eject_disk_8();
    run_cycles(&mut c64, 4 * cycles_per_frame);
    assert_eq!(
        InsertionStatus::FullyEjected,
        c64.get_drive_8().borrow().get_insertion_status()
    );
    assert!(!c64.get_drive_8().borrow().has_disk());
}

#[test]
fn drive_enters_power_save_when_idle() {
    let mut c64 = setup_c64();
    // run well past the wakeup watchdog; with the motor off the drive
    // should stop needing emulation
    for _ in 0..70 {
        let target = c64.get_cycles() + c64.get_config().model.cycles_per_frame as u64;
        while c64.get_cycles() < target {
            c64.step();
        }
        c64.reset_vsync();
    }
    assert!(c64.get_drive_8().borrow().is_idle());
}
