// This file is part of cobalt64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use std::cell::Cell;
use std::rc::Rc;

use cobalt64_core::cpu::Cpu6510;
use cobalt64_core::factory::{Addressable, Cpu, TickFn};
use cobalt64_core::util::{new_shared, IoPort, IrqLine, Pin, Ram};

struct MockMemory {
    ram: Ram,
}

impl Addressable for MockMemory {
    fn read(&self, address: u16) -> u8 {
        self.ram.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram.write(address, value);
    }
}

fn setup_cpu() -> Cpu6510 {
    let ba_line = new_shared(Pin::new_high());
    let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
    let cpu_irq = new_shared(IrqLine::new("irq"));
    let cpu_nmi = new_shared(IrqLine::new("nmi"));
    let cpu_rdy = new_shared(IrqLine::new("rdy"));
    let mem = new_shared(MockMemory {
        ram: Ram::new(0x10000),
    });
    Cpu6510::new(mem, Some(cpu_io_port), ba_line, cpu_rdy, cpu_irq, cpu_nmi)
}

// Based on 65xx Processor Data from http://www.romhacking.net/documents/318/
// (opcode, operand bytes, expected cycles)
const TIMING: [(u8, [u8; 2], u8); 26] = [
    (0xa9, [0x10, 0x00], 2), // LDA #$ab
    (0xa5, [0x10, 0x00], 3), // LDA $ab
    (0xb5, [0x10, 0x00], 4), // LDA $ab,X
    (0xad, [0x00, 0x20], 4), // LDA $abcd
    (0xbd, [0x00, 0x20], 4), // LDA $abcd,X
    (0xa1, [0x10, 0x00], 6), // LDA ($ab,X)
    (0x8d, [0x00, 0x20], 4), // STA $abcd
    (0x9d, [0x00, 0x20], 5), // STA $abcd,X
    (0x85, [0x10, 0x00], 3), // STA $ab
    (0x95, [0x10, 0x00], 4), // STA $ab,X
    (0xe6, [0x10, 0x00], 5), // INC $ab
    (0xee, [0x00, 0x20], 6), // INC $abcd
    (0xfe, [0x00, 0x20], 7), // INC $abcd,X
    (0x20, [0x00, 0x20], 6), // JSR $abcd
    (0x60, [0x00, 0x00], 6), // RTS
    (0x48, [0x00, 0x00], 3), // PHA
    (0x68, [0x00, 0x00], 4), // PLA
    (0x00, [0x00, 0x00], 7), // BRK
    (0x40, [0x00, 0x00], 6), // RTI
    (0x4c, [0x00, 0x20], 3), // JMP $abcd
    (0x69, [0x01, 0x00], 2), // ADC #$ab
    (0x0a, [0x00, 0x00], 2), // ASL A
    (0x06, [0x10, 0x00], 5), // ASL $ab
    (0x4e, [0x00, 0x20], 6), // LSR $abcd
    (0xea, [0x00, 0x00], 2), // NOP
    (0xaa, [0x00, 0x00], 2), // TAX
];

#[test]
fn opcode_timing() {
    for (opcode, operands, expected) in TIMING.iter() {
        let mut cpu = setup_cpu();
        cpu.write(0x1000, *opcode);
        cpu.write(0x1001, operands[0]);
        cpu.write(0x1002, operands[1]);
        cpu.set_pc(0x1000);
        let elapsed = Rc::new(Cell::new(0u32));
        let elapsed_clone = elapsed.clone();
        let tick_fn: TickFn = Rc::new(move || {
            elapsed_clone.set(elapsed_clone.get() + 1);
        });
        cpu.step(&tick_fn);
        assert_eq!(
            *expected,
            elapsed.get() as u8,
            "opcode 0x{:02x} timing mismatch",
            opcode
        );
    }
}

#[test]
fn irq_enters_handler_through_vector() {
    let ba_line = new_shared(Pin::new_high());
    let cpu_io_port = new_shared(IoPort::new(0x00, 0xff));
    let cpu_irq = new_shared(IrqLine::new("irq"));
    let cpu_nmi = new_shared(IrqLine::new("nmi"));
    let cpu_rdy = new_shared(IrqLine::new("rdy"));
    let mem = new_shared(MockMemory {
        ram: Ram::new(0x10000),
    });
    let mut cpu = Cpu6510::new(
        mem,
        Some(cpu_io_port),
        ba_line,
        cpu_rdy,
        cpu_irq.clone(),
        cpu_nmi,
    );
    cpu.write(0xfffe, 0x00);
    cpu.write(0xffff, 0x30);
    cpu.write(0x3000, 0xea); // nop in the handler
    cpu.set_pc(0x1000);
    cpu_irq.borrow_mut().set_low(0, true);
    cpu.step(&cobalt64_core::factory::make_noop());
    assert_eq!(0x3001, cpu.get_pc());
}
