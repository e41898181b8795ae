//! CPU, CTC and daisy chain wired together: IM 2 interrupts from a timer.

use tickwork_core::core::{Bus, Z80Pins};
use tickwork_core::cpu::{Cpu, Z80};
use tickwork_core::device::Z80Ctc;

struct CtcSystem {
    memory: Box<[u8; 0x10000]>,
    ctc: Z80Ctc,
}

impl Bus for CtcSystem {
    type Pins = Z80Pins;

    fn respond(&mut self, mut pins: Z80Pins) -> Z80Pins {
        let addr = pins.addr();
        if pins.is_mem_read() {
            pins.set_data(self.memory[addr as usize]);
        } else if pins.is_mem_write() {
            self.memory[addr as usize] = pins.data();
        }
        let selected = pins.contains(Z80Pins::IORQ)
            && !pins.contains(Z80Pins::M1)
            && (addr & 0xFC) == 0x80;
        pins = self.ctc.tick(pins | Z80Pins::IEIO, selected);
        pins - Z80Pins::IEIO
    }
}

const COUNTER: usize = 0x8000;

#[rustfmt::skip]
const MAIN: [u8; 25] = [
    0x31, 0x00, 0xF0, // LD SP,F000h
    0x3E, 0x10,       // LD A,10h
    0xED, 0x47,       // LD I,A
    0xED, 0x5E,       // IM 2
    0x3E, 0x20,       // LD A,20h
    0xD3, 0x80,       // OUT (80h),A   vector
    0x3E, 0x87,       // LD A,87h      EI, timer /16, constant follows
    0xD3, 0x83,       // OUT (83h),A
    0x3E, 0x0A,       // LD A,10
    0xD3, 0x83,       // OUT (83h),A
    0xFB,             // EI
    0x76,             // HALT
    0x18, 0xFD,       // JR -3
];

#[rustfmt::skip]
const ISR: [u8; 12] = [
    0xF5,             // PUSH AF
    0x3A, 0x00, 0x80, // LD A,(8000h)
    0x3C,             // INC A
    0x32, 0x00, 0x80, // LD (8000h),A
    0xF1,             // POP AF
    0xFB,             // EI
    0xED, 0x4D,       // RETI
];

fn system() -> (Z80, CtcSystem) {
    let mut memory = Box::new([0u8; 0x10000]);
    memory[..MAIN.len()].copy_from_slice(&MAIN);
    memory[0x0100..0x0100 + ISR.len()].copy_from_slice(&ISR);
    // channel 3 vector is 0x20 | 3 << 1
    memory[0x1026] = 0x00;
    memory[0x1027] = 0x01;
    (Z80::new(), CtcSystem { memory, ctc: Z80Ctc::new() })
}

#[test]
fn test_timer_interrupts_reach_isr() {
    let (mut cpu, mut sys) = system();
    cpu.exec(&mut sys, 16_000);
    // one interrupt every 160 ticks, minus the setup code
    let count = sys.memory[COUNTER];
    assert!((95..=100).contains(&count), "count = {count}");
    assert_eq!(sys.ctc.channels[3].daisy.vector, 0x26);
}

#[test]
fn test_reti_ends_service() {
    let (mut cpu, mut sys) = system();
    // run until the ISR has been entered once
    let mut guard = 0;
    while cpu.pc != 0x0100 {
        cpu.step(&mut sys);
        guard += 1;
        assert!(guard < 10_000, "interrupt never taken");
    }
    assert!(sys.ctc.channels[3].daisy.in_service());
    // PUSH, LD, INC, LD, POP, EI, RETI
    for _ in 0..7 {
        cpu.step(&mut sys);
    }
    // RETI is seen on the fetch that follows it
    cpu.step(&mut sys);
    assert!(!sys.ctc.channels[3].daisy.in_service());
    assert_eq!(sys.memory[COUNTER], 1);
}

#[test]
fn test_disabled_channel_does_not_interrupt() {
    let (mut cpu, mut sys) = system();
    sys.memory[0x000E] = 0x07; // control word without EI
    cpu.exec(&mut sys, 5_000);
    assert_eq!(sys.memory[COUNTER], 0);
    assert!(cpu.is_halted());
}
