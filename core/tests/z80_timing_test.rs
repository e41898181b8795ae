use tickwork_core::cpu::{Cpu, Z80};
mod common;
use common::Z80Bus;

/// Ticks taken by the first instruction of `program`, loaded at 0x0000.
fn cycles(program: &[u8], setup: impl FnOnce(&mut Z80, &mut Z80Bus)) -> u32 {
    let mut cpu = Z80::new();
    let mut bus = Z80Bus::new();
    cpu.sp = 0x8000;
    cpu.ix = 0x4000;
    cpu.iy = 0x5000;
    cpu.set_hl(0x6000);
    bus.load(0, program);
    setup(&mut cpu, &mut bus);
    cpu.step(&mut bus)
}

fn with_bc(n: u16) -> impl FnOnce(&mut Z80, &mut Z80Bus) {
    move |cpu, _| cpu.set_bc(n)
}

fn plain(program: &[u8]) -> u32 {
    cycles(program, |_, _| {})
}

// ============================================================
// Unprefixed
// ============================================================

#[test]
fn test_basic_timings() {
    assert_eq!(plain(&[0x00]), 4, "NOP");
    assert_eq!(plain(&[0x3E, 0x12]), 7, "LD A,n");
    assert_eq!(plain(&[0x36, 0x12]), 10, "LD (HL),n");
    assert_eq!(plain(&[0x7E]), 7, "LD A,(HL)");
    assert_eq!(plain(&[0x01, 0x34, 0x12]), 10, "LD BC,nn");
    assert_eq!(plain(&[0x3A, 0x00, 0x60]), 13, "LD A,(nn)");
    assert_eq!(plain(&[0x32, 0x00, 0x60]), 13, "LD (nn),A");
    assert_eq!(plain(&[0x22, 0x00, 0x60]), 16, "LD (nn),HL");
    assert_eq!(plain(&[0x2A, 0x00, 0x60]), 16, "LD HL,(nn)");
    assert_eq!(plain(&[0xF9]), 6, "LD SP,HL");
    assert_eq!(plain(&[0x80]), 4, "ADD A,B");
    assert_eq!(plain(&[0x86]), 7, "ADD A,(HL)");
    assert_eq!(plain(&[0xC6, 0x01]), 7, "ADD A,n");
    assert_eq!(plain(&[0x34]), 11, "INC (HL)");
    assert_eq!(plain(&[0x03]), 6, "INC BC");
    assert_eq!(plain(&[0x09]), 11, "ADD HL,BC");
    assert_eq!(plain(&[0xE3]), 19, "EX (SP),HL");
    assert_eq!(plain(&[0xC5]), 11, "PUSH BC");
    assert_eq!(plain(&[0xC1]), 10, "POP BC");
    assert_eq!(plain(&[0xDB, 0x10]), 11, "IN A,(n)");
    assert_eq!(plain(&[0xD3, 0x10]), 11, "OUT (n),A");
    assert_eq!(plain(&[0x76]), 4, "HALT");
}

#[test]
fn test_jump_timings() {
    assert_eq!(plain(&[0xC3, 0x00, 0x10]), 10, "JP nn");
    assert_eq!(plain(&[0x18, 0x10]), 12, "JR e");
    assert_eq!(plain(&[0xE9]), 4, "JP (HL)");
    assert_eq!(plain(&[0xCD, 0x00, 0x10]), 17, "CALL nn");
    assert_eq!(plain(&[0xC9]), 10, "RET");
    assert_eq!(plain(&[0xFF]), 11, "RST 38h");
}

#[test]
fn test_conditional_timings() {
    let zero = |cpu: &mut Z80, _: &mut Z80Bus| cpu.f = 0x40;
    let nonzero = |cpu: &mut Z80, _: &mut Z80Bus| cpu.f = 0x00;

    assert_eq!(cycles(&[0x20, 0x10], nonzero), 12, "JR NZ taken");
    assert_eq!(cycles(&[0x20, 0x10], zero), 7, "JR NZ not taken");
    assert_eq!(cycles(&[0xC2, 0x00, 0x10], zero), 10, "JP NZ not taken");
    assert_eq!(cycles(&[0xC4, 0x00, 0x10], nonzero), 17, "CALL NZ taken");
    assert_eq!(cycles(&[0xC4, 0x00, 0x10], zero), 10, "CALL NZ not taken");
    assert_eq!(cycles(&[0xC0], nonzero), 11, "RET NZ taken");
    assert_eq!(cycles(&[0xC0], zero), 5, "RET NZ not taken");

    assert_eq!(cycles(&[0x10, 0xFE], |cpu, _| cpu.b = 2), 13, "DJNZ taken");
    assert_eq!(cycles(&[0x10, 0xFE], |cpu, _| cpu.b = 1), 8, "DJNZ not taken");
}

// ============================================================
// Prefixed
// ============================================================

#[test]
fn test_cb_timings() {
    assert_eq!(plain(&[0xCB, 0x00]), 8, "RLC B");
    assert_eq!(plain(&[0xCB, 0x46]), 12, "BIT 0,(HL)");
    assert_eq!(plain(&[0xCB, 0x06]), 15, "RLC (HL)");
    assert_eq!(plain(&[0xCB, 0xC6]), 15, "SET 0,(HL)");
}

#[test]
fn test_ed_timings() {
    assert_eq!(plain(&[0xED, 0x44]), 8, "NEG");
    assert_eq!(plain(&[0xED, 0x56]), 8, "IM 1");
    assert_eq!(plain(&[0xED, 0x47]), 9, "LD I,A");
    assert_eq!(plain(&[0xED, 0x57]), 9, "LD A,I");
    assert_eq!(plain(&[0xED, 0x4A]), 15, "ADC HL,BC");
    assert_eq!(plain(&[0xED, 0x42]), 15, "SBC HL,BC");
    assert_eq!(plain(&[0xED, 0x43, 0x00, 0x60]), 20, "LD (nn),BC");
    assert_eq!(plain(&[0xED, 0x4B, 0x00, 0x60]), 20, "LD BC,(nn)");
    assert_eq!(plain(&[0xED, 0x40]), 12, "IN B,(C)");
    assert_eq!(plain(&[0xED, 0x41]), 12, "OUT (C),B");
    assert_eq!(plain(&[0xED, 0x6F]), 18, "RLD");
    assert_eq!(plain(&[0xED, 0x4D]), 14, "RETI");
    assert_eq!(plain(&[0xED, 0x00]), 8, "ED NOP");
}

#[test]
fn test_block_timings() {
    assert_eq!(cycles(&[0xED, 0xA0], with_bc(5)), 16, "LDI");
    assert_eq!(cycles(&[0xED, 0xB0], with_bc(5)), 21, "LDIR repeating");
    assert_eq!(cycles(&[0xED, 0xB0], with_bc(1)), 16, "LDIR last");
    assert_eq!(cycles(&[0xED, 0xB1], with_bc(5)), 21, "CPIR repeating");
    assert_eq!(cycles(&[0xED, 0xA2], |cpu, _| cpu.b = 5), 16, "INI");
    assert_eq!(cycles(&[0xED, 0xB3], |cpu, _| cpu.b = 5), 21, "OTIR repeating");
    assert_eq!(cycles(&[0xED, 0xB3], |cpu, _| cpu.b = 1), 16, "OTIR last");
}

#[test]
fn test_index_timings() {
    assert_eq!(plain(&[0xDD, 0x21, 0x00, 0x10]), 14, "LD IX,nn");
    assert_eq!(plain(&[0xDD, 0x7E, 0x05]), 19, "LD A,(IX+d)");
    assert_eq!(plain(&[0xDD, 0x77, 0x05]), 19, "LD (IX+d),A");
    assert_eq!(plain(&[0xDD, 0x36, 0x05, 0x12]), 19, "LD (IX+d),n");
    assert_eq!(plain(&[0xDD, 0x86, 0x05]), 19, "ADD A,(IX+d)");
    assert_eq!(plain(&[0xDD, 0x34, 0x05]), 23, "INC (IX+d)");
    assert_eq!(plain(&[0xDD, 0x09]), 15, "ADD IX,BC");
    assert_eq!(plain(&[0xDD, 0xE5]), 15, "PUSH IX");
    assert_eq!(plain(&[0xDD, 0xE1]), 14, "POP IX");
    assert_eq!(plain(&[0xDD, 0xE3]), 23, "EX (SP),IX");
    assert_eq!(plain(&[0xDD, 0xE9]), 8, "JP (IX)");
    assert_eq!(plain(&[0xDD, 0x7C]), 8, "LD A,IXH");
    assert_eq!(plain(&[0xFD, 0xCB, 0x05, 0x46]), 20, "BIT 0,(IY+d)");
    assert_eq!(plain(&[0xFD, 0xCB, 0x05, 0xC6]), 23, "SET 0,(IY+d)");
    assert_eq!(plain(&[0xFD, 0xCB, 0x05, 0x06]), 23, "RLC (IY+d)");
}

#[test]
fn test_exec_finishes_instruction_in_flight() {
    let mut cpu = Z80::new();
    let mut bus = Z80Bus::new();
    // LD A,(nn) repeated: 13 ticks each
    for i in 0..16u16 {
        bus.load(i * 3, &[0x3A, 0x00, 0x60]);
    }
    let ran = cpu.exec(&mut bus, 20);
    assert_eq!(ran, 26);
    assert_eq!(cpu.pc, 6);
}
