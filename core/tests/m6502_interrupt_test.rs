use tickwork_core::cpu::{Cpu, M6502};
mod common;
use common::{M6502Bus, tick};

const FLAG_I: u8 = 0x04;
const FLAG_B: u8 = 0x10;

/// NOP sled at 0x0200, IRQ handler at 0x0300, NMI handler at 0x0400.
/// The CPU is past reset with interrupts enabled.
fn setup() -> (M6502, M6502Bus) {
    let mut bus = M6502Bus::new();
    bus.memory[0x0200..0x0300].fill(0xEA);
    bus.memory[0x0300..0x0500].fill(0xEA);
    bus.load(0xFFFA, &[0x00, 0x04, 0x00, 0x02, 0x00, 0x03]);
    let mut cpu = M6502::new();
    cpu.step(&mut bus);
    cpu.p &= !FLAG_I;
    (cpu, bus)
}

fn pushed_pc(cpu: &M6502, bus: &M6502Bus) -> u16 {
    let base = 0x0100 + cpu.sp as usize;
    u16::from_le_bytes([bus.memory[base + 2], bus.memory[base + 3]])
}

fn pushed_p(cpu: &M6502, bus: &M6502Bus) -> u8 {
    bus.memory[0x0100 + cpu.sp as usize + 1]
}

#[test]
fn test_irq_during_opcode_fetch_taken_after_instruction() {
    let (mut cpu, mut bus) = setup();
    // NOP at 0x0200: dummy read, then the fetch of 0x0201 sees IRQ
    tick(&mut cpu, &mut bus);
    bus.int = true;
    tick(&mut cpu, &mut bus);
    assert!(cpu.opdone());
    bus.int = false;

    assert_eq!(cpu.step(&mut bus), 2, "NOP at 0x0201");
    assert_eq!(cpu.step(&mut bus), 7, "IRQ sequence");
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(pushed_pc(&cpu, &bus), 0x0202);
    assert_eq!(pushed_p(&cpu, &bus) & FLAG_B, 0, "B clear for IRQ");
    assert!(cpu.p & FLAG_I != 0);
}

#[test]
fn test_irq_in_last_cycle_waits_one_instruction() {
    let (mut cpu, mut bus) = setup();
    cpu.step(&mut bus);
    // from here the fetch response of the next opcode is already in
    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0x0203);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(pushed_pc(&cpu, &bus), 0x0203);
}

#[test]
fn test_irq_before_taken_branch_is_not_delayed() {
    let (mut cpu, mut bus) = setup();
    bus.load(0x0200, &[0xD0, 0x01]); // BNE +1, taken, same page
    // IRQ is already up when the branch reads its offset
    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.pc, 0x0203);
    bus.int = false;
    assert_eq!(cpu.step(&mut bus), 7, "taken right after the branch");
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(pushed_pc(&cpu, &bus), 0x0203);
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0x0301);
}

#[test]
fn test_irq_during_taken_branch_waits_one_more_instruction() {
    let (mut cpu, mut bus) = setup();
    bus.load(0x0200, &[0xD0, 0x01]); // BNE +1, taken, same page
    // offset read goes by without IRQ; the line rises for the rest
    tick(&mut cpu, &mut bus);
    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 2, "rest of the branch");
    assert_eq!(cpu.pc, 0x0203);
    assert_eq!(cpu.step(&mut bus), 2, "NOP at the target still runs");
    assert_eq!(cpu.pc, 0x0204);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(pushed_pc(&cpu, &bus), 0x0204);
}

#[test]
fn test_irq_masked_by_i_flag() {
    let (mut cpu, mut bus) = setup();
    cpu.p |= FLAG_I;
    bus.int = true;
    for _ in 0..20 {
        assert_eq!(cpu.step(&mut bus), 2);
    }
    assert_eq!(cpu.pc, 0x0214);
}

#[test]
fn test_rti_returns_and_reenables() {
    let (mut cpu, mut bus) = setup();
    bus.load(0x0300, &[0x40]); // RTI
    bus.int = true;
    while cpu.pc != 0x0300 {
        cpu.step(&mut bus);
    }
    let ret = pushed_pc(&cpu, &bus);
    bus.int = false;
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, ret);
    assert_eq!(cpu.p & FLAG_I, 0);
}

#[test]
fn test_nmi_edge_taken_once() {
    let (mut cpu, mut bus) = setup();
    cpu.p |= FLAG_I;
    bus.nmi = true;
    let mut entries = 0;
    for _ in 0..50 {
        cpu.step(&mut bus);
        if cpu.pc == 0x0400 {
            entries += 1;
        }
    }
    assert_eq!(entries, 1, "NMI ignores I and fires once per edge");
    assert_eq!(pushed_p(&cpu, &bus) & FLAG_B, 0);
}

#[test]
fn test_software_brk() {
    let (mut cpu, mut bus) = setup();
    bus.load(0x0200, &[0x00, 0xFF]);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.pc, 0x0300);
    assert_eq!(pushed_pc(&cpu, &bus), 0x0202, "BRK skips its signature byte");
    assert!(pushed_p(&cpu, &bus) & FLAG_B != 0);
}

#[test]
fn test_reset_pin_restarts() {
    let (mut cpu, mut bus) = setup();
    for _ in 0..5 {
        cpu.step(&mut bus);
    }
    cpu.reset();
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.pc, 0x0200);
}
