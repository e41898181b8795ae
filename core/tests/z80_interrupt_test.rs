use tickwork_core::core::Z80Pins;
use tickwork_core::cpu::{Cpu, Z80};
mod common;
use common::{Z80Bus, tick, ticks};

/// CPU with interrupts enabled in IM 1, a NOP sled everywhere (memory is
/// zeroed) and the stack at 0x8000.
fn setup() -> (Z80, Z80Bus) {
    let mut cpu = Z80::new();
    let bus = Z80Bus::new();
    cpu.pc = 0x0100;
    cpu.sp = 0x8000;
    cpu.im = 1;
    cpu.iff1 = true;
    cpu.iff2 = true;
    (cpu, bus)
}

fn pushed_word(bus: &Z80Bus, sp: u16) -> u16 {
    u16::from_le_bytes([bus.memory[sp as usize], bus.memory[sp as usize + 1]])
}

// ============================================================
// Maskable interrupt modes
// ============================================================

#[test]
fn test_im1_response() {
    let (mut cpu, mut bus) = setup();
    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 4, "NOP runs before INT is sampled");
    assert_eq!(cpu.step(&mut bus), 13, "IM 1 response is 13 T-states");
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(cpu.sp, 0x7FFE);
    assert_eq!(pushed_word(&bus, 0x7FFE), 0x0101);
    assert!(!cpu.iff1 && !cpu.iff2);
}

#[test]
fn test_im2_response() {
    let (mut cpu, mut bus) = setup();
    cpu.im = 2;
    cpu.i = 0x12;
    bus.int_vector = 0xE0;
    bus.load(0x12E0, &[0x56, 0x34]);
    bus.int = true;
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 19, "IM 2 response is 19 T-states");
    assert_eq!(cpu.pc, 0x3456);
    assert_eq!(cpu.memptr, 0x3456);
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0101);
}

#[test]
fn test_im0_executes_rst_from_bus() {
    let (mut cpu, mut bus) = setup();
    cpu.im = 0;
    bus.int_vector = 0xD7; // RST 10h
    bus.int = true;
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.pc, 0x0010);
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0101);
}

#[test]
fn test_interrupt_acknowledge_pins() {
    let (mut cpu, _) = setup();
    let mut bus = Z80Bus::tracing();
    cpu.pc = 0x0100;
    bus.int = true;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    let trace = bus.trace.take().unwrap_or_default();
    let acks: Vec<_> = trace.iter().filter(|p| p.is_int_ack()).collect();
    assert_eq!(acks.len(), 1, "exactly one acknowledge cycle");
    assert!(!acks[0].contains(Z80Pins::MREQ));
    assert_eq!(acks[0].addr(), 0x0101);
}

#[test]
fn test_disabled_interrupts_are_ignored() {
    let (mut cpu, mut bus) = setup();
    cpu.iff1 = false;
    bus.int = true;
    for _ in 0..10 {
        assert_eq!(cpu.step(&mut bus), 4);
    }
    assert_eq!(cpu.pc, 0x010A);
}

// ============================================================
// Sampling point
// ============================================================

#[test]
fn test_int_before_last_tick_is_taken() {
    let (mut cpu, mut bus) = setup();
    // NOP is 4 ticks; INT seen on the first three responses
    bus.int = true;
    ticks(&mut cpu, &mut bus, 3);
    bus.int = false;
    tick(&mut cpu, &mut bus);
    assert!(cpu.opdone());
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.pc, 0x0038);
}

#[test]
fn test_int_on_last_tick_waits_one_instruction() {
    let (mut cpu, mut bus) = setup();
    ticks(&mut cpu, &mut bus, 3);
    bus.int = true;
    tick(&mut cpu, &mut bus);
    assert!(cpu.opdone());
    // too late for this boundary: the next NOP runs first
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.pc, 0x0102);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0102);
}

#[test]
fn test_ei_delays_interrupt_by_one_instruction() {
    let (mut cpu, mut bus) = setup();
    cpu.iff1 = false;
    cpu.iff2 = false;
    bus.load(0x0100, &[0xFB, 0x00, 0x00]); // EI; NOP; NOP
    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 4, "EI");
    assert_eq!(cpu.step(&mut bus), 4, "NOP after EI always runs");
    assert_eq!(cpu.pc, 0x0102);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0102);
}

#[test]
fn test_ei_ei_sequence_keeps_blocking() {
    let (mut cpu, mut bus) = setup();
    cpu.iff1 = false;
    bus.load(0x0100, &[0xFB, 0xFB, 0xFB, 0x00]);
    bus.int = true;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0103);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0104);
    assert_eq!(cpu.step(&mut bus), 13);
}

#[test]
fn test_halt_released_by_interrupt() {
    let (mut cpu, _) = setup();
    let mut traced = Z80Bus::tracing();
    traced.load(0x0100, &[0x76]);
    assert_eq!(cpu.step(&mut traced), 4);
    assert!(cpu.is_halted());
    for _ in 0..5 {
        assert_eq!(cpu.step(&mut traced), 4);
    }
    assert_eq!(cpu.pc, 0x0101, "PC stays after HALT while halted");
    let trace = traced.trace.take().unwrap_or_default();
    assert!(trace.last().is_some_and(|p| p.contains(Z80Pins::HALT)));

    traced.int = true;
    cpu.step(&mut traced);
    assert_eq!(cpu.step(&mut traced), 13);
    assert!(!cpu.is_halted());
    assert_eq!(pushed_word(&traced, cpu.sp), 0x0101);
}

// ============================================================
// NMI
// ============================================================

#[test]
fn test_nmi_response() {
    let (mut cpu, mut bus) = setup();
    bus.nmi = true;
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 11, "NMI response is 11 T-states");
    assert_eq!(cpu.pc, 0x0066);
    assert!(!cpu.iff1);
    assert!(cpu.iff2, "IFF2 keeps the old IFF1");
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0101);
}

#[test]
fn test_nmi_is_edge_triggered() {
    let (mut cpu, mut bus) = setup();
    bus.nmi = true;
    let mut total = 0;
    while total < 2000 {
        total += cpu.step(&mut bus);
    }
    assert_eq!(cpu.sp, 0x7FFE, "a held NMI line is serviced once");

    bus.nmi = false;
    cpu.step(&mut bus);
    bus.nmi = true;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0x7FFC, "a new edge is serviced again");
}

#[test]
fn test_nmi_beats_int() {
    let (mut cpu, mut bus) = setup();
    bus.nmi = true;
    bus.int = true;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0x0066);
}

#[test]
fn test_retn_restores_iff1() {
    let (mut cpu, mut bus) = setup();
    bus.load(0x0066, &[0xED, 0x45]); // RETN
    bus.nmi = true;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(!cpu.iff1);
    assert_eq!(cpu.step(&mut bus), 14);
    assert!(cpu.iff1);
    assert_eq!(cpu.pc, 0x0101);
}

#[test]
fn test_nmi_after_ei_consumes_ei_shadow() {
    let (mut cpu, mut bus) = setup();
    cpu.iff1 = false;
    cpu.iff2 = false;
    bus.load(0x0100, &[0xFB]); // EI
    bus.load(0x0066, &[0xED, 0x45]); // RETN
    bus.nmi = true;
    assert_eq!(cpu.step(&mut bus), 4, "EI");
    assert!(!cpu.ei_delay, "the NMI boundary used up the EI shadow");
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.pc, 0x0066);

    bus.int = true;
    assert_eq!(cpu.step(&mut bus), 14, "RETN");
    assert_eq!(cpu.pc, 0x0101);
    assert!(cpu.iff1, "IFF2 from EI restored by RETN");
    assert_eq!(cpu.step(&mut bus), 13, "INT taken right after RETN");
    assert_eq!(cpu.pc, 0x0038);
    assert_eq!(pushed_word(&bus, cpu.sp), 0x0101);
}

// ============================================================
// RETI and reset
// ============================================================

#[test]
fn test_reti_pin_on_following_fetch() {
    let mut cpu = Z80::new();
    let mut bus = Z80Bus::tracing();
    cpu.sp = 0x7FFE;
    bus.load(0x7FFE, &[0x00, 0x02]);
    bus.load(0x0000, &[0xED, 0x4D]); // RETI
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    let trace = bus.trace.take().unwrap_or_default();
    let reti: Vec<_> = trace.iter().filter(|p| p.contains(Z80Pins::RETI)).collect();
    assert_eq!(reti.len(), 1);
    assert!(reti[0].contains(Z80Pins::M1));
    assert_eq!(reti[0].addr(), 0x0200);
}

#[test]
fn test_reset_sequence() {
    let mut cpu = Z80::new();
    let mut bus = Z80Bus::new();
    cpu.pc = 0x1234;
    cpu.iff1 = true;
    cpu.im = 2;
    cpu.reset();
    assert_eq!(cpu.step(&mut bus), 3, "reset takes 3 ticks");
    assert_eq!(cpu.pc, 0x0000);
    assert!(!cpu.iff1);
    assert_eq!(cpu.im, 0);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.pc, 0x0001);
}
