use std::collections::BTreeSet;

use tickwork_core::core::Z80Pins;
use tickwork_core::cpu::{Cpu, Z80};
use tickwork_cpu_validation::{TracingBus, Z80CpuState, Z80TestCase, load_tests, test_data_dir, test_files};

fn load_initial_state(cpu: &mut Z80, s: &Z80CpuState) {
    cpu.a = s.a;
    cpu.f = s.f;
    cpu.b = s.b;
    cpu.c = s.c;
    cpu.d = s.d;
    cpu.e = s.e;
    cpu.h = s.h;
    cpu.l = s.l;
    cpu.i = s.i;
    cpu.r = s.r;
    cpu.ix = s.ix;
    cpu.iy = s.iy;
    cpu.sp = s.sp;
    cpu.pc = s.pc;
    cpu.memptr = s.wz;
    cpu.iff1 = s.iff1 != 0;
    cpu.iff2 = s.iff2 != 0;
    cpu.im = s.im;
    cpu.ei_delay = s.ei != 0;
    cpu.p = s.p != 0;
    cpu.q = s.q;
    cpu.halted = false;

    // Shadow registers: stored as 16-bit pairs in JSON
    cpu.a_prime = (s.af_prime >> 8) as u8;
    cpu.f_prime = s.af_prime as u8;
    cpu.b_prime = (s.bc_prime >> 8) as u8;
    cpu.c_prime = s.bc_prime as u8;
    cpu.d_prime = (s.de_prime >> 8) as u8;
    cpu.e_prime = s.de_prime as u8;
    cpu.h_prime = (s.hl_prime >> 8) as u8;
    cpu.l_prime = s.hl_prime as u8;
}

fn run_test_case(tc: &Z80TestCase) -> Option<String> {
    let mut cpu = Z80::new();
    let mut bus = TracingBus::<Z80Pins>::new();

    load_initial_state(&mut cpu, &tc.initial);
    for &(addr, val) in &tc.initial.ram {
        bus.memory[addr as usize] = val;
    }
    bus.ports = tc
        .ports
        .iter()
        .filter(|(_, _, dir)| dir == "r")
        .map(|&(_, data, _)| data)
        .collect();

    let total_ticks = cpu.step(&mut bus) as usize;

    let fs = &tc.final_state;

    // Check registers, return first mismatch
    macro_rules! check {
        ($got:expr, $exp:expr, $name:expr) => {
            if $got != $exp {
                return Some(format!(
                    "{}: {} (got 0x{:X} exp 0x{:X})", tc.name, $name, $got as u64, $exp as u64
                ));
            }
        };
    }

    check!(cpu.a, fs.a, "A");
    check!(cpu.f, fs.f, "F");
    check!(cpu.b, fs.b, "B");
    check!(cpu.c, fs.c, "C");
    check!(cpu.d, fs.d, "D");
    check!(cpu.e, fs.e, "E");
    check!(cpu.h, fs.h, "H");
    check!(cpu.l, fs.l, "L");
    check!(cpu.i, fs.i, "I");
    check!(cpu.r, fs.r, "R");
    check!(cpu.ix, fs.ix, "IX");
    check!(cpu.iy, fs.iy, "IY");
    check!(cpu.sp, fs.sp, "SP");
    check!(cpu.pc, fs.pc, "PC");
    check!(cpu.memptr, fs.wz, "WZ");
    check!(cpu.iff1 as u8, (fs.iff1 != 0) as u8, "IFF1");
    check!(cpu.iff2 as u8, (fs.iff2 != 0) as u8, "IFF2");
    check!(cpu.im, fs.im, "IM");

    let af_prime = ((cpu.a_prime as u16) << 8) | cpu.f_prime as u16;
    let bc_prime = ((cpu.b_prime as u16) << 8) | cpu.c_prime as u16;
    let de_prime = ((cpu.d_prime as u16) << 8) | cpu.e_prime as u16;
    let hl_prime = ((cpu.h_prime as u16) << 8) | cpu.l_prime as u16;
    check!(af_prime, fs.af_prime, "AF'");
    check!(bc_prime, fs.bc_prime, "BC'");
    check!(de_prime, fs.de_prime, "DE'");
    check!(hl_prime, fs.hl_prime, "HL'");

    for &(addr, expected) in &fs.ram {
        if bus.memory[addr as usize] != expected {
            return Some(format!(
                "{}: RAM[0x{:04X}] (got 0x{:02X} exp 0x{:02X})",
                tc.name, addr, bus.memory[addr as usize], expected
            ));
        }
    }

    // I/O writes in order
    let expected_out: Vec<(u16, u8)> = tc
        .ports
        .iter()
        .filter(|(_, _, dir)| dir == "w")
        .map(|&(port, data, _)| (port, data))
        .collect();
    if bus.io_writes != expected_out {
        return Some(format!(
            "{}: port writes (got {:X?} exp {:X?})",
            tc.name, bus.io_writes, expected_out
        ));
    }

    if total_ticks != tc.cycles.len() {
        return Some(format!(
            "{}: cycles (got {} exp {})",
            tc.name,
            total_ticks,
            tc.cycles.len()
        ));
    }

    None
}

#[test]
fn test_all_z80_opcodes() {
    let test_dir = test_data_dir("z80/v1");
    let files = test_files(&test_dir).unwrap();
    if files.is_empty() {
        eprintln!("skipping: no SingleStepTests data in {}", test_dir.display());
        return;
    }

    let mut total_tests = 0;
    let mut failed_tests = 0;
    let mut failed_files = BTreeSet::new();
    let mut first_failures: Vec<String> = Vec::new();

    for path in &files {
        let tests: Vec<Z80TestCase> = load_tests(path).unwrap();
        assert!(!tests.is_empty(), "{} is empty", path.display());
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());

        for tc in &tests {
            if let Some(err) = run_test_case(tc) {
                failed_tests += 1;
                if failed_files.insert(file_name.clone()) && first_failures.len() < 50 {
                    first_failures.push(err);
                }
            }
        }
        total_tests += tests.len();
    }

    eprintln!(
        "\nZ80 SingleStepTests: {} passed, {} failed across {} files",
        total_tests - failed_tests,
        failed_tests,
        files.len()
    );
    if !first_failures.is_empty() {
        eprintln!("\nFirst failure per file ({} files):", failed_files.len());
        for err in &first_failures {
            eprintln!("  {}", err);
        }
    }
    assert_eq!(
        failed_tests, 0,
        "{} tests failed across {} files",
        failed_tests,
        failed_files.len()
    );
}
