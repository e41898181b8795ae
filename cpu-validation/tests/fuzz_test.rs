//! Random programs through both cores. Two CPUs fed the same memory must
//! produce the same bus traffic and end in the same state, and no byte
//! sequence may wedge the sequencer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickwork_core::core::{M6502Pins, Z80Pins};
use tickwork_core::cpu::{Cpu, CpuStateTrait, M6502, Z80};
use tickwork_cpu_validation::TracingBus;

const SEEDS: u64 = 16;
const STEPS: usize = 2_000;

fn random_memory<P>(rng: &mut StdRng) -> TracingBus<P> {
    let mut bus = TracingBus::new();
    rng.fill(&mut bus.memory[..]);
    bus.ports = (0..64).map(|_| rng.r#gen()).collect();
    bus
}

#[test]
fn z80_random_programs_are_deterministic() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bus_a: TracingBus<Z80Pins> = random_memory(&mut rng);
        let mut bus_b: TracingBus<Z80Pins> = TracingBus::new();
        bus_b.memory.copy_from_slice(&bus_a.memory[..]);
        bus_b.ports = bus_a.ports.clone();

        let mut cpu_a = Z80::new();
        let mut cpu_b = Z80::new();
        cpu_a.sp = rng.r#gen();
        cpu_b.sp = cpu_a.sp;

        let mut total = 0u64;
        for step in 0..STEPS {
            let ticks_a = cpu_a.step(&mut bus_a);
            let ticks_b = cpu_b.step(&mut bus_b);
            assert_eq!(ticks_a, ticks_b, "seed {seed} step {step}");
            assert!(ticks_a > 0 && ticks_a < 64, "seed {seed} step {step}: {ticks_a} ticks");
            total += ticks_a as u64;
        }
        assert_eq!(cpu_a.snapshot(), cpu_b.snapshot(), "seed {seed}");
        assert_eq!(bus_a.cycles, bus_b.cycles, "seed {seed}");
        assert_eq!(bus_a.io_writes, bus_b.io_writes, "seed {seed}");
        assert_eq!(bus_a.cycles.len() as u64, total, "one bus cycle per tick");
    }
}

#[test]
fn m6502_random_programs_are_deterministic() {
    for seed in 0..SEEDS {
        let mut rng = StdRng::seed_from_u64(seed ^ 0x6502);
        let mut bus_a: TracingBus<M6502Pins> = random_memory(&mut rng);
        let mut bus_b: TracingBus<M6502Pins> = TracingBus::new();
        bus_b.memory.copy_from_slice(&bus_a.memory[..]);

        let mut cpu_a = M6502::new();
        let mut cpu_b = M6502::new();
        for step in 0..STEPS {
            let ticks_a = cpu_a.step(&mut bus_a);
            let ticks_b = cpu_b.step(&mut bus_b);
            assert_eq!(ticks_a, ticks_b, "seed {seed} step {step}");
            assert!(ticks_a <= 9, "seed {seed} step {step}: {ticks_a} ticks");
            if cpu_a.is_jammed() {
                break;
            }
        }
        assert_eq!(cpu_a.snapshot(), cpu_b.snapshot(), "seed {seed}");
        assert_eq!(bus_a.cycles, bus_b.cycles, "seed {seed}");
        assert!(bus_a.memory[..] == bus_b.memory[..], "seed {seed}");
    }
}
