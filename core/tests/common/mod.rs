#![allow(dead_code)]

use std::marker::PhantomData;

use tickwork_core::core::{Bus, M6502Pins, Z80Pins};
use tickwork_core::cpu::Cpu;

/// Minimal bus for testing: flat 64KB read/write memory, a 256-port I/O
/// space, and input lines the test drives directly.
pub struct TestBus<P> {
    pub memory: Box<[u8; 0x10000]>,
    /// Values returned by I/O reads, by low port byte.
    pub io: [u8; 0x100],
    /// Every I/O write, in order.
    pub io_writes: Vec<(u16, u8)>,

    /// Maskable interrupt line (Z80 INT, 6502 IRQ), level.
    pub int: bool,
    pub nmi: bool,
    /// Byte driven during a Z80 interrupt acknowledge.
    pub int_vector: u8,
    /// Z80: wait states inserted into every memory and I/O cycle.
    pub wait_states: u32,
    wait_left: u32,
    /// 6502 RDY.
    pub rdy: bool,

    /// Requests seen, when tracing.
    pub trace: Option<Vec<P>>,
    _pins: PhantomData<P>,
}

pub type Z80Bus = TestBus<Z80Pins>;
pub type M6502Bus = TestBus<M6502Pins>;

impl<P> TestBus<P> {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            io: [0xFF; 0x100],
            io_writes: Vec::new(),
            int: false,
            nmi: false,
            int_vector: 0xFF,
            wait_states: 0,
            wait_left: 0,
            rdy: false,
            trace: None,
            _pins: PhantomData,
        }
    }

    pub fn tracing() -> Self {
        Self {
            trace: Some(Vec::new()),
            ..Self::new()
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus<Z80Pins> {
    type Pins = Z80Pins;

    fn respond(&mut self, mut pins: Z80Pins) -> Z80Pins {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(pins);
        }
        let addr = pins.addr();
        if pins.is_mem_read() {
            pins.set_data(self.memory[addr as usize]);
        } else if pins.is_mem_write() {
            self.memory[addr as usize] = pins.data();
        } else if pins.is_io_read() {
            pins.set_data(self.io[(addr & 0xFF) as usize]);
        } else if pins.is_io_write() {
            self.io_writes.push((addr, pins.data()));
        } else if pins.is_int_ack() {
            pins.set_data(self.int_vector);
        }

        // A machine cycle starts with MREQ (not refresh, not the second half
        // of a write) or with IORQ.
        let mem_start = pins.contains(Z80Pins::MREQ)
            && !pins.intersects(Z80Pins::RFSH | Z80Pins::WR);
        if mem_start || pins.contains(Z80Pins::IORQ) {
            self.wait_left = self.wait_states;
        }

        pins -= Z80Pins::WAIT | Z80Pins::INT | Z80Pins::NMI;
        if self.wait_left > 0 {
            self.wait_left -= 1;
            pins |= Z80Pins::WAIT;
        }
        if self.int {
            pins |= Z80Pins::INT;
        }
        if self.nmi {
            pins |= Z80Pins::NMI;
        }
        pins
    }
}

impl Bus for TestBus<M6502Pins> {
    type Pins = M6502Pins;

    fn respond(&mut self, mut pins: M6502Pins) -> M6502Pins {
        if let Some(trace) = self.trace.as_mut() {
            trace.push(pins);
        }
        let addr = pins.addr() as usize;
        if pins.is_read() {
            pins.set_data(self.memory[addr]);
        } else {
            self.memory[addr] = pins.data();
        }
        pins -= M6502Pins::IRQ | M6502Pins::NMI | M6502Pins::RDY;
        if self.int {
            pins |= M6502Pins::IRQ;
        }
        if self.nmi {
            pins |= M6502Pins::NMI;
        }
        if self.rdy {
            pins |= M6502Pins::RDY;
        }
        pins
    }
}

/// Run exactly one clock tick against the bus.
pub fn tick<C, B>(cpu: &mut C, bus: &mut B)
where
    C: Cpu,
    B: Bus<Pins = C::Pins>,
{
    let request = cpu.tick(cpu.bus_pins());
    let response = bus.respond(request);
    cpu.set_bus_pins(response);
}

pub fn ticks<C, B>(cpu: &mut C, bus: &mut B, n: usize)
where
    C: Cpu,
    B: Bus<Pins = C::Pins>,
{
    for _ in 0..n {
        tick(cpu, bus);
    }
}
