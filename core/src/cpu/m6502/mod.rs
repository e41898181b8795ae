mod alu;
mod branch;
pub mod dasm;
mod load_store;
mod shift;
mod stack;
mod unary;

use crate::core::pins::M6502Pins;
use crate::cpu::{
    Cpu,
    state::{CpuStateTrait, M6502State},
};

pub(crate) use load_store::Mode;

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum StatusFlag {
    C = 0x01, // Carry
    Z = 0x02, // Zero
    I = 0x04, // Interrupt Disable
    D = 0x08, // Decimal
    B = 0x10, // Break
    U = 0x20, // Unused (always 1)
    V = 0x40, // Overflow
    N = 0x80, // Negative
}

// Pending BRK sources, checked by the shared BRK/interrupt sequence.
pub(crate) const BRK_IRQ: u8 = 0x01;
pub(crate) const BRK_NMI: u8 = 0x02;
pub(crate) const BRK_RESET: u8 = 0x04;

pub struct M6502 {
    // Registers
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub sp: u8,
    pub p: u8,

    /// Decimal mode support. Cleared for the 2A03 variant, where the D flag
    /// still exists but ADC/SBC stay binary.
    pub bcd_enabled: bool,

    // Internal state
    pub(crate) opcode: u8,
    pub(crate) cycle: u8,
    pub(crate) temp_addr: u16,
    pub(crate) temp_data: u8,
    /// Data bus value delivered with the current tick.
    pub(crate) data: u8,
    pub(crate) brk_flags: u8,
    pub(crate) jammed: bool,

    // Interrupt pipelines: bit 0 is the current tick, one shift per tick
    pub(crate) irq_pip: u16,
    pub(crate) nmi_pip: u16,
    nmi_line: bool,

    /// Request issued by the last tick.
    pub(crate) out: M6502Pins,
    opdone: bool,
    pins: M6502Pins,
}

impl Default for M6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl M6502 {
    /// A CPU about to run its reset sequence: the first `step` reads the
    /// reset vector and leaves PC on the first opcode.
    pub fn new() -> Self {
        let mut cpu = Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            sp: 0,
            p: StatusFlag::U as u8 | StatusFlag::I as u8,
            bcd_enabled: true,
            opcode: 0,
            cycle: 0,
            temp_addr: 0,
            temp_data: 0,
            data: 0,
            brk_flags: 0,
            jammed: false,
            irq_pip: 0,
            nmi_pip: 0,
            nmi_line: false,
            out: M6502Pins::RW,
            opdone: false,
            pins: M6502Pins::empty(),
        };
        cpu.reset();
        cpu
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: StatusFlag, set: bool) {
        if set {
            self.p |= flag as u8;
        } else {
            self.p &= !(flag as u8);
        }
    }

    #[inline]
    pub(crate) fn flag(&self, flag: StatusFlag) -> bool {
        self.p & flag as u8 != 0
    }

    // --- Bus requests for the current tick ---

    #[inline]
    pub(crate) fn read(&mut self, addr: u16) {
        self.out = M6502Pins::RW.with_addr(addr);
    }

    #[inline]
    pub(crate) fn write(&mut self, addr: u16, data: u8) {
        self.out = M6502Pins::empty().with_addr(addr).with_data(data);
    }

    /// Read the byte at PC and advance PC.
    #[inline]
    pub(crate) fn read_pc(&mut self) {
        self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
    }

    /// Issue the opcode fetch of the next instruction. This is the last tick
    /// of the current one.
    #[inline]
    pub(crate) fn fetch(&mut self) {
        self.out = (M6502Pins::RW | M6502Pins::SYNC).with_addr(self.pc);
        self.opdone = true;
    }

    /// Skip the next handler cycle (no page crossing on an indexed read).
    #[inline]
    pub(crate) fn skip_cycle(&mut self) {
        self.cycle += 1;
    }

    #[inline]
    pub(crate) fn stack_addr(&self) -> u16 {
        0x0100 | self.sp as u16
    }

    /// Opcode latch: either the fetched byte or a forced BRK when an
    /// interrupt made it through the pipeline.
    fn decode(&mut self) {
        let irq = self.irq_pip & 0x4 != 0;
        let nmi = self.nmi_pip & 0xFFFC != 0;
        if nmi {
            self.brk_flags |= BRK_NMI;
            self.nmi_pip = 0;
        }
        if irq {
            self.brk_flags |= BRK_IRQ;
        }
        if self.brk_flags != 0 {
            self.opcode = 0x00;
        } else {
            self.opcode = self.data;
            self.pc = self.pc.wrapping_add(1);
        }
        self.cycle = 0;
    }

    fn execute_instruction(&mut self, opcode: u8, cycle: u8) {
        use Mode::*;
        match opcode {
            // --- Interrupts and control flow ---
            0x00 => self.op_brk(cycle),
            0x20 => self.op_jsr(cycle),
            0x40 => self.op_rti(cycle),
            0x60 => self.op_rts(cycle),
            0x4C => self.op_jmp_abs(cycle),
            0x6C => self.op_jmp_ind(cycle),
            0x10 => self.branch(cycle, !self.flag(StatusFlag::N)), // BPL
            0x30 => self.branch(cycle, self.flag(StatusFlag::N)),  // BMI
            0x50 => self.branch(cycle, !self.flag(StatusFlag::V)), // BVC
            0x70 => self.branch(cycle, self.flag(StatusFlag::V)),  // BVS
            0x90 => self.branch(cycle, !self.flag(StatusFlag::C)), // BCC
            0xB0 => self.branch(cycle, self.flag(StatusFlag::C)),  // BCS
            0xD0 => self.branch(cycle, !self.flag(StatusFlag::Z)), // BNE
            0xF0 => self.branch(cycle, self.flag(StatusFlag::Z)),  // BEQ

            // --- Stack ---
            0x48 => self.op_pha(cycle),
            0x08 => self.op_php(cycle),
            0x68 => self.op_pla(cycle),
            0x28 => self.op_plp(cycle),

            // --- Implied ---
            0xAA => self.implied(cycle, |c| { c.x = c.a; c.set_nz(c.x) }),   // TAX
            0xA8 => self.implied(cycle, |c| { c.y = c.a; c.set_nz(c.y) }),   // TAY
            0x8A => self.implied(cycle, |c| { c.a = c.x; c.set_nz(c.a) }),   // TXA
            0x98 => self.implied(cycle, |c| { c.a = c.y; c.set_nz(c.a) }),   // TYA
            0xBA => self.implied(cycle, |c| { c.x = c.sp; c.set_nz(c.x) }),  // TSX
            0x9A => self.implied(cycle, |c| c.sp = c.x),                     // TXS
            0xE8 => self.implied(cycle, |c| { c.x = c.x.wrapping_add(1); c.set_nz(c.x) }), // INX
            0xC8 => self.implied(cycle, |c| { c.y = c.y.wrapping_add(1); c.set_nz(c.y) }), // INY
            0xCA => self.implied(cycle, |c| { c.x = c.x.wrapping_sub(1); c.set_nz(c.x) }), // DEX
            0x88 => self.implied(cycle, |c| { c.y = c.y.wrapping_sub(1); c.set_nz(c.y) }), // DEY
            0x18 => self.implied(cycle, |c| c.set_flag(StatusFlag::C, false)), // CLC
            0x38 => self.implied(cycle, |c| c.set_flag(StatusFlag::C, true)),  // SEC
            0x58 => self.implied(cycle, |c| c.set_flag(StatusFlag::I, false)), // CLI
            0x78 => self.implied(cycle, |c| c.set_flag(StatusFlag::I, true)),  // SEI
            0xB8 => self.implied(cycle, |c| c.set_flag(StatusFlag::V, false)), // CLV
            0xD8 => self.implied(cycle, |c| c.set_flag(StatusFlag::D, false)), // CLD
            0xF8 => self.implied(cycle, |c| c.set_flag(StatusFlag::D, true)),  // SED
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => self.implied(cycle, |_| {}), // NOP

            // --- Accumulator shifts ---
            0x0A => self.implied(cycle, |c| c.a = c.perform_asl(c.a)),
            0x4A => self.implied(cycle, |c| c.a = c.perform_lsr(c.a)),
            0x2A => self.implied(cycle, |c| c.a = c.perform_rol(c.a)),
            0x6A => self.implied(cycle, |c| c.a = c.perform_ror(c.a)),

            // --- Loads ---
            0xA9 => self.read_op(Imm, cycle, Self::lda),
            0xA5 => self.read_op(Zp, cycle, Self::lda),
            0xB5 => self.read_op(ZpX, cycle, Self::lda),
            0xAD => self.read_op(Abs, cycle, Self::lda),
            0xBD => self.read_op(AbsX, cycle, Self::lda),
            0xB9 => self.read_op(AbsY, cycle, Self::lda),
            0xA1 => self.read_op(IndX, cycle, Self::lda),
            0xB1 => self.read_op(IndY, cycle, Self::lda),
            0xA2 => self.read_op(Imm, cycle, Self::ldx),
            0xA6 => self.read_op(Zp, cycle, Self::ldx),
            0xB6 => self.read_op(ZpY, cycle, Self::ldx),
            0xAE => self.read_op(Abs, cycle, Self::ldx),
            0xBE => self.read_op(AbsY, cycle, Self::ldx),
            0xA0 => self.read_op(Imm, cycle, Self::ldy),
            0xA4 => self.read_op(Zp, cycle, Self::ldy),
            0xB4 => self.read_op(ZpX, cycle, Self::ldy),
            0xAC => self.read_op(Abs, cycle, Self::ldy),
            0xBC => self.read_op(AbsX, cycle, Self::ldy),

            // --- Stores ---
            0x85 => self.store_op(Zp, cycle, |c, _| c.a),
            0x95 => self.store_op(ZpX, cycle, |c, _| c.a),
            0x8D => self.store_op(Abs, cycle, |c, _| c.a),
            0x9D => self.store_op(AbsX, cycle, |c, _| c.a),
            0x99 => self.store_op(AbsY, cycle, |c, _| c.a),
            0x81 => self.store_op(IndX, cycle, |c, _| c.a),
            0x91 => self.store_op(IndY, cycle, |c, _| c.a),
            0x86 => self.store_op(Zp, cycle, |c, _| c.x),
            0x96 => self.store_op(ZpY, cycle, |c, _| c.x),
            0x8E => self.store_op(Abs, cycle, |c, _| c.x),
            0x84 => self.store_op(Zp, cycle, |c, _| c.y),
            0x94 => self.store_op(ZpX, cycle, |c, _| c.y),
            0x8C => self.store_op(Abs, cycle, |c, _| c.y),

            // --- ALU ---
            0x69 | 0xE9 | 0xEB | 0x29 | 0x09 | 0x49 | 0xC9 | 0xE0 | 0xC0 => {
                self.read_op(Imm, cycle, Self::alu_fn(opcode))
            }
            0x65 | 0xE5 | 0x25 | 0x05 | 0x45 | 0xC5 | 0xE4 | 0xC4 | 0x24 => {
                self.read_op(Zp, cycle, Self::alu_fn(opcode))
            }
            0x75 | 0xF5 | 0x35 | 0x15 | 0x55 | 0xD5 => self.read_op(ZpX, cycle, Self::alu_fn(opcode)),
            0x6D | 0xED | 0x2D | 0x0D | 0x4D | 0xCD | 0xEC | 0xCC | 0x2C => {
                self.read_op(Abs, cycle, Self::alu_fn(opcode))
            }
            0x7D | 0xFD | 0x3D | 0x1D | 0x5D | 0xDD => self.read_op(AbsX, cycle, Self::alu_fn(opcode)),
            0x79 | 0xF9 | 0x39 | 0x19 | 0x59 | 0xD9 => self.read_op(AbsY, cycle, Self::alu_fn(opcode)),
            0x61 | 0xE1 | 0x21 | 0x01 | 0x41 | 0xC1 => self.read_op(IndX, cycle, Self::alu_fn(opcode)),
            0x71 | 0xF1 | 0x31 | 0x11 | 0x51 | 0xD1 => self.read_op(IndY, cycle, Self::alu_fn(opcode)),

            // --- Read-modify-write ---
            0x06 | 0x46 | 0x26 | 0x66 | 0xE6 | 0xC6 => self.rmw_op(Zp, cycle, Self::rmw_fn(opcode)),
            0x16 | 0x56 | 0x36 | 0x76 | 0xF6 | 0xD6 => self.rmw_op(ZpX, cycle, Self::rmw_fn(opcode)),
            0x0E | 0x4E | 0x2E | 0x6E | 0xEE | 0xCE => self.rmw_op(Abs, cycle, Self::rmw_fn(opcode)),
            0x1E | 0x5E | 0x3E | 0x7E | 0xFE | 0xDE => self.rmw_op(AbsX, cycle, Self::rmw_fn(opcode)),

            // --- Undocumented: combined RMW + ALU (SLO RLA SRE RRA DCP ISB) ---
            op if op & 0x03 == 0x03 && op & 0xC0 != 0x80 && (op >> 2) & 0x07 != 2 => {
                let mode = match (op >> 2) & 0x07 {
                    0 => IndX,
                    1 => Zp,
                    3 => Abs,
                    4 => IndY,
                    5 => ZpX,
                    6 => AbsY,
                    _ => AbsX,
                };
                self.rmw_op(mode, cycle, Self::rmw_fn(op))
            }

            // --- Undocumented: SAX / LAX / SHA / TAS / LAS ---
            0x87 => self.store_op(Zp, cycle, |c, _| c.a & c.x),
            0x97 => self.store_op(ZpY, cycle, |c, _| c.a & c.x),
            0x8F => self.store_op(Abs, cycle, |c, _| c.a & c.x),
            0x83 => self.store_op(IndX, cycle, |c, _| c.a & c.x),
            0xA7 => self.read_op(Zp, cycle, Self::lax),
            0xB7 => self.read_op(ZpY, cycle, Self::lax),
            0xAF => self.read_op(Abs, cycle, Self::lax),
            0xBF => self.read_op(AbsY, cycle, Self::lax),
            0xA3 => self.read_op(IndX, cycle, Self::lax),
            0xB3 => self.read_op(IndY, cycle, Self::lax),
            0x9F => self.store_op(AbsY, cycle, |c, addr| c.a & c.x & Self::high_plus_one(addr, c.y)),
            0x93 => self.store_op(IndY, cycle, |c, addr| c.a & c.x & Self::high_plus_one(addr, c.y)),
            0x9E => self.store_op(AbsY, cycle, |c, addr| c.x & Self::high_plus_one(addr, c.y)),
            0x9C => self.store_op(AbsX, cycle, |c, addr| c.y & Self::high_plus_one(addr, c.x)),
            0x9B => self.store_op(AbsY, cycle, |c, addr| {
                c.sp = c.a & c.x;
                c.sp & Self::high_plus_one(addr, c.y)
            }),
            0xBB => self.read_op(AbsY, cycle, |c, v| {
                let val = v & c.sp;
                c.a = val;
                c.x = val;
                c.sp = val;
                c.set_nz(val);
            }),

            // --- Undocumented immediates ---
            0x0B | 0x2B => self.read_op(Imm, cycle, Self::perform_anc),
            0x4B => self.read_op(Imm, cycle, Self::perform_alr),
            0x6B => self.read_op(Imm, cycle, Self::perform_arr),
            0xCB => self.read_op(Imm, cycle, Self::perform_sbx),
            0x8B => self.read_op(Imm, cycle, Self::perform_ane),
            0xAB => self.read_op(Imm, cycle, Self::perform_lxa),

            // --- Undocumented NOPs with operands (reads still happen) ---
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.read_op(Imm, cycle, |_, _| {}),
            0x04 | 0x44 | 0x64 => self.read_op(Zp, cycle, |_, _| {}),
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.read_op(ZpX, cycle, |_, _| {}),
            0x0C => self.read_op(Abs, cycle, |_, _| {}),
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.read_op(AbsX, cycle, |_, _| {}),

            // --- JAM: 0x02 0x12 ... 0xF2 ---
            _ => self.op_jam(cycle),
        }
    }

    fn lda(&mut self, v: u8) {
        self.a = v;
        self.set_nz(v);
    }

    fn ldx(&mut self, v: u8) {
        self.x = v;
        self.set_nz(v);
    }

    fn ldy(&mut self, v: u8) {
        self.y = v;
        self.set_nz(v);
    }

    fn lax(&mut self, v: u8) {
        self.a = v;
        self.x = v;
        self.set_nz(v);
    }

    /// High byte of the un-indexed base address plus one, used by the
    /// unstable SHA/SHX/SHY/TAS stores.
    fn high_plus_one(addr: u16, index: u8) -> u8 {
        ((addr.wrapping_sub(index as u16) >> 8) as u8).wrapping_add(1)
    }

    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// Restart at `addr` as if the previous instruction had just fetched it.
    /// Returns the fetch request; the caller answers it and hands the
    /// response back with [`Cpu::set_bus_pins`] before the next tick.
    pub fn prefetch(&mut self, addr: u16) -> M6502Pins {
        self.pc = addr;
        self.brk_flags = 0;
        self.jammed = false;
        self.fetch();
        self.out
    }
}

impl Cpu for M6502 {
    type Pins = M6502Pins;

    fn tick(&mut self, pins: M6502Pins) -> M6502Pins {
        self.opdone = false;

        if pins.contains(M6502Pins::RES) {
            self.reset();
            self.read(self.pc);
            return self.out;
        }
        // RDY holds a read cycle; the same request repeats until released.
        if pins.contains(M6502Pins::RDY) && self.out.contains(M6502Pins::RW) {
            return self.out;
        }

        self.irq_pip <<= 1;
        self.nmi_pip <<= 1;
        let nmi = pins.contains(M6502Pins::NMI);
        if nmi && !self.nmi_line {
            self.nmi_pip |= 1;
        }
        self.nmi_line = nmi;
        if pins.contains(M6502Pins::IRQ) && !self.flag(StatusFlag::I) {
            self.irq_pip |= 1;
        }

        self.data = pins.data();
        if self.out.contains(M6502Pins::SYNC) {
            self.decode();
        }
        let (opcode, cycle) = (self.opcode, self.cycle);
        self.execute_instruction(opcode, cycle);
        self.cycle = self.cycle.wrapping_add(1);
        self.out
    }

    fn opdone(&self) -> bool {
        self.opdone
    }

    /// Enter the 7-tick reset sequence: a BRK whose stack pushes turn into
    /// reads, ending with PC loaded from 0xFFFC.
    fn reset(&mut self) {
        self.brk_flags = BRK_RESET;
        self.opcode = 0x00;
        self.cycle = 0;
        self.jammed = false;
        self.irq_pip = 0;
        self.nmi_pip = 0;
        self.p |= StatusFlag::U as u8;
        self.out = M6502Pins::RW.with_addr(self.pc);
    }

    fn bus_pins(&self) -> M6502Pins {
        self.pins
    }

    fn set_bus_pins(&mut self, pins: M6502Pins) {
        self.pins = pins;
    }
}

impl CpuStateTrait for M6502 {
    type Snapshot = M6502State;

    fn snapshot(&self) -> M6502State {
        M6502State {
            a: self.a,
            x: self.x,
            y: self.y,
            pc: self.pc,
            sp: self.sp,
            p: self.p,
        }
    }
}
