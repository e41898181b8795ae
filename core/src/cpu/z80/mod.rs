mod alu;
mod bit;
mod block;
mod branch;
pub mod dasm;
mod load_store;
mod stack;

use crate::core::pins::Z80Pins;
use crate::cpu::{
    Cpu,
    state::{CpuStateTrait, Z80State},
};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Flag {
    C = 0x01,  // Carry
    N = 0x02,  // Add/Subtract
    PV = 0x04, // Parity/Overflow
    X = 0x08,  // Undocumented (copy of bit 3)
    H = 0x10,  // Half Carry
    Y = 0x20,  // Undocumented (copy of bit 5)
    Z = 0x40,  // Zero
    S = 0x80,  // Sign
}

/// Ticks spent in the reset sequence before the first opcode fetch.
pub const RESET_TICKS: u8 = 3;

pub(crate) const INT_NMI: u8 = 0;
pub(crate) const INT_IM0: u8 = 1;
pub(crate) const INT_IM1: u8 = 2;
pub(crate) const INT_IM2: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndexMode {
    HL,
    IX,
    IY,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Prefix {
    None,
    CB,
    ED,
}

/// Bus transaction currently on the pins. Each variant has a fixed tick
/// pattern; WAIT can only stretch it at its sample tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MCycle {
    /// Opcode fetch, 4 T: M1|MREQ|RD, wait/latch, MREQ|RFSH, idle.
    Fetch,
    /// Fetch whose opcode is thrown away (NMI response), PC not advanced.
    NmiFetch,
    /// Memory read, 3 T.
    Read,
    /// Memory write, 3 T: MREQ, wait/MREQ|WR, idle.
    Write,
    /// I/O read, 4 T.
    In,
    /// I/O write, 4 T.
    Out,
    /// Internal ticks without bus activity.
    Idle(u8),
    /// Maskable interrupt acknowledge, 6 T.
    IntAck,
}

/// Continuation run when the current machine cycle ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ExecState {
    /// Reset sequence finished: start the first instruction.
    Start,
    /// An M1 just finished: decode `self.opcode`.
    Fetch,
    Execute(u8, u8), // (opcode, stage)
    ExecuteCB(u8, u8),
    ExecuteED(u8, u8),
    /// DD/FD instruction with an (IX+d) operand: displacement read and 5 T add.
    Displace(u8, u8),
    /// DD CB d op / FD CB d op: displacement and sub-opcode reads.
    IndexCB(u8),
    ExecuteIndexCB(u8, u8),
    /// Interrupt response (kind, stage). kind: INT_NMI, INT_IM0, INT_IM1, INT_IM2.
    Interrupt(u8, u8),
}

pub struct Z80 {
    // Registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    // Shadow Registers
    pub a_prime: u8,
    pub f_prime: u8,
    pub b_prime: u8,
    pub c_prime: u8,
    pub d_prime: u8,
    pub e_prime: u8,
    pub h_prime: u8,
    pub l_prime: u8,
    // Index & Special Registers
    pub ix: u16,
    pub iy: u16,
    pub i: u8,
    pub r: u8,
    pub sp: u16,
    pub pc: u16,

    // Internal state
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
    pub memptr: u16, // Hidden WZ register
    pub halted: bool,
    pub ei_delay: bool, // EI just executed: INT is not sampled at this boundary
    pub p: bool,        // Set after LD A,I / LD A,R for interrupt PV behavior
    pub q: u8,          // Copy of F when instruction modifies flags, 0 otherwise (for SCF/CCF X/Y)
    pub(crate) prev_q: u8,

    // Sequencer
    pub(crate) state: ExecState,
    pub(crate) mcycle: MCycle,
    pub(crate) t: u8,
    pub(crate) opcode: u8,
    pub(crate) temp_addr: u16,
    pub(crate) temp_data: u8,
    pub(crate) dlatch: u8, // data latched by the last read cycle
    pub(crate) bus_addr: u16,
    pub(crate) bus_data: u8,

    // Prefix handling
    pub(crate) index_mode: IndexMode,
    pub(crate) prefix: Prefix,
    pub(crate) insn_start: bool,

    // Interrupt state
    pub(crate) input: Z80Pins,
    pub(crate) nmi_line: bool,
    pub(crate) nmi_pending: bool,
    pub(crate) reti_out: bool,
    pub(crate) opdone: bool,

    // Last bus response, consumed by step/exec
    pins: Z80Pins,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// A CPU in its reset register state, ready to fetch from PC on the
    /// next tick. Call [`Cpu::reset`] to run the reset sequence instead.
    pub fn new() -> Self {
        Self {
            a: 0xFF,
            f: 0xFF,
            b: 0xFF,
            c: 0xFF,
            d: 0xFF,
            e: 0xFF,
            h: 0xFF,
            l: 0xFF,
            a_prime: 0xFF,
            f_prime: 0xFF,
            b_prime: 0xFF,
            c_prime: 0xFF,
            d_prime: 0xFF,
            e_prime: 0xFF,
            h_prime: 0xFF,
            l_prime: 0xFF,
            ix: 0xFFFF,
            iy: 0xFFFF,
            i: 0,
            r: 0,
            sp: 0xFFFF,
            pc: 0x0000,
            iff1: false,
            iff2: false,
            im: 0,
            memptr: 0,
            halted: false,
            ei_delay: false,
            p: false,
            q: 0,
            prev_q: 0,
            state: ExecState::Fetch,
            mcycle: MCycle::Fetch,
            t: 0,
            opcode: 0,
            temp_addr: 0,
            temp_data: 0,
            dlatch: 0,
            bus_addr: 0,
            bus_data: 0,
            index_mode: IndexMode::HL,
            prefix: Prefix::None,
            insn_start: true,
            input: Z80Pins::empty(),
            nmi_line: false,
            nmi_pending: false,
            reti_out: false,
            opdone: false,
            pins: Z80Pins::empty(),
        }
    }

    /// Continue at `addr` after the current instruction, leaving HALT. An
    /// interrupt response already under way pushes `addr` as its return
    /// address.
    pub fn prefetch(&mut self, addr: u16) {
        self.pc = addr;
        self.halted = false;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    // Helpers for 16-bit register access
    pub fn get_bc(&self) -> u16 { ((self.b as u16) << 8) | self.c as u16 }
    pub fn set_bc(&mut self, val: u16) { self.b = (val >> 8) as u8; self.c = val as u8; }

    pub fn get_de(&self) -> u16 { ((self.d as u16) << 8) | self.e as u16 }
    pub fn set_de(&mut self, val: u16) { self.d = (val >> 8) as u8; self.e = val as u8; }

    pub fn get_hl(&self) -> u16 { ((self.h as u16) << 8) | self.l as u16 }
    pub fn set_hl(&mut self, val: u16) { self.h = (val >> 8) as u8; self.l = val as u8; }

    pub fn get_af(&self) -> u16 { ((self.a as u16) << 8) | self.f as u16 }
    pub fn set_af(&mut self, val: u16) { self.a = (val >> 8) as u8; self.f = val as u8; }

    /// Get 8-bit register by index, respecting IX/IY prefix for H/L (undocumented IXH/IXL/IYH/IYL).
    /// Index 6 is NOT handled here; callers must handle (HL)/(IX+d)/(IY+d) separately.
    pub fn get_reg8_ix(&self, index: u8) -> u8 {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => (self.ix >> 8) as u8,
            (5, IndexMode::IX) => self.ix as u8,
            (4, IndexMode::IY) => (self.iy >> 8) as u8,
            (5, IndexMode::IY) => self.iy as u8,
            _ => self.get_reg8(index),
        }
    }

    pub fn set_reg8_ix(&mut self, index: u8, val: u8) {
        match (index, self.index_mode) {
            (4, IndexMode::IX) => self.ix = (self.ix & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IX) => self.ix = (self.ix & 0xFF00) | val as u16,
            (4, IndexMode::IY) => self.iy = (self.iy & 0x00FF) | ((val as u16) << 8),
            (5, IndexMode::IY) => self.iy = (self.iy & 0xFF00) | val as u16,
            _ => self.set_reg8(index, val),
        }
    }

    /// Address of the (HL)/(IX+d)/(IY+d) operand. In indexed mode the
    /// displacement has already been added into `temp_addr`.
    pub(crate) fn operand_addr(&self) -> u16 {
        match self.index_mode {
            IndexMode::HL => self.get_hl(),
            IndexMode::IX | IndexMode::IY => self.temp_addr,
        }
    }

    pub(crate) fn index_base(&self) -> u16 {
        match self.index_mode {
            IndexMode::HL => self.get_hl(),
            IndexMode::IX => self.ix,
            IndexMode::IY => self.iy,
        }
    }

    /// Get 16-bit register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    /// Index 2 respects current index_mode for DD/FD prefixed instructions.
    pub(crate) fn get_rp(&self, index: u8) -> u16 {
        match index & 0x03 {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.index_base(),
            _ => self.sp,
        }
    }

    /// Set 16-bit register pair by index (0=BC, 1=DE, 2=HL/IX/IY, 3=SP).
    pub(crate) fn set_rp(&mut self, index: u8, val: u16) {
        match index & 0x03 {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => match self.index_mode {
                IndexMode::HL => self.set_hl(val),
                IndexMode::IX => self.ix = val,
                IndexMode::IY => self.iy = val,
            },
            _ => self.sp = val,
        }
    }

    /// Get 16-bit register pair by index for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn get_rp_af(&self, index: u8) -> u16 {
        match index & 0x03 {
            3 => self.get_af(),
            rp => self.get_rp(rp),
        }
    }

    /// Set 16-bit register pair by index for PUSH/POP (0=BC, 1=DE, 2=HL/IX/IY, 3=AF).
    pub(crate) fn set_rp_af(&mut self, index: u8, val: u16) {
        match index & 0x03 {
            3 => self.set_af(val),
            rp => self.set_rp(rp, val),
        }
    }

    /// Plain 8-bit register by index. Index 6 has no register and reads as 0.
    pub fn get_reg8(&self, index: u8) -> u8 {
        match index & 0x07 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => 0,
        }
    }

    pub fn set_reg8(&mut self, index: u8, val: u8) {
        match index & 0x07 {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => {}
        }
    }

    pub(crate) fn bump_r(&mut self) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7F);
    }

    // --- Machine cycle requests ---
    //
    // Each request ends the current stage; the handler is re-entered with the
    // next stage number when the requested cycle has finished.

    fn next_stage(&self) -> ExecState {
        match self.state {
            ExecState::Execute(op, s) => ExecState::Execute(op, s + 1),
            ExecState::ExecuteCB(op, s) => ExecState::ExecuteCB(op, s + 1),
            ExecState::ExecuteED(op, s) => ExecState::ExecuteED(op, s + 1),
            ExecState::Displace(op, s) => ExecState::Displace(op, s + 1),
            ExecState::IndexCB(s) => ExecState::IndexCB(s + 1),
            ExecState::ExecuteIndexCB(op, s) => ExecState::ExecuteIndexCB(op, s + 1),
            ExecState::Interrupt(kind, s) => ExecState::Interrupt(kind, s + 1),
            other => other,
        }
    }

    fn request(&mut self, cycle: MCycle, addr: u16, data: u8) {
        self.mcycle = cycle;
        self.t = 0;
        self.bus_addr = addr;
        self.bus_data = data;
        self.state = self.next_stage();
    }

    pub(crate) fn mread(&mut self, addr: u16) {
        self.request(MCycle::Read, addr, 0);
    }

    pub(crate) fn mwrite(&mut self, addr: u16, data: u8) {
        self.request(MCycle::Write, addr, data);
    }

    pub(crate) fn ioread(&mut self, port: u16) {
        self.request(MCycle::In, port, 0);
    }

    pub(crate) fn iowrite(&mut self, port: u16, data: u8) {
        self.request(MCycle::Out, port, data);
    }

    pub(crate) fn idle(&mut self, ticks: u8) {
        self.request(MCycle::Idle(ticks), self.bus_addr, 0);
    }

    /// Memory read at PC, advancing PC.
    pub(crate) fn read_imm(&mut self) {
        let pc = self.pc;
        self.pc = self.pc.wrapping_add(1);
        self.mread(pc);
    }

    pub(crate) fn push_high(&mut self, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        self.mwrite(self.sp, (val >> 8) as u8);
    }

    pub(crate) fn push_low(&mut self, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        self.mwrite(self.sp, val as u8);
    }

    pub(crate) fn pop_byte(&mut self) {
        let sp = self.sp;
        self.sp = self.sp.wrapping_add(1);
        self.mread(sp);
    }

    /// Instruction complete. Samples the interrupt lines and picks the next
    /// machine cycle: an interrupt response or the next opcode fetch.
    pub(crate) fn done(&mut self) {
        self.opdone = true;
        self.state = ExecState::Fetch;
        self.index_mode = IndexMode::HL;
        self.prefix = Prefix::None;
        self.insn_start = true;
        self.t = 0;

        // EI only shields this one boundary, whichever response follows
        let int_blocked = self.ei_delay;
        self.ei_delay = false;

        if self.nmi_pending {
            self.nmi_pending = false;
            self.halted = false;
            self.iff1 = false;
            self.state = ExecState::Interrupt(INT_NMI, 0);
            self.mcycle = MCycle::NmiFetch;
            return;
        }

        if !int_blocked && self.iff1 && self.input.contains(Z80Pins::INT) {
            self.halted = false;
            self.iff1 = false;
            self.iff2 = false;
            // NMOS quirk: LD A,I / LD A,R interrupted right away reads P/V as 0
            if self.p {
                self.f &= !(Flag::PV as u8);
            }
            let kind = match self.im {
                0 => INT_IM0,
                1 => INT_IM1,
                _ => INT_IM2,
            };
            self.state = ExecState::Interrupt(kind, 0);
            self.mcycle = MCycle::IntAck;
            return;
        }

        self.mcycle = MCycle::Fetch;
    }

    /// Continue a prefix chain with another M1.
    fn fetch_next(&mut self) {
        self.state = ExecState::Fetch;
        self.mcycle = MCycle::Fetch;
        self.t = 0;
    }

    // --- Tick engine ---

    fn tick_cycle(&mut self, pins: Z80Pins, out: &mut Z80Pins) {
        let wait = pins.contains(Z80Pins::WAIT);
        let last = match self.mcycle {
            MCycle::Fetch | MCycle::NmiFetch => match self.t {
                0 => {
                    out.set_addr(self.pc);
                    *out |= Z80Pins::M1 | Z80Pins::MREQ | Z80Pins::RD;
                    if self.reti_out {
                        *out |= Z80Pins::RETI;
                        self.reti_out = false;
                    }
                    false
                }
                1 => {
                    if wait {
                        return;
                    }
                    if self.mcycle == MCycle::Fetch {
                        if self.halted {
                            self.opcode = 0x00;
                        } else {
                            self.opcode = pins.data();
                            self.pc = self.pc.wrapping_add(1);
                        }
                    }
                    false
                }
                2 => {
                    out.set_addr(((self.i as u16) << 8) | self.r as u16);
                    *out |= Z80Pins::MREQ | Z80Pins::RFSH;
                    self.bump_r();
                    false
                }
                _ => true,
            },
            MCycle::Read => match self.t {
                0 => {
                    out.set_addr(self.bus_addr);
                    *out |= Z80Pins::MREQ | Z80Pins::RD;
                    false
                }
                1 => {
                    if wait {
                        return;
                    }
                    self.dlatch = pins.data();
                    false
                }
                _ => true,
            },
            MCycle::Write => match self.t {
                0 => {
                    out.set_addr_data(self.bus_addr, self.bus_data);
                    *out |= Z80Pins::MREQ;
                    false
                }
                1 => {
                    out.set_addr_data(self.bus_addr, self.bus_data);
                    if wait {
                        return;
                    }
                    *out |= Z80Pins::MREQ | Z80Pins::WR;
                    false
                }
                _ => true,
            },
            MCycle::In => match self.t {
                0 => {
                    out.set_addr(self.bus_addr);
                    false
                }
                1 => {
                    *out |= Z80Pins::IORQ | Z80Pins::RD;
                    false
                }
                2 => {
                    if wait {
                        return;
                    }
                    self.dlatch = pins.data();
                    false
                }
                _ => true,
            },
            MCycle::Out => match self.t {
                0 => {
                    out.set_addr_data(self.bus_addr, self.bus_data);
                    false
                }
                1 => {
                    out.set_addr_data(self.bus_addr, self.bus_data);
                    *out |= Z80Pins::IORQ | Z80Pins::WR;
                    false
                }
                2 => {
                    if wait {
                        return;
                    }
                    false
                }
                _ => true,
            },
            MCycle::Idle(n) => self.t + 1 >= n,
            MCycle::IntAck => match self.t {
                0 => {
                    out.set_addr(self.pc);
                    *out |= Z80Pins::M1;
                    if self.reti_out {
                        *out |= Z80Pins::RETI;
                        self.reti_out = false;
                    }
                    false
                }
                2 => {
                    *out |= Z80Pins::M1 | Z80Pins::IORQ;
                    false
                }
                3 => {
                    if wait {
                        return;
                    }
                    self.dlatch = pins.data();
                    false
                }
                4 => {
                    out.set_addr(((self.i as u16) << 8) | self.r as u16);
                    *out |= Z80Pins::MREQ | Z80Pins::RFSH;
                    self.bump_r();
                    false
                }
                1 => false,
                _ => true,
            },
        };

        if last {
            self.t = 0;
            self.advance();
        } else {
            self.t += 1;
        }
    }

    fn advance(&mut self) {
        match self.state {
            ExecState::Start => self.done(),
            ExecState::Fetch => self.decode(),
            _ => self.dispatch(),
        }
    }

    /// Decode the byte fetched by the M1 that just finished.
    fn decode(&mut self) {
        if self.insn_start {
            self.insn_start = false;
            self.prev_q = self.q;
            self.q = 0;
            self.p = false;
        }

        let op = self.opcode;
        match self.prefix {
            Prefix::CB => {
                self.prefix = Prefix::None;
                self.state = ExecState::ExecuteCB(op, 0);
                self.dispatch();
            }
            Prefix::ED => {
                self.prefix = Prefix::None;
                self.state = ExecState::ExecuteED(op, 0);
                self.dispatch();
            }
            Prefix::None => match op {
                0xDD => {
                    self.index_mode = IndexMode::IX;
                    self.fetch_next();
                }
                0xFD => {
                    self.index_mode = IndexMode::IY;
                    self.fetch_next();
                }
                0xED => {
                    self.index_mode = IndexMode::HL;
                    self.prefix = Prefix::ED;
                    self.fetch_next();
                }
                0xCB if self.index_mode != IndexMode::HL => {
                    self.state = ExecState::IndexCB(0);
                    self.dispatch();
                }
                0xCB => {
                    self.prefix = Prefix::CB;
                    self.fetch_next();
                }
                _ if self.index_mode != IndexMode::HL && Self::uses_index_operand(op) => {
                    self.state = ExecState::Displace(op, 0);
                    self.dispatch();
                }
                _ => {
                    self.state = ExecState::Execute(op, 0);
                    self.dispatch();
                }
            },
        }
    }

    /// Unprefixed opcodes whose (HL) operand becomes (IX+d)/(IY+d) under DD/FD
    /// with the usual displacement read plus 5 T address add. LD (HL),n reads
    /// its immediate in between and is handled by its own handler.
    fn uses_index_operand(op: u8) -> bool {
        match op {
            0x34 | 0x35 => true,
            0x76 => false,
            0x40..=0x7F => (op & 0x07) == 6 || (op & 0x38) == 0x30,
            _ => (op & 0xC7) == 0x86,
        }
    }

    fn dispatch(&mut self) {
        match self.state {
            ExecState::Execute(op, stage) => self.execute_instruction(op, stage),
            ExecState::ExecuteCB(op, stage) => self.execute_instruction_cb(op, stage),
            ExecState::ExecuteED(op, stage) => self.execute_instruction_ed(op, stage),
            ExecState::Displace(op, stage) => self.displace(op, stage),
            ExecState::IndexCB(stage) => self.index_cb_prefix(stage),
            ExecState::ExecuteIndexCB(op, stage) => self.execute_instruction_index_cb(op, stage),
            ExecState::Interrupt(kind, stage) => self.execute_interrupt(kind, stage),
            ExecState::Start => self.done(),
            ExecState::Fetch => self.decode(),
        }
    }

    /// DD/FD (IX+d) operand: displacement read, 5 T address computation, then
    /// the unprefixed handler runs against `temp_addr`.
    fn displace(&mut self, op: u8, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_addr = self.index_base().wrapping_add(self.dlatch as i8 as u16);
                self.memptr = self.temp_addr;
                self.idle(5);
            }
            _ => {
                self.state = ExecState::Execute(op, 0);
                self.execute_instruction(op, 0);
            }
        }
    }

    /// DD CB d op: displacement and sub-opcode come in as plain memory reads
    /// (no M1, no refresh), then 2 T for the address add.
    fn index_cb_prefix(&mut self, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_addr = self.index_base().wrapping_add(self.dlatch as i8 as u16);
                self.memptr = self.temp_addr;
                self.read_imm();
            }
            2 => {
                self.opcode = self.dlatch;
                self.idle(2);
            }
            _ => {
                self.state = ExecState::ExecuteIndexCB(self.opcode, 0);
                self.execute_instruction_index_cb(self.opcode, 0);
            }
        }
    }

    /// Interrupt response after the acknowledging cycle.
    /// NMI 11 T (5 T discarded fetch + 2 MW), IM0 6 T ack + the acknowledged
    /// opcode (RST = 13 T), IM1 13 T, IM2 19 T.
    fn execute_interrupt(&mut self, kind: u8, stage: u8) {
        match (kind, stage) {
            (INT_IM0, _) => {
                // The device put an opcode on the bus; execute it in place.
                self.opcode = self.dlatch;
                self.state = ExecState::Fetch;
                self.decode();
            }
            (INT_IM2, 0) => {
                self.temp_data = self.dlatch;
                self.idle(1);
            }
            (_, 0) => self.idle(1),
            (_, 1) => self.push_high(self.pc),
            (_, 2) => self.push_low(self.pc),
            (INT_NMI, _) => {
                self.pc = 0x0066;
                self.memptr = self.pc;
                self.done();
            }
            (INT_IM1, _) => {
                self.pc = 0x0038;
                self.memptr = self.pc;
                self.done();
            }
            (_, 3) => {
                self.temp_addr = ((self.i as u16) << 8) | self.temp_data as u16;
                self.mread(self.temp_addr);
            }
            (_, 4) => {
                self.temp_data = self.dlatch;
                self.mread(self.temp_addr.wrapping_add(1));
            }
            _ => {
                self.pc = ((self.dlatch as u16) << 8) | self.temp_data as u16;
                self.memptr = self.pc;
                self.done();
            }
        }
    }

    /// Unprefixed opcode dispatch. Stage 0 runs at the end of the opcode M1.
    fn execute_instruction(&mut self, opcode: u8, stage: u8) {
        match opcode {
            // NOP: 4 T
            0x00 => self.done(),

            // HALT: 4 T, then refresh cycles until an interrupt.
            0x76 => {
                self.halted = true;
                self.done();
            }

            // --- Load/Store ---
            0x02 | 0x12 => self.op_ld_rp_a(opcode, stage),
            0x0A | 0x1A => self.op_ld_a_rp(opcode, stage),
            0x22 => self.op_ld_nn_hl(stage),
            0x2A => self.op_ld_hl_nn_ind(stage),
            0x32 => self.op_ld_nn_a(stage),
            0x3A => self.op_ld_a_nn(stage),
            0x08 => self.op_ex_af_af(),
            op if (op & 0xCF) == 0x01 => self.op_ld_rr_nn(op, stage),
            op if (op & 0xC7) == 0x06 => self.op_ld_r_n(op, stage),
            op if (op & 0xC0) == 0x40 => self.op_ld_r_r(op, stage),
            0xF9 => self.op_ld_sp_hl(stage),
            0xEB => self.op_ex_de_hl(),
            0xD9 => self.op_exx(),
            0xDB => self.op_in_a_n(stage),
            0xD3 => self.op_out_n_a(stage),

            // --- Stack ---
            0xE3 => self.op_ex_sp_hl(stage),
            op if (op & 0xCF) == 0xC5 => self.op_push(op, stage),
            op if (op & 0xCF) == 0xC1 => self.op_pop(op, stage),

            // --- ALU ---
            op if (op & 0xC0) == 0x80 => self.op_alu_r(op, stage),
            op if (op & 0xC7) == 0xC6 => self.op_alu_n(op, stage),
            op if (op & 0xC6) == 0x04 => self.op_inc_dec_r(op, stage),
            op if (op & 0xCF) == 0x09 => self.op_add_hl_rr(op, stage),
            op if (op & 0xC7) == 0x03 => self.op_inc_dec_rr(op, stage),
            0x07 => self.op_rlca(),
            0x0F => self.op_rrca(),
            0x17 => self.op_rla(),
            0x1F => self.op_rra(),
            0x27 => self.op_daa(),
            0x2F => self.op_cpl(),
            0x37 => self.op_scf(),
            0x3F => self.op_ccf(),

            // --- Branch/Control Flow ---
            0xC3 => self.op_jp_nn(stage),
            0xE9 => self.op_jp_hl(),
            0x18 => self.op_jr_e(stage),
            0x10 => self.op_djnz(stage),
            0xCD => self.op_call_nn(stage),
            0xC9 => self.op_ret(stage),
            0xF3 => self.op_di(),
            0xFB => self.op_ei(),
            op if (op & 0xC7) == 0xC2 => self.op_jp_cc_nn(op, stage),
            op if (op & 0xE7) == 0x20 => self.op_jr_cc_e(op, stage),
            op if (op & 0xC7) == 0xC4 => self.op_call_cc_nn(op, stage),
            op if (op & 0xC7) == 0xC0 => self.op_ret_cc(op, stage),
            op if (op & 0xC7) == 0xC7 => self.op_rst(op, stage),

            // Prefix bytes are consumed by decode(); only an IM0 acknowledge
            // can route one here, where it acts as a NOP.
            _ => self.done(),
        }
    }

    /// ED prefix dispatch. Stage 0 runs at the end of the second M1 (8 T).
    fn execute_instruction_ed(&mut self, opcode: u8, stage: u8) {
        match opcode {
            0x47 => self.op_ld_i_a(stage),  // LD I,A: 9T
            0x4F => self.op_ld_r_a(stage),  // LD R,A: 9T
            0x57 => self.op_ld_a_i(stage),  // LD A,I: 9T
            0x5F => self.op_ld_a_r(stage),  // LD A,R: 9T
            0x67 => self.op_rrd(stage),     // RRD: 18T
            0x6F => self.op_rld(stage),     // RLD: 18T

            // --- Block transfer/compare/IO ---
            0xA0 | 0xA8 | 0xB0 | 0xB8 => self.op_ldi_ldd(opcode, stage),
            0xA1 | 0xA9 | 0xB1 | 0xB9 => self.op_cpi_cpd(opcode, stage),
            0xA2 | 0xAA | 0xB2 | 0xBA => self.op_ini_ind(opcode, stage),
            0xA3 | 0xAB | 0xB3 | 0xBB => self.op_outi_outd(opcode, stage),

            op if (op & 0xC7) == 0x40 => self.op_in_r_c(op, stage),   // IN r,(C): 12T
            op if (op & 0xC7) == 0x41 => self.op_out_c_r(op, stage),  // OUT (C),r: 12T
            op if (op & 0xCF) == 0x42 => self.op_sbc_hl_rr(op, stage), // SBC HL,rr: 15T
            op if (op & 0xCF) == 0x4A => self.op_adc_hl_rr(op, stage), // ADC HL,rr: 15T
            op if (op & 0xCF) == 0x43 => self.op_ld_nn_rr_ed(op, stage), // LD (nn),rr: 20T
            op if (op & 0xCF) == 0x4B => self.op_ld_rr_nn_ed(op, stage), // LD rr,(nn): 20T
            op if (op & 0xC7) == 0x44 => self.op_neg(),                // NEG: 8T
            op if (op & 0xC7) == 0x45 => self.op_retn(op, stage),      // RETN/RETI: 14T
            op if (op & 0xC7) == 0x46 => self.op_im(op),               // IM 0/1/2: 8T

            // ED NOP: 8T: undefined opcodes act as NOP
            _ => self.done(),
        }
    }
}

impl Cpu for Z80 {
    type Pins = Z80Pins;

    fn tick(&mut self, pins: Z80Pins) -> Z80Pins {
        self.opdone = false;

        let nmi = pins.contains(Z80Pins::NMI);
        if nmi && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = nmi;
        self.input = pins;

        let mut out = pins.bus_lines();
        if pins.contains(Z80Pins::RESET) {
            self.reset();
            return out;
        }
        // Bus request is honoured between machine cycles only.
        if self.t == 0 && pins.contains(Z80Pins::BUSRQ) {
            return out | Z80Pins::BUSAK;
        }
        if self.halted {
            out |= Z80Pins::HALT;
        }
        self.tick_cycle(pins, &mut out);
        out
    }

    fn opdone(&self) -> bool {
        self.opdone
    }

    fn reset(&mut self) {
        self.pc = 0x0000;
        self.a = 0xFF;
        self.f = 0xFF;
        self.sp = 0xFFFF;
        self.i = 0;
        self.r = 0;
        self.im = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.ei_delay = false;
        self.memptr = 0;
        self.index_mode = IndexMode::HL;
        self.prefix = Prefix::None;
        self.insn_start = true;
        self.nmi_pending = false;
        self.reti_out = false;
        self.state = ExecState::Start;
        self.mcycle = MCycle::Idle(RESET_TICKS);
        self.t = 0;
    }

    fn bus_pins(&self) -> Z80Pins {
        self.pins
    }

    fn set_bus_pins(&mut self, pins: Z80Pins) {
        self.pins = pins;
    }
}

impl CpuStateTrait for Z80 {
    type Snapshot = Z80State;

    fn snapshot(&self) -> Z80State {
        Z80State {
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a_prime: self.a_prime,
            f_prime: self.f_prime,
            b_prime: self.b_prime,
            c_prime: self.c_prime,
            d_prime: self.d_prime,
            e_prime: self.e_prime,
            h_prime: self.h_prime,
            l_prime: self.l_prime,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: self.r,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            memptr: self.memptr,
            halted: self.halted,
            p: self.p,
            q: self.q,
        }
    }
}
