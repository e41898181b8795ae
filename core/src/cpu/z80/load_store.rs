use crate::cpu::z80::{Flag, IndexMode, Z80};

impl Z80 {
    /// LD r, n: 7 T: M1(4) + MR(3)
    /// LD (HL), n: 10 T: M1(4) + MR(3) + MW(3)
    /// LD (IX+d), n: 19 T: DD M1(4) + M1(4) + MR(3) + MR(3) + internal(2) + MW(3)
    /// Opcode mask: 00 rrr 110
    pub(crate) fn op_ld_r_n(&mut self, opcode: u8, stage: u8) {
        let r = (opcode >> 3) & 0x07;

        if r != 6 {
            match stage {
                0 => self.read_imm(),
                _ => {
                    self.set_reg8_ix(r, self.dlatch);
                    self.done();
                }
            }
            return;
        }

        if self.index_mode == IndexMode::HL {
            match stage {
                0 => self.read_imm(),
                1 => self.mwrite(self.get_hl(), self.dlatch),
                _ => self.done(),
            }
            return;
        }

        // The immediate byte follows the displacement, so the address add
        // overlaps the immediate read and only 2 T remain.
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_addr = self.index_base().wrapping_add(self.dlatch as i8 as u16);
                self.memptr = self.temp_addr;
                self.read_imm();
            }
            2 => {
                self.temp_data = self.dlatch;
                self.idle(2);
            }
            3 => self.mwrite(self.temp_addr, self.temp_data),
            _ => self.done(),
        }
    }

    /// LD r, r': 4 T: M1 only (register-register)
    /// LD r, (HL) / LD (HL), r: 7 T
    /// LD r, (IX+d) / LD (IX+d), r: 19 T (address from the displacement prelude)
    /// Opcode mask: 01 dst src
    pub(crate) fn op_ld_r_r(&mut self, opcode: u8, stage: u8) {
        let src = opcode & 0x07;
        let dst = (opcode >> 3) & 0x07;

        if src == 6 {
            // Indexed form loads H/L, never IXH/IXL.
            match stage {
                0 => self.mread(self.operand_addr()),
                _ => {
                    self.set_reg8(dst, self.dlatch);
                    self.done();
                }
            }
        } else if dst == 6 {
            match stage {
                0 => self.mwrite(self.operand_addr(), self.get_reg8(src)),
                _ => self.done(),
            }
        } else {
            let val = self.get_reg8_ix(src);
            self.set_reg8_ix(dst, val);
            self.done();
        }
    }

    /// LD rr, nn: 10 T: M1(4) + MR(3) + MR(3)
    /// Opcode mask: 00 rr0 001
    pub(crate) fn op_ld_rr_nn(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_data = self.dlatch;
                self.read_imm();
            }
            _ => {
                let val = self.latched_word();
                self.set_rp((opcode >> 4) & 0x03, val);
                self.done();
            }
        }
    }

    /// LD A, (BC) / LD A, (DE): 7 T: M1(4) + MR(3)
    pub(crate) fn op_ld_a_rp(&mut self, opcode: u8, stage: u8) {
        let addr = if opcode == 0x0A { self.get_bc() } else { self.get_de() };
        match stage {
            0 => {
                self.memptr = addr.wrapping_add(1);
                self.mread(addr);
            }
            _ => {
                self.a = self.dlatch;
                self.done();
            }
        }
    }

    /// LD (BC), A / LD (DE), A: 7 T: M1(4) + MW(3)
    /// MEMPTR = A:(addr+1 low byte)
    pub(crate) fn op_ld_rp_a(&mut self, opcode: u8, stage: u8) {
        let addr = if opcode == 0x02 { self.get_bc() } else { self.get_de() };
        match stage {
            0 => {
                self.memptr = ((self.a as u16) << 8) | (addr.wrapping_add(1) & 0x00FF);
                self.mwrite(addr, self.a);
            }
            _ => self.done(),
        }
    }

    /// Stages 0-1 of every `op (nn)` form: fetch the 16-bit address into `temp_addr`.
    /// Returns true once the address is available.
    fn fetch_abs_addr(&mut self, stage: u8) -> bool {
        match stage {
            0 => {
                self.read_imm();
                false
            }
            1 => {
                self.temp_data = self.dlatch;
                self.read_imm();
                false
            }
            2 => {
                self.temp_addr = self.latched_word();
                true
            }
            _ => true,
        }
    }

    /// LD A, (nn): 13 T: M1(4) + MR(3) + MR(3) + MR(3)
    pub(crate) fn op_ld_a_nn(&mut self, stage: u8) {
        if !self.fetch_abs_addr(stage) {
            return;
        }
        match stage {
            2 => {
                self.memptr = self.temp_addr.wrapping_add(1);
                self.mread(self.temp_addr);
            }
            _ => {
                self.a = self.dlatch;
                self.done();
            }
        }
    }

    /// LD (nn), A: 13 T: M1(4) + MR(3) + MR(3) + MW(3)
    pub(crate) fn op_ld_nn_a(&mut self, stage: u8) {
        if !self.fetch_abs_addr(stage) {
            return;
        }
        match stage {
            2 => {
                self.memptr = ((self.a as u16) << 8) | (self.temp_addr.wrapping_add(1) & 0x00FF);
                self.mwrite(self.temp_addr, self.a);
            }
            _ => self.done(),
        }
    }

    /// LD SP, HL: 6 T: M1(4) + internal(2). Also LD SP,IX/IY.
    pub(crate) fn op_ld_sp_hl(&mut self, stage: u8) {
        match stage {
            0 => {
                self.sp = self.index_base();
                self.idle(2);
            }
            _ => self.done(),
        }
    }

    /// Store a register pair to (nn): low byte then high byte.
    fn store_word(&mut self, val: u16, stage: u8) {
        match stage {
            2 => {
                self.memptr = self.temp_addr.wrapping_add(1);
                self.mwrite(self.temp_addr, val as u8);
            }
            3 => self.mwrite(self.temp_addr.wrapping_add(1), (val >> 8) as u8),
            _ => self.done(),
        }
    }

    /// Load a register pair from (nn). Returns the word on the final stage.
    fn load_word(&mut self, stage: u8) -> Option<u16> {
        match stage {
            2 => {
                self.memptr = self.temp_addr.wrapping_add(1);
                self.mread(self.temp_addr);
                None
            }
            3 => {
                self.temp_data = self.dlatch;
                self.mread(self.temp_addr.wrapping_add(1));
                None
            }
            _ => Some(self.latched_word()),
        }
    }

    /// LD (nn), HL: 16 T: M1(4) + MR(3) + MR(3) + MW(3) + MW(3). Also IX/IY.
    pub(crate) fn op_ld_nn_hl(&mut self, stage: u8) {
        if self.fetch_abs_addr(stage) {
            let val = self.get_rp(2);
            self.store_word(val, stage);
        }
    }

    /// LD HL, (nn): 16 T: M1(4) + MR(3) + MR(3) + MR(3) + MR(3). Also IX/IY.
    pub(crate) fn op_ld_hl_nn_ind(&mut self, stage: u8) {
        if self.fetch_abs_addr(stage) {
            if let Some(val) = self.load_word(stage) {
                self.set_rp(2, val);
                self.done();
            }
        }
    }

    /// LD (nn), rr: 20T (ED prefix)
    pub(crate) fn op_ld_nn_rr_ed(&mut self, opcode: u8, stage: u8) {
        if self.fetch_abs_addr(stage) {
            let val = self.get_rp((opcode >> 4) & 0x03);
            self.store_word(val, stage);
        }
    }

    /// LD rr, (nn): 20T (ED prefix)
    pub(crate) fn op_ld_rr_nn_ed(&mut self, opcode: u8, stage: u8) {
        if self.fetch_abs_addr(stage) {
            if let Some(val) = self.load_word(stage) {
                self.set_rp((opcode >> 4) & 0x03, val);
                self.done();
            }
        }
    }

    /// EX AF, AF': 4 T: M1 only
    pub(crate) fn op_ex_af_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.a_prime);
        std::mem::swap(&mut self.f, &mut self.f_prime);
        self.done();
    }

    /// EXX: 4 T: M1 only. Swap BC, DE, HL with shadow registers.
    pub(crate) fn op_exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b_prime);
        std::mem::swap(&mut self.c, &mut self.c_prime);
        std::mem::swap(&mut self.d, &mut self.d_prime);
        std::mem::swap(&mut self.e, &mut self.e_prime);
        std::mem::swap(&mut self.h, &mut self.h_prime);
        std::mem::swap(&mut self.l, &mut self.l_prime);
        self.done();
    }

    /// EX DE, HL: 4 T: M1 only (NOT affected by DD/FD prefix)
    pub(crate) fn op_ex_de_hl(&mut self) {
        std::mem::swap(&mut self.d, &mut self.h);
        std::mem::swap(&mut self.e, &mut self.l);
        self.done();
    }

    /// EX (SP), HL: 19 T: M1(4) + MR(3) + MR(4) + MW(3) + MW(5). Also IX/IY.
    pub(crate) fn op_ex_sp_hl(&mut self, stage: u8) {
        match stage {
            0 => self.mread(self.sp),
            1 => {
                self.temp_data = self.dlatch;
                self.mread(self.sp.wrapping_add(1));
            }
            2 => {
                self.temp_addr = self.latched_word();
                self.idle(1);
            }
            3 => {
                let hl = self.get_rp(2);
                self.mwrite(self.sp.wrapping_add(1), (hl >> 8) as u8);
            }
            4 => {
                let hl = self.get_rp(2);
                self.mwrite(self.sp, hl as u8);
            }
            5 => {
                self.set_rp(2, self.temp_addr);
                self.memptr = self.temp_addr;
                self.idle(2);
            }
            _ => self.done(),
        }
    }

    // --- I/O ---

    /// IN A, (n): 11 T: M1(4) + MR(3) + IO(4). Port = A:n.
    pub(crate) fn op_in_a_n(&mut self, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                let port = ((self.a as u16) << 8) | self.dlatch as u16;
                self.memptr = port.wrapping_add(1);
                self.ioread(port);
            }
            _ => {
                self.a = self.dlatch;
                self.done();
            }
        }
    }

    /// OUT (n), A: 11 T: M1(4) + MR(3) + IO(4). Port = A:n.
    pub(crate) fn op_out_n_a(&mut self, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                let n = self.dlatch;
                let port = ((self.a as u16) << 8) | n as u16;
                self.memptr = ((self.a as u16) << 8) | n.wrapping_add(1) as u16;
                self.iowrite(port, self.a);
            }
            _ => self.done(),
        }
    }

    /// IN r,(C): 12T (ED prefix): M1(4) + M1(4) + IO(4)
    /// Flags: S, Z, PV(parity) from input, H=0, N=0, C preserved. X/Y from input.
    /// For r=6 (IN F,(C)): flags affected but value not stored.
    pub(crate) fn op_in_r_c(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                self.memptr = self.get_bc().wrapping_add(1);
                self.ioread(self.get_bc());
            }
            _ => {
                let val = self.dlatch;
                let r = (opcode >> 3) & 0x07;
                if r != 6 {
                    self.set_reg8(r, val);
                }
                self.set_in_flags(val);
                self.done();
            }
        }
    }

    /// OUT (C),r: 12T (ED prefix): M1(4) + M1(4) + IO(4). No flag changes.
    /// For r=6: outputs 0 (undocumented).
    pub(crate) fn op_out_c_r(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                let r = (opcode >> 3) & 0x07;
                let val = if r == 6 { 0 } else { self.get_reg8(r) };
                self.memptr = self.get_bc().wrapping_add(1);
                self.iowrite(self.get_bc(), val);
            }
            _ => self.done(),
        }
    }

    // --- ED Load/Store Operations ---

    /// LD I,A: 9T (ED prefix): M1(4) + M1(5)
    pub(crate) fn op_ld_i_a(&mut self, stage: u8) {
        match stage {
            0 => {
                self.i = self.a;
                self.idle(1);
            }
            _ => self.done(),
        }
    }

    /// LD R,A: 9T (ED prefix)
    pub(crate) fn op_ld_r_a(&mut self, stage: u8) {
        match stage {
            0 => {
                self.r = self.a;
                self.idle(1);
            }
            _ => self.done(),
        }
    }

    /// LD A,I: 9T (ED prefix).
    /// Flags: S, Z from I, H=0, N=0, PV=IFF2, C preserved, X/Y from I.
    pub(crate) fn op_ld_a_i(&mut self, stage: u8) {
        match stage {
            0 => {
                self.a = self.i;
                self.set_ld_air_flags();
                self.idle(1);
            }
            _ => self.done(),
        }
    }

    /// LD A,R: 9T (ED prefix).
    pub(crate) fn op_ld_a_r(&mut self, stage: u8) {
        match stage {
            0 => {
                self.a = self.r;
                self.set_ld_air_flags();
                self.idle(1);
            }
            _ => self.done(),
        }
    }

    /// RLD/RRD tail: S, Z, PV from A, H=0, N=0, C preserved.
    fn set_rxd_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 { f |= Flag::Z as u8; }
        if (self.a & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(self.a) { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    /// RLD: 18T (ED prefix): M1(4) + M1(4) + MR(3) + internal(4) + MW(3)
    /// A low nibble → (HL) low, (HL) low → (HL) high, (HL) high → A low.
    pub(crate) fn op_rld(&mut self, stage: u8) {
        match stage {
            0 => self.mread(self.get_hl()),
            1 => {
                let m = self.dlatch;
                self.temp_data = (m << 4) | (self.a & 0x0F);
                self.a = (self.a & 0xF0) | (m >> 4);
                self.set_rxd_flags();
                self.idle(4);
            }
            2 => {
                self.memptr = self.get_hl().wrapping_add(1);
                self.mwrite(self.get_hl(), self.temp_data);
            }
            _ => self.done(),
        }
    }

    /// RRD: 18T (ED prefix)
    /// A low nibble → (HL) high, (HL) high → (HL) low, (HL) low → A low.
    pub(crate) fn op_rrd(&mut self, stage: u8) {
        match stage {
            0 => self.mread(self.get_hl()),
            1 => {
                let m = self.dlatch;
                self.temp_data = (self.a << 4) | (m >> 4);
                self.a = (self.a & 0xF0) | (m & 0x0F);
                self.set_rxd_flags();
                self.idle(4);
            }
            2 => {
                self.memptr = self.get_hl().wrapping_add(1);
                self.mwrite(self.get_hl(), self.temp_data);
            }
            _ => self.done(),
        }
    }
}
