use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    /// Store a new flag value. Q mirrors F for instructions that touch the
    /// flags; SCF/CCF read it back on the next instruction.
    pub(crate) fn set_f(&mut self, f: u8) {
        self.f = f;
        self.q = f;
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if is_and { f |= Flag::H as u8; } // AND sets H, others clear it
        // N is 0, C is 0

        // Undocumented X/Y
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16) + (val as u16) + (c_val as u16);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if ((a & 0xF) + (val & 0xF) + (c_val as u8)) > 0xF { f |= Flag::H as u8; }
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.set_f(f);
    }

    fn do_sub(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16).wrapping_sub(val as u16).wrapping_sub(c_val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0xF) < ((val & 0xF) + (c_val as u8)) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.set_f(f);
    }

    pub(crate) fn do_cp(&mut self, val: u8) {
        let a = self.a;
        let result_u16 = (a as u16).wrapping_sub(val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0xF) < (val & 0xF) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        // X/Y come from the operand for CP, not the result
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op & 0x07 {
            0 => self.do_add(val, false), // ADD
            1 => self.do_add(val, true),  // ADC
            2 => self.do_sub(val, false), // SUB
            3 => self.do_sub(val, true),  // SBC
            4 => { self.a &= val; self.update_flags_logic(self.a, true); }, // AND
            5 => { self.a ^= val; self.update_flags_logic(self.a, false); }, // XOR
            6 => { self.a |= val; self.update_flags_logic(self.a, false); }, // OR
            _ => self.do_cp(val),         // CP
        }
    }

    /// Flags for IN r,(C) and the undocumented IN (C): S/Z/PV from the value,
    /// H and N cleared, C preserved.
    pub(crate) fn set_in_flags(&mut self, val: u8) {
        let mut f = self.f & Flag::C as u8;
        if val == 0 { f |= Flag::Z as u8; }
        if (val & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(val) { f |= Flag::PV as u8; }
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    /// Flags shared by LD A,I and LD A,R: PV reflects IFF2.
    pub(crate) fn set_ld_air_flags(&mut self) {
        let mut f = self.f & Flag::C as u8;
        if self.a == 0 { f |= Flag::Z as u8; }
        if (self.a & 0x80) != 0 { f |= Flag::S as u8; }
        if self.iff2 { f |= Flag::PV as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        self.p = true;
    }

    // --- Instructions ---

    /// ALU A, r: 4 T (reg), 7 T ((HL)) or 19 T ((IX+d))
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP
    /// Opcode mask: 10 xxx zzz
    pub(crate) fn op_alu_r(&mut self, opcode: u8, stage: u8) {
        let alu_op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            match stage {
                0 => self.mread(self.operand_addr()),
                _ => {
                    self.perform_alu_op(alu_op, self.dlatch);
                    self.done();
                }
            }
        } else {
            let val = self.get_reg8_ix(r);
            self.perform_alu_op(alu_op, val);
            self.done();
        }
    }

    /// ALU A, n: 7 T: M1(4) + MR(3)
    /// Opcode mask: 11 xxx 110
    pub(crate) fn op_alu_n(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.read_imm(),
            _ => {
                self.perform_alu_op((opcode >> 3) & 0x07, self.dlatch);
                self.done();
            }
        }
    }

    /// INC/DEC r: 4 T (reg), 11 T ((HL)) or 23 T ((IX+d))
    /// Opcode mask: 00 rrr 10x
    pub(crate) fn op_inc_dec_r(&mut self, opcode: u8, stage: u8) {
        let r = (opcode >> 3) & 0x07;
        let is_dec = (opcode & 0x01) != 0;

        if r == 6 {
            // MR(3) + internal(1) + MW(3)
            match stage {
                0 => {
                    self.temp_addr = self.operand_addr();
                    self.mread(self.temp_addr);
                }
                1 => {
                    self.temp_data = if is_dec {
                        self.calc_dec_flags(self.dlatch)
                    } else {
                        self.calc_inc_flags(self.dlatch)
                    };
                    self.idle(1);
                }
                2 => self.mwrite(self.temp_addr, self.temp_data),
                _ => self.done(),
            }
        } else {
            let val = self.get_reg8_ix(r);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            self.set_reg8_ix(r, result);
            self.done();
        }
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8; // Preserve C
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0xF { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; } // Overflow 7F -> 80
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8; // Preserve C, Set N
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0x0 { f |= Flag::H as u8; } // Borrow from bit 4
        if val == 0x80 { f |= Flag::PV as u8; } // Overflow 80 -> 7F
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        result
    }

    // --- 16-bit ALU ---

    /// ADD HL,rr: 11 T: M1(4) + internal(7)
    /// Opcode mask: 00 rr1 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=SP)
    /// Flags: H = carry from bit 11, C = carry from bit 15, N = 0.
    /// S, Z, PV preserved. X/Y from high byte of result.
    pub(crate) fn op_add_hl_rr(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                let rp = (opcode >> 4) & 0x03;
                let hl = self.get_rp(2);
                let rr = self.get_rp(rp);
                let result = (hl as u32) + (rr as u32);
                self.memptr = hl.wrapping_add(1);

                let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
                if ((hl & 0x0FFF) + (rr & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                f |= ((result >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
                self.set_f(f);
                self.set_rp(2, result as u16);
                self.idle(7);
            }
            _ => self.done(),
        }
    }

    /// ADC HL,rr: 15 T: M1(4) + M1(4) + internal(7)
    /// Full 16-bit flags: S/Z from the result, H from bit 11, PV overflow.
    pub(crate) fn op_adc_hl_rr(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                let rp = (opcode >> 4) & 0x03;
                let hl = self.get_hl();
                let rr = self.get_rp(rp);
                let carry = (self.f & Flag::C as u8) as u32;
                let result = hl as u32 + rr as u32 + carry;
                let res16 = result as u16;
                self.memptr = hl.wrapping_add(1);

                let mut f = 0;
                if res16 == 0 { f |= Flag::Z as u8; }
                if (res16 & 0x8000) != 0 { f |= Flag::S as u8; }
                if ((hl & 0x0FFF) as u32 + (rr & 0x0FFF) as u32 + carry) > 0x0FFF { f |= Flag::H as u8; }
                if ((hl ^ res16) & (rr ^ res16) & 0x8000) != 0 { f |= Flag::PV as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                f |= ((res16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
                self.set_f(f);
                self.set_hl(res16);
                self.idle(7);
            }
            _ => self.done(),
        }
    }

    /// SBC HL,rr: 15 T: M1(4) + M1(4) + internal(7)
    pub(crate) fn op_sbc_hl_rr(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                let rp = (opcode >> 4) & 0x03;
                let hl = self.get_hl();
                let rr = self.get_rp(rp);
                let carry = (self.f & Flag::C as u8) as u32;
                let result = (hl as u32).wrapping_sub(rr as u32).wrapping_sub(carry);
                let res16 = result as u16;
                self.memptr = hl.wrapping_add(1);

                let mut f = Flag::N as u8;
                if res16 == 0 { f |= Flag::Z as u8; }
                if (res16 & 0x8000) != 0 { f |= Flag::S as u8; }
                if ((hl & 0x0FFF) as u32) < ((rr & 0x0FFF) as u32 + carry) { f |= Flag::H as u8; }
                if ((hl ^ rr) & (hl ^ res16) & 0x8000) != 0 { f |= Flag::PV as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                f |= ((res16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
                self.set_f(f);
                self.set_hl(res16);
                self.idle(7);
            }
            _ => self.done(),
        }
    }

    /// INC rr / DEC rr: 6 T: M1(4) + internal(2)
    /// INC: 00 rr0 011, DEC: 00 rr1 011. No flags affected.
    pub(crate) fn op_inc_dec_rr(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => {
                let rp = (opcode >> 4) & 0x03;
                let val = self.get_rp(rp);
                let is_dec = (opcode & 0x08) != 0;
                let result = if is_dec { val.wrapping_sub(1) } else { val.wrapping_add(1) };
                self.set_rp(rp, result);
                self.idle(2);
            }
            _ => self.done(),
        }
    }

    // --- Accumulator Rotates ---

    /// Shared tail of the four accumulator rotates: C from `carry`,
    /// H = N = 0, X/Y from A, S/Z/PV preserved.
    fn finish_acc_rotate(&mut self, carry: bool) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        self.done();
    }

    /// RLCA: 4 T: M1 only.
    /// Rotate A left circular. Old bit 7 to carry and bit 0.
    pub(crate) fn op_rlca(&mut self) {
        let bit7 = (self.a >> 7) & 1;
        self.a = (self.a << 1) | bit7;
        self.finish_acc_rotate(bit7 != 0);
    }

    /// RRCA: 4 T: M1 only.
    pub(crate) fn op_rrca(&mut self) {
        let bit0 = self.a & 1;
        self.a = (self.a >> 1) | (bit0 << 7);
        self.finish_acc_rotate(bit0 != 0);
    }

    /// RLA: 4 T: M1 only.
    /// Rotate A left through carry. Old bit 7 to C, old C to bit 0.
    pub(crate) fn op_rla(&mut self) {
        let old_carry = self.f & Flag::C as u8;
        let bit7 = (self.a >> 7) & 1;
        self.a = (self.a << 1) | old_carry;
        self.finish_acc_rotate(bit7 != 0);
    }

    /// RRA: 4 T: M1 only.
    pub(crate) fn op_rra(&mut self) {
        let old_carry = if (self.f & Flag::C as u8) != 0 { 0x80u8 } else { 0 };
        let bit0 = self.a & 1;
        self.a = (self.a >> 1) | old_carry;
        self.finish_acc_rotate(bit0 != 0);
    }

    // --- Misc ALU ---

    /// DAA: 4 T: M1 only.
    /// Decimal adjust accumulator after BCD add/sub.
    pub(crate) fn op_daa(&mut self) {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let old_h = (self.f & Flag::H as u8) != 0;
        let old_c = (self.f & Flag::C as u8) != 0;

        let mut correction = 0u8;
        let mut new_c = old_c;

        if old_h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if old_c || a > 0x99 {
            correction |= 0x60;
            new_c = true;
        }

        let result = if n {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };

        let new_h = if n {
            old_h && (a & 0x0F) < 6
        } else {
            (a & 0x0F) > 9
        };

        self.a = result;
        let mut f = 0;
        if new_c { f |= Flag::C as u8; }
        if n { f |= Flag::N as u8; }
        if new_h { f |= Flag::H as u8; }
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        self.done();
    }

    /// CPL: 4 T: M1 only.
    /// Complement A. Sets H and N. X/Y from A. S, Z, PV, C preserved.
    pub(crate) fn op_cpl(&mut self) {
        self.a = !self.a;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
        self.done();
    }

    /// NEG: 8 T: M1(4) + M1(4). A = 0 - A with SUB flags.
    pub(crate) fn op_neg(&mut self) {
        let val = self.a;
        self.a = 0;
        self.do_sub(val, false);
        self.done();
    }

    /// X/Y for SCF/CCF: taken from A when the previous instruction left the
    /// flags alone, otherwise OR-ed with the current F.
    fn scf_ccf_xy(&self) -> u8 {
        ((self.prev_q ^ self.f) | self.a) & (Flag::X as u8 | Flag::Y as u8)
    }

    /// SCF: 4 T: M1 only.
    /// Set carry flag. C = 1, H = 0, N = 0. S, Z, PV preserved.
    pub(crate) fn op_scf(&mut self) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= self.scf_ccf_xy();
        self.set_f(f);
        self.done();
    }

    /// CCF: 4 T: M1 only.
    /// Complement carry flag. H = old C, C = ~C, N = 0. S, Z, PV preserved.
    pub(crate) fn op_ccf(&mut self) {
        let old_c = self.f & Flag::C as u8;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c != 0 { f |= Flag::H as u8; } else { f |= Flag::C as u8; }
        f |= self.scf_ccf_xy();
        self.set_f(f);
        self.done();
    }
}
