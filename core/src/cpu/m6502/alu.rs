use super::{M6502, StatusFlag};

impl M6502 {
    // ---- Flag helpers ----

    /// Set N, Z flags from result (for loads, transfers, logical ops).
    #[inline]
    pub(crate) fn set_nz(&mut self, result: u8) {
        self.set_flag(StatusFlag::N, result & 0x80 != 0);
        self.set_flag(StatusFlag::Z, result == 0);
    }

    /// Set N, Z, C flags for shift/rotate operations.
    #[inline]
    pub(crate) fn set_flags_shift(&mut self, result: u8, carry: bool) {
        self.set_flag(StatusFlag::N, result & 0x80 != 0);
        self.set_flag(StatusFlag::Z, result == 0);
        self.set_flag(StatusFlag::C, carry);
    }

    #[inline]
    fn carry_in(&self) -> u8 {
        self.p & StatusFlag::C as u8
    }

    #[inline]
    fn decimal(&self) -> bool {
        self.bcd_enabled && self.flag(StatusFlag::D)
    }

    // ---- ALU operation helpers ----

    /// Perform ADC (Add with Carry). Sets N, Z, C, V. Handles BCD mode.
    /// Binary: A = A + M + C
    /// BCD: A = BCD(A + M + C). N,V from intermediate; Z from binary; C from BCD.
    pub(crate) fn perform_adc(&mut self, operand: u8) {
        let a = self.a;
        let c = self.carry_in();

        if self.decimal() {
            // NMOS 6502 decimal mode ADC
            let mut al = (a & 0x0F) as u16 + (operand & 0x0F) as u16 + c as u16;
            if al >= 0x0A {
                al = ((al + 0x06) & 0x0F) + 0x10;
            }
            let mut sum = (a as u16 & 0xF0) + (operand as u16 & 0xF0) + al;

            // N, V from intermediate (before high nibble BCD correction)
            self.set_flag(StatusFlag::N, sum & 0x80 != 0);
            self.set_flag(
                StatusFlag::V,
                (!(a as u16 ^ operand as u16) & (a as u16 ^ sum)) & 0x80 != 0,
            );

            if sum >= 0xA0 {
                sum += 0x60;
            }
            self.set_flag(StatusFlag::C, sum >= 0x100);

            // Z from binary result (NMOS quirk)
            let binary = a as u16 + operand as u16 + c as u16;
            self.set_flag(StatusFlag::Z, (binary & 0xFF) == 0);

            self.a = sum as u8;
        } else {
            let sum = a as u16 + operand as u16 + c as u16;
            let result = sum as u8;
            self.set_flag(StatusFlag::C, sum > 0xFF);
            self.set_flag(StatusFlag::V, ((!(a ^ operand)) & (a ^ result)) & 0x80 != 0);
            self.a = result;
            self.set_nz(result);
        }
    }

    /// Perform SBC (Subtract with Carry/Borrow). Sets N, Z, C, V. Handles BCD mode.
    /// Binary: A = A - M - !C (equivalently A + ~M + C)
    /// BCD: All flags from binary result (NMOS quirk); only A gets BCD correction.
    pub(crate) fn perform_sbc(&mut self, operand: u8) {
        let a = self.a;
        let c = self.carry_in();

        let diff = a as u16 + (operand ^ 0xFF) as u16 + c as u16;
        let result = diff as u8;

        self.set_flag(StatusFlag::C, diff > 0xFF);
        self.set_flag(StatusFlag::V, ((a ^ operand) & (a ^ result)) & 0x80 != 0);
        self.set_nz(result);

        if self.decimal() {
            let borrow = 1 - c;
            let mut lo = (a & 0x0F) as i16 - (operand & 0x0F) as i16 - borrow as i16;
            let lo_borrow = lo < 0;
            if lo < 0 {
                lo -= 6;
            }
            let mut hi = (a >> 4) as i16 - (operand >> 4) as i16 - lo_borrow as i16;
            if hi < 0 {
                hi -= 6;
            }
            self.a = ((hi as u8 & 0x0F) << 4) | (lo as u8 & 0x0F);
        } else {
            self.a = result;
        }
    }

    /// Perform compare (CMP/CPX/CPY). Sets N, Z, C. Does not affect V or any register.
    #[inline]
    pub(crate) fn perform_compare(&mut self, register: u8, operand: u8) {
        let result = register.wrapping_sub(operand);
        self.set_flag(StatusFlag::C, register >= operand);
        self.set_nz(result);
    }

    #[inline]
    pub(crate) fn perform_and(&mut self, operand: u8) {
        self.a &= operand;
        self.set_nz(self.a);
    }

    #[inline]
    pub(crate) fn perform_ora(&mut self, operand: u8) {
        self.a |= operand;
        self.set_nz(self.a);
    }

    #[inline]
    pub(crate) fn perform_eor(&mut self, operand: u8) {
        self.a ^= operand;
        self.set_nz(self.a);
    }

    /// Perform BIT test. N = M bit 7, V = M bit 6, Z = (A & M) == 0. A is not modified.
    #[inline]
    pub(crate) fn perform_bit(&mut self, operand: u8) {
        self.set_flag(StatusFlag::N, operand & 0x80 != 0);
        self.set_flag(StatusFlag::V, operand & 0x40 != 0);
        self.set_flag(StatusFlag::Z, (self.a & operand) == 0);
    }

    /// Operand handler for the read-type ALU opcodes.
    pub(crate) fn alu_fn(opcode: u8) -> fn(&mut Self, u8) {
        match opcode {
            0x24 | 0x2C => Self::perform_bit,
            0xE0 | 0xE4 | 0xEC => |c, v| c.perform_compare(c.x, v),
            0xC0 | 0xC4 | 0xCC => |c, v| c.perform_compare(c.y, v),
            op => match op >> 5 {
                0 => Self::perform_ora,
                1 => Self::perform_and,
                2 => Self::perform_eor,
                3 => Self::perform_adc,
                6 => |c, v| c.perform_compare(c.a, v),
                _ => Self::perform_sbc,
            },
        }
    }

    // ---- Undocumented immediate operations ----

    /// ANC: AND, then C = N.
    pub(crate) fn perform_anc(&mut self, operand: u8) {
        self.perform_and(operand);
        self.set_flag(StatusFlag::C, self.a & 0x80 != 0);
    }

    /// ALR: AND, then LSR A.
    pub(crate) fn perform_alr(&mut self, operand: u8) {
        let val = self.a & operand;
        self.a = self.perform_lsr(val);
    }

    /// ARR: AND, then ROR A with C from bit 6 and V from bit 6 ^ bit 5.
    /// Decimal mode applies the NMOS nibble fix-ups.
    pub(crate) fn perform_arr(&mut self, operand: u8) {
        let and = self.a & operand;
        let carry = self.carry_in();
        let result = (and >> 1) | (carry << 7);

        if self.decimal() {
            self.set_flag(StatusFlag::N, carry != 0);
            self.set_flag(StatusFlag::Z, result == 0);
            self.set_flag(StatusFlag::V, (and ^ result) & 0x40 != 0);
            let mut res = result;
            if (and & 0x0F) + (and & 0x01) > 0x05 {
                res = (res & 0xF0) | (res.wrapping_add(0x06) & 0x0F);
            }
            let high_fix = (and as u16 & 0xF0) + (and as u16 & 0x10) > 0x50;
            if high_fix {
                res = res.wrapping_add(0x60);
            }
            self.set_flag(StatusFlag::C, high_fix);
            self.a = res;
        } else {
            self.a = result;
            self.set_nz(result);
            self.set_flag(StatusFlag::C, result & 0x40 != 0);
            self.set_flag(StatusFlag::V, ((result >> 6) ^ (result >> 5)) & 0x01 != 0);
        }
    }

    /// SBX (AXS): X = (A & X) - M, C as in CMP, V unaffected.
    pub(crate) fn perform_sbx(&mut self, operand: u8) {
        let ax = self.a & self.x;
        self.set_flag(StatusFlag::C, ax >= operand);
        self.x = ax.wrapping_sub(operand);
        self.set_nz(self.x);
    }

    /// ANE (XAA): unstable, modelled with the common 0xEE magic constant.
    pub(crate) fn perform_ane(&mut self, operand: u8) {
        self.a = (self.a | 0xEE) & self.x & operand;
        self.set_nz(self.a);
    }

    /// LXA: unstable, modelled with the common 0xEE magic constant.
    pub(crate) fn perform_lxa(&mut self, operand: u8) {
        let val = (self.a | 0xEE) & operand;
        self.a = val;
        self.x = val;
        self.set_nz(val);
    }
}
