use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// Perform CB rotate/shift operation on a value.
    /// op: 0=RLC, 1=RRC, 2=RL, 3=RR, 4=SLA, 5=SRA, 6=SLL(undoc), 7=SRL.
    /// Returns (result, new_flags). Flags: S, Z, PV(parity), C from shifted bit. H=0, N=0.
    fn do_cb_rotate_shift(&self, op: u8, val: u8) -> (u8, u8) {
        let old_c = self.f & Flag::C as u8;
        let (result, carry) = match op & 0x07 {
            0 => ((val << 1) | (val >> 7), val >> 7),         // RLC
            1 => ((val >> 1) | (val << 7), val & 1),          // RRC
            2 => ((val << 1) | old_c, val >> 7),              // RL
            3 => ((val >> 1) | (old_c << 7), val & 1),        // RR
            4 => (val << 1, val >> 7),                        // SLA
            5 => ((((val as i8) >> 1) as u8), val & 1),       // SRA
            6 => ((val << 1) | 1, val >> 7),                  // SLL
            _ => (val >> 1, val & 1),                         // SRL
        };

        let mut f = 0;
        if result == 0 {
            f |= Flag::Z as u8;
        }
        if (result & 0x80) != 0 {
            f |= Flag::S as u8;
        }
        if Self::get_parity(result) {
            f |= Flag::PV as u8;
        }
        if carry != 0 {
            f |= Flag::C as u8;
        }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        (result, f)
    }

    /// BIT b flags. `xy` supplies the undocumented X/Y bits, which come from a
    /// different source depending on the addressing mode.
    fn bit_flags(&mut self, bit: u8, val: u8, xy: u8) {
        let tested = val & (1 << bit);
        let mut f = self.f & Flag::C as u8; // preserve C
        f |= Flag::H as u8;
        if tested == 0 {
            f |= Flag::Z as u8;
            f |= Flag::PV as u8; // PV = Z for BIT
        }
        if bit == 7 && tested != 0 {
            f |= Flag::S as u8;
        }
        f |= xy & (Flag::X as u8 | Flag::Y as u8);
        self.set_f(f);
    }

    /// Rotate/shift/RES/SET on a value read from memory or a register.
    fn cb_modify(&mut self, xx: u8, yyy: u8, val: u8) -> u8 {
        match xx {
            0 => {
                let (r, f) = self.do_cb_rotate_shift(yyy, val);
                self.set_f(f);
                r
            }
            2 => val & !(1 << yyy),
            _ => val | (1 << yyy),
        }
    }

    /// Execute CB-prefixed instruction.
    /// CB r: 8T. BIT b,(HL): 12T. Rotate/shift/SET/RES (HL): 15T.
    pub(crate) fn execute_instruction_cb(&mut self, op: u8, stage: u8) {
        let xx = (op >> 6) & 0x03; // 0=rot/shift, 1=BIT, 2=RES, 3=SET
        let yyy = (op >> 3) & 0x07; // bit number or shift operation
        let zzz = op & 0x07; // register index

        if zzz != 6 {
            let val = self.get_reg8(zzz);
            if xx == 1 {
                // X/Y from the operand register value
                self.bit_flags(yyy, val, val);
            } else {
                let result = self.cb_modify(xx, yyy, val);
                self.set_reg8(zzz, result);
            }
            self.done();
            return;
        }

        match (xx, stage) {
            (_, 0) => {
                self.temp_addr = self.get_hl();
                self.mread(self.temp_addr);
            }
            (1, 1) => {
                // X/Y from high byte of MEMPTR for BIT (HL)
                self.bit_flags(yyy, self.dlatch, (self.memptr >> 8) as u8);
                self.idle(1);
            }
            (1, _) => self.done(),
            (_, 1) => {
                self.temp_data = self.cb_modify(xx, yyy, self.dlatch);
                self.idle(1);
            }
            (_, 2) => self.mwrite(self.temp_addr, self.temp_data),
            _ => self.done(),
        }
    }

    /// DD CB d op / FD CB d op. The address is already in `temp_addr`.
    /// BIT b,(IX+d): 20T. Others: 23T.
    /// For non-BIT ops with zzz != 6 the result is also copied to register zzz (undocumented).
    pub(crate) fn execute_instruction_index_cb(&mut self, op: u8, stage: u8) {
        let xx = (op >> 6) & 0x03;
        let yyy = (op >> 3) & 0x07;
        let zzz = op & 0x07;

        match (xx, stage) {
            (_, 0) => self.mread(self.temp_addr),
            (1, 1) => {
                // X/Y from high byte of address for indexed BIT
                self.bit_flags(yyy, self.dlatch, (self.temp_addr >> 8) as u8);
                self.idle(1);
            }
            (1, _) => self.done(),
            (_, 1) => {
                self.temp_data = self.cb_modify(xx, yyy, self.dlatch);
                if zzz != 6 {
                    self.set_reg8(zzz, self.temp_data);
                }
                self.idle(1);
            }
            (_, 2) => self.mwrite(self.temp_addr, self.temp_data),
            _ => self.done(),
        }
    }
}
