use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// Evaluate a condition code (3 bits from opcode bits 5-3).
    /// 0=NZ, 1=Z, 2=NC, 3=C, 4=PO, 5=PE, 6=P, 7=M
    pub(crate) fn eval_condition(&self, cc: u8) -> bool {
        match cc & 0x07 {
            0 => (self.f & Flag::Z as u8) == 0,  // NZ
            1 => (self.f & Flag::Z as u8) != 0,  // Z
            2 => (self.f & Flag::C as u8) == 0,  // NC
            3 => (self.f & Flag::C as u8) != 0,  // C
            4 => (self.f & Flag::PV as u8) == 0, // PO (parity odd)
            5 => (self.f & Flag::PV as u8) != 0, // PE (parity even)
            6 => (self.f & Flag::S as u8) == 0,  // P (positive)
            _ => (self.f & Flag::S as u8) != 0,  // M (minus)
        }
    }

    /// Address assembled from the low byte in `temp_data` and the high byte
    /// just latched.
    pub(crate) fn latched_word(&self) -> u16 {
        ((self.dlatch as u16) << 8) | self.temp_data as u16
    }

    /// JP nn: 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_jp_nn(&mut self, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_data = self.dlatch;
                self.read_imm();
            }
            _ => {
                self.memptr = self.latched_word();
                self.pc = self.memptr;
                self.done();
            }
        }
    }

    /// JP cc,nn: 10 T whether taken or not.
    pub(crate) fn op_jp_cc_nn(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_data = self.dlatch;
                self.read_imm();
            }
            _ => {
                self.memptr = self.latched_word();
                if self.eval_condition(opcode >> 3) {
                    self.pc = self.memptr;
                }
                self.done();
            }
        }
    }

    fn jump_relative(&mut self) {
        self.pc = self.pc.wrapping_add(self.dlatch as i8 as u16);
        self.memptr = self.pc;
    }

    /// JR e: 12 T: M1(4) + MR(3) + internal(5)
    pub(crate) fn op_jr_e(&mut self, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.jump_relative();
                self.idle(5);
            }
            _ => self.done(),
        }
    }

    /// JR cc,e: 12 T taken, 7 T not taken. cc limited to NZ/Z/NC/C.
    pub(crate) fn op_jr_cc_e(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 if self.eval_condition((opcode >> 3) & 0x03) => {
                self.jump_relative();
                self.idle(5);
            }
            _ => self.done(),
        }
    }

    /// JP (HL): 4 T. Also JP (IX)/JP (IY).
    pub(crate) fn op_jp_hl(&mut self) {
        self.pc = self.index_base();
        self.done();
    }

    /// DJNZ e: 13 T taken, 8 T not taken: M1(5) + MR(3) [+ internal(5)]
    pub(crate) fn op_djnz(&mut self, stage: u8) {
        match stage {
            0 => self.idle(1),
            1 => {
                self.b = self.b.wrapping_sub(1);
                self.read_imm();
            }
            2 if self.b != 0 => {
                self.jump_relative();
                self.idle(5);
            }
            _ => self.done(),
        }
    }

    /// CALL nn: 17 T: M1(4) + MR(3) + MR(4) + MW(3) + MW(3)
    pub(crate) fn op_call_nn(&mut self, stage: u8) {
        self.call_stages(true, stage);
    }

    /// CALL cc,nn: 17 T taken, 10 T not taken.
    pub(crate) fn op_call_cc_nn(&mut self, opcode: u8, stage: u8) {
        let taken = stage < 2 || self.eval_condition(opcode >> 3);
        self.call_stages(taken, stage);
    }

    fn call_stages(&mut self, taken: bool, stage: u8) {
        match stage {
            0 => self.read_imm(),
            1 => {
                self.temp_data = self.dlatch;
                self.read_imm();
            }
            2 => {
                self.memptr = self.latched_word();
                if taken {
                    self.idle(1);
                } else {
                    self.done();
                }
            }
            3 => self.push_high(self.pc),
            4 => self.push_low(self.pc),
            _ => {
                self.pc = self.memptr;
                self.done();
            }
        }
    }

    /// RET: 10 T: M1(4) + MR(3) + MR(3)
    pub(crate) fn op_ret(&mut self, stage: u8) {
        self.ret_stages(stage);
    }

    /// Pop PC; stage 0 issues the first stack read.
    fn ret_stages(&mut self, stage: u8) {
        match stage {
            0 => self.pop_byte(),
            1 => {
                self.temp_data = self.dlatch;
                self.pop_byte();
            }
            _ => {
                self.pc = self.latched_word();
                self.memptr = self.pc;
                self.done();
            }
        }
    }

    /// RET cc: 11 T taken, 5 T not taken: M1(5) [+ MR(3) + MR(3)]
    pub(crate) fn op_ret_cc(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.idle(1),
            1 if !self.eval_condition(opcode >> 3) => self.done(),
            s => self.ret_stages(s - 1),
        }
    }

    /// RST p: 11 T: M1(5) + MW(3) + MW(3)
    pub(crate) fn op_rst(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.idle(1),
            1 => self.push_high(self.pc),
            2 => self.push_low(self.pc),
            _ => {
                self.pc = (opcode & 0x38) as u16;
                self.memptr = self.pc;
                self.done();
            }
        }
    }

    /// DI: 4 T: M1 only. Disable interrupts.
    pub(crate) fn op_di(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
        self.done();
    }

    /// EI: 4 T: M1 only. Enable interrupts (with 1-instruction delay).
    pub(crate) fn op_ei(&mut self) {
        self.iff1 = true;
        self.iff2 = true;
        self.ei_delay = true;
        self.done();
    }

    // --- ED Control Flow ---

    /// RETN/RETI: 14T (ED prefix): pop PC, copy IFF2 → IFF1.
    /// The next M1 carries the RETI line so daisy-chained devices can leave
    /// their interrupt service state.
    pub(crate) fn op_retn(&mut self, _opcode: u8, stage: u8) {
        if stage == 0 {
            self.iff1 = self.iff2;
        }
        if stage == 2 {
            self.reti_out = true;
        }
        self.ret_stages(stage);
    }

    /// IM 0/1/2: 8T (ED prefix): set interrupt mode.
    /// Bits 4-3: 00/01→IM 0, 10→IM 1, 11→IM 2.
    pub(crate) fn op_im(&mut self, opcode: u8) {
        self.im = match (opcode >> 3) & 0x03 {
            0 | 1 => 0,
            2 => 1,
            _ => 2,
        };
        self.done();
    }
}
