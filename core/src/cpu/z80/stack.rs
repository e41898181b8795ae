use crate::cpu::z80::Z80;

impl Z80 {
    /// PUSH rr: 11 T: M1(5) + MW(3) + MW(3)
    /// Opcode mask: 11 rr0 101 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=AF)
    pub(crate) fn op_push(&mut self, opcode: u8, stage: u8) {
        let val = self.get_rp_af((opcode >> 4) & 0x03);
        match stage {
            0 => self.idle(1),
            1 => self.push_high(val),
            2 => self.push_low(val),
            _ => self.done(),
        }
    }

    /// POP rr: 10 T: M1(4) + MR(3) + MR(3)
    /// Opcode mask: 11 rr0 001
    pub(crate) fn op_pop(&mut self, opcode: u8, stage: u8) {
        match stage {
            0 => self.pop_byte(),
            1 => {
                self.temp_data = self.dlatch;
                self.pop_byte();
            }
            _ => {
                let val = self.latched_word();
                self.set_rp_af((opcode >> 4) & 0x03, val);
                self.done();
            }
        }
    }
}
