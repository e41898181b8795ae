use super::{M6502, Mode};

impl M6502 {
    // ---- Shift/rotate primitives ----

    /// ASL: C = old bit 7.
    pub(crate) fn perform_asl(&mut self, val: u8) -> u8 {
        let result = val << 1;
        self.set_flags_shift(result, val & 0x80 != 0);
        result
    }

    /// LSR: C = old bit 0, N always cleared.
    pub(crate) fn perform_lsr(&mut self, val: u8) -> u8 {
        let result = val >> 1;
        self.set_flags_shift(result, val & 0x01 != 0);
        result
    }

    /// ROL: old C into bit 0, C = old bit 7.
    pub(crate) fn perform_rol(&mut self, val: u8) -> u8 {
        let result = (val << 1) | (self.p & 0x01);
        self.set_flags_shift(result, val & 0x80 != 0);
        result
    }

    /// ROR: old C into bit 7, C = old bit 0.
    pub(crate) fn perform_ror(&mut self, val: u8) -> u8 {
        let result = (val >> 1) | ((self.p & 0x01) << 7);
        self.set_flags_shift(result, val & 0x01 != 0);
        result
    }

    fn perform_inc(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        self.set_nz(result);
        result
    }

    fn perform_dec(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        self.set_nz(result);
        result
    }

    /// Modify step for the read-modify-write opcodes, documented ones and
    /// the undocumented combinations (SLO RLA SRE RRA DCP ISB) alike.
    pub(crate) fn rmw_fn(opcode: u8) -> fn(&mut Self, u8) -> u8 {
        let undocumented = opcode & 0x03 == 0x03;
        match (opcode >> 5, undocumented) {
            (0, false) => Self::perform_asl,
            (1, false) => Self::perform_rol,
            (2, false) => Self::perform_lsr,
            (3, false) => Self::perform_ror,
            (6, false) => Self::perform_dec,
            (7, false) => Self::perform_inc,
            (0, true) => |c, v| {
                let r = c.perform_asl(v);
                c.perform_ora(r);
                r
            },
            (1, true) => |c, v| {
                let r = c.perform_rol(v);
                c.perform_and(r);
                r
            },
            (2, true) => |c, v| {
                let r = c.perform_lsr(v);
                c.perform_eor(r);
                r
            },
            (3, true) => |c, v| {
                let r = c.perform_ror(v);
                c.perform_adc(r);
                r
            },
            (6, true) => |c, v| {
                let r = v.wrapping_sub(1);
                c.perform_compare(c.a, r);
                r
            },
            _ => |c, v| {
                let r = v.wrapping_add(1);
                c.perform_sbc(r);
                r
            },
        }
    }

    /// Read-modify-write: operand read, unmodified write-back, modified
    /// write. Indexed modes always take the fix-up cycle.
    pub(crate) fn rmw_op<F>(&mut self, mode: Mode, cycle: u8, modify: F)
    where
        F: FnOnce(&mut Self, u8) -> u8,
    {
        if !self.addressing(mode, cycle, true) {
            return;
        }
        match cycle - mode.access_cycle() {
            0 => self.read(self.temp_addr),
            1 => {
                self.temp_data = self.data;
                self.write(self.temp_addr, self.temp_data);
            }
            2 => {
                let result = modify(self, self.temp_data);
                self.write(self.temp_addr, result);
            }
            _ => self.fetch(),
        }
    }
}
