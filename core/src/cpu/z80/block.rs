use crate::cpu::z80::{Flag, Z80};

impl Z80 {
    /// Repeat tail shared by the xxIR/xxDR variants: rewind PC onto the
    /// prefix and burn 5 T. X/Y come from the high byte of the rewound PC.
    fn block_repeat(&mut self) {
        self.pc = self.pc.wrapping_sub(2);
        self.memptr = self.pc.wrapping_add(1);
        let f = (self.f & !(Flag::X as u8 | Flag::Y as u8))
            | ((self.pc >> 8) as u8 & (Flag::X as u8 | Flag::Y as u8));
        self.set_f(f);
        self.idle(5);
    }

    // --- Block Transfer ---

    /// LDI/LDD/LDIR/LDDR: 16T, 21T while repeating.
    /// Main M1(4) + ED M1(4) + MR(3) + MW(3) + internal(2) [+ internal(5)]
    pub(crate) fn op_ldi_ldd(&mut self, opcode: u8, stage: u8) {
        let dec = (opcode & 0x08) != 0;
        let repeat = (opcode & 0x10) != 0;
        match stage {
            0 => self.mread(self.get_hl()),
            1 => {
                self.temp_data = self.dlatch;
                self.mwrite(self.get_de(), self.temp_data);
            }
            2 => {
                let delta: u16 = if dec { 0xFFFF } else { 1 };
                self.set_hl(self.get_hl().wrapping_add(delta));
                self.set_de(self.get_de().wrapping_add(delta));
                self.set_bc(self.get_bc().wrapping_sub(1));

                let n = self.temp_data.wrapping_add(self.a);
                let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::C as u8);
                if self.get_bc() != 0 { f |= Flag::PV as u8; }
                // Undocumented: X = bit 3 of (val+A), Y = bit 1 of (val+A)
                if (n & 0x08) != 0 { f |= Flag::X as u8; }
                if (n & 0x02) != 0 { f |= Flag::Y as u8; }
                self.set_f(f);
                self.idle(2);
            }
            3 if repeat && self.get_bc() != 0 => self.block_repeat(),
            _ => self.done(),
        }
    }

    // --- Block Compare ---

    /// CPI/CPD/CPIR/CPDR: 16T, 21T while repeating.
    /// Main M1(4) + ED M1(4) + MR(3) + internal(5) [+ internal(5)]
    /// The repeat stops when BC reaches 0 or A matches.
    pub(crate) fn op_cpi_cpd(&mut self, opcode: u8, stage: u8) {
        let dec = (opcode & 0x08) != 0;
        let repeat = (opcode & 0x10) != 0;
        match stage {
            0 => self.mread(self.get_hl()),
            1 => {
                let val = self.dlatch;
                let result = self.a.wrapping_sub(val);
                let h = (self.a & 0xF) < (val & 0xF);

                let delta: u16 = if dec { 0xFFFF } else { 1 };
                self.set_hl(self.get_hl().wrapping_add(delta));
                self.set_bc(self.get_bc().wrapping_sub(1));
                self.memptr = self.memptr.wrapping_add(delta);

                let mut f = self.f & Flag::C as u8; // preserve C
                f |= Flag::N as u8;
                if result == 0 { f |= Flag::Z as u8; }
                if (result & 0x80) != 0 { f |= Flag::S as u8; }
                if h { f |= Flag::H as u8; }
                if self.get_bc() != 0 { f |= Flag::PV as u8; }
                // Undocumented X/Y: n = result - H_flag
                let n = result.wrapping_sub(h as u8);
                if (n & 0x08) != 0 { f |= Flag::X as u8; }
                if (n & 0x02) != 0 { f |= Flag::Y as u8; }
                self.set_f(f);
                self.idle(5);
            }
            2 if repeat && self.get_bc() != 0 && (self.f & Flag::Z as u8) == 0 => {
                self.block_repeat()
            }
            _ => self.done(),
        }
    }

    // --- Block I/O ---

    /// Flags after INI/IND/OUTI/OUTD. `k` is the transferred byte plus the
    /// adjusted C (input) or the new L (output).
    fn block_io_flags(&mut self, data: u8, k: u16) {
        let mut f = self.b & (Flag::S as u8 | Flag::X as u8 | Flag::Y as u8);
        if self.b == 0 { f |= Flag::Z as u8; }
        if (data & 0x80) != 0 { f |= Flag::N as u8; }
        if k > 0xFF { f |= Flag::H as u8 | Flag::C as u8; }
        if Self::get_parity((k as u8 & 0x07) ^ self.b) { f |= Flag::PV as u8; }
        self.set_f(f);
    }

    /// Repeat adjustment for INIR/INDR/OTIR/OTDR: H and PV pick up the
    /// internal B adjustment done during the extra 5 T.
    fn block_io_repeat(&mut self, data: u8) {
        let b = self.b;
        let mut f = self.f & !(Flag::H as u8);
        let flip = if (f & Flag::C as u8) != 0 {
            if (data & 0x80) != 0 {
                if (b & 0x0F) == 0x00 { f |= Flag::H as u8; }
                !Self::get_parity(b.wrapping_sub(1) & 0x07)
            } else {
                if (b & 0x0F) == 0x0F { f |= Flag::H as u8; }
                !Self::get_parity(b.wrapping_add(1) & 0x07)
            }
        } else {
            f |= self.f & Flag::H as u8;
            !Self::get_parity(b & 0x07)
        };
        if flip {
            f ^= Flag::PV as u8;
        }
        self.f = f;
        self.block_repeat();
    }

    /// INI/IND/INIR/INDR: 16T, 21T while repeating.
    /// Main M1(4) + ED M1(5) + IO(4) + MW(3) [+ internal(5)]
    /// IN from port BC → (HL), B--, HL±±
    pub(crate) fn op_ini_ind(&mut self, opcode: u8, stage: u8) {
        let dec = (opcode & 0x08) != 0;
        let repeat = (opcode & 0x10) != 0;
        match stage {
            0 => self.idle(1),
            1 => {
                let bc = self.get_bc();
                self.memptr = if dec { bc.wrapping_sub(1) } else { bc.wrapping_add(1) };
                self.ioread(bc);
            }
            2 => {
                self.temp_data = self.dlatch;
                self.b = self.b.wrapping_sub(1);
                self.mwrite(self.get_hl(), self.temp_data);
            }
            3 => {
                let delta: u16 = if dec { 0xFFFF } else { 1 };
                self.set_hl(self.get_hl().wrapping_add(delta));
                let c = if dec { self.c.wrapping_sub(1) } else { self.c.wrapping_add(1) };
                self.block_io_flags(self.temp_data, self.temp_data as u16 + c as u16);
                if repeat && self.b != 0 {
                    self.block_io_repeat(self.temp_data);
                } else {
                    self.done();
                }
            }
            _ => self.done(),
        }
    }

    /// OUTI/OUTD/OTIR/OTDR: 16T, 21T while repeating.
    /// Main M1(4) + ED M1(5) + MR(3) + IO(4) [+ internal(5)]
    /// B--, (HL) → OUT port BC, HL±±
    pub(crate) fn op_outi_outd(&mut self, opcode: u8, stage: u8) {
        let dec = (opcode & 0x08) != 0;
        let repeat = (opcode & 0x10) != 0;
        match stage {
            0 => self.idle(1),
            1 => self.mread(self.get_hl()),
            2 => {
                self.temp_data = self.dlatch;
                self.b = self.b.wrapping_sub(1);
                let bc = self.get_bc();
                self.memptr = if dec { bc.wrapping_sub(1) } else { bc.wrapping_add(1) };
                self.iowrite(bc, self.temp_data);
            }
            3 => {
                let delta: u16 = if dec { 0xFFFF } else { 1 };
                self.set_hl(self.get_hl().wrapping_add(delta));
                self.block_io_flags(self.temp_data, self.temp_data as u16 + self.l as u16);
                if repeat && self.b != 0 {
                    self.block_io_repeat(self.temp_data);
                } else {
                    self.done();
                }
            }
            _ => self.done(),
        }
    }
}
