use super::{BRK_NMI, BRK_RESET, M6502, StatusFlag};

impl M6502 {
    // ---- Branch helper ----

    /// Generic conditional branch. Timing:
    /// - Not taken: 2 cycles
    /// - Taken, no page cross: 3 cycles (and pending interrupts wait one more instruction)
    /// - Taken, page cross: 4 cycles
    pub(crate) fn branch(&mut self, cycle: u8, condition: bool) {
        match cycle {
            0 => self.read_pc(),
            1 => {
                if !condition {
                    self.fetch();
                } else {
                    self.temp_addr = self.pc.wrapping_add(self.data as i8 as u16);
                    self.read(self.pc);
                }
            }
            2 => {
                let target = self.temp_addr;
                if (self.pc ^ target) & 0xFF00 == 0 {
                    self.pc = target;
                    // The interrupt check of this fetch sees the pipeline one
                    // tick late.
                    self.irq_pip >>= 1;
                    self.nmi_pip >>= 1;
                    self.fetch();
                } else {
                    self.read((self.pc & 0xFF00) | (target & 0x00FF));
                    self.pc = target;
                }
            }
            _ => self.fetch(),
        }
    }

    // ---- Jumps ----

    /// JMP Absolute (0x4C) - 3 cycles.
    pub(crate) fn op_jmp_abs(&mut self, cycle: u8) {
        match cycle {
            0 => self.read_pc(),
            1 => {
                self.temp_data = self.data;
                self.read_pc();
            }
            _ => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.fetch();
            }
        }
    }

    /// JMP Indirect (0x6C) - 5 cycles. The pointer's high byte is read
    /// without carry into the page (the NMOS page-wrap bug).
    pub(crate) fn op_jmp_ind(&mut self, cycle: u8) {
        match cycle {
            0 => self.read_pc(),
            1 => {
                self.temp_data = self.data;
                self.read_pc();
            }
            2 => {
                self.temp_addr = ((self.data as u16) << 8) | self.temp_data as u16;
                self.read(self.temp_addr);
            }
            3 => {
                self.temp_data = self.data;
                let hi = (self.temp_addr & 0xFF00) | (self.temp_addr.wrapping_add(1) & 0x00FF);
                self.read(hi);
            }
            _ => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.fetch();
            }
        }
    }

    /// JSR (0x20) - 6 cycles. Pushes the address of the last operand byte.
    pub(crate) fn op_jsr(&mut self, cycle: u8) {
        match cycle {
            0 => self.read_pc(),
            1 => {
                self.temp_data = self.data;
                self.read(self.stack_addr());
            }
            2 => self.push((self.pc >> 8) as u8),
            3 => self.push(self.pc as u8),
            4 => self.read(self.pc),
            _ => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.fetch();
            }
        }
    }

    /// RTS (0x60) - 6 cycles.
    pub(crate) fn op_rts(&mut self, cycle: u8) {
        match cycle {
            0 => self.read(self.pc),
            1 => {
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            2 => {
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            3 => {
                self.temp_data = self.data;
                self.read(self.stack_addr());
            }
            4 => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.read(self.pc);
            }
            _ => {
                self.pc = self.pc.wrapping_add(1);
                self.fetch();
            }
        }
    }

    /// RTI (0x40) - 6 cycles. Pulls P (B dropped, U set) and PC.
    pub(crate) fn op_rti(&mut self, cycle: u8) {
        match cycle {
            0 => self.read(self.pc),
            1 => {
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            2 => {
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            3 => {
                self.p = (self.data & !(StatusFlag::B as u8)) | StatusFlag::U as u8;
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            4 => {
                self.temp_data = self.data;
                self.read(self.stack_addr());
            }
            _ => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.fetch();
            }
        }
    }

    // ---- BRK and the interrupt sequences ----

    /// Stack access of the BRK sequence: a write for BRK/IRQ/NMI, a read
    /// during reset.
    fn brk_push(&mut self, val: u8) {
        if self.brk_flags & BRK_RESET != 0 {
            self.read(self.stack_addr());
            self.sp = self.sp.wrapping_sub(1);
        } else {
            self.push(val);
        }
    }

    /// BRK (0x00) - 7 cycles. Also runs IRQ, NMI and reset, which differ
    /// only in the vector, in B of the pushed P, and in reset's read-only
    /// stack cycles.
    pub(crate) fn op_brk(&mut self, cycle: u8) {
        match cycle {
            0 => {
                self.read(self.pc);
                if self.brk_flags == 0 {
                    // Software BRK skips its signature byte
                    self.pc = self.pc.wrapping_add(1);
                }
            }
            1 => self.brk_push((self.pc >> 8) as u8),
            2 => self.brk_push(self.pc as u8),
            3 => {
                let mut p = self.p | StatusFlag::U as u8;
                if self.brk_flags == 0 {
                    p |= StatusFlag::B as u8;
                } else {
                    p &= !(StatusFlag::B as u8);
                }
                self.brk_push(p);
            }
            4 => {
                self.temp_addr = if self.brk_flags & BRK_RESET != 0 {
                    0xFFFC
                } else if self.brk_flags & BRK_NMI != 0 {
                    0xFFFA
                } else {
                    0xFFFE
                };
                self.read(self.temp_addr);
                self.set_flag(StatusFlag::I, true);
            }
            5 => {
                self.temp_data = self.data;
                self.read(self.temp_addr.wrapping_add(1));
            }
            _ => {
                self.pc = ((self.data as u16) << 8) | self.temp_data as u16;
                self.brk_flags = 0;
                self.fetch();
            }
        }
    }
}
