use super::{M6502, StatusFlag};

impl M6502 {
    // ---- Stack instructions ----

    #[inline]
    pub(crate) fn push(&mut self, val: u8) {
        self.write(self.stack_addr(), val);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// PHA (0x48) - 3 cycles. Push A to stack.
    pub(crate) fn op_pha(&mut self, cycle: u8) {
        match cycle {
            // Dummy read from PC (next byte, discarded)
            0 => self.read(self.pc),
            1 => self.push(self.a),
            _ => self.fetch(),
        }
    }

    /// PHP (0x08) - 3 cycles. Push P with B=1 and U=1 to stack.
    pub(crate) fn op_php(&mut self, cycle: u8) {
        match cycle {
            0 => self.read(self.pc),
            1 => self.push(self.p | StatusFlag::B as u8 | StatusFlag::U as u8),
            _ => self.fetch(),
        }
    }

    /// Shared 4-cycle pull: dummy PC read, dummy stack read, then the pull.
    fn pull(&mut self, cycle: u8, apply: fn(&mut Self, u8)) {
        match cycle {
            0 => self.read(self.pc),
            1 => {
                self.read(self.stack_addr());
                self.sp = self.sp.wrapping_add(1);
            }
            2 => self.read(self.stack_addr()),
            _ => {
                apply(self, self.data);
                self.fetch();
            }
        }
    }

    /// PLA (0x68) - 4 cycles. Pull A from stack. Sets N, Z.
    pub(crate) fn op_pla(&mut self, cycle: u8) {
        self.pull(cycle, |cpu, v| {
            cpu.a = v;
            cpu.set_nz(v);
        });
    }

    /// PLP (0x28) - 4 cycles. Pull P; B is not a real flag, U reads as 1.
    pub(crate) fn op_plp(&mut self, cycle: u8) {
        self.pull(cycle, |cpu, v| {
            cpu.p = (v & !(StatusFlag::B as u8)) | StatusFlag::U as u8;
        });
    }
}
