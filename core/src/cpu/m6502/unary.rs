use super::M6502;

impl M6502 {
    /// Implied and accumulator opcodes - 2 cycles. The second byte is read
    /// and thrown away.
    pub(crate) fn implied<F>(&mut self, cycle: u8, operation: F)
    where
        F: FnOnce(&mut Self),
    {
        match cycle {
            0 => self.read(self.pc),
            _ => {
                operation(self);
                self.fetch();
            }
        }
    }

    /// JAM (KIL): the core stops sequencing and keeps the bus at 0xFFFF
    /// until reset. Each jammed tick reports as a finished step.
    pub(crate) fn op_jam(&mut self, cycle: u8) {
        if cycle == 0 {
            self.read(self.pc);
            return;
        }
        self.jammed = true;
        self.read(0xFFFF);
        self.opdone = true;
    }
}
