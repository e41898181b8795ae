use super::M6502;

/// Operand addressing modes shared by the read, store and read-modify-write
/// instruction groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Imm,
    Zp,
    ZpX,
    ZpY,
    Abs,
    AbsX,
    AbsY,
    IndX,
    IndY,
}

impl Mode {
    /// Handler cycle on which the operand address goes out on the bus.
    pub(crate) fn access_cycle(self) -> u8 {
        match self {
            Mode::Imm => 0,
            Mode::Zp => 1,
            Mode::ZpX | Mode::ZpY | Mode::Abs => 2,
            Mode::AbsX | Mode::AbsY => 3,
            Mode::IndX | Mode::IndY => 4,
        }
    }
}

impl M6502 {
    #[inline]
    fn word(&self) -> u16 {
        ((self.data as u16) << 8) | self.temp_data as u16
    }

    /// Indexed address with the dummy read from the un-carried page. Reads
    /// without a page crossing use that read as the real access and skip
    /// the fix-up cycle.
    fn index_fixup(&mut self, base: u16, index: u8, always_fixup: bool) {
        let addr = base.wrapping_add(index as u16);
        self.temp_addr = addr;
        self.read((base & 0xFF00) | (addr & 0x00FF));
        if !always_fixup && (base ^ addr) & 0xFF00 == 0 {
            self.skip_cycle();
        }
    }

    /// Address phase. Issues the pointer and dummy reads of the mode and
    /// returns true once `temp_addr` holds the effective address, which is
    /// from `mode.access_cycle()` on.
    pub(crate) fn addressing(&mut self, mode: Mode, cycle: u8, always_fixup: bool) -> bool {
        match (mode, cycle) {
            (Mode::Imm, 0) => {
                self.temp_addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                true
            }
            (_, 0) => {
                self.read_pc();
                false
            }
            (Mode::Zp, 1) => {
                self.temp_addr = self.data as u16;
                true
            }
            (Mode::ZpX | Mode::ZpY | Mode::IndX | Mode::IndY, 1) => {
                // Zero-page base; the read is a dummy for X indexing and the pointer low byte for (zp),Y
                self.temp_addr = self.data as u16;
                self.read(self.temp_addr);
                false
            }
            (Mode::ZpX, 2) => {
                self.temp_addr = (self.temp_addr + self.x as u16) & 0x00FF;
                true
            }
            (Mode::ZpY, 2) => {
                self.temp_addr = (self.temp_addr + self.y as u16) & 0x00FF;
                true
            }
            (Mode::Abs | Mode::AbsX | Mode::AbsY, 1) => {
                self.temp_data = self.data;
                self.read_pc();
                false
            }
            (Mode::Abs, 2) => {
                self.temp_addr = self.word();
                true
            }
            (Mode::AbsX, 2) => {
                self.index_fixup(self.word(), self.x, always_fixup);
                false
            }
            (Mode::AbsY, 2) => {
                self.index_fixup(self.word(), self.y, always_fixup);
                false
            }
            (Mode::IndX, 2) => {
                self.temp_addr = (self.temp_addr + self.x as u16) & 0x00FF;
                self.read(self.temp_addr);
                false
            }
            (Mode::IndX, 3) => {
                self.temp_data = self.data;
                self.read((self.temp_addr + 1) & 0x00FF);
                false
            }
            (Mode::IndX, 4) => {
                self.temp_addr = self.word();
                true
            }
            (Mode::IndY, 2) => {
                // data is the pointer's low byte, re-read through temp_addr
                self.temp_data = self.data;
                self.read((self.temp_addr + 1) & 0x00FF);
                false
            }
            (Mode::IndY, 3) => {
                self.index_fixup(self.word(), self.y, always_fixup);
                false
            }
            _ => true,
        }
    }

    /// Read-type instruction: address phase, operand read, then `operation`
    /// on the operand in the same tick as the next opcode fetch.
    pub(crate) fn read_op<F>(&mut self, mode: Mode, cycle: u8, operation: F)
    where
        F: FnOnce(&mut Self, u8),
    {
        if !self.addressing(mode, cycle, false) {
            return;
        }
        if cycle == mode.access_cycle() {
            self.read(self.temp_addr);
        } else {
            operation(self, self.data);
            self.fetch();
        }
    }

    /// Store instruction: `value` gets the effective address for the
    /// unstable SHx stores. Indexed stores always take the fix-up cycle.
    pub(crate) fn store_op<F>(&mut self, mode: Mode, cycle: u8, value: F)
    where
        F: FnOnce(&mut Self, u16) -> u8,
    {
        if !self.addressing(mode, cycle, true) {
            return;
        }
        if cycle == mode.access_cycle() {
            let addr = self.temp_addr;
            let val = value(self, addr);
            self.write(addr, val);
        } else {
            self.fetch();
        }
    }
}
