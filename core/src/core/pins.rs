//! Pin-level bus words.
//!
//! Every chip in the workspace talks to its environment through one of these
//! packed words: the address bus sits in bits 0..16, the data bus in bits
//! 16..24, and each control line gets its own bit from 24 upward. A word is
//! rebuilt every tick and never stored beyond the next tick.
//!
//! Each CPU family gets its own type so that a 6502 control line can never be
//! mixed up with a Z80 one at compile time.

use bitflags::bitflags;

const ADDR_MASK: u64 = 0xFFFF;
const DATA_SHIFT: u32 = 16;
const DATA_MASK: u64 = 0xFF << DATA_SHIFT;

/// Address, data, and control lines shared by accessors of both pin families.
macro_rules! bus_lines {
    ($name:ident) => {
        impl $name {
            /// Address bus (A0..A15).
            #[inline]
            pub fn addr(self) -> u16 {
                (self.bits() & ADDR_MASK) as u16
            }

            #[inline]
            pub fn set_addr(&mut self, addr: u16) {
                *self = Self::from_bits_retain((self.bits() & !ADDR_MASK) | addr as u64);
            }

            #[inline]
            pub fn with_addr(mut self, addr: u16) -> Self {
                self.set_addr(addr);
                self
            }

            /// Data bus (D0..D7).
            #[inline]
            pub fn data(self) -> u8 {
                ((self.bits() & DATA_MASK) >> DATA_SHIFT) as u8
            }

            #[inline]
            pub fn set_data(&mut self, data: u8) {
                *self = Self::from_bits_retain(
                    (self.bits() & !DATA_MASK) | ((data as u64) << DATA_SHIFT),
                );
            }

            #[inline]
            pub fn with_data(mut self, data: u8) -> Self {
                self.set_data(data);
                self
            }

            /// Address and data in one go, control lines untouched.
            #[inline]
            pub fn set_addr_data(&mut self, addr: u16, data: u8) {
                self.set_addr(addr);
                self.set_data(data);
            }

            /// Address and data only, every control line dropped.
            #[inline]
            pub fn bus_lines(self) -> Self {
                Self::from_bits_retain(self.bits() & (ADDR_MASK | DATA_MASK))
            }

            /// Only the control lines, address and data cleared.
            #[inline]
            pub fn control(self) -> Self {
                Self::from_bits_retain(self.bits() & !(ADDR_MASK | DATA_MASK))
            }
        }
    };
}

/// Z80 pin word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Z80Pins(u64);

bitflags! {
    impl Z80Pins: u64 {
        /// Machine cycle one (opcode fetch or interrupt acknowledge).
        const M1 = 1 << 24;
        const MREQ = 1 << 25;
        const IORQ = 1 << 26;
        const RD = 1 << 27;
        const WR = 1 << 28;
        const RFSH = 1 << 29;
        const HALT = 1 << 30;
        /// Input: stretch the current machine cycle.
        const WAIT = 1 << 31;
        /// Input: maskable interrupt request (level).
        const INT = 1 << 32;
        /// Input: non-maskable interrupt (edge).
        const NMI = 1 << 33;
        const RESET = 1 << 34;
        const BUSRQ = 1 << 35;
        const BUSAK = 1 << 36;
        /// Output: opcode fetch of a RETI/RETN second byte, decoded by
        /// Z80-family peripherals to leave interrupt service.
        const RETI = 1 << 37;
        /// Daisy chain IEI/IEO line, passed from device to device.
        const IEIO = 1 << 38;

        const CTRL = Self::M1.bits() | Self::MREQ.bits() | Self::IORQ.bits()
            | Self::RD.bits() | Self::WR.bits() | Self::RFSH.bits();

        const _ = !0;
    }
}

bus_lines!(Z80Pins);

impl Z80Pins {
    /// Memory read request (opcode fetch included).
    #[inline]
    pub fn is_mem_read(self) -> bool {
        self.contains(Self::MREQ | Self::RD)
    }

    #[inline]
    pub fn is_mem_write(self) -> bool {
        self.contains(Self::MREQ | Self::WR)
    }

    #[inline]
    pub fn is_io_read(self) -> bool {
        self.contains(Self::IORQ | Self::RD)
    }

    #[inline]
    pub fn is_io_write(self) -> bool {
        self.contains(Self::IORQ | Self::WR)
    }

    /// Interrupt acknowledge: the device on top of the chain drives the data bus.
    #[inline]
    pub fn is_int_ack(self) -> bool {
        self.contains(Self::M1 | Self::IORQ)
    }
}

/// MOS 6502 pin word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct M6502Pins(u64);

bitflags! {
    impl M6502Pins: u64 {
        /// Read (1) or write (0).
        const RW = 1 << 24;
        /// Opcode fetch in progress.
        const SYNC = 1 << 25;
        const IRQ = 1 << 26;
        const NMI = 1 << 27;
        /// Ready input: while set, read cycles are stalled.
        const RDY = 1 << 28;
        const RES = 1 << 29;

        const _ = !0;
    }
}

bus_lines!(M6502Pins);

impl M6502Pins {
    #[inline]
    pub fn is_read(self) -> bool {
        self.contains(Self::RW)
    }

    #[inline]
    pub fn is_write(self) -> bool {
        !self.contains(Self::RW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_and_data_do_not_touch_control_lines() {
        let mut pins = Z80Pins::MREQ | Z80Pins::RD | Z80Pins::WAIT;
        pins.set_addr(0xBEEF);
        pins.set_data(0x5A);
        assert_eq!(pins.addr(), 0xBEEF);
        assert_eq!(pins.data(), 0x5A);
        assert!(pins.contains(Z80Pins::MREQ | Z80Pins::RD | Z80Pins::WAIT));

        pins.set_addr(0x0001);
        assert_eq!(pins.data(), 0x5A);
        assert_eq!(pins.control(), Z80Pins::MREQ | Z80Pins::RD | Z80Pins::WAIT);
    }

    #[test]
    fn request_classification() {
        let fetch = Z80Pins::M1 | Z80Pins::MREQ | Z80Pins::RD;
        assert!(fetch.is_mem_read());
        assert!(!fetch.is_int_ack());
        let ack = Z80Pins::M1 | Z80Pins::IORQ;
        assert!(ack.is_int_ack());
        assert!(!ack.is_io_read());

        let read = M6502Pins::RW.with_addr(0xFFFC);
        assert!(read.is_read());
        assert!(M6502Pins::empty().with_data(0x42).is_write());
    }
}
