//! Z80 PIO (Parallel Input/Output)
//!
//! Two 8-bit ports, each with a mode (output, input, bidirectional or bit
//! control), an interrupt control word and a daisy-chain slot. Port A has
//! the higher interrupt priority.
//!
//! Register addressing: address bit 0 selects port B (set) or A, address
//! bit 1 selects the control (set) or data register.

use crate::core::{Daisy, Z80Pins};

pub const PORT_A: usize = 0;
pub const PORT_B: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PioMode {
    Output = 0,
    Input = 1,
    Bidirectional = 2,
    BitControl = 3,
}

impl PioMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => PioMode::Output,
            1 => PioMode::Input,
            2 => PioMode::Bidirectional,
            _ => PioMode::BitControl,
        }
    }
}

/// Interrupt control word bits.
pub mod int_ctrl {
    pub const EI: u8 = 0x80;
    /// Bit control: all monitored bits must match (set) or any (clear).
    pub const AND_OR: u8 = 0x40;
    /// Bit control: monitored bits are active high (set) or low (clear).
    pub const HIGH_LOW: u8 = 0x20;
    pub const MASK_FOLLOWS: u8 = 0x10;
}

#[derive(Debug, Clone)]
pub struct PioPort {
    pub mode: PioMode,
    /// Bit control direction: 1 = input, 0 = output.
    pub io_select: u8,
    pub int_control: u8,
    /// Bit control interrupt mask: 0 = bit monitored.
    pub int_mask: u8,
    input: u8,
    output: u8,
    expect_io_select: bool,
    expect_int_mask: bool,
    bctrl_match: bool,
    pub daisy: Daisy,
}

impl PioPort {
    fn new() -> Self {
        Self {
            mode: PioMode::Input,
            io_select: 0,
            int_control: 0,
            int_mask: 0xFF,
            input: 0,
            output: 0,
            expect_io_select: false,
            expect_int_mask: false,
            bctrl_match: false,
            daisy: Daisy::default(),
        }
    }

    fn write_control(&mut self, data: u8) {
        if self.expect_io_select {
            self.io_select = data;
            self.expect_io_select = false;
        } else if self.expect_int_mask {
            self.int_mask = data;
            self.expect_int_mask = false;
        } else if data & 0x01 == 0 {
            self.daisy.vector = data;
        } else {
            match data & 0x0F {
                0x0F => {
                    self.mode = PioMode::from_bits(data >> 6);
                    self.expect_io_select = self.mode == PioMode::BitControl;
                    self.bctrl_match = false;
                }
                0x07 => {
                    self.int_control = data & 0xF0;
                    self.expect_int_mask = data & int_ctrl::MASK_FOLLOWS != 0;
                }
                0x03 => {
                    self.int_control = (self.int_control & !int_ctrl::EI) | (data & int_ctrl::EI);
                }
                _ => log::trace!("pio: ignored control byte {data:#04X}"),
            }
            if self.int_control & int_ctrl::EI == 0 {
                self.daisy.cancel();
            }
        }
    }

    fn read_data(&self) -> u8 {
        match self.mode {
            PioMode::Output => self.output,
            PioMode::Input | PioMode::Bidirectional => self.input,
            PioMode::BitControl => (self.input & self.io_select) | (self.output & !self.io_select),
        }
    }

    /// Value currently driven on the port pins.
    pub fn output(&self) -> u8 {
        match self.mode {
            PioMode::Input => 0xFF,
            PioMode::Output | PioMode::Bidirectional => self.output,
            PioMode::BitControl => (self.output & !self.io_select) | self.io_select,
        }
    }

    fn check_bit_control(&mut self) {
        if self.mode != PioMode::BitControl {
            return;
        }
        let mask = !self.int_mask;
        let val = self.read_data() & mask;
        let matched = match self.int_control & (int_ctrl::AND_OR | int_ctrl::HIGH_LOW) {
            0x00 => val != mask,
            int_ctrl::HIGH_LOW => val != 0,
            int_ctrl::AND_OR => val == 0,
            _ => val == mask,
        };
        if matched && !self.bctrl_match && self.int_control & int_ctrl::EI != 0 {
            self.daisy.request();
        }
        self.bctrl_match = matched;
    }
}

pub struct Z80Pio {
    pub ports: [PioPort; 2],
}

impl Default for Z80Pio {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80Pio {
    pub fn new() -> Self {
        Self {
            ports: [PioPort::new(), PioPort::new()],
        }
    }

    pub fn reset(&mut self) {
        for port in &mut self.ports {
            let input = port.input;
            *port = PioPort::new();
            port.input = input;
        }
    }

    /// Read a register. `offset` bit 0 = B/A, bit 1 = C/D.
    pub fn read(&mut self, offset: u8) -> u8 {
        let port = (offset & 0x01) as usize;
        if offset & 0x02 != 0 {
            (self.ports[PORT_A].int_control & 0xC0) | (self.ports[PORT_B].int_control >> 4)
        } else {
            self.ports[port].read_data()
        }
    }

    pub fn write(&mut self, offset: u8, data: u8) {
        let port = &mut self.ports[(offset & 0x01) as usize];
        if offset & 0x02 != 0 {
            port.write_control(data);
        } else {
            port.output = data;
        }
        port.check_bit_control();
    }

    /// Set the value the peripheral drives into a port's pins.
    pub fn set_port_input(&mut self, port: usize, data: u8) {
        let p = &mut self.ports[port];
        p.input = data;
        p.check_bit_control();
    }

    /// Peripheral strobe (ASTB/BSTB): latches the input in input and
    /// bidirectional mode, acknowledges the output in output mode. Raises an
    /// interrupt if enabled.
    pub fn strobe(&mut self, port: usize) {
        let p = &mut self.ports[port];
        if p.mode != PioMode::BitControl && p.int_control & int_ctrl::EI != 0 {
            p.daisy.request();
        }
    }

    pub fn port_output(&self, port: usize) -> u8 {
        self.ports[port].output()
    }

    /// One system clock tick: register access when `selected` and daisy chain.
    pub fn tick(&mut self, mut pins: Z80Pins, selected: bool) -> Z80Pins {
        if selected {
            let offset = pins.addr() as u8;
            if pins.is_io_read() {
                pins.set_data(self.read(offset));
            } else if pins.is_io_write() {
                self.write(offset, pins.data());
            }
        }
        for port in &mut self.ports {
            pins = port.daisy.tick(pins);
        }
        pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A_DATA: u8 = 0;
    const B_DATA: u8 = 1;
    const A_CTRL: u8 = 2;
    const B_CTRL: u8 = 3;

    #[test]
    fn output_mode_reads_back_latch() {
        let mut pio = Z80Pio::new();
        pio.write(A_CTRL, 0x0F); // mode 0: output
        pio.write(A_DATA, 0x5A);
        assert_eq!(pio.read(A_DATA), 0x5A);
        assert_eq!(pio.port_output(PORT_A), 0x5A);
    }

    #[test]
    fn input_mode_reads_pins() {
        let mut pio = Z80Pio::new();
        pio.write(B_CTRL, 0x4F); // mode 1: input
        pio.write(B_DATA, 0x00);
        pio.set_port_input(PORT_B, 0xA5);
        assert_eq!(pio.read(B_DATA), 0xA5);
    }

    #[test]
    fn bit_control_merges_inputs_and_outputs() {
        let mut pio = Z80Pio::new();
        pio.write(A_CTRL, 0xCF); // mode 3
        pio.write(A_CTRL, 0xF0); // upper nibble input
        pio.write(A_DATA, 0x0C);
        pio.set_port_input(PORT_A, 0xA3);
        assert_eq!(pio.read(A_DATA), 0xAC);
    }

    #[test]
    fn bit_control_interrupt_on_low_input() {
        let mut pio = Z80Pio::new();
        pio.write(B_CTRL, 0x20); // vector
        pio.write(B_CTRL, 0xCF);
        pio.write(B_CTRL, 0xFF); // all inputs
        pio.set_port_input(PORT_B, 0xFF);
        // EI, OR, active low, mask follows: monitor bits 0..3
        pio.write(B_CTRL, 0x97);
        pio.write(B_CTRL, 0xF0);
        assert!(!pio.ports[PORT_B].daisy.is_requested());

        pio.set_port_input(PORT_B, 0xFB);
        assert!(pio.ports[PORT_B].daisy.is_requested());
        let ack = pio.tick(Z80Pins::IEIO | Z80Pins::M1 | Z80Pins::IORQ, false);
        assert_eq!(ack.data(), 0x20);

        // still matching: no second request until the match goes away
        pio.set_port_input(PORT_B, 0xFA);
        assert!(!pio.ports[PORT_B].daisy.is_requested());
        pio.set_port_input(PORT_B, 0xFF);
        pio.set_port_input(PORT_B, 0xFE);
        assert!(pio.ports[PORT_B].daisy.is_requested());
    }

    #[test]
    fn control_read_reports_interrupt_control() {
        let mut pio = Z80Pio::new();
        pio.write(A_CTRL, 0x87);
        pio.write(B_CTRL, 0x37);
        assert_eq!(pio.read(A_CTRL), 0x80 | 0x03);
    }
}
