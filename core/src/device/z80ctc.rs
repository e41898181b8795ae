//! Z80 CTC (Counter/Timer Circuit)
//!
//! Four independent 8-bit down counters. In timer mode a channel counts
//! system clock ticks through a prescaler of 16 or 256; in counter mode it
//! counts edges on its CLK/TRG input. Each time a counter reaches zero the
//! channel pulses its ZC/TO output, reloads the time constant and, with
//! interrupts enabled, raises a daisy-chained interrupt. Channel 0 has the
//! highest priority. Channel 3 has no ZC/TO pin on the real chip; it is
//! reported anyway.
//!
//! Register addressing uses the low two address bits (channel select).

use crate::core::{Daisy, Z80Pins};

pub const NUM_CHANNELS: usize = 4;

/// Channel control word bits.
pub mod ctrl {
    /// Interrupt enable.
    pub const EI: u8 = 0x80;
    /// Counter mode (set) or timer mode (clear).
    pub const MODE_COUNTER: u8 = 0x40;
    /// Timer prescaler 256 (set) or 16 (clear).
    pub const PRESCALER_256: u8 = 0x20;
    /// CLK/TRG active on the rising edge.
    pub const EDGE_RISING: u8 = 0x10;
    /// Timer waits for a CLK/TRG edge before it starts.
    pub const TRIGGER_WAIT: u8 = 0x08;
    /// The next byte written is the time constant.
    pub const CONST_FOLLOWS: u8 = 0x04;
    /// Software reset: the channel stops until a time constant arrives.
    pub const RESET: u8 = 0x02;
    /// Control word (set) or interrupt vector (clear, channel 0 only).
    pub const CONTROL: u8 = 0x01;
}

#[derive(Debug, Clone)]
pub struct CtcChannel {
    pub control: u8,
    pub constant: u8,
    down_counter: u16,
    prescaler: u8,
    trigger: bool,
    waiting_for_trigger: bool,
    zcto: bool,
    pub daisy: Daisy,
}

impl CtcChannel {
    fn new() -> Self {
        Self {
            control: ctrl::RESET,
            constant: 0,
            down_counter: 0,
            prescaler: 0,
            trigger: false,
            waiting_for_trigger: false,
            zcto: false,
            daisy: Daisy::default(),
        }
    }

    fn reload(&self) -> u16 {
        if self.constant == 0 { 256 } else { self.constant as u16 }
    }

    fn running(&self) -> bool {
        self.control & ctrl::RESET == 0 && !self.waiting_for_trigger
    }

    fn count(&mut self) {
        if self.down_counter > 1 {
            self.down_counter -= 1;
        } else {
            self.down_counter = self.reload();
            self.zcto = true;
            if self.control & ctrl::EI != 0 {
                self.daisy.request();
            }
        }
    }

    fn write(&mut self, data: u8) {
        if self.control & ctrl::CONST_FOLLOWS != 0 {
            self.constant = data;
            self.down_counter = self.reload();
            self.control &= !(ctrl::CONST_FOLLOWS | ctrl::RESET);
            self.prescaler = 0;
            self.waiting_for_trigger = self.control & (ctrl::MODE_COUNTER | ctrl::TRIGGER_WAIT)
                == ctrl::TRIGGER_WAIT;
        } else {
            let old = self.control;
            self.control = data;
            if data & ctrl::EI == 0 {
                self.daisy.cancel();
            }
            if data & ctrl::RESET != 0 && old & ctrl::RESET == 0 {
                log::debug!("ctc: channel reset, control {data:#04X}");
            }
        }
    }

    /// Current value of the down counter (0 while at 256).
    pub fn counter(&self) -> u8 {
        self.down_counter as u8
    }
}

pub struct Z80Ctc {
    pub channels: [CtcChannel; NUM_CHANNELS],
}

impl Default for Z80Ctc {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80Ctc {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| CtcChannel::new()),
        }
    }

    /// Hardware reset: every channel stops and drops its interrupt state.
    pub fn reset(&mut self) {
        for chn in &mut self.channels {
            let vector = chn.daisy.vector;
            *chn = CtcChannel::new();
            chn.daisy.vector = vector;
        }
    }

    /// Read the down counter of channel `offset & 3`.
    pub fn read(&mut self, offset: u8) -> u8 {
        self.channels[(offset & 0x03) as usize].counter()
    }

    /// Write a control word, time constant or (channel 0) interrupt vector.
    ///
    /// | Byte                       | Meaning                          |
    /// |----------------------------|----------------------------------|
    /// | previous byte had CONST    | time constant (0 = 256)          |
    /// | bit 0 = 1                  | control word                     |
    /// | bit 0 = 0, channel 0       | vector for all four channels     |
    pub fn write(&mut self, offset: u8, data: u8) {
        let ch = (offset & 0x03) as usize;
        if self.channels[ch].control & ctrl::CONST_FOLLOWS == 0 && data & ctrl::CONTROL == 0 {
            if ch == 0 {
                for (i, chn) in self.channels.iter_mut().enumerate() {
                    chn.daisy.vector = (data & 0xF8) | ((i as u8) << 1);
                }
            }
            return;
        }
        self.channels[ch].write(data);
    }

    /// Drive the CLK/TRG input of a channel. Counting happens on the active
    /// edge selected by the channel's control word.
    pub fn trigger(&mut self, ch: usize, level: bool) {
        let chn = &mut self.channels[ch];
        let rising = chn.control & ctrl::EDGE_RISING != 0;
        let edge = level != chn.trigger && level == rising;
        chn.trigger = level;
        if !edge || chn.control & ctrl::RESET != 0 {
            return;
        }
        if chn.waiting_for_trigger {
            chn.waiting_for_trigger = false;
        } else if chn.control & ctrl::MODE_COUNTER != 0 {
            chn.count();
        }
    }

    /// ZC/TO output of a channel during the last tick.
    pub fn zcto(&self, ch: usize) -> bool {
        self.channels[ch].zcto
    }

    /// One system clock tick. `selected` is the chip-enable decoded by the
    /// system from the address bus. Runs the timers, performs a register
    /// access on a selected I/O cycle and takes part in the daisy chain.
    pub fn tick(&mut self, mut pins: Z80Pins, selected: bool) -> Z80Pins {
        for chn in &mut self.channels {
            chn.zcto = false;
            if chn.control & ctrl::MODE_COUNTER == 0 && chn.running() {
                let mask = if chn.control & ctrl::PRESCALER_256 != 0 { 0xFF } else { 0x0F };
                chn.prescaler = chn.prescaler.wrapping_add(1);
                if chn.prescaler & mask == 0 {
                    chn.count();
                }
            }
        }

        if selected {
            let offset = pins.addr() as u8;
            if pins.is_io_read() {
                pins.set_data(self.read(offset));
            } else if pins.is_io_write() {
                self.write(offset, pins.data());
            }
        }

        for chn in &mut self.channels {
            pins = chn.daisy.tick(pins);
        }
        pins
    }
}
