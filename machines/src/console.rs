//! Character console shared by the development boards: an input queue fed
//! by the host keyboard and an output transcript read back as text.

use std::collections::VecDeque;

/// Status register bits.
pub const STATUS_INPUT_READY: u8 = 0x01;
pub const STATUS_OUTPUT_READY: u8 = 0x02;

/// Output kept for display; older text is dropped.
const MAX_TRANSCRIPT: usize = 16 * 1024;

#[derive(Debug, Clone, Default)]
pub struct Console {
    input: VecDeque<u8>,
    output: String,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key typed on the host.
    pub fn push_key(&mut self, key: u8) {
        self.input.push_back(key);
    }

    /// Data register read: the next queued key, or 0 when none is waiting.
    pub fn read(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }

    pub fn write(&mut self, data: u8) {
        match data {
            b'\r' => {}
            0x08 => {
                self.output.pop();
            }
            b'\n' | 0x20..=0x7E => self.output.push(data as char),
            _ => log::trace!("console: dropped control byte {data:#04X}"),
        }
        if self.output.len() > MAX_TRANSCRIPT {
            let cut = self.output.len() - MAX_TRANSCRIPT / 2;
            let cut = self.output[cut..].find('\n').map_or(cut, |n| cut + n + 1);
            self.output.drain(..cut);
        }
    }

    pub fn status(&self) -> u8 {
        let ready = if self.input.is_empty() { 0 } else { STATUS_INPUT_READY };
        ready | STATUS_OUTPUT_READY
    }

    /// The last `rows` lines of output.
    pub fn text(&self, rows: usize) -> String {
        let lines: Vec<&str> = self.output.lines().collect();
        let start = lines.len().saturating_sub(rows);
        lines[start..].join("\n")
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}
