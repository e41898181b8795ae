/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "Cursor Left", "Stop").
    pub name: &'static str,
}

/// Receives mono audio samples in the -1.0..=1.0 range, one buffer at a time.
pub type AudioCallback = Box<dyn FnMut(&[f32])>;

/// Machine-agnostic interface for emulated systems.
///
/// Each system (Z9001, the simple development boards, ...) implements this
/// trait to give the frontend a uniform surface. The frontend drives time,
/// forwards input and pulls out pixels; it knows nothing about the chips
/// inside.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run for `micros` of emulated time. Returns the clock ticks actually
    /// executed, which may exceed the budget by the tail of the last
    /// instruction.
    fn exec(&mut self, micros: u32) -> u32;

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&mut self, buffer: &mut [u8]);

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    /// `pressed` is true for key-down, false for key-up.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Character key pressed, as ASCII. Machines without a keyboard ignore it.
    fn key_down(&mut self, _key: u8) {}

    fn key_up(&mut self, _key: u8) {}

    /// Screen or console contents as text, one line per row, for machines
    /// whose output is character based. Headless frontends print this
    /// instead of approximating the pixels.
    fn text_screen(&self) -> Option<String> {
        None
    }

    /// The instruction the CPU executes next, as `PC  MNEMONIC`. Called
    /// between `exec` calls, where the CPU sits on an instruction boundary.
    fn trace_line(&self) -> Option<String> {
        None
    }

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Copy a program image to `addr` and, with `start`, jump there.
    fn quickload(&mut self, data: &[u8], addr: u16, start: Option<u16>) -> Result<(), QuickloadError>;

    /// Refresh rate of the emulated display.
    fn frame_rate_hz(&self) -> f64 {
        50.0
    }

    fn set_audio_callback(&mut self, _callback: AudioCallback) {}
}

/// A quickload image that does not fit the address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickloadError {
    pub addr: u16,
    pub len: usize,
}

impl std::fmt::Display for QuickloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "image of {} bytes does not fit at {:#06X}",
            self.len, self.addr
        )
    }
}

impl std::error::Error for QuickloadError {}

impl QuickloadError {
    /// Check that `len` bytes starting at `addr` stay below 64 KiB.
    pub fn check(addr: u16, len: usize) -> Result<(), Self> {
        if addr as usize + len > 0x10000 {
            Err(Self { addr, len })
        } else {
            Ok(())
        }
    }
}
