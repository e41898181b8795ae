pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{AudioCallback, InputButton, Machine, QuickloadError};
    pub use crate::core::{Bus, Daisy, FrameClock, M6502Pins, Memory, Z80Pins};
    pub use crate::cpu::Cpu;
}
