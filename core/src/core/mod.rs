pub mod bus;
pub mod clock;
pub mod daisy;
pub mod machine;
pub mod memory;
pub mod pins;

pub use bus::Bus;
pub use clock::FrameClock;
pub use daisy::Daisy;
pub use machine::{AudioCallback, InputButton, Machine, QuickloadError};
pub use memory::{Memory, StoreId};
pub use pins::{M6502Pins, Z80Pins};
