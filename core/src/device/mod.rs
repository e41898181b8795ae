pub mod beeper;
pub mod fdd;
pub mod kbd;
pub mod upd765;
pub mod z80ctc;
pub mod z80pio;

pub use beeper::Beeper;
pub use fdd::{Disc, Fdd, Sector, SectorId, Track};
pub use kbd::Kbd;
pub use upd765::Upd765;
pub use z80ctc::Z80Ctc;
pub use z80pio::Z80Pio;
