pub mod console;
pub mod registry;
pub mod rom_loader;
pub mod simple6502;
pub mod simplez80;
pub mod z9001;

pub use registry::MachineEntry;
pub use rom_loader::{RomLoadError, RomSet};
pub use simple6502::Simple6502System;
pub use simplez80::{SimpleZ80Config, SimpleZ80System};
pub use z9001::{Z9001Config, Z9001Kind, Z9001System};
