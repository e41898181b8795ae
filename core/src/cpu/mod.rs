use crate::core::Bus;

/// Tick-driven CPU interface shared by every core.
///
/// `tick` is the primitive: it receives the pin word produced by the bus in
/// response to the previous tick and returns the request for the current one.
/// `step` and `exec` are convenience drivers that keep the last response
/// inside the CPU and loop against a [`Bus`] responder.
pub trait Cpu {
    type Pins: Copy;

    /// Advance exactly one clock cycle.
    fn tick(&mut self, pins: Self::Pins) -> Self::Pins;

    /// True after the tick that completed an instruction (or an interrupt
    /// response, or the reset sequence).
    fn opdone(&self) -> bool;

    /// Put the CPU into its documented reset state. The reset sequence itself
    /// takes a few ticks and reports as one step.
    fn reset(&mut self);

    /// The bus response fed into the next `tick` by `step`/`exec`.
    fn bus_pins(&self) -> Self::Pins;

    fn set_bus_pins(&mut self, pins: Self::Pins);

    /// Run until the current instruction completes. Returns the ticks spent.
    fn step<B: Bus<Pins = Self::Pins> + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let mut ticks = 0;
        loop {
            let request = self.tick(self.bus_pins());
            let response = bus.respond(request);
            self.set_bus_pins(response);
            ticks += 1;
            if self.opdone() {
                return ticks;
            }
        }
    }

    /// Run for at least `ticks` cycles, always finishing the instruction in
    /// flight. Returns the ticks actually run.
    fn exec<B: Bus<Pins = Self::Pins> + ?Sized>(&mut self, bus: &mut B, ticks: u32) -> u32 {
        let mut executed = 0;
        while executed < ticks {
            executed += self.step(bus);
        }
        executed
    }
}

// Re-export state types
pub mod state;
pub use state::{CpuStateTrait, M6502State, Z80State};

pub mod m6502;
pub use m6502::M6502;

pub mod z80;
pub use z80::Z80;
