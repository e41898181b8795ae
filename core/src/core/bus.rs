/// Resolves one bus request per clock tick.
///
/// A CPU hands the responder the pin word it emitted for the current tick.
/// The responder decodes the request (memory, I/O, interrupt acknowledge,
/// refresh), performs it, and returns the pin word the CPU should see on its
/// next tick: read data on the data bus plus any input lines (WAIT, INT,
/// NMI, RDY, ...) the environment drives.
///
/// Input lines are level signals owned by the responder. The CPU never
/// carries them over from one tick to the next, so a responder that wants
/// INT held must set it in every response.
pub trait Bus {
    type Pins: Copy;

    fn respond(&mut self, pins: Self::Pins) -> Self::Pins;
}
