//! Z80 interrupt daisy chain, one [`Daisy`] per interrupt source.
//!
//! Devices are ticked in priority order. The `IEIO` bit of the pin word plays
//! both IEI and IEO: a device sees it as IEI and clears it for everything
//! downstream while it is requesting or being serviced. The system sets
//! `IEIO` before the first device and strips it before the CPU sees the pins.

use super::pins::Z80Pins;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Daisy {
    /// Byte driven on the data bus during interrupt acknowledge.
    pub vector: u8,
    requested: bool,
    in_service: bool,
}

impl Daisy {
    pub fn new(vector: u8) -> Self {
        Self {
            vector,
            ..Self::default()
        }
    }

    /// Latch an interrupt request. It stays pending until acknowledged.
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Drop a pending request that has not been acknowledged yet.
    pub fn cancel(&mut self) {
        self.requested = false;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    pub fn in_service(&self) -> bool {
        self.in_service
    }

    pub fn reset(&mut self) {
        self.requested = false;
        self.in_service = false;
    }

    pub fn tick(&mut self, mut pins: Z80Pins) -> Z80Pins {
        if !pins.contains(Z80Pins::IEIO) {
            return pins;
        }
        // RETI goes to the highest device in service and stops there
        if self.in_service && pins.contains(Z80Pins::RETI) {
            self.in_service = false;
            pins.remove(Z80Pins::RETI);
        }
        if self.requested {
            pins |= Z80Pins::INT;
            if pins.is_int_ack() {
                pins.set_data(self.vector);
                self.requested = false;
                self.in_service = true;
            }
        }
        if self.requested || self.in_service {
            pins.remove(Z80Pins::IEIO);
        }
        pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(devices: &mut [Daisy], pins: Z80Pins) -> Z80Pins {
        devices
            .iter_mut()
            .fold(pins | Z80Pins::IEIO, |p, d| d.tick(p))
            - Z80Pins::IEIO
    }

    #[test]
    fn idle_chain_passes_everything_through() {
        let mut devices = [Daisy::new(0x10), Daisy::new(0x20)];
        let pins = chain(&mut devices, Z80Pins::M1 | Z80Pins::IORQ);
        assert!(!pins.contains(Z80Pins::INT));
        assert_eq!(pins.data(), 0);
    }

    #[test]
    fn first_requesting_device_wins_acknowledge() {
        let mut devices = [Daisy::new(0x10), Daisy::new(0x20)];
        devices[1].request();
        assert!(chain(&mut devices, Z80Pins::empty()).contains(Z80Pins::INT));

        devices[0].request();
        let ack = chain(&mut devices, Z80Pins::M1 | Z80Pins::IORQ);
        assert_eq!(ack.data(), 0x10);
        assert!(devices[0].in_service());
        assert!(devices[1].is_requested());

        // the lower device is blocked while the upper one is in service
        assert!(!chain(&mut devices, Z80Pins::empty()).contains(Z80Pins::INT));
    }

    #[test]
    fn reti_releases_highest_in_service_device_only() {
        let mut devices = [Daisy::new(0x10), Daisy::new(0x20)];
        devices[1].request();
        chain(&mut devices, Z80Pins::M1 | Z80Pins::IORQ);
        assert!(devices[1].in_service());

        // nested: the higher device interrupts the lower one's handler
        devices[0].request();
        chain(&mut devices, Z80Pins::M1 | Z80Pins::IORQ);
        assert!(devices[0].in_service());

        chain(&mut devices, Z80Pins::M1 | Z80Pins::MREQ | Z80Pins::RD | Z80Pins::RETI);
        assert!(!devices[0].in_service());
        assert!(devices[1].in_service());

        chain(&mut devices, Z80Pins::M1 | Z80Pins::MREQ | Z80Pins::RD | Z80Pins::RETI);
        assert!(!devices[1].in_service());
    }
}
