//! Floppy disk drive and an in-memory disc.
//!
//! A [`Disc`] is a plain side/track/sector structure built in code. Each
//! sector carries its CHRN identification as written in its ID field, which
//! does not have to agree with where it physically sits (copy protections
//! rely on that).

/// Head travel of the drive mechanics.
pub const MAX_TRACKS: u8 = 84;

/// ID field of a sector: cylinder, head, record, size code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
}

impl SectorId {
    /// Sector size in bytes for size code `n` (128 << n).
    pub fn size(n: u8) -> usize {
        128usize << n.min(7)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub id: SectorId,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    pub sectors: Vec<Sector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disc {
    pub sides: u8,
    /// Indexed by `track * sides + side`.
    pub tracks: Vec<Track>,
    pub write_protected: bool,
}

impl Disc {
    /// A disc with every track formatted the same way: sectors numbered
    /// from `first_sector`, size code `n`, data filled with `filler`.
    pub fn formatted(tracks: u8, sides: u8, sectors: u8, n: u8, first_sector: u8, filler: u8) -> Self {
        let sides = sides.max(1);
        let mut list = Vec::with_capacity(tracks as usize * sides as usize);
        for c in 0..tracks {
            for h in 0..sides {
                let sectors = (0..sectors)
                    .map(|i| Sector {
                        id: SectorId {
                            c,
                            h,
                            r: first_sector.wrapping_add(i),
                            n,
                        },
                        data: vec![filler; SectorId::size(n)],
                    })
                    .collect();
                list.push(Track { sectors });
            }
        }
        Self {
            sides,
            tracks: list,
            write_protected: false,
        }
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len() / self.sides as usize
    }

    pub fn track(&self, track: u8, side: u8) -> Option<&Track> {
        if side >= self.sides {
            return None;
        }
        self.tracks.get(track as usize * self.sides as usize + side as usize)
    }

    pub fn track_mut(&mut self, track: u8, side: u8) -> Option<&mut Track> {
        if side >= self.sides {
            return None;
        }
        self.tracks.get_mut(track as usize * self.sides as usize + side as usize)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fdd {
    pub motor_on: bool,
    /// Track the head is on.
    pub track: u8,
    pub disc: Option<Disc>,
    /// Index of the next sector passing under the head, for READ ID.
    pub(crate) sector_index: usize,
}

impl Fdd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, disc: Disc) {
        self.disc = Some(disc);
        self.sector_index = 0;
    }

    pub fn eject(&mut self) -> Option<Disc> {
        self.disc.take()
    }

    pub fn is_ready(&self) -> bool {
        self.disc.is_some()
    }

    /// Move the head. Tracks past the end of the disc simply have no sectors.
    pub fn seek(&mut self, track: u8) {
        self.track = track.min(MAX_TRACKS - 1);
        self.sector_index = 0;
    }

    /// Position of the sector with the given ID on the current track.
    pub fn find_sector(&self, side: u8, id: SectorId) -> Option<usize> {
        let track = self.disc.as_ref()?.track(self.track, side)?;
        track
            .sectors
            .iter()
            .position(|s| s.id.c == id.c && s.id.h == id.h && s.id.r == id.r && s.id.n == id.n)
    }

    pub fn sector(&self, side: u8, index: usize) -> Option<&Sector> {
        self.disc.as_ref()?.track(self.track, side)?.sectors.get(index)
    }

    pub fn sector_mut(&mut self, side: u8, index: usize) -> Option<&mut Sector> {
        let track = self.track;
        self.disc.as_mut()?.track_mut(track, side)?.sectors.get_mut(index)
    }

    /// ID of the next sector to pass the head, advancing the rotation.
    pub fn next_id(&mut self, side: u8) -> Option<SectorId> {
        let count = self.disc.as_ref()?.track(self.track, side)?.sectors.len();
        if count == 0 {
            return None;
        }
        let index = self.sector_index % count;
        self.sector_index = (index + 1) % count;
        self.sector(side, index).map(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_disc_layout() {
        let disc = Disc::formatted(40, 2, 9, 2, 0xC1, 0xE5);
        assert_eq!(disc.num_tracks(), 40);
        let track = disc.track(39, 1).unwrap();
        assert_eq!(track.sectors.len(), 9);
        assert_eq!(track.sectors[8].id, SectorId { c: 39, h: 1, r: 0xC9, n: 2 });
        assert_eq!(track.sectors[0].data.len(), 512);
        assert!(disc.track(40, 0).is_none());
        assert!(disc.track(0, 2).is_none());
    }

    #[test]
    fn find_sector_on_current_track() {
        let mut fdd = Fdd::new();
        fdd.insert(Disc::formatted(10, 1, 4, 1, 1, 0));
        fdd.seek(3);
        let id = SectorId { c: 3, h: 0, r: 2, n: 1 };
        assert_eq!(fdd.find_sector(0, id), Some(1));
        assert_eq!(fdd.find_sector(0, SectorId { c: 2, ..id }), None);
        assert_eq!(fdd.next_id(0).map(|id| id.r), Some(1));
        assert_eq!(fdd.next_id(0).map(|id| id.r), Some(2));
    }
}
