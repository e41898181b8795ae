//! NEC uPD765 floppy disk controller.
//!
//! The controller is driven entirely through two registers: the main status
//! register (read-only) and the data register. Every command runs through
//! the same phases: the command bytes are written to the data register,
//! execution transfers sector data one byte per data register access (no
//! DMA), and the result bytes are read back. Seeks complete immediately and
//! leave a status for SENSE INTERRUPT STATUS to collect.
//!
//! Register addressing: address bit 0 selects the data register (set) or the
//! main status register.

use super::fdd::{Fdd, SectorId};
use crate::core::Z80Pins;

pub const NUM_DRIVES: usize = 4;

/// Main status register bits.
pub mod msr {
    /// Request for master: the data register is ready.
    pub const RQM: u8 = 0x80;
    /// Data direction: controller to CPU (set).
    pub const DIO: u8 = 0x40;
    /// Execution phase in non-DMA mode.
    pub const EXM: u8 = 0x20;
    /// Controller busy with a command.
    pub const CB: u8 = 0x10;
    /// Drive 0..3 seeking (bits 0..3).
    pub const DRIVE_BUSY: u8 = 0x0F;
}

pub mod st0 {
    pub const ABNORMAL: u8 = 0x40;
    pub const INVALID: u8 = 0x80;
    pub const SEEK_END: u8 = 0x20;
    pub const EQUIPMENT_CHECK: u8 = 0x10;
    pub const NOT_READY: u8 = 0x08;
    pub const HEAD: u8 = 0x04;
}

pub mod st1 {
    pub const END_OF_CYLINDER: u8 = 0x80;
    pub const DATA_ERROR: u8 = 0x20;
    pub const NO_DATA: u8 = 0x04;
    pub const NOT_WRITABLE: u8 = 0x02;
    pub const MISSING_ADDRESS_MARK: u8 = 0x01;
}

pub mod st3 {
    pub const FAULT: u8 = 0x80;
    pub const WRITE_PROTECTED: u8 = 0x40;
    pub const READY: u8 = 0x20;
    pub const TRACK_0: u8 = 0x10;
    pub const TWO_SIDE: u8 = 0x08;
    pub const HEAD: u8 = 0x04;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Command,
    Execution,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Specify,
    SenseDriveStatus,
    WriteData,
    ReadData,
    Recalibrate,
    SenseInterruptStatus,
    ReadId,
    FormatTrack,
    Seek,
    Invalid,
}

impl Command {
    fn decode(byte: u8) -> Self {
        match byte & 0x1F {
            0x03 => Command::Specify,
            0x04 => Command::SenseDriveStatus,
            0x05 => Command::WriteData,
            0x06 => Command::ReadData,
            0x07 => Command::Recalibrate,
            0x08 => Command::SenseInterruptStatus,
            0x0A => Command::ReadId,
            0x0D => Command::FormatTrack,
            0x0F => Command::Seek,
            _ => Command::Invalid,
        }
    }

    /// Second command byte carries HD/US1/US0.
    fn selects_unit(self) -> bool {
        !matches!(
            self,
            Command::Specify | Command::SenseInterruptStatus | Command::Invalid
        )
    }

    /// Command bytes including the opcode.
    fn len(self) -> usize {
        match self {
            Command::Specify => 3,
            Command::SenseDriveStatus => 2,
            Command::WriteData | Command::ReadData => 9,
            Command::Recalibrate => 2,
            Command::SenseInterruptStatus => 1,
            Command::ReadId => 2,
            Command::FormatTrack => 6,
            Command::Seek => 3,
            Command::Invalid => 1,
        }
    }
}

pub struct Upd765 {
    pub drives: [Fdd; NUM_DRIVES],
    phase: Phase,
    command: Command,
    fifo: [u8; 9],
    fifo_len: usize,
    result: [u8; 7],
    result_len: usize,
    result_pos: usize,

    // Sector transfer in progress
    drive: usize,
    side: u8,
    id: SectorId,
    eot: u8,
    sector: usize,
    data_pos: usize,
    data_len: usize,
    format_left: u8,
    format_fill: u8,

    /// ST0 waiting for SENSE INTERRUPT STATUS, per drive.
    seek_status: [Option<u8>; NUM_DRIVES],
    /// Step rate / head unload and head load / non-DMA bytes from SPECIFY.
    pub specify: [u8; 2],
}

impl Default for Upd765 {
    fn default() -> Self {
        Self::new()
    }
}

impl Upd765 {
    pub fn new() -> Self {
        Self {
            drives: Default::default(),
            phase: Phase::Idle,
            command: Command::Invalid,
            fifo: [0; 9],
            fifo_len: 0,
            result: [0; 7],
            result_len: 0,
            result_pos: 0,
            drive: 0,
            side: 0,
            id: SectorId { c: 0, h: 0, r: 0, n: 0 },
            eot: 0,
            sector: 0,
            data_pos: 0,
            data_len: 0,
            format_left: 0,
            format_fill: 0,
            seek_status: [None; NUM_DRIVES],
            specify: [0; 2],
        }
    }

    /// Controller reset. Drives and discs are left alone.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.fifo_len = 0;
        self.result_len = 0;
        self.result_pos = 0;
        self.seek_status = [None; NUM_DRIVES];
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive and head on the US and HD outputs, as set by the last command
    /// that addressed a unit.
    pub fn selected_unit(&self) -> (usize, u8) {
        (self.drive, self.side)
    }

    pub fn drive_mut(&mut self, index: usize) -> &mut Fdd {
        &mut self.drives[index]
    }

    /// Main status register.
    pub fn status(&self) -> u8 {
        let busy = self
            .seek_status
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .fold(0u8, |acc, (i, _)| acc | (1 << i));
        busy | match self.phase {
            Phase::Idle => msr::RQM,
            Phase::Command => msr::RQM | msr::CB,
            Phase::Execution => {
                let dio = if self.command == Command::ReadData { msr::DIO } else { 0 };
                msr::RQM | msr::EXM | msr::CB | dio
            }
            Phase::Result => msr::RQM | msr::DIO | msr::CB,
        }
    }

    pub fn read(&mut self, offset: u8) -> u8 {
        if offset & 0x01 == 0 {
            self.status()
        } else {
            self.read_data()
        }
    }

    pub fn write(&mut self, offset: u8, data: u8) {
        if offset & 0x01 != 0 {
            self.write_data(data);
        }
    }

    /// One bus tick: register access when `selected` by the system decoder.
    pub fn tick(&mut self, mut pins: Z80Pins, selected: bool) -> Z80Pins {
        if selected {
            let offset = pins.addr() as u8;
            if pins.is_io_read() {
                pins.set_data(self.read(offset));
            } else if pins.is_io_write() {
                self.write(offset, pins.data());
            }
        }
        pins
    }

    /// Data register read.
    pub fn read_data(&mut self) -> u8 {
        match self.phase {
            Phase::Result => {
                let data = self.result[self.result_pos];
                self.result_pos += 1;
                if self.result_pos >= self.result_len {
                    self.phase = Phase::Idle;
                }
                data
            }
            Phase::Execution if self.command == Command::ReadData => {
                let data = self
                    .drives[self.drive]
                    .sector(self.side, self.sector)
                    .and_then(|s| s.data.get(self.data_pos).copied())
                    .unwrap_or(0xFF);
                self.data_pos += 1;
                if self.data_pos >= self.data_len {
                    self.next_sector();
                }
                data
            }
            _ => 0xFF,
        }
    }

    /// Data register write.
    pub fn write_data(&mut self, data: u8) {
        match self.phase {
            Phase::Idle => {
                self.command = Command::decode(data);
                self.fifo[0] = data;
                self.fifo_len = 1;
                if self.command == Command::Invalid {
                    log::debug!("upd765: invalid command {data:#04X}");
                    self.finish(&[st0::INVALID]);
                } else if self.command.len() == 1 {
                    self.execute();
                } else {
                    self.phase = Phase::Command;
                }
            }
            Phase::Command => {
                self.fifo[self.fifo_len] = data;
                self.fifo_len += 1;
                if self.fifo_len == self.command.len() {
                    self.execute();
                }
            }
            Phase::Execution => match self.command {
                Command::WriteData => self.write_sector_byte(data),
                Command::FormatTrack => self.format_byte(data),
                _ => {}
            },
            Phase::Result => log::trace!("upd765: write {data:#04X} during result phase ignored"),
        }
    }

    /// TC input: end a data transfer before EOT with a normal result. The
    /// sector in progress is finished, so R points past it; on a sector
    /// boundary R is already the next one.
    pub fn terminal_count(&mut self) {
        if self.phase == Phase::Execution
            && matches!(self.command, Command::ReadData | Command::WriteData)
        {
            let r = if self.data_pos == 0 { self.id.r } else { self.id.r.wrapping_add(1) };
            let id = SectorId { r, ..self.id };
            self.transfer_result(self.head_unit(), 0, id);
        }
    }

    fn finish(&mut self, result: &[u8]) {
        self.result[..result.len()].copy_from_slice(result);
        self.result_len = result.len();
        self.result_pos = 0;
        self.phase = if result.is_empty() { Phase::Idle } else { Phase::Result };
    }

    fn head_unit(&self) -> u8 {
        (self.side << 2) | self.drive as u8
    }

    fn transfer_result(&mut self, st0: u8, st1: u8, id: SectorId) {
        self.finish(&[st0, st1, 0, id.c, id.h, id.r, id.n]);
    }

    fn execute(&mut self) {
        log::debug!("upd765: command {:?} {:02X?}", self.command, &self.fifo[..self.fifo_len]);
        if self.command.selects_unit() {
            let hd_us = self.fifo[1];
            self.drive = (hd_us & 0x03) as usize;
            self.side = (hd_us >> 2) & 0x01;
        }

        match self.command {
            Command::Specify => {
                self.specify = [self.fifo[1], self.fifo[2]];
                self.finish(&[]);
            }
            Command::SenseDriveStatus => {
                let fdd = &self.drives[self.drive];
                let mut st3 = self.head_unit();
                if let Some(disc) = &fdd.disc {
                    st3 |= st3::READY;
                    if disc.write_protected {
                        st3 |= st3::WRITE_PROTECTED;
                    }
                    if disc.sides > 1 {
                        st3 |= st3::TWO_SIDE;
                    }
                }
                if fdd.track == 0 {
                    st3 |= st3::TRACK_0;
                }
                self.finish(&[st3]);
            }
            Command::ReadData | Command::WriteData => self.start_transfer(),
            Command::Recalibrate | Command::Seek => {
                let target = if self.command == Command::Seek { self.fifo[2] } else { 0 };
                let fdd = &mut self.drives[self.drive];
                fdd.seek(target);
                let mut status = st0::SEEK_END | self.drive as u8;
                if !fdd.is_ready() {
                    status |= st0::ABNORMAL | st0::NOT_READY;
                }
                self.seek_status[self.drive] = Some(status);
                self.finish(&[]);
            }
            Command::SenseInterruptStatus => {
                let pending = self
                    .seek_status
                    .iter()
                    .position(Option::is_some);
                match pending {
                    Some(drive) => {
                        let st0 = self.seek_status[drive].take().unwrap_or_default();
                        let pcn = self.drives[drive].track;
                        self.finish(&[st0, pcn]);
                    }
                    None => self.finish(&[st0::INVALID]),
                }
            }
            Command::ReadId => {
                let hu = self.head_unit();
                let track = self.drives[self.drive].track;
                let missing = SectorId { c: track, h: self.side, r: 0, n: 0 };
                if !self.drives[self.drive].is_ready() {
                    self.transfer_result(st0::ABNORMAL | st0::NOT_READY | hu, 0, missing);
                } else {
                    match self.drives[self.drive].next_id(self.side) {
                        Some(id) => self.transfer_result(hu, 0, id),
                        None => self.transfer_result(
                            st0::ABNORMAL | hu,
                            st1::MISSING_ADDRESS_MARK,
                            missing,
                        ),
                    }
                }
            }
            Command::FormatTrack => self.start_format(),
            Command::Invalid => self.finish(&[st0::INVALID]),
        }
    }

    fn start_transfer(&mut self) {
        self.id = SectorId {
            c: self.fifo[2],
            h: self.fifo[3],
            r: self.fifo[4],
            n: self.fifo[5],
        };
        self.eot = self.fifo[6];
        let hu = self.head_unit();
        let fdd = &self.drives[self.drive];
        let Some(disc) = &fdd.disc else {
            self.transfer_result(st0::ABNORMAL | st0::NOT_READY | hu, 0, self.id);
            return;
        };
        if self.command == Command::WriteData && disc.write_protected {
            self.transfer_result(st0::ABNORMAL | hu, st1::NOT_WRITABLE, self.id);
            return;
        }
        self.seek_sector();
    }

    /// Locate `self.id` on the current track and enter execution, or
    /// terminate with NO DATA.
    fn seek_sector(&mut self) {
        match self.drives[self.drive].find_sector(self.side, self.id) {
            Some(index) => {
                let len = self.drives[self.drive]
                    .sector(self.side, index)
                    .map_or(0, |s| s.data.len());
                self.sector = index;
                self.data_pos = 0;
                self.data_len = if self.id.n == 0 {
                    len.min(self.fifo[8] as usize)
                } else {
                    len
                };
                self.phase = Phase::Execution;
                log::trace!("upd765: sector {:?} found, {} bytes", self.id, self.data_len);
            }
            None => {
                log::trace!("upd765: sector {:?} not found", self.id);
                let hu = self.head_unit();
                self.transfer_result(st0::ABNORMAL | hu, st1::NO_DATA, self.id);
            }
        }
    }

    fn next_sector(&mut self) {
        let hu = self.head_unit();
        if self.id.r == self.eot {
            // no TC seen: the controller runs off the end of the cylinder
            let id = SectorId {
                c: self.id.c.wrapping_add(1),
                r: 1,
                ..self.id
            };
            self.transfer_result(st0::ABNORMAL | hu, st1::END_OF_CYLINDER, id);
        } else {
            self.id.r = self.id.r.wrapping_add(1);
            self.seek_sector();
        }
    }

    fn write_sector_byte(&mut self, data: u8) {
        let (side, index, pos) = (self.side, self.sector, self.data_pos);
        if let Some(byte) = self.drives[self.drive]
            .sector_mut(side, index)
            .and_then(|s| s.data.get_mut(pos))
        {
            *byte = data;
        }
        self.data_pos += 1;
        if self.data_pos >= self.data_len {
            self.next_sector();
        }
    }

    fn start_format(&mut self) {
        let hu = self.head_unit();
        self.id = SectorId { c: 0, h: 0, r: 0, n: self.fifo[2] };
        self.format_left = self.fifo[3];
        self.format_fill = self.fifo[5];
        self.data_pos = 0;
        let fdd = &mut self.drives[self.drive];
        let track = fdd.track;
        let Some(disc) = fdd.disc.as_mut() else {
            self.transfer_result(st0::ABNORMAL | st0::NOT_READY | hu, 0, self.id);
            return;
        };
        if disc.write_protected {
            self.transfer_result(st0::ABNORMAL | hu, st1::NOT_WRITABLE, self.id);
            return;
        }
        // formatting past the last track grows the disc
        while disc.track(track, self.side).is_none() && self.side < disc.sides {
            disc.tracks.push(Default::default());
        }
        if let Some(t) = disc.track_mut(track, self.side) {
            t.sectors.clear();
        }
        if self.format_left == 0 {
            self.transfer_result(hu, 0, self.id);
        } else {
            self.phase = Phase::Execution;
        }
    }

    /// FORMAT TRACK execution: four ID bytes (C, H, R, N) per sector.
    fn format_byte(&mut self, data: u8) {
        match self.data_pos {
            0 => self.id.c = data,
            1 => self.id.h = data,
            2 => self.id.r = data,
            _ => self.id.n = data,
        }
        self.data_pos += 1;
        if self.data_pos < 4 {
            return;
        }
        self.data_pos = 0;
        let sector = super::fdd::Sector {
            id: self.id,
            data: vec![self.format_fill; SectorId::size(self.id.n)],
        };
        let fdd = &mut self.drives[self.drive];
        let track = fdd.track;
        if let Some(t) = fdd.disc.as_mut().and_then(|d| d.track_mut(track, self.side)) {
            t.sectors.push(sector);
        }
        self.format_left -= 1;
        if self.format_left == 0 {
            let hu = self.head_unit();
            self.transfer_result(hu, 0, self.id);
        }
    }
}
