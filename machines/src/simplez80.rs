use tickwork_core::core::machine::{InputButton, Machine, QuickloadError};
use tickwork_core::core::{Bus, FrameClock, Memory, StoreId, Z80Pins};
use tickwork_core::cpu::z80::dasm;
use tickwork_core::cpu::{Cpu, Z80};
use tickwork_core::device::{Disc, Upd765, Z80Ctc, Z80Pio};

use crate::console::Console;
use crate::registry::MachineEntry;
use crate::rom_loader::{RomEntry, RomLoadError, RomRegion, RomSet};

/// Boot ROM, overlaid on the bottom 16KB of RAM after reset.
pub static SIMPLEZ80_ROM: RomRegion = RomRegion {
    size: 0x4000,
    entries: &[RomEntry {
        name: "simplez80.rom",
        size: 0x4000,
        offset: 0x0000,
    }],
};

// I/O map, decoded on the low address byte:
//   00-03  CTC
//   04-07  PIO
//   08     FDC main status (read)
//   09     FDC data
//   0A     FDC terminal count (write)
//   0C     ROM control: bit 0 set unmaps the boot ROM
//   0D     console data
//   0E     console status
const PORT_CTC: u8 = 0x00;
const PORT_PIO: u8 = 0x04;
const PORT_FDC: u8 = 0x08;
const PORT_FDC_TC: u8 = 0x0A;
const PORT_ROM_CTRL: u8 = 0x0C;
const PORT_CONSOLE_DATA: u8 = 0x0D;
const PORT_CONSOLE_STATUS: u8 = 0x0E;

const ROM_LAYER: usize = 0;
const RAM_LAYER: usize = 1;

const CONSOLE_ROWS: usize = 24;

#[derive(Debug, Clone)]
pub struct SimpleZ80Config {
    pub freq_hz: u32,
    /// Gate-array style wait generator: memory and I/O cycles are held
    /// until the next 4-tick boundary.
    pub wait_states: bool,
}

impl Default for SimpleZ80Config {
    fn default() -> Self {
        Self {
            freq_hz: 4_000_000,
            wait_states: false,
        }
    }
}

struct Board {
    mem: Memory,
    ram: StoreId,
    rom: Option<StoreId>,
    rom_enabled: bool,
    ctc: Z80Ctc,
    pio: Z80Pio,
    fdc: Upd765,
    console: Console,
    wait_states: bool,
    /// Free-running tick counter, phase of the wait generator.
    ticks: u64,
    in_cycle: bool,
}

impl Board {
    fn map_rom(&mut self, enabled: bool) {
        self.rom_enabled = enabled;
        match self.rom {
            // reads come from ROM, writes land in the RAM underneath
            Some(rom) if enabled => self.mem.map_rw(
                ROM_LAYER,
                0x0000,
                SIMPLEZ80_ROM.size,
                Some((rom, 0)),
                Some((self.ram, 0)),
            ),
            _ => self.mem.unmap_layer(ROM_LAYER),
        }
    }

    fn io_read(&mut self, port: u8) -> Option<u8> {
        match port {
            PORT_ROM_CTRL => Some(!self.rom_enabled as u8),
            PORT_CONSOLE_DATA => Some(self.console.read()),
            PORT_CONSOLE_STATUS => Some(self.console.status()),
            _ => None,
        }
    }

    fn io_write(&mut self, port: u8, data: u8) {
        match port {
            PORT_FDC_TC => self.fdc.terminal_count(),
            PORT_ROM_CTRL => self.map_rom(data & 0x01 == 0),
            PORT_CONSOLE_DATA => self.console.write(data),
            _ => {}
        }
    }
}

impl Bus for Board {
    type Pins = Z80Pins;

    fn respond(&mut self, mut pins: Z80Pins) -> Z80Pins {
        let phase = self.ticks & 3;
        self.ticks = self.ticks.wrapping_add(1);

        let addr = pins.addr();
        if pins.is_mem_read() {
            pins.set_data(self.mem.read(addr));
        } else if pins.is_mem_write() {
            self.mem.write(addr, pins.data());
        }

        let io = pins.contains(Z80Pins::IORQ) && !pins.contains(Z80Pins::M1);
        let port = addr as u8;
        if io && pins.is_io_read() {
            if let Some(data) = self.io_read(port) {
                pins.set_data(data);
            }
        } else if io && pins.is_io_write() {
            self.io_write(port, pins.data());
        }

        pins |= Z80Pins::IEIO;
        pins = self.ctc.tick(pins, io && port & 0xFC == PORT_CTC);
        pins = self.pio.tick(pins, io && port & 0xFC == PORT_PIO);
        pins -= Z80Pins::IEIO;
        pins = self.fdc.tick(pins, io && port & 0xFE == PORT_FDC);

        if self.wait_states {
            let start = (pins.contains(Z80Pins::MREQ)
                && !pins.intersects(Z80Pins::RFSH | Z80Pins::WR))
                || pins.contains(Z80Pins::IORQ);
            if start {
                self.in_cycle = true;
            }
            if self.in_cycle {
                if phase == 3 {
                    self.in_cycle = false;
                } else {
                    pins |= Z80Pins::WAIT;
                }
            }
        }
        pins
    }
}

/// Z80 development board: 64KB RAM, boot ROM overlay, CTC, PIO, a uPD765
/// with one drive and a console port.
pub struct SimpleZ80System {
    cpu: Z80,
    board: Board,
    clock: FrameClock,
}

impl SimpleZ80System {
    pub fn new(config: SimpleZ80Config, rom_set: &RomSet) -> Result<Self, RomLoadError> {
        let mut mem = Memory::new();
        let ram = mem.add_store(vec![0; 0x10000]);
        mem.map_ram(RAM_LAYER, 0x0000, 0x10000, ram, 0);
        let rom = SIMPLEZ80_ROM
            .load_optional(rom_set)?
            .map(|data| mem.add_store(data));

        let mut board = Board {
            mem,
            ram,
            rom,
            rom_enabled: false,
            ctc: Z80Ctc::new(),
            pio: Z80Pio::new(),
            fdc: Upd765::new(),
            console: Console::new(),
            wait_states: config.wait_states,
            ticks: 0,
            in_cycle: false,
        };
        board.map_rom(true);
        let mut sys = Self {
            cpu: Z80::new(),
            board,
            clock: FrameClock::new(config.freq_hz),
        };
        sys.reset();
        Ok(sys)
    }

    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    /// Run one instruction. Returns the ticks it took.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.board)
    }

    pub fn read_memory(&self, addr: u16) -> u8 {
        self.board.mem.read(addr)
    }

    pub fn set_rom_enabled(&mut self, enabled: bool) {
        self.board.map_rom(enabled);
    }

    pub fn insert_disc(&mut self, disc: Disc) {
        self.board.fdc.drive_mut(0).insert(disc);
    }

    pub fn eject_disc(&mut self) -> Option<Disc> {
        self.board.fdc.drive_mut(0).eject()
    }

    pub fn fdc(&self) -> &Upd765 {
        &self.board.fdc
    }

    pub fn ctc(&self) -> &Z80Ctc {
        &self.board.ctc
    }

    pub fn pio_mut(&mut self) -> &mut Z80Pio {
        &mut self.board.pio
    }
}

impl Machine for SimpleZ80System {
    /// No video hardware; output goes through the console.
    fn display_size(&self) -> (u32, u32) {
        (0, 0)
    }

    fn exec(&mut self, micros: u32) -> u32 {
        let budget = self.clock.ticks_to_run(micros);
        let ticks = self.cpu.exec(&mut self.board, budget);
        self.clock.ticks_executed(ticks);
        ticks
    }

    fn render_frame(&mut self, _buffer: &mut [u8]) {}

    fn set_input(&mut self, _button: u8, _pressed: bool) {}

    fn input_map(&self) -> &[InputButton] {
        &[]
    }

    fn key_down(&mut self, key: u8) {
        self.board.console.push_key(key);
    }

    fn trace_line(&self) -> Option<String> {
        let pc = self.cpu.pc;
        let (text, _) = dasm::disassemble(pc, |addr| self.board.mem.read(addr));
        Some(format!("{pc:04X}  {text}"))
    }

    fn text_screen(&self) -> Option<String> {
        Some(self.board.console.text(CONSOLE_ROWS))
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.board.ctc.reset();
        self.board.pio.reset();
        self.board.fdc.reset();
        self.board.console.clear();
        self.board.map_rom(true);
        self.board.in_cycle = false;
    }

    fn quickload(&mut self, data: &[u8], addr: u16, start: Option<u16>) -> Result<(), QuickloadError> {
        if let Err(e) = QuickloadError::check(addr, data.len()) {
            log::warn!("simplez80: {e}");
            return Err(e);
        }
        // straight into RAM, even below the boot ROM
        let ram = self.board.mem.store_mut(self.board.ram);
        ram[addr as usize..addr as usize + data.len()].copy_from_slice(data);
        if let Some(start) = start {
            // a program started inside the ROM window takes over the machine
            if (start as usize) < SIMPLEZ80_ROM.size {
                self.board.map_rom(false);
            }
            self.cpu.prefetch(start);
        }
        Ok(())
    }
}

fn create(rom_set: &RomSet) -> Result<Box<dyn Machine>, RomLoadError> {
    Ok(Box::new(SimpleZ80System::new(SimpleZ80Config::default(), rom_set)?))
}

inventory::submit! {
    MachineEntry::new("simplez80", "simplez80", "Z80 development board with floppy", create)
}
