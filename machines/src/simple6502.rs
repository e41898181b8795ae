use tickwork_core::core::machine::{InputButton, Machine, QuickloadError};
use tickwork_core::core::{Bus, FrameClock, M6502Pins, Memory, StoreId};
use tickwork_core::cpu::m6502::dasm;
use tickwork_core::cpu::{Cpu, M6502};

use crate::console::Console;
use crate::registry::MachineEntry;
use crate::rom_loader::{RomEntry, RomLoadError, RomRegion, RomSet};

/// Monitor ROM at the top of memory; holds the vectors.
pub static SIMPLE6502_ROM: RomRegion = RomRegion {
    size: 0x2000,
    entries: &[RomEntry {
        name: "simple6502.rom",
        size: 0x2000,
        offset: 0x0000,
    }],
};

const ROM_ADDR: u16 = 0xE000;
const IO_PAGE: u16 = 0xD000;
const CONSOLE_DATA: u16 = 0xD000;
const CONSOLE_STATUS: u16 = 0xD001;

const CONSOLE_ROWS: usize = 24;
const FREQ_HZ: u32 = 1_000_000;

struct Board {
    mem: Memory,
    ram: StoreId,
    console: Console,
    irq: bool,
    nmi: bool,
}

impl Bus for Board {
    type Pins = M6502Pins;

    fn respond(&mut self, mut pins: M6502Pins) -> M6502Pins {
        let addr = pins.addr();
        if addr & 0xFF00 == IO_PAGE {
            if pins.is_read() {
                let data = match addr {
                    CONSOLE_DATA => self.console.read(),
                    CONSOLE_STATUS => self.console.status(),
                    _ => 0xFF,
                };
                pins.set_data(data);
            } else if addr == CONSOLE_DATA {
                self.console.write(pins.data());
            }
        } else if pins.is_read() {
            pins.set_data(self.mem.read(addr));
        } else {
            self.mem.write(addr, pins.data());
        }

        pins -= M6502Pins::IRQ | M6502Pins::NMI;
        if self.irq {
            pins |= M6502Pins::IRQ;
        }
        if self.nmi {
            pins |= M6502Pins::NMI;
        }
        pins
    }
}

/// 6502 development board: RAM, a console page at 0xD000 and a ROM at the
/// top of memory. IRQ and NMI are driven by the host.
pub struct Simple6502System {
    cpu: M6502,
    board: Board,
    clock: FrameClock,
}

impl Simple6502System {
    pub fn new(rom_set: &RomSet) -> Result<Self, RomLoadError> {
        let mut mem = Memory::new();
        let ram = mem.add_store(vec![0; 0x10000]);
        mem.map_ram(1, 0x0000, 0x10000, ram, 0);
        if let Some(rom) = SIMPLE6502_ROM.load_optional(rom_set)? {
            let size = rom.len();
            let store = mem.add_store(rom);
            mem.map_rom(0, ROM_ADDR, size, store, 0);
        }
        Ok(Self {
            cpu: M6502::new(),
            board: Board {
                mem,
                ram,
                console: Console::new(),
                irq: false,
                nmi: false,
            },
            clock: FrameClock::new(FREQ_HZ),
        })
    }

    pub fn cpu(&self) -> &M6502 {
        &self.cpu
    }

    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.board)
    }

    pub fn read_memory(&self, addr: u16) -> u8 {
        self.board.mem.read(addr)
    }

    /// IRQ line, level sensitive.
    pub fn set_irq(&mut self, level: bool) {
        self.board.irq = level;
    }

    /// NMI line; the CPU reacts to the rising edge.
    pub fn set_nmi(&mut self, level: bool) {
        self.board.nmi = level;
    }
}

impl Machine for Simple6502System {
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
        self.board.console.clear();
        self.board.irq = false;
        self.board.nmi = false;
    }

    fn quickload(&mut self, data: &[u8], addr: u16, start: Option<u16>) -> Result<(), QuickloadError> {
        if let Err(e) = QuickloadError::check(addr, data.len()) {
            log::warn!("simple6502: {e}");
            return Err(e);
        }
        let ram = self.board.mem.store_mut(self.board.ram);
        ram[addr as usize..addr as usize + data.len()].copy_from_slice(data);
        if let Some(start) = start {
            let request = self.cpu.prefetch(start);
            let response = self.board.respond(request);
            self.cpu.set_bus_pins(response);
        }
        Ok(())
    }
}

fn create(rom_set: &RomSet) -> Result<Box<dyn Machine>, RomLoadError> {
    Ok(Box::new(Simple6502System::new(rom_set)?))
}

inventory::submit! {
    MachineEntry::new("simple6502", "simple6502", "6502 development board", create)
}
