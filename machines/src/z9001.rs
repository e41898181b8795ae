use tickwork_core::core::machine::{AudioCallback, InputButton, Machine, QuickloadError};
use tickwork_core::core::{Bus, FrameClock, Memory, StoreId, Z80Pins};
use tickwork_core::cpu::z80::dasm;
use tickwork_core::cpu::{Cpu, Z80};
use tickwork_core::device::beeper::DEFAULT_SAMPLE_RATE;
use tickwork_core::device::z80pio::{PORT_A, PORT_B};
use tickwork_core::device::{Beeper, Kbd, Z80Ctc, Z80Pio};

use crate::registry::MachineEntry;
use crate::rom_loader::{RomEntry, RomLoadError, RomRegion, RomSet};

// ---------------------------------------------------------------------------
// ROM definitions
// ---------------------------------------------------------------------------

/// Z9001 operating system 1.2: two 2KB halves at 0xF000.
pub static Z9001_OS_ROM: RomRegion = RomRegion {
    size: 0x1000,
    entries: &[
        RomEntry {
            name: "z9001_os12_1.bin",
            size: 0x0800,
            offset: 0x0000,
        },
        RomEntry {
            name: "z9001_os12_2.bin",
            size: 0x0800,
            offset: 0x0800,
        },
    ],
};

/// BASIC expansion module for the Z9001 (optional).
pub static Z9001_BASIC_ROM: RomRegion = RomRegion {
    size: 0x2800,
    entries: &[RomEntry {
        name: "z9001_basic_507_511.bin",
        size: 0x2800,
        offset: 0x0000,
    }],
};

pub static Z9001_FONT_ROM: RomRegion = RomRegion {
    size: 0x0800,
    entries: &[RomEntry {
        name: "z9001_font.bin",
        size: 0x0800,
        offset: 0x0000,
    }],
};

pub static KC87_OS_ROM: RomRegion = RomRegion {
    size: 0x1000,
    entries: &[RomEntry {
        name: "kc87_os_2.bin",
        size: 0x1000,
        offset: 0x0000,
    }],
};

/// Built-in BASIC of the KC87.
pub static KC87_BASIC_ROM: RomRegion = RomRegion {
    size: 0x2800,
    entries: &[RomEntry {
        name: "z9001_basic.bin",
        size: 0x2800,
        offset: 0x0000,
    }],
};

pub static KC87_FONT_ROM: RomRegion = RomRegion {
    size: 0x0800,
    entries: &[RomEntry {
        name: "kc87_font_2.bin",
        size: 0x0800,
        offset: 0x0000,
    }],
};

// ---------------------------------------------------------------------------
// Timing and layout
// ---------------------------------------------------------------------------
// CPU clock:   2.4576 MHz
// Display:     40x24 characters of 8x8 pixels, 50 Hz
// Blink:       flip-flop toggles every 16 frames

pub const FREQ_HZ: u32 = 2_457_600;
const FRAME_RATE_HZ: f64 = 50.0;
const BLINK_TICKS: u32 = FREQ_HZ / 50 * 16;

const COLUMNS: usize = 40;
const ROWS: usize = 24;
const SCREEN_WIDTH: u32 = (COLUMNS * 8) as u32;
const SCREEN_HEIGHT: u32 = (ROWS * 8) as u32;

const RAM_ADDR: u16 = 0x0000;
const RAM_SIZE: usize = 0x4000;
const RAM_MODULE_SIZE: usize = 0x4000;
const BASIC_ADDR: u16 = 0xC000;
const COLOR_RAM_ADDR: u16 = 0xE800;
const VIDEO_RAM_ADDR: u16 = 0xEC00;
const VIDEO_RAM_SIZE: usize = 0x0400;
const OS_ADDR: u16 = 0xF000;

// I/O decode on address bits 3..7
const PORT_CTC: u8 = 0x80;
const PORT_PIO1: u8 = 0x88;
const PORT_PIO2: u8 = 0x90;

/// PIO1 port A bit 7 gates CTC channel 0 onto the speaker.
const PIO1_BEEPER_ENABLE: u8 = 0x80;

/// 3-bit RGB palette: bit 0 red, bit 1 green, bit 2 blue.
const PALETTE: [(u8, u8, u8); 8] = [
    (0x00, 0x00, 0x00),
    (0xFF, 0x00, 0x00),
    (0x00, 0xFF, 0x00),
    (0xFF, 0xFF, 0x00),
    (0x00, 0x00, 0xFF),
    (0xFF, 0x00, 0xFF),
    (0x00, 0xFF, 0xFF),
    (0xFF, 0xFF, 0xFF),
];

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

pub const KEY_STOP: u8 = 0x03;
pub const KEY_LEFT: u8 = 0x08;
pub const KEY_RIGHT: u8 = 0x09;
pub const KEY_DOWN: u8 = 0x0A;
pub const KEY_UP: u8 = 0x0B;
pub const KEY_ENTER: u8 = 0x0D;
pub const KEY_PAUSE: u8 = 0x13;
pub const KEY_COLOR: u8 = 0x14;
pub const KEY_HOME: u8 = 0x19;
pub const KEY_INSERT: u8 = 0x1A;
pub const KEY_ESC: u8 = 0x1B;
pub const KEY_LIST: u8 = 0x1C;
pub const KEY_RUN: u8 = 0x1D;

const Z9001_INPUT_MAP: &[InputButton] = &[
    InputButton { id: KEY_ENTER, name: "Enter" },
    InputButton { id: KEY_STOP, name: "Stop" },
    InputButton { id: KEY_ESC, name: "Esc" },
    InputButton { id: KEY_LEFT, name: "Cursor Left" },
    InputButton { id: KEY_RIGHT, name: "Cursor Right" },
    InputButton { id: KEY_UP, name: "Cursor Up" },
    InputButton { id: KEY_DOWN, name: "Cursor Down" },
    InputButton { id: KEY_HOME, name: "Home" },
    InputButton { id: KEY_INSERT, name: "Insert" },
    InputButton { id: KEY_PAUSE, name: "Pause" },
    InputButton { id: KEY_COLOR, name: "Color" },
    InputButton { id: KEY_LIST, name: "List" },
    InputButton { id: KEY_RUN, name: "Run" },
    InputButton { id: b' ', name: "Space" },
];

/// 8x8 matrix, row = line, position in row = column. The second half is
/// the shifted layer. Spaces are unused crossings.
#[rustfmt::skip]
const KEYMAP: &[u8; 128] =
    b"01234567\
      89:;,=.?\
      @ABCDEFG\
      HIJKLMNO\
      PQRSTUVW\
      XYZ   ^ \
      \x20\x20\x20\x20\x20\x20\x20\x20\
      \x20\x20\x20\x20\x20\x20\x20\x20\
      _!\"#$%&'\
      ()*+<->/\
      \x20abcdefg\
      hijklmno\
      pqrstuvw\
      xyz\x20\x20\x20\x20\x20\
      \x20\x20\x20\x20\x20\x20\x20\x20\
      \x20\x20\x20\x20\x20\x20\x20\x20";

const SHIFT: u8 = 1 << 0;

fn keyboard() -> Kbd {
    let mut kbd = Kbd::new();
    kbd.register_modifier(0, 0, 7);
    for (layer, keys) in KEYMAP.chunks(64).enumerate() {
        let modifiers = if layer == 0 { 0 } else { SHIFT };
        for (i, &key) in keys.iter().enumerate() {
            if key != b' ' {
                kbd.register_key(key, i % 8, i / 8, modifiers);
            }
        }
    }
    for (key, column, line, modifiers) in [
        (KEY_STOP, 6, 6, 0),
        (KEY_ESC, 6, 6, SHIFT),
        (KEY_LEFT, 0, 6, 0),
        (KEY_RIGHT, 1, 6, 0),
        (KEY_DOWN, 2, 6, 0),
        (KEY_UP, 3, 6, 0),
        (KEY_ENTER, 5, 6, 0),
        (b' ', 7, 6, 0),
        (KEY_HOME, 3, 5, 0),
        (KEY_PAUSE, 4, 5, 0),
        (KEY_INSERT, 5, 5, 0),
        (KEY_COLOR, 1, 7, 0),
        (KEY_LIST, 4, 7, 0),
        (KEY_RUN, 5, 7, 0),
    ] {
        kbd.register_key(key, column, line, modifiers);
    }
    kbd
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Z9001Kind {
    /// Original model: monochrome display, BASIC as a plug-in module.
    #[default]
    Z9001,
    /// Later model: color RAM and built-in BASIC.
    Kc87,
}

#[derive(Debug, Clone)]
pub struct Z9001Config {
    pub kind: Z9001Kind,
    /// 16KB RAM module plugged in at 0x4000.
    pub ram_module: bool,
    pub sample_rate: u32,
}

impl Default for Z9001Config {
    fn default() -> Self {
        Self {
            kind: Z9001Kind::Z9001,
            ram_module: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

// ---------------------------------------------------------------------------
// System bus
// ---------------------------------------------------------------------------

/// Everything the CPU talks to. Owned separately from the CPU so it can be
/// handed to [`Cpu::exec`] as the bus.
struct Board {
    mem: Memory,
    video_ram: StoreId,
    color_ram: Option<StoreId>,
    ctc: Z80Ctc,
    pio1: Z80Pio,
    pio2: Z80Pio,
    beeper: Beeper,
    kbd: Kbd,
    blink_counter: u32,
    blink: bool,
}

impl Board {
    /// PIO2 port A drives the matrix columns, port B reads the lines, both
    /// active low. The OS also scans the other way round, so both
    /// directions are answered.
    fn scan_keyboard(&mut self) {
        let columns = !self.pio2.port_output(PORT_A);
        let lines = self.kbd.test_lines(columns as u16) as u8;
        self.pio2.set_port_input(PORT_B, !lines);

        let lines = !self.pio2.port_output(PORT_B);
        let columns = self.kbd.test_columns(lines as u16) as u8;
        self.pio2.set_port_input(PORT_A, !columns);
    }
}

impl Bus for Board {
    type Pins = Z80Pins;

    fn respond(&mut self, mut pins: Z80Pins) -> Z80Pins {
        let addr = pins.addr();
        if pins.is_mem_read() {
            pins.set_data(self.mem.read(addr));
        } else if pins.is_mem_write() {
            self.mem.write(addr, pins.data());
        }

        // daisy chain: CTC > PIO1 > PIO2
        let io = pins.contains(Z80Pins::IORQ) && !pins.contains(Z80Pins::M1);
        let port = addr as u8 & 0xF8;
        pins |= Z80Pins::IEIO;
        pins = self.ctc.tick(pins, io && port == PORT_CTC);
        pins = self.pio1.tick(pins, io && port == PORT_PIO1);
        pins = self.pio2.tick(pins, io && port == PORT_PIO2);
        pins -= Z80Pins::IEIO;
        if io && port == PORT_PIO2 && pins.is_io_write() {
            self.scan_keyboard();
        }

        // CTC channel 2 is cascaded into channel 3
        self.ctc.trigger(3, self.ctc.zcto(2));
        if self.ctc.zcto(0) && self.pio1.port_output(PORT_A) & PIO1_BEEPER_ENABLE != 0 {
            self.beeper.toggle();
        }
        self.beeper.tick();

        self.blink_counter += 1;
        if self.blink_counter >= BLINK_TICKS {
            self.blink_counter = 0;
            self.blink = !self.blink;
        }
        pins
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Robotron Z9001 / KC87 home computer (1984)
///
/// Hardware: U880 (Z80) @ 2.4576 MHz, Z80 CTC, two Z80 PIOs, 8x8 key
/// matrix on PIO2, speaker behind CTC channel 0.
/// Video: 40x24 text from a character ROM; the KC87 adds per-cell colors.
pub struct Z9001System {
    cpu: Z80,
    board: Board,
    clock: FrameClock,
    config: Z9001Config,
    font: Vec<u8>,
}

impl Z9001System {
    pub fn new(config: Z9001Config, rom_set: &RomSet) -> Result<Self, RomLoadError> {
        let (os, basic, font) = match config.kind {
            Z9001Kind::Z9001 => (
                Z9001_OS_ROM.load(rom_set)?,
                Z9001_BASIC_ROM.load_optional(rom_set)?,
                Z9001_FONT_ROM.load(rom_set)?,
            ),
            Z9001Kind::Kc87 => (
                KC87_OS_ROM.load(rom_set)?,
                Some(KC87_BASIC_ROM.load(rom_set)?),
                KC87_FONT_ROM.load(rom_set)?,
            ),
        };

        let mut mem = Memory::new();
        let ram_size = if config.ram_module { RAM_SIZE + RAM_MODULE_SIZE } else { RAM_SIZE };
        let ram = mem.add_store(vec![0; ram_size]);
        mem.map_ram(0, RAM_ADDR, ram_size, ram, 0);
        if let Some(basic) = basic {
            let size = basic.len();
            let store = mem.add_store(basic);
            mem.map_rom(0, BASIC_ADDR, size, store, 0);
        }
        let color_ram = (config.kind == Z9001Kind::Kc87).then(|| {
            let store = mem.add_store(vec![0; VIDEO_RAM_SIZE]);
            mem.map_ram(0, COLOR_RAM_ADDR, VIDEO_RAM_SIZE, store, 0);
            store
        });
        let video_ram = mem.add_store(vec![0; VIDEO_RAM_SIZE]);
        mem.map_ram(0, VIDEO_RAM_ADDR, VIDEO_RAM_SIZE, video_ram, 0);
        let os_size = os.len();
        let os = mem.add_store(os);
        mem.map_rom(0, OS_ADDR, os_size, os, 0);

        let board = Board {
            mem,
            video_ram,
            color_ram,
            ctc: Z80Ctc::new(),
            pio1: Z80Pio::new(),
            pio2: Z80Pio::new(),
            beeper: Beeper::new(FREQ_HZ, config.sample_rate),
            kbd: keyboard(),
            blink_counter: 0,
            blink: false,
        };
        let mut sys = Self {
            cpu: Z80::new(),
            board,
            clock: FrameClock::new(FREQ_HZ),
            config,
            font,
        };
        sys.reset();
        log::debug!("z9001: created {:?}", sys.config.kind);
        Ok(sys)
    }

    pub fn kind(&self) -> Z9001Kind {
        self.config.kind
    }

    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn ctc(&self) -> &Z80Ctc {
        &self.board.ctc
    }

    pub fn read_memory(&self, addr: u16) -> u8 {
        self.board.mem.read(addr)
    }

    pub fn write_memory(&mut self, addr: u16, data: u8) {
        self.board.mem.write(addr, data);
    }

    pub fn blink(&self) -> bool {
        self.board.blink
    }

    /// Foreground and background of one character cell.
    fn cell_colors(&self, offset: usize) -> ((u8, u8, u8), (u8, u8, u8)) {
        match self.board.color_ram {
            Some(store) => {
                let attr = self.board.mem.store(store)[offset];
                let fg = PALETTE[((attr >> 4) & 0x07) as usize];
                let bg = PALETTE[(attr & 0x07) as usize];
                if attr & 0x80 != 0 && self.board.blink {
                    (bg, bg)
                } else {
                    (fg, bg)
                }
            }
            None => (PALETTE[7], PALETTE[0]),
        }
    }
}

impl Machine for Z9001System {
    fn display_size(&self) -> (u32, u32) {
        (SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    fn exec(&mut self, micros: u32) -> u32 {
        let budget = self.clock.ticks_to_run(micros);
        let ticks = self.cpu.exec(&mut self.board, budget);
        self.clock.ticks_executed(ticks);
        self.board.kbd.update(micros);
        self.board.scan_keyboard();
        ticks
    }

    fn render_frame(&mut self, buffer: &mut [u8]) {
        let width = SCREEN_WIDTH as usize;
        let video = self.board.mem.store(self.board.video_ram);
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let offset = row * COLUMNS + col;
                let glyph = video[offset] as usize * 8;
                let (fg, bg) = self.cell_colors(offset);
                for py in 0..8 {
                    let bits = self.font[glyph + py];
                    let line = (row * 8 + py) * width + col * 8;
                    for px in 0..8 {
                        let (r, g, b) = if bits & (0x80 >> px) != 0 { fg } else { bg };
                        let off = (line + px) * 3;
                        buffer[off] = r;
                        buffer[off + 1] = g;
                        buffer[off + 2] = b;
                    }
                }
            }
        }
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        if pressed {
            self.key_down(button);
        } else {
            self.key_up(button);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        Z9001_INPUT_MAP
    }

    fn key_down(&mut self, key: u8) {
        self.board.kbd.key_down(key);
        self.board.scan_keyboard();
    }

    fn key_up(&mut self, key: u8) {
        self.board.kbd.key_up(key);
    }

    fn trace_line(&self) -> Option<String> {
        let pc = self.cpu.pc;
        let (text, _) = dasm::disassemble(pc, |addr| self.board.mem.read(addr));
        Some(format!("{pc:04X}  {text}"))
    }

    fn text_screen(&self) -> Option<String> {
        let video = self.board.mem.store(self.board.video_ram);
        let lines: Vec<String> = video[..ROWS * COLUMNS]
            .chunks(COLUMNS)
            .map(|row| {
                row.iter()
                    .map(|&c| if (0x20..0x7F).contains(&c) { c as char } else { ' ' })
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect();
        Some(lines.join("\n"))
    }

    fn reset(&mut self) {
        self.cpu.reset();
        // the OS starts at the bottom of its ROM, not at 0
        self.cpu.prefetch(OS_ADDR);
        self.board.ctc.reset();
        self.board.pio1.reset();
        self.board.pio2.reset();
        self.board.blink_counter = 0;
        self.board.blink = false;
        self.board.beeper.set(false);
        self.board.kbd.release_all();
        self.clock = FrameClock::new(FREQ_HZ);
    }

    fn quickload(&mut self, data: &[u8], addr: u16, start: Option<u16>) -> Result<(), QuickloadError> {
        if let Err(e) = QuickloadError::check(addr, data.len()) {
            log::warn!("z9001: {e}");
            return Err(e);
        }
        self.board.mem.load(addr, data);
        if let Some(start) = start {
            self.cpu.prefetch(start);
        }
        log::debug!("z9001: loaded {} bytes at {addr:#06X}", data.len());
        Ok(())
    }

    fn frame_rate_hz(&self) -> f64 {
        FRAME_RATE_HZ
    }

    fn set_audio_callback(&mut self, callback: AudioCallback) {
        self.board.beeper.set_callback(callback);
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn create_z9001(rom_set: &RomSet) -> Result<Box<dyn Machine>, RomLoadError> {
    Ok(Box::new(Z9001System::new(Z9001Config::default(), rom_set)?))
}

fn create_kc87(rom_set: &RomSet) -> Result<Box<dyn Machine>, RomLoadError> {
    let config = Z9001Config {
        kind: Z9001Kind::Kc87,
        ..Z9001Config::default()
    };
    Ok(Box::new(Z9001System::new(config, rom_set)?))
}

inventory::submit! {
    MachineEntry::new("z9001", "z9001", "Robotron Z9001, monochrome", create_z9001)
}

inventory::submit! {
    MachineEntry::new("kc87", "kc87", "Robotron KC87, color", create_kc87)
}
