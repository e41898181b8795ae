//! Keyboard matrix helper.
//!
//! Maps host key codes to column/line crossings of an emulated key matrix
//! and answers the scan queries a keyboard controller (or a PIO driven by
//! the OS) performs. Keys stay down for a minimum time after release so a
//! scanning routine polling once per frame still sees quick taps.

pub const MAX_COLUMNS: usize = 12;
pub const MAX_LINES: usize = 12;
pub const MAX_MODIFIERS: usize = 4;
pub const MAX_PRESSED: usize = 4;

/// Default minimum key press time.
pub const DEFAULT_STICKY_MICROS: u32 = 2 * 16_667;

/// A matrix crossing: one column and one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Crossing {
    column: u8,
    line: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct KeyDef {
    crossing: Option<Crossing>,
    /// Bit n set: modifier n is held with this key.
    modifiers: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PressedKey {
    key: u8,
    held_micros: u32,
    released: bool,
}

pub struct Kbd {
    keys: [KeyDef; 256],
    modifiers: [Option<Crossing>; MAX_MODIFIERS],
    pressed: [Option<PressedKey>; MAX_PRESSED],
    pub sticky_micros: u32,
}

impl Default for Kbd {
    fn default() -> Self {
        Self::new()
    }
}

impl Kbd {
    pub fn new() -> Self {
        Self {
            keys: [KeyDef::default(); 256],
            modifiers: [None; MAX_MODIFIERS],
            pressed: [None; MAX_PRESSED],
            sticky_micros: DEFAULT_STICKY_MICROS,
        }
    }

    /// Declare the matrix position of modifier `index` (shift, control, ...).
    pub fn register_modifier(&mut self, index: usize, column: usize, line: usize) {
        debug_assert!(index < MAX_MODIFIERS && column < MAX_COLUMNS && line < MAX_LINES);
        self.modifiers[index] = Some(Crossing {
            column: column as u8,
            line: line as u8,
        });
    }

    /// Map `key` to a matrix position, held together with the modifiers in
    /// `modifier_mask` (bit n = modifier n).
    pub fn register_key(&mut self, key: u8, column: usize, line: usize, modifier_mask: u8) {
        debug_assert!(column < MAX_COLUMNS && line < MAX_LINES);
        self.keys[key as usize] = KeyDef {
            crossing: Some(Crossing {
                column: column as u8,
                line: line as u8,
            }),
            modifiers: modifier_mask,
        };
    }

    pub fn key_down(&mut self, key: u8) {
        if self.keys[key as usize].crossing.is_none() {
            return;
        }
        if let Some(p) = self.pressed.iter_mut().flatten().find(|p| p.key == key) {
            p.released = false;
            return;
        }
        let slot = match self.pressed.iter().position(Option::is_none) {
            Some(slot) => slot,
            None => {
                // too many keys: the oldest one goes
                self.pressed.rotate_left(1);
                MAX_PRESSED - 1
            }
        };
        self.pressed[slot] = Some(PressedKey {
            key,
            held_micros: 0,
            released: false,
        });
    }

    /// Release a key. It stays visible to scans until the sticky time has passed.
    pub fn key_up(&mut self, key: u8) {
        for p in self.pressed.iter_mut().flatten() {
            if p.key == key {
                p.released = true;
            }
        }
    }

    /// Advance time by one host frame and drop released keys that have been
    /// down long enough.
    pub fn update(&mut self, frame_micros: u32) {
        let sticky = self.sticky_micros;
        for slot in &mut self.pressed {
            if let Some(p) = slot {
                p.held_micros = p.held_micros.saturating_add(frame_micros);
                if p.released && p.held_micros >= sticky {
                    *slot = None;
                }
            }
        }
    }

    fn crossings(&self) -> impl Iterator<Item = Crossing> + '_ {
        self.pressed.iter().flatten().flat_map(move |p| {
            let def = self.keys[p.key as usize];
            let mods = self
                .modifiers
                .iter()
                .enumerate()
                .filter(move |(i, _)| def.modifiers & (1 << i) != 0)
                .filter_map(|(_, m)| *m);
            def.crossing.into_iter().chain(mods)
        })
    }

    /// Lines (bit per line) pulled active by pressed keys in the given columns.
    pub fn test_lines(&self, column_mask: u16) -> u16 {
        self.crossings()
            .filter(|c| column_mask & (1 << c.column) != 0)
            .fold(0, |acc, c| acc | (1 << c.line))
    }

    /// Columns (bit per column) connected to the given lines by pressed keys.
    pub fn test_columns(&self, line_mask: u16) -> u16 {
        self.crossings()
            .filter(|c| line_mask & (1 << c.line) != 0)
            .fold(0, |acc, c| acc | (1 << c.column))
    }

    pub fn any_pressed(&self) -> bool {
        self.pressed.iter().any(Option::is_some)
    }

    /// Drop every held key, sticky ones included. The key map stays.
    pub fn release_all(&mut self) {
        self.pressed = [None; MAX_PRESSED];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard() -> Kbd {
        let mut kbd = Kbd::new();
        kbd.register_modifier(0, 7, 7);
        kbd.register_key(b'a', 1, 2, 0);
        kbd.register_key(b'A', 1, 2, 1);
        kbd.register_key(b'z', 3, 4, 0);
        kbd
    }

    #[test]
    fn pressed_key_shows_up_in_both_scan_directions() {
        let mut kbd = keyboard();
        kbd.key_down(b'a');
        assert_eq!(kbd.test_lines(1 << 1), 1 << 2);
        assert_eq!(kbd.test_lines(1 << 0), 0);
        assert_eq!(kbd.test_columns(1 << 2), 1 << 1);
    }

    #[test]
    fn shifted_key_presses_modifier_too() {
        let mut kbd = keyboard();
        kbd.key_down(b'A');
        assert_eq!(kbd.test_lines(0xFFF), (1 << 2) | (1 << 7));
        assert_eq!(kbd.test_columns(1 << 7), 1 << 7);
    }

    #[test]
    fn short_press_is_held_for_sticky_time() {
        let mut kbd = keyboard();
        kbd.sticky_micros = 40_000;
        kbd.key_down(b'z');
        kbd.key_up(b'z');
        kbd.update(20_000);
        assert_eq!(kbd.test_lines(1 << 3), 1 << 4);
        kbd.update(20_000);
        assert_eq!(kbd.test_lines(1 << 3), 0);
        assert!(!kbd.any_pressed());
    }

    #[test]
    fn release_all_skips_sticky_time() {
        let mut kbd = keyboard();
        kbd.key_down(b'a');
        kbd.key_down(b'A');
        kbd.key_up(b'a');
        kbd.release_all();
        assert!(!kbd.any_pressed());
        assert_eq!(kbd.test_lines(0xFFF), 0);
        // mapping survives
        kbd.key_down(b'z');
        assert_eq!(kbd.test_lines(1 << 3), 1 << 4);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut kbd = keyboard();
        kbd.key_down(b'q');
        assert!(!kbd.any_pressed());
    }
}
