//! Keys typed into the machine from the command line.
//!
//! The `--type` text is plain characters with a few escapes: `\n` is Enter,
//! `\\` a backslash, and `{Name}` presses the machine button called `Name`
//! (for example `{Stop}` on the Z9001). `{{` is a literal brace.

use std::collections::VecDeque;

use tickwork_core::core::machine::{InputButton, Machine};

/// Frames a key stays down.
const HOLD_FRAMES: u32 = 3;
/// Frames between two keys, so repeated characters register twice.
const GAP_FRAMES: u32 = 3;

/// Keys every machine understands even without an input map entry.
const NAMED_KEYS: &[(&str, u8)] = &[
    ("enter", 0x0D),
    ("return", 0x0D),
    ("esc", 0x1B),
    ("tab", 0x09),
    ("backspace", 0x08),
    ("space", b' '),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// ASCII character through `key_down`/`key_up`.
    Char(u8),
    /// Machine button through `set_input`.
    Button(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    UnknownKey(String),
    Unterminated,
    NotAscii(char),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKey(name) => write!(f, "unknown key {{{name}}}"),
            Self::Unterminated => write!(f, "missing '}}' in typed keys"),
            Self::NotAscii(c) => write!(f, "cannot type {c:?}"),
        }
    }
}

impl std::error::Error for InputError {}

/// Parse `--type` text against the machine's buttons.
pub fn parse_keys(text: &str, buttons: &[InputButton]) -> Result<Vec<Key>, InputError> {
    let mut keys = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        let key = match c {
            '\\' => match chars.next() {
                Some('n') => Key::Char(0x0D),
                Some('t') => Key::Char(0x09),
                Some(other) => ascii(other)?,
                None => Key::Char(b'\\'),
            },
            '{' => {
                let rest = chars.as_str();
                if let Some(after) = rest.strip_prefix('{') {
                    chars = after.chars();
                    Key::Char(b'{')
                } else {
                    let end = rest.find('}').ok_or(InputError::Unterminated)?;
                    let name = &rest[..end];
                    chars = rest[end + 1..].chars();
                    named(name, buttons)?
                }
            }
            '\n' => Key::Char(0x0D),
            c => ascii(c)?,
        };
        keys.push(key);
    }
    Ok(keys)
}

fn ascii(c: char) -> Result<Key, InputError> {
    if c.is_ascii() {
        Ok(Key::Char(c as u8))
    } else {
        Err(InputError::NotAscii(c))
    }
}

fn named(name: &str, buttons: &[InputButton]) -> Result<Key, InputError> {
    if let Some(button) = buttons.iter().find(|b| b.name.eq_ignore_ascii_case(name)) {
        return Ok(Key::Button(button.id));
    }
    NAMED_KEYS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, code)| Key::Char(code))
        .ok_or_else(|| InputError::UnknownKey(name.to_string()))
}

/// Feeds queued keys to a machine, one press per few frames.
#[derive(Debug, Default)]
pub struct TypedKeys {
    queue: VecDeque<Key>,
    held: Option<Key>,
    wait: u32,
}

impl TypedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            queue: keys.into_iter().collect(),
            held: None,
            wait: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.queue.is_empty() && self.held.is_none()
    }

    /// Call once per frame, before running it.
    pub fn tick(&mut self, machine: &mut dyn Machine) {
        if self.wait > 0 {
            self.wait -= 1;
            return;
        }
        if let Some(key) = self.held.take() {
            match key {
                Key::Char(c) => machine.key_up(c),
                Key::Button(id) => machine.set_input(id, false),
            }
            self.wait = GAP_FRAMES - 1;
            return;
        }
        if let Some(key) = self.queue.pop_front() {
            log::trace!("typing {key:?}");
            match key {
                Key::Char(c) => machine.key_down(c),
                Key::Button(id) => machine.set_input(id, true),
            }
            self.held = Some(key);
            self.wait = HOLD_FRAMES - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickwork_core::core::machine::QuickloadError;

    const BUTTONS: &[InputButton] = &[InputButton { id: 0x03, name: "Stop" }];

    #[test]
    fn parse_plain_and_escapes() {
        let keys = parse_keys("a1\\n\\\\", &[]).unwrap();
        assert_eq!(
            keys,
            vec![Key::Char(b'a'), Key::Char(b'1'), Key::Char(0x0D), Key::Char(b'\\')]
        );
    }

    #[test]
    fn parse_named_keys() {
        let keys = parse_keys("{stop}{Enter}{{", BUTTONS).unwrap();
        assert_eq!(keys, vec![Key::Button(0x03), Key::Char(0x0D), Key::Char(b'{')]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            parse_keys("{Turbo}", BUTTONS),
            Err(InputError::UnknownKey("Turbo".into()))
        );
        assert_eq!(parse_keys("{Stop", BUTTONS), Err(InputError::Unterminated));
        assert_eq!(parse_keys("ä", BUTTONS), Err(InputError::NotAscii('ä')));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<(u8, bool)>,
    }

    impl Machine for Recorder {
        fn display_size(&self) -> (u32, u32) {
            (0, 0)
        }
        fn exec(&mut self, _micros: u32) -> u32 {
            0
        }
        fn render_frame(&mut self, _buffer: &mut [u8]) {}
        fn set_input(&mut self, button: u8, pressed: bool) {
            self.events.push((button | 0x80, pressed));
        }
        fn input_map(&self) -> &[InputButton] {
            BUTTONS
        }
        fn key_down(&mut self, key: u8) {
            self.events.push((key, true));
        }
        fn key_up(&mut self, key: u8) {
            self.events.push((key, false));
        }
        fn reset(&mut self) {}
        fn quickload(&mut self, _data: &[u8], _addr: u16, _start: Option<u16>) -> Result<(), QuickloadError> {
            Ok(())
        }
    }

    #[test]
    fn keys_are_held_then_released() {
        let mut machine = Recorder::default();
        let mut typed = TypedKeys::new([Key::Char(b'a'), Key::Button(0x03)]);
        let mut frames = 0;
        while !typed.is_done() {
            typed.tick(&mut machine);
            frames += 1;
        }
        assert_eq!(
            machine.events,
            vec![(b'a', true), (b'a', false), (0x83, true), (0x83, false)]
        );
        assert_eq!(frames, 2 * HOLD_FRAMES + GAP_FRAMES + 1);
    }
}
