//! Program images for quickload: raw binaries placed with `--load-addr`, and
//! KC tape images (`.kcc`) that carry their own addresses.

use std::path::Path;

/// KCC header: 16 byte name, address count, load, end (exclusive) and start
/// address, padded to 128 bytes.
const KCC_HEADER_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub data: Vec<u8>,
    pub load_addr: u16,
    pub start: Option<u16>,
}

#[derive(Debug)]
pub enum ProgramError {
    Io(std::io::Error),
    /// Raw binary without `--load-addr`.
    MissingLoadAddress,
    BadKcc(&'static str),
}

impl std::fmt::Display for ProgramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::MissingLoadAddress => write!(f, "raw program needs --load-addr"),
            Self::BadKcc(why) => write!(f, "invalid KCC image: {why}"),
        }
    }
}

impl std::error::Error for ProgramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProgramError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Program {
    /// Read `path`. Command line addresses override the ones in a KCC
    /// header.
    pub fn load(path: &Path, load_addr: Option<u16>, start: Option<u16>) -> Result<Self, ProgramError> {
        let data = std::fs::read(path)?;
        let is_kcc = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("kcc"));
        let mut program = if is_kcc {
            Self::from_kcc(&data)?
        } else {
            Self {
                name: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                data,
                load_addr: load_addr.ok_or(ProgramError::MissingLoadAddress)?,
                start: None,
            }
        };
        if let Some(addr) = load_addr {
            program.load_addr = addr;
        }
        if start.is_some() {
            program.start = start;
        }
        Ok(program)
    }

    pub fn from_kcc(image: &[u8]) -> Result<Self, ProgramError> {
        if image.len() < KCC_HEADER_LEN {
            return Err(ProgramError::BadKcc("shorter than its header"));
        }
        let word = |i: usize| u16::from_le_bytes([image[i], image[i + 1]]);
        let num_addr = image[16];
        if !(2..=3).contains(&num_addr) {
            return Err(ProgramError::BadKcc("address count not 2 or 3"));
        }
        let load_addr = word(17);
        let end_addr = word(19);
        if end_addr <= load_addr {
            return Err(ProgramError::BadKcc("end address before load address"));
        }
        let len = (end_addr - load_addr) as usize;
        let payload = &image[KCC_HEADER_LEN..];
        if payload.len() < len {
            return Err(ProgramError::BadKcc("truncated payload"));
        }
        let name = image[..16]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end()
            .to_string();
        Ok(Self {
            name,
            data: payload[..len].to_vec(),
            load_addr,
            start: (num_addr == 3).then(|| word(21)),
        })
    }
}

/// Address argument: `0x1234`, `$1234`, `1234h` or decimal.
pub fn parse_addr(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(hex) = text.strip_prefix('$') {
        (hex, 16)
    } else if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        (hex, 16)
    } else {
        (text, 10)
    };
    u16::from_str_radix(digits, radix).map_err(|e| format!("bad address {text:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kcc(name: &str, num_addr: u8, load: u16, end: u16, start: u16, payload: &[u8]) -> Vec<u8> {
        let mut image = vec![0u8; KCC_HEADER_LEN];
        image[..name.len()].copy_from_slice(name.as_bytes());
        image[16] = num_addr;
        image[17..19].copy_from_slice(&load.to_le_bytes());
        image[19..21].copy_from_slice(&end.to_le_bytes());
        image[21..23].copy_from_slice(&start.to_le_bytes());
        image.extend_from_slice(payload);
        image
    }

    #[test]
    fn kcc_with_start_address() {
        let image = kcc("HELLO   COM", 3, 0x0300, 0x0304, 0x0301, &[1, 2, 3, 4, 0xFF]);
        let program = Program::from_kcc(&image).unwrap();
        assert_eq!(program.name, "HELLO   COM");
        assert_eq!(program.data, vec![1, 2, 3, 4]);
        assert_eq!(program.load_addr, 0x0300);
        assert_eq!(program.start, Some(0x0301));
    }

    #[test]
    fn kcc_without_start_address() {
        let image = kcc("DATA", 2, 0x1000, 0x1002, 0xFFFF, &[9, 9]);
        assert_eq!(Program::from_kcc(&image).unwrap().start, None);
    }

    #[test]
    fn kcc_rejects_bad_headers() {
        assert!(Program::from_kcc(&[0; 10]).is_err());
        assert!(Program::from_kcc(&kcc("X", 7, 0x100, 0x200, 0, &[])).is_err());
        assert!(Program::from_kcc(&kcc("X", 2, 0x200, 0x100, 0, &[])).is_err());
        assert!(Program::from_kcc(&kcc("X", 2, 0x100, 0x110, 0, &[0; 4])).is_err());
    }

    #[test]
    fn raw_file_needs_load_address() {
        let path = std::env::temp_dir().join("tickwork_program_test.bin");
        std::fs::write(&path, [0x76]).unwrap();
        assert!(matches!(
            Program::load(&path, None, None),
            Err(ProgramError::MissingLoadAddress)
        ));
        let program = Program::load(&path, Some(0x300), Some(0x300)).unwrap();
        assert_eq!(program.name, "tickwork_program_test");
        assert_eq!((program.load_addr, program.start), (0x300, Some(0x300)));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn addresses() {
        assert_eq!(parse_addr("0x0300"), Ok(0x0300));
        assert_eq!(parse_addr("$F000"), Ok(0xF000));
        assert_eq!(parse_addr("1000h"), Ok(0x1000));
        assert_eq!(parse_addr("256"), Ok(256));
        assert!(parse_addr("0x10000").is_err());
        assert!(parse_addr("zz").is_err());
    }
}
