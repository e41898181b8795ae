use std::collections::VecDeque;
use std::io::Read;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tickwork_core::core::{Bus, M6502Pins, Z80Pins};

// --- TracingBus: flat 64KB memory with cycle-by-cycle recording ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusOp {
    Read,
    Write,
    Internal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BusCycle {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

/// Flat memory bus that answers every request and records one
/// [`BusCycle`] per tick. Z80 I/O reads are served from `ports`.
pub struct TracingBus<P> {
    pub memory: Box<[u8; 0x10000]>,
    pub cycles: Vec<BusCycle>,
    /// Values for I/O reads, consumed in order. Unqueued reads see 0xFF.
    pub ports: VecDeque<u8>,
    pub io_writes: Vec<(u16, u8)>,
    _pins: PhantomData<P>,
}

impl<P> TracingBus<P> {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            cycles: Vec::new(),
            ports: VecDeque::new(),
            io_writes: Vec::new(),
            _pins: PhantomData,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }

    fn record(&mut self, addr: u16, data: u8, op: BusOp) {
        self.cycles.push(BusCycle { addr, data, op });
    }
}

impl<P> Default for TracingBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus<Z80Pins> {
    type Pins = Z80Pins;

    fn respond(&mut self, mut pins: Z80Pins) -> Z80Pins {
        let addr = pins.addr();
        if pins.is_mem_read() {
            pins.set_data(self.memory[addr as usize]);
            self.record(addr, pins.data(), BusOp::Read);
        } else if pins.is_mem_write() {
            self.memory[addr as usize] = pins.data();
            self.record(addr, pins.data(), BusOp::Write);
        } else if pins.is_io_read() {
            pins.set_data(self.ports.pop_front().unwrap_or(0xFF));
            self.record(addr, pins.data(), BusOp::Read);
        } else if pins.is_io_write() {
            self.io_writes.push((addr, pins.data()));
            self.record(addr, pins.data(), BusOp::Write);
        } else {
            self.record(addr, pins.data(), BusOp::Internal);
        }
        pins - (Z80Pins::WAIT | Z80Pins::INT | Z80Pins::NMI)
    }
}

impl Bus for TracingBus<M6502Pins> {
    type Pins = M6502Pins;

    fn respond(&mut self, mut pins: M6502Pins) -> M6502Pins {
        let addr = pins.addr();
        if pins.is_read() {
            pins.set_data(self.memory[addr as usize]);
            self.record(addr, pins.data(), BusOp::Read);
        } else {
            self.memory[addr as usize] = pins.data();
            self.record(addr, pins.data(), BusOp::Write);
        }
        pins - (M6502Pins::IRQ | M6502Pins::NMI | M6502Pins::RDY | M6502Pins::RES)
    }
}

// --- Test vector files ---

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: std::io::Error },
    Json { path: PathBuf, source: serde_json::Error },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Json { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// Test data lives in `test_data/<cpu>/` next to this crate unless
/// `TICKWORK_TEST_DATA` points elsewhere.
pub fn test_data_dir(cpu: &str) -> PathBuf {
    let root = std::env::var_os("TICKWORK_TEST_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("test_data"));
    root.join(cpu)
}

/// `.json` and `.json.gz` files in `dir`, sorted by name. A missing
/// directory yields no files.
pub fn test_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(".json") || name.ends_with(".json.gz") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse one test vector file, gunzipping `.gz` files on the way.
pub fn load_tests<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let raw = std::fs::read(path).map_err(io_err)?;
    let text = if path.extension().is_some_and(|ext| ext == "gz") {
        let mut text = Vec::new();
        flate2::read::GzDecoder::new(raw.as_slice())
            .read_to_end(&mut text)
            .map_err(io_err)?;
        text
    } else {
        raw
    };
    serde_json::from_slice(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// --- Z80 JSON test vector types (SingleStepTests/z80 format) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80TestCase {
    pub name: String,
    pub initial: Z80CpuState,
    #[serde(rename = "final")]
    pub final_state: Z80CpuState,
    /// (address, data or null, pin activity such as "r-m-").
    pub cycles: Vec<(u16, Option<u8>, String)>,
    /// (port, data, "r" or "w").
    #[serde(default)]
    pub ports: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Z80CpuState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    pub i: u8,
    pub r: u8,
    pub ei: u8,
    pub wz: u16,
    pub ix: u16,
    pub iy: u16,
    #[serde(rename = "af_")]
    pub af_prime: u16,
    #[serde(rename = "bc_")]
    pub bc_prime: u16,
    #[serde(rename = "de_")]
    pub de_prime: u16,
    #[serde(rename = "hl_")]
    pub hl_prime: u16,
    pub im: u8,
    pub p: u8,
    pub q: u8,
    pub iff1: u8,
    pub iff2: u8,
    pub ram: Vec<(u16, u8)>,
}

// --- M6502 JSON test vector types (SingleStepTests/65x02 format) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M6502TestCase {
    pub name: String,
    pub initial: M6502CpuState,
    #[serde(rename = "final")]
    pub final_state: M6502CpuState,
    /// (address, data, "read" or "write").
    pub cycles: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M6502CpuState {
    pub pc: u16,
    pub s: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub ram: Vec<(u16, u8)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const M6502_CASE: &str = r#"[{
        "name": "a9 01",
        "initial": {"pc": 512, "s": 253, "a": 0, "x": 0, "y": 0, "p": 36,
                    "ram": [[512, 169], [513, 1]]},
        "final": {"pc": 514, "s": 253, "a": 1, "x": 0, "y": 0, "p": 36,
                  "ram": [[512, 169], [513, 1]]},
        "cycles": [[512, 169, "read"], [513, 1, "read"]]
    }]"#;

    #[test]
    fn loads_plain_and_gzipped_json() {
        let dir = std::env::temp_dir().join("tickwork_validation_load_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a9.json"), M6502_CASE).unwrap();
        let mut gz = flate2::write::GzEncoder::new(
            std::fs::File::create(dir.join("a9.json.gz")).unwrap(),
            flate2::Compression::default(),
        );
        gz.write_all(M6502_CASE.as_bytes()).unwrap();
        gz.finish().unwrap();
        std::fs::write(dir.join("README.md"), "ignored").unwrap();

        let files = test_files(&dir).unwrap();
        assert_eq!(files.len(), 2);
        for file in &files {
            let cases: Vec<M6502TestCase> = load_tests(file).unwrap();
            assert_eq!(cases[0].final_state.a, 1);
            assert_eq!(cases[0].cycles.len(), 2);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_has_no_files() {
        let dir = std::env::temp_dir().join("tickwork_validation_no_such_dir");
        assert!(test_files(&dir).unwrap().is_empty());
    }

    #[test]
    fn bad_json_names_the_file() {
        let path = std::env::temp_dir().join("tickwork_validation_bad.json");
        std::fs::write(&path, "[{").unwrap();
        let err = load_tests::<M6502TestCase>(&path).unwrap_err();
        assert!(err.to_string().contains("tickwork_validation_bad.json"));
        std::fs::remove_file(&path).unwrap();
    }
}
