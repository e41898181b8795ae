//! ROM images for the machines.
//!
//! A [`RomSet`] is a bag of named files: a directory of loose dumps, the
//! members of an archive unpacked by the frontend, or byte slices built in a
//! test. A [`RomRegion`] describes where those files land in one contiguous
//! block of machine memory and checks that each one has the expected size.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum RomLoadError {
    Io(std::io::Error),
    /// No file of this name in the set.
    MissingFile(String),
    SizeMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MissingFile(name) => write!(f, "missing ROM file: {name}"),
            Self::SizeMismatch {
                file,
                expected,
                actual,
            } => write!(f, "ROM {file}: expected {expected} bytes, got {actual}"),
        }
    }
}

impl std::error::Error for RomLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// ROM files by bare file name.
#[derive(Debug, Clone, Default)]
pub struct RomSet {
    files: HashMap<String, Vec<u8>>,
}

impl RomSet {
    /// Every regular file directly inside `path`. Subdirectories are skipped.
    pub fn from_directory(path: &Path) -> Result<Self, RomLoadError> {
        let mut set = Self::default();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if !file.is_file() {
                continue;
            }
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                set.insert(name, std::fs::read(&file)?);
            }
        }
        log::debug!("rom set: {} files from {}", set.files.len(), path.display());
        Ok(set)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            files: entries.into_iter().collect(),
        }
    }

    pub fn from_slices(entries: &[(&str, &[u8])]) -> Self {
        Self::from_entries(
            entries
                .iter()
                .map(|(name, data)| (name.to_string(), data.to_vec())),
        )
    }

    /// Add a file, replacing one of the same name.
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.files.insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> Result<&[u8], RomLoadError> {
        self.get(name)
            .ok_or_else(|| RomLoadError::MissingFile(name.to_string()))
    }

    /// Like [`require`](Self::require), and the file must be exactly
    /// `expected` bytes long.
    pub fn require_sized(&self, name: &str, expected: usize) -> Result<&[u8], RomLoadError> {
        let data = self.require(name)?;
        if data.len() != expected {
            return Err(RomLoadError::SizeMismatch {
                file: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One dump and its place inside a [`RomRegion`].
pub struct RomEntry {
    pub name: &'static str,
    pub size: usize,
    pub offset: usize,
}

/// A block of ROM assembled from one or more dumps. Bytes no entry covers
/// stay zero.
pub struct RomRegion {
    pub size: usize,
    pub entries: &'static [RomEntry],
}

impl RomRegion {
    pub fn load(&self, rom_set: &RomSet) -> Result<Vec<u8>, RomLoadError> {
        let mut region = vec![0u8; self.size];
        for entry in self.entries {
            debug_assert!(
                entry.offset + entry.size <= self.size,
                "{} overruns its region",
                entry.name
            );
            let data = rom_set.require_sized(entry.name, entry.size)?;
            region[entry.offset..entry.offset + entry.size].copy_from_slice(data);
        }
        Ok(region)
    }

    /// `None` when the set holds none of the region's files, so optional
    /// expansion ROMs can be left out. A partial or wrongly sized set is
    /// still an error.
    pub fn load_optional(&self, rom_set: &RomSet) -> Result<Option<Vec<u8>>, RomLoadError> {
        if self.entries.iter().all(|e| rom_set.get(e.name).is_none()) {
            return Ok(None);
        }
        self.load(rom_set).map(Some)
    }
}
