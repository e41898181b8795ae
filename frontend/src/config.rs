//! Frontend settings from `config.toml`.
//!
//! The file lives in `<config dir>/tickwork/config.toml` unless a path is
//! given on the command line. A missing default file is not an error; every
//! field has a default and command line arguments override the file.
//!
//! ```toml
//! rom_path = "/home/me/roms"
//! frames = 300
//! scale = 4
//!
//! [machines.kc87]
//! rom_path = "/home/me/roms/kc87.zip"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Rompath used when a machine has no path of its own.
    pub rom_path: Option<PathBuf>,
    /// Frames to run before printing the screen.
    pub frames: u32,
    /// Pixels per text column of the ASCII renderer.
    pub scale: u32,
    pub machines: HashMap<String, MachineConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    pub rom_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rom_path: None,
            frames: 100,
            scale: 4,
            machines: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "{}: invalid config: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tickwork").join("config.toml"))
    }

    /// Load `path`, or the default file when `path` is `None`. Only an
    /// explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("config: reading {}", path.display());
                Self::parse(&text).map_err(|source| ConfigError::Parse { path, source })
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Rompath for `machine`: its own entry first, then the global one.
    pub fn rom_path_for(&self, machine: &str) -> Option<&Path> {
        self.machines
            .get(machine)
            .and_then(|m| m.rom_path.as_deref())
            .or(self.rom_path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn per_machine_rom_path_wins() {
        let config = Config::parse(
            r#"
            rom_path = "/roms"
            frames = 250

            [machines.kc87]
            rom_path = "/roms/kc87.zip"
            "#,
        )
        .unwrap();
        assert_eq!(config.frames, 250);
        assert_eq!(config.scale, 4);
        assert_eq!(config.rom_path_for("kc87"), Some(Path::new("/roms/kc87.zip")));
        assert_eq!(config.rom_path_for("z9001"), Some(Path::new("/roms")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("frame = 3").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("tickwork_config_test_missing.toml");
        let _ = std::fs::remove_file(&path);
        match Config::load(Some(&path)) {
            Err(ConfigError::Io { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let path = std::env::temp_dir().join("tickwork_config_test_bad.toml");
        std::fs::write(&path, "frames = \"many\"").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("tickwork_config_test_bad.toml"));
        std::fs::remove_file(&path).unwrap();
    }
}
