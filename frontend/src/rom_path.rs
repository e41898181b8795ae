//! ROM path resolution: loads a [`RomSet`] from a MAME-style rompath,
//! a direct ZIP file, a directory of loose ROM files or a single file.

use tickwork_machines::rom_loader::{RomLoadError, RomSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Resolve a ROM path and load all ROM files into a [`RomSet`].
///
/// Resolution order:
/// 1. If `path` ends with `.zip` → load directly as a ZIP archive.
/// 2. If `path` is a directory containing `{machine_name}.zip` → load that ZIP.
/// 3. If `path` is a directory containing a `{machine_name}` subdirectory →
///    load its loose files.
/// 4. If `path` is a directory of loose files → load via [`RomSet::from_directory`].
/// 5. If `path` is a plain file → a set holding just that file.
pub fn load_rom_set(machine_name: &str, path: &Path) -> Result<RomSet, RomLoadError> {

    // Direct ZIP file
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }

    // MAME-style rompath: directory containing {machine}.zip
    if path.is_dir() {
        let zip_path = path.join(format!("{machine_name}.zip"));
        if zip_path.exists() {
            return load_from_zip(&zip_path);
        }

        let sub_dir = path.join(machine_name);
        if sub_dir.is_dir() {
            return RomSet::from_directory(&sub_dir);
        }

        // Fallback: directory of loose ROM files
        return RomSet::from_directory(path);
    }

    if path.is_file()
        && let Some(name) = path.file_name().and_then(|n| n.to_str())
    {
        let data = std::fs::read(path)?;
        log::debug!("rom path: single file {name}, {} bytes", data.len());
        return Ok(RomSet::from_entries([(name.to_string(), data)]));
    }

    Err(RomLoadError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("ROM path not found: {}", path.display()),
    )))
}

/// Extract all files from a ZIP archive into a [`RomSet`].
fn load_from_zip(path: &Path) -> Result<RomSet, RomLoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
    })?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("ZIP entry error: {e}"),
            )
        })?;

        // Skip directories
        if entry.is_dir() {
            continue;
        }

        // archives sometimes nest the set in a folder
        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        entries.push((name, data));
    }

    log::debug!("rom path: {} files from {}", entries.len(), path.display());
    Ok(RomSet::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> std::path::PathBuf {
        let zip_path = dir.join(name);
        let file = File::create(&zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (fname, data) in files {
            zip.start_file(*fname, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        zip_path
    }

    #[test]
    fn resolve_zip_file_directly() {
        let dir = std::env::temp_dir().join("tickwork_rompath_test_zip");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let zip_path = create_test_zip(&dir, "kc87.zip", &[("kc87_os_2.bin", &[0xAA; 16])]);

        let rom_set = load_rom_set("kc87", &zip_path).unwrap();
        assert_eq!(rom_set.get("kc87_os_2.bin"), Some(&[0xAA; 16][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_zip_from_rompath_directory() {
        let dir = std::env::temp_dir().join("tickwork_rompath_test_dir");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        create_test_zip(&dir, "kc87.zip", &[("kc87/kc87_font_2.bin", &[0xBB; 8])]);

        let rom_set = load_rom_set("kc87", &dir).unwrap();
        assert_eq!(rom_set.get("kc87_font_2.bin"), Some(&[0xBB; 8][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_loose_directory_fallback() {
        let dir = std::env::temp_dir().join("tickwork_rompath_test_loose");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(dir.join("simplez80.rom"), [0xCC; 4]).unwrap();

        let rom_set = load_rom_set("kc87", &dir).unwrap();
        assert_eq!(rom_set.get("simplez80.rom"), Some(&[0xCC; 4][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_machine_subdirectory() {
        let dir = std::env::temp_dir().join("tickwork_rompath_test_subdir");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("z9001")).unwrap();
        std::fs::write(dir.join("z9001").join("z9001_font.bin"), [0xDD; 2]).unwrap();
        std::fs::write(dir.join("other.bin"), [0x00; 2]).unwrap();

        let rom_set = load_rom_set("z9001", &dir).unwrap();
        assert_eq!(rom_set.get("z9001_font.bin"), Some(&[0xDD; 2][..]));
        assert!(rom_set.get("other.bin").is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resolve_single_file() {
        let dir = std::env::temp_dir().join("tickwork_rompath_test_file");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("simple6502.rom");
        std::fs::write(&file, [0xEE; 4]).unwrap();

        let rom_set = load_rom_set("simple6502", &file).unwrap();
        assert_eq!(rom_set.get("simple6502.rom"), Some(&[0xEE; 4][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_path_is_not_found() {
        let path = std::env::temp_dir().join("tickwork_rompath_test_nothing_here");
        match load_rom_set("kc87", &path) {
            Err(RomLoadError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected not found, got {:?}", other.map(|s| s.file_names().len())),
        }
    }
}
