//! Unpacking and repacking of `.miz` archives.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;
use zip::{result::ZipError, write::FileOptions, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid archive: {0}")]
    Zip(#[from] ZipError),

    #[error("entry {0:?} escapes the destination directory")]
    UnsafeEntry(String),

    #[error("cannot pack non UTF-8 path {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Extracts every entry of `archive` below `dir`.
pub fn unpack(archive: &Path, dir: &Path) -> Result<(), ArchiveError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .map(Path::to_owned)
            .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_owned()))?;
        let target = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut File::create(&target)?)?;
        debug!("Unpacked {}", entry.name());
    }
    Ok(())
}

/// Writes every file below `dir` into a new archive at `archive`, in file
/// name order, with `/` separators. An existing `archive` is only replaced
/// once the new one is complete.
pub fn pack(dir: &Path, archive: &Path) -> Result<(), ArchiveError> {
    let parent = match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut zip = ZipWriter::new(NamedTempFile::new_in(parent)?);
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| ArchiveError::NonUtf8Path(entry.path().to_owned()))?;
        let name = relative
            .to_str()
            .ok_or_else(|| ArchiveError::NonUtf8Path(relative.to_owned()))?
            .replace('\\', "/");

        zip.start_file(name.as_str(), FileOptions::default().compression_level(Some(9)))?;
        io::copy(&mut File::open(entry.path())?, &mut zip)?;
        debug!("Packed {name}");
    }
    zip.finish()?.persist(archive).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn unpack_then_pack() {
        let work = tempfile::tempdir().unwrap();
        let source = work.path().join("in.miz");
        write_zip(
            &source,
            &[
                ("mission", "mission = { }"),
                ("options", "options = { }"),
                ("l10n/DEFAULT/dictionary", "dictionary = { }"),
            ],
        );

        let unpacked = tempfile::tempdir().unwrap();
        unpack(&source, unpacked.path()).unwrap();
        assert_eq!(
            fs::read_to_string(unpacked.path().join("l10n/DEFAULT/dictionary")).unwrap(),
            "dictionary = { }"
        );

        let output = work.path().join("out.miz");
        pack(unpacked.path(), &output).unwrap();

        let mut zip = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let names: Vec<_> = zip.file_names().map(str::to_owned).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, ["l10n/DEFAULT/dictionary", "mission", "options"]);

        let mut mission = String::new();
        zip.by_name("mission")
            .unwrap()
            .read_to_string(&mut mission)
            .unwrap();
        assert_eq!(mission, "mission = { }");
    }

    #[test]
    fn rejects_escaping_entries() {
        let work = tempfile::tempdir().unwrap();
        let source = work.path().join("evil.miz");
        write_zip(&source, &[("../outside", "x")]);

        let unpacked = work.path().join("unpacked");
        fs::create_dir(&unpacked).unwrap();
        assert!(matches!(
            unpack(&source, &unpacked),
            Err(ArchiveError::UnsafeEntry(name)) if name == "../outside"
        ));
        assert!(!work.path().join("outside").exists());
    }

    #[test]
    fn failed_pack_keeps_existing_archive() {
        let work = tempfile::tempdir().unwrap();
        let archive = work.path().join("mission.miz");
        write_zip(&archive, &[("mission", "mission = { }")]);
        let before = fs::read(&archive).unwrap();

        let missing = work.path().join("missing");
        assert!(matches!(pack(&missing, &archive), Err(ArchiveError::Walk(_))));
        assert_eq!(fs::read(&archive).unwrap(), before);

        let leftovers: Vec<_> = fs::read_dir(work.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, ["mission.miz"]);
    }

    #[test]
    fn not_an_archive() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "mission = {{ }}").unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(unpack(file.path(), dir.path()), Err(ArchiveError::Zip(_))));
    }
}
