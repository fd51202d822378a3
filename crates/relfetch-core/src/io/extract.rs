//! Archive extraction module
//!
//! Handles tar.gz, tar.bz2 and zip. Which one runs is decided by
//! [`ArchiveKind`], itself derived from the asset name.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use relfetch_schema::ArchiveKind;
use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Unpacks an archive into a directory, creating it if absent.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        kind: ArchiveKind,
    ) -> Result<Vec<ExtractedFile>, ExtractError>;
}

/// Extractor backed by `flate2`, `bzip2`, `tar` and `zip`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl Extractor for NativeExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        kind: ArchiveKind,
    ) -> Result<Vec<ExtractedFile>, ExtractError> {
        tracing::debug!(archive = %archive.display(), dest = %dest.display(), %kind, flag = ?kind.flag(), "extracting");
        match kind {
            ArchiveKind::TarGz => extract_tar_gz(archive, dest),
            ArchiveKind::TarBz2 => extract_tar_bz2(archive, dest),
            ArchiveKind::Zip => extract_zip(archive, dest),
        }
    }
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    extract_tar(GzDecoder::new(BufReader::new(file)), dest_dir)
}

/// Extract a tar.bz2 archive to a destination directory
pub fn extract_tar_bz2(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    extract_tar(BzDecoder::new(BufReader::new(file)), dest_dir)
}

/// Reject absolute paths and `..` so entries stay under the destination.
fn enclosed(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();

        let Some(relative_path) = enclosed(&entry_path) else {
            if entry.header().entry_type().is_dir() {
                continue;
            }
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                entry_path.display()
            )));
        };
        let is_dir = entry.header().entry_type().is_dir();

        // unpack_in resolves the parent on disk, so links planted by earlier
        // entries cannot redirect a write outside dest_dir.
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::Archive(format!(
                "Entry escapes destination: {}",
                entry_path.display()
            )));
        }
        if is_dir {
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}
