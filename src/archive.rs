//! Compressed, cached exports of tree snapshots.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike};
use filetime::FileTime;
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::document::Tree;
use crate::error::{Error, Result};
use crate::store::VersionStore;
use crate::tree::{self, WalkEntry};
use crate::types::{MODE_BLOB_EXEC, MODE_LINK};

/// Container and compression of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 4] = [Self::TarGz, Self::TarBz2, Self::TarXz, Self::Zip];

    /// File extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::TarGz => "application/x-tar-gz",
            Self::TarBz2 => "application/x-bzip2",
            Self::TarXz => "application/x-xz",
            Self::Zip => "application/zip",
        }
    }

    /// Parse an extension such as `tar.gz`, `tgz` or `zip`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" | "gz" => Ok(Self::TarGz),
            "tar.bz2" | "tbz2" | "bz2" => Ok(Self::TarBz2),
            "tar.xz" | "txz" | "xz" => Ok(Self::TarXz),
            "zip" => Ok(Self::Zip),
            _ => Err(Error::validation(format!("unknown archive format: {}", name))),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Produces archives of [`Tree`] snapshots into a cache directory.
///
/// An artifact is keyed by the tree's revision, its safe name and the
/// format. Revisions are immutable, so an existing artifact is returned as
/// is.
#[derive(Debug, Clone)]
pub struct ArchiveExporter {
    dir: PathBuf,
}

impl ArchiveExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// An exporter writing into the store's archive directory.
    pub fn for_store(store: &VersionStore) -> Self {
        Self::new(store.archive_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the artifact for `tree` in `format` lives, whether or not it
    /// has been produced yet. The key is the tree's revision, so an artifact
    /// depends on nothing but the revision it was requested at.
    pub fn cache_path(&self, tree: &Tree, format: ArchiveFormat) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{}",
            tree.safe_name(),
            tree.revision(),
            format.extension()
        ))
    }

    /// Export `tree` and return the path of the artifact.
    ///
    /// Entries are prefixed with `<safe_name>/` and stamped with the commit
    /// time of the tree's revision, which also becomes the artifact's
    /// modification time.
    pub fn archive(&self, tree: &Tree, format: ArchiveFormat) -> Result<PathBuf> {
        let dest = self.cache_path(tree, format);
        if dest.is_file() {
            debug!("archive cache hit: {}", dest.display());
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        let entries = tree.store.with_repo(|repo| {
            tree::walk_tree(repo, tree.oid)?
                .into_iter()
                .map(|(path, entry)| {
                    let data = tree::read_blob(repo, entry.oid)?;
                    Ok(ArchiveEntry { path, entry, data })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let prefix = tree.safe_name();
        let mtime = tree.commit().time;

        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let written = match format {
            ArchiveFormat::TarGz => {
                let enc = flate2::write::GzEncoder::new(tmp.as_file(), flate2::Compression::default());
                write_tar(enc, &prefix, mtime, &entries)?.finish().map(drop)
            }
            ArchiveFormat::TarBz2 => {
                let enc = bzip2::write::BzEncoder::new(tmp.as_file(), bzip2::Compression::default());
                write_tar(enc, &prefix, mtime, &entries)?.finish().map(drop)
            }
            ArchiveFormat::TarXz => {
                let enc = xz2::write::XzEncoder::new(tmp.as_file(), 6);
                write_tar(enc, &prefix, mtime, &entries)?.finish().map(drop)
            }
            ArchiveFormat::Zip => write_zip(tmp.as_file(), &prefix, mtime, &entries),
        };
        written.map_err(|e| Error::io(tmp.path(), e))?;

        tmp.persist(&dest).map_err(|e| Error::io(&dest, e.error))?;
        filetime::set_file_mtime(&dest, FileTime::from_unix_time(mtime, 0))
            .map_err(|e| Error::io(&dest, e))?;

        info!(
            "archived {} at {} as {} ({} entries)",
            if tree.path().is_empty() { "/" } else { tree.path() },
            tree.revision().short(),
            format,
            entries.len()
        );
        Ok(dest)
    }
}

struct ArchiveEntry {
    path: String,
    entry: WalkEntry,
    data: Vec<u8>,
}

impl ArchiveEntry {
    fn unix_mode(&self) -> u32 {
        if self.entry.mode == MODE_BLOB_EXEC {
            0o755
        } else {
            0o644
        }
    }
}

/// Write a tar stream of `entries` into `w` and return `w`.
fn write_tar<W: Write>(w: W, prefix: &str, mtime: i64, entries: &[ArchiveEntry]) -> Result<W> {
    let mut builder = tar::Builder::new(w);
    let mtime = mtime.max(0) as u64;

    for item in entries {
        let name = format!("{}/{}", prefix, item.path);
        let mut header = tar::Header::new_gnu();
        header.set_mtime(mtime);

        let appended = if item.entry.mode == MODE_LINK {
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_mode(0o777);
            header.set_size(0);
            let target = String::from_utf8_lossy(&item.data).into_owned();
            builder.append_link(&mut header, &name, target)
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(item.unix_mode());
            header.set_size(item.data.len() as u64);
            builder.append_data(&mut header, &name, item.data.as_slice())
        };
        appended.map_err(|e| Error::io(&name, e))?;
    }

    builder.into_inner().map_err(|e| Error::io(prefix, e))
}

fn write_zip(file: &File, prefix: &str, mtime: i64, entries: &[ArchiveEntry]) -> io::Result<()> {
    let mut zip = zip::ZipWriter::new(file);
    let modified = zip_time(mtime);
    let options = |mode: u32| {
        zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(modified)
            .unix_permissions(mode)
    };

    for item in entries {
        let name = format!("{}/{}", prefix, item.path);
        if item.entry.mode == MODE_LINK {
            let target = String::from_utf8_lossy(&item.data).into_owned();
            zip.add_symlink(name, target, options(0o777))
                .map_err(io::Error::other)?;
        } else {
            zip.start_file(name, options(item.unix_mode()))
                .map_err(io::Error::other)?;
            zip.write_all(&item.data)?;
        }
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

/// DOS timestamps start in 1980; earlier times are clamped to that epoch.
fn zip_time(secs: i64) -> zip::DateTime {
    let Some(t) = chrono::DateTime::from_timestamp(secs, 0) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(
        t.year().clamp(1980, 2107) as u16,
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(ArchiveFormat::from_name("tar.gz").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_name(".TGZ").unwrap(), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_name("tar.xz").unwrap(), ArchiveFormat::TarXz);
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert!(ArchiveFormat::from_name("rar").is_err());
        for f in ArchiveFormat::ALL {
            assert_eq!(ArchiveFormat::from_name(f.extension()).unwrap(), f);
        }
    }

    #[test]
    fn zip_time_clamps_pre_dos_epoch() {
        assert_eq!(zip_time(0).year(), 1980);
        let t = zip_time(1_700_000_000);
        assert_eq!(t.year(), 2023);
        assert_eq!(t.month(), 11);
    }
}
