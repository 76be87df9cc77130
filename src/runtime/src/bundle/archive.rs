//! Bundle archive creation.
//!
//! Walks a bundle root and writes every regular file and symlink into a
//! gzip-compressed tar stream. Unless an ignore pattern excludes it, the
//! descriptor entry carries the in-memory descriptor, whether or not a file
//! of that name exists on disk.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use a3s_app_core::config::{DEFAULT_DESCRIPTOR_FILE, DEFAULT_IGNORE_FILE};
use a3s_app_core::error::{AppError, Result};
use a3s_app_core::{BundleConfig, EventEmitter, EventPayload};
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{EntryType, Header, HeaderMode};
use walkdir::WalkDir;

use super::ignore::IgnoreRules;

/// Kind of an archived entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Symlink,
}

/// One entry written into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative, `/`-separated name
    pub name: String,
    /// Content size in bytes (0 for symlinks)
    pub size: u64,
    pub kind: EntryKind,
}

/// A finished bundle archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// Gzip-compressed tar bytes
    pub data: Vec<u8>,
    /// Entries in write order
    pub entries: Vec<ArchiveEntry>,
}

/// Builds a bundle archive from a directory.
pub struct ArchiveBuilder {
    root: PathBuf,
    descriptor_file: String,
    ignore_file: String,
    prune_ignored_dirs: bool,
    events: Option<EventEmitter>,
}

impl ArchiveBuilder {
    /// Builder for `root` with the default descriptor and ignore file names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            prune_ignored_dirs: false,
            events: None,
        }
    }

    /// Builder configured from a [`BundleConfig`].
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            root: config.bundle_root.clone(),
            descriptor_file: config.descriptor_file.clone(),
            ignore_file: config.ignore_file.clone(),
            prune_ignored_dirs: config.prune_ignored_dirs,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn prune_ignored_dirs(mut self, prune: bool) -> Self {
        self.prune_ignored_dirs = prune;
        self
    }

    /// Archive the root, substituting `descriptor` for the descriptor entry.
    pub fn build(&self, descriptor: &[u8]) -> Result<Archive> {
        if !self.root.is_dir() {
            return Err(AppError::ArchiveError(format!(
                "Bundle root {} is not a directory",
                self.root.display()
            )));
        }

        let rules = IgnoreRules::load(&self.root.join(&self.ignore_file))?;
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut entries = Vec::new();
        let mut noticed: HashSet<String> = HashSet::new();
        let mut wrote_descriptor = false;

        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| {
                AppError::ArchiveError(format!("Can't stat file to tar: {}", e))
            })?;
            let name = entry_name(&self.root, entry.path())?;
            let file_type = entry.file_type();

            if name == self.ignore_file {
                continue;
            }

            if let Some(pattern) = rules.matching(&name) {
                if file_type.is_dir() && !self.prune_ignored_dirs {
                    continue;
                }
                self.notice(&mut noticed, pattern, &name);
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            if name == self.descriptor_file && !file_type.is_dir() {
                let metadata = entry.metadata().map_err(|e| {
                    AppError::ArchiveError(format!("Can't stat {}: {}", name, e))
                })?;
                let mut header = Header::new_gnu();
                header.set_metadata_in_mode(&metadata, HeaderMode::Complete);
                header.set_entry_type(EntryType::Regular);
                entries.push(self.append_bytes(&mut builder, &mut header, &name, descriptor)?);
                wrote_descriptor = true;
                continue;
            }

            if file_type.is_dir() {
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| AppError::ArchiveError(format!("Can't stat {}: {}", name, e)))?;
            let mut header = Header::new_gnu();
            header.set_metadata_in_mode(&metadata, HeaderMode::Complete);

            if file_type.is_symlink() {
                let target = std::fs::read_link(entry.path()).map_err(|e| {
                    AppError::ArchiveError(format!("Can't find symlink {}: {}", name, e))
                })?;
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
                builder
                    .append_link(&mut header, &name, &target)
                    .map_err(|e| write_error(&name, e))?;
                entries.push(self.record(&name, 0, EntryKind::Symlink));
            } else if file_type.is_file() {
                let file = File::open(entry.path()).map_err(|e| {
                    AppError::ArchiveError(format!("Can't open {}: {}", name, e))
                })?;
                header.set_size(metadata.len());
                builder
                    .append_data(&mut header, &name, file)
                    .map_err(|e| write_error(&name, e))?;
                entries.push(self.record(&name, metadata.len(), EntryKind::Regular));
            } else {
                return Err(AppError::UnsupportedEntryError {
                    path: name,
                    kind: irregular_kind(&file_type).to_string(),
                });
            }
        }

        let descriptor_ignored = rules.matching(&self.descriptor_file);
        if let (false, Some(pattern)) = (wrote_descriptor, descriptor_ignored) {
            let name = self.descriptor_file.clone();
            self.notice(&mut noticed, pattern, &name);
        } else if !wrote_descriptor {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_mtime(0);
            let name = self.descriptor_file.clone();
            entries.push(self.append_bytes(&mut builder, &mut header, &name, descriptor)?);
        }

        let data = builder
            .into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| AppError::ArchiveError(format!("Can't finish archive: {}", e)))?;

        tracing::info!(
            root = %self.root.display(),
            entries = entries.len(),
            patterns = rules.len(),
            size = data.len(),
            "Built bundle archive"
        );
        Ok(Archive { data, entries })
    }

    fn append_bytes(
        &self,
        builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
        header: &mut Header,
        name: &str,
        data: &[u8],
    ) -> Result<ArchiveEntry> {
        header.set_size(data.len() as u64);
        builder
            .append_data(header, name, data)
            .map_err(|e| write_error(name, e))?;
        Ok(self.record(name, data.len() as u64, EntryKind::Regular))
    }

    /// Report the first entry each pattern excludes.
    fn notice(&self, noticed: &mut HashSet<String>, pattern: &str, name: &str) {
        if noticed.insert(pattern.to_string()) {
            tracing::debug!(pattern = %pattern, path = %name, "Ignoring entry");
            self.emit(EventPayload::PatternIgnored {
                pattern: pattern.to_string(),
                path: name.to_string(),
            });
        }
    }

    fn record(&self, name: &str, size: u64, kind: EntryKind) -> ArchiveEntry {
        self.emit(EventPayload::EntryArchived {
            name: name.to_string(),
            size,
        });
        ArchiveEntry {
            name: name.to_string(),
            size,
            kind,
        }
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(events) = &self.events {
            events.emit(payload);
        }
    }
}

/// Relative `/`-separated name of `path` under `root`.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|e| {
        AppError::ArchiveError(format!(
            "Failed to compute relative path for {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                AppError::ArchiveError(format!(
                    "Can't tar {}: name is not valid UTF-8",
                    path.display()
                ))
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}

fn write_error(name: &str, e: std::io::Error) -> AppError {
    AppError::ArchiveError(format!("Can't write {} to archive: {}", name, e))
}

#[cfg(unix)]
fn irregular_kind(file_type: &std::fs::FileType) -> &'static str {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_socket() {
        "socket"
    } else if file_type.is_fifo() {
        "fifo"
    } else if file_type.is_block_device() {
        "block device"
    } else if file_type.is_char_device() {
        "character device"
    } else {
        "unknown"
    }
}

#[cfg(not(unix))]
fn irregular_kind(_file_type: &std::fs::FileType) -> &'static str {
    "unknown"
}
