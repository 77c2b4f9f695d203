use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{file_extension, mime_for_extension};
use crate::foundation::error::ReelResult;

/// Entries served per directory page by [`FsDirectory`].
pub const FS_PAGE_SIZE: usize = 100;

/// A file the host can hand over on demand.
pub trait FileHandle: Send {
    fn name(&self) -> &str;
    /// Declared MIME type. Hosts frequently leave this empty for HEIC/HEIF.
    fn mime(&self) -> Option<&str>;
    fn read(&self) -> ReelResult<Vec<u8>>;
}

/// A directory whose children are listed in pages.
///
/// `read_page` is called repeatedly; an empty page means the listing is exhausted.
pub trait DirectoryHandle: Send {
    fn name(&self) -> &str;
    fn read_page(&mut self) -> ReelResult<Vec<DropEntry>>;
}

/// One item of a drop or file-picker selection.
pub enum DropEntry {
    File(Box<dyn FileHandle>),
    Directory(Box<dyn DirectoryHandle>),
}

impl DropEntry {
    /// Wrap a local path, choosing the variant from filesystem metadata.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to stat '{}'", path.display()))?;
        if meta.is_dir() {
            Ok(Self::Directory(Box::new(FsDirectory::new(path))))
        } else {
            Ok(Self::File(Box::new(FsFile::new(path))))
        }
    }
}

impl std::fmt::Debug for DropEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(file) => f.debug_tuple("File").field(&file.name()).finish(),
            Self::Directory(dir) => f.debug_tuple("Directory").field(&dir.name()).finish(),
        }
    }
}

/// Local file backed by a path. The MIME type is inferred from the extension.
#[derive(Clone, Debug)]
pub struct FsFile {
    path: PathBuf,
    name: String,
    mime: Option<&'static str>,
}

impl FsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = file_extension(&name).and_then(|ext| mime_for_extension(&ext));
        Self { path, name, mime }
    }
}

impl FileHandle for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> Option<&str> {
        self.mime
    }

    fn read(&self) -> ReelResult<Vec<u8>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("failed to read '{}'", self.path.display()))?;
        Ok(bytes)
    }
}

/// Local directory listed in pages of [`FS_PAGE_SIZE`] entries.
pub struct FsDirectory {
    path: PathBuf,
    name: String,
    listing: Option<std::fs::ReadDir>,
    exhausted: bool,
}

impl FsDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            listing: None,
            exhausted: false,
        }
    }
}

impl DirectoryHandle for FsDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self) -> ReelResult<Vec<DropEntry>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        if self.listing.is_none() {
            let rd = std::fs::read_dir(&self.path)
                .with_context(|| format!("failed to list '{}'", self.path.display()))?;
            self.listing = Some(rd);
        }
        let Some(listing) = self.listing.as_mut() else {
            return Ok(Vec::new());
        };

        let mut page = Vec::with_capacity(FS_PAGE_SIZE);
        while page.len() < FS_PAGE_SIZE {
            let Some(entry) = listing.next() else {
                self.exhausted = true;
                break;
            };
            let entry = entry
                .with_context(|| format!("failed to list '{}'", self.path.display()))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("failed to stat '{}'", entry.path().display()))?;
            if file_type.is_dir() {
                page.push(DropEntry::Directory(Box::new(FsDirectory::new(entry.path()))));
            } else {
                page.push(DropEntry::File(Box::new(FsFile::new(entry.path()))));
            }
        }
        Ok(page)
    }
}

/// Flattened result of walking a selection.
#[derive(Default)]
pub(crate) struct WalkOutcome {
    /// Candidate images, in discovery order.
    pub(crate) files: Vec<Box<dyn FileHandle>>,
    /// Directories dropped at the top level of the selection.
    pub(crate) folder_count: usize,
    /// Files rejected by the supported-image predicate.
    pub(crate) ignored_count: usize,
    /// Directories whose listing failed part-way.
    pub(crate) unreadable_dirs: usize,
}

/// Expand `entries` into a flat list of candidate files.
///
/// Directories are expanded with an explicit worklist so nesting depth never grows the call
/// stack. Each directory's listing is drained page by page before the next directory is opened.
pub(crate) fn walk_entries(
    entries: Vec<DropEntry>,
    is_supported: impl Fn(&dyn FileHandle) -> bool,
) -> WalkOutcome {
    let mut out = WalkOutcome::default();
    let mut pending: VecDeque<Box<dyn DirectoryHandle>> = VecDeque::new();

    let accept = |file: Box<dyn FileHandle>, out: &mut WalkOutcome| {
        if is_supported(file.as_ref()) {
            out.files.push(file);
        } else {
            tracing::debug!(name = file.name(), "ignoring unsupported file");
            out.ignored_count += 1;
        }
    };

    for entry in entries {
        match entry {
            DropEntry::File(file) => accept(file, &mut out),
            DropEntry::Directory(dir) => {
                out.folder_count += 1;
                pending.push_back(dir);
            }
        }
    }

    while let Some(mut dir) = pending.pop_front() {
        loop {
            let page = match dir.read_page() {
                Ok(page) => page,
                Err(e) => {
                    // An unreadable directory loses its remaining entries, not the whole batch.
                    tracing::warn!(dir = dir.name(), error = %e, "directory listing failed");
                    out.unreadable_dirs += 1;
                    break;
                }
            };
            if page.is_empty() {
                break;
            }
            for child in page {
                match child {
                    DropEntry::File(file) => accept(file, &mut out),
                    DropEntry::Directory(sub) => pending.push_back(sub),
                }
            }
        }
    }

    out
}
