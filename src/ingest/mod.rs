//! Turning a raw drop/selection into an ordered list of image blobs.

/// Legacy-format (HEIC/HEIF) detection and conversion.
pub mod normalize;
/// Natural file name ordering.
pub mod order;
/// Caller-owned frame list.
pub mod sequence;
/// Host directory/file traversal.
pub mod walk;

use crate::foundation::core::SourceBlob;
use normalize::{FormatNormalizer, NormalizeFailure, is_legacy_format};
use walk::{DropEntry, FileHandle, walk_entries};

/// Shown when nothing in the selection was usable.
pub const EMPTY_SELECTION_WARNING: &str = "No supported images found in the selection.";

/// Outcome of [`ingest`].
#[derive(Clone, Debug, Default)]
pub struct IngestReport {
    /// Usable images in natural file name order.
    pub ordered_files: Vec<SourceBlob>,
    /// Directories dropped at the top level of the selection.
    pub folder_count: usize,
    /// Files skipped because they are not images.
    pub ignored_count: usize,
    /// Legacy-format images converted to PNG.
    pub normalized_count: usize,
    /// Directories whose listing failed part-way.
    pub unreadable_folder_count: usize,
    /// Files that were candidates but could not be read or decoded.
    pub errors: Vec<NormalizeFailure>,
    /// Set when `ordered_files` is empty.
    pub warning: Option<String>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.ordered_files.is_empty()
    }
}

/// Supported-image predicate: an `image/*` MIME type, or a legacy-format name when the host
/// left the type empty.
pub fn is_supported_image(name: &str, mime: Option<&str>) -> bool {
    let declared_image = mime.is_some_and(|m| m.trim().to_ascii_lowercase().starts_with("image/"));
    declared_image || is_legacy_format(name, mime)
}

/// Flatten, filter, normalize and order a selection.
///
/// Per-file problems (unsupported types, unreadable files, failed decodes) are counted or listed
/// in the report; this never fails as a whole. An empty result carries
/// [`EMPTY_SELECTION_WARNING`].
#[tracing::instrument(skip_all, fields(entries = entries.len()))]
pub fn ingest(entries: Vec<DropEntry>, normalizer: &FormatNormalizer) -> IngestReport {
    let walked = walk_entries(entries, |f: &dyn FileHandle| {
        is_supported_image(f.name(), f.mime())
    });

    let mut errors = Vec::new();
    let mut blobs = Vec::with_capacity(walked.files.len());
    for file in walked.files {
        match file.read() {
            Ok(bytes) => blobs.push(SourceBlob::new(
                file.name(),
                file.mime().map(str::to_string),
                bytes,
            )),
            Err(e) => {
                tracing::warn!(name = file.name(), error = %e, "failed to read file");
                errors.push(NormalizeFailure {
                    name: file.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    let normalized = normalizer.normalize_batch(blobs);
    errors.extend(normalized.errors);

    let mut ordered_files = normalized.files;
    order::sort_natural_by(&mut ordered_files, |f| f.name.as_str());

    let warning = ordered_files.is_empty().then(|| {
        tracing::warn!("selection produced no usable images");
        EMPTY_SELECTION_WARNING.to_string()
    });

    tracing::info!(
        files = ordered_files.len(),
        folders = walked.folder_count,
        ignored = walked.ignored_count,
        normalized = normalized.converted_count,
        errors = errors.len(),
        "ingested selection"
    );

    IngestReport {
        ordered_files,
        folder_count: walked.folder_count,
        ignored_count: walked.ignored_count,
        unreadable_folder_count: walked.unreadable_dirs,
        normalized_count: normalized.converted_count,
        errors,
        warning,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/ingest.rs"]
mod tests;
