use std::collections::VecDeque;
use std::sync::Arc;

use super::*;
use crate::foundation::error::{ReelError, ReelResult};
use crate::ingest::normalize::{DecoderCache, LegacyDecoder};
use crate::ingest::walk::DirectoryHandle;

struct MemFile {
    name: String,
    mime: Option<String>,
    bytes: Option<Vec<u8>>,
}

impl FileHandle for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    fn read(&self) -> ReelResult<Vec<u8>> {
        self.bytes
            .clone()
            .ok_or_else(|| ReelError::ingest(format!("{} vanished", self.name)))
    }
}

/// Directory that serves one child per page, like a host with a tiny listing batch.
struct MemDir {
    name: String,
    children: VecDeque<DropEntry>,
    reads: Arc<std::sync::atomic::AtomicUsize>,
}

impl DirectoryHandle for MemDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self) -> ReelResult<Vec<DropEntry>> {
        self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.children.pop_front().into_iter().collect())
    }
}

fn file(name: &str, mime: Option<&str>) -> DropEntry {
    DropEntry::File(Box::new(MemFile {
        name: name.to_string(),
        mime: mime.map(str::to_string),
        bytes: Some(name.as_bytes().to_vec()),
    }))
}

fn dir(name: &str, children: Vec<DropEntry>) -> DropEntry {
    DropEntry::Directory(Box::new(MemDir {
        name: name.to_string(),
        children: children.into(),
        reads: Arc::default(),
    }))
}

struct NullDecoder;

impl LegacyDecoder for NullDecoder {
    fn decode(&self, raw: &[u8]) -> ReelResult<Vec<u8>> {
        if raw.starts_with(b"broken") {
            return Err(ReelError::decode("bad heif box"));
        }
        Ok(raw.to_vec())
    }
}

fn normalizer() -> FormatNormalizer {
    FormatNormalizer::new(Arc::new(DecoderCache::new(|| {
        Ok(Arc::new(NullDecoder) as Arc<dyn LegacyDecoder>)
    })))
}

#[test]
fn folder_with_images_junk_and_empty_subfolder() {
    let entries = vec![dir(
        "trip",
        vec![
            file("img_10.png", Some("image/png")),
            file("notes.txt", Some("text/plain")),
            dir("empty", vec![]),
            file("img_2.jpg", Some("image/jpeg")),
        ],
    )];

    let report = ingest(entries, &normalizer());
    assert_eq!(report.ordered_files.len(), 2);
    assert_eq!(report.folder_count, 1);
    assert_eq!(report.ignored_count, 1);
    assert_eq!(report.normalized_count, 0);
    assert!(report.warning.is_none());
    let names: Vec<_> = report.ordered_files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["img_2.jpg", "img_10.png"]);
}

#[test]
fn paginated_listing_is_drained_until_empty_page() {
    let reads = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let entries = vec![DropEntry::Directory(Box::new(MemDir {
        name: "many".to_string(),
        children: (0..5)
            .map(|i| file(&format!("f{i}.png"), Some("image/png")))
            .collect(),
        reads: Arc::clone(&reads),
    }))];

    let report = ingest(entries, &normalizer());
    assert_eq!(report.ordered_files.len(), 5);
    // Five single-entry pages plus the terminating empty page.
    assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 6);
}

#[test]
fn nested_folders_and_loose_files_are_merged_and_sorted() {
    let mut deep = dir("d3", vec![file("shot_3.png", Some("image/png"))]);
    for level in (0..3).rev() {
        deep = dir(&format!("d{level}"), vec![deep]);
    }
    let entries = vec![
        file("shot_10.png", Some("image/png")),
        deep,
        file("shot_1.HEIC", None),
        file("readme.md", None),
    ];

    let report = ingest(entries, &normalizer());
    let names: Vec<_> = report.ordered_files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["shot_1.png", "shot_3.png", "shot_10.png"]);
    assert_eq!(report.folder_count, 1);
    assert_eq!(report.ignored_count, 1);
    assert_eq!(report.normalized_count, 1);
}

#[test]
fn read_and_decode_failures_are_reported_not_raised() {
    let entries = vec![
        DropEntry::File(Box::new(MemFile {
            name: "gone.png".to_string(),
            mime: Some("image/png".to_string()),
            bytes: None,
        })),
        DropEntry::File(Box::new(MemFile {
            name: "broken.heic".to_string(),
            mime: None,
            bytes: Some(b"broken".to_vec()),
        })),
        file("ok.png", Some("image/png")),
    ];

    let report = ingest(entries, &normalizer());
    assert_eq!(report.ordered_files.len(), 1);
    let failed: Vec<_> = report.errors.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(failed, vec!["gone.png", "broken.heic"]);
}

#[test]
fn empty_selection_is_a_warning() {
    let report = ingest(vec![file("a.txt", Some("text/plain"))], &normalizer());
    assert!(report.is_empty());
    assert_eq!(report.warning.as_deref(), Some(EMPTY_SELECTION_WARNING));

    let report = ingest(Vec::new(), &normalizer());
    assert!(report.warning.is_some());
}

#[test]
fn supported_predicate() {
    assert!(is_supported_image("a.png", Some("image/png")));
    assert!(is_supported_image("a", Some("IMAGE/WEBP")));
    assert!(is_supported_image("a.heic", None));
    assert!(!is_supported_image("a.png", None));
    assert!(!is_supported_image("a.mp4", Some("video/mp4")));
}
