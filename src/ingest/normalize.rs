use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;

use crate::encode::engine::is_ffmpeg_available;
use crate::foundation::core::SourceBlob;
use crate::foundation::error::{ReelError, ReelResult};

/// MIME types of the HEIC/HEIF family.
pub const LEGACY_MIME_TYPES: [&str; 4] = [
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];

/// File extensions of the HEIC/HEIF family.
pub const LEGACY_EXTENSIONS: [&str; 3] = ["heic", "heif", "hif"];

/// Extension and MIME type written by every legacy decode.
pub const NORMALIZED_EXTENSION: &str = "png";
pub const NORMALIZED_MIME: &str = "image/png";

/// Return `true` when a file belongs to the HEIC/HEIF family.
///
/// Hosts often report no MIME type for these files, so the extension is always checked as well.
pub fn is_legacy_format(name: &str, mime: Option<&str>) -> bool {
    if let Some(mime) = mime {
        let mime = mime.trim().to_ascii_lowercase();
        if LEGACY_MIME_TYPES.contains(&mime.as_str()) {
            return true;
        }
    }
    crate::foundation::core::file_extension(name)
        .is_some_and(|ext| LEGACY_EXTENSIONS.contains(&ext.as_str()))
}

/// Decoder for the legacy format: encoded bytes in, [`NORMALIZED_MIME`] bytes out.
pub trait LegacyDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> ReelResult<Vec<u8>>;
}

type DecoderLoader = Box<dyn Fn() -> ReelResult<Arc<dyn LegacyDecoder>> + Send + Sync>;

/// Lazily loaded, shared legacy decoder.
///
/// The loader runs on the first [`DecoderCache::get`]; the decoder it returns is kept for the
/// lifetime of the cache and never unloaded. A failed load is not cached, the next `get` retries.
pub struct DecoderCache {
    loader: DecoderLoader,
    slot: Mutex<Option<Arc<dyn LegacyDecoder>>>,
    loads: AtomicUsize,
}

impl DecoderCache {
    pub fn new(
        loader: impl Fn() -> ReelResult<Arc<dyn LegacyDecoder>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Cache backed by [`FfmpegLegacyDecoder`]. Loading probes the executable once.
    pub fn ffmpeg(ffmpeg: impl Into<PathBuf>) -> Self {
        let ffmpeg = ffmpeg.into();
        Self::new(move || {
            let decoder = FfmpegLegacyDecoder::load(ffmpeg.clone())?;
            Ok(Arc::new(decoder) as Arc<dyn LegacyDecoder>)
        })
    }

    pub fn get(&self) -> ReelResult<Arc<dyn LegacyDecoder>> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(decoder) = slot.as_ref() {
            return Ok(Arc::clone(decoder));
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("loading legacy image decoder");
        let decoder = (self.loader)()?;
        *slot = Some(Arc::clone(&decoder));
        Ok(decoder)
    }

    /// Number of times the loader has run.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for DecoderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderCache")
            .field("loaded", &self.is_loaded())
            .field("loads", &self.load_count())
            .finish()
    }
}

/// Decodes HEIC/HEIF through the system `ffmpeg` and re-encodes the first picture as PNG.
#[derive(Clone, Debug)]
pub struct FfmpegLegacyDecoder {
    ffmpeg: PathBuf,
}

impl FfmpegLegacyDecoder {
    /// Verify `ffmpeg` runs before handing out a decoder.
    pub fn load(ffmpeg: PathBuf) -> ReelResult<Self> {
        if !is_ffmpeg_available(&ffmpeg) {
            return Err(ReelError::decode(format!(
                "HEIC/HEIF decoding needs ffmpeg, but '{}' could not be run",
                ffmpeg.display()
            )));
        }
        Ok(Self { ffmpeg })
    }
}

impl LegacyDecoder for FfmpegLegacyDecoder {
    fn decode(&self, raw: &[u8]) -> ReelResult<Vec<u8>> {
        // HEIF demuxing needs a seekable input, so the bytes go through a temp file.
        let mut input = tempfile::Builder::new()
            .prefix("stillreel-legacy-")
            .suffix(".heic")
            .tempfile()
            .context("failed to create temp file for HEIC decode")?;
        std::io::Write::write_all(&mut input, raw).context("failed to stage HEIC bytes")?;

        let out = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(input.path())
            .args([
                "-frames:v",
                "1",
                "-c:v",
                "png",
                "-f",
                "image2pipe",
                "pipe:1",
            ])
            .output()
            .map_err(|e| ReelError::decode(format!("failed to run ffmpeg: {e}")))?;

        if !out.status.success() || out.stdout.is_empty() {
            return Err(ReelError::decode(format!(
                "ffmpeg could not decode image: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(out.stdout)
    }
}

/// Per-file decode failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizeFailure {
    pub name: String,
    pub message: String,
}

/// Result of normalizing one batch.
#[derive(Clone, Debug, Default)]
pub struct NormalizeOutcome {
    /// Converted and passthrough files, in input order. Failed files are absent.
    pub files: Vec<SourceBlob>,
    pub converted_count: usize,
    pub errors: Vec<NormalizeFailure>,
}

/// Converts legacy-format images into PNG before anything else reads them.
#[derive(Clone, Debug)]
pub struct FormatNormalizer {
    decoders: Arc<DecoderCache>,
}

impl FormatNormalizer {
    pub fn new(decoders: Arc<DecoderCache>) -> Self {
        Self { decoders }
    }

    pub fn decoders(&self) -> &Arc<DecoderCache> {
        &self.decoders
    }

    /// Normalize `files`. A failed decode drops that file and is reported, it never fails the batch.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub fn normalize_batch(&self, files: Vec<SourceBlob>) -> NormalizeOutcome {
        let mut out = NormalizeOutcome {
            files: Vec::with_capacity(files.len()),
            ..NormalizeOutcome::default()
        };
        // Loaded at most once per batch; a load failure is reported against every legacy file.
        let mut decoder: Option<Result<Arc<dyn LegacyDecoder>, String>> = None;

        for file in files {
            if !is_legacy_format(&file.name, file.mime.as_deref()) {
                out.files.push(file);
                continue;
            }

            let decoder = decoder.get_or_insert_with(|| {
                self.decoders.get().map_err(|e| e.to_string())
            });
            let result = match decoder {
                Ok(decoder) => decoder.decode(&file.bytes).map_err(|e| e.to_string()),
                Err(msg) => Err(msg.clone()),
            };

            match result {
                Ok(bytes) => {
                    let name = format!("{}.{NORMALIZED_EXTENSION}", file.stem());
                    tracing::debug!(from = %file.name, to = %name, "normalized legacy image");
                    out.files.push(SourceBlob::new(
                        name,
                        Some(NORMALIZED_MIME.to_string()),
                        bytes,
                    ));
                    out.converted_count += 1;
                }
                Err(message) => {
                    tracing::warn!(name = %file.name, %message, "legacy image decode failed");
                    out.errors.push(NormalizeFailure {
                        name: file.name,
                        message,
                    });
                }
            }
        }

        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ingest/normalize.rs"]
mod tests;
