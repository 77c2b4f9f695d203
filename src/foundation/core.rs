use std::sync::Arc;

use crate::foundation::error::{ReelError, ReelResult};

/// Largest side accepted for an output frame. Even, so rounding up never exceeds it.
pub const MAX_DIMENSION: u32 = 16384;

/// Output frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Create validated dimensions (both sides in `1..=MAX_DIMENSION`).
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation("width/height must be non-zero"));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ReelError::validation(format!(
                "width/height must be at most {MAX_DIMENSION}, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Non-zero dimensions with each side clamped to [`MAX_DIMENSION`].
    pub fn clamped(width: u32, height: u32) -> Option<Self> {
        Self::new(width.min(MAX_DIMENSION), height.min(MAX_DIMENSION)).ok()
    }

    /// Round each side up to the next even integer, capped at [`MAX_DIMENSION`].
    ///
    /// yuv420p halves both chroma planes, so odd sizes are rejected by the encoder.
    pub fn round_up_even(self) -> Self {
        Self {
            width: round_up_even(self.width),
            height: round_up_even(self.height),
        }
    }

    /// Componentwise maximum.
    pub fn max(self, other: Self) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// `"{width}x{height}"`, as shown next to the finished video.
    pub fn label(self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Dimensions {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ReelError::validation(format!("expected WxH, got '{s}'")))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| ReelError::validation(format!("invalid width '{w}': {e}")))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| ReelError::validation(format!("invalid height '{h}': {e}")))?;
        Self::new(width, height)
    }
}

pub(crate) fn round_up_even(v: u32) -> u32 {
    let v = v.min(MAX_DIMENSION);
    if v.is_multiple_of(2) { v } else { v + 1 }
}

/// Binary payload with a file name and an optional declared MIME type.
///
/// Bytes are shared, so cloning a blob (or a frame holding one) is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBlob {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Arc<Vec<u8>>,
}

impl SourceBlob {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.filter(|m| !m.trim().is_empty()),
            bytes: Arc::new(bytes),
        }
    }

    /// Lower-cased extension of `name`, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }

    /// `name` without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(idx) => &self.name[..idx],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub(crate) fn file_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < base.len() => Some(base[idx + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

/// Best-effort MIME type for a file extension.
///
/// Host file pickers usually declare a type; this table covers the local filesystem, which does
/// not. Unknown extensions yield `None`.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mime)
}

/// Human-readable byte size (`"512 B"`, `"1.5 KB"`, `"12.3 MB"`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
