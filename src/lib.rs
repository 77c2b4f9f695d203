//! Stillreel turns a selection of still images into an MP4, entirely on the local machine.
//!
//! The pipeline has two halves:
//!
//! - [`ingest`] flattens files and folders, converts HEIC/HEIF to PNG and orders the result
//! - [`Converter`] stages the frames into a [`ConversionEngine`], synthesizes the ffmpeg
//!   invocation and collects the finished video
#![forbid(unsafe_code)]

mod foundation;

/// Conversion runs.
pub mod convert;
/// Transcoding engines and their inputs.
pub mod encode;
/// Output sizing and filter graphs.
pub mod graph;
/// Selection ingestion.
pub mod ingest;
/// Conversion settings and presets.
pub mod settings;

pub use crate::foundation::core::{Dimensions, SourceBlob, format_size, mime_for_extension};
pub use crate::foundation::error::{ReelError, ReelResult};
pub use crate::foundation::handles::{DisplayHandle, HandleKind, HandleRegistry};

pub use crate::convert::{CancelToken, ConversionPhase, Converter, OutputArtifact};
pub use crate::encode::{ConversionEngine, FfmpegEngine, MemoryEngine, MemoryEngineFault};
pub use crate::ingest::normalize::{
    DecoderCache, FfmpegLegacyDecoder, FormatNormalizer, LegacyDecoder,
};
pub use crate::ingest::sequence::{FrameId, FrameItem, FrameSequence};
pub use crate::ingest::walk::{DirectoryHandle, DropEntry, FileHandle, FsDirectory, FsFile};
pub use crate::ingest::{IngestReport, ingest};
pub use crate::settings::overlay::{OverlayConfig, OverlayPosition};
pub use crate::settings::{
    ConversionSettings, FillColor, FpsMode, PresetId, PresetSelection, ResolutionMode,
};
