//! The transcoding engine seam and the inputs handed to it.

/// Encode argv assembly.
pub mod command;
/// Engine trait plus the ffmpeg and in-memory implementations.
pub mod engine;
/// Concat-demuxer playlist.
pub mod playlist;

pub use command::EncodeCommand;
pub use engine::{ConversionEngine, FfmpegEngine, MemoryEngine, MemoryEngineFault};
pub use playlist::{Playlist, PlaylistEntry};
