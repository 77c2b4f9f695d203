//! The conversion run: phases, cancellation and the orchestrator that drives the engine.

pub mod orchestrator;
pub mod phase;

pub use orchestrator::{Converter, OutputArtifact};
pub use phase::{CancelToken, ConversionPhase};
