//! Output sizing and filter-graph synthesis. Nothing here runs the engine.

/// Typed filter graph builder.
pub mod filter;
/// Output size selection.
pub mod resolve;
