//! High-level entry points that tie the engine and the core together.

pub mod analyze;
