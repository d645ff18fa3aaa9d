//! # Engine Module
//!
//! The streaming analysis pipeline: trajectories are loaded chunk by chunk into
//! a host molecule, every frame is handed to the registered callbacks, and
//! collectors turn frames into rows of a [`dataset::DataSet`].
//!
//! ## Architecture
//!
//! - **Host Interface** ([`host`]) - The `FrameStore` and `GeometryProvider` traits a molecule implements
//! - **Streaming** ([`loader`], [`step`]) - Chunked loading and the per-frame cursor
//! - **Measurements** ([`collector`]) - Frame number, coordinates, distances, angles, dihedrals and RMSD
//! - **Accumulation** ([`dataset`], [`format`]) - Growable columnar storage and printf-style output
//! - **Configuration** ([`config`]) - Loader parameters and declarative column specifications
//! - **Progress Monitoring** ([`progress`]) - Optional progress events for front ends
//! - **Error Handling** ([`error`]) - Pipeline error type
//!
//! Work is strictly sequential: one loader drives one molecule, and callbacks run
//! one after another on the calling thread.

pub mod collector;
pub mod config;
pub mod dataset;
pub mod error;
pub mod format;
pub mod host;
pub mod loader;
pub mod progress;
pub(crate) mod scratch;
pub mod step;
