//! # trajkit Core Library
//!
//! Streaming analysis of molecular dynamics trajectories: frames are loaded in
//! bounded chunks, measured by a set of collectors, and accumulated into a
//! columnar data set written as a fixed-format text table.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Atom`, `MemoryMolecule`),
//!   the selection language, XYZ I/O and pure geometry (dihedrals, Kabsch
//!   superposition, RMSD).
//!
//! - **[`engine`]: The Logic Core.** The host interface (`FrameStore`,
//!   `GeometryProvider`), the chunked `Loader`, the `Collector` family, and the
//!   `DataSet` accumulator with its printf-style column formats.
//!
//! - **[`workflows`]: The Public API.** Runs a declarative analysis plan from
//!   start to finish. This is the entry point used by the command-line tool.

pub mod core;
pub mod engine;
pub mod workflows;
