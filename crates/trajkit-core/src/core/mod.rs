//! # Core Module
//!
//! Stateless building blocks shared by the pipeline and the bundled host.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, the in-memory reference molecule and its selection language
//! - **File I/O** ([`io`]) - Multi-frame XYZ reading and writing
//! - **Geometry** ([`utils`]) - Centers, distances, angles, dihedrals, superposition and RMSD

pub mod io;
pub mod models;
pub mod utils;
