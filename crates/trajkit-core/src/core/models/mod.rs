//! # Core Models Module
//!
//! - [`atom`] - Topology record of a single atom
//! - [`selection`] - Parser and evaluator for atom selection expressions
//! - [`molecule`] - [`MemoryMolecule`](molecule::MemoryMolecule), an in-memory host molecule

pub mod atom;
pub mod molecule;
pub mod selection;
