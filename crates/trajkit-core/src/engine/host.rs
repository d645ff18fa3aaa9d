//! Interface to the molecular host that owns topology, frames and the selection language.
//!
//! The pipeline treats the host as a black box: a [`FrameStore`] it can fill and
//! drain chunk by chunk, and a [`GeometryProvider`] it can query for coordinates.
//! [`MemoryMolecule`](crate::core::models::molecule::MemoryMolecule) is the
//! in-crate implementation; bindings to an external viewer implement the same traits.

use nalgebra::{Isometry3, Point3};
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Index of an atom inside a molecule's topology (0-based).
pub type AtomIndex = usize;

/// Closed frame range `[start, stop]` read every `stride`-th frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    pub stop: usize,
    pub stride: usize,
}

impl FrameRange {
    pub fn new(start: usize, stop: usize, stride: usize) -> Self {
        Self {
            start,
            stop,
            stride,
        }
    }

    /// Returns `true` if the trajectory frame `index` is requested by this range.
    pub fn contains(&self, index: usize) -> bool {
        self.stride > 0
            && index >= self.start
            && index <= self.stop
            && (index - self.start) % self.stride == 0
    }

    /// Number of frames the range can yield at most.
    pub fn len(&self) -> usize {
        if self.stride == 0 || self.stop < self.start {
            0
        } else {
            (self.stop - self.start) / self.stride + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("File I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}' on line {line}: {message}", path = path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Frame {frame} is out of range (molecule has {num_frames} frames)")]
    FrameOutOfRange { frame: usize, num_frames: usize },

    #[error("Atom {atom} is out of range (molecule has {num_atoms} atoms)")]
    AtomOutOfRange { atom: AtomIndex, num_atoms: usize },

    #[error("Invalid selection '{expression}': {reason}")]
    InvalidSelection { expression: String, reason: String },

    #[error("Trajectory '{path}' has {found} atoms, expected {expected}", path = path.display())]
    AtomCountMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Host error: {0}")]
    Other(String),
}

/// An addressable trajectory buffer owned by one molecule.
pub trait FrameStore {
    /// Appends the frames of `path` selected by `range`, blocking until done.
    ///
    /// Returns the number of frames appended, which is zero once the range
    /// starts past the end of the file.
    fn load_frames(&mut self, path: &Path, range: FrameRange) -> Result<usize, HostError>;

    fn num_frames(&self) -> usize;

    fn active_frame(&self) -> Option<usize>;

    fn set_active_frame(&mut self, frame: usize) -> Result<(), HostError>;

    /// Appends a copy of `frame` and moves the active frame to the copy.
    ///
    /// Returns the index of the new frame.
    fn duplicate_frame(&mut self, frame: usize) -> Result<usize, HostError>;

    fn delete_frames(&mut self, frames: Range<usize>) -> Result<(), HostError>;

    fn clear_frames(&mut self) -> Result<(), HostError> {
        let count = self.num_frames();
        if count > 0 {
            self.delete_frames(0..count)?;
        }
        Ok(())
    }
}

/// Atom selection and coordinate access at an explicit frame.
pub trait GeometryProvider {
    fn num_atoms(&self) -> usize;

    /// Resolves a selection expression at `frame`.
    ///
    /// A well-formed expression matching nothing returns an empty list.
    fn select(&self, expression: &str, frame: usize) -> Result<Vec<AtomIndex>, HostError>;

    fn coordinates(
        &self,
        atoms: &[AtomIndex],
        frame: usize,
    ) -> Result<Vec<Point3<f64>>, HostError>;

    /// Applies `transform` to every atom of `frame`.
    fn transform_frame(&mut self, frame: usize, transform: &Isometry3<f64>)
    -> Result<(), HostError>;
}

/// A host molecule: frame storage plus geometry queries.
pub trait Molecule: FrameStore + GeometryProvider {}

impl<T: FrameStore + GeometryProvider> Molecule for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_contains_strided_frames_only() {
        let range = FrameRange::new(4, 10, 3);
        assert!(range.contains(4));
        assert!(range.contains(7));
        assert!(range.contains(10));
        assert!(!range.contains(5));
        assert!(!range.contains(1));
        assert!(!range.contains(13));
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn frame_range_len_handles_degenerate_ranges() {
        assert_eq!(FrameRange::new(0, 0, 1).len(), 1);
        assert_eq!(FrameRange::new(5, 4, 1).len(), 0);
        assert!(FrameRange::new(0, 9, 0).is_empty());
        assert_eq!(FrameRange::new(0, 9, 2).len(), 5);
    }
}
