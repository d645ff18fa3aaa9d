use super::atom::Atom;
use super::selection::Selection;
use crate::core::io::xyz::{XyzError, XyzFile, XyzReader};
use crate::engine::host::{AtomIndex, FrameRange, FrameStore, GeometryProvider, HostError};
use nalgebra::{Isometry3, Point3};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

type Coordinates = Vec<Point3<f64>>;

/// In-memory molecule implementing the host traits.
///
/// Holds a fixed topology and a growable list of frames. Trajectories are
/// either registered in memory under a path or streamed from multi-frame XYZ
/// files on disk, in which case only the requested frames are kept.
#[derive(Debug, Default)]
pub struct MemoryMolecule {
    name: String,
    atoms: Vec<Atom>,
    frames: Vec<Coordinates>,
    active: Option<usize>,
    trajectories: HashMap<PathBuf, Vec<Coordinates>>,
    cursor: Option<XyzCursor>,
}

/// Open XYZ trajectory positioned before frame `next`.
///
/// Consecutive chunks of the same file resume here instead of rescanning
/// from the first frame.
#[derive(Debug)]
struct XyzCursor {
    path: PathBuf,
    reader: XyzReader<BufReader<File>>,
    next: usize,
}

impl XyzCursor {
    fn open(path: &Path, atoms: usize) -> Result<Self, HostError> {
        let reader = XyzReader::open(path).map_err(|e| HostError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: reader.expecting_atoms(atoms),
            next: 0,
        })
    }

    fn can_serve(&self, path: &Path, range: &FrameRange) -> bool {
        self.path == path && self.next <= range.start
    }

    /// Reads the frames of `range` still ahead of the cursor.
    ///
    /// Returns the frames and whether the end of the file was reached.
    fn read(&mut self, range: &FrameRange) -> Result<(Vec<Coordinates>, bool), XyzError> {
        let mut loaded = Vec::new();
        while self.next <= range.stop {
            if range.contains(self.next) {
                match self.reader.read_frame()? {
                    Some(frame) => loaded.push(frame.coords),
                    None => return Ok((loaded, true)),
                }
            } else if !self.reader.skip_frame()? {
                return Ok((loaded, true));
            }
            self.next += 1;
        }
        Ok((loaded, false))
    }
}

impl MemoryMolecule {
    /// Creates a molecule with the given topology and no frames.
    pub fn new(name: &str, atoms: Vec<Atom>) -> Self {
        Self {
            name: name.to_string(),
            atoms,
            ..Self::default()
        }
    }

    /// Creates a molecule from the first frame of an XYZ file.
    ///
    /// The first frame becomes frame 0 of the molecule.
    pub fn from_xyz_path(path: &Path) -> Result<Self, HostError> {
        let (atoms, coords) =
            XyzFile::read_topology_from_path(path).map_err(|e| host_error(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut molecule = Self::new(&name, atoms);
        molecule.add_frame(coords)?;
        Ok(molecule)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn frame(&self, index: usize) -> Option<&[Point3<f64>]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// Appends a frame and makes it active.
    pub fn add_frame(&mut self, coords: Coordinates) -> Result<usize, HostError> {
        if coords.len() != self.atoms.len() {
            return Err(HostError::Other(format!(
                "frame has {} atoms, molecule '{}' has {}",
                coords.len(),
                self.name,
                self.atoms.len()
            )));
        }
        self.frames.push(coords);
        let index = self.frames.len() - 1;
        self.active = Some(index);
        Ok(index)
    }

    /// Registers an in-memory trajectory that `load_frames` serves for `path`.
    pub fn register_trajectory(
        &mut self,
        path: impl Into<PathBuf>,
        frames: Vec<Coordinates>,
    ) -> Result<(), HostError> {
        let path = path.into();
        if let Some(found) = frames.iter().map(Vec::len).find(|&n| n != self.atoms.len()) {
            return Err(HostError::AtomCountMismatch {
                path,
                expected: self.atoms.len(),
                found,
            });
        }
        self.trajectories.insert(path, frames);
        Ok(())
    }

    fn check_frame(&self, frame: usize) -> Result<(), HostError> {
        if frame < self.frames.len() {
            Ok(())
        } else {
            Err(HostError::FrameOutOfRange {
                frame,
                num_frames: self.frames.len(),
            })
        }
    }

    fn read_xyz_frames(
        &mut self,
        path: &Path,
        range: FrameRange,
    ) -> Result<Vec<Coordinates>, HostError> {
        let mut cursor = match self.cursor.take() {
            Some(cursor) if cursor.can_serve(path, &range) => cursor,
            _ => XyzCursor::open(path, self.atoms.len())?,
        };
        let (loaded, exhausted) = cursor.read(&range).map_err(|e| host_error(path, e))?;
        if !exhausted {
            self.cursor = Some(cursor);
        }
        Ok(loaded)
    }
}

fn host_error(path: &Path, error: XyzError) -> HostError {
    match error {
        XyzError::Io(source) => HostError::Io {
            path: path.to_path_buf(),
            source,
        },
        XyzError::Parse { line, message } => HostError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        },
        XyzError::AtomCount {
            expected, found, ..
        } => HostError::AtomCountMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        },
        XyzError::Empty => HostError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message: "file contains no frames".to_string(),
        },
    }
}

impl FrameStore for MemoryMolecule {
    fn load_frames(&mut self, path: &Path, range: FrameRange) -> Result<usize, HostError> {
        if range.stride == 0 {
            return Err(HostError::Other("frame stride must be positive".to_string()));
        }
        let loaded: Vec<Coordinates> = match self.trajectories.get(path) {
            Some(frames) => frames
                .iter()
                .enumerate()
                .filter(|(index, _)| range.contains(*index))
                .map(|(_, frame)| frame.clone())
                .collect(),
            None => self.read_xyz_frames(path, range)?,
        };
        let count = loaded.len();
        debug!(
            "Molecule '{}' appended {} frame(s) from {}",
            self.name,
            count,
            path.display()
        );
        self.frames.extend(loaded);
        if count > 0 {
            self.active = Some(self.frames.len() - 1);
        }
        Ok(count)
    }

    fn num_frames(&self) -> usize {
        self.frames.len()
    }

    fn active_frame(&self) -> Option<usize> {
        self.active
    }

    fn set_active_frame(&mut self, frame: usize) -> Result<(), HostError> {
        self.check_frame(frame)?;
        self.active = Some(frame);
        Ok(())
    }

    fn duplicate_frame(&mut self, frame: usize) -> Result<usize, HostError> {
        self.check_frame(frame)?;
        let copy = self.frames[frame].clone();
        self.frames.push(copy);
        let index = self.frames.len() - 1;
        self.active = Some(index);
        Ok(index)
    }

    fn delete_frames(&mut self, frames: Range<usize>) -> Result<(), HostError> {
        if frames.is_empty() {
            return Ok(());
        }
        if frames.end > self.frames.len() {
            return Err(HostError::FrameOutOfRange {
                frame: frames.end - 1,
                num_frames: self.frames.len(),
            });
        }
        self.frames.drain(frames);
        self.active = match self.active {
            _ if self.frames.is_empty() => None,
            Some(active) => Some(active.min(self.frames.len() - 1)),
            None => None,
        };
        Ok(())
    }
}

impl GeometryProvider for MemoryMolecule {
    fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    fn select(&self, expression: &str, frame: usize) -> Result<Vec<AtomIndex>, HostError> {
        self.check_frame(frame)?;
        let selection = Selection::parse(expression).map_err(|e| HostError::InvalidSelection {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(selection.resolve(&self.atoms))
    }

    fn coordinates(
        &self,
        atoms: &[AtomIndex],
        frame: usize,
    ) -> Result<Vec<Point3<f64>>, HostError> {
        self.check_frame(frame)?;
        let coords = &self.frames[frame];
        atoms
            .iter()
            .map(|&atom| {
                coords.get(atom).copied().ok_or(HostError::AtomOutOfRange {
                    atom,
                    num_atoms: self.atoms.len(),
                })
            })
            .collect()
    }

    fn transform_frame(
        &mut self,
        frame: usize,
        transform: &Isometry3<f64>,
    ) -> Result<(), HostError> {
        self.check_frame(frame)?;
        for p in self.frames[frame].iter_mut() {
            *p = transform * *p;
        }
        Ok(())
    }
}
