//! Per-frame measurements that each produce one column value.
//!
//! A [`Collector`] pairs a measurement ([`CollectorKind`]) with the column
//! metadata a [`DataSet`](super::dataset::DataSet) needs: an optional name and
//! the data and header formats. Geometric kinds reduce each selection to its
//! geometric center before measuring, and always evaluate at the frame the
//! [`Step`] points at.

use super::error::AnalysisError;
use super::host::{GeometryProvider, Molecule};
use super::scratch::with_scratch_frame;
use super::step::Step;
use crate::core::utils::geometry;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FORMAT: &str = "%10.4f";
pub const DEFAULT_HEADER_FORMAT: &str = "%10s";
pub const FRAME_NAME: &str = "frame";
pub const FRAME_FORMAT: &str = "%8d";
pub const FRAME_HEADER_FORMAT: &str = "#%7s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

pub type CustomFn = Box<dyn Fn(&mut Step<'_>) -> Result<f64, AnalysisError>>;

/// Reference coordinates for RMSD, in selection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    coords: Vec<Point3<f64>>,
}

impl Reference {
    pub fn from_coords(coords: Vec<Point3<f64>>) -> Self {
        Self { coords }
    }

    /// Snapshots the atoms matched by `selection` at `frame` of `molecule`.
    pub fn capture(
        molecule: &dyn Molecule,
        selection: &str,
        frame: usize,
    ) -> Result<Self, AnalysisError> {
        let atoms = select_nonempty(molecule, selection, frame)?;
        Ok(Self {
            coords: molecule.coordinates(&atoms, frame)?,
        })
    }

    pub fn coords(&self) -> &[Point3<f64>] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

pub enum CollectorKind {
    /// Global frame number.
    Frame,
    /// One component of a selection's center.
    Coordinate { selection: String, axis: Axis },
    /// Distance between two selection centers.
    Distance([String; 2]),
    /// Angle at the second of three selection centers, in degrees.
    Angle([String; 3]),
    /// Dihedral over four selection centers, in degrees within `(-180, 180]`.
    Dihedral([String; 4]),
    /// RMSD of a selection against a reference after optimal superposition.
    Rmsd {
        selection: String,
        reference: Reference,
    },
    Custom(CustomFn),
}

impl fmt::Debug for CollectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorKind::Frame => f.write_str("Frame"),
            CollectorKind::Coordinate { selection, axis } => f
                .debug_struct("Coordinate")
                .field("selection", selection)
                .field("axis", axis)
                .finish(),
            CollectorKind::Distance(s) => f.debug_tuple("Distance").field(s).finish(),
            CollectorKind::Angle(s) => f.debug_tuple("Angle").field(s).finish(),
            CollectorKind::Dihedral(s) => f.debug_tuple("Dihedral").field(s).finish(),
            CollectorKind::Rmsd {
                selection,
                reference,
            } => f
                .debug_struct("Rmsd")
                .field("selection", selection)
                .field("reference_atoms", &reference.len())
                .finish(),
            CollectorKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug)]
pub struct Collector {
    name: Option<String>,
    format: String,
    header_format: String,
    kind: CollectorKind,
}

impl Collector {
    fn with_kind(kind: CollectorKind) -> Self {
        Self {
            name: None,
            format: DEFAULT_FORMAT.to_string(),
            header_format: DEFAULT_HEADER_FORMAT.to_string(),
            kind,
        }
    }

    pub fn frame() -> Self {
        Self {
            name: Some(FRAME_NAME.to_string()),
            format: FRAME_FORMAT.to_string(),
            header_format: FRAME_HEADER_FORMAT.to_string(),
            kind: CollectorKind::Frame,
        }
    }

    pub fn coordinate(selection: &str, axis: Axis) -> Self {
        Self::with_kind(CollectorKind::Coordinate {
            selection: selection.to_string(),
            axis,
        })
    }

    pub fn x(selection: &str) -> Self {
        Self::coordinate(selection, Axis::X)
    }

    pub fn y(selection: &str) -> Self {
        Self::coordinate(selection, Axis::Y)
    }

    pub fn z(selection: &str) -> Self {
        Self::coordinate(selection, Axis::Z)
    }

    pub fn distance(a: &str, b: &str) -> Self {
        Self::with_kind(CollectorKind::Distance([a.to_string(), b.to_string()]))
    }

    pub fn angle(a: &str, b: &str, c: &str) -> Self {
        Self::with_kind(CollectorKind::Angle([
            a.to_string(),
            b.to_string(),
            c.to_string(),
        ]))
    }

    pub fn dihedral(a: &str, b: &str, c: &str, d: &str) -> Self {
        Self::with_kind(CollectorKind::Dihedral([
            a.to_string(),
            b.to_string(),
            c.to_string(),
            d.to_string(),
        ]))
    }

    pub fn rmsd(selection: &str, reference: Reference) -> Self {
        Self::with_kind(CollectorKind::Rmsd {
            selection: selection.to_string(),
            reference,
        })
    }

    pub fn custom<F>(function: F) -> Self
    where
        F: Fn(&mut Step<'_>) -> Result<f64, AnalysisError> + 'static,
    {
        Self::with_kind(CollectorKind::Custom(Box::new(function)))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_formats(mut self, format: &str, header_format: &str) -> Self {
        self.format = format.to_string();
        self.header_format = header_format.to_string();
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn header_format(&self) -> &str {
        &self.header_format
    }

    pub fn kind(&self) -> &CollectorKind {
        &self.kind
    }

    /// Measures the value of this collector at the frame `step` points at.
    pub fn collect(&self, step: &mut Step<'_>) -> Result<f64, AnalysisError> {
        let frame = step.chunk_frame();
        match &self.kind {
            CollectorKind::Frame => Ok(step.frame() as f64),
            CollectorKind::Coordinate { selection, axis } => {
                let center = selection_center(step.molecule(), selection, frame)?;
                Ok(center[axis.index()])
            }
            CollectorKind::Distance(selections) => {
                let [a, b] = centers(step.molecule(), selections, frame)?;
                Ok(geometry::distance(&a, &b))
            }
            CollectorKind::Angle(selections) => {
                let [a, b, c] = centers(step.molecule(), selections, frame)?;
                Ok(geometry::angle(&a, &b, &c))
            }
            CollectorKind::Dihedral(selections) => {
                let [a, b, c, d] = centers(step.molecule(), selections, frame)?;
                Ok(geometry::dihedral(&a, &b, &c, &d))
            }
            CollectorKind::Rmsd {
                selection,
                reference,
            } => fitted_rmsd(step.molecule_mut(), selection, reference, frame),
            CollectorKind::Custom(function) => function(step),
        }
    }
}

fn select_nonempty(
    molecule: &dyn Molecule,
    expression: &str,
    frame: usize,
) -> Result<Vec<usize>, AnalysisError> {
    let atoms = molecule.select(expression, frame)?;
    if atoms.is_empty() {
        return Err(AnalysisError::EmptySelection {
            expression: expression.to_string(),
        });
    }
    Ok(atoms)
}

fn selection_center(
    molecule: &dyn Molecule,
    expression: &str,
    frame: usize,
) -> Result<Point3<f64>, AnalysisError> {
    let atoms = select_nonempty(molecule, expression, frame)?;
    let coords = molecule.coordinates(&atoms, frame)?;
    geometry::center(&coords).ok_or_else(|| AnalysisError::EmptySelection {
        expression: expression.to_string(),
    })
}

fn centers<const N: usize>(
    molecule: &dyn Molecule,
    selections: &[String; N],
    frame: usize,
) -> Result<[Point3<f64>; N], AnalysisError> {
    let mut points = [Point3::origin(); N];
    for (point, selection) in points.iter_mut().zip(selections) {
        *point = selection_center(molecule, selection, frame)?;
    }
    Ok(points)
}

/// Superimposes a copy of `frame` onto the reference and measures the RMSD.
fn fitted_rmsd(
    molecule: &mut dyn Molecule,
    selection: &str,
    reference: &Reference,
    frame: usize,
) -> Result<f64, AnalysisError> {
    with_scratch_frame(molecule, frame, |molecule, scratch| {
        let atoms = select_nonempty(molecule, selection, scratch)?;
        if atoms.len() != reference.len() {
            return Err(AnalysisError::ReferenceMismatch {
                expression: selection.to_string(),
                selected: atoms.len(),
                reference: reference.len(),
            });
        }
        let mobile = molecule.coordinates(&atoms, scratch)?;
        let fit = geometry::superposition(&mobile, reference.coords()).ok_or_else(|| {
            AnalysisError::Custom(format!("Failed to superimpose selection '{}'", selection))
        })?;
        molecule.transform_frame(scratch, &fit)?;
        let fitted = molecule.coordinates(&atoms, scratch)?;
        geometry::calculate_rmsd(&fitted, reference.coords()).ok_or_else(|| {
            AnalysisError::Custom(format!("Failed to compute RMSD for '{}'", selection))
        })
    })
}
