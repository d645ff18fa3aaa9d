use crate::core::models::atom::Atom;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Record on line {line} has {found} atoms, expected {expected}")]
    AtomCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("File contains no frames")]
    Empty,
}

/// Upper bound on the per-frame preallocation taken from an unchecked count line.
const MAX_PREALLOCATED_ATOMS: usize = 1 << 16;

/// One XYZ record: element symbols plus coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct XyzFrame {
    pub symbols: Vec<String>,
    pub coords: Vec<Point3<f64>>,
}

/// Streaming reader over the frames of a multi-frame XYZ file.
///
/// Each record is a count line, a comment line and `count` atom lines of
/// `symbol x y z`. Frames can be skipped without materializing coordinates.
#[derive(Debug)]
pub struct XyzReader<R> {
    reader: R,
    line: usize,
    buffer: String,
    expected_atoms: Option<usize>,
}

impl XyzReader<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> XyzReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: String::new(),
            expected_atoms: None,
        }
    }

    /// Rejects every record whose count line differs from `atoms`.
    pub fn expecting_atoms(mut self, atoms: usize) -> Self {
        self.expected_atoms = Some(atoms);
        self
    }

    /// Reads the next line into the buffer. Returns `false` at end of file.
    fn next_line(&mut self) -> Result<bool, XyzError> {
        self.buffer.clear();
        let read = self.reader.read_line(&mut self.buffer)?;
        if read == 0 {
            return Ok(false);
        }
        self.line += 1;
        Ok(true)
    }

    fn current(&self) -> &str {
        self.buffer.trim_end_matches(['\n', '\r'])
    }

    fn parse_error(&self, message: impl Into<String>) -> XyzError {
        XyzError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    /// Reads the count line of the next record, skipping blank lines between records.
    fn read_count(&mut self) -> Result<Option<usize>, XyzError> {
        loop {
            if !self.next_line()? {
                return Ok(None);
            }
            let trimmed = self.current().trim();
            if trimmed.is_empty() {
                continue;
            }
            let count = trimmed
                .parse::<usize>()
                .map_err(|_| self.parse_error(format!("invalid atom count '{}'", trimmed)))?;
            if let Some(expected) = self.expected_atoms.filter(|&n| n != count) {
                return Err(XyzError::AtomCount {
                    line: self.line,
                    expected,
                    found: count,
                });
            }
            if !self.next_line()? {
                return Err(self.parse_error("missing comment line"));
            }
            return Ok(Some(count));
        }
    }

    /// Reads the next frame, or `None` at end of file.
    pub fn read_frame(&mut self) -> Result<Option<XyzFrame>, XyzError> {
        let Some(count) = self.read_count()? else {
            return Ok(None);
        };
        let capacity = count.min(MAX_PREALLOCATED_ATOMS);
        let mut symbols = Vec::with_capacity(capacity);
        let mut coords = Vec::with_capacity(capacity);
        for _ in 0..count {
            if !self.next_line()? {
                return Err(self.parse_error("unexpected end of file inside a frame"));
            }
            let fields: Vec<&str> = self.current().split_whitespace().collect();
            if fields.len() < 4 {
                return Err(self.parse_error("atom line needs 'symbol x y z'"));
            }
            let symbol = fields[0].to_string();
            let mut xyz = [0.0; 3];
            for (slot, field) in xyz.iter_mut().zip(&fields[1..4]) {
                *slot = field
                    .parse::<f64>()
                    .map_err(|_| self.parse_error(format!("invalid coordinate '{}'", field)))?;
            }
            symbols.push(symbol);
            coords.push(Point3::new(xyz[0], xyz[1], xyz[2]));
        }
        Ok(Some(XyzFrame { symbols, coords }))
    }

    /// Skips the next frame. Returns `false` at end of file.
    pub fn skip_frame(&mut self) -> Result<bool, XyzError> {
        let Some(count) = self.read_count()? else {
            return Ok(false);
        };
        for _ in 0..count {
            if !self.next_line()? {
                return Err(self.parse_error("unexpected end of file inside a frame"));
            }
        }
        Ok(true)
    }
}

pub struct XyzFile;

impl XyzFile {
    /// Reads the topology and coordinates of the first frame.
    ///
    /// Each atom is named after its symbol and placed in its own residue
    /// numbered from 1.
    pub fn read_topology(
        reader: &mut impl BufRead,
    ) -> Result<(Vec<Atom>, Vec<Point3<f64>>), XyzError> {
        let mut xyz = XyzReader::new(reader);
        let frame = xyz.read_frame()?.ok_or(XyzError::Empty)?;
        let atoms = frame
            .symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| Atom::new(symbol, symbol, i as isize + 1))
            .collect();
        Ok((atoms, frame.coords))
    }

    pub fn read_topology_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Vec<Atom>, Vec<Point3<f64>>), XyzError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_topology(&mut reader)
    }

    pub fn write_frame(
        writer: &mut impl Write,
        atoms: &[Atom],
        coords: &[Point3<f64>],
        comment: &str,
    ) -> Result<(), XyzError> {
        writeln!(writer, "{}", atoms.len())?;
        writeln!(writer, "{}", comment)?;
        for (atom, p) in atoms.iter().zip(coords) {
            writeln!(writer, "{} {:.6} {:.6} {:.6}", atom.name, p.x, p.y, p.z)?;
        }
        Ok(())
    }

    pub fn write_trajectory<P: AsRef<Path>>(
        path: P,
        atoms: &[Atom],
        frames: &[Vec<Point3<f64>>],
    ) -> Result<(), XyzError> {
        let mut writer = io::BufWriter::new(File::create(path)?);
        for (i, coords) in frames.iter().enumerate() {
            Self::write_frame(&mut writer, atoms, coords, &format!("frame {}", i))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_FRAMES: &str = "\
2
first
O 0.0 0.0 0.0
H 1.0 0.0 0.0
2
second
O 0.5 0.0 0.0
H 1.5 0.0 0.0
";

    #[test]
    fn reads_frames_in_order() {
        let mut reader = XyzReader::new(Cursor::new(TWO_FRAMES));
        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.symbols, vec!["O", "H"]);
        assert_eq!(first.coords[1], Point3::new(1.0, 0.0, 0.0));
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second.coords[0], Point3::new(0.5, 0.0, 0.0));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn skip_frame_advances_without_parsing_coordinates() {
        let mut reader = XyzReader::new(Cursor::new(TWO_FRAMES));
        assert!(reader.skip_frame().unwrap());
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second.coords[1], Point3::new(1.5, 0.0, 0.0));
        assert!(!reader.skip_frame().unwrap());
    }

    #[test]
    fn topology_comes_from_first_frame() {
        let (atoms, coords) = XyzFile::read_topology(&mut Cursor::new(TWO_FRAMES)).unwrap();
        assert_eq!(atoms, vec![Atom::new("O", "O", 1), Atom::new("H", "H", 2)]);
        assert_eq!(coords.len(), 2);
    }

    #[test]
    fn empty_input_has_no_topology() {
        let result = XyzFile::read_topology(&mut Cursor::new(""));
        assert!(matches!(result, Err(XyzError::Empty)));
    }

    #[test]
    fn truncated_frame_reports_line() {
        let result = XyzReader::new(Cursor::new("3\ncomment\nO 0 0 0\n")).read_frame();
        assert!(matches!(result, Err(XyzError::Parse { line: 3, .. })));
    }

    #[test]
    fn oversized_count_line_is_a_parse_error() {
        let input = "999999999999999\ncomment\nC 0 0 0\n";
        let result = XyzReader::new(Cursor::new(input)).read_frame();
        assert!(matches!(result, Err(XyzError::Parse { line: 3, .. })));

        let result = XyzFile::read_topology(&mut Cursor::new(input));
        assert!(matches!(result, Err(XyzError::Parse { .. })));
    }

    #[test]
    fn expected_atom_count_is_checked_before_reading_atoms() {
        let input = "999999999999999\ncomment\nC 0 0 0\n";
        let result = XyzReader::new(Cursor::new(input)).expecting_atoms(1).read_frame();
        assert!(matches!(
            result,
            Err(XyzError::AtomCount { line: 1, expected: 1, found: 999999999999999 })
        ));

        let mut reader = XyzReader::new(Cursor::new(TWO_FRAMES)).expecting_atoms(3);
        assert!(matches!(reader.skip_frame(), Err(XyzError::AtomCount { found: 2, .. })));

        let mut reader = XyzReader::new(Cursor::new(TWO_FRAMES)).expecting_atoms(2);
        assert!(reader.skip_frame().unwrap());
        assert_eq!(reader.read_frame().unwrap().unwrap().coords.len(), 2);
    }

    #[test]
    fn invalid_coordinate_is_a_parse_error() {
        let result = XyzReader::new(Cursor::new("1\nc\nO 0 zero 0\n")).read_frame();
        assert!(matches!(result, Err(XyzError::Parse { line: 3, .. })));
    }

    #[test]
    fn written_trajectory_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.xyz");
        let atoms = vec![Atom::new("C", "C", 1)];
        let frames = vec![vec![Point3::new(1.0, 2.0, 3.0)], vec![Point3::new(-1.0, 0.25, 0.0)]];
        XyzFile::write_trajectory(&path, &atoms, &frames).unwrap();

        let mut reader = XyzReader::open(&path).unwrap();
        assert_eq!(reader.read_frame().unwrap().unwrap().coords, frames[0]);
        assert_eq!(reader.read_frame().unwrap().unwrap().coords, frames[1]);
        assert!(reader.read_frame().unwrap().is_none());
    }
}
