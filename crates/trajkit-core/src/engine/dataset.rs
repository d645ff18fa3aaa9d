//! Columnar accumulator for per-frame values.
//!
//! Values live in a row-growable [`DMatrix`] that always has one column per
//! registered column. Storage is allocated lazily, `increment` rows at a time,
//! and only the filled prefix is exposed through [`DataSet::data`].

use super::collector::Collector;
use super::config::positive;
use super::error::AnalysisError;
use super::format::ColumnFormat;
use super::step::Step;
use nalgebra::{DMatrix, DMatrixView};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_INCREMENT: usize = 1000;

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    format: ColumnFormat,
    header_format: ColumnFormat,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &ColumnFormat {
        &self.format
    }

    pub fn header_format(&self) -> &ColumnFormat {
        &self.header_format
    }
}

#[derive(Debug)]
pub struct DataSet {
    columns: Vec<Column>,
    collectors: Vec<Option<Collector>>,
    data: DMatrix<f64>,
    rows: usize,
    increment: usize,
    auto_id: usize,
}

impl Default for DataSet {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            collectors: Vec::new(),
            data: DMatrix::zeros(0, 0),
            rows: 0,
            increment: DEFAULT_INCREMENT,
            auto_id: 0,
        }
    }
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a data set that grows its storage by `increment` rows at a time.
    pub fn with_increment(increment: usize) -> Result<Self, AnalysisError> {
        Ok(Self {
            increment: positive("increment", increment)?,
            ..Self::default()
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of filled rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of rows currently allocated.
    pub fn capacity(&self) -> usize {
        self.data.nrows()
    }

    /// View of the filled rows, in insertion order.
    pub fn data(&self) -> DMatrixView<'_, f64> {
        self.data.rows(0, self.rows)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.rows && column < self.columns.len() {
            Some(self.data[(row, column)])
        } else {
            None
        }
    }

    /// Registers a column filled through [`add_row`](Self::add_row).
    ///
    /// Names must be unique, and the column set is fixed once a row exists.
    pub fn add_column(
        &mut self,
        name: &str,
        format: &str,
        header_format: &str,
    ) -> Result<(), AnalysisError> {
        if self.rows > 0 {
            return Err(AnalysisError::ColumnsFrozen {
                name: name.to_string(),
                rows: self.rows,
            });
        }
        if self.has_column(name) {
            return Err(AnalysisError::NameConflict {
                name: name.to_string(),
            });
        }
        let column = Column {
            name: name.to_string(),
            format: format.parse()?,
            header_format: ColumnFormat::text(header_format)?,
        };
        self.columns.push(column);
        self.collectors.push(None);
        self.data = DMatrix::zeros(0, self.columns.len());
        Ok(())
    }

    /// Registers a collector as a new column and returns the column name.
    ///
    /// Unnamed collectors get the next free `dataNNNNN` name.
    pub fn add_collector(&mut self, collector: Collector) -> Result<String, AnalysisError> {
        let name = match collector.name() {
            Some(name) => name.to_string(),
            None => self.next_auto_name(),
        };
        self.add_column(&name, collector.format(), collector.header_format())?;
        if let Some(slot) = self.collectors.last_mut() {
            *slot = Some(collector);
        }
        Ok(name)
    }

    fn next_auto_name(&mut self) -> String {
        loop {
            self.auto_id += 1;
            let name = format!("data{:05}", self.auto_id);
            if !self.has_column(&name) {
                return name;
            }
        }
    }

    /// Appends one row of values, one per column.
    pub fn add_row(&mut self, values: &[f64]) -> Result<(), AnalysisError> {
        if values.len() != self.columns.len() {
            return Err(AnalysisError::RowWidth {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        if self.rows == self.data.nrows() {
            let capacity = self.rows + self.increment;
            debug!("Growing data set storage to {} rows", capacity);
            let data = std::mem::replace(&mut self.data, DMatrix::zeros(0, 0));
            self.data = data.resize_vertically(capacity, 0.0);
        }
        for (column, value) in values.iter().enumerate() {
            self.data[(self.rows, column)] = *value;
        }
        self.rows += 1;
        Ok(())
    }

    /// Evaluates every column's collector at `step` and appends the row.
    ///
    /// Nothing is appended if any collector fails.
    pub fn collect(&mut self, step: &mut Step<'_>) -> Result<(), AnalysisError> {
        let mut row = Vec::with_capacity(self.columns.len());
        for (column, collector) in self.columns.iter().zip(&self.collectors) {
            let collector = collector.as_ref().ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "column '{}' has no collector",
                    column.name
                ))
            })?;
            row.push(collector.collect(step)?);
        }
        self.add_row(&row)
    }

    /// Writes the header line and all rows as a whitespace-separated table.
    pub fn write(&self, writer: &mut impl Write) -> Result<(), AnalysisError> {
        let header: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.header_format.format_text(&c.name))
            .collect();
        writeln!(writer, "{}", header.join(" "))?;

        for row in 0..self.rows {
            let line: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(j, c)| c.format.format_value(self.data[(row, j)]))
                .collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), AnalysisError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the rows as CSV with the column names as header, in full precision.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), AnalysisError> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.rows {
            csv.write_record((0..self.columns.len()).map(|j| self.data[(row, j)].to_string()))?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format::FormatError;

    fn golden() -> DataSet {
        let mut dataset = DataSet::new();
        dataset.add_column("frame", "%8d", "#%7s").unwrap();
        dataset.add_column("rmsd", "%10.4f", "%10s").unwrap();
        dataset.add_row(&[0.0, 1.23456]).unwrap();
        dataset.add_row(&[1.0, 0.98765]).unwrap();
        dataset
    }

    #[test]
    fn write_matches_golden_table() {
        let mut out = Vec::new();
        golden().write(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#  frame       rmsd\n       0     1.2346\n       1     0.9877\n"
        );
    }

    #[test]
    fn rows_survive_growth_boundaries() {
        let k = 4;
        for n in [k - 1, k, k + 1, 3 * k + 5] {
            let mut dataset = DataSet::with_increment(k).unwrap();
            dataset.add_column("i", "%d", "%s").unwrap();
            dataset.add_column("half", "%f", "%s").unwrap();
            for i in 0..n {
                dataset.add_row(&[i as f64, i as f64 * 0.5]).unwrap();
            }
            let data = dataset.data();
            assert_eq!(data.nrows(), n);
            assert_eq!(data.ncols(), 2);
            for i in 0..n {
                assert_eq!(data[(i, 0)], i as f64);
                assert_eq!(data[(i, 1)], i as f64 * 0.5);
            }
            assert_eq!(dataset.capacity(), n.div_ceil(k) * k);
        }
    }

    #[test]
    fn default_increment_allocates_lazily() {
        let mut dataset = DataSet::new();
        dataset.add_column("a", "%f", "%s").unwrap();
        assert_eq!(dataset.capacity(), 0);
        dataset.add_row(&[1.0]).unwrap();
        assert_eq!(dataset.capacity(), DEFAULT_INCREMENT);
        assert_eq!(dataset.value(0, 0), Some(1.0));
        assert_eq!(dataset.value(1, 0), None);
    }

    #[test]
    fn zero_increment_is_rejected() {
        assert!(matches!(
            DataSet::with_increment(0),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn duplicate_names_conflict() {
        let mut dataset = DataSet::new();
        dataset.add_column("rmsd", "%f", "%s").unwrap();
        assert!(matches!(
            dataset.add_column("rmsd", "%f", "%s"),
            Err(AnalysisError::NameConflict { ref name }) if name == "rmsd"
        ));
        assert!(matches!(
            dataset.add_collector(Collector::x("all").named("rmsd")),
            Err(AnalysisError::NameConflict { .. })
        ));
        assert_eq!(dataset.num_columns(), 1);
    }

    #[test]
    fn columns_are_frozen_once_rows_exist() {
        let mut dataset = golden();
        assert!(matches!(
            dataset.add_column("late", "%f", "%s"),
            Err(AnalysisError::ColumnsFrozen { rows: 2, .. })
        ));
    }

    #[test]
    fn row_width_must_match_columns() {
        let mut dataset = golden();
        assert!(matches!(
            dataset.add_row(&[1.0]),
            Err(AnalysisError::RowWidth {
                expected: 2,
                found: 1
            })
        ));
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn auto_names_skip_taken_names() {
        let mut dataset = DataSet::new();
        dataset.add_column("data00001", "%f", "%s").unwrap();
        assert_eq!(dataset.add_collector(Collector::x("all")).unwrap(), "data00002");
        assert_eq!(dataset.add_collector(Collector::y("all")).unwrap(), "data00003");
        assert_eq!(
            dataset.add_collector(Collector::frame()).unwrap(),
            "frame"
        );
        assert_eq!(
            dataset.column_names(),
            vec!["data00001", "data00002", "data00003", "frame"]
        );
    }

    #[test]
    fn auto_name_counters_are_per_data_set() {
        let mut first = DataSet::new();
        let mut second = DataSet::new();
        assert_eq!(first.add_collector(Collector::x("all")).unwrap(), "data00001");
        assert_eq!(second.add_collector(Collector::x("all")).unwrap(), "data00001");
    }

    #[test]
    fn invalid_formats_are_rejected_at_registration() {
        let mut dataset = DataSet::new();
        assert!(matches!(
            dataset.add_column("a", "%g", "%s"),
            Err(AnalysisError::Format(FormatError::UnsupportedConversion { .. }))
        ));
        assert!(matches!(
            dataset.add_column("a", "%f", "%f"),
            Err(AnalysisError::Format(FormatError::NotText(_)))
        ));
        assert_eq!(dataset.num_columns(), 0);
    }

    #[test]
    fn csv_output_uses_full_precision() {
        let mut out = Vec::new();
        golden().write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "frame,rmsd\n0,1.23456\n1,0.98765\n"
        );
    }

    #[test]
    fn write_to_path_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        golden().write_to_path(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#  frame       rmsd\n"));
        assert_eq!(text.lines().count(), 3);
    }
}
