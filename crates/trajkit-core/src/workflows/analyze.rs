use crate::engine::collector::{Collector, Reference};
use crate::engine::config::{
    CollectorKindSpec, CollectorSpec, ConfigError, LoaderConfig, positive,
};
use crate::engine::dataset::{DEFAULT_INCREMENT, DataSet};
use crate::engine::error::AnalysisError;
use crate::engine::host::{FrameStore, Molecule};
use crate::engine::loader::{LoadSummary, Loader};
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// A complete, declarative description of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPlan {
    pub trajectories: Vec<PathBuf>,
    pub loader: LoaderConfig,
    /// Prepend a `frame` column.
    pub frame_column: bool,
    pub columns: Vec<CollectorSpec>,
    /// Row growth increment of the resulting data set.
    pub increment: usize,
}

#[derive(Default)]
pub struct AnalysisPlanBuilder {
    trajectories: Option<Vec<PathBuf>>,
    loader: Option<LoaderConfig>,
    frame_column: Option<bool>,
    columns: Vec<CollectorSpec>,
    increment: Option<usize>,
}

impl AnalysisPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trajectories(mut self, paths: Vec<PathBuf>) -> Self {
        self.trajectories = Some(paths);
        self
    }
    pub fn loader(mut self, config: LoaderConfig) -> Self {
        self.loader = Some(config);
        self
    }
    pub fn frame_column(mut self, enabled: bool) -> Self {
        self.frame_column = Some(enabled);
        self
    }
    pub fn column(mut self, spec: CollectorSpec) -> Self {
        self.columns.push(spec);
        self
    }
    pub fn columns(mut self, specs: Vec<CollectorSpec>) -> Self {
        self.columns.extend(specs);
        self
    }
    pub fn increment(mut self, increment: usize) -> Self {
        self.increment = Some(increment);
        self
    }

    pub fn build(self) -> Result<AnalysisPlan, ConfigError> {
        let loader = self.loader.unwrap_or_default();
        positive("step", loader.step)?;
        positive("chunk_size", loader.chunk_size)?;
        for spec in &self.columns {
            spec.validate()?;
        }
        Ok(AnalysisPlan {
            trajectories: self
                .trajectories
                .ok_or(ConfigError::MissingParameter("trajectories"))?,
            loader,
            frame_column: self.frame_column.unwrap_or(true),
            columns: self.columns,
            increment: positive("increment", self.increment.unwrap_or(DEFAULT_INCREMENT))?,
        })
    }
}

/// Builds the empty data set described by `plan`.
///
/// RMSD references are captured here from the active frame of `reference`,
/// or of `molecule` itself when no reference molecule is given, so this must
/// be called before any trajectory frame is loaded.
pub fn prepare(
    molecule: &dyn Molecule,
    reference: Option<&dyn Molecule>,
    plan: &AnalysisPlan,
    reporter: &ProgressReporter,
) -> Result<DataSet, AnalysisError> {
    let mut dataset = DataSet::with_increment(plan.increment)?;
    if plan.frame_column {
        dataset.add_collector(Collector::frame())?;
    }
    for spec in &plan.columns {
        let collector = build_collector(spec, molecule, reference)?;
        let name = dataset.add_collector(collector)?;
        reporter.report(Progress::Message(format!("Added column '{}'", name)));
    }
    Ok(dataset)
}

/// Streams the trajectories of `plan` through `molecule` into `dataset`.
///
/// Rows collected before an error stay in `dataset`.
#[instrument(skip_all, name = "analysis_workflow")]
pub fn run(
    molecule: &mut dyn Molecule,
    plan: &AnalysisPlan,
    dataset: &mut DataSet,
    reporter: &ProgressReporter,
) -> Result<LoadSummary, AnalysisError> {
    info!(
        "Analyzing {} trajectory file(s) with {} column(s).",
        plan.trajectories.len(),
        dataset.num_columns()
    );

    let forward = ProgressReporter::with_callback(Box::new(|event| reporter.report(event)));
    let mut loader = Loader::new(molecule, &plan.trajectories, plan.loader).with_reporter(forward);
    loader.add_dataset(dataset);
    let summary = loader.run();

    match &summary {
        Ok(summary) => info!(
            "Collected {} row(s) over {} frame(s).",
            dataset.len(),
            summary.frames
        ),
        Err(e) => warn!("Analysis stopped after {} row(s): {}", dataset.len(), e),
    }
    summary
}

/// Turns a declarative column into a collector.
pub fn build_collector(
    spec: &CollectorSpec,
    molecule: &dyn Molecule,
    reference: Option<&dyn Molecule>,
) -> Result<Collector, AnalysisError> {
    spec.validate()?;
    let s = &spec.selections;
    let collector = match spec.kind {
        CollectorKindSpec::Frame => Collector::frame(),
        CollectorKindSpec::Coordinate => {
            let axis = spec.axis.ok_or(ConfigError::MissingParameter("axis"))?;
            Collector::coordinate(&s[0], axis)
        }
        CollectorKindSpec::Distance => Collector::distance(&s[0], &s[1]),
        CollectorKindSpec::Angle => Collector::angle(&s[0], &s[1], &s[2]),
        CollectorKindSpec::Dihedral => Collector::dihedral(&s[0], &s[1], &s[2], &s[3]),
        CollectorKindSpec::Rmsd => {
            let source = reference.unwrap_or(molecule);
            let frame = source.active_frame().ok_or_else(|| {
                AnalysisError::InvalidParameter(
                    "RMSD reference molecule has no frames".to_string(),
                )
            })?;
            Collector::rmsd(&s[0], Reference::capture(source, &s[0], frame)?)
        }
    };

    let collector = match &spec.name {
        Some(name) => collector.named(name),
        None => collector,
    };
    if spec.format.is_none() && spec.header_format.is_none() {
        return Ok(collector);
    }
    let format = spec
        .format
        .clone()
        .unwrap_or_else(|| collector.format().to_string());
    let header_format = spec
        .header_format
        .clone()
        .unwrap_or_else(|| collector.header_format().to_string());
    Ok(collector.with_formats(&format, &header_format))
}
