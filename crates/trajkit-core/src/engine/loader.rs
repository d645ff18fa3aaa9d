//! Chunked trajectory streaming.
//!
//! The [`Loader`] walks a list of trajectory files, asks the host to load at
//! most `chunk_size` frames at a time, runs every registered callback on each
//! frame in registration order, and drops the chunk before loading the next.
//! Errors from the host or from any callback stop the run immediately; rows
//! already appended to data sets are kept.

use super::collector::Collector;
use super::config::{LoaderConfig, positive};
use super::dataset::DataSet;
use super::error::AnalysisError;
use super::host::{FrameRange, FrameStore, Molecule};
use super::progress::{Progress, ProgressReporter};
use super::step::Step;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type Callback<'a> = Box<dyn FnMut(&mut Step<'_>) -> Result<(), AnalysisError> + 'a>;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Number of frames analyzed across all files.
    pub frames: usize,
}

impl LoadSummary {
    /// Global index of the last analyzed frame, `None` if nothing was analyzed.
    pub fn last_frame(&self) -> Option<usize> {
        self.frames.checked_sub(1)
    }
}

pub struct Loader<'a> {
    molecule: &'a mut dyn Molecule,
    files: Vec<PathBuf>,
    config: LoaderConfig,
    callbacks: Vec<Callback<'a>>,
    reporter: ProgressReporter<'a>,
}

impl<'a> Loader<'a> {
    pub fn new<I, P>(molecule: &'a mut dyn Molecule, files: I, config: LoaderConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            molecule,
            files: files.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            config,
            callbacks: Vec::new(),
            reporter: ProgressReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Step<'_>) -> Result<(), AnalysisError> + 'a,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Appends one row to `dataset` per analyzed frame.
    pub fn add_dataset(&mut self, dataset: &'a mut DataSet) {
        self.add_callback(move |step| dataset.collect(step));
    }

    /// Feeds `(frame, value)` of `collector` into `sink` for every analyzed frame.
    pub fn add_collector<S>(&mut self, collector: Collector, mut sink: S)
    where
        S: FnMut(usize, f64) + 'a,
    {
        self.add_callback(move |step| {
            let value = collector.collect(step)?;
            sink(step.frame(), value);
            Ok(())
        });
    }

    /// Streams every file through the registered callbacks.
    ///
    /// Frames already present in the molecule are discarded first.
    pub fn run(self) -> Result<LoadSummary, AnalysisError> {
        let Loader {
            molecule,
            files,
            config,
            mut callbacks,
            reporter,
        } = self;
        let stride = positive("step", config.step)?;
        let chunk_size = positive("chunk_size", config.chunk_size)?;

        molecule.clear_frames()?;
        let mut step = Step::new(molecule);

        for file in &files {
            reporter.report(Progress::FileStart {
                path: file.display().to_string(),
            });
            let mut start = 0usize;
            loop {
                let stop = start.saturating_add(stride.saturating_mul(chunk_size - 1));
                debug!(
                    "Loading {} from {} to {}, every {}",
                    file.display(),
                    start,
                    stop,
                    stride
                );
                let loaded = step
                    .molecule_mut()
                    .load_frames(file, FrameRange::new(start, stop, stride))?;
                if loaded == 0 {
                    break;
                }
                reporter.report(Progress::ChunkLoaded { frames: loaded });

                step.next_chunk();
                for _ in 0..loaded {
                    step.next_frame()?;
                    debug!("Analyzing frame {}", step.frame());
                    for callback in callbacks.iter_mut() {
                        callback(&mut step)?;
                    }
                    reporter.report(Progress::FrameAnalyzed {
                        frame: step.frame(),
                    });
                }
                step.molecule_mut().clear_frames()?;

                if loaded < chunk_size {
                    break;
                }
                match stride
                    .checked_mul(chunk_size)
                    .and_then(|span| start.checked_add(span))
                {
                    Some(next) => start = next,
                    None => break,
                }
            }
            reporter.report(Progress::FileFinish);
        }

        let frames = step.processed();
        info!("Analyzed {} frames.", frames);
        Ok(LoadSummary { frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::molecule::MemoryMolecule;
    use crate::engine::host::HostError;
    use nalgebra::Point3;
    use std::cell::RefCell;
    use std::sync::Mutex;

    fn trajectory(count: usize, offset: usize) -> Vec<Vec<Point3<f64>>> {
        (0..count)
            .map(|i| vec![Point3::new((offset + i) as f64, 0.0, 0.0)])
            .collect()
    }

    fn molecule() -> MemoryMolecule {
        let mut molecule = MemoryMolecule::new("probe", vec![Atom::new("C", "C", 1)]);
        molecule.register_trajectory("a.xyz", trajectory(5, 0)).unwrap();
        molecule.register_trajectory("empty.xyz", Vec::new()).unwrap();
        molecule.register_trajectory("b.xyz", trajectory(3, 100)).unwrap();
        molecule.register_trajectory("long.xyz", trajectory(7, 0)).unwrap();
        molecule
    }

    fn config(step: usize, chunk_size: usize) -> LoaderConfig {
        LoaderConfig { step, chunk_size }
    }

    fn x_values(files: &[&str], config: LoaderConfig) -> Vec<(usize, f64)> {
        let mut mol = molecule();
        let seen = RefCell::new(Vec::new());
        let mut loader = Loader::new(&mut mol, files, config);
        loader.add_collector(Collector::x("all"), |frame, x| seen.borrow_mut().push((frame, x)));
        loader.run().unwrap();
        seen.into_inner()
    }

    #[test]
    fn every_frame_is_visited_once_in_order() {
        for chunk in [1, 2, 3, 10] {
            let mut mol = molecule();
            let frames = RefCell::new(Vec::new());
            let mut loader = Loader::new(&mut mol, ["a.xyz", "empty.xyz", "b.xyz"], config(1, chunk));
            loader.add_callback(|step| {
                frames.borrow_mut().push(step.frame());
                Ok(())
            });
            let summary = loader.run().unwrap();
            assert_eq!(summary.frames, 8);
            assert_eq!(summary.last_frame(), Some(7));
            assert_eq!(frames.into_inner(), (0..8).collect::<Vec<_>>());
        }
    }

    #[test]
    fn stride_selects_every_nth_frame() {
        let seen = x_values(&["long.xyz"], config(3, 2));
        assert_eq!(seen, vec![(0, 0.0), (1, 3.0), (2, 6.0)]);
    }

    #[test]
    fn results_do_not_depend_on_chunk_size() {
        let files = ["a.xyz", "b.xyz", "long.xyz"];
        let small = x_values(&files, config(1, 1));
        let large = x_values(&files, config(1, 1000));
        assert_eq!(small, large);
        assert_eq!(small.len(), 15);
    }

    #[test]
    fn resident_frames_never_exceed_chunk_size() {
        let mut mol = molecule();
        mol.add_frame(vec![Point3::origin()]).unwrap();
        let peak = RefCell::new(0);
        let mut loader = Loader::new(&mut mol, ["a.xyz", "long.xyz"], config(1, 3));
        loader.add_callback(|step| {
            let resident = step.molecule().num_frames();
            let mut peak = peak.borrow_mut();
            *peak = (*peak).max(resident);
            assert_eq!(step.molecule().active_frame(), Some(step.chunk_frame()));
            Ok(())
        });
        loader.run().unwrap();
        assert_eq!(peak.into_inner(), 3);
        assert_eq!(mol.num_frames(), 0);
    }

    #[test]
    fn empty_file_list_processes_nothing() {
        let mut mol = molecule();
        let summary = Loader::new(&mut mol, Vec::<PathBuf>::new(), config(1, 10))
            .run()
            .unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.last_frame(), None);
    }

    #[test]
    fn callback_error_aborts_and_keeps_collected_rows() {
        let mut mol = molecule();
        let mut dataset = DataSet::new();
        dataset.add_collector(Collector::frame()).unwrap();
        dataset
            .add_collector(Collector::custom(|step| {
                if step.frame() == 3 {
                    Err(AnalysisError::Custom("stop".to_string()))
                } else {
                    Ok(1.0)
                }
            }))
            .unwrap();

        let mut loader = Loader::new(&mut mol, ["a.xyz"], config(1, 2));
        loader.add_dataset(&mut dataset);
        let result = loader.run();

        assert!(matches!(result, Err(AnalysisError::Custom(ref m)) if m == "stop"));
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let mut mol = molecule();
        let order = RefCell::new(Vec::new());
        let mut loader = Loader::new(&mut mol, ["b.xyz"], config(1, 10));
        loader.add_callback(|_| {
            order.borrow_mut().push("first");
            Ok(())
        });
        loader.add_callback(|_| {
            order.borrow_mut().push("second");
            Ok(())
        });
        loader.run().unwrap();
        assert_eq!(
            order.into_inner(),
            vec!["first", "second", "first", "second", "first", "second"]
        );
    }

    #[test]
    fn missing_file_is_a_host_error() {
        let mut mol = molecule();
        let result = Loader::new(&mut mol, ["does/not/exist.xyz"], config(1, 10)).run();
        assert!(matches!(result, Err(AnalysisError::Host(_))));
    }

    #[test]
    fn huge_chunk_and_step_values_do_not_overflow() {
        let all = vec![(0, 100.0), (1, 101.0), (2, 102.0)];
        for chunk in [1 << 50, usize::MAX] {
            assert_eq!(x_values(&["b.xyz"], config(1, chunk)), all, "chunk {}", chunk);
        }
        for (step, chunk) in [(usize::MAX, 2), (1 << 40, 1 << 40)] {
            let seen = x_values(&["b.xyz"], config(step, chunk));
            assert_eq!(seen, vec![(0, 100.0)], "step {} chunk {}", step, chunk);
        }
    }

    #[test]
    fn huge_chunk_streams_a_disk_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.xyz");
        std::fs::write(&path, "1\nframe 0\nC 0.5 0 0\n").unwrap();

        let mut mol = molecule();
        let summary = Loader::new(&mut mol, [&path], config(1, 1 << 50)).run().unwrap();
        assert_eq!(summary.frames, 1);
    }

    #[test]
    fn corrupt_count_line_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.xyz");
        std::fs::write(&path, "999999999999999\ncomment\nC 0 0 0\n").unwrap();

        let mut mol = molecule();
        let result = Loader::new(&mut mol, [&path], config(1, 10)).run();
        assert!(matches!(
            result,
            Err(AnalysisError::Host(HostError::AtomCountMismatch { expected: 1, .. }))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_loading() {
        let mut mol = molecule();
        mol.add_frame(vec![Point3::origin()]).unwrap();
        let result = Loader::new(&mut mol, ["a.xyz"], config(1, 0)).run();
        assert!(matches!(result, Err(AnalysisError::Config(_))));
        assert_eq!(mol.num_frames(), 1);
    }

    #[test]
    fn reporter_sees_file_and_frame_events() {
        let mut mol = molecule();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let label = match event {
                Progress::FileStart { .. } => "start".to_string(),
                Progress::ChunkLoaded { frames } => format!("chunk {}", frames),
                Progress::FrameAnalyzed { frame } => format!("frame {}", frame),
                Progress::FileFinish => "finish".to_string(),
                Progress::Message(m) => m,
            };
            events.lock().unwrap().push(label);
        }));
        Loader::new(&mut mol, ["b.xyz"], config(1, 2))
            .with_reporter(reporter)
            .run()
            .unwrap();
        assert_eq!(
            events.into_inner().unwrap(),
            vec!["start", "chunk 2", "frame 0", "frame 1", "chunk 1", "frame 2", "finish"]
        );
    }
}
