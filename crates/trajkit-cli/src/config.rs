use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use trajkit::engine::config::{CollectorSpec, LoaderConfigBuilder};
use trajkit::workflows::analyze::{AnalysisPlan, AnalysisPlanBuilder};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialLoaderConfig {
    step: Option<usize>,
    chunk_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    path: Option<PathBuf>,
    increment: Option<usize>,
}

/// Contents of an analysis file before command-line overrides are applied.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialAnalysisConfig {
    topology: Option<PathBuf>,
    reference: Option<PathBuf>,
    #[serde(default)]
    trajectories: Vec<PathBuf>,
    loader: Option<PartialLoaderConfig>,
    output: Option<PartialOutputConfig>,
    frame_column: Option<bool>,
    #[serde(default)]
    columns: Vec<CollectorSpec>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Fully resolved settings of one `analyze` invocation.
#[derive(Debug)]
pub struct AppConfig {
    pub topology: PathBuf,
    pub reference: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub csv: bool,
    pub plan: AnalysisPlan,
}

impl PartialAnalysisConfig {
    /// Reads an analysis file. Relative paths inside it are resolved against its directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading analysis configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn merge_with_cli(mut self, args: &AnalyzeArgs) -> Result<AppConfig> {
        let topology = self.topology.take().ok_or_else(|| {
            CliError::Config("The analysis file must name a 'topology'.".to_string())
        })?;
        let topology = self.resolve(topology);
        let reference = self.reference.take().map(|p| self.resolve(p));
        let trajectories: Vec<PathBuf> = std::mem::take(&mut self.trajectories)
            .into_iter()
            .map(|p| self.resolve(p))
            .collect();

        let loader_file = self.loader.take().unwrap_or_default();
        let mut loader = LoaderConfigBuilder::new();
        if let Some(step) = args.step.or(loader_file.step) {
            loader = loader.step(step);
        }
        if let Some(chunk_size) = args.chunk_size.or(loader_file.chunk_size) {
            loader = loader.chunk_size(chunk_size);
        }
        let loader = loader.build().map_err(|e| CliError::Config(e.to_string()))?;

        let output_file = self.output.take().unwrap_or_default();
        let output = args
            .output
            .clone()
            .or_else(|| output_file.path.map(|p| self.resolve(p)));

        let mut plan = AnalysisPlanBuilder::new()
            .trajectories(trajectories)
            .loader(loader)
            .frame_column(self.frame_column.unwrap_or(true))
            .columns(std::mem::take(&mut self.columns));
        if let Some(increment) = output_file.increment {
            plan = plan.increment(increment);
        }
        let plan = plan.build().map_err(|e| CliError::Config(e.to_string()))?;

        Ok(AppConfig {
            topology,
            reference,
            output,
            csv: args.csv,
            plan,
        })
    }
}
