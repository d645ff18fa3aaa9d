use super::collector::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STEP: usize = 1;
pub const DEFAULT_CHUNK_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// How the loader walks through trajectory files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Read every `step`-th frame of each file.
    pub step: usize,
    /// Maximum number of frames resident in the host at once.
    pub chunk_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Default)]
pub struct LoaderConfigBuilder {
    step: Option<usize>,
    chunk_size: Option<usize>,
}

impl LoaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn build(self) -> Result<LoaderConfig, ConfigError> {
        let step = positive("step", self.step.unwrap_or(DEFAULT_STEP))?;
        let chunk_size = positive("chunk_size", self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))?;
        Ok(LoaderConfig { step, chunk_size })
    }
}

pub(crate) fn positive(parameter: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidValue {
            parameter,
            reason: "must be a positive integer".to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Collector kinds that can be requested declaratively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectorKindSpec {
    Frame,
    Coordinate,
    Distance,
    Angle,
    Dihedral,
    Rmsd,
}

impl CollectorKindSpec {
    /// Number of selection expressions the kind consumes.
    pub fn arity(self) -> usize {
        match self {
            CollectorKindSpec::Frame => 0,
            CollectorKindSpec::Coordinate | CollectorKindSpec::Rmsd => 1,
            CollectorKindSpec::Distance => 2,
            CollectorKindSpec::Angle => 3,
            CollectorKindSpec::Dihedral => 4,
        }
    }
}

/// One column of an analysis plan, as written in a plan file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CollectorSpec {
    pub kind: CollectorKindSpec,
    #[serde(default)]
    pub selections: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub header_format: Option<String>,
    #[serde(default)]
    pub axis: Option<Axis>,
}

impl CollectorSpec {
    pub fn new(kind: CollectorKindSpec, selections: &[&str]) -> Self {
        Self {
            kind,
            selections: selections.iter().map(|s| s.to_string()).collect(),
            name: None,
            format: None,
            header_format: None,
            axis: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let expected = self.kind.arity();
        if self.selections.len() != expected {
            return Err(ConfigError::InvalidValue {
                parameter: "selections",
                reason: format!(
                    "{:?} takes {} selection(s), got {}",
                    self.kind,
                    expected,
                    self.selections.len()
                ),
            });
        }
        if self.selections.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                parameter: "selections",
                reason: "selection expressions must not be empty".to_string(),
            });
        }
        match (self.kind, self.axis) {
            (CollectorKindSpec::Coordinate, None) => Err(ConfigError::MissingParameter("axis")),
            (CollectorKindSpec::Coordinate, Some(_)) | (_, None) => Ok(()),
            (_, Some(_)) => Err(ConfigError::InvalidValue {
                parameter: "axis",
                reason: format!("only coordinate columns take an axis, not {:?}", self.kind),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_defaults_match_streaming_defaults() {
        let config = LoaderConfigBuilder::new().build().unwrap();
        assert_eq!(config, LoaderConfig { step: 1, chunk_size: 10 });
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn loader_rejects_zero_step_and_chunk() {
        assert!(matches!(
            LoaderConfigBuilder::new().step(0).build(),
            Err(ConfigError::InvalidValue { parameter: "step", .. })
        ));
        assert!(matches!(
            LoaderConfigBuilder::new().chunk_size(0).build(),
            Err(ConfigError::InvalidValue { parameter: "chunk_size", .. })
        ));
    }

    #[test]
    fn spec_checks_selection_arity() {
        let spec = CollectorSpec::new(CollectorKindSpec::Dihedral, &["index 0", "index 1"]);
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::InvalidValue { parameter: "selections", .. })
        ));
        let spec = CollectorSpec::new(CollectorKindSpec::Distance, &["index 0", "index 1"]);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn spec_rejects_blank_selection() {
        let spec = CollectorSpec::new(CollectorKindSpec::Rmsd, &["  "]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn coordinate_spec_requires_axis() {
        let mut spec = CollectorSpec::new(CollectorKindSpec::Coordinate, &["all"]);
        assert_eq!(spec.validate(), Err(ConfigError::MissingParameter("axis")));
        spec.axis = Some(Axis::Z);
        assert!(spec.validate().is_ok());

        let mut spec = CollectorSpec::new(CollectorKindSpec::Frame, &[]);
        spec.axis = Some(Axis::X);
        assert!(spec.validate().is_err());
    }
}
