use crate::error::{Error, Result};
use crate::reduce::ReduceOptions;
use crate::schema::DEFAULT_DESIGNATION_FIELD;
use crate::snapshot::SnapshotWindow;
use crate::stream::ParseMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the default number of parallel documents
pub const JOBS_ENV: &str = "UA_COMPILER_JOBS";

/// Job count from [`JOBS_ENV`], or 1 when unset or invalid
pub fn default_jobs() -> usize {
    std::env::var(JOBS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct Config {
    /// Documents or directories of documents, in ingestion order
    pub inputs: Vec<PathBuf>,
    pub parse_mode: ParseMode,
    pub window: Option<SnapshotWindow>,
    /// Documents parsed concurrently
    pub jobs: usize,
    /// General forward-fill of blank scalars in the last-per-identity view
    pub backfill: bool,
    pub designation_field: Option<String>,
}

impl Config {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            parse_mode: ParseMode::Recover,
            window: None,
            jobs: default_jobs(),
            backfill: true,
            designation_field: Some(DEFAULT_DESIGNATION_FIELD.to_string()),
        }
    }

    /// Validate the configuration
    ///
    /// Inputs that do not exist are not rejected here; they surface as a
    /// per-document `SourceNotFound` so the rest of the batch still runs.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Config("At least one input path is required".to_string()));
        }
        if self.jobs == 0 {
            return Err(Error::Config("jobs must be at least 1".to_string()));
        }
        if let Some(field) = &self.designation_field {
            if field.trim().is_empty() {
                return Err(Error::Config("Designation field name is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Options for the last-per-identity reducer
    pub fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            window: self.window,
            designation_field: self.designation_field.clone(),
            backfill: self.backfill,
        }
    }
}

/// On-disk YAML settings; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub inputs: Vec<PathBuf>,
    pub parse_mode: Option<String>,
    pub window: Option<String>,
    pub jobs: Option<usize>,
    pub backfill: Option<bool>,
    /// Empty string disables the designation backfill
    pub designation_field: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "Config file does not exist: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Builder for creating configurations
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            config: Config::new(inputs),
        }
    }

    /// Start from a config file's values
    pub fn from_file(file: &ConfigFile) -> Result<Self> {
        let mut builder = Self::new(file.inputs.clone());
        if let Some(mode) = &file.parse_mode {
            builder = builder.parse_mode_str(mode);
        }
        if let Some(window) = &file.window {
            builder = builder.window_str(window)?;
        }
        if let Some(jobs) = file.jobs {
            builder = builder.jobs(jobs);
        }
        if let Some(backfill) = file.backfill {
            builder = builder.backfill(backfill);
        }
        if let Some(field) = &file.designation_field {
            builder = if field.trim().is_empty() {
                builder.no_designation_backfill()
            } else {
                builder.designation_field(field.trim())
            };
        }
        Ok(builder)
    }

    /// Replace the inputs; an empty list keeps the current ones
    pub fn inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        if !inputs.is_empty() {
            self.config.inputs = inputs;
        }
        self
    }

    pub fn add_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.config.inputs.push(input.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.config.parse_mode = mode;
        self
    }

    /// `strict` or `recover` (anything else is `recover`)
    pub fn parse_mode_str(mut self, mode: &str) -> Self {
        self.config.parse_mode = ParseMode::from(mode);
        self
    }

    pub fn window(mut self, window: SnapshotWindow) -> Self {
        self.config.window = Some(window);
        self
    }

    /// Set the window from `YYYYMM-YYYYMM`
    pub fn window_str(mut self, window: &str) -> Result<Self> {
        self.config.window = Some(SnapshotWindow::parse(window)?);
        Ok(self)
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn backfill(mut self, enabled: bool) -> Self {
        self.config.backfill = enabled;
        self
    }

    pub fn designation_field(mut self, field: impl Into<String>) -> Self {
        self.config.designation_field = Some(field.into());
        self
    }

    pub fn no_designation_backfill(mut self) -> Self {
        self.config.designation_field = None;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
