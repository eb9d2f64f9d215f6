use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, RunListError};
use super::scanner::ScanOptions;

/// Structure representing the application configuration. Contains pathing and scan options
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub run_list_path: PathBuf,
    pub data_path: PathBuf,
    pub threshold_table_path: Option<PathBuf>,
    pub dataset_name: Option<String>,
    pub output_path: PathBuf,
    pub deactivate_channels: bool,
    pub dump_skipped: bool,
}

impl Default for Config {
    /// Generate a new Config object. All paths will be empty/invalid
    fn default() -> Self {
        Self {
            run_list_path: PathBuf::from("None"),
            data_path: PathBuf::from("None"),
            threshold_table_path: None,
            dataset_name: None,
            output_path: PathBuf::from("None"),
            deactivate_channels: true,
            dump_skipped: false,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Read the list of run numbers to scan, in order.
    ///
    /// Tokens which are not integers are skipped with a warning.
    pub fn read_run_list(&self) -> Result<Vec<i32>, RunListError> {
        if !self.run_list_path.exists() {
            return Err(RunListError::BadFilePath(self.run_list_path.clone()));
        }
        let contents = std::fs::read_to_string(&self.run_list_path)?;
        let mut runs = Vec::new();
        for token in contents.split_whitespace() {
            match token.parse::<i32>() {
                Ok(run) => runs.push(run),
                Err(_) => log::warn!("Ignoring malformed run number in run list: {token}"),
            }
        }
        if runs.is_empty() {
            return Err(RunListError::Empty(self.run_list_path.clone()));
        }
        Ok(runs)
    }

    /// Get the Path to a run file
    pub fn get_run_file(&self, run_number: i32) -> PathBuf {
        run_file_path(&self.data_path, run_number)
    }

    /// The name used to look up the input thresholds. Either given explicitly or
    /// the stem of the run list file
    pub fn get_dataset_name(&self) -> String {
        match &self.dataset_name {
            Some(name) => name.clone(),
            None => list_stem(&self.run_list_path),
        }
    }

    /// Get the path to the output summary file
    pub fn get_report_file_name(&self) -> Result<PathBuf, ConfigError> {
        let report_path = self
            .output_path
            .join(format!("vPerf_{}.txt", list_stem(&self.run_list_path)));
        if self.output_path.exists() {
            Ok(report_path)
        } else {
            Err(ConfigError::BadFilePath(self.output_path.clone()))
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            deactivate_channels: self.deactivate_channels,
            dump_skipped: self.dump_skipped,
        }
    }
}

/// Construct the run file path using the run_NNNN.yml format
pub fn run_file_path(data_path: &Path, run_number: i32) -> PathBuf {
    data_path.join(format!("run_{run_number:0>4}.yml"))
}

/// File name with the directory and extension stripped
fn list_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
