use std::path::{Path, PathBuf};

use super::config::run_file_path;
use super::error::SourceError;
use super::event::RawRun;

/// Anything that can hand over the raw records of a run, in entry order.
pub trait EventSource {
    fn read_run(&mut self, run_number: i32) -> Result<RawRun, SourceError>;
}

/// Reads runs stored as `run_NNNN.yml` files in a data directory.
#[derive(Debug, Clone)]
pub struct YamlRunSource {
    data_path: PathBuf,
}

impl YamlRunSource {
    pub fn new(data_path: &Path) -> Self {
        Self {
            data_path: data_path.to_path_buf(),
        }
    }

    pub fn run_path(&self, run_number: i32) -> PathBuf {
        run_file_path(&self.data_path, run_number)
    }
}

impl EventSource for YamlRunSource {
    fn read_run(&mut self, run_number: i32) -> Result<RawRun, SourceError> {
        let path = self.run_path(run_number);
        if !path.exists() {
            return Err(SourceError::BadFilePath(run_number, path));
        }
        let yaml_str = std::fs::read_to_string(&path)?;
        let run: RawRun = serde_yaml::from_str(&yaml_str)?;
        if run.run_number != run_number {
            return Err(SourceError::RunNumberMismatch(run_number, run.run_number));
        }
        log::info!(
            "Loaded run {} with {} entries from {}",
            run_number,
            run.n_entries(),
            path.to_string_lossy()
        );
        Ok(run)
    }
}

/// Runs held in memory, handed out once each
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    runs: Vec<RawRun>,
}

impl MemorySource {
    pub fn new(runs: Vec<RawRun>) -> Self {
        Self { runs }
    }
}

impl EventSource for MemorySource {
    fn read_run(&mut self, run_number: i32) -> Result<RawRun, SourceError> {
        match self.runs.iter().position(|r| r.run_number == run_number) {
            Some(idx) => Ok(self.runs.swap_remove(idx)),
            None => Err(SourceError::BadFilePath(
                run_number,
                PathBuf::from(format!("memory://run_{run_number}")),
            )),
        }
    }
}
