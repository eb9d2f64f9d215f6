use std::path::PathBuf;
use thiserror::Error;

use super::scan_status::ScanStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum RunListError {
    #[error("Could not open run list because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Run list failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Run list {0:?} did not contain any run numbers")]
    Empty(PathBuf),
}

#[derive(Debug, Error)]
pub enum ThresholdTableError {
    #[error("Could not open threshold table because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("ThresholdTable failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ThresholdTable failed to parse an integer for dataset {0}: {1}")]
    ParsingError(String, std::num::ParseIntError),
    #[error("ThresholdTable entry for dataset {0} has {1} thresholds; expected {exp}", exp=super::constants::NUMBER_OF_CHANNELS)]
    MissingThresholds(String, usize),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Could not read run {0} because file {1:?} does not exist")]
    BadFilePath(i32, PathBuf),
    #[error("EventSource failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("EventSource failed to parse run data: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("EventSource was asked for run {0} but the data contains run {1}")]
    RunNumberMismatch(i32, i32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimeError {
    #[error("No valid primary clock reading at or before entry {0}")]
    NoLowerBracket(usize),
    #[error("No valid primary clock reading at or after entry {0}")]
    NoUpperBracket(usize),
    #[error("Entry {0} is outside of the run ({1} entries)")]
    EntryOutOfRange(usize, usize),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Run {0} contains no entries")]
    EmptyRun(i32),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("ReportWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to RunList error: {0}")]
    RunListError(#[from] RunListError),
    #[error("Processor failed due to ThresholdTable error: {0}")]
    ThresholdTableError(#[from] ThresholdTableError),
    #[error("Processor failed due to ReportWriter error: {0}")]
    ReportError(#[from] ReportError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<ScanStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
