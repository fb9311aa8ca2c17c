use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("compression step did not produce {0}")]
    CompressionOutputMissing(PathBuf),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("{tool} failed ({status}): {message}")]
    ToolFailed {
        tool: String,
        status: String,
        message: String,
    },

    #[error("table error in {path}: {message}")]
    Table { path: String, message: String },

    #[error("column {column} not found in {path}")]
    MissingColumn { path: String, column: String },

    #[error("duplicate row {key} in {path}")]
    DuplicateRow { path: String, key: String },

    #[error("sample {0} is listed in the metadata but missing from the count matrix")]
    MissingSample(String),

    #[error("sample directory already exists: {0}")]
    #[diagnostic(help("remove the directory or pass --skip-existing"))]
    SampleDirExists(PathBuf),

    #[error("two read pairs map to sample {0}")]
    #[diagnostic(help("rename one of the mate-1 files so sample names are unique"))]
    DuplicateSample(String),

    #[error("samples failed: {}", .0.join(", "))]
    #[diagnostic(help("inspect err.txt in each failed sample directory"))]
    SamplesFailed(Vec<String>),
}

impl PipelineError {
    /// Process exit code: 2 for bad input or config, 3 for external tool
    /// failures, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::ConfigRead(_)
            | PipelineError::ConfigParse(_)
            | PipelineError::InvalidPath(_)
            | PipelineError::Table { .. }
            | PipelineError::MissingColumn { .. }
            | PipelineError::DuplicateRow { .. }
            | PipelineError::MissingSample(_)
            | PipelineError::SampleDirExists(_)
            | PipelineError::DuplicateSample(_) => 2,
            PipelineError::MissingTool(_)
            | PipelineError::ToolFailed { .. }
            | PipelineError::CompressionOutputMissing(_)
            | PipelineError::SamplesFailed(_) => 3,
            PipelineError::Filesystem(_) => 1,
        }
    }
}
