use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde::Serialize;

use crate::error::PipelineError;

/// A fully built external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(tool: &str, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            tool: tool.to_string(),
            program: program.into(),
            args,
        }
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Runs with stdout/stderr inherited so the tool's chatter lands in the
    /// caller's log files.
    pub fn run(&self) -> Result<(), PipelineError> {
        tracing::info!("{}", self.command_line());
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|err| self.spawn_error(err))?;
        self.check(status, String::new())
    }

    /// Runs with stderr captured into the error message on failure.
    pub fn run_captured(&self) -> Result<(), PipelineError> {
        tracing::debug!("{}", self.command_line());
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| self.spawn_error(err))?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        self.check(output.status, stderr)
    }

    fn check(&self, status: ExitStatus, stderr: String) -> Result<(), PipelineError> {
        if status.success() {
            return Ok(());
        }
        let message = if stderr.is_empty() {
            format!("command failed: {}", self.command_line())
        } else {
            stderr
        };
        Err(PipelineError::ToolFailed {
            tool: self.tool.clone(),
            status: describe_status(status),
            message,
        })
    }

    fn spawn_error(&self, err: io::Error) -> PipelineError {
        if err.kind() == io::ErrorKind::NotFound {
            PipelineError::MissingTool(self.program.display().to_string())
        } else {
            PipelineError::Filesystem(format!("spawn {}: {err}", self.program.display()))
        }
    }
}

pub fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub path: Option<String>,
    pub version: Option<String>,
}

/// Resolves a program name against `PATH`; paths with a separator are
/// checked as given.
pub fn find_in_path(name: &Path) -> Option<PathBuf> {
    if name.components().count() > 1 {
        return name.exists().then(|| name.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{}.exe", name.display()));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

pub fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    let first = String::from_utf8_lossy(text)
        .lines()
        .next()
        .map(|line| line.trim().to_string())?;
    (!first.is_empty()).then_some(first)
}
