//! Folder-level fan-out: one `sample` child process per read pair, run on a
//! bounded worker pool with each child's output captured in its directory.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::discover::discover_pairs;
use crate::domain::ReadPair;
use crate::error::PipelineError;
use crate::layout::SampleLayout;
use crate::tools::describe_status;

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub folder: Utf8PathBuf,
    pub workdir: Utf8PathBuf,
    pub jobs: usize,
    pub with_qc: bool,
    pub skip_existing: bool,
}

/// One sample ready to launch. Its directory already exists.
#[derive(Debug, Clone)]
pub struct SampleJob {
    pub pair: ReadPair,
    pub layout: SampleLayout,
    pub with_qc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStatus {
    pub success: bool,
    pub status: String,
}

/// Starts the per-sample driver and blocks until it exits.
pub trait SampleLauncher: Send + Sync {
    fn launch(&self, job: &SampleJob, stdout: File, stderr: File)
    -> Result<LaunchStatus, PipelineError>;
}

/// Re-executes the current binary's `sample` subcommand.
#[derive(Debug, Clone)]
pub struct SelfExecLauncher {
    program: PathBuf,
    config_path: Option<PathBuf>,
}

impl SelfExecLauncher {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let program = std::env::current_exe()
            .map_err(|err| PipelineError::Filesystem(format!("locate current executable: {err}")))?;
        Ok(Self {
            program,
            config_path,
        })
    }

    pub fn with_program(program: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self {
            program,
            config_path,
        }
    }

    pub fn arguments(&self, job: &SampleJob) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(config) = &self.config_path {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
        args.push("sample".to_string());
        args.push(job.layout.root().to_string());
        args.push(job.pair.mate1.to_string());
        args.push(job.pair.mate2.to_string());
        if job.with_qc {
            args.push("--qc".to_string());
        }
        args
    }
}

impl SampleLauncher for SelfExecLauncher {
    fn launch(
        &self,
        job: &SampleJob,
        stdout: File,
        stderr: File,
    ) -> Result<LaunchStatus, PipelineError> {
        let status = Command::new(&self.program)
            .args(self.arguments(job))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .map_err(|err| {
                PipelineError::Filesystem(format!("spawn {}: {err}", self.program.display()))
            })?;
        Ok(LaunchStatus {
            success: status.success(),
            status: describe_status(status),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleOutcome {
    pub sample: String,
    pub success: bool,
    pub status: String,
    pub log: String,
    pub err: String,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub started_at: String,
    pub finished_at: String,
    pub jobs: usize,
    pub samples: Vec<SampleOutcome>,
    pub skipped: Vec<String>,
}

impl DispatchReport {
    pub fn failed(&self) -> Vec<String> {
        self.samples
            .iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| outcome.sample.clone())
            .collect()
    }

    pub fn ensure_all_succeeded(&self) -> Result<(), PipelineError> {
        let failed = self.failed();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::SamplesFailed(failed))
        }
    }
}

/// Checks every target directory before anything is created or launched.
pub fn plan_jobs(
    pairs: Vec<ReadPair>,
    workdir: &Utf8Path,
    with_qc: bool,
    skip_existing: bool,
) -> Result<(Vec<SampleJob>, Vec<String>), PipelineError> {
    let mut jobs = Vec::new();
    let mut skipped = Vec::new();
    let mut names = HashSet::new();

    for pair in pairs {
        let layout = SampleLayout::for_sample(workdir, &pair.name);
        if !names.insert(pair.name.clone()) {
            return Err(PipelineError::DuplicateSample(pair.name.to_string()));
        }
        if layout.root().exists() {
            if skip_existing {
                tracing::warn!(sample = %pair.name, "sample directory exists, skipping");
                skipped.push(pair.name.to_string());
                continue;
            }
            return Err(PipelineError::SampleDirExists(
                layout.root().as_std_path().to_path_buf(),
            ));
        }
        jobs.push(SampleJob {
            pair,
            layout,
            with_qc,
        });
    }
    Ok((jobs, skipped))
}

pub fn dispatch(
    options: &DispatchOptions,
    launcher: &dyn SampleLauncher,
    sink: &dyn ProgressSink,
) -> Result<DispatchReport, PipelineError> {
    let pairs = discover_pairs(&options.folder)?;
    sink.event(ProgressEvent::phase(
        "Discover",
        &format!("{} read pairs in {}", pairs.len(), options.folder),
    ));

    let (jobs, skipped) = plan_jobs(
        pairs,
        &options.workdir,
        options.with_qc,
        options.skip_existing,
    )?;
    for job in &jobs {
        fs::create_dir_all(job.layout.root()).map_err(|err| {
            PipelineError::Filesystem(format!("create {}: {err}", job.layout.root()))
        })?;
    }

    let workers = options.jobs.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("rsem-pipe-worker-{i}"))
        .build()
        .map_err(|err| PipelineError::Filesystem(format!("build worker pool: {err}")))?;

    let started_at = chrono::Utc::now().to_rfc3339();
    tracing::info!(samples = jobs.len(), workers, "dispatching samples");
    let samples: Vec<SampleOutcome> = pool.install(|| {
        jobs.par_iter()
            .map(|job| run_job(job, launcher, sink))
            .collect()
    });
    let finished_at = chrono::Utc::now().to_rfc3339();

    Ok(DispatchReport {
        started_at,
        finished_at,
        jobs: workers,
        samples,
        skipped,
    })
}

fn run_job(job: &SampleJob, launcher: &dyn SampleLauncher, sink: &dyn ProgressSink) -> SampleOutcome {
    let start = Instant::now();
    let log = job.layout.log_file();
    let err = job.layout.err_file();
    sink.event(ProgressEvent::phase(
        "Launch",
        &format!("Running {}", job.pair.name),
    ));

    let result = open_logs(&log, &err)
        .and_then(|(stdout, stderr)| launcher.launch(job, stdout, stderr));
    let (success, status) = match result {
        Ok(launch) => (launch.success, launch.status),
        Err(error) => (false, error.to_string()),
    };

    let elapsed = start.elapsed();
    if success {
        tracing::info!(sample = %job.pair.name, elapsed_secs = elapsed.as_secs_f64(), "sample done");
    } else {
        tracing::error!(sample = %job.pair.name, %status, "sample failed");
    }
    sink.event(ProgressEvent {
        message: format!("{} {status}", job.pair.name),
        elapsed: Some(elapsed),
    });

    SampleOutcome {
        sample: job.pair.name.to_string(),
        success,
        status,
        log: log.to_string(),
        err: err.to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
    }
}

fn open_logs(log: &Utf8Path, err: &Utf8Path) -> Result<(File, File), PipelineError> {
    let create = |path: &Utf8Path| {
        File::create(path).map_err(|e| PipelineError::Filesystem(format!("create {path}: {e}")))
    };
    Ok((create(log)?, create(err)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> SampleJob {
        SampleJob {
            pair: ReadPair::from_mate1(Utf8PathBuf::from(format!("/in/{name}_1.fastq.gz"))),
            layout: SampleLayout::new(Utf8PathBuf::from(format!("/work/{name}"))),
            with_qc: true,
        }
    }

    #[test]
    fn self_exec_arguments_forward_config_and_qc() {
        let launcher = SelfExecLauncher::with_program(
            PathBuf::from("/usr/bin/rsem-pipe"),
            Some(PathBuf::from("/etc/rsem-pipe.json")),
        );
        assert_eq!(
            launcher.arguments(&job("ctrl")),
            vec![
                "--config",
                "/etc/rsem-pipe.json",
                "sample",
                "/work/ctrl",
                "/in/ctrl_1.fastq.gz",
                "/in/ctrl_2.fastq.gz",
                "--qc",
            ]
        );
    }

    #[test]
    fn duplicate_sample_names_are_rejected() {
        let pairs = vec![
            ReadPair::from_mate1(Utf8PathBuf::from("/in/a_1.fastq")),
            ReadPair::from_mate1(Utf8PathBuf::from("/in/a_1.fastq.gz")),
        ];
        let err = plan_jobs(pairs, Utf8Path::new("/nonexistent-workdir"), false, false)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateSample(name) if name == "a"));
    }

    #[test]
    fn report_lists_failed_samples() {
        let outcome = |sample: &str, success| SampleOutcome {
            sample: sample.to_string(),
            success,
            status: String::new(),
            log: String::new(),
            err: String::new(),
            elapsed_secs: 0.0,
        };
        let report = DispatchReport {
            started_at: String::new(),
            finished_at: String::new(),
            jobs: 1,
            samples: vec![outcome("a", true), outcome("b", false)],
            skipped: Vec::new(),
        };
        assert_eq!(report.failed(), vec!["b".to_string()]);
        assert!(matches!(
            report.ensure_all_succeeded(),
            Err(PipelineError::SamplesFailed(names)) if names == vec!["b".to_string()]
        ));
    }
}
