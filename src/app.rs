use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;

use crate::aggregate::{self, CollectReport};
use crate::config::ResolvedConfig;
use crate::dispatch::{self, DispatchOptions, DispatchReport, SampleLauncher};
use crate::driver::{self, SampleReport, SampleRequest};
use crate::error::PipelineError;
use crate::picard::MetricsCollector;
use crate::rsem::Quantifier;
use crate::subset::{self, SubsetOptions, SubsetReport};
use crate::tools::{ToolInfo, find_in_path, tool_version};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dispatch: DispatchReport,
    pub collect: CollectReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsReport {
    pub config: ResolvedConfig,
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn phase(phase: &str, detail: &str) -> Self {
        Self {
            message: format!("phase={phase}; {detail}"),
            elapsed: None,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<Q: Quantifier, M: MetricsCollector> {
    config: ResolvedConfig,
    quantifier: Q,
    metrics: M,
}

impl<Q: Quantifier, M: MetricsCollector> App<Q, M> {
    pub fn new(config: ResolvedConfig, quantifier: Q, metrics: M) -> Self {
        Self {
            config,
            quantifier,
            metrics,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn process_sample(
        &self,
        request: &SampleRequest,
        sink: &dyn ProgressSink,
    ) -> Result<SampleReport, PipelineError> {
        driver::process_sample(
            request,
            &self.quantifier,
            &self.metrics,
            self.config.compression,
            sink,
        )
    }

    pub fn dispatch<L: SampleLauncher>(
        &self,
        options: &DispatchOptions,
        launcher: &L,
        sink: &dyn ProgressSink,
    ) -> Result<DispatchReport, PipelineError> {
        dispatch::dispatch(options, launcher, sink)
    }

    /// Dispatches the folder and aggregates once every sample succeeded.
    pub fn run<L: SampleLauncher>(
        &self,
        options: &DispatchOptions,
        launcher: &L,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let dispatch = self.dispatch(options, launcher, sink)?;
        dispatch.ensure_all_succeeded()?;
        let collect = self.collect(&options.workdir, sink)?;
        Ok(RunReport { dispatch, collect })
    }

    pub fn collect(
        &self,
        workdir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<CollectReport, PipelineError> {
        sink.event(ProgressEvent::phase(
            "Collect",
            &format!("gathering results under {workdir}"),
        ));
        aggregate::collect(workdir)
    }

    pub fn subset(
        &self,
        options: &SubsetOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SubsetReport, PipelineError> {
        sink.event(ProgressEvent::phase(
            "Subset",
            &format!(
                "{}=={} sorted by {}",
                options.filter_column, options.filter_value, options.sort_column
            ),
        ));
        subset::run_subset(options)
    }

    pub fn tools(&self) -> ToolsReport {
        let gzip = find_in_path(std::path::Path::new("gzip"));
        let gzip = ToolInfo {
            name: "gzip".to_string(),
            version: gzip
                .as_deref()
                .and_then(|path| tool_version(path, &["--version"])),
            path: gzip.map(|path| path.display().to_string()),
        };
        ToolsReport {
            config: self.config.clone(),
            tools: vec![self.quantifier.tool_info(), self.metrics.tool_info(), gzip],
        }
    }
}
