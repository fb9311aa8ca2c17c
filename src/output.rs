use std::io::{self, Write};

use serde::Serialize;

use crate::aggregate::{CollectReport, GatherSummary};
use crate::app::{ProgressEvent, ProgressSink, RunReport, ToolsReport};
use crate::dispatch::DispatchReport;
use crate::driver::SampleReport;
use crate::subset::SubsetReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sample(report: &SampleReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_dispatch(report: &DispatchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_collect(report: &CollectReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_run(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_subset(report: &SubsetReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_tools(report: &ToolsReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Plain-text summaries for terminal use; progress goes to the log.
pub struct HumanOutput;

impl HumanOutput {
    pub fn print_sample(report: &SampleReport) {
        println!("Sample done in {:.1}s: {}", report.elapsed_secs, report.folder);
        println!("  genes: {}", report.genes_results);
        if let Some(qc) = &report.qc_file {
            println!("  qc:    {qc} ({} metrics)", report.qc_metrics);
        }
    }

    pub fn print_dispatch(report: &DispatchReport) {
        for outcome in &report.samples {
            let mark = if outcome.success { "ok" } else { "FAILED" };
            println!("{:<7}{}  {}", mark, outcome.sample, outcome.status);
        }
        for sample in &report.skipped {
            println!("{:<7}{sample}", "skip");
        }
        let failed = report.failed().len();
        println!(
            "{} samples, {} failed, {} skipped ({} workers)",
            report.samples.len(),
            failed,
            report.skipped.len(),
            report.jobs
        );
    }

    pub fn print_collect(report: &CollectReport) {
        for summary in [&report.tpm, &report.counts, &report.qc] {
            print_gather(summary);
        }
    }

    pub fn print_run(report: &RunReport) {
        Self::print_dispatch(&report.dispatch);
        Self::print_collect(&report.collect);
    }

    pub fn print_subset(report: &SubsetReport) {
        println!("kept {} samples: {}", report.samples.len(), report.samples.join(", "));
        println!("  {}", report.metadata);
        println!("  {}", report.counts);
    }

    pub fn print_tools(report: &ToolsReport) {
        for tool in &report.tools {
            println!(
                "{:<28}{:<48}{}",
                tool.name,
                tool.path.as_deref().unwrap_or("not found"),
                tool.version.as_deref().unwrap_or("-")
            );
        }
        println!("reference: {}", report.config.rsem.reference.display());
        println!("ref_flat:  {}", report.config.picard.ref_flat.display());
        println!("compression: {}  jobs: {}", report.config.compression, report.config.jobs);
    }
}

fn print_gather(summary: &GatherSummary) {
    println!(
        "{}: {} samples x {} rows",
        summary.output,
        summary.samples.len(),
        summary.rows
    );
}

/// Forwards progress events to `tracing`.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message)
            }
            None => tracing::info!("{}", event.message),
        }
    }
}
