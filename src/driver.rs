use std::fs;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::compress::{gunzip, gzip};
use crate::domain::CompressionBackend;
use crate::error::PipelineError;
use crate::layout::SampleLayout;
use crate::picard::MetricsCollector;
use crate::qc::QcMetrics;
use crate::rsem::Quantifier;

#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub folder: Utf8PathBuf,
    pub mate1: Utf8PathBuf,
    pub mate2: Utf8PathBuf,
    pub with_qc: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub folder: String,
    pub genes_results: String,
    pub qc_file: Option<String>,
    pub qc_metrics: usize,
    pub mate1: String,
    pub mate2: String,
    pub elapsed_secs: f64,
}

/// Runs one sample end to end: decompress, quantify, optional QC, recompress.
///
/// Inputs are recompressed even when a tool fails; the tool error wins over
/// a recompression error.
pub fn process_sample(
    request: &SampleRequest,
    quantifier: &dyn Quantifier,
    metrics: &dyn MetricsCollector,
    compression: CompressionBackend,
    sink: &dyn ProgressSink,
) -> Result<SampleReport, PipelineError> {
    let start = Instant::now();

    fs::create_dir_all(&request.folder)
        .map_err(|err| PipelineError::Filesystem(format!("create {}: {err}", request.folder)))?;
    let layout = SampleLayout::new(absolute(&request.folder)?);
    let mate1 = absolute(&request.mate1)?;
    let mate2 = absolute(&request.mate2)?;

    sink.event(ProgressEvent::phase("Prepare", "decompressing reads"));
    let mate1 = gunzip(&mate1, compression)?;
    let mate2 = match gunzip(&mate2, compression) {
        Ok(path) => path,
        Err(err) => {
            restore(&mate1, compression);
            return Err(err);
        }
    };

    let outcome = run_tools(&layout, &mate1, &mate2, request.with_qc, quantifier, metrics, sink);

    sink.event(ProgressEvent::phase("Finish", "recompressing reads"));
    let packed1 = gzip(&mate1, compression);
    let packed2 = gzip(&mate2, compression);

    let elapsed = start.elapsed();
    tracing::info!(elapsed_secs = elapsed.as_secs_f64(), "sample finished");

    let qc_metrics = outcome?;
    let mate1 = packed1?;
    let mate2 = packed2?;

    Ok(SampleReport {
        folder: layout.root().to_string(),
        genes_results: layout.genes_results().to_string(),
        qc_file: request.with_qc.then(|| layout.qc_file().to_string()),
        qc_metrics,
        mate1: mate1.to_string(),
        mate2: mate2.to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
    })
}

fn run_tools(
    layout: &SampleLayout,
    mate1: &Utf8Path,
    mate2: &Utf8Path,
    with_qc: bool,
    quantifier: &dyn Quantifier,
    metrics: &dyn MetricsCollector,
    sink: &dyn ProgressSink,
) -> Result<usize, PipelineError> {
    let rsem_dir = layout.rsem_dir();
    fs::create_dir_all(&rsem_dir)
        .map_err(|err| PipelineError::Filesystem(format!("create {rsem_dir}: {err}")))?;

    sink.event(ProgressEvent::phase("Quantify", "running rsem-calculate-expression"));
    let start = Instant::now();
    quantifier.calculate_expression(mate1, mate2, &layout.rsem_prefix())?;
    sink.event(ProgressEvent {
        message: "rsem finished".to_string(),
        elapsed: Some(start.elapsed()),
    });

    if !with_qc {
        return Ok(0);
    }

    sink.event(ProgressEvent::phase("QC", "running picard"));
    let bam = layout.genome_bam();
    metrics.rna_seq_metrics(&bam, &layout.rnaseq_metrics())?;
    metrics.insert_size_metrics(
        &bam,
        &layout.insert_size_metrics(),
        &layout.insert_size_histogram(),
    )?;

    let mut qc = QcMetrics::new();
    qc.absorb_report_file(layout.rnaseq_metrics().as_std_path())?;
    qc.absorb_report_file(layout.insert_size_metrics().as_std_path())?;
    qc.write(layout.qc_file().as_std_path())?;
    tracing::info!(metrics = qc.len(), path = %layout.qc_file(), "wrote QC table");
    Ok(qc.len())
}

fn restore(path: &Utf8Path, compression: CompressionBackend) {
    if let Err(err) = gzip(path, compression) {
        tracing::warn!(path = %path, error = %err, "failed to recompress input");
    }
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, PipelineError> {
    let abs = std::path::absolute(path.as_std_path())
        .map_err(|err| PipelineError::InvalidPath(format!("{path}: {err}")))?;
    Utf8PathBuf::from_path_buf(abs).map_err(|p| PipelineError::InvalidPath(p.display().to_string()))
}
