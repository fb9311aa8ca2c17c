use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::PipelineError;
use crate::layout::{COUNT_MATRIX, SAMPLE_META, SUBSET_COUNTS, SUBSET_META};
use crate::table::Table;

pub const DEFAULT_FILTER_COLUMN: &str = "Genotype";
pub const DEFAULT_FILTER_VALUE: &str = "WT";
pub const DEFAULT_SORT_COLUMN: &str = "Stimulus";

#[derive(Debug, Clone)]
pub struct SubsetOptions {
    pub counts: Utf8PathBuf,
    pub metadata: Utf8PathBuf,
    pub filter_column: String,
    pub filter_value: String,
    pub sort_column: String,
    pub out_dir: Utf8PathBuf,
}

impl Default for SubsetOptions {
    fn default() -> Self {
        Self {
            counts: Utf8PathBuf::from(COUNT_MATRIX),
            metadata: Utf8PathBuf::from(SAMPLE_META),
            filter_column: DEFAULT_FILTER_COLUMN.to_string(),
            filter_value: DEFAULT_FILTER_VALUE.to_string(),
            sort_column: DEFAULT_SORT_COLUMN.to_string(),
            out_dir: Utf8PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetReport {
    pub samples: Vec<String>,
    pub metadata: String,
    pub counts: String,
}

/// Keeps the metadata rows matching the filter, sorts them, and reorders the
/// count matrix columns to the kept sample order.
pub fn subset_tables(
    counts: &Table,
    metadata: &Table,
    options: &SubsetOptions,
) -> Result<(Table, Table), PipelineError> {
    let mut kept = metadata.filter_eq(&options.filter_column, &options.filter_value)?;
    kept.sort_by_column(&options.sort_column)?;

    let samples = kept.index().to_vec();
    if let Some(missing) = samples
        .iter()
        .find(|sample| !counts.columns().contains(*sample))
    {
        return Err(PipelineError::MissingSample(missing.clone()));
    }

    let mut matrix = counts.select_columns(&samples)?;
    matrix.set_index_name("");
    Ok((kept, matrix))
}

pub fn run_subset(options: &SubsetOptions) -> Result<SubsetReport, PipelineError> {
    let counts = Table::read_tsv(options.counts.as_std_path(), true)?;
    let metadata = Table::read_tsv(options.metadata.as_std_path(), true)?;
    let (kept, matrix) = subset_tables(&counts, &metadata, options)?;

    let meta_out = options.out_dir.join(SUBSET_META);
    let counts_out = options.out_dir.join(SUBSET_COUNTS);
    kept.write_tsv(meta_out.as_std_path(), true)?;
    matrix.write_tsv(counts_out.as_std_path(), true)?;
    tracing::info!(samples = kept.index().len(), out_dir = %options.out_dir, "wrote subset");

    Ok(SubsetReport {
        samples: kept.index().to_vec(),
        metadata: meta_out.to_string(),
        counts: counts_out.to_string(),
    })
}

/// Convenience for callers working with a results directory.
pub fn options_for(workdir: &Utf8Path) -> SubsetOptions {
    SubsetOptions {
        counts: workdir.join(COUNT_MATRIX),
        metadata: workdir.join(SAMPLE_META),
        out_dir: workdir.to_path_buf(),
        ..SubsetOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const COUNTS: &str = "gene_id\ts1\ts2\ts3\ts4\n\
g1\t10\t20\t30\t40\n\
g2\t1\t2\t3\t4\n";

    const META: &str = "sample\tGenotype\tStimulus\n\
s1\tWT\t10\n\
s2\tKO\t0\n\
s3\tWT\t2\n\
s4\tWT\t2\n";

    #[test]
    fn keeps_wild_type_sorted_by_stimulus() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join(COUNT_MATRIX), COUNTS).unwrap();
        fs::write(root.join(SAMPLE_META), META).unwrap();

        let report = run_subset(&options_for(root)).unwrap();
        assert_eq!(report.samples, vec!["s3", "s4", "s1"]);
        assert_eq!(
            fs::read_to_string(root.join(SUBSET_META)).unwrap(),
            "sample\tGenotype\tStimulus\ns3\tWT\t2\ns4\tWT\t2\ns1\tWT\t10\n"
        );
        assert_eq!(
            fs::read_to_string(root.join(SUBSET_COUNTS)).unwrap(),
            "\ts3\ts4\ts1\ng1\t30\t40\t10\ng2\t3\t4\t1\n"
        );
    }

    #[test]
    fn sample_absent_from_matrix_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join(COUNT_MATRIX), "gene_id\ts1\ng1\t1\n").unwrap();
        fs::write(root.join(SAMPLE_META), META).unwrap();

        let err = run_subset(&options_for(root)).unwrap_err();
        assert!(matches!(err, PipelineError::MissingSample(name) if name == "s3"));
    }
}
