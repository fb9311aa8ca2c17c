use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::PipelineError;
use crate::layout::{COUNT_MATRIX, QC_MATRIX, TPM_MATRIX, genes_results_relative, qc_relative};
use crate::table::Table;

pub const TPM_COLUMN: &str = "TPM";
pub const COUNT_COLUMN: &str = "expected_count";

#[derive(Debug, Clone, Serialize)]
pub struct GatherSummary {
    pub output: String,
    pub samples: Vec<String>,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectReport {
    pub tpm: GatherSummary,
    pub counts: GatherSummary,
    pub qc: GatherSummary,
}

/// Sample directories directly under `workdir`, sorted by name.
pub fn sample_dirs(workdir: &Utf8Path) -> Result<Vec<(String, Utf8PathBuf)>, PipelineError> {
    if !workdir.is_dir() {
        return Err(PipelineError::InvalidPath(format!("{workdir} is not a directory")));
    }
    let entries = fs::read_dir(workdir)
        .map_err(|err| PipelineError::Filesystem(format!("read dir {workdir}: {err}")))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        if !entry.path().is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 directory");
            continue;
        };
        let path = workdir.join(&name);
        dirs.push((name, path));
    }
    dirs.sort();
    Ok(dirs)
}

fn inputs(
    workdir: &Utf8Path,
    rel_path: &Utf8Path,
) -> Result<Vec<(String, Utf8PathBuf)>, PipelineError> {
    let mut found = Vec::new();
    for (name, dir) in sample_dirs(workdir)? {
        let file = dir.join(rel_path);
        if file.is_file() {
            found.push((name, file));
        } else {
            tracing::warn!(sample = %name, path = %file, "result file missing, skipping");
        }
    }
    Ok(found)
}

/// Joins `column` of every sample's `rel_path` table into one matrix with a
/// column per sample.
pub fn gather_result(
    workdir: &Utf8Path,
    rel_path: &Utf8Path,
    column: &str,
    out: &Utf8Path,
) -> Result<GatherSummary, PipelineError> {
    let mut matrix = Table::new("");
    let mut samples = Vec::new();

    for (name, file) in inputs(workdir, rel_path)? {
        let table = Table::read_tsv(file.as_std_path(), true)?;
        if samples.is_empty() {
            matrix.set_index_name(table.index_name());
        }
        matrix.outer_join(table.column(column)?.renamed(&name));
        samples.push(name);
    }

    finish(matrix, samples, out)
}

/// Joins every sample's header-less two-column QC file.
pub fn gather_qc(
    workdir: &Utf8Path,
    rel_path: &Utf8Path,
    out: &Utf8Path,
) -> Result<GatherSummary, PipelineError> {
    let mut matrix = Table::new("");
    let mut samples = Vec::new();

    for (name, file) in inputs(workdir, rel_path)? {
        let table = Table::read_tsv(file.as_std_path(), false)?;
        let Some(values) = table.column_at(0) else {
            tracing::warn!(sample = %name, path = %file, "QC file is empty, skipping");
            continue;
        };
        matrix.outer_join(values.renamed(&name));
        samples.push(name);
    }

    finish(matrix, samples, out)
}

fn finish(
    matrix: Table,
    samples: Vec<String>,
    out: &Utf8Path,
) -> Result<GatherSummary, PipelineError> {
    if samples.is_empty() {
        tracing::warn!(path = %out, "no sample results found");
    }
    matrix.write_tsv(out.as_std_path(), true)?;
    tracing::info!(path = %out, samples = samples.len(), rows = matrix.index().len(), "wrote matrix");
    Ok(GatherSummary {
        output: out.to_string(),
        rows: matrix.index().len(),
        samples,
    })
}

/// Builds the TPM, count and QC matrices inside `workdir`.
pub fn collect(workdir: &Utf8Path) -> Result<CollectReport, PipelineError> {
    let genes = genes_results_relative();
    Ok(CollectReport {
        tpm: gather_result(workdir, &genes, TPM_COLUMN, &workdir.join(TPM_MATRIX))?,
        counts: gather_result(workdir, &genes, COUNT_COLUMN, &workdir.join(COUNT_MATRIX))?,
        qc: gather_qc(workdir, &qc_relative(), &workdir.join(QC_MATRIX))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Utf8Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn outer_join_across_samples() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(
            &root.join("B/RSEM_Out/results.genes.results"),
            "gene_id\tTPM\ng2\t5\ng3\t6\n",
        );
        write(
            &root.join("A/RSEM_Out/results.genes.results"),
            "gene_id\tTPM\ng1\t1\ng2\t2\n",
        );

        let out = root.join(TPM_MATRIX);
        let summary = gather_result(root, &genes_results_relative(), "TPM", &out).unwrap();
        assert_eq!(summary.samples, vec!["A", "B"]);
        assert_eq!(summary.rows, 3);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "gene_id\tA\tB\ng1\t1\t\ng2\t2\t5\ng3\t\t6\n"
        );
    }

    #[test]
    fn directories_without_results_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(&root.join("A/RSEM_Out/QC.txt"), "PF_BASES\t10\n");
        fs::create_dir_all(root.join("empty")).unwrap();

        let out = root.join(QC_MATRIX);
        let summary = gather_qc(root, &qc_relative(), &out).unwrap();
        assert_eq!(summary.samples, vec!["A"]);
        assert_eq!(fs::read_to_string(&out).unwrap(), "\tA\nPF_BASES\t10\n");
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        write(
            &root.join("A/RSEM_Out/results.genes.results"),
            "gene_id\tFPKM\ng1\t1\n",
        );

        let err = gather_result(root, &genes_results_relative(), "TPM", &root.join("x.txt"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { column, .. } if column == "TPM"));
    }
}
