use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::SampleName;

pub const RSEM_DIR: &str = "RSEM_Out";
pub const RSEM_PREFIX: &str = "results";
pub const GENES_RESULTS: &str = "results.genes.results";
pub const GENOME_BAM: &str = "results.genome.sorted.bam";
pub const RNASEQ_METRICS: &str = "CollectRnaSeqMetrics.txt";
pub const INSERT_SIZE_METRICS: &str = "CollectInsertSizeMetrics.txt";
pub const INSERT_SIZE_HISTOGRAM: &str = "CollectInsertSizeMetrics.pdf";
pub const QC_FILE: &str = "QC.txt";
pub const LOG_FILE: &str = "log.txt";
pub const ERR_FILE: &str = "err.txt";

pub const TPM_MATRIX: &str = "TPM_Matrix.txt";
pub const COUNT_MATRIX: &str = "Count_Matrix.txt";
pub const QC_MATRIX: &str = "QC_all.txt";
pub const SAMPLE_META: &str = "sample_meta.txt";
pub const SUBSET_META: &str = "sample_meta_ebseq.txt";
pub const SUBSET_COUNTS: &str = "count_matrix_ebseq.txt";

/// Paths inside one sample's output directory.
#[derive(Debug, Clone)]
pub struct SampleLayout {
    root: Utf8PathBuf,
}

impl SampleLayout {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn for_sample(workdir: &Utf8Path, name: &SampleName) -> Self {
        Self::new(workdir.join(name.as_str()))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn rsem_dir(&self) -> Utf8PathBuf {
        self.root.join(RSEM_DIR)
    }

    pub fn rsem_prefix(&self) -> Utf8PathBuf {
        self.rsem_dir().join(RSEM_PREFIX)
    }

    pub fn genes_results(&self) -> Utf8PathBuf {
        self.rsem_dir().join(GENES_RESULTS)
    }

    pub fn genome_bam(&self) -> Utf8PathBuf {
        self.rsem_dir().join(GENOME_BAM)
    }

    pub fn rnaseq_metrics(&self) -> Utf8PathBuf {
        self.rsem_dir().join(RNASEQ_METRICS)
    }

    pub fn insert_size_metrics(&self) -> Utf8PathBuf {
        self.rsem_dir().join(INSERT_SIZE_METRICS)
    }

    pub fn insert_size_histogram(&self) -> Utf8PathBuf {
        self.rsem_dir().join(INSERT_SIZE_HISTOGRAM)
    }

    pub fn qc_file(&self) -> Utf8PathBuf {
        self.rsem_dir().join(QC_FILE)
    }

    pub fn log_file(&self) -> Utf8PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn err_file(&self) -> Utf8PathBuf {
        self.root.join(ERR_FILE)
    }
}

/// Per-sample result files relative to a sample directory.
pub fn genes_results_relative() -> Utf8PathBuf {
    Utf8Path::new(RSEM_DIR).join(GENES_RESULTS)
}

pub fn qc_relative() -> Utf8PathBuf {
    Utf8Path::new(RSEM_DIR).join(QC_FILE)
}
