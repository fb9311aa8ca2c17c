//! Flattening of Picard metrics reports into a single `name -> value` table.

use std::fs;
use std::path::Path;

use crate::error::PipelineError;

pub const METRICS_MARKER: &str = "## METRICS";

/// Ordered metric values, kept as their original text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QcMetrics {
    entries: Vec<(String, String)>,
}

impl QcMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a metric, replacing an earlier value of the same name in place.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Adds the numeric metrics of one report.
    pub fn absorb_report(&mut self, text: &str) {
        let lines: Vec<&str> = text.lines().collect();
        let Some(marker) = lines
            .iter()
            .position(|line| line.starts_with(METRICS_MARKER))
        else {
            return;
        };
        let (Some(headers), Some(values)) = (lines.get(marker + 1), lines.get(marker + 2)) else {
            return;
        };
        for (header, value) in headers.split('\t').zip(values.split('\t')) {
            if value.trim().parse::<f64>().is_ok() {
                self.insert(header, value);
            }
        }
    }

    pub fn absorb_report_file(&mut self, path: &Path) -> Result<(), PipelineError> {
        let text = fs::read_to_string(path)
            .map_err(|err| PipelineError::Filesystem(format!("read {}: {err}", path.display())))?;
        self.absorb_report(&text);
        Ok(())
    }

    /// Writes `name<TAB>value` lines with no header.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('\t');
            out.push_str(value);
            out.push('\n');
        }
        fs::write(path, out)
            .map_err(|err| PipelineError::Filesystem(format!("write {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    const RNASEQ_REPORT: &str = "## htsjdk.samtools.metrics.StringHeader\n\
# CollectRnaSeqMetrics I=x.bam\n\
\n\
## METRICS CLASS\tpicard.analysis.RnaSeqMetrics\n\
PF_BASES\tPF_ALIGNED_BASES\tRIBOSOMAL_BASES\tPCT_CODING_BASES\tSAMPLE\n\
1000\t900\t\t0.45\t\n\
\n\
## HISTOGRAM\tjava.lang.Integer\n\
normalized_position\tAll_Reads.normalized_coverage\n\
0\t0.5\n";

    const INSERT_REPORT: &str = "## METRICS CLASS\tpicard.analysis.InsertSizeMetrics\n\
MEDIAN_INSERT_SIZE\tPF_BASES\tPAIR_ORIENTATION\n\
250\t1200\tFR\n";

    #[test]
    fn keeps_only_numeric_values() {
        let mut metrics = QcMetrics::new();
        metrics.absorb_report(RNASEQ_REPORT);
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics.get("PF_BASES"), Some("1000"));
        assert_eq!(metrics.get("PCT_CODING_BASES"), Some("0.45"));
        assert_eq!(metrics.get("RIBOSOMAL_BASES"), None);
        assert_eq!(metrics.get("SAMPLE"), None);
    }

    #[test]
    fn later_reports_overwrite_in_place() {
        let mut metrics = QcMetrics::new();
        metrics.absorb_report(RNASEQ_REPORT);
        metrics.absorb_report(INSERT_REPORT);
        let names: Vec<_> = metrics.names().collect();
        assert_eq!(
            names,
            vec![
                "PF_BASES",
                "PF_ALIGNED_BASES",
                "PCT_CODING_BASES",
                "MEDIAN_INSERT_SIZE"
            ]
        );
        assert_eq!(metrics.get("PF_BASES"), Some("1200"));
        assert_eq!(metrics.get("PAIR_ORIENTATION"), None);
    }

    #[test]
    fn report_without_marker_adds_nothing() {
        let mut metrics = QcMetrics::new();
        metrics.absorb_report("## HISTOGRAM\nx\ty\n1\t2\n");
        assert!(metrics.is_empty());
    }

    #[test]
    fn written_file_reads_back_as_headerless_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("QC.txt");
        let mut metrics = QcMetrics::new();
        metrics.absorb_report(INSERT_REPORT);
        metrics.write(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "MEDIAN_INSERT_SIZE\t250\nPF_BASES\t1200\n"
        );
        let table = Table::read_tsv(&path, false).unwrap();
        assert_eq!(table.value("PF_BASES", "1"), Some("1200"));
    }
}
