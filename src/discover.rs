use std::fs;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::domain::{MATE1_MARKER, ReadPair};
use crate::error::PipelineError;

static FASTQ_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.fastq").expect("static regex"));

/// Lists the entries of `folder` whose name contains `.fastq` in any case,
/// sorted by name.
pub fn fastq_files(folder: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    if !folder.is_dir() {
        return Err(PipelineError::InvalidPath(format!("{folder} is not a directory")));
    }
    let entries = fs::read_dir(folder)
        .map_err(|err| PipelineError::Filesystem(format!("read dir {folder}: {err}")))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 file name");
            continue;
        };
        if FASTQ_NAME.is_match(&name) {
            files.push(folder.join(name));
        }
    }
    files.sort();
    Ok(files)
}

/// Pairs every file whose name carries the mate-1 marker with its derived
/// mate-2 path. Mate-2 files are not required to exist.
pub fn gather_pairs(files: &[Utf8PathBuf]) -> Vec<ReadPair> {
    files
        .iter()
        .filter(|path| {
            path.file_name()
                .map(|name| name.contains(MATE1_MARKER))
                .unwrap_or(false)
        })
        .map(|path| ReadPair::from_mate1(path.clone()))
        .collect()
}

pub fn discover_pairs(folder: &Utf8Path) -> Result<Vec<ReadPair>, PipelineError> {
    let files = fastq_files(folder)?;
    let pairs = gather_pairs(&files);
    tracing::debug!(
        folder = %folder,
        fastq = files.len(),
        pairs = pairs.len(),
        "discovered read pairs"
    );
    Ok(pairs)
}
