use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub const MATE1_MARKER: &str = "_1";
pub const MATE2_MARKER: &str = "_2";
pub const GZIP_SUFFIX: &str = ".gz";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleName(String);

impl SampleName {
    /// Derives the sample name from a mate-1 read file: the basename up to the
    /// first `_1`. A basename without the marker is used whole.
    pub fn from_mate1(path: &Utf8Path) -> Self {
        let basename = path.file_name().unwrap_or(path.as_str());
        let root = match basename.find(MATE1_MARKER) {
            Some(idx) => &basename[..idx],
            None => basename,
        };
        Self(root.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SampleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Mate files of one paired-end sample. The mate-2 path is derived by name and
/// is not checked for existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub name: SampleName,
    pub mate1: Utf8PathBuf,
    pub mate2: Utf8PathBuf,
}

impl ReadPair {
    pub fn from_mate1(mate1: Utf8PathBuf) -> Self {
        let mate2 = match mate1.file_name() {
            Some(name) => mate1.with_file_name(name.replace(MATE1_MARKER, MATE2_MARKER)),
            None => Utf8PathBuf::from(mate1.as_str().replace(MATE1_MARKER, MATE2_MARKER)),
        };
        Self {
            name: SampleName::from_mate1(&mate1),
            mate1,
            mate2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionBackend {
    /// Shell out to the system `gzip`.
    #[default]
    System,
    /// Compress in-process.
    Native,
}

impl fmt::Display for CompressionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionBackend::System => write!(f, "system"),
            CompressionBackend::Native => write!(f, "native"),
        }
    }
}
