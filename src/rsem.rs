use camino::Utf8Path;

use crate::config::RsemSettings;
use crate::error::PipelineError;
use crate::tools::{ToolInfo, ToolInvocation, find_in_path, tool_version};

pub const RSEM_TAG: &str = "rsem-calculate-expression";

pub trait Quantifier: Send + Sync {
    /// Quantifies one paired-end sample, writing `<output_prefix>.*`.
    fn calculate_expression(
        &self,
        mate1: &Utf8Path,
        mate2: &Utf8Path,
        output_prefix: &Utf8Path,
    ) -> Result<(), PipelineError>;

    fn tool_info(&self) -> ToolInfo;
}

#[derive(Debug, Clone)]
pub struct SystemRsem {
    settings: RsemSettings,
}

impl SystemRsem {
    pub fn new(settings: RsemSettings) -> Self {
        Self { settings }
    }
}

/// Paired-end Bowtie2 run with a coordinate-sorted genome BAM.
pub fn rsem_invocation(
    settings: &RsemSettings,
    mate1: &Utf8Path,
    mate2: &Utf8Path,
    output_prefix: &Utf8Path,
) -> ToolInvocation {
    let args = vec![
        "--paired-end".to_string(),
        mate1.to_string(),
        mate2.to_string(),
        "--bowtie2".to_string(),
        "--output-genome-bam".to_string(),
        "--sort-bam-by-coordinate".to_string(),
        settings.reference.display().to_string(),
        output_prefix.to_string(),
    ];
    ToolInvocation::new(RSEM_TAG, settings.executable.clone(), args)
}

impl Quantifier for SystemRsem {
    fn calculate_expression(
        &self,
        mate1: &Utf8Path,
        mate2: &Utf8Path,
        output_prefix: &Utf8Path,
    ) -> Result<(), PipelineError> {
        rsem_invocation(&self.settings, mate1, mate2, output_prefix).run()
    }

    fn tool_info(&self) -> ToolInfo {
        let path = find_in_path(&self.settings.executable);
        ToolInfo {
            name: RSEM_TAG.to_string(),
            version: path
                .as_deref()
                .and_then(|path| tool_version(path, &["--version"])),
            path: path.map(|path| path.display().to_string()),
        }
    }
}
