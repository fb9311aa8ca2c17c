use std::path::Path;

use camino::Utf8Path;

use crate::config::PicardSettings;
use crate::error::PipelineError;
use crate::tools::{ToolInfo, ToolInvocation, find_in_path};

pub const PICARD_TAG: &str = "picard";

pub trait MetricsCollector: Send + Sync {
    fn rna_seq_metrics(&self, bam: &Utf8Path, output: &Utf8Path) -> Result<(), PipelineError>;

    fn insert_size_metrics(
        &self,
        bam: &Utf8Path,
        output: &Utf8Path,
        histogram: &Utf8Path,
    ) -> Result<(), PipelineError>;

    fn tool_info(&self) -> ToolInfo;
}

#[derive(Debug, Clone)]
pub struct SystemPicard {
    settings: PicardSettings,
}

impl SystemPicard {
    pub fn new(settings: PicardSettings) -> Self {
        Self { settings }
    }

    fn require_jar(&self) -> Result<&Path, PipelineError> {
        self.settings.jar.as_deref().ok_or_else(|| {
            PipelineError::MissingTool("picard jar (set picard.jar or $PICARD)".to_string())
        })
    }
}

fn picard_invocation(
    settings: &PicardSettings,
    jar: &Path,
    program: &str,
    options: Vec<String>,
) -> ToolInvocation {
    let mut args = vec![
        "-jar".to_string(),
        jar.display().to_string(),
        program.to_string(),
    ];
    args.extend(options);
    ToolInvocation::new(PICARD_TAG, settings.java.clone(), args)
}

pub fn rna_seq_metrics_invocation(
    settings: &PicardSettings,
    jar: &Path,
    bam: &Utf8Path,
    output: &Utf8Path,
) -> ToolInvocation {
    picard_invocation(
        settings,
        jar,
        "CollectRnaSeqMetrics",
        vec![
            format!("I={bam}"),
            format!("O={output}"),
            format!("REF_FLAT={}", settings.ref_flat.display()),
            format!("STRAND={}", settings.strand),
        ],
    )
}

pub fn insert_size_metrics_invocation(
    settings: &PicardSettings,
    jar: &Path,
    bam: &Utf8Path,
    output: &Utf8Path,
    histogram: &Utf8Path,
) -> ToolInvocation {
    picard_invocation(
        settings,
        jar,
        "CollectInsertSizeMetrics",
        vec![
            format!("I={bam}"),
            format!("O={output}"),
            format!("H={histogram}"),
        ],
    )
}

impl MetricsCollector for SystemPicard {
    fn rna_seq_metrics(&self, bam: &Utf8Path, output: &Utf8Path) -> Result<(), PipelineError> {
        let jar = self.require_jar()?;
        rna_seq_metrics_invocation(&self.settings, jar, bam, output).run()
    }

    fn insert_size_metrics(
        &self,
        bam: &Utf8Path,
        output: &Utf8Path,
        histogram: &Utf8Path,
    ) -> Result<(), PipelineError> {
        let jar = self.require_jar()?;
        insert_size_metrics_invocation(&self.settings, jar, bam, output, histogram).run()
    }

    /// Reports the jar when `java` is resolvable and the jar exists.
    fn tool_info(&self) -> ToolInfo {
        let java = find_in_path(&self.settings.java);
        let jar = self
            .settings
            .jar
            .as_ref()
            .filter(|jar| java.is_some() && jar.exists());
        ToolInfo {
            name: PICARD_TAG.to_string(),
            path: jar.map(|jar| jar.display().to_string()),
            version: None,
        }
    }
}
