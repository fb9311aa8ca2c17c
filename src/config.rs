use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::CompressionBackend;
use crate::error::PipelineError;

pub const CONFIG_FILE_NAME: &str = "rsem-pipe.json";
pub const DEFAULT_RSEM_EXECUTABLE: &str = "rsem-calculate-expression";
pub const DEFAULT_RSEM_REFERENCE: &str =
    "/home/deto/References/Homo_sapiens/Ensemble/GRCh38/hg38_rsem";
pub const DEFAULT_REF_FLAT: &str =
    "/home/deto/References/Homo_sapiens/Ensemble/GRCh38/refFlat_fixed.txt";
pub const DEFAULT_JAVA: &str = "java";
pub const DEFAULT_STRAND: &str = "NONE";
pub const PICARD_ENV: &str = "PICARD";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub rsem: Option<RsemEntry>,
    #[serde(default)]
    pub picard: Option<PicardEntry>,
    #[serde(default)]
    pub compression: Option<CompressionBackend>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RsemEntry {
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PicardEntry {
    #[serde(default)]
    pub java: Option<String>,
    #[serde(default)]
    pub jar: Option<String>,
    #[serde(default)]
    pub ref_flat: Option<String>,
    #[serde(default)]
    pub strand: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RsemSettings {
    pub executable: PathBuf,
    pub reference: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct PicardSettings {
    pub java: PathBuf,
    /// Unset when neither the config nor `$PICARD` names a jar.
    pub jar: Option<PathBuf>,
    pub ref_flat: PathBuf,
    pub strand: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub rsem: RsemSettings,
    pub picard: PicardSettings,
    pub compression: CompressionBackend,
    pub jobs: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the explicit config file if given, otherwise the first of
    /// `./rsem-pipe.json` and `<config dir>/rsem-pipe/config.json` that
    /// exists. Falls back to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PipelineError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("no config file found, using defaults");
            return Ok(Self::resolve_config(Config::default()));
        };

        tracing::debug!(path = %config_path.display(), "loading config");
        let content = fs::read_to_string(&config_path)
            .map_err(|_| PipelineError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| PipelineError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let rsem = config.rsem.unwrap_or_default();
        let picard = config.picard.unwrap_or_default();

        let jar = picard
            .jar
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(PICARD_ENV).map(PathBuf::from));

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            rsem: RsemSettings {
                executable: PathBuf::from(
                    rsem.executable
                        .unwrap_or_else(|| DEFAULT_RSEM_EXECUTABLE.to_string()),
                ),
                reference: PathBuf::from(
                    rsem.reference
                        .unwrap_or_else(|| DEFAULT_RSEM_REFERENCE.to_string()),
                ),
            },
            picard: PicardSettings {
                java: PathBuf::from(picard.java.unwrap_or_else(|| DEFAULT_JAVA.to_string())),
                jar,
                ref_flat: PathBuf::from(
                    picard
                        .ref_flat
                        .unwrap_or_else(|| DEFAULT_REF_FLAT.to_string()),
                ),
                strand: picard.strand.unwrap_or_else(|| DEFAULT_STRAND.to_string()),
            },
            compression: config.compression.unwrap_or_default(),
            jobs: config.jobs.filter(|jobs| *jobs > 0).unwrap_or_else(default_jobs),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("rsem-pipe").join("config.json"))
            .filter(|path| path.exists())
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
