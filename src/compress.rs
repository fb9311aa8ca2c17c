use std::fs;
use std::io::{self, BufReader, BufWriter};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::domain::{CompressionBackend, GZIP_SUFFIX};
use crate::error::PipelineError;
use crate::tools::ToolInvocation;

const GZIP_PROGRAM: &str = "gzip";

/// Compresses `path` in place and returns the `.gz` path. Paths that already
/// end in `.gz` are returned unchanged.
pub fn gzip(path: &Utf8Path, backend: CompressionBackend) -> Result<Utf8PathBuf, PipelineError> {
    if path.as_str().ends_with(GZIP_SUFFIX) {
        return Ok(path.to_path_buf());
    }
    let out = Utf8PathBuf::from(format!("{path}{GZIP_SUFFIX}"));

    match backend {
        CompressionBackend::System => ToolInvocation::new(
            GZIP_PROGRAM,
            GZIP_PROGRAM,
            vec![path.to_string()],
        )
        .run_captured()?,
        CompressionBackend::Native => native_compress(path, &out)?,
    }

    ensure_output(out)
}

/// Decompresses `path` in place and returns the path without its `.gz`
/// suffix. Paths without the suffix are returned unchanged.
pub fn gunzip(path: &Utf8Path, backend: CompressionBackend) -> Result<Utf8PathBuf, PipelineError> {
    let Some(stripped) = path.as_str().strip_suffix(GZIP_SUFFIX) else {
        return Ok(path.to_path_buf());
    };
    let out = Utf8PathBuf::from(stripped);

    match backend {
        CompressionBackend::System => ToolInvocation::new(
            GZIP_PROGRAM,
            GZIP_PROGRAM,
            vec!["-d".to_string(), path.to_string()],
        )
        .run_captured()?,
        CompressionBackend::Native => native_decompress(path, &out)?,
    }

    ensure_output(out)
}

fn ensure_output(out: Utf8PathBuf) -> Result<Utf8PathBuf, PipelineError> {
    if !out.as_std_path().is_file() {
        return Err(PipelineError::CompressionOutputMissing(out.into_std_path_buf()));
    }
    Ok(out)
}

fn native_compress(source: &Utf8Path, dest: &Utf8Path) -> Result<(), PipelineError> {
    let input = fs::File::open(source)
        .map_err(|err| PipelineError::Filesystem(format!("open {source}: {err}")))?;
    let output = fs::File::create(dest)
        .map_err(|err| PipelineError::Filesystem(format!("create {dest}: {err}")))?;
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    let written = io::copy(&mut BufReader::new(input), &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| io::Write::flush(&mut writer));
    if let Err(err) = written {
        let _ = fs::remove_file(dest);
        return Err(PipelineError::Filesystem(format!("compress {source}: {err}")));
    }
    fs::remove_file(source)
        .map_err(|err| PipelineError::Filesystem(format!("remove {source}: {err}")))
}

fn native_decompress(source: &Utf8Path, dest: &Utf8Path) -> Result<(), PipelineError> {
    let input = fs::File::open(source)
        .map_err(|err| PipelineError::Filesystem(format!("open {source}: {err}")))?;
    let output = fs::File::create(dest)
        .map_err(|err| PipelineError::Filesystem(format!("create {dest}: {err}")))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let mut writer = BufWriter::new(output);
    if let Err(err) = io::copy(&mut decoder, &mut writer) {
        let _ = fs::remove_file(dest);
        return Err(PipelineError::Filesystem(format!(
            "decompress {source}: {err}"
        )));
    }
    io::Write::flush(&mut writer)
        .map_err(|err| PipelineError::Filesystem(format!("write {dest}: {err}")))?;
    fs::remove_file(source)
        .map_err(|err| PipelineError::Filesystem(format!("remove {source}: {err}")))
}
