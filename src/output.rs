//! Writing records and reports to disk.
use crate::assembly::{present, AssemblyResult};
use crate::record::{render_record, Record};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_PREFIX: &str = "isaac_record";
/// Suffix of records written by batch runs; such files are never batch inputs.
pub const BATCH_SUFFIX: &str = "_isaac.json";

/// Layout of emitted JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub pretty: bool,
    pub include_nulls: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_nulls: false,
        }
    }
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn write_record(path: &Path, record: &Record, options: RenderOptions) -> Result<()> {
    let mut text = render_record(record, options.pretty, options.include_nulls);
    text.push('\n');
    write_bytes(path, text.as_bytes())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value).context("serialize JSON")?;
    bytes.push(b'\n');
    write_bytes(path, &bytes)
}

/// `isaac_record_<run>.json`, falling back to the record identifier when the
/// assembly carries no run number.
pub fn convert_output_name(assembly: &AssemblyResult, record_id: Option<&str>) -> String {
    let run = assembly
        .reflectivity
        .as_ref()
        .and_then(|refl| present(&refl.run_number))
        .or(record_id);
    match run {
        Some(run) => format!("{RECORD_PREFIX}_{}.json", sanitize(run)),
        None => format!("{RECORD_PREFIX}.json"),
    }
}

/// Output path for one batch input: `<output_dir>/<relative dir>/<stem>_isaac.json`,
/// keeping the input's location below `input_dir` so nested inputs with the
/// same name do not share an output.
pub fn batch_output_path(input: &Path, input_dir: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "record".to_string());
    let nested = input
        .strip_prefix(input_dir)
        .ok()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty());
    let dir = match nested {
        Some(parent) => output_dir.join(parent),
        None => output_dir.to_path_buf(),
    };
    dir.join(format!("{stem}{BATCH_SUFFIX}"))
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
