//! Batch conversion of a directory of serialized assemblies.
//!
//! Each file goes through the single-conversion pipeline on its own. With
//! abort-on-first-error the files run in order and stop at the first failure;
//! with continue-on-error they run on a rayon pool and the reports are put
//! back in input order.
use crate::assembly::load_assembly;
use crate::clock::Clock;
use crate::converter::Converter;
use crate::output::{batch_output_path, write_record, RenderOptions, BATCH_SUFFIX};
use crate::ulid::{IdGenerator, SharedIds};
use crate::util::display_path;
use anyhow::{anyhow, Context, Result};
use globset::{Glob, GlobMatcher};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_PATTERN: &str = "*.json";

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub pattern: String,
    pub recursive: bool,
    pub continue_on_error: bool,
    pub dry_run: bool,
    /// Where records are written; defaults to the input directory.
    pub output_dir: Option<PathBuf>,
    pub render: RenderOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: false,
            continue_on_error: false,
            dry_run: false,
            output_dir: None,
            render: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Valid record written to disk.
    Written,
    /// Valid record, not written because of `--dry-run`.
    Valid,
    /// Conversion produced an invalid or withheld record.
    Invalid,
    /// The input could not be read or written.
    Failed,
}

impl FileStatus {
    pub fn is_success(self) -> bool {
        matches!(self, FileStatus::Written | FileStatus::Valid)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub record_id: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// Inputs never attempted because an earlier file failed.
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.status.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }
}

/// Files under `dir` whose name or relative path matches `pattern`, sorted.
/// Records written by an earlier batch run are left out.
pub fn discover_inputs(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("input directory not found: {}", dir.display()));
    }
    let matcher = build_matcher(pattern)?;
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.path().file_name() else {
            continue;
        };
        if name.to_string_lossy().ends_with(BATCH_SUFFIX) {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let name_matches = matcher.is_match(Path::new(name));
        if name_matches || matcher.is_match(rel) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    let glob = Glob::new(pattern).with_context(|| format!("invalid pattern {pattern:?}"))?;
    Ok(glob.compile_matcher())
}

pub fn run_batch<G>(
    input_dir: &Path,
    converter: &Converter,
    clock: &dyn Clock,
    ids: &SharedIds<G>,
    options: &BatchOptions,
) -> Result<BatchReport>
where
    G: IdGenerator + Send,
{
    let inputs = discover_inputs(input_dir, &options.pattern, options.recursive)?;
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| input_dir.to_path_buf());
    let plans = plan_outputs(&inputs, input_dir, &output_dir);
    info!(
        count = inputs.len(),
        dir = %input_dir.display(),
        "batch inputs discovered"
    );

    let convert_one = |plan: &OutputPlan| {
        let report = match &plan.claimed_by {
            Some(first) => collision_report(plan, first),
            None => {
                let mut handle = ids;
                process_file(&plan.input, &plan.output, converter, clock, &mut handle, options)
            }
        };
        info!(
            input = %display_path(&plan.input, Some(input_dir)),
            status = ?report.status,
            "batch file finished"
        );
        report
    };

    let mut report = BatchReport::default();
    if options.continue_on_error {
        report.files = plans.par_iter().map(convert_one).collect();
        return Ok(report);
    }

    for (index, plan) in plans.iter().enumerate() {
        let file = convert_one(plan);
        let failed = !file.status.is_success();
        report.files.push(file);
        if failed {
            report.skipped = inputs[index + 1..].to_vec();
            if !report.skipped.is_empty() {
                warn!(
                    skipped = report.skipped.len(),
                    "stopping batch at first failure"
                );
            }
            break;
        }
    }
    Ok(report)
}

struct OutputPlan {
    input: PathBuf,
    output: PathBuf,
    /// Earlier input that already targets the same output file.
    claimed_by: Option<PathBuf>,
}

/// Each output file belongs to the first input (in sorted order) that maps
/// onto it.
fn plan_outputs(inputs: &[PathBuf], input_dir: &Path, output_dir: &Path) -> Vec<OutputPlan> {
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();
    inputs
        .iter()
        .map(|input| {
            let output = batch_output_path(input, input_dir, output_dir);
            let claimed_by = match owners.get(&output) {
                Some(first) => Some(first.clone()),
                None => {
                    owners.insert(output.clone(), input.clone());
                    None
                }
            };
            OutputPlan {
                input: input.clone(),
                output,
                claimed_by,
            }
        })
        .collect()
}

fn collision_report(plan: &OutputPlan, first: &Path) -> FileReport {
    FileReport {
        input: plan.input.clone(),
        output: None,
        status: FileStatus::Failed,
        record_id: None,
        errors: vec![format!(
            "output {} collides with the output of {}",
            plan.output.display(),
            first.display()
        )],
        warnings: Vec::new(),
    }
}

fn process_file(
    input: &Path,
    output: &Path,
    converter: &Converter,
    clock: &dyn Clock,
    ids: &mut dyn IdGenerator,
    options: &BatchOptions,
) -> FileReport {
    let mut report = FileReport {
        input: input.to_path_buf(),
        output: None,
        status: FileStatus::Failed,
        record_id: None,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    let assembly = match load_assembly(input) {
        Ok(assembly) => assembly,
        Err(err) => {
            report.errors.push(format!("{err:#}"));
            return report;
        }
    };

    let result = converter.convert(&assembly, clock, ids);
    report.record_id = result.record_id().map(str::to_string);
    report.errors = result.errors.iter().map(ToString::to_string).collect();
    report.warnings = result.warnings.iter().map(ToString::to_string).collect();
    let record = match (&result.record, result.is_valid) {
        (Some(record), true) => record,
        _ => {
            report.status = FileStatus::Invalid;
            return report;
        }
    };
    if options.dry_run {
        report.status = FileStatus::Valid;
        return report;
    }

    match write_record(output, record, options.render) {
        Ok(()) => {
            report.status = FileStatus::Written;
            report.output = Some(output.to_path_buf());
        }
        Err(err) => report.errors.push(format!("{err:#}")),
    }
    report
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
