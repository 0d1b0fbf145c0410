//! Command handlers: wire parsed arguments to the converter and report.
//!
//! Records go to stdout only when `convert` has no destination; every other
//! message goes to stderr.
use crate::assembly::load_assembly;
use crate::batch::{self, BatchOptions, BatchReport, FileStatus};
use crate::cli::{BatchArgs, ConvertArgs, FromJsonArgs, SchemaArgs, ValidateArgs};
use crate::clock::SystemClock;
use crate::converter::{Converter, ConverterOptions};
use crate::output::{convert_output_name, write_json, write_record};
use crate::record::{render_record, ConversionResult, Issue, RecordDomain, RecordType};
use crate::schema::{resolve_schema_source, SchemaValidator};
use crate::ulid::{FixedIdGenerator, IdGenerator, SharedIds, UlidGenerator};
use crate::util::display_path;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

fn exit_status(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_converter(
    schema: &SchemaArgs,
    record_type: RecordType,
    record_domain: RecordDomain,
) -> Result<Converter> {
    Converter::new(ConverterOptions {
        validate: schema.enabled(),
        schema_path: schema.schema.clone(),
        record_type,
        record_domain,
    })
}

fn print_issues(label: &str, issues: &[Issue]) {
    for issue in issues {
        eprintln!("{label}: {issue}");
    }
}

pub fn run_convert(args: ConvertArgs) -> Result<ExitCode> {
    let assembly = load_assembly(&args.input)?;
    let converter = build_converter(&args.schema, args.record_type, args.record_domain)?;
    let mut ids: Box<dyn IdGenerator> = match &args.record_id {
        Some(id) => Box::new(FixedIdGenerator(id.clone())),
        None => Box::new(UlidGenerator::default()),
    };
    let result = converter.convert(&assembly, &SystemClock, ids.as_mut());
    for (field, note) in &assembly.needs_review {
        eprintln!("review: {field}: {note}");
    }
    report_conversion(&result);

    let Some(record) = result.record.as_ref().filter(|_| result.is_valid) else {
        eprintln!("record is invalid; nothing written");
        return Ok(ExitCode::FAILURE);
    };
    let record_id = result.record_id();
    if args.write.dry_run {
        eprintln!("valid record {} (dry run)", record_id.unwrap_or("?"));
        return Ok(ExitCode::SUCCESS);
    }

    let render = args.write.render();
    let destination = match (&args.output, &args.output_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join(convert_output_name(&assembly, record_id))),
        (None, None) => None,
    };
    match destination {
        Some(path) => {
            write_record(&path, record, render)?;
            eprintln!("wrote {}", path.display());
        }
        None => println!(
            "{}",
            render_record(record, render.pretty, render.include_nulls)
        ),
    }
    Ok(ExitCode::SUCCESS)
}

fn report_conversion(result: &ConversionResult) {
    print_issues("warning", &result.warnings);
    print_issues("error", &result.errors);
    if let Some(id) = result.record_id() {
        info!(record_id = id, valid = result.is_valid, "conversion finished");
    }
}

fn load_record(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).with_context(|| format!("read record {}", path.display()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse record {}", path.display()))?;
    if !value.is_object() {
        return Err(anyhow!("{} does not hold a JSON object", path.display()));
    }
    Ok(value)
}

pub fn run_from_json(args: FromJsonArgs) -> Result<ExitCode> {
    let value = load_record(&args.input)?;
    let defaults = ConverterOptions::default();
    let converter = build_converter(&args.schema, defaults.record_type, defaults.record_domain)?;
    let issues = converter.check_record(&value);
    print_issues("error", &issues);
    if !issues.is_empty() {
        eprintln!(
            "{} is invalid ({} violation(s))",
            args.input.display(),
            issues.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    let validated = if converter.options().validate {
        "valid"
    } else {
        "loaded (validation skipped)"
    };
    eprintln!("{} {validated}", args.input.display());
    if let (Some(output), false) = (&args.output, args.write.dry_run) {
        let Value::Object(record) = value else {
            return Err(anyhow!("{} does not hold a JSON object", args.input.display()));
        };
        write_record(output, &record, args.write.render())?;
        eprintln!("wrote {}", output.display());
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_batch(args: BatchArgs) -> Result<ExitCode> {
    let converter = build_converter(&args.schema, args.record_type, args.record_domain)?;
    let ids = SharedIds::new(UlidGenerator::default());
    let options = BatchOptions {
        pattern: args.pattern.clone(),
        recursive: args.recursive,
        continue_on_error: args.continue_on_error,
        dry_run: args.write.dry_run,
        output_dir: args.output_dir.clone(),
        render: args.write.render(),
    };
    let report = batch::run_batch(&args.input_dir, &converter, &SystemClock, &ids, &options)?;
    print_batch_report(&report, &args.input_dir);
    if let Some(path) = &args.report {
        write_json(path, &report)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(exit_status(report.is_success()))
}

fn print_batch_report(report: &BatchReport, base: &Path) {
    for file in &report.files {
        let input = display_path(&file.input, Some(base));
        let status = match file.status {
            FileStatus::Written => "written",
            FileStatus::Valid => "valid",
            FileStatus::Invalid => "invalid",
            FileStatus::Failed => "failed",
        };
        match &file.output {
            Some(output) => eprintln!("{status}: {input} -> {}", output.display()),
            None => eprintln!("{status}: {input}"),
        }
        for error in &file.errors {
            eprintln!("  error: {error}");
        }
    }
    for skipped in &report.skipped {
        eprintln!("skipped: {}", display_path(skipped, Some(base)));
    }
    eprintln!(
        "{} file(s): {} succeeded, {} failed, {} skipped",
        report.files.len() + report.skipped.len(),
        report.succeeded(),
        report.failed(),
        report.skipped.len()
    );
}

#[derive(Debug, Serialize)]
struct ValidationEntry {
    input: PathBuf,
    valid: bool,
    errors: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

pub fn run_validate(args: ValidateArgs) -> Result<ExitCode> {
    let source = resolve_schema_source(args.schema.as_deref())?;
    let validator = SchemaValidator::from_source(&source)?;

    let entries: Vec<ValidationEntry> = args
        .inputs
        .iter()
        .map(|input| match load_record(input) {
            Ok(value) => {
                let errors = validator.validate(&value);
                ValidationEntry {
                    input: input.clone(),
                    valid: errors.is_empty(),
                    errors,
                    failure: None,
                }
            }
            Err(err) => ValidationEntry {
                input: input.clone(),
                valid: false,
                errors: Vec::new(),
                failure: Some(format!("{err:#}")),
            },
        })
        .collect();

    let success = entries.iter().all(|entry| entry.valid);
    if args.json {
        let text =
            serde_json::to_string_pretty(&entries).context("serialize validation summary")?;
        println!("{text}");
        return Ok(exit_status(success));
    }

    for entry in &entries {
        let input = entry.input.display();
        if let Some(failure) = &entry.failure {
            eprintln!("failed: {input}: {failure}");
        } else if entry.valid {
            eprintln!("valid: {input}");
        } else {
            eprintln!("invalid: {input}");
            for issue in &entry.errors {
                eprintln!("  {issue}");
            }
        }
    }
    Ok(exit_status(success))
}
