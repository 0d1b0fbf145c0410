//! CLI argument parsing for the record converter.
//!
//! The CLI only gathers options; conversion policy lives in the library so
//! the same pipeline serves scripted and interactive use.
use crate::batch::DEFAULT_PATTERN;
use crate::output::RenderOptions;
use crate::record::{RecordDomain, RecordType};
use crate::ulid::is_valid_ulid;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "nr-isaac",
    version,
    about = "Convert assembled neutron reflectometry results into ISAAC records",
    after_help = "Examples:\n  nr-isaac convert assembly.json --output-dir records/\n  nr-isaac convert assembly.json --dry-run --compact\n  nr-isaac batch assemblies/ --output-dir records/ --continue-on-error\n  nr-isaac from-json record.json --output normalized.json\n  nr-isaac validate records/*.json --schema isaac_record_v1.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log conversion progress to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert one assembly JSON file into an ISAAC record
    Convert(ConvertArgs),
    /// Re-validate an ISAAC record JSON and optionally re-emit it
    FromJson(FromJsonArgs),
    /// Convert a directory of assembly JSON files
    Batch(BatchArgs),
    /// Validate ISAAC record JSON files against the schema
    Validate(ValidateArgs),
}

/// Schema options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Validate records against the schema (default)
    #[arg(long = "validate", overrides_with = "no_validate")]
    pub validate: bool,

    /// Skip schema validation
    #[arg(long = "no-validate", overrides_with = "validate")]
    pub no_validate: bool,

    /// Schema document; defaults to ISAAC_SCHEMA_PATH, then the bundled schema
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,
}

impl SchemaArgs {
    pub fn enabled(&self) -> bool {
        !self.no_validate
    }
}

/// Output layout options for commands that write records.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Indented JSON (default)
    #[arg(long, overrides_with = "compact")]
    pub pretty: bool,

    /// Single-line JSON
    #[arg(long, overrides_with = "pretty")]
    pub compact: bool,

    /// Keep null-valued fields instead of stripping them
    #[arg(long)]
    pub include_nulls: bool,

    /// Convert and report without writing records
    #[arg(long)]
    pub dry_run: bool,
}

impl WriteArgs {
    pub fn render(&self) -> RenderOptions {
        RenderOptions {
            pretty: !self.compact,
            include_nulls: self.include_nulls,
        }
    }
}

/// Convert one serialized assembly.
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Assembly JSON produced by the upstream assembler
    #[arg(value_name = "ASSEMBLY")]
    pub input: PathBuf,

    /// Output file for the record
    #[arg(long, short, value_name = "PATH", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for the record, named isaac_record_<run>.json
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Use this identifier instead of generating one
    #[arg(long, value_name = "ULID", value_parser = parse_record_id)]
    pub record_id: Option<String>,

    #[arg(long, value_name = "TYPE", default_value = "evidence", value_parser = parse_record_type)]
    pub record_type: RecordType,

    #[arg(long, value_name = "DOMAIN", default_value = "characterization", value_parser = parse_record_domain)]
    pub record_domain: RecordDomain,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(flatten)]
    pub write: WriteArgs,
}

/// Re-validate an existing record.
#[derive(Parser, Debug)]
pub struct FromJsonArgs {
    /// Existing ISAAC record
    #[arg(value_name = "RECORD")]
    pub input: PathBuf,

    /// Write the normalized record here when it is valid
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(flatten)]
    pub write: WriteArgs,
}

/// Convert every matching assembly in a directory.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Directory containing assembly JSON files
    #[arg(value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Directory for records (defaults to the input directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Glob selecting input files
    #[arg(long, value_name = "GLOB", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Descend into subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Keep going after a failed file and convert files in parallel
    #[arg(long)]
    pub continue_on_error: bool,

    /// Write the per-file report as JSON
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    #[arg(long, value_name = "TYPE", default_value = "evidence", value_parser = parse_record_type)]
    pub record_type: RecordType,

    #[arg(long, value_name = "DOMAIN", default_value = "characterization", value_parser = parse_record_domain)]
    pub record_domain: RecordDomain,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(flatten)]
    pub write: WriteArgs,
}

/// Validate records without converting anything.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Records to check
    #[arg(value_name = "RECORD", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Schema document; defaults to ISAAC_SCHEMA_PATH, then the bundled schema
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Emit a machine-readable JSON summary
    #[arg(long)]
    pub json: bool,
}

fn parse_record_id(raw: &str) -> Result<String, String> {
    if is_valid_ulid(raw) {
        Ok(raw.to_string())
    } else {
        Err(format!("{raw:?} is not a 26-character ULID"))
    }
}

fn parse_record_type(raw: &str) -> Result<RecordType, String> {
    RecordType::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = RecordType::ALL.iter().map(|item| item.as_str()).collect();
        format!("expected one of {}", allowed.join(", "))
    })
}

fn parse_record_domain(raw: &str) -> Result<RecordDomain, String> {
    RecordDomain::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = RecordDomain::ALL.iter().map(|item| item.as_str()).collect();
        format!("expected one of {}", allowed.join(", "))
    })
}
