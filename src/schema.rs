//! Record schema resolution and validation.
//!
//! Validation is Draft 7 through `jsonschema` and works with any parsed
//! document. Every violation in the instance is reported with a JSON pointer
//! to the offending location.
use crate::record::{pointer_token, Issue, IssueKind};
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SCHEMA_ENV: &str = "ISAAC_SCHEMA_PATH";
pub const BUNDLED_SCHEMA: &str = include_str!("../schema/isaac_record_v1.json");
const MAX_MESSAGE_LEN: usize = 240;

/// Where the active schema document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Override(PathBuf),
    Environment(PathBuf),
    Bundled,
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Override(path) => write!(f, "{}", path.display()),
            SchemaSource::Environment(path) => write!(f, "{} (from {SCHEMA_ENV})", path.display()),
            SchemaSource::Bundled => f.write_str("bundled isaac_record_v1.json"),
        }
    }
}

/// Pick the schema source: explicit override, then `ISAAC_SCHEMA_PATH`, then
/// the bundled document.
pub fn resolve_schema_source(override_path: Option<&Path>) -> Result<SchemaSource> {
    resolve_with_env(override_path, std::env::var_os(SCHEMA_ENV))
}

fn resolve_with_env(
    override_path: Option<&Path>,
    env_value: Option<OsString>,
) -> Result<SchemaSource> {
    if let Some(path) = override_path {
        if !path.is_file() {
            return Err(anyhow!("schema file not found: {}", path.display()));
        }
        return Ok(SchemaSource::Override(path.to_path_buf()));
    }
    if let Some(raw) = env_value.filter(|raw| !raw.is_empty()) {
        let path = PathBuf::from(raw);
        if path.is_file() {
            return Ok(SchemaSource::Environment(path));
        }
        warn!(
            path = %path.display(),
            "{SCHEMA_ENV} points at a missing file; using bundled schema"
        );
    }
    Ok(SchemaSource::Bundled)
}

pub fn load_schema(source: &SchemaSource) -> Result<Value> {
    let text = match source {
        SchemaSource::Override(path) | SchemaSource::Environment(path) => {
            fs::read_to_string(path).with_context(|| format!("read schema {}", path.display()))?
        }
        SchemaSource::Bundled => BUNDLED_SCHEMA.to_string(),
    };
    let schema: Value =
        serde_json::from_str(&text).with_context(|| format!("parse schema {source}"))?;
    info!(schema = %source, "loaded record schema");
    Ok(schema)
}

/// Validate one instance against a schema document, compiling it first.
pub fn validate(record: &Value, schema: &Value) -> Result<Vec<Issue>> {
    Ok(SchemaValidator::new(schema.clone())?.validate(record))
}

/// A parsed schema compiled once for repeated validation.
pub struct SchemaValidator {
    root: Value,
    compiled: JSONSchema,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("title", &self.root.get("title"))
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(root: Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&root)
            .map_err(|err| anyhow!("invalid schema at {}: {err}", err.schema_path))?;
        Ok(Self { root, compiled })
    }

    pub fn bundled() -> Result<Self> {
        Self::new(load_schema(&SchemaSource::Bundled)?)
    }

    pub fn from_source(source: &SchemaSource) -> Result<Self> {
        Self::new(load_schema(source)?)
    }

    pub fn schema(&self) -> &Value {
        &self.root
    }

    /// Every violation in `instance`, ordered by location.
    pub fn validate(&self, instance: &Value) -> Vec<Issue> {
        let mut issues = Vec::new();
        if let Err(errors) = self.compiled.validate(instance) {
            for error in errors {
                push_violations(&error, &mut issues);
            }
        }
        issues.sort_by(|left, right| left.path.cmp(&right.path));
        issues
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.compiled.is_valid(instance)
    }
}

/// Missing and unexpected properties are reported at the property itself
/// rather than at the enclosing object.
fn push_violations(error: &ValidationError<'_>, out: &mut Vec<Issue>) {
    let path = error.instance_path.to_string();
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            out.push(violation(
                child(&path, &name),
                format!("required property {name:?} is missing"),
            ));
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for name in unexpected {
                out.push(violation(
                    child(&path, name),
                    format!("additional property {name:?} is not allowed"),
                ));
            }
        }
        _ => out.push(violation(path, error.to_string())),
    }
}

fn child(path: &str, token: &str) -> String {
    format!("{path}/{}", pointer_token(token))
}

fn violation(path: String, message: impl AsRef<str>) -> Issue {
    Issue::new(
        IssueKind::SchemaViolation,
        path,
        truncate_string(message.as_ref(), MAX_MESSAGE_LEN),
    )
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
