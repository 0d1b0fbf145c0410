//! Conversion orchestrator: runs every block mapper, merges the blocks into
//! one record under the required/optional policy, and validates the result.
use crate::assembly::AssemblyResult;
use crate::clock::Clock;
use crate::mappers::{map_root, BlockKind, BlockValue, MapperContext, Requirement};
use crate::record::{ConversionResult, Issue, IssueKind, RecordDomain, RecordType};
use crate::schema::{resolve_schema_source, SchemaValidator};
use crate::ulid::IdGenerator;
use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterOptions {
    pub validate: bool,
    /// Explicit schema document; falls back to `ISAAC_SCHEMA_PATH`, then the
    /// bundled schema.
    pub schema_path: Option<PathBuf>,
    pub record_type: RecordType,
    pub record_domain: RecordDomain,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            validate: true,
            schema_path: None,
            record_type: RecordType::Evidence,
            record_domain: RecordDomain::Characterization,
        }
    }
}

#[derive(Debug)]
pub struct Converter {
    options: ConverterOptions,
    validator: Option<SchemaValidator>,
}

impl Converter {
    /// Resolves and compiles the schema once, so one converter can serve a
    /// whole batch.
    pub fn new(options: ConverterOptions) -> Result<Self> {
        let validator = if options.validate {
            let source = resolve_schema_source(options.schema_path.as_deref())?;
            Some(SchemaValidator::from_source(&source)?)
        } else {
            None
        };
        Ok(Self { options, validator })
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    pub fn convert(
        &self,
        assembly: &AssemblyResult,
        clock: &dyn Clock,
        ids: &mut dyn IdGenerator,
    ) -> ConversionResult {
        let ctx = MapperContext::new(
            assembly,
            clock,
            ids,
            self.options.record_type,
            self.options.record_domain,
        );
        let mut record = map_root(&ctx);
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for kind in BlockKind::ORDER {
            let output = kind.map(&ctx);
            warnings.extend(output.warnings);
            let requirement = kind.requirement(self.options.record_type);
            match (output.value, requirement) {
                (BlockValue::Present(value), _) => {
                    record.insert(kind.key().to_string(), value);
                }
                (BlockValue::Absent, Requirement::Optional) => {
                    debug!(block = kind.key(), "block absent");
                }
                (BlockValue::Absent, Requirement::Required) => {
                    errors.push(Issue::new(
                        IssueKind::MissingRequiredBlock,
                        kind.pointer(""),
                        format!("required block {} could not be populated", kind.key()),
                    ));
                }
                (BlockValue::Fatal(message), Requirement::Required) => {
                    info!(block = kind.key(), "required block failed: {message}");
                    return ConversionResult {
                        record: None,
                        is_valid: false,
                        errors: vec![Issue::new(
                            IssueKind::MapperFatal,
                            kind.pointer(""),
                            message,
                        )],
                        warnings,
                    };
                }
                (BlockValue::Fatal(message), Requirement::Optional) => {
                    warnings.push(Issue::warning(
                        kind.pointer(""),
                        format!("{message}; block omitted"),
                    ));
                }
            }
        }

        if let Some(validator) = &self.validator {
            errors.extend(validator.validate(&Value::Object(record.clone())));
        }

        ConversionResult {
            is_valid: errors.is_empty(),
            record: Some(record),
            errors,
            warnings,
        }
    }

    /// Schema violations of an existing record. Empty when validation is off.
    pub fn check_record(&self, record: &Value) -> Vec<Issue> {
        self.validator
            .as_ref()
            .map(|validator| validator.validate(record))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
