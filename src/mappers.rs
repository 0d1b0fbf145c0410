//! Block mappers: one transformation per top-level record block.
//!
//! The block set is fixed by the record schema version, so mappers are a
//! closed enumeration ([`BlockKind`]) rather than trait objects. Each mapper
//! reads a [`MapperContext`] and returns a [`BlockOutput`]: the block (or an
//! explicit absence, or a fatal condition) plus the warnings it raised. Mappers
//! never see each other's output and never mutate the context.
use crate::assembly::{
    AssemblyResult, EnvironmentRecord, ReflectivityData, ReflectivityRecord, SampleRecord,
};
use crate::clock::Clock;
use crate::record::{Issue, RecordDomain, RecordType};
use crate::ulid::IdGenerator;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

mod acquisition;
mod assets;
mod context;
mod descriptors;
mod links;
mod measurement;
mod root;
mod sample;
mod system;
mod timestamps;

pub use root::map_root;

/// Read-only view over one assembly for the duration of a conversion.
///
/// The clock and identifier generator are sampled once at construction so
/// every block sees the same creation instant and record identifier.
#[derive(Debug, Clone)]
pub struct MapperContext<'a> {
    result: &'a AssemblyResult,
    now: DateTime<Utc>,
    record_id: String,
    record_type: RecordType,
    record_domain: RecordDomain,
}

impl<'a> MapperContext<'a> {
    pub fn new(
        result: &'a AssemblyResult,
        clock: &dyn Clock,
        ids: &mut dyn IdGenerator,
        record_type: RecordType,
        record_domain: RecordDomain,
    ) -> Self {
        Self {
            result,
            now: clock.now(),
            record_id: ids.next_id(),
            record_type,
            record_domain,
        }
    }

    pub fn result(&self) -> &'a AssemblyResult {
        self.result
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn record_domain(&self) -> RecordDomain {
        self.record_domain
    }

    pub fn reflectivity(&self) -> Option<&'a ReflectivityRecord> {
        self.result.reflectivity.as_ref()
    }

    /// The nested Q/R curve, missing when either level is absent.
    pub fn curve(&self) -> Option<&'a ReflectivityData> {
        self.reflectivity()
            .and_then(|refl| refl.reflectivity.as_ref())
    }

    pub fn sample(&self) -> Option<&'a SampleRecord> {
        self.result.sample.as_ref()
    }

    pub fn environment(&self) -> Option<&'a EnvironmentRecord> {
        self.result.environment.as_ref()
    }

    pub fn is_simulated(&self) -> bool {
        self.reflectivity().is_some_and(|refl| refl.is_simulated)
    }

    pub fn upstream_warnings(&self) -> &'a [String] {
        &self.result.warnings
    }

    pub fn upstream_errors(&self) -> &'a [String] {
        &self.result.errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// Every block a record can carry, in mapping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Timestamps,
    AcquisitionSource,
    Measurement,
    Descriptors,
    Sample,
    System,
    Context,
    Assets,
    Links,
}

impl BlockKind {
    /// Mapping order. Blocks write disjoint keys, so order only fixes the
    /// order in which warnings are reported.
    pub const ORDER: [BlockKind; 9] = [
        BlockKind::Timestamps,
        BlockKind::AcquisitionSource,
        BlockKind::Measurement,
        BlockKind::Descriptors,
        BlockKind::Sample,
        BlockKind::System,
        BlockKind::Context,
        BlockKind::Assets,
        BlockKind::Links,
    ];

    /// Top-level record key the block is stored under.
    pub fn key(self) -> &'static str {
        match self {
            BlockKind::Timestamps => "timestamps",
            BlockKind::AcquisitionSource => "acquisition_source",
            BlockKind::Measurement => "measurement",
            BlockKind::Descriptors => "descriptors",
            BlockKind::Sample => "sample",
            BlockKind::System => "system",
            BlockKind::Context => "context",
            BlockKind::Assets => "assets",
            BlockKind::Links => "links",
        }
    }

    pub fn requirement(self, record_type: RecordType) -> Requirement {
        match self {
            BlockKind::Timestamps | BlockKind::AcquisitionSource => Requirement::Required,
            BlockKind::Measurement | BlockKind::Descriptors
                if record_type == RecordType::Evidence =>
            {
                Requirement::Required
            }
            _ => Requirement::Optional,
        }
    }

    pub fn map(self, ctx: &MapperContext<'_>) -> BlockOutput {
        match self {
            BlockKind::Timestamps => timestamps::map(ctx),
            BlockKind::AcquisitionSource => acquisition::map(ctx),
            BlockKind::Measurement => measurement::map(ctx),
            BlockKind::Descriptors => descriptors::map(ctx),
            BlockKind::Sample => sample::map(ctx),
            BlockKind::System => system::map(ctx),
            BlockKind::Context => context::map(ctx),
            BlockKind::Assets => assets::map(ctx),
            BlockKind::Links => links::map(ctx),
        }
    }

    /// JSON pointer to a field inside this block.
    pub fn pointer(self, field: &str) -> String {
        if field.is_empty() {
            format!("/{}", self.key())
        } else {
            format!("/{}/{}", self.key(), field)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    Present(Value),
    /// Nothing meaningful to emit; the key is left out of the record.
    Absent,
    /// Mandatory content could not be produced.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutput {
    pub kind: BlockKind,
    pub value: BlockValue,
    pub warnings: Vec<Issue>,
}

impl BlockOutput {
    pub fn present(kind: BlockKind, value: impl Into<Value>, warnings: Vec<Issue>) -> Self {
        Self {
            kind,
            value: BlockValue::Present(value.into()),
            warnings,
        }
    }

    pub fn absent(kind: BlockKind, warnings: Vec<Issue>) -> Self {
        Self {
            kind,
            value: BlockValue::Absent,
            warnings,
        }
    }

    pub fn fatal(kind: BlockKind, message: impl Into<String>, warnings: Vec<Issue>) -> Self {
        Self {
            kind,
            value: BlockValue::Fatal(message.into()),
            warnings,
        }
    }

    pub fn block(&self) -> Option<&Value> {
        match &self.value {
            BlockValue::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Insert a trimmed, non-empty string field.
pub(crate) fn put_str(map: &mut Map<String, Value>, key: &str, value: Option<&str>) -> bool {
    match value.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => {
            map.insert(key.to_string(), Value::String(text.to_string()));
            true
        }
        None => false,
    }
}

/// Insert a finite number; NaN and infinities are not representable in JSON.
pub(crate) fn put_f64(map: &mut Map<String, Value>, key: &str, value: Option<f64>) -> bool {
    match value.filter(|number| number.is_finite()) {
        Some(number) => {
            map.insert(key.to_string(), Value::from(number));
            true
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "mappers_tests.rs"]
mod tests;
