//! Conversion of assembled neutron reflectometry results into ISAAC AI-Ready
//! records.
pub mod assembly;
pub mod batch;
pub mod cli;
pub mod clock;
pub mod converter;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod mappers;
pub mod output;
pub mod record;
pub mod schema;
pub mod ulid;
pub mod util;
pub mod workflow;

pub use assembly::{load_assembly, AssemblyResult};
pub use converter::{Converter, ConverterOptions};
pub use record::{ConversionResult, Issue, IssueKind, Record, RecordDomain, RecordType};
pub use schema::SchemaValidator;
