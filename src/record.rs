//! ISAAC record vocabulary, diagnostics, and the conversion result.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Record format version this crate produces.
pub const ISAAC_RECORD_VERSION: &str = "1.0";
pub const GENERATOR_AGENT: &str = "nr-isaac-format";
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ENDSTATION: &str = "reflectometer";
pub const DEFAULT_Q_UNIT: &str = "Å⁻¹";
pub const DEFAULT_R_UNIT: &str = "dimensionless";

pub type Record = Map<String, Value>;

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(text: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|item| item.as_str() == text)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for Value {
            fn from(item: $name) -> Value {
                Value::String(item.as_str().to_string())
            }
        }
    };
}

vocabulary!(RecordType {
    Evidence => "evidence",
    Interpretation => "interpretation",
    Protocol => "protocol",
    Annotation => "annotation",
});

vocabulary!(RecordDomain {
    Characterization => "characterization",
    Synthesis => "synthesis",
    Simulation => "simulation",
    Theory => "theory",
});

vocabulary!(SourceType {
    Facility => "facility",
    Laboratory => "laboratory",
    Computation => "computation",
    Literature => "literature",
    Database => "database",
});

vocabulary!(ContentRole {
    RawDataPointer => "raw_data_pointer",
    ReductionProduct => "reduction_product",
    ProcessingRecipe => "processing_recipe",
    InputStructure => "input_structure",
    MetadataSnapshot => "metadata_snapshot",
    SupplementaryImage => "supplementary_image",
    Other => "other",
});

vocabulary!(ChannelRole {
    PrimarySignal => "primary_signal",
    MeasuredResponse => "measured_response",
    SimulatedObservable => "simulated_observable",
    DerivedSignal => "derived_signal",
    AuxiliarySignal => "auxiliary_signal",
    ControlReadback => "control_readback",
    QualityMonitor => "quality_monitor",
});

vocabulary!(
    /// Measurement QC classification derived from upstream validation messages.
    QcStatus {
        Valid => "valid",
        Warning => "warning",
        Invalid => "invalid",
    }
);

vocabulary!(DescriptorKind {
    Absolute => "absolute",
    Categorical => "categorical",
});

vocabulary!(DescriptorSource {
    Computed => "computed",
    Model => "model",
    Metadata => "metadata",
});

vocabulary!(SampleForm {
    ThinFilm => "thin_film",
    Bulk => "bulk",
    Powder => "powder",
    Solution => "solution",
    Gas => "gas",
});

vocabulary!(SystemDomain {
    Experimental => "experimental",
    Computational => "computational",
});

vocabulary!(InstrumentType {
    BeamlineEndstation => "beamline_endstation",
    LabInstrument => "lab_instrument",
    SimulationSoftware => "simulation_software",
});

vocabulary!(LinkType {
    DerivedFrom => "derived_from",
    CalibrationOf => "calibration_of",
    PartOf => "part_of",
    RelatedTo => "related_to",
    Supersedes => "supersedes",
    Cites => "cites",
    References => "references",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A required block could not be populated; the record is withheld.
    MapperFatal,
    /// A required block came back empty.
    MissingRequiredBlock,
    /// An optional field or block was degraded or omitted.
    MapperWarning,
    /// The merged record does not match the schema.
    SchemaViolation,
    /// A referenced file could not be read for hashing.
    AssetAccess,
}

/// One diagnostic, anchored at a JSON pointer into the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::MapperWarning, path, message)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of converting one assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub record: Option<Record>,
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ConversionResult {
    pub fn record_id(&self) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(|record| record.get("record_id"))
            .and_then(Value::as_str)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Serialize the record; `None` when the record was withheld.
    pub fn to_json(&self, pretty: bool, include_nulls: bool) -> Option<String> {
        self.record
            .as_ref()
            .map(|record| render_record(record, pretty, include_nulls))
    }
}

pub fn render_record(record: &Record, pretty: bool, include_nulls: bool) -> String {
    let value = if include_nulls {
        Value::Object(record.clone())
    } else {
        strip_nulls(&Value::Object(record.clone()))
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    // Serializing a `Value` tree cannot fail.
    rendered.unwrap_or_default()
}

/// Drop `null` members from objects, recursively. Array elements are kept so
/// parallel arrays stay aligned.
pub fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, item)| !item.is_null())
                .map(|(key, item)| (key.clone(), strip_nulls(item)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

/// Escape one JSON-pointer reference token.
pub fn pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
