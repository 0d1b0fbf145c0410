//! Input model: the upstream assembler's unified view of one measurement run.
//!
//! The converter only reads these structures. Every field the upstream tool
//! may leave out is optional so a sparse or partial assembly still
//! deserializes; mappers decide what a missing field means.
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    #[serde(default)]
    pub reflectivity: Option<ReflectivityRecord>,
    #[serde(default)]
    pub sample: Option<SampleRecord>,
    #[serde(default)]
    pub environment: Option<EnvironmentRecord>,
    /// Validation warnings raised by the assembler.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Validation errors raised by the assembler.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub needs_review: BTreeMap<String, String>,
    #[serde(default)]
    pub reduced_file: Option<String>,
    #[serde(default)]
    pub model_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectivityRecord {
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub facility: Option<String>,
    pub laboratory: Option<String>,
    pub instrument_name: Option<String>,
    pub run_number: Option<String>,
    pub run_title: Option<String>,
    pub run_start: Option<String>,
    pub run_end: Option<String>,
    pub probe: Option<String>,
    pub technique: Option<String>,
    pub technique_description: Option<String>,
    pub ipts_number: Option<String>,
    pub proposal_id: Option<String>,
    pub experiment_identifier: Option<String>,
    pub experiment_title: Option<String>,
    pub sample_name: Option<String>,
    pub sample_description: Option<String>,
    pub raw_file_path: Option<String>,
    pub reduced_file: Option<String>,
    pub is_simulated: bool,
    pub simulation_tool: Option<String>,
    pub parent_record_id: Option<String>,
    pub related_runs: Vec<String>,
    pub calibration_of: Option<String>,
    pub collection_id: Option<String>,
    pub doi: Option<String>,
    pub reflectivity: Option<ReflectivityData>,
}

/// Reduced reflectivity curve. `q`, `r`, `dr`, `dq` and `configuration`
/// are parallel arrays indexed by data point. A `null` point reads as NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectivityData {
    #[serde(deserialize_with = "nullable_points")]
    pub q: Vec<f64>,
    #[serde(deserialize_with = "nullable_points")]
    pub r: Vec<f64>,
    #[serde(deserialize_with = "nullable_points")]
    pub dr: Vec<f64>,
    #[serde(deserialize_with = "nullable_points")]
    pub dq: Vec<f64>,
    pub q_unit: Option<String>,
    pub measurement_geometry: Option<String>,
    pub reduction_version: Option<String>,
    pub reduction_time: Option<String>,
    pub source_file: Option<String>,
    /// Instrument configuration label per point, for stitched multi-angle runs.
    pub configuration: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRecord {
    pub id: Option<String>,
    pub description: Option<String>,
    pub sample_name: Option<String>,
    pub sample_description: Option<String>,
    pub main_composition: Option<String>,
    pub sample_type: Option<String>,
    pub geometry: Option<String>,
    pub layers: Vec<Layer>,
    pub sample_file: Option<String>,
    pub sample_record_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer {
    pub layer_number: Option<u32>,
    pub material: Option<String>,
    pub thickness: f64,
    pub thickness_unit: Option<String>,
    pub sld: Option<f64>,
    pub roughness: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentRecord {
    pub id: Option<String>,
    pub description: Option<String>,
    pub ambient_medium: Option<String>,
    pub temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    pub pressure: Option<f64>,
    pub pressure_unit: Option<String>,
    pub humidity: Option<f64>,
    pub magnetic_field_tesla: Option<f64>,
    pub electric_field_v_per_m: Option<f64>,
    pub ph: Option<f64>,
    pub environment_file: Option<String>,
}

fn nullable_points<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let points: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(points
        .unwrap_or_default()
        .into_iter()
        .map(|point| point.unwrap_or(f64::NAN))
        .collect())
}

/// Load an assembly serialized as JSON.
pub fn load_assembly(path: &Path) -> Result<AssemblyResult> {
    let bytes = fs::read(path).with_context(|| format!("read assembly {}", path.display()))?;
    parse_assembly(&bytes).with_context(|| format!("parse assembly {}", path.display()))
}

pub fn parse_assembly(bytes: &[u8]) -> Result<AssemblyResult> {
    let result: AssemblyResult =
        serde_json::from_slice(bytes).context("parse assembly JSON")?;
    Ok(result)
}

/// Treat empty and whitespace-only strings the same as a missing field.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{Converter, ConverterOptions};
    use crate::fixtures::{fixed_clock, FIXED_ID};
    use crate::ulid::FixedIdGenerator;

    const NULL_POINT: &str = r#"{
        "reflectivity": {
            "run_number": "9",
            "reflectivity": {
                "q": [0.01, 0.02, 0.03],
                "r": [0.9, null, 0.7],
                "dr": null,
                "dq": [0.001, 0.001, null]
            }
        }
    }"#;

    #[test]
    fn null_points_read_as_nan() {
        let assembly = parse_assembly(NULL_POINT.as_bytes()).expect("assembly parses");
        let curve = assembly
            .reflectivity
            .and_then(|refl| refl.reflectivity)
            .expect("curve");
        assert_eq!(curve.q, [0.01, 0.02, 0.03]);
        assert_eq!(curve.r.len(), 3);
        assert!(curve.r[1].is_nan());
        assert_eq!(curve.r[2], 0.7);
        assert!(curve.dr.is_empty());
        assert!(curve.dq[2].is_nan());
    }

    #[test]
    fn null_points_convert_with_a_warning() {
        let assembly = parse_assembly(NULL_POINT.as_bytes()).expect("assembly parses");
        let converter = Converter::new(ConverterOptions {
            validate: false,
            ..ConverterOptions::default()
        })
        .expect("converter");
        let mut ids = FixedIdGenerator(FIXED_ID.to_string());
        let result = converter.convert(&assembly, &fixed_clock(), &mut ids);
        assert!(result.record.is_some());
        assert!(result
            .warnings
            .iter()
            .any(|warning| warning.message == "1 non-finite R value(s) emitted as null"));
    }

    #[test]
    fn malformed_points_are_still_rejected() {
        let text = r#"{"reflectivity": {"reflectivity": {"r": [0.9, "high"]}}}"#;
        assert!(parse_assembly(text.as_bytes()).is_err());
    }
}
