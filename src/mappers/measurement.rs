//! `measurement` block: the reduced reflectivity curve as series/channels.
//!
//! Q is the independent variable; R is the primary signal and dR/dQ are
//! quality monitors. All arrays of one curve are parallel, so a length
//! mismatch means the curve cannot be trusted and the block is fatal.
use super::{put_str, BlockKind, BlockOutput, MapperContext};
use crate::assembly::{present, ReflectivityData};
use crate::record::{ChannelRole, Issue, QcStatus, DEFAULT_Q_UNIT, DEFAULT_R_UNIT};
use serde_json::{json, Map, Value};

const KIND: BlockKind = BlockKind::Measurement;
const SINGLE_SERIES_ID: &str = "reflectivity_profile";
const QC_QUOTED_MESSAGES: usize = 3;

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut warnings = Vec::new();
    let Some(refl) = ctx.reflectivity() else {
        warnings.push(Issue::warning(
            KIND.pointer(""),
            "no reflectivity record for measurement mapping",
        ));
        return BlockOutput::absent(KIND, warnings);
    };
    let Some(curve) = refl.reflectivity.as_ref() else {
        warnings.push(Issue::warning(
            KIND.pointer(""),
            "reflectivity record has no curve data",
        ));
        return BlockOutput::absent(KIND, warnings);
    };
    if curve.q.is_empty() || curve.r.is_empty() {
        warnings.push(Issue::warning(
            KIND.pointer("series"),
            "missing q or r arrays in reflectivity data",
        ));
        return BlockOutput::absent(KIND, warnings);
    }
    if let Err(message) = check_parallel_lengths(curve) {
        return BlockOutput::fatal(KIND, message, warnings);
    }

    let scale = q_scale(curve, &mut warnings);
    let mut non_finite = NonFinite::default();
    let series: Vec<Value> = group_points(curve)
        .into_iter()
        .enumerate()
        .map(|(index, group)| {
            build_series(curve, &group, index, scale, &mut non_finite)
        })
        .collect();
    non_finite.report(&mut warnings);

    let mut block = Map::new();
    block.insert(
        "processing".to_string(),
        Value::Object(build_processing(curve, ctx.is_simulated())),
    );
    block.insert("series".to_string(), Value::Array(series));
    block.insert("qc".to_string(), build_qc(ctx));
    BlockOutput::present(KIND, block, warnings)
}

/// Every non-empty companion array must match Q point for point.
fn check_parallel_lengths(curve: &ReflectivityData) -> Result<(), String> {
    let expected = curve.q.len();
    let companions = [
        ("R", curve.r.len()),
        ("dR", curve.dr.len()),
        ("dQ", curve.dq.len()),
        ("configuration", curve.configuration.len()),
    ];
    for (name, len) in companions {
        let optional = name != "R";
        if optional && len == 0 {
            continue;
        }
        if len != expected {
            return Err(format!(
                "{name} has {len} points but Q has {expected}; parallel arrays must match"
            ));
        }
    }
    Ok(())
}

/// Multiplier that converts the source Q unit to Å⁻¹.
pub(super) fn q_scale(curve: &ReflectivityData, warnings: &mut Vec<Issue>) -> f64 {
    let Some(unit) = present(&curve.q_unit) else {
        return 1.0;
    };
    let normalized: String = unit
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    match normalized.as_str() {
        "1/angstrom" | "1/a" | "1/å" | "å⁻¹" | "a^-1" | "å^-1" | "angstrom^-1"
        | "1/angstroms" | "inv_angstrom" => 1.0,
        "1/nm" | "nm^-1" | "nm⁻¹" | "inv_nm" => 0.1,
        _ => {
            warnings.push(Issue::warning(
                KIND.pointer("series"),
                format!("unrecognized q_unit {unit:?}; values assumed to be in {DEFAULT_Q_UNIT}"),
            ));
            1.0
        }
    }
}

struct PointGroup<'a> {
    label: Option<&'a str>,
    indices: Vec<usize>,
}

/// One group per distinct configuration label, in order of first appearance.
fn group_points(curve: &ReflectivityData) -> Vec<PointGroup<'_>> {
    if curve.configuration.is_empty() {
        return vec![PointGroup {
            label: None,
            indices: (0..curve.q.len()).collect(),
        }];
    }
    let mut groups: Vec<PointGroup<'_>> = Vec::new();
    for (index, label) in curve.configuration.iter().enumerate() {
        let label = label.trim();
        match groups.iter_mut().find(|group| group.label == Some(label)) {
            Some(group) => group.indices.push(index),
            None => groups.push(PointGroup {
                label: Some(label),
                indices: vec![index],
            }),
        }
    }
    groups
}

#[derive(Default)]
struct NonFinite {
    counts: [(usize, &'static str); 4],
}

impl NonFinite {
    fn bump(&mut self, slot: usize, name: &'static str) {
        self.counts[slot].0 += 1;
        self.counts[slot].1 = name;
    }

    fn report(&self, warnings: &mut Vec<Issue>) {
        for (count, name) in self.counts {
            if count > 0 {
                warnings.push(Issue::warning(
                    KIND.pointer("series"),
                    format!("{count} non-finite {name} value(s) emitted as null"),
                ));
            }
        }
    }
}

fn values(
    source: &[f64],
    indices: &[usize],
    scale: f64,
    slot: (usize, &'static str),
    non_finite: &mut NonFinite,
) -> Value {
    Value::Array(
        indices
            .iter()
            .map(|&index| {
                let value = source[index] * scale;
                if value.is_finite() {
                    Value::from(value)
                } else {
                    non_finite.bump(slot.0, slot.1);
                    Value::Null
                }
            })
            .collect(),
    )
}

fn build_series(
    curve: &ReflectivityData,
    group: &PointGroup<'_>,
    index: usize,
    scale: f64,
    non_finite: &mut NonFinite,
) -> Value {
    let mut series = Map::new();
    let series_id = match group.label {
        Some(_) => format!("{SINGLE_SERIES_ID}_{}", index + 1),
        None => SINGLE_SERIES_ID.to_string(),
    };
    series.insert("series_id".to_string(), Value::from(series_id));
    if let Some(label) = group.label {
        series.insert("configuration".to_string(), Value::from(label));
    }
    series.insert(
        "independent_variables".to_string(),
        json!([{
            "name": "q",
            "unit": DEFAULT_Q_UNIT,
            "values": values(&curve.q, &group.indices, scale, (0, "Q"), non_finite),
        }]),
    );

    let mut channels = vec![channel(
        "R",
        DEFAULT_R_UNIT,
        ChannelRole::PrimarySignal,
        values(&curve.r, &group.indices, 1.0, (1, "R"), non_finite),
    )];
    if !curve.dr.is_empty() {
        channels.push(channel(
            "dR",
            DEFAULT_R_UNIT,
            ChannelRole::QualityMonitor,
            values(&curve.dr, &group.indices, 1.0, (2, "dR"), non_finite),
        ));
    }
    if !curve.dq.is_empty() {
        channels.push(channel(
            "dQ",
            DEFAULT_Q_UNIT,
            ChannelRole::QualityMonitor,
            values(&curve.dq, &group.indices, scale, (3, "dQ"), non_finite),
        ));
    }
    series.insert("channels".to_string(), Value::Array(channels));
    Value::Object(series)
}

fn channel(name: &str, unit: &str, role: ChannelRole, values: Value) -> Value {
    json!({
        "name": name,
        "unit": unit,
        "role": role.as_str(),
        "values": values,
    })
}

fn build_processing(curve: &ReflectivityData, simulated: bool) -> Map<String, Value> {
    let mut processing = Map::new();
    let kind = if simulated {
        "simulated_reflectivity"
    } else {
        "reduced_reflectivity"
    };
    processing.insert("type".to_string(), Value::from(kind));
    put_str(
        &mut processing,
        "software_version",
        present(&curve.reduction_version),
    );
    put_str(
        &mut processing,
        "geometry",
        present(&curve.measurement_geometry),
    );
    processing
}

/// QC status follows the assembler's own validation: any error makes the
/// data invalid, any warning makes it suspect.
fn build_qc(ctx: &MapperContext<'_>) -> Value {
    let errors = ctx.upstream_errors();
    let warnings = ctx.upstream_warnings();
    let (status, evidence) = if !errors.is_empty() {
        (
            QcStatus::Invalid,
            format!("Assembly errors: {}", quote(errors)),
        )
    } else if !warnings.is_empty() {
        (
            QcStatus::Warning,
            format!("Assembly warnings: {}", quote(warnings)),
        )
    } else {
        (
            QcStatus::Valid,
            "Data passed assembly validation.".to_string(),
        )
    };
    json!({ "status": status.as_str(), "evidence": evidence })
}

fn quote(messages: &[String]) -> String {
    messages
        .iter()
        .take(QC_QUOTED_MESSAGES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "measurement_tests.rs"]
mod tests;
