//! `descriptors` block: machine-extracted summary values of the curve.
use super::measurement::q_scale;
use super::{BlockKind, BlockOutput, MapperContext};
use crate::assembly::{present, ReflectivityData};
use crate::clock::{format_date, format_utc};
use crate::record::{
    DescriptorKind, DescriptorSource, Issue, DEFAULT_Q_UNIT, GENERATOR_AGENT, GENERATOR_VERSION,
};
use serde_json::{json, Value};

const KIND: BlockKind = BlockKind::Descriptors;
/// Relative Q resolution assumed when the curve carries no dQ.
const DEFAULT_RELATIVE_Q_SIGMA: f64 = 0.01;
const GEOMETRY_CONFIDENCE: f64 = 0.95;

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut warnings = Vec::new();
    let mut descriptors = Vec::new();

    if let Some(curve) = ctx.curve().filter(|curve| !curve.q.is_empty()) {
        // Unit problems are reported by the measurement block.
        let scale = q_scale(curve, &mut Vec::new());
        if let Some((min_index, max_index)) = q_extremes(&curve.q) {
            descriptors.push(q_descriptor("q_range_min", curve, min_index, scale));
            descriptors.push(q_descriptor("q_range_max", curve, max_index, scale));
        } else {
            warnings.push(Issue::warning(
                KIND.pointer("outputs/0/descriptors"),
                "no finite Q values; Q range descriptors omitted",
            ));
        }
        descriptors.push(json!({
            "name": "total_points",
            "kind": DescriptorKind::Absolute.as_str(),
            "source": DescriptorSource::Computed.as_str(),
            "value": curve.q.len(),
            "unit": "count",
            "uncertainty": {"sigma": 0, "unit": "count"},
        }));
    }

    match ctx.curve().and_then(|curve| present(&curve.measurement_geometry)) {
        Some(geometry) => descriptors.push(categorical(
            "measurement_geometry",
            geometry,
            DescriptorSource::Model,
            GEOMETRY_CONFIDENCE,
        )),
        None => warnings.push(Issue::warning(
            KIND.pointer("outputs/0/descriptors"),
            "measurement geometry could not be determined",
        )),
    }

    if let Some(probe) = ctx.reflectivity().and_then(|refl| present(&refl.probe)) {
        descriptors.push(categorical(
            "probe_type",
            probe,
            DescriptorSource::Metadata,
            1.0,
        ));
    }

    if descriptors.is_empty() {
        warnings.push(Issue::warning(
            KIND.pointer(""),
            "no descriptors could be generated",
        ));
        return BlockOutput::absent(KIND, warnings);
    }

    let now = ctx.now();
    let block = json!({
        "policy": {"requires_at_least_one": true},
        "outputs": [{
            "label": format!("automated_extraction_{}", format_date(&now)),
            "generated_utc": format_utc(&now),
            "generated_by": {"agent": GENERATOR_AGENT, "version": GENERATOR_VERSION},
            "descriptors": descriptors,
        }],
    });
    BlockOutput::present(KIND, block, warnings)
}

/// Indices of the smallest and largest finite Q.
fn q_extremes(q: &[f64]) -> Option<(usize, usize)> {
    let mut finite = q
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_finite());
    let (first, _) = finite.next()?;
    let (mut min_index, mut max_index) = (first, first);
    for (index, &value) in finite {
        if value < q[min_index] {
            min_index = index;
        }
        if value > q[max_index] {
            max_index = index;
        }
    }
    Some((min_index, max_index))
}

fn q_descriptor(name: &str, curve: &ReflectivityData, index: usize, scale: f64) -> Value {
    let value = curve.q[index] * scale;
    let sigma = curve
        .dq
        .get(index)
        .map(|dq| dq * scale)
        .filter(|dq| dq.is_finite())
        .unwrap_or_else(|| value.abs() * DEFAULT_RELATIVE_Q_SIGMA);
    json!({
        "name": name,
        "kind": DescriptorKind::Absolute.as_str(),
        "source": DescriptorSource::Computed.as_str(),
        "value": value,
        "unit": DEFAULT_Q_UNIT,
        "uncertainty": {"sigma": sigma, "unit": DEFAULT_Q_UNIT},
    })
}

fn categorical(name: &str, value: &str, source: DescriptorSource, confidence: f64) -> Value {
    json!({
        "name": name,
        "kind": DescriptorKind::Categorical.as_str(),
        "source": source.as_str(),
        "value": value,
        "uncertainty": {"confidence": confidence},
    })
}

#[cfg(test)]
#[path = "descriptors_tests.rs"]
mod tests;
