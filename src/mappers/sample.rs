//! `sample` block: material identity and layer-stack summary.
//!
//! The layer stack comes from the fitted reflectivity model; ambient and
//! substrate layers have zero thickness and are left out of composition and
//! geometry.
use super::{put_str, BlockKind, BlockOutput, MapperContext};
use crate::assembly::{present, Layer};
use crate::record::{Issue, SampleForm};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const KIND: BlockKind = BlockKind::Sample;
const MATERIAL_PROVENANCE: &str = "model_fitted";
const UNKNOWN_MATERIAL: &str = "Unknown";

/// Sample facts gathered from the sample record, or from the reflectivity
/// record when the assembler produced no sample.
struct SampleFacts<'a> {
    composition: Option<&'a str>,
    description: Option<&'a str>,
    notes: Option<&'a str>,
    form_hint: Option<&'a str>,
    layers: &'a [Layer],
}

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut warnings = Vec::new();
    let Some(facts) = gather(ctx) else {
        return BlockOutput::absent(KIND, warnings);
    };

    let mut block = Map::new();
    block.insert("sample_form".to_string(), sample_form(&facts).into());

    let mut material = Map::new();
    let named = put_str(&mut material, "name", facts.composition);
    if named {
        put_str(&mut material, "formula", facts.composition);
    } else {
        material.insert("name".to_string(), Value::from(UNKNOWN_MATERIAL));
        material.insert("formula".to_string(), Value::from(UNKNOWN_MATERIAL));
        warnings.push(Issue::warning(
            KIND.pointer("material/name"),
            "sample main_composition not found",
        ));
    }
    material.insert(
        "provenance".to_string(),
        Value::from(MATERIAL_PROVENANCE),
    );
    let noted = put_str(&mut material, "notes", facts.notes);
    if named || noted {
        block.insert("material".to_string(), Value::Object(material));
    }

    put_str(&mut block, "sample_description", facts.description);

    let stack = film_stack(facts.layers);
    if stack.total > 0.0 {
        let composition: Map<String, Value> = stack
            .by_material
            .iter()
            .map(|(material, thickness)| {
                (
                    format!("{material}_thickness_fraction"),
                    Value::from(round4(thickness / stack.total)),
                )
            })
            .collect();
        block.insert("composition".to_string(), Value::Object(composition));

        let mut geometry = Map::new();
        geometry.insert(
            "total_thickness_angstrom".to_string(),
            Value::from(stack.total),
        );
        geometry.insert("layer_count".to_string(), Value::from(stack.layer_count));
        block.insert("geometry".to_string(), Value::Object(geometry));
    }

    // A bare default form says nothing about the sample.
    if block.len() == 1 && block["sample_form"] == SampleForm::ThinFilm.as_str() {
        return BlockOutput::absent(KIND, warnings);
    }
    BlockOutput::present(KIND, block, warnings)
}

fn gather<'a>(ctx: &MapperContext<'a>) -> Option<SampleFacts<'a>> {
    if let Some(sample) = ctx.sample() {
        let description =
            present(&sample.sample_description).or_else(|| present(&sample.description));
        return Some(SampleFacts {
            composition: present(&sample.main_composition),
            description,
            notes: present(&sample.description).or_else(|| present(&sample.sample_description)),
            form_hint: present(&sample.geometry).or_else(|| present(&sample.sample_type)),
            layers: &sample.layers,
        });
    }
    let refl = ctx.reflectivity()?;
    let composition = present(&refl.sample_name);
    let description = present(&refl.sample_description);
    if composition.is_none() && description.is_none() {
        return None;
    }
    Some(SampleFacts {
        composition,
        description,
        notes: description,
        form_hint: None,
        layers: &[],
    })
}

/// Reflectometry samples are thin films unless the assembler says otherwise.
fn sample_form(facts: &SampleFacts<'_>) -> SampleForm {
    facts
        .form_hint
        .and_then(SampleForm::parse)
        .unwrap_or(SampleForm::ThinFilm)
}

struct FilmStack {
    by_material: BTreeMap<String, f64>,
    total: f64,
    layer_count: usize,
}

fn film_stack(layers: &[Layer]) -> FilmStack {
    let mut stack = FilmStack {
        by_material: BTreeMap::new(),
        total: 0.0,
        layer_count: 0,
    };
    for layer in layers {
        let thickness = thickness_angstrom(layer);
        if !(thickness.is_finite() && thickness > 0.0) {
            continue;
        }
        let material = present(&layer.material).unwrap_or("unknown");
        *stack.by_material.entry(material.to_string()).or_default() += thickness;
        stack.total += thickness;
        stack.layer_count += 1;
    }
    stack
}

fn thickness_angstrom(layer: &Layer) -> f64 {
    match present(&layer.thickness_unit).map(str::to_lowercase).as_deref() {
        Some("nm" | "nanometer" | "nanometre") => layer.thickness * 10.0,
        _ => layer.thickness,
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
