//! `context` block: experimental conditions.
//!
//! The block is only meaningful with both an environment label and a
//! temperature in kelvin; without either it is left out entirely.
use super::{put_f64, put_str, BlockKind, BlockOutput, MapperContext};
use crate::assembly::{present, EnvironmentRecord};
use crate::record::Issue;
use serde_json::{Map, Value};

const KIND: BlockKind = BlockKind::Context;
const CELSIUS_OFFSET: f64 = 273.15;

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut warnings = Vec::new();
    let Some(env) = ctx.environment() else {
        return BlockOutput::absent(KIND, warnings);
    };

    let label = present(&env.ambient_medium).or_else(|| present(&env.description));
    let temperature = temperature_kelvin(env, &mut warnings);
    let (Some(label), Some(temperature)) = (label, temperature) else {
        let missing = match (label, temperature) {
            (None, None) => "environment and temperature_K",
            (None, Some(_)) => "environment",
            _ => "temperature_K",
        };
        warnings.push(Issue::warning(
            KIND.pointer(""),
            format!("environment record lacks {missing}; context omitted"),
        ));
        return BlockOutput::absent(KIND, warnings);
    };

    let mut block = Map::new();
    block.insert("environment".to_string(), Value::from(label));
    block.insert("temperature_K".to_string(), Value::from(temperature));

    if let Some(refl) = ctx.reflectivity() {
        put_str(
            &mut block,
            "experiment_id",
            present(&refl.experiment_identifier)
                .or_else(|| present(&refl.proposal_id))
                .or_else(|| present(&refl.ipts_number)),
        );
        let title = present(&refl.experiment_title)
            .map(str::to_string)
            .or_else(|| present(&refl.sample_name).map(|name| format!("Measurement of {name}")));
        put_str(&mut block, "experiment_title", title.as_deref());
    }

    let notes = notes(ctx, env);
    if !notes.is_empty() {
        block.insert("notes".to_string(), Value::from(notes.join("; ")));
    }

    put_f64(&mut block, "pressure_Pa", pressure_pascal(env, &mut warnings));
    put_f64(&mut block, "humidity_percent", env.humidity);
    put_f64(&mut block, "magnetic_field_T", env.magnetic_field_tesla);
    put_f64(
        &mut block,
        "electric_field_V_per_m",
        env.electric_field_v_per_m,
    );
    put_f64(&mut block, "pH", env.ph);

    BlockOutput::present(KIND, block, warnings)
}

fn notes(ctx: &MapperContext<'_>, env: &EnvironmentRecord) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(refl) = ctx.reflectivity() {
        if let Some(sample) = present(&refl.sample_description) {
            notes.push(format!("Sample: {sample}"));
        }
        if let Some(technique) = present(&refl.technique_description) {
            notes.push(format!("Technique: {technique}"));
        }
    }
    if let Some(description) = present(&env.description) {
        notes.push(format!("Environment: {description}"));
    }
    notes
}

fn temperature_kelvin(env: &EnvironmentRecord, warnings: &mut Vec<Issue>) -> Option<f64> {
    let value = env.temperature.filter(|value| value.is_finite())?;
    let unit = present(&env.temperature_unit).map(|unit| unit.trim_start_matches('°').to_lowercase());
    let kelvin = match unit.as_deref() {
        None | Some("k" | "kelvin") => value,
        Some("c" | "celsius" | "degc") => value + CELSIUS_OFFSET,
        Some("f" | "fahrenheit" | "degf") => (value - 32.0) * 5.0 / 9.0 + CELSIUS_OFFSET,
        Some(other) => {
            warnings.push(Issue::warning(
                KIND.pointer("temperature_K"),
                format!("unrecognized temperature unit {other:?}"),
            ));
            return None;
        }
    };
    Some(kelvin)
}

fn pressure_pascal(env: &EnvironmentRecord, warnings: &mut Vec<Issue>) -> Option<f64> {
    let value = env.pressure.filter(|value| value.is_finite())?;
    let unit = present(&env.pressure_unit).map(str::to_lowercase);
    let factor = match unit.as_deref() {
        None | Some("pa") => 1.0,
        Some("hpa" | "mbar") => 100.0,
        Some("kpa") => 1_000.0,
        Some("bar") => 100_000.0,
        Some("atm") => 101_325.0,
        Some("torr") => 133.322_368,
        Some(other) => {
            warnings.push(Issue::warning(
                KIND.pointer("pressure_Pa"),
                format!("unrecognized pressure unit {other:?}; pressure omitted"),
            ));
            return None;
        }
    };
    Some(value * factor)
}
