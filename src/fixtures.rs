//! Assembly builders shared by unit tests.
use crate::assembly::{
    AssemblyResult, EnvironmentRecord, Layer, ReflectivityData, ReflectivityRecord, SampleRecord,
};
use crate::clock::FixedClock;
use crate::mappers::MapperContext;
use crate::record::{RecordDomain, RecordType};
use crate::ulid::FixedIdGenerator;

pub(crate) const FIXED_ID: &str = "01JHHV5T00AAAAAAAAAAAAAAAA";

pub(crate) fn fixed_clock() -> FixedClock {
    FixedClock::at(2025, 1, 15, 12, 0, 0)
}

pub(crate) fn ctx(result: &AssemblyResult) -> MapperContext<'_> {
    MapperContext::new(
        result,
        &fixed_clock(),
        &mut FixedIdGenerator(FIXED_ID.to_string()),
        RecordType::Evidence,
        RecordDomain::Characterization,
    )
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Three-point SNS REF_L curve with every channel populated.
pub(crate) fn curve_assembly() -> AssemblyResult {
    AssemblyResult {
        reflectivity: Some(ReflectivityRecord {
            id: text("test-001"),
            created_at: text("2025-01-15T12:00:00Z"),
            facility: text("SNS"),
            instrument_name: text("REF_L"),
            reflectivity: Some(ReflectivityData {
                q: vec![0.01, 0.02, 0.03],
                r: vec![0.95, 0.85, 0.70],
                dr: vec![0.01, 0.01, 0.02],
                dq: vec![0.001, 0.002, 0.003],
                ..ReflectivityData::default()
            }),
            ..ReflectivityRecord::default()
        }),
        ..AssemblyResult::default()
    }
}

/// Fully populated assembly: reflectivity metadata, layer stack, environment.
pub(crate) fn full_assembly() -> AssemblyResult {
    let q = vec![0.008, 0.010, 0.012, 0.015, 0.020];
    let r = vec![0.98, 0.95, 0.90, 0.80, 0.50];
    let dr = r.iter().map(|value| value * 0.02).collect();
    let dq = q.iter().map(|value| value * 0.05).collect();
    AssemblyResult {
        reflectivity: Some(ReflectivityRecord {
            id: text("550e8400-e29b-41d4-a716-446655440000"),
            created_at: text("2025-01-15T12:00:00Z"),
            facility: text("SNS"),
            laboratory: text("ORNL"),
            instrument_name: text("REF_L"),
            run_number: text("218386"),
            run_title: text("Cu/Si thin film - temperature series"),
            run_start: text("2025-01-15T10:30:00Z"),
            run_end: text("2025-01-15T11:45:00Z"),
            probe: text("neutrons"),
            technique: text("reflectivity"),
            ipts_number: text("IPTS-12345"),
            experiment_title: text("Cu thin film characterization"),
            raw_file_path: text("/SNS/REF_L/IPTS-12345/nexus/REF_L_218386.nxs.h5"),
            reflectivity: Some(ReflectivityData {
                q,
                r,
                dr,
                dq,
                q_unit: text("1/angstrom"),
                measurement_geometry: text("front reflection"),
                reduction_version: text("quicknxs 4.2.1"),
                reduction_time: text("2025-01-15T11:50:00Z"),
                ..ReflectivityData::default()
            }),
            ..ReflectivityRecord::default()
        }),
        sample: Some(SampleRecord {
            description: text("Cu film on Si substrate, magnetron sputtered"),
            sample_name: text("Cu_Si_001"),
            main_composition: text("Cu"),
            sample_type: text("thin_film"),
            layers: vec![
                layer(1, "air", 0.0),
                layer(2, "Cu", 487.3),
                layer(3, "SiO2", 15.2),
                layer(4, "Si", 0.0),
            ],
            ..SampleRecord::default()
        }),
        environment: Some(EnvironmentRecord {
            description: text("Room temperature measurement in air"),
            ambient_medium: text("air"),
            temperature: Some(298.15),
            temperature_unit: text("K"),
            pressure: Some(101325.0),
            pressure_unit: text("Pa"),
            humidity: Some(45.0),
            ..EnvironmentRecord::default()
        }),
        warnings: vec!["Sample alignment may require verification".to_string()],
        reduced_file: text("/data/REFL_218386_combined_data_auto.txt"),
        model_file: text("/data/model_218386.json"),
        ..AssemblyResult::default()
    }
}

pub(crate) fn layer(number: u32, material: &str, thickness: f64) -> Layer {
    Layer {
        layer_number: Some(number),
        material: text(material),
        thickness,
        thickness_unit: text("angstrom"),
        ..Layer::default()
    }
}
