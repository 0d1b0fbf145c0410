use super::{put_str, BlockKind, BlockOutput, MapperContext};
use crate::assembly::present;
use crate::record::{InstrumentType, SystemDomain};
use serde_json::{Map, Value};

const KIND: BlockKind = BlockKind::System;

/// `system` block: facility, instrument, and a flat configuration object.
pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let Some(refl) = ctx.reflectivity() else {
        return BlockOutput::absent(KIND, Vec::new());
    };

    let mut block = Map::new();
    let domain = if refl.is_simulated {
        SystemDomain::Computational
    } else {
        SystemDomain::Experimental
    };
    block.insert("domain".to_string(), domain.into());

    let mut facility = Map::new();
    put_str(&mut facility, "facility_name", present(&refl.facility));
    put_str(&mut facility, "organization", present(&refl.laboratory));
    put_str(&mut facility, "beamline", present(&refl.instrument_name));
    if !facility.is_empty() {
        block.insert("facility".to_string(), Value::Object(facility));
    }

    if let Some(name) = present(&refl.instrument_name) {
        let instrument_type = if refl.is_simulated {
            InstrumentType::SimulationSoftware
        } else {
            InstrumentType::BeamlineEndstation
        };
        let mut instrument = Map::new();
        instrument.insert("instrument_type".to_string(), instrument_type.into());
        instrument.insert("instrument_name".to_string(), Value::from(name));
        put_str(
            &mut instrument,
            "vendor_or_project",
            present(&refl.laboratory),
        );
        block.insert("instrument".to_string(), Value::Object(instrument));
    }

    // Scalars only: downstream consumers index configuration as flat keys.
    let curve = ctx.curve();
    let mut configuration = Map::new();
    put_str(
        &mut configuration,
        "measurement_geometry",
        curve.and_then(|curve| present(&curve.measurement_geometry)),
    );
    put_str(&mut configuration, "probe", present(&refl.probe));
    put_str(&mut configuration, "technique", present(&refl.technique));
    put_str(
        &mut configuration,
        "technique_description",
        present(&refl.technique_description),
    );
    put_str(
        &mut configuration,
        "reduction_software",
        curve.and_then(|curve| present(&curve.reduction_version)),
    );
    if refl.is_simulated {
        put_str(
            &mut configuration,
            "simulation_tool",
            present(&refl.simulation_tool),
        );
    }
    block.insert("configuration".to_string(), Value::Object(configuration));

    BlockOutput::present(KIND, block, Vec::new())
}
