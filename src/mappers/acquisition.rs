use super::{put_str, BlockKind, BlockOutput, MapperContext};
use crate::assembly::present;
use crate::record::{Issue, SourceType, DEFAULT_ENDSTATION};
use serde_json::{Map, Value};

const KIND: BlockKind = BlockKind::AcquisitionSource;

/// `acquisition_source` block. Reflectometry data comes from a facility
/// unless the assembly says it was simulated.
pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut block = Map::new();
    let mut warnings = Vec::new();

    let Some(refl) = ctx.reflectivity() else {
        block.insert("source_type".to_string(), SourceType::Facility.into());
        warnings.push(Issue::warning(
            KIND.pointer("facility"),
            "no reflectivity record; facility details omitted",
        ));
        return BlockOutput::present(KIND, block, warnings);
    };

    if refl.is_simulated {
        block.insert("source_type".to_string(), SourceType::Computation.into());
        let mut computation = Map::new();
        if !put_str(&mut computation, "software", refl.simulation_tool.as_deref()) {
            warnings.push(Issue::warning(
                KIND.pointer("computation/software"),
                "simulated data without simulation_tool",
            ));
        }
        if !computation.is_empty() {
            block.insert("computation".to_string(), Value::Object(computation));
        }
        return BlockOutput::present(KIND, block, warnings);
    }

    block.insert("source_type".to_string(), SourceType::Facility.into());
    let mut facility = Map::new();
    if !put_str(&mut facility, "site", present(&refl.facility)) {
        facility.insert("site".to_string(), Value::from("Unknown"));
        warnings.push(Issue::warning(
            KIND.pointer("facility/site"),
            "facility name not found, using 'Unknown'",
        ));
    }
    if !put_str(&mut facility, "beamline", present(&refl.instrument_name)) {
        warnings.push(Issue::warning(
            KIND.pointer("facility/beamline"),
            "instrument name not found for beamline",
        ));
    }
    facility.insert("endstation".to_string(), Value::from(DEFAULT_ENDSTATION));
    block.insert("facility".to_string(), Value::Object(facility));

    BlockOutput::present(KIND, block, warnings)
}
