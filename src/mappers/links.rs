use super::{BlockKind, BlockOutput, MapperContext};
use crate::assembly::present;
use crate::record::LinkType;
use serde_json::{json, Value};

const KIND: BlockKind = BlockKind::Links;

/// `links` block: relationships to other records. Always emitted, possibly
/// empty, so consumers can tell "no links" from "links not mapped".
pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut links = Vec::new();

    if let Some(refl) = ctx.reflectivity() {
        if let Some(parent) = present(&refl.parent_record_id) {
            links.push(link(
                LinkType::DerivedFrom,
                parent,
                "Derived from source record",
            ));
        }
        for run in refl.related_runs.iter().map(|run| run.trim()) {
            if !run.is_empty() {
                links.push(link(LinkType::DerivedFrom, run, "Derived from related run"));
            }
        }
        if let Some(target) = present(&refl.calibration_of) {
            links.push(link(
                LinkType::CalibrationOf,
                target,
                "Calibration measurement for target record",
            ));
        }
        if let Some(collection) = present(&refl.collection_id) {
            links.push(link(
                LinkType::PartOf,
                collection,
                "Part of measurement series",
            ));
        }
        if let Some(doi) = present(&refl.doi) {
            links.push(link(LinkType::Cites, doi, "Associated publication DOI"));
        }
    }

    if let Some(sample) = ctx.sample().and_then(|sample| present(&sample.sample_record_id)) {
        links.push(link(LinkType::RelatedTo, sample, "Related sample record"));
    }

    BlockOutput::present(KIND, links, Vec::new())
}

fn link(link_type: LinkType, target: &str, description: &str) -> Value {
    json!({
        "link_type": link_type.as_str(),
        "target_record_id": target,
        "description": description,
    })
}
