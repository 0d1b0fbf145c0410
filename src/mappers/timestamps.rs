//! `timestamps` block: creation, acquisition, and reduction instants.
use super::{BlockKind, BlockOutput, MapperContext};
use crate::assembly::present;
use crate::clock::{format_utc, parse_timestamp};
use crate::record::Issue;
use serde_json::{Map, Value};

const KIND: BlockKind = BlockKind::Timestamps;

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let mut block = Map::new();
    let mut warnings = Vec::new();
    let refl = ctx.reflectivity();

    let created = match refl.and_then(|refl| present(&refl.created_at)) {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            warnings.push(Issue::warning(
                KIND.pointer("created_utc"),
                format!("unparseable created_at {raw:?}; using conversion time"),
            ));
            ctx.now()
        }),
        None => ctx.now(),
    };
    block.insert("created_utc".to_string(), Value::from(format_utc(&created)));

    let Some(refl) = refl else {
        return BlockOutput::present(KIND, block, warnings);
    };

    let start = match present(&refl.run_start) {
        Some(raw) => {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                warnings.push(Issue::warning(
                    KIND.pointer("acquired_start_utc"),
                    format!("unparseable run_start {raw:?}; acquired timestamps omitted"),
                ));
            }
            parsed
        }
        None => {
            warnings.push(Issue::warning(
                KIND.pointer("acquired_start_utc"),
                "run_start not found, acquired timestamps omitted",
            ));
            None
        }
    };

    if let Some(start) = start {
        block.insert(
            "acquired_start_utc".to_string(),
            Value::from(format_utc(&start)),
        );
        if let Some(raw) = present(&refl.run_end) {
            match parse_timestamp(raw) {
                Some(end) if end >= start => {
                    block.insert("acquired_end_utc".to_string(), Value::from(format_utc(&end)));
                }
                Some(_) => warnings.push(Issue::warning(
                    KIND.pointer("acquired_end_utc"),
                    "run_end precedes run_start; end timestamp omitted",
                )),
                None => warnings.push(Issue::warning(
                    KIND.pointer("acquired_end_utc"),
                    format!("unparseable run_end {raw:?}"),
                )),
            }
        }
    }

    let reduction_time = refl
        .reflectivity
        .as_ref()
        .and_then(|curve| present(&curve.reduction_time));
    if let Some(raw) = reduction_time {
        match parse_timestamp(raw) {
            Some(processed) => {
                block.insert(
                    "processed_utc".to_string(),
                    Value::from(format_utc(&processed)),
                );
            }
            None => warnings.push(Issue::warning(
                KIND.pointer("processed_utc"),
                format!("unparseable reduction_time {raw:?}"),
            )),
        }
    }

    BlockOutput::present(KIND, block, warnings)
}
