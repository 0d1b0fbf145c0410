use super::MapperContext;
use crate::record::{Record, ISAAC_RECORD_VERSION};
use serde_json::Value;

/// Scalar root fields. Always succeeds: every value comes from the context.
pub fn map_root(ctx: &MapperContext<'_>) -> Record {
    let mut root = Record::new();
    root.insert(
        "isaac_record_version".to_string(),
        Value::from(ISAAC_RECORD_VERSION),
    );
    root.insert("record_id".to_string(), Value::from(ctx.record_id()));
    root.insert("record_type".to_string(), ctx.record_type().into());
    root.insert("record_domain".to_string(), ctx.record_domain().into());
    root
}
