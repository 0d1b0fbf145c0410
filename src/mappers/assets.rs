//! `assets` block: files the record was built from, with content hashes.
use super::{BlockKind, BlockOutput, MapperContext};
use crate::assembly::present;
use crate::record::{ContentRole, Issue, IssueKind};
use crate::util::{local_path, path_to_uri, sha256_file};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const KIND: BlockKind = BlockKind::Assets;

struct AssetRef<'a> {
    reference: &'a str,
    role: ContentRole,
    description: &'static str,
}

pub(super) fn map(ctx: &MapperContext<'_>) -> BlockOutput {
    let refs = collect_refs(ctx);
    let mut warnings = Vec::new();
    if refs.is_empty() {
        return BlockOutput::absent(KIND, warnings);
    }
    let assets: Vec<Value> = refs
        .iter()
        .enumerate()
        .map(|(index, asset)| build_asset(ctx.record_id(), index, asset, &mut warnings))
        .collect();
    BlockOutput::present(KIND, assets, warnings)
}

fn collect_refs<'a>(ctx: &MapperContext<'a>) -> Vec<AssetRef<'a>> {
    let mut refs: Vec<AssetRef<'a>> = Vec::new();
    let mut push = |reference: Option<&'a str>, role, description| {
        let Some(reference) = reference else {
            return;
        };
        if refs.iter().any(|known| known.reference == reference) {
            return;
        }
        refs.push(AssetRef {
            reference,
            role,
            description,
        });
    };

    let refl = ctx.reflectivity();
    push(
        refl.and_then(|refl| present(&refl.raw_file_path)),
        ContentRole::RawDataPointer,
        "Raw measurement data file",
    );
    push(
        refl.and_then(|refl| present(&refl.reduced_file))
            .or_else(|| present(&ctx.result().reduced_file)),
        ContentRole::ReductionProduct,
        "Reduced reflectivity data",
    );
    push(
        ctx.curve().and_then(|curve| present(&curve.source_file)),
        ContentRole::ReductionProduct,
        "Reflectivity data source file",
    );
    push(
        present(&ctx.result().model_file),
        ContentRole::ProcessingRecipe,
        "Reflectivity model definition",
    );
    push(
        ctx.sample().and_then(|sample| present(&sample.sample_file)),
        ContentRole::MetadataSnapshot,
        "Sample definition file",
    );
    push(
        ctx.environment().and_then(|env| present(&env.environment_file)),
        ContentRole::MetadataSnapshot,
        "Environment configuration file",
    );
    refs
}

fn build_asset(
    record_id: &str,
    index: usize,
    asset: &AssetRef<'_>,
    warnings: &mut Vec<Issue>,
) -> Value {
    let mut entry = Map::new();
    entry.insert(
        "asset_id".to_string(),
        Value::from(format!(
            "{record_id}-{}-{:03}",
            role_code(asset.role),
            index + 1
        )),
    );
    entry.insert("content_role".to_string(), asset.role.into());
    entry.insert("uri".to_string(), Value::from(path_to_uri(asset.reference)));

    match local_path(asset.reference) {
        Some(path) => match sha256_file(&path) {
            Ok(digest) => {
                entry.insert("sha256".to_string(), Value::from(digest));
            }
            Err(err) => {
                warn!(path = %path.display(), "cannot hash asset: {err:#}");
                warnings.push(Issue::new(
                    IssueKind::AssetAccess,
                    KIND.pointer(&format!("{index}/sha256")),
                    format!("cannot hash {}: file not readable", path.display()),
                ));
            }
        },
        None => debug!(uri = asset.reference, "remote asset left unhashed"),
    }

    if let Some(format) = infer_format(asset.reference) {
        entry.insert("format".to_string(), Value::from(format));
    }
    entry.insert("description".to_string(), Value::from(asset.description));
    Value::Object(entry)
}

fn role_code(role: ContentRole) -> &'static str {
    match role {
        ContentRole::RawDataPointer => "RAW",
        ContentRole::ReductionProduct => "RED",
        ContentRole::ProcessingRecipe => "RCP",
        ContentRole::InputStructure => "INP",
        ContentRole::MetadataSnapshot => "META",
        ContentRole::SupplementaryImage => "IMG",
        ContentRole::Other => "OTH",
    }
}

fn infer_format(reference: &str) -> Option<&'static str> {
    let lower = reference.to_lowercase();
    if lower.ends_with(".nxs.h5") {
        return Some("NeXus");
    }
    let extension = lower.rsplit_once('.').map(|(_, ext)| ext)?;
    let format = match extension {
        "nxs" | "nx" => "NeXus",
        "h5" | "hdf5" | "hdf" => "HDF5",
        "ort" => "ORSO text reflectivity",
        "orb" => "ORSO binary reflectivity",
        "txt" => "text",
        "csv" => "CSV",
        "json" => "JSON",
        "xml" => "XML",
        "dat" => "data",
        "parquet" => "Parquet",
        _ => return None,
    };
    Some(format)
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
