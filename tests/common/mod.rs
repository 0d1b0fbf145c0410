//! Shared helpers for CLI integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

pub const RECORD_ID: &str = "01JHHV5T00AAAAAAAAAAAAAAAA";

/// The binary with ambient configuration cleared.
pub fn nr_isaac() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nr-isaac"));
    command.env_remove("ISAAC_SCHEMA_PATH").env_remove("RUST_LOG");
    command
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Serialized three-point SNS REF_L assembly.
pub fn curve_assembly(run_number: Option<&str>) -> Value {
    let mut assembly = json!({
        "reflectivity": {
            "id": "test-001",
            "created_at": "2025-01-15T12:00:00Z",
            "facility": "SNS",
            "instrument_name": "REF_L",
            "probe": "neutrons",
            "reflectivity": {
                "q": [0.01, 0.02, 0.03],
                "r": [0.95, 0.85, 0.70],
                "dr": [0.01, 0.01, 0.02],
                "dq": [0.001, 0.002, 0.003]
            }
        },
        "environment": {
            "ambient_medium": "air",
            "temperature": 25.0,
            "temperature_unit": "C"
        }
    });
    if let Some(run) = run_number {
        assembly["reflectivity"]["run_number"] = json!(run);
    }
    assembly
}

/// Assembly whose R array is one point longer than Q.
pub fn mismatched_assembly() -> Value {
    let mut assembly = curve_assembly(Some("999"));
    assembly["reflectivity"]["reflectivity"]["r"] = json!([0.95, 0.85, 0.70, 0.5]);
    assembly
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, serde_json::to_vec_pretty(value).expect("serialize")).expect("write json");
}

pub fn read_json(path: &Path) -> Value {
    let bytes = fs::read(path).expect("read json");
    serde_json::from_slice(&bytes).expect("parse json")
}
