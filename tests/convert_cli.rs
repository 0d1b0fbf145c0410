mod common;

use common::{curve_assembly, mismatched_assembly, read_json, stderr, write_json, RECORD_ID};
use serde_json::Value;

#[test]
fn convert_writes_named_record_into_output_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(Some("218386")));
    let out = dir.path().join("records");

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .arg("--record-id")
        .arg(RECORD_ID)
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));

    let record = read_json(&out.join("isaac_record_218386.json"));
    assert_eq!(record["record_id"], RECORD_ID);
    assert_eq!(record["record_type"], "evidence");
    assert_eq!(record["acquisition_source"]["facility"]["site"], "SNS");
    let kelvin = record["context"]["temperature_K"].as_f64().expect("temperature");
    assert!((kelvin - 298.15).abs() < 1e-9);
}

#[test]
fn convert_without_destination_prints_compact_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(None));

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--compact")
        .arg("--record-type")
        .arg("interpretation")
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end().lines().count(), 1);
    let record: Value = serde_json::from_str(stdout.trim_end()).expect("record json");
    let id = record["record_id"].as_str().expect("record id");
    assert_eq!(id.len(), 26);
    assert_eq!(record["record_type"], "interpretation");
}

#[test]
fn convert_with_mismatched_arrays_fails_and_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &mismatched_assembly());
    let target = dir.path().join("record.json");

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--output")
        .arg(&target)
        .output()
        .expect("spawn nr-isaac");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("R has 4 points but Q has 3"));
    assert!(!target.exists());
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(Some("7")));
    let out = dir.path().join("records");

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .arg("--dry-run")
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("dry run"));
    assert!(!out.exists());
}

#[test]
fn invalid_record_id_is_rejected_by_the_parser() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(None));

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--record-id")
        .arg("not-a-ulid")
        .output()
        .expect("spawn nr-isaac");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a 26-character ULID"));
}

#[test]
fn schema_resolution_honours_override_and_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(None));
    let missing = dir.path().join("missing_schema.json");

    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--schema")
        .arg(&missing)
        .output()
        .expect("spawn nr-isaac");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("schema file not found"));

    let output = common::nr_isaac()
        .env("ISAAC_SCHEMA_PATH", &missing)
        .arg("convert")
        .arg(&input)
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("using bundled schema"));
}

#[test]
fn from_json_revalidates_and_reemits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(Some("42")));
    let record_path = dir.path().join("record.json");
    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--output")
        .arg(&record_path)
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));

    let normalized = dir.path().join("normalized.json");
    let output = common::nr_isaac()
        .arg("from-json")
        .arg(&record_path)
        .arg("--output")
        .arg(&normalized)
        .arg("--compact")
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(read_json(&normalized), read_json(&record_path));
    let text = std::fs::read_to_string(&normalized).expect("read normalized");
    assert_eq!(text.lines().count(), 1);
}

#[test]
fn validate_reports_every_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("assembly.json");
    write_json(&input, &curve_assembly(None));
    let good = dir.path().join("good.json");
    let output = common::nr_isaac()
        .arg("convert")
        .arg(&input)
        .arg("--output")
        .arg(&good)
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));

    let mut record = read_json(&good);
    record["record_type"] = Value::from("rumor");
    let bad = dir.path().join("bad.json");
    write_json(&bad, &record);

    let output = common::nr_isaac()
        .arg("validate")
        .arg(&good)
        .output()
        .expect("spawn nr-isaac");
    assert!(output.status.success(), "{}", stderr(&output));

    let output = common::nr_isaac()
        .arg("validate")
        .arg(&good)
        .arg(&bad)
        .arg("--json")
        .output()
        .expect("spawn nr-isaac");
    assert_eq!(output.status.code(), Some(1));
    let summary: Value = serde_json::from_slice(&output.stdout).expect("summary json");
    assert_eq!(summary[0]["valid"], true);
    assert_eq!(summary[1]["valid"], false);
    assert_eq!(summary[1]["errors"][0]["path"], "/record_type");
}
