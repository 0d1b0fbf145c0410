use super::*;
use crate::assembly::AssemblyResult;
use crate::converter::ConverterOptions;
use crate::fixtures::{curve_assembly, fixed_clock, full_assembly};
use crate::ulid::{is_valid_ulid, UlidGenerator};
use std::fs;
use std::sync::Arc;

fn write_assembly(path: &Path, assembly: &AssemblyResult) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, serde_json::to_vec(assembly).expect("serialize")).expect("write assembly");
}

fn mismatched_assembly() -> AssemblyResult {
    let mut assembly = curve_assembly();
    if let Some(curve) = assembly
        .reflectivity
        .as_mut()
        .and_then(|refl| refl.reflectivity.as_mut())
    {
        curve.r.push(0.5);
    }
    assembly
}

fn run(dir: &Path, options: &BatchOptions) -> BatchReport {
    let converter = Converter::new(ConverterOptions::default()).expect("converter");
    let clock = fixed_clock();
    let ids = SharedIds::new(UlidGenerator::seeded(Arc::new(fixed_clock()), 11));
    run_batch(dir, &converter, &clock, &ids, options).expect("batch runs")
}

fn names(paths: &[PathBuf], base: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|path| display_path(path, Some(base)))
        .collect()
}

#[test]
fn discovery_is_sorted_and_filtered() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    for name in ["b.json", "a.json", "notes.txt", "old_isaac.json", "sub/c.json"] {
        write_assembly(&root.join(name), &curve_assembly());
    }

    let flat = discover_inputs(root, DEFAULT_PATTERN, false).expect("discover");
    assert_eq!(names(&flat, root), ["a.json", "b.json"]);

    let deep = discover_inputs(root, DEFAULT_PATTERN, true).expect("discover");
    assert_eq!(names(&deep, root), ["a.json", "b.json", "sub/c.json"]);

    let text = discover_inputs(root, "*.txt", false).expect("discover");
    assert_eq!(names(&text, root), ["notes.txt"]);

    assert!(discover_inputs(&root.join("missing"), DEFAULT_PATTERN, false).is_err());
    assert!(discover_inputs(root, "[", false).is_err());
}

#[test]
fn continue_on_error_processes_every_file_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("a.json"), &full_assembly());
    fs::write(root.join("b.json"), b"{ not json").expect("write broken");
    write_assembly(&root.join("c.json"), &mismatched_assembly());
    write_assembly(&root.join("d.json"), &curve_assembly());

    let options = BatchOptions {
        continue_on_error: true,
        ..BatchOptions::default()
    };
    let report = run(root, &options);

    let statuses: Vec<FileStatus> = report.files.iter().map(|file| file.status).collect();
    assert_eq!(
        statuses,
        [
            FileStatus::Written,
            FileStatus::Failed,
            FileStatus::Invalid,
            FileStatus::Written
        ]
    );
    assert_eq!(names(&[report.files[1].input.clone()], root), ["b.json"]);
    assert!(report.files[1].errors[0].contains("parse assembly"));
    assert!(report.files[2].record_id.is_none());
    assert!(root.join("a_isaac.json").is_file());
    assert!(root.join("d_isaac.json").is_file());
    assert!(!root.join("c_isaac.json").exists());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 2);
    assert!(!report.is_success());

    let ids: Vec<&str> = [0, 3]
        .iter()
        .filter_map(|&index| report.files[index].record_id.as_deref())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| is_valid_ulid(id)));
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn abort_on_first_error_skips_the_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("a.json"), &curve_assembly());
    write_assembly(&root.join("b.json"), &mismatched_assembly());
    write_assembly(&root.join("c.json"), &curve_assembly());

    let report = run(root, &BatchOptions::default());
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[1].status, FileStatus::Invalid);
    assert_eq!(names(&report.skipped, root), ["c.json"]);
    assert!(root.join("a_isaac.json").is_file());
    assert!(!root.join("c_isaac.json").exists());
    assert!(!report.is_success());
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("a.json"), &curve_assembly());
    let out = root.join("records");

    let options = BatchOptions {
        dry_run: true,
        output_dir: Some(out.clone()),
        ..BatchOptions::default()
    };
    let report = run(root, &options);
    assert_eq!(report.files[0].status, FileStatus::Valid);
    assert!(report.files[0].output.is_none());
    assert!(!out.exists());
    assert!(report.is_success());
}

#[test]
fn output_dir_receives_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("in/run1.json"), &curve_assembly());
    let out = root.join("out");

    let options = BatchOptions {
        output_dir: Some(out.clone()),
        ..BatchOptions::default()
    };
    let report = run(&root.join("in"), &options);
    assert_eq!(report.files[0].output.as_deref(), Some(out.join("run1_isaac.json").as_path()));
    let written: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("run1_isaac.json")).expect("read"))
            .expect("record json");
    assert_eq!(written["acquisition_source"]["facility"]["site"], "SNS");
}

#[test]
fn recursive_batch_mirrors_input_subdirectories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("in/a/run.json"), &curve_assembly());
    write_assembly(&root.join("in/b/run.json"), &full_assembly());
    let out = root.join("out");

    let options = BatchOptions {
        output_dir: Some(out.clone()),
        recursive: true,
        ..BatchOptions::default()
    };
    let report = run(&root.join("in"), &options);
    let statuses: Vec<FileStatus> = report.files.iter().map(|file| file.status).collect();
    assert_eq!(statuses, [FileStatus::Written, FileStatus::Written]);
    assert_eq!(
        report.files[0].output.as_deref(),
        Some(out.join("a/run_isaac.json").as_path())
    );
    assert_eq!(
        report.files[1].output.as_deref(),
        Some(out.join("b/run_isaac.json").as_path())
    );

    let first: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("a/run_isaac.json")).expect("read a"))
            .expect("record json");
    let second: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("b/run_isaac.json")).expect("read b"))
            .expect("record json");
    assert_ne!(first["record_id"], second["record_id"]);
    assert!(report.is_success());
}

#[test]
fn inputs_sharing_an_output_name_fail_instead_of_overwriting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_assembly(&root.join("run.json"), &curve_assembly());
    write_assembly(&root.join("run.txt"), &full_assembly());

    let options = BatchOptions {
        pattern: "run.*".to_string(),
        continue_on_error: true,
        ..BatchOptions::default()
    };
    let report = run(root, &options);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].status, FileStatus::Written);
    assert_eq!(report.files[1].status, FileStatus::Failed);
    assert!(report.files[1].output.is_none());
    assert!(report.files[1].errors[0].contains("collides"));
    assert!(report.files[1].errors[0].contains("run.json"));

    let written: serde_json::Value =
        serde_json::from_slice(&fs::read(root.join("run_isaac.json")).expect("read"))
            .expect("record json");
    assert_eq!(written["record_id"], report.files[0].record_id.as_deref().unwrap_or(""));
    assert!(!report.is_success());
}
