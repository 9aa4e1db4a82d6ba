use std::path::PathBuf;
use std::process::{Command, Output};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_paramhist"))
}

fn repo_root() -> PathBuf {
    // crates/ph-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let out = run(args);
    assert!(
        out.status.success(),
        "{:?} should succeed, stderr={}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

#[test]
fn version_smoke() {
    let out = run(&["version"]);
    assert!(out.status.success(), "version should succeed");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("paramhist "), "unexpected stdout: {}", stdout);
}

#[test]
fn eval_relative_two_bin() {
    let input = fixture_path("two_bin_relative.json");
    let v = run_json(&["eval", "--input", input.to_str().unwrap(), "--x", "1.5"]);
    assert_eq!(v["bin"].as_u64(), Some(1));
    assert_eq!(v["value"].as_f64(), Some(18.0));
}

#[test]
fn eval_outside_domain_fails() {
    let input = fixture_path("two_bin_relative.json");
    let out = run(&["eval", "--input", input.to_str().unwrap(), "--x", "-1"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("outside axis"), "unexpected stderr: {}", stderr);
}

#[test]
fn integral_full_and_partial() {
    let input = fixture_path("two_bin_relative.json");
    let v = run_json(&["integral", "--input", input.to_str().unwrap()]);
    assert_eq!(v["code"].as_i64(), Some(1));
    assert_eq!(v["value"].as_f64(), Some(22.0));

    let grid = fixture_path("grid_absolute.json");
    let v = run_json(&[
        "integral",
        "--input",
        grid.to_str().unwrap(),
        "--vars",
        "y",
        "--x",
        "0.5",
        "0.0",
    ]);
    assert_eq!(v["code"].as_i64(), Some(0));
    // Bins (0, 0) width 1 and (0, 1) width 3.
    assert_eq!(v["value"].as_f64(), Some(1.0 + 6.0));
}

#[test]
fn hint_and_boundaries() {
    let input = fixture_path("two_bin_relative.json");
    let path = input.to_str().unwrap();
    let v = run_json(&["hint", "--input", path, "--obs", "x", "--lo", "0", "--hi", "2"]);
    assert_eq!(v["kind"], "sampling_hint");
    assert_eq!(v["points"].as_array().unwrap().len(), 6);

    let v = run_json(&[
        "hint", "--input", path, "--obs", "x", "--lo", "0.5", "--hi", "2", "--boundaries",
    ]);
    assert_eq!(v["points"], serde_json::json!([1.0, 2.0]));

    let v = run_json(&["hint", "--input", path, "--obs", "z", "--lo", "0", "--hi", "2"]);
    assert!(v["points"].as_array().unwrap().is_empty());
}

#[test]
fn snapshot_reports_bins_and_constraint() {
    let input = fixture_path("two_bin_relative.json");
    let v = run_json(&["snapshot", "--input", input.to_str().unwrap()]);
    assert_eq!(v["relative"], true);
    let bins = v["bins"].as_array().unwrap();
    assert_eq!(bins.len(), 2);
    assert_eq!(bins[0]["name"], "bkg_gamma_bin_0");
    assert_eq!(bins[1]["value"].as_f64(), Some(2.0));
    assert_eq!(bins[1]["constant"], false);
    assert_eq!(v["constraint"]["n_terms"].as_u64(), Some(2));
    assert!(v["constraint"]["nll"].as_f64().unwrap().is_finite());
}

#[test]
fn snapshot_single_bin() {
    let input = fixture_path("two_bin_relative.json");
    let path = input.to_str().unwrap();
    let v = run_json(&["snapshot", "--input", path, "--bin", "1"]);
    let bins = v["bins"].as_array().unwrap();
    assert_eq!(bins.len(), 1);
    assert_eq!(bins[0]["bin"].as_u64(), Some(1));
    assert_eq!(bins[0]["value"].as_f64(), Some(2.0));

    for bad in ["-1", "2"] {
        let out = run(&["snapshot", "--input", path, "--bin", bad]);
        assert!(!out.status.success(), "--bin {} should fail", bad);
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(
            stderr.contains(&format!("bin index {} out of range [0, 2)", bad)),
            "unexpected stderr: {}",
            stderr
        );
    }
}

#[test]
fn snapshot_absolute_with_empty_bin() {
    let input = fixture_path("grid_absolute.json");
    let v = run_json(&["snapshot", "--input", input.to_str().unwrap()]);
    assert!(v["degenerate_bins"].as_array().unwrap().is_empty());
    assert_eq!(v["bins"][3]["error"].as_f64(), Some(0.0));
    assert_eq!(v["constraint"]["n_terms"].as_u64(), Some(0));
}

#[test]
fn rejects_unknown_schema() {
    let tmp = std::env::temp_dir().join(format!("paramhist_cli_{}_bad.json", std::process::id()));
    std::fs::write(&tmp, r#"{"schema_version":"v9","name":"f","axes":[],"contents":[]}"#)
        .unwrap();
    let out = run(&["snapshot", "--input", tmp.to_str().unwrap()]);
    let _ = std::fs::remove_file(&tmp);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("schema_version"), "unexpected stderr: {}", stderr);
}
