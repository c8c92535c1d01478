use std::path::PathBuf;
use std::process::Command;

use attention_monitor::acquisition::{FrameSource, SyntheticSource};
use attention_monitor::fixtures::write_wav;
use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_attention_cli"))
}

fn scratch_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("attention_cli_{}_{}", std::process::id(), name));
    let _ = std::fs::remove_file(&path);
    path
}

fn path_arg(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn recording(name: &str, mut source: SyntheticSource, frames: usize) -> PathBuf {
    let path = scratch_file(name);
    let mut samples = Vec::new();
    for _ in 0..frames {
        samples.extend(source.next_frame().expect("synthetic frame"));
    }
    write_wav(&path, &samples, 512).expect("write fixture recording");
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("JSON payload on stdout")
}

#[test]
fn synth_reports_summary() {
    let output = cli()
        .args(["synth", "--frames", "25", "--seed", "3"])
        .output()
        .expect("failed to run attention_cli synth");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let json = stdout_json(&output);
    assert_eq!(json["frames"], 25);
    assert_eq!(json["profile"], "focused");
    assert!(json["mean_score"].as_f64().unwrap_or_default() > 0.0);
}

#[test]
fn synth_profiles_separate() {
    let run = |relaxed: bool| {
        let mut args = vec!["synth", "--frames", "40"];
        if relaxed {
            args.push("--relaxed");
        }
        let output = cli().args(&args).output().expect("failed to run synth");
        assert!(output.status.success());
        stdout_json(&output)["final_score"]
            .as_f64()
            .expect("final_score number")
    };

    assert!(run(false) > run(true));
}

#[test]
fn threshold_set_then_get_round_trips() {
    let store = scratch_file("threshold_store.json");

    let output = cli()
        .args(["--store", &path_arg(&store), "threshold", "get"])
        .output()
        .expect("failed to run threshold get");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["threshold"], 40.0);
    assert_eq!(json["is_calibrated"], false);

    let output = cli()
        .args(["--store", &path_arg(&store), "threshold", "set", "27.5"])
        .output()
        .expect("failed to run threshold set");
    assert!(output.status.success());

    let output = cli()
        .args(["--store", &path_arg(&store), "threshold", "get"])
        .output()
        .expect("failed to run threshold get");
    let json = stdout_json(&output);
    assert_eq!(json["threshold"], 27.5);
    assert_eq!(json["is_calibrated"], true);

    std::fs::remove_file(&store).expect("cleanup store");
}

#[test]
fn threshold_set_rejects_non_finite() {
    let store = scratch_file("nan_store.json");
    let output = cli()
        .args(["--store", &path_arg(&store), "threshold", "set", "NaN"])
        .output()
        .expect("failed to run threshold set");
    assert_eq!(output.status.code(), Some(1));
    assert!(!store.exists());
}

#[test]
fn calibrate_then_analyze_recording() {
    let store = scratch_file("calibrate_store.json");
    let baseline = recording("baseline.wav", SyntheticSource::relaxed(9), 60);
    let session = recording("session.wav", SyntheticSource::focused(9), 30);

    let output = cli()
        .args([
            "--store",
            &path_arg(&store),
            "calibrate",
            "--wav",
            &path_arg(&baseline),
        ])
        .output()
        .expect("failed to run calibrate");
    assert!(
        output.status.success(),
        "calibrate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let calibration = stdout_json(&output);
    assert_eq!(calibration["previous_threshold"], 40.0);
    let threshold = calibration["threshold"].as_f64().expect("threshold number");
    assert!(threshold > 0.0);

    let output = cli()
        .args([
            "--store",
            &path_arg(&store),
            "analyze",
            "--wav",
            &path_arg(&session),
        ])
        .output()
        .expect("failed to run analyze");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("report JSON line"))
        .collect();
    assert_eq!(lines.len(), 30);
    assert_eq!(lines[0]["sequence"], 1);
    assert_eq!(
        lines[0]["band_powers"]["powers"]
            .as_array()
            .map(|powers| powers.len()),
        Some(4)
    );
    assert_eq!(lines.last().expect("last report")["attentive"], true);

    for path in [&store, &baseline, &session] {
        std::fs::remove_file(path).expect("cleanup");
    }
}

#[test]
fn analyze_missing_recording_fails() {
    let store = scratch_file("missing_store.json");
    let output = cli()
        .args([
            "--store",
            &path_arg(&store),
            "analyze",
            "--wav",
            "/nonexistent/session.wav",
        ])
        .output()
        .expect("failed to run analyze");
    assert_eq!(output.status.code(), Some(1));
}
