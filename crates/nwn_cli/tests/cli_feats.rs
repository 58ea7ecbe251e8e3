use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path(name: &str) -> String {
    workspace_root()
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .to_string()
}

fn cli_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nwn-se"));
    command.env_remove("NWN_SE_RULES").env_remove("RUST_LOG");
    command
}

fn run_cli(args: &[&str]) -> Output {
    cli_command()
        .args(args)
        .output()
        .expect("failed to run nwn-se CLI")
}

fn run_with_rules(creature: &str, extra: &[&str]) -> Output {
    let rules = fixture_path("rules.json");
    let creature = fixture_path(creature);
    let mut args = vec!["--rules", rules.as_str(), creature.as_str()];
    args.extend_from_slice(extra);
    run_cli(&args)
}

fn temp_output_path(prefix: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "{prefix}_{}_{}.{extension}",
        std::process::id(),
        nanos
    ))
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

fn read_json(path: &PathBuf) -> Value {
    let bytes = fs::read(path).expect("output file should exist");
    serde_json::from_slice(&bytes).expect("output file should be valid json")
}

#[test]
fn cli_prints_text_sheet_by_default() {
    let output = run_with_rules("fighter.json", &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Name: Aribeth"));
    assert!(stdout.contains("Classes: Fighter 4"));
    assert!(stdout.contains("Feats on creature: 8 (5 granted, 3 chosen)"));
    assert!(stdout.contains("13 of 17 shown"));
    assert!(stdout.contains("Toughness"));
    assert!(!stdout.contains("Blooded"));
}

#[test]
fn cli_reads_rules_path_from_environment() {
    let output = cli_command()
        .env("NWN_SE_RULES", fixture_path("rules.json"))
        .arg(fixture_path("fighter.json"))
        .arg("--summary")
        .output()
        .expect("failed to run nwn-se CLI");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" ::: Summary :::"));
    assert!(!stdout.contains(" ::: Feats :::"));
}

#[test]
fn cli_requires_rules() {
    let output = run_cli(&[&fixture_path("fighter.json")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_json_summary_has_counts() {
    let output = run_with_rules("fighter.json", &["--json", "--summary"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["name"], "Aribeth");
    assert_eq!(json["summary"]["assigned"], 8);
    assert_eq!(json["summary"]["granted"], 5);
    assert_eq!(json["summary"]["selected"], 3);
    assert_eq!(json["summary"]["expected"]["total"], 6);
    assert_eq!(json["summary"]["balance_text"], "3 remaining");
    assert!(json.get("feats").is_none());
}

#[test]
fn cli_filters_by_category_and_status() {
    let output = run_with_rules(
        "fighter.json",
        &[
            "--json",
            "--category",
            "defensive",
            "--show",
            "unavailable",
            "--hide",
            "assigned",
        ],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    let names: Vec<&str> = json["feats"]
        .as_array()
        .expect("feats should be an array")
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Alertness", "Dodge", "Mobility"]);
    assert_eq!(json["filter"]["category"], "defensive");
}

#[test]
fn cli_reports_when_nothing_matches() {
    let output = run_with_rules(
        "fighter.json",
        &["--search", "proficiency", "--hide", "granted"],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No feats match the current filter."));
    assert!(stdout.contains("0 of 17 shown"));
}

#[test]
fn cli_rejects_unknown_status() {
    let output = run_with_rules("fighter.json", &["--show", "sometimes"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_grouped_view_lists_sources() {
    let output = run_with_rules("elf_rogue.json", &["--grouped"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" ::: Race: Elf :::"));
    assert!(stdout.contains(" ::: Class: Rogue :::"));
    assert!(stdout.contains(" ::: Class: Wizard :::"));
    assert!(stdout.contains(" ::: Chosen :::"));
    assert!(stdout.contains("Unknown feats on creature: 5000"));
}

#[test]
fn cli_grouped_view_honours_filters() {
    let output = run_with_rules("fighter.json", &["--grouped", "--search", "toughness"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 of 17 shown"));
    assert!(stdout.contains(" ::: Chosen :::"));
    assert!(stdout.contains("Toughness"));
    assert!(!stdout.contains(" ::: Class: Fighter :::"));
    assert!(!stdout.contains(" ::: Race: Human :::"));
    assert!(!stdout.contains("Power Attack"));
    assert!(!stdout.contains("Quick to Master"));
}

#[test]
fn cli_grouped_json_honours_filters() {
    let output = run_with_rules(
        "fighter.json",
        &["--json", "--category", "class-racial", "--hide", "assigned"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    let groups = json["groups"].as_array().expect("groups should be an array");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["kind"], "race");
    assert_eq!(groups[0]["feats"], serde_json::json!([107]));
    assert_eq!(groups[1]["kind"], "class");
    assert_eq!(groups[1]["feats"], serde_json::json!([2, 3, 4, 32]));
}

#[test]
fn cli_edits_require_output_path() {
    let output = run_with_rules("fighter.json", &["--add-feat", "0"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("require --output"));
}

#[test]
fn cli_output_requires_edits() {
    let out_path = temp_output_path("nwn_se_noop", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules("fighter.json", &["--output", &out]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!out_path.exists());
}

#[test]
fn cli_add_and_remove_feats_writes_creature() {
    let out_path = temp_output_path("nwn_se_edit", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules(
        "fighter.json",
        &[
            "--add-feat",
            "0",
            "--add-feat",
            "6",
            "--remove-feat",
            "40",
            "--output",
            &out,
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote edited creature to"));

    let written = read_json(&out_path);
    assert_eq!(
        written["feats"],
        serde_json::json!([107, 2, 3, 4, 32, 28, 45, 0, 6])
    );
    assert_eq!(written["portrait"], "po_hu_f_99_");
    assert_eq!(written["quickbar"][0]["feat"], 28);

    let _ = fs::remove_file(out_path);
}

#[test]
fn cli_refused_edits_warn_and_leave_feats_alone() {
    let out_path = temp_output_path("nwn_se_refused", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules(
        "fighter.json",
        &[
            "--remove-feat",
            "2",
            "--remove-feat",
            "10",
            "--add-feat",
            "28",
            "--add-feat",
            "9999",
            "--output",
            &out,
        ],
    );
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("feat 2 is granted by race or class"));
    assert!(stderr.contains("feat 10 is not on the creature"));
    assert!(stderr.contains("feat 28 is already on the creature"));
    assert!(stderr.contains("feat 9999 is not in the rule tables"));

    let written = read_json(&out_path);
    assert_eq!(
        written["feats"],
        serde_json::json!([107, 2, 3, 4, 32, 28, 40, 45])
    );

    let _ = fs::remove_file(out_path);
}

#[test]
fn cli_json_output_reflects_edits() {
    let out_path = temp_output_path("nwn_se_json_edit", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules(
        "fighter.json",
        &["--add-feat", "10", "--output", &out, "--json", "--summary"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["summary"]["selected"], 4);
    assert_eq!(json["summary"]["balance_text"], "2 remaining");

    let _ = fs::remove_file(out_path);
}

#[test]
fn cli_set_class_level_rebuilds_expected_count() {
    let out_path = temp_output_path("nwn_se_class", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules(
        "elf_rogue.json",
        &["--set-class", "10:5", "--output", &out, "--json", "--summary"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["level"], 7);
    assert_eq!(json["summary"]["expected"]["class_bonus"], 1);

    let written = read_json(&out_path);
    assert_eq!(written["classes"][1]["level"], 5);

    let _ = fs::remove_file(out_path);
}

#[test]
fn cli_rejects_unknown_class_edit() {
    let out_path = temp_output_path("nwn_se_bad_class", "json");
    let out = out_path.to_string_lossy().to_string();
    let output = run_with_rules("elf_rogue.json", &["--set-class", "77:1", "--output", &out]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!out_path.exists());
}

#[test]
fn cli_accepts_gzip_rules() {
    let rules = fs::read(fixture_path("rules.json")).expect("rules fixture should be readable");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&rules)
        .expect("gzip encoding should succeed");
    let compressed = encoder.finish().expect("gzip encoding should finish");
    let rules_path = temp_output_path("nwn_se_rules", "json.gz");
    fs::write(&rules_path, compressed).expect("compressed rules should be writable");

    let rules_arg = rules_path.to_string_lossy().to_string();
    let output = run_cli(&[
        "--rules",
        &rules_arg,
        &fixture_path("fighter.json"),
        "--json",
        "--summary",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["summary"]["assigned"], 8);

    let _ = fs::remove_file(rules_path);
}

#[test]
fn cli_reports_missing_creature_file() {
    let output = run_with_rules("no_such_creature.json", &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error reading"));
}
