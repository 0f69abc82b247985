#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn forge(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("forge").unwrap();
    cmd.current_dir(dir.path()).env("FORGE_ROOT", dir.path());
    cmd
}

fn init_workspace(dir: &TempDir) {
    forge(dir).arg("init").assert().success();
}

fn create_project(dir: &TempDir, id: &str) {
    forge(dir)
        .args(["project", "create", "Bakery Shelf", "--owner", "ana", "--id", id])
        .assert()
        .success();
}

fn write_doc(dir: &TempDir, name: &str, doc: &serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    path
}

fn full_idea() -> serde_json::Value {
    serde_json::json!({
        "problem": {
            "statement": "Independent bakeries lose a large share of weekend orders because customers \
                cannot see what is still in stock, phone lines are busy during the morning rush, and \
                staff spend hours reconciling handwritten preorder lists against the ovens. The result \
                is wasted dough, missed sales and frustrated regular customers who drift to chains.",
            "target_users": ["bakery owners", "counter staff", "regular customers"],
            "pain_points": [
                "no live stock visibility",
                "phone preorders collide during the rush",
                "manual reconciliation of preorder lists"
            ]
        },
        "value_proposition": "A shared live shelf that lets customers reserve fresh items in seconds \
            while the bakery plans each bake from real demand.",
        "market": {
            "competitors": [
                {"name": "Generic POS add-ons", "weakness": "no preorder flow"},
                {"name": "Delivery marketplaces", "weakness": "high commission"},
                {"name": "Spreadsheets", "weakness": "no customer access"}
            ],
            "size": "Roughly 60k independent bakeries across the EU",
            "differentiators": ["live shelf", "bake planning from reservations"]
        },
        "feasibility": {
            "constraints": ["small budget", "must run on a tablet at the counter"],
            "resources": "Two developers and one designer for three months",
            "risks": ["adoption by older staff", "unreliable shop wifi", "payment provider fees"],
            "timeline": "Pilot with three bakeries after twelve weeks"
        }
    })
}

fn thin_idea() -> serde_json::Value {
    serde_json::json!({ "problem": { "statement": "Bakeries need an app." } })
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

// ---------------------------------------------------------------------------
// forge init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    forge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .forge/config.yaml"));

    assert!(dir.path().join(".forge").is_dir());
    assert!(dir.path().join(".forge/projects").is_dir());
    assert!(dir.path().join(".forge/exports").is_dir());
    assert!(dir.path().join(".forge/config.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    forge(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn commands_fail_before_init() {
    let dir = TempDir::new().unwrap();
    forge(&dir)
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn rejects_unknown_backend() {
    let dir = TempDir::new().unwrap();
    forge(&dir)
        .args(["init", "--backend", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

// ---------------------------------------------------------------------------
// forge project
// ---------------------------------------------------------------------------

#[test]
fn project_create_and_list() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");

    let rows = json_stdout(forge(&dir).args(["--json", "project", "list"]));
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "bakery");
    assert_eq!(rows[0]["current_stage"], "idea");
    assert_eq!(rows[0]["status"], "draft");
}

#[test]
fn project_create_rejects_duplicate_id() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    forge(&dir)
        .args(["project", "create", "Other", "--owner", "ben", "--id", "bakery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn project_list_filters_by_owner() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    forge(&dir)
        .args(["project", "create", "Florist", "--owner", "ben", "--id", "florist"])
        .assert()
        .success();

    let rows = json_stdout(forge(&dir).args(["--json", "project", "list", "--owner", "ben"]));
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["florist"]);
}

#[test]
fn project_show_unknown_fails() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    forge(&dir)
        .args(["project", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project not found: ghost"));
}

// ---------------------------------------------------------------------------
// forge stage
// ---------------------------------------------------------------------------

#[test]
fn complete_full_idea_advances_to_requirements() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &full_idea());

    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--advance", "--file"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("now at requirements"));

    let project = json_stdout(forge(&dir).args(["--json", "project", "show", "bakery"]));
    assert_eq!(project["current_stage"], "requirements");
}

#[test]
fn thin_idea_blocks_the_gate() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &thin_idea());

    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--advance", "--file"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Gate BLOCK"));

    forge(&dir)
        .args(["stage", "advance", "bakery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gate blocked"));
}

#[test]
fn override_records_quality_issue() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &thin_idea());
    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--file"])
        .arg(&doc)
        .assert()
        .success();

    forge(&dir)
        .args([
            "stage", "override", "bakery", "--operator", "lead", "--reason", "pilot deadline",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("gate overridden"));

    let report = json_stdout(forge(&dir).args(["--json", "quality", "report", "bakery"]));
    assert_eq!(report["current_stage"], "requirements");
    let issues = report["open_issues"].as_array().unwrap();
    assert!(issues.iter().any(|i| i["kind"] == "gate_override"));
}

#[test]
fn skipping_a_stage_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &full_idea());
    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--file"])
        .arg(&doc)
        .assert()
        .success();

    forge(&dir)
        .args(["stage", "advance", "bakery", "--to", "technical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid transition"));
}

#[test]
fn assess_does_not_store_the_document() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &full_idea());

    let assessment = json_stdout(
        forge(&dir)
            .args(["--json", "stage", "assess", "bakery", "idea", "--file"])
            .arg(&doc),
    );
    assert!(assessment["overall_score"].as_f64().unwrap() >= 75.0);

    let history = json_stdout(forge(&dir).args(["--json", "quality", "history", "bakery"]));
    assert!(history.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// forge export / artifact
// ---------------------------------------------------------------------------

#[test]
fn export_markdown_to_stdout() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &full_idea());
    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--file"])
        .arg(&doc)
        .assert()
        .success();

    forge(&dir)
        .args(["export", "bakery", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Bakery Shelf"))
        .stdout(predicate::str::contains("## Idea"))
        .stdout(predicate::str::contains("value_proposition"));
}

#[test]
fn export_writes_file_and_records_artifact() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    let doc = write_doc(&dir, "idea.json", &full_idea());
    forge(&dir)
        .args(["stage", "complete", "bakery", "idea", "--file"])
        .arg(&doc)
        .assert()
        .success();

    forge(&dir)
        .args(["export", "bakery", "--format", "json", "--record"])
        .assert()
        .success();
    assert!(dir.path().join(".forge/exports/bakery-export.json").exists());

    let artifacts = json_stdout(
        forge(&dir).args(["--json", "artifact", "list", "bakery", "--kind", "export"]),
    );
    assert_eq!(artifacts.as_array().unwrap().len(), 1);
}

#[test]
fn export_rejects_stage_without_content() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    forge(&dir)
        .args(["export", "bakery", "--stdout", "--stages", "ux"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// forge analyze / config
// ---------------------------------------------------------------------------

#[test]
fn analyze_without_requirements_fails() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_project(&dir, "bakery");
    forge(&dir)
        .args(["analyze", "bakery"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requirements"));
}

#[test]
fn config_validate_warns_about_missing_providers() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    forge(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning]"))
        .stdout(predicate::str::contains("consensus providers"));
}

#[test]
fn invalid_config_is_refused() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    std::fs::write(
        dir.path().join(".forge/config.yaml"),
        "quality:\n  thresholds:\n    idea: { minimum: 90, recommended: 10 }\n",
    )
    .unwrap();

    forge(&dir)
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"))
        .stderr(predicate::str::contains("exceeds recommended"));

    forge(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn redb_backend_round_trips_projects() {
    let dir = TempDir::new().unwrap();
    forge(&dir).args(["init", "--backend", "redb"]).assert().success();
    create_project(&dir, "bakery");

    let project = json_stdout(forge(&dir).args(["--json", "project", "show", "bakery"]));
    assert_eq!(project["owner"], "ana");
    assert!(!dir.path().join(".forge/projects/bakery").exists());
}
