use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn stmtx() -> Command {
    Command::cargo_bin("stmtx").unwrap()
}

fn filing(entity: &str, year: i32, revenue: &str) -> Value {
    json!({
        "entity_id": entity,
        "fiscal_year": year,
        "period": "annual",
        "format": "html_table",
        "tables": [
            {
                "id": "income",
                "statement": "income",
                "caption": "Consolidated Statements of Operations (In millions)",
                "headers": ["", "2024", "2023"],
                "rows": [
                    {"label_text": "Total revenues", "cells": ["Total revenues", revenue, "900"]},
                    {"label_text": "Total cost of revenues", "cells": ["Total cost of revenues", "600", "550"]},
                    {"label_text": "Net income", "cells": ["Net income", "100", "80"]}
                ]
            },
            {
                "id": "balance",
                "statement": "balance",
                "caption": "Consolidated Balance Sheets (In millions)",
                "rows": [
                    {"label_text": "Total current assets", "cells": ["Total current assets", "500"]},
                    {"label_text": "Total assets", "cells": ["Total assets", "2,000"]},
                    {"label_text": "Total current liabilities", "cells": ["Total current liabilities", "250"]},
                    {"label_text": "Total liabilities", "cells": ["Total liabilities", "1,200"]},
                    {"label_text": "Total stockholders' equity", "cells": ["Total stockholders' equity", "800"]}
                ]
            },
            {
                "id": "cash",
                "statement": "cash_flow",
                "preceding_text": "(in millions)",
                "rows": [
                    {
                        "label_text": "Net cash provided by operating activities",
                        "cells": ["Net cash provided by operating activities", "150"]
                    }
                ]
            }
        ]
    })
}

fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn ratio(report: &Value, name: &str) -> Option<f64> {
    report["ratios"][name].as_str().map(|v| v.parse().unwrap())
}

#[test]
fn test_extract_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("acme.json");
    write_json(&input, &filing("ACME", 2024, "1,000"));

    let output = stmtx().arg("extract").arg(&input).output().unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["key"]["entity_id"], "ACME");
    assert_eq!(report["fields"]["revenue"], "1000000000");
    assert_eq!(report["fields"]["operating_cost"], "600000000");
    assert_eq!(report["fields"]["total_equity"], "800000000");
    assert_eq!(report["decision"], "accept");
    assert_eq!(report["tier"], "extracted");
}

#[test]
fn test_extract_csv_all_periods() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("acme.json");
    write_json(&input, &filing("ACME", 2024, "1,000"));

    stmtx()
        .args(["extract", "--format", "csv", "--all-periods"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("section,name,period,value"))
        .stdout(predicate::str::contains("period,revenue,2023,900000000"));
}

#[test]
fn test_extract_unusable_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.json");
    write_json(&input, &json!({"entity_id": "EMPTY", "fiscal_year": 2024, "tables": []}));

    stmtx()
        .arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no tables"));

    let output = stmtx().args(["extract", "--degrade"]).arg(&input).output().unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["tier"], "degraded");
    assert_eq!(report["decision"]["degrade"], "upstream_failed");
    assert_eq!(report["confidence"], 0.0);
}

#[test]
fn test_extract_missing_input() {
    stmtx()
        .args(["extract", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_with_store() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    write_json(&docs.join("acme_2023.json"), &filing("ACME", 2023, "800"));
    write_json(&docs.join("acme_2024.json"), &filing("ACME", 2024, "1,000"));

    let out = dir.path().join("out");
    let store = dir.path().join("store");
    let pattern = format!("{}/*.json", docs.display());

    stmtx()
        .args(["batch", &pattern, "--summary", "-j", "2"])
        .arg("--output-dir")
        .arg(&out)
        .arg("--store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 inserted"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 3);
    assert!(summary.contains("acme_2024.json,success,ACME,2024,annual,accept,extracted"));
    assert!(store.join("ACME_2024_annual.json").exists());

    // 2024 grows over the 2023 filing processed in the same run
    let current = read_json(&out.join("ACME_2024_annual.json"));
    assert_eq!(ratio(&current, "revenue_yoy"), Some(0.25));
    let earliest = read_json(&out.join("ACME_2023_annual.json"));
    assert_eq!(ratio(&earliest, "revenue_yoy"), None);

    // Re-running over the same inputs leaves the store untouched
    stmtx()
        .args(["batch", &pattern, "-j", "2"])
        .arg("--store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 unchanged"));
}

#[test]
fn test_batch_growth_without_store() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    write_json(&docs.join("a_2024.json"), &filing("ACME", 2024, "1,000"));
    write_json(&docs.join("b_2023.json"), &filing("ACME", 2023, "800"));
    write_json(&docs.join("c_2024.json"), &filing("OTHER", 2024, "500"));

    let out = dir.path().join("out");
    let pattern = format!("{}/*.json", docs.display());

    for jobs in ["1", "4"] {
        stmtx()
            .args(["batch", &pattern, "-j", jobs])
            .arg("--output-dir")
            .arg(&out)
            .assert()
            .success();

        let acme = read_json(&out.join("ACME_2024_annual.json"));
        assert_eq!(ratio(&acme, "revenue_yoy"), Some(0.25), "jobs={}", jobs);
        let other = read_json(&out.join("OTHER_2024_annual.json"));
        assert_eq!(ratio(&other, "revenue_yoy"), None, "jobs={}", jobs);
    }
}

#[test]
fn test_batch_all_periods() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    write_json(&docs.join("acme.json"), &filing("ACME", 2024, "1,000"));

    let out = dir.path().join("out");
    let pattern = format!("{}/*.json", docs.display());

    stmtx()
        .args(["batch", &pattern, "--all-periods"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();

    let output = read_json(&out.join("ACME_2024_annual.json"));
    assert_eq!(output["report"]["key"]["entity_id"], "ACME");
    assert_eq!(output["periods"]["revenue"][1]["period"], "2023");

    // The config setting applies without the flag
    let config = dir.path().join("config.json");
    let config_str = config.to_str().unwrap();
    stmtx()
        .args(["config", "init", "--output", config_str])
        .assert()
        .success();
    stmtx()
        .args(["--config", config_str, "config", "set", "extraction.mode", "all_periods"])
        .assert()
        .success();

    stmtx()
        .args(["--config", config_str, "batch", &pattern, "--format", "csv"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();

    let csv = fs::read_to_string(out.join("ACME_2024_annual.csv")).unwrap();
    assert!(csv.contains("period,revenue,2023,900000000"));
}

#[test]
fn test_batch_degrade() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    write_json(&docs.join("empty.json"), &json!({"entity_id": "EMPTY", "fiscal_year": 2024, "tables": []}));

    let out = dir.path().join("out");
    let pattern = format!("{}/*.json", docs.display());

    stmtx()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));

    stmtx()
        .args(["batch", &pattern, "--degrade"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 degraded)"));

    let report = read_json(&out.join("EMPTY_2024_annual.json"));
    assert_eq!(report["tier"], "degraded");
    assert_eq!(report["decision"]["degrade"], "upstream_failed");
}

#[test]
fn test_batch_continue_on_error() {
    let dir = tempfile::tempdir().unwrap();
    write_json(&dir.path().join("good.json"), &filing("ACME", 2024, "1,000"));
    fs::write(dir.path().join("bad.json"), "{not json").unwrap();
    let pattern = format!("{}/*.json", dir.path().display());

    stmtx()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));

    stmtx()
        .args(["batch", &pattern, "--continue-on-error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));
}

#[test]
fn test_rules_match() {
    stmtx()
        .args(["rules", "--match", "Total cost of revenues"])
        .assert()
        .success()
        .stdout(predicate::str::contains("operating_cost"));

    stmtx()
        .args(["rules", "--dictionary", "chinese", "--match", "流动资产合计"])
        .assert()
        .success()
        .stdout(predicate::str::contains("current_assets"));

    stmtx()
        .args(["rules", "--match", "Headcount"])
        .assert()
        .failure();
}

#[test]
fn test_rules_json_listing() {
    let output = stmtx()
        .args(["rules", "--statement", "cash-flow", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rules: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!rules.is_empty());
    assert!(rules.iter().any(|r| r["field"] == "operating_cash_flow"));
    assert!(rules.iter().all(|r| r["priority"].is_i64()));
}

#[test]
fn test_config_init_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let path_str = path.to_str().unwrap();

    stmtx()
        .args(["config", "init", "--output", path_str])
        .assert()
        .success();
    assert!(path.exists());

    stmtx()
        .args(["config", "init", "--output", path_str])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    stmtx()
        .args(["--config", path_str, "config", "set", "extraction.dictionary", "chinese"])
        .assert()
        .success();

    stmtx()
        .args(["--config", path_str, "config", "get", "extraction.dictionary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"chinese\""));

    stmtx()
        .args(["--config", path_str, "config", "set", "fallback.min_confidence", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fallback.min_confidence"));

    stmtx()
        .args(["--config", path_str, "config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
