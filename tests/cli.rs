use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const TENANT: &str = r#"{
  "totalCount": "1",
  "imdata": [
    {"fvTenant": {"attributes": {"name": "Acme", "dn": "uni/tn-Acme"}, "children": [
      {"fvAp": {"attributes": {"name": "web"}, "children": [
        {"fvAEPg": {"attributes": {"name": "frontend"}}}
      ]}},
      {"fvBD": {"attributes": {"name": "BD_1"}}},
      {"fvBD": {"attributes": {"name": "BD_2", "status": "created"}}}
    ]}}
  ]
}"#;

fn write_fixture(dir: &Path) -> Result<std::path::PathBuf, Box<dyn Error>> {
    let file = dir.join("tenant.json");
    fs::write(&file, TENANT)?;
    Ok(file)
}

fn read_json(path: &Path) -> Result<serde_json::Value, Box<dyn Error>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn summary_lists_hierarchy() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["summary", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[0] fvTenant: Acme")
                .and(predicate::str::contains("  [0/0] fvAp: web"))
                .and(predicate::str::contains("    [0/0/0] fvAEPg: frontend"))
                .and(predicate::str::contains("[0/2] fvBD: BD_2 (status: created)")),
        );

    Command::cargo_bin("apic-tree")?
        .args(["summary", file.to_str().unwrap(), "--max-depth", "1", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"json_path\": \"$.imdata[0].fvTenant.children[1]\"")
            .and(predicate::str::contains("frontend").not()));
    Ok(())
}

#[test]
fn find_prints_repackaged_fragment() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    let output = Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvBD", "--name", "BD_1, BD_2"])
        .output()?;
    assert!(output.status.success());

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(doc["totalCount"], "1");
    let tenant = &doc["imdata"][0]["fvTenant"];
    assert_eq!(tenant["attributes"]["name"], "Acme");
    let children = tenant["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["fvBD"]["attributes"]["name"], "BD_1");
    assert_eq!(children[1]["fvBD"]["attributes"]["name"], "BD_2");
    Ok(())
}

#[test]
fn find_marks_status_and_saves_fragment() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;
    let out = dir.path().join("exports").join("bd.json");

    Command::cargo_bin("apic-tree")?
        .args([
            "find",
            file.to_str().unwrap(),
            "--type",
            "fvBD",
            "--name",
            "BD_1",
            "--set-status",
            "deleted",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("已保存到"));

    let doc = read_json(&out)?;
    assert_eq!(doc["imdata"][0]["fvTenant"]["children"][0]["fvBD"]["attributes"]["status"], "deleted");
    // 未指定 --save 时源文件不变
    assert_eq!(fs::read_to_string(&file)?, TENANT);
    Ok(())
}

#[test]
fn find_save_writes_back_whole_document() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvBD", "--name", "BD_2", "--clear-status", "--save"])
        .assert()
        .success();

    let doc = read_json(&file)?;
    let children = &doc["imdata"][0]["fvTenant"]["children"];
    assert!(children[2]["fvBD"]["attributes"].get("status").is_none());
    assert_eq!(children[0]["fvAp"]["children"][0]["fvAEPg"]["attributes"]["name"], "frontend");
    Ok(())
}

#[test]
fn find_by_type_alone_matches_every_object_of_the_class() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;
    let out = dir.path().join("all_bd.json");

    Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvBD", "--set-status", "deleted", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("找到 2 个类型为 'fvBD' 的对象"));

    let doc = read_json(&out)?;
    let children = doc["imdata"][0]["fvTenant"]["children"].as_array().unwrap();
    let names: Vec<&str> = children
        .iter()
        .map(|c| c["fvBD"]["attributes"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["BD_1", "BD_2"]);
    assert!(children.iter().all(|c| c["fvBD"]["attributes"]["status"] == "deleted"));

    Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvAEPg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"frontend\""));

    Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvCtx"])
        .assert()
        .code(3);
    Ok(())
}

#[test]
fn find_without_matches_exits_with_empty_code() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["find", file.to_str().unwrap(), "--type", "fvBD", "--name", "missing"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn extract_by_paths_and_children() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;
    let out = dir.path().join("fragment.json");

    Command::cargo_bin("apic-tree")?
        .args(["extract", file.to_str().unwrap(), "--paths", "0/2,0/0/0", "--output", out.to_str().unwrap()])
        .assert()
        .success();
    let doc = read_json(&out)?;
    let children = doc["imdata"][0]["fvTenant"]["children"].as_array().unwrap();
    assert_eq!(children[0]["fvBD"]["attributes"]["name"], "BD_2");
    assert_eq!(children[1]["fvAEPg"]["attributes"]["name"], "frontend");

    Command::cargo_bin("apic-tree")?
        .args(["extract", file.to_str().unwrap(), "--children", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"BD_1\"").and(predicate::str::contains("BD_2").not()));

    Command::cargo_bin("apic-tree")?
        .args(["extract", file.to_str().unwrap(), "--children", "7"])
        .assert()
        .code(3);
    Ok(())
}

#[test]
fn status_updates_source_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["status", file.to_str().unwrap(), "--children", "0,1", "--set", "modified-created"])
        .assert()
        .success();

    let doc = read_json(&file)?;
    let children = &doc["imdata"][0]["fvTenant"]["children"];
    assert_eq!(children[0]["fvAp"]["attributes"]["status"], "modified, created");
    assert_eq!(children[1]["fvBD"]["attributes"]["status"], "modified, created");
    assert_eq!(children[2]["fvBD"]["attributes"]["status"], "created");
    Ok(())
}

#[test]
fn status_partial_failure_keeps_valid_targets() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;
    let out = dir.path().join("out.json");

    Command::cargo_bin("apic-tree")?
        .args([
            "status",
            file.to_str().unwrap(),
            "--paths",
            "0/1,0/9",
            "--set",
            "delete",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("部分目标不存在"));

    let doc = read_json(&out)?;
    assert_eq!(doc["imdata"][0]["fvTenant"]["children"][1]["fvBD"]["attributes"]["status"], "deleted");
    Ok(())
}

#[test]
fn status_rejects_unknown_vocabulary() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["status", file.to_str().unwrap(), "--children", "0", "--set", "archived"])
        .assert()
        .failure();
    assert_eq!(fs::read_to_string(&file)?, TENANT);
    Ok(())
}

#[test]
fn load_errors_distinguish_missing_from_malformed() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("missing.json");

    Command::cargo_bin("apic-tree")?
        .args(["summary", missing.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("文件不存在").and(predicate::str::contains("重新选择")));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{\"imdata\": [")?;
    Command::cargo_bin("apic-tree")?
        .args(["summary", broken.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("修正文件内容"));
    Ok(())
}

#[test]
fn streaming_flag_loads_same_document() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = write_fixture(dir.path())?;

    Command::cargo_bin("apic-tree")?
        .args(["--streaming", "summary", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("fvAEPg: frontend"));

    Command::cargo_bin("apic-tree")?
        .args(["summary", file.to_str().unwrap(), "--stream-threshold", "0", "-v"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Streaming"));
    Ok(())
}
