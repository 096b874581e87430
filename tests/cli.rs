//! Command-line tests for the `mojomc` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

// ===== Helpers =====

/// Temporary working directory holding a copy of the sample fixtures.
fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample");
    for relative in ["service.mojom", "base/types.mojom"] {
        let target = dir.path().join("sample").join(relative);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::copy(fixtures.join(relative), target).unwrap();
    }
    dir
}

fn mojomc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mojomc").unwrap();
    cmd.current_dir(dir);
    cmd
}

// ===== compile =====

#[test]
fn compile_selected_generators() {
    let dir = workspace();
    mojomc(dir.path())
        .args(["compile", "sample/**/*.mojom", "-o", "out", "-g", "cpp,js"])
        .assert()
        .success();

    let out = dir.path().join("out");
    assert!(out.join("sample/service.mojom.h").is_file());
    assert!(out.join("sample/service.mojom-internal.h").is_file());
    assert!(out.join("sample/service.mojom.cc").is_file());
    assert!(out.join("sample/service.mojom.js").is_file());
    assert!(out.join("sample/base/types.mojom.js").is_file());
    assert!(!out.join("sample/service_mojom.py").exists());
}

#[test]
fn compile_all_generators_by_default() {
    let dir = workspace();
    mojomc(dir.path())
        .args(["compile", "sample/service.mojom", "-o", "gen"])
        .assert()
        .success();

    let out = dir.path().join("gen");
    assert!(out.join("sample/service.mojom.h").is_file());
    assert!(out.join("sample/service.mojom.js").is_file());
    assert!(out.join("sample/service_mojom.py").is_file());
    assert!(out.join("sample/org/example/sample/Service.java").is_file());
    // Imports are compiled but only roots are generated.
    assert!(!out.join("sample/base/types.mojom.h").exists());

    let header = fs::read_to_string(out.join("sample/service.mojom.h")).unwrap();
    assert!(header.contains("namespace sample {"));
}

#[test]
fn compile_reports_translate_errors() {
    let dir = workspace();
    fs::write(dir.path().join("bad.mojom"), "struct Bad {\n  Missing m;\n};\n").unwrap();

    mojomc(dir.path())
        .args(["compile", "bad.mojom", "sample/service.mojom", "-o", "out", "-g", "js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "bad.mojom:2: error: unresolved type 'Missing' in field 'm' of struct Bad",
        ));

    // The file that compiled still gets its bindings.
    assert!(dir.path().join("out/sample/service.mojom.js").is_file());
    assert!(!dir.path().join("out/bad.mojom.js").exists());
}

#[test]
fn compile_missing_import_path() {
    let dir = workspace();
    fs::create_dir_all(dir.path().join("app")).unwrap();
    fs::write(
        dir.path().join("app/app.mojom"),
        "module app;\nimport \"base/types.mojom\";\nstruct Canvas { array<sample.base.Point> points; };\n",
    )
    .unwrap();

    mojomc(dir.path())
        .args(["compile", "app/app.mojom", "-o", "out", "-g", "python"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot find import 'base/types.mojom'"));

    mojomc(dir.path())
        .args(["compile", "app/app.mojom", "-o", "out", "-g", "python", "-I", "sample"])
        .assert()
        .success();
    assert!(dir.path().join("out/app/app_mojom.py").is_file());
}

#[test]
fn compile_absolute_input_writes_under_output_dir() {
    let dir = workspace();
    let root = fs::canonicalize(dir.path()).unwrap();
    let source = root.join("sample/base/types.mojom");
    let out = root.join("out");

    mojomc(&root)
        .args(["compile", source.to_str().unwrap(), "-o", out.to_str().unwrap(), "-g", "js"])
        .assert()
        .success();

    assert!(out.join("sample/base/types.mojom.js").is_file());
    assert!(!root.join("sample/base/types.mojom.js").exists());
}

#[test]
fn compile_parent_relative_input_writes_under_output_dir() {
    let dir = workspace();
    fs::create_dir_all(dir.path().join("run")).unwrap();

    mojomc(&dir.path().join("run"))
        .args(["compile", "../sample/base/types.mojom", "-o", "out", "-g", "js,cpp"])
        .assert()
        .success();

    let out = dir.path().join("run/out");
    assert!(out.join("types.mojom.js").is_file());
    assert!(out.join("types.mojom.h").is_file());
    assert!(!dir.path().join("sample/base/types.mojom.js").exists());
    assert!(!dir.path().join("run/types.mojom.js").exists());
}

#[test]
fn compile_rejects_unknown_generator() {
    let dir = workspace();
    mojomc(dir.path())
        .args(["compile", "sample/service.mojom", "-g", "rust"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rust"));
}

#[test]
fn compile_with_template_override() {
    let dir = workspace();
    fs::create_dir_all(dir.path().join("tpl/js")).unwrap();
    fs::write(
        dir.path().join("tpl/js/module.js.hbs"),
        "// custom {{module.namespace}}\n",
    )
    .unwrap();

    mojomc(dir.path())
        .args(["compile", "sample/service.mojom", "-o", "out", "-g", "js", "--templates", "tpl"])
        .assert()
        .success();
    let js = fs::read_to_string(dir.path().join("out/sample/service.mojom.js")).unwrap();
    assert_eq!(js, "// custom sample\n");
}

// ===== dump / tokens =====

#[test]
fn dump_prints_module_data() {
    let dir = workspace();
    let output = mojomc(dir.path())
        .args(["dump", "sample/service.mojom"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let data: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(data["namespace"], "sample");
    assert_eq!(data["imports"][0]["namespace"], "sample.base");
    assert_eq!(data["interfaces"][0]["name"], "Service");
}

#[test]
fn dump_reports_parse_errors() {
    let dir = workspace();
    fs::write(dir.path().join("broken.mojom"), "struct Foo {\n  int32 x\n};\n").unwrap();
    mojomc(dir.path())
        .args(["dump", "broken.mojom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.mojom:3:1: error: expected ';', found '}'"));
}

#[test]
fn tokens_lists_positions() {
    let dir = workspace();
    mojomc(dir.path())
        .args(["tokens", "sample/base/types.mojom"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'module'"))
        .stdout(predicate::str::contains("name 'Color'"))
        .stdout(predicate::str::contains("integer 16"));
}
