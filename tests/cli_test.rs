//! Integration tests for the command-line interface

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn scheme_yaml(name: &str) -> String {
    let mut yaml = format!("scheme: \"{name}\"\nauthor: \"Someone\"\n");
    for i in 0..16 {
        yaml.push_str(&format!("base{i:02X}: \"{:02x}{:02x}{:02x}\"\n", i * 16, i, 255 - i));
    }
    yaml
}

fn write(path: impl AsRef<Path>, content: &str) {
    let path = path.as_ref();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root.join("templates/vim/templates/config.yaml"),
        "default:\n  extension: .vim\n  output: colors\n",
    );
    write(
        root.join("templates/vim/templates/default.mustache"),
        "\" {{scheme-name}}\nlet s:gui00 = \"{{base00-hex}}\"\n",
    );
    write(root.join("schemes/test/mocha.yaml"), &scheme_yaml("Mocha"));
    write(root.join("schemes/test/monokai.yaml"), &scheme_yaml("Monokai"));
    temp_dir
}

fn cli(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("base16-builder").unwrap();
    cmd.arg("--root").arg(root).env_remove("BASE16_BUILDER_ROOT");
    cmd
}

#[test]
fn test_build_command() {
    let workspace = create_workspace();

    cli(workspace.path())
        .arg("build")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Built 2 of 2 files"));

    let vim = fs::read_to_string(workspace.path().join("output/vim/colors/base16-mocha.vim")).unwrap();
    assert_eq!(vim, "\" Mocha\nlet s:gui00 = \"0000ff\"\n");
}

#[test]
fn test_build_twice_exits_with_warnings() {
    let workspace = create_workspace();
    cli(workspace.path()).arg("build").assert().code(0);

    cli(workspace.path())
        .args(["build", "-s", "mocha"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 overwritten"));
}

#[test]
fn test_build_with_output_and_restrictions() {
    let workspace = create_workspace();
    let output = workspace.path().join("custom-out");

    cli(workspace.path())
        .args(["build", "-t", "vim", "-s", "mon*", "-o"])
        .arg(&output)
        .assert()
        .success();

    assert!(output.join("vim/colors/base16-monokai.vim").is_file());
    assert!(!output.join("vim/colors/base16-mocha.vim").exists());
}

#[test]
fn test_build_without_resources_is_fatal() {
    let empty = TempDir::new().unwrap();

    cli(empty.path())
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Necessary resources for building"));
}

#[test]
fn test_inject_command() {
    let workspace = create_workspace();
    let target = workspace.path().join("vimrc");
    write(
        &target,
        "set number\n\" %%base16_template: vim%%\n\" %%base16_template_end%%\nsyntax on\n",
    );

    cli(workspace.path())
        .args(["inject", "-s", "monokai", "-f"])
        .arg(&target)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Injected"));

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "set number\n\" %%base16_template: vim%%\n\" Monokai\nlet s:gui00 = \"0000ff\"\n\" %%base16_template_end%%\nsyntax on\n"
    );
}

#[test]
fn test_inject_ambiguous_scheme_is_fatal() {
    let workspace = create_workspace();
    let target = workspace.path().join("vimrc");
    write(&target, "\" %%base16_template: vim%%\n\" %%base16_template_end%%\n");

    cli(workspace.path())
        .args(["inject", "-s", "mo*", "-f"])
        .arg(&target)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("matches more than one scheme"));
}

#[test]
fn test_inject_without_markers_is_partial_failure() {
    let workspace = create_workspace();
    let good = workspace.path().join("good");
    let bad = workspace.path().join("bad");
    write(&good, "\" %%base16_template: vim%%\n\" %%base16_template_end%%\n");
    write(&bad, "no markers\n");

    cli(workspace.path())
        .args(["inject", "-s", "mocha", "-f"])
        .arg(&good)
        .arg("-f")
        .arg(&bad)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("has no valid injection marker lines"));

    assert_eq!(fs::read_to_string(&bad).unwrap(), "no markers\n");
}

#[test]
fn test_inject_requires_file() {
    let workspace = create_workspace();
    cli(workspace.path())
        .args(["inject", "-s", "mocha"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--file"));
}
