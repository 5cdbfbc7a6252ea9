//! Library-level tests running build and inject against a workspace on disk

use std::path::Path;

use base16_builder::core::{Error, config::Workspace};
use base16_builder::generation::{BuildRequest, JobOutcome, build};
use base16_builder::injection::inject;
use tempfile::TempDir;
use tokio::fs;

const OCEAN: &str = r#"scheme: "Ocean"
author: "Chris Kempson"
base00: "2b303b"
base01: "343d46"
base02: "4f5b66"
base03: "65737e"
base04: "a7adba"
base05: "c0c5ce"
base06: "dfe1e8"
base07: "eff1f5"
base08: "bf616a"
base09: "d08770"
base0A: "ebcb8b"
base0B: "a3be8c"
base0C: "96b5b4"
base0D: "8fa1b3"
base0E: "b48ead"
base0F: "ab7967"
"#;

async fn write(path: impl AsRef<Path>, content: &str) {
    let path = path.as_ref();
    fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    fs::write(path, content).await.unwrap();
}

async fn create_workspace() -> (TempDir, Workspace) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write(
        root.join("templates/xresources/templates/config.yaml"),
        "default:\n  extension: .Xresources\n  output: xresources\n",
    )
    .await;
    write(
        root.join("templates/xresources/templates/default.mustache"),
        "! {{scheme-name}} by {{scheme-author}}\n*background: #{{base00-hex}}\n*foreground: #{{base05-hex}}\n",
    )
    .await;
    write(
        root.join("templates/kitty/templates/config.yaml"),
        "default:\n  extension: .conf\n  output: colors\nraw:\n  extension: .txt\n  output: raw\n",
    )
    .await;
    write(
        root.join("templates/kitty/templates/default.mustache"),
        "background #{{base00-hex}}\nbgr {{base08-hex-bgr}}\n",
    )
    .await;
    write(
        root.join("templates/kitty/templates/raw.mustache"),
        "{{base00-rgb-r}},{{base00-rgb-g}},{{base00-rgb-b}} {{base07-dec-r}}",
    )
    .await;

    write(root.join("schemes/base16-default/ocean.yaml"), OCEAN).await;
    write(
        root.join("schemes/base16-default/eighties.yaml"),
        &OCEAN.replace("Ocean", "Eighties"),
    )
    .await;

    let workspace = Workspace::new(root).unwrap();
    (temp_dir, workspace)
}

#[tokio::test]
async fn test_build_renders_every_scheme_with_every_template() {
    let (_guard, workspace) = create_workspace().await;

    let report = build(&workspace, BuildRequest::default()).await.unwrap();
    assert_eq!(report.schemes, 2);
    assert_eq!(report.templates, 3);
    assert_eq!(report.jobs(), 6);
    assert!(report.is_clean());

    let output = workspace.default_output_dir();
    assert_eq!(
        fs::read_to_string(output.join("xresources/xresources/base16-ocean.Xresources"))
            .await
            .unwrap(),
        "! Ocean by Chris Kempson\n*background: #2b303b\n*foreground: #c0c5ce\n"
    );
    assert_eq!(
        fs::read_to_string(output.join("kitty/colors/base16-eighties.conf"))
            .await
            .unwrap(),
        "background #2b303b\nbgr 6a61bf\n"
    );
    assert_eq!(
        fs::read_to_string(output.join("kitty/raw/base16-ocean.txt"))
            .await
            .unwrap(),
        "43,48,59 0.9372549019607843"
    );
}

#[tokio::test]
async fn test_build_into_custom_output_dir() {
    let (guard, workspace) = create_workspace().await;
    let output = guard.path().join("elsewhere");

    let request = BuildRequest {
        template_groups: vec!["kitty".to_string()],
        scheme_selectors: vec!["oce?n".to_string()],
        output_dir: Some(output.clone()),
        verbose: false,
    };
    let report = build(&workspace, request).await.unwrap();
    assert_eq!(report.jobs(), 2);
    assert!(output.join("kitty/colors/base16-ocean.conf").is_file());
    assert!(!workspace.default_output_dir().exists());
}

#[tokio::test]
async fn test_rebuild_reports_overwrites() {
    let (_guard, workspace) = create_workspace().await;
    build(&workspace, BuildRequest::default()).await.unwrap();

    let report = build(&workspace, BuildRequest::default()).await.unwrap();
    assert_eq!(report.warnings(), 6);
    assert!(
        report
            .records
            .iter()
            .all(|r| matches!(r.outcome, JobOutcome::SuccessWithWarning(_)))
    );
}

#[tokio::test]
async fn test_build_without_schemes_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = Workspace::new(temp_dir.path()).unwrap();
    let result = build(&workspace, BuildRequest::default()).await;
    assert!(matches!(result, Err(Error::NoResources)));
}

#[tokio::test]
async fn test_inject_rewrites_only_marked_region() {
    let (guard, workspace) = create_workspace().await;
    let target = guard.path().join(".Xresources");
    fs::write(
        &target,
        "URxvt.font: xft:Hack:size=10\n! %%base16_template: xresources%%\n*background: #000000\n! %%base16_template_end%%\nURxvt.scrollBar: false\n",
    )
    .await
    .unwrap();

    let report = inject(&workspace, "ocean", &[target.clone()])
        .await
        .unwrap();
    assert!(report.is_clean());

    assert_eq!(
        fs::read_to_string(&target).await.unwrap(),
        "URxvt.font: xft:Hack:size=10\n! %%base16_template: xresources%%\n! Ocean by Chris Kempson\n*background: #2b303b\n*foreground: #c0c5ce\n! %%base16_template_end%%\nURxvt.scrollBar: false\n"
    );

    // injecting again with another scheme replaces the region instead of growing it
    inject(&workspace, "eighties", &[target.clone()])
        .await
        .unwrap();
    let content = fs::read_to_string(&target).await.unwrap();
    assert!(content.contains("! Eighties by"));
    assert!(!content.contains("! Ocean by"));
    assert_eq!(content.lines().count(), 7);
}

#[tokio::test]
async fn test_inject_sub_template_reference() {
    let (guard, workspace) = create_workspace().await;
    let target = guard.path().join("kitty.conf");
    fs::write(
        &target,
        "# %%base16_template: kitty##raw%%\n# %%base16_template_end%%\n",
    )
    .await
    .unwrap();

    inject(&workspace, "ocean", &[target.clone()])
        .await
        .unwrap();
    assert_eq!(
        fs::read_to_string(&target).await.unwrap(),
        "# %%base16_template: kitty##raw%%\n43,48,59 0.9372549019607843\n# %%base16_template_end%%\n"
    );
}

#[tokio::test]
async fn test_inject_unknown_scheme() {
    let (guard, workspace) = create_workspace().await;
    let target = guard.path().join("conf");
    fs::write(&target, "%%base16_template: kitty%%\n%%base16_template_end%%")
        .await
        .unwrap();

    match inject(&workspace, "monokai", &[target]).await {
        Err(Error::PaletteNotFound(selector)) => assert_eq!(selector, "monokai"),
        other => panic!("Expected PaletteNotFound, got {other:?}"),
    }
}
