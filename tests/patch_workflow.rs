//! End-to-end workflow: YAML patch records driving on-disk file edits.

use regex_patcher::config::{load_from_path, load_from_str, ConfigError};
use regex_patcher::files::{patch_file_in_place, Action, FileOutcome};
use regex_patcher::{Mode, PatchDocument};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a workspace with two target files and a patch record.
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(dir.path().join("a.txt"), "alpha beta gamma\n").unwrap();
    fs::write(dir.path().join("b.txt"), "beta beta\n").unwrap();

    fs::write(
        dir.path().join("patch.yml"),
        r#"
regexp: 'beta'
text: ' and a half'
mode: append
global: true
files: a.txt,b.txt
"#,
    )
    .unwrap();

    dir
}

fn patch_all(dir: &Path, doc: &PatchDocument, action: Action) -> Vec<FileOutcome> {
    let request = doc.to_request().unwrap();
    doc.files()
        .unwrap()
        .unwrap()
        .iter()
        .map(|f| patch_file_in_place(&dir.join(f), &request, action).unwrap())
        .collect()
}

#[test]
fn yaml_record_patches_and_reverts_files() {
    let dir = setup_workspace();
    let doc = load_from_path(dir.path().join("patch.yml")).unwrap();

    let outcomes = patch_all(dir.path(), &doc, Action::Apply);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, FileOutcome::Patched { .. })));
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "alpha beta and a half gamma\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "beta and a half beta and a half\n"
    );

    let outcomes = patch_all(dir.path(), &doc, Action::Revert);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, FileOutcome::Patched { .. })));
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "alpha beta gamma\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("b.txt")).unwrap(),
        "beta beta\n"
    );
}

#[test]
fn revert_is_idempotent_on_disk() {
    let dir = setup_workspace();
    let doc = load_from_path(dir.path().join("patch.yml")).unwrap();

    // Never patched: revert must leave both files untouched.
    let outcomes = patch_all(dir.path(), &doc, Action::Revert);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, FileOutcome::Unchanged { .. })));
    assert_eq!(
        fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "alpha beta gamma\n"
    );
}

#[test]
fn call_site_arguments_override_record_fields() {
    let dir = setup_workspace();
    let record = load_from_path(dir.path().join("patch.yml")).unwrap();

    let overrides = PatchDocument {
        text: Some("!".to_string()),
        global: Some(false),
        ..PatchDocument::default()
    };
    let merged = record.merged_under(&overrides);
    let request = merged.to_request().unwrap();
    assert_eq!(request.template, "!");
    assert!(!request.global);
    assert_eq!(request.mode, Mode::Append);

    let path = dir.path().join("a.txt");
    let outcome = patch_file_in_place(&path, &request, Action::Apply).unwrap();
    assert!(matches!(outcome, FileOutcome::Patched { .. }));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "alpha beta! gamma\n"
    );
}

#[test]
fn capture_group_record_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("versions.txt");
    fs::write(&path, "lib v1 app v2\n").unwrap();

    let doc = load_from_str(
        r#"
regexp: 'v(\d+)'
text: ' (was \1)'
mode: append
global: true
"#,
    )
    .unwrap();
    let request = doc.to_request().unwrap();

    let outcome = patch_file_in_place(&path, &request, Action::Apply).unwrap();
    assert!(matches!(outcome, FileOutcome::Patched { .. }));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "lib v1 (was 1) app v2 (was 2)\n"
    );

    let outcome = patch_file_in_place(&path, &request, Action::Revert).unwrap();
    assert!(matches!(outcome, FileOutcome::Patched { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "lib v1 app v2\n");
}

#[test]
fn malformed_yaml_reports_parse_error() {
    let err = load_from_str(": not yaml: [").unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }));
}

#[test]
fn malformed_regexp_reports_validation_error() {
    let err = load_from_str("regexp: '(unclosed'\ntext: x\n").unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn empty_record_reports_validation_error() {
    let err = load_from_str("{}").unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn missing_patch_file_reports_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
