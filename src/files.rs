//! File-set normalization and the per-file patch driver.
//!
//! The patch core operates purely on in-memory buffers; this module owns the
//! boundary around it. A patch run names its targets either as a YAML
//! sequence or as a single comma-separated string, and each normalized path
//! is read whole, patched, and written back atomically. A failed patch never
//! leaves a partially written file behind.

use crate::patch::{PatchError, PatchRequest};
use serde_yaml::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("invalid files value: expected a sequence or a comma-separated string, found {found}")]
    InvalidFileListType { found: &'static str },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("patch failed on {path}: {source}")]
    Patch { path: PathBuf, source: PatchError },
}

/// Whether a driver call applies a patch or reverts one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Apply,
    Revert,
}

/// Result of running one patch against one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FileOutcome should be checked for patched/unchanged"]
pub enum FileOutcome {
    /// The file was edited and rewritten.
    Patched { file: PathBuf },
    /// The pattern produced no edits; the file was left untouched on disk.
    Unchanged { file: PathBuf },
}

impl FileOutcome {
    pub fn file(&self) -> &Path {
        match self {
            FileOutcome::Patched { file } | FileOutcome::Unchanged { file } => file,
        }
    }
}

/// Normalize a `files` value into an ordered list of path strings.
///
/// Accepts a YAML sequence of scalars or a single comma-separated string;
/// any other shape fails with [`FileError::InvalidFileListType`].
pub fn files_from_value(value: &Value) -> Result<Vec<String>, FileError> {
    match value {
        Value::Sequence(items) => items.iter().map(scalar_to_path).collect(),
        Value::String(s) => Ok(split_file_arg(s)),
        other => Err(FileError::InvalidFileListType {
            found: yaml_type_name(other),
        }),
    }
}

/// Split a comma-separated file argument. Segments are trimmed of
/// surrounding whitespace and empty segments are dropped, so
/// `"a.txt, b.txt"` names `a.txt` and `b.txt` rather than a path with a
/// leading space.
pub fn split_file_arg(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_to_path(value: &Value) -> Result<String, FileError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FileError::InvalidFileListType {
            found: yaml_type_name(other),
        }),
    }
}

fn yaml_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Read `path`, run `request` against its contents, and write the result
/// back atomically.
///
/// The edited buffer only reaches disk when the whole patch succeeded; an
/// unchanged buffer (pattern never matched, or nothing to revert) skips the
/// rewrite entirely.
pub fn patch_file_in_place(
    path: &Path,
    request: &PatchRequest,
    action: Action,
) -> Result<FileOutcome, FileError> {
    let contents = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let edited = match action {
        Action::Apply => request.apply(&contents),
        Action::Revert => request.revert(&contents),
    }
    .map_err(|source| FileError::Patch {
        path: path.to_path_buf(),
        source,
    })?;

    if edited == contents {
        return Ok(FileOutcome::Unchanged {
            file: path.to_path_buf(),
        });
    }

    atomic_write(path, edited.as_bytes()).map_err(|source| FileError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(FileOutcome::Patched {
        file: path.to_path_buf(),
    })
}

/// Atomic file write: tempfile in the same directory + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Mode;
    use regex::Regex;

    fn request(pattern: &str, template: &str, mode: Mode) -> PatchRequest {
        PatchRequest::new(Regex::new(pattern).unwrap(), template, mode)
    }

    #[test]
    fn files_from_sequence() {
        let value: Value = serde_yaml::from_str("[a.txt, b.txt]").unwrap();
        assert_eq!(files_from_value(&value).unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn files_from_comma_separated_string() {
        let value = Value::String("a.txt, b.txt,,c.txt".to_string());
        assert_eq!(
            files_from_value(&value).unwrap(),
            vec!["a.txt", "b.txt", "c.txt"]
        );
    }

    #[test]
    fn files_from_sequence_of_numbers_stringifies() {
        let value: Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert_eq!(files_from_value(&value).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn files_from_mapping_is_rejected() {
        let value: Value = serde_yaml::from_str("{a: 1}").unwrap();
        let err = files_from_value(&value).unwrap_err();
        assert!(matches!(
            err,
            FileError::InvalidFileListType { found: "a mapping" }
        ));
    }

    #[test]
    fn files_from_sequence_with_nested_sequence_is_rejected() {
        let value: Value = serde_yaml::from_str("[a.txt, [b.txt]]").unwrap();
        let err = files_from_value(&value).unwrap_err();
        assert!(matches!(err, FileError::InvalidFileListType { .. }));
    }

    #[test]
    fn patch_file_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.txt");
        fs::write(&path, "alpha beta gamma").unwrap();

        let req = request("beta", " extra", Mode::Append);
        let outcome = patch_file_in_place(&path, &req, Action::Apply).unwrap();
        assert!(matches!(outcome, FileOutcome::Patched { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "alpha beta extra gamma"
        );

        let outcome = patch_file_in_place(&path, &req, Action::Revert).unwrap();
        assert!(matches!(outcome, FileOutcome::Patched { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "alpha beta gamma");
    }

    #[test]
    fn no_match_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.txt");
        fs::write(&path, "alpha").unwrap();

        let req = request("delta", "!", Mode::Append);
        let outcome = patch_file_in_place(&path, &req, Action::Apply).unwrap();
        assert!(matches!(outcome, FileOutcome::Unchanged { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "alpha");
    }

    #[test]
    fn failed_patch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.txt");
        fs::write(&path, "alpha beta").unwrap();

        // Template references a group the pattern does not capture.
        let req = request("beta", r"\1", Mode::Append);
        let err = patch_file_in_place(&path, &req, Action::Apply).unwrap_err();
        assert!(matches!(
            err,
            FileError::Patch {
                source: PatchError::Template { .. },
                ..
            }
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "alpha beta");
    }

    #[test]
    fn missing_file_reports_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let req = request("a", "b", Mode::Append);
        let err = patch_file_in_place(&path, &req, Action::Apply).unwrap_err();
        assert!(matches!(err, FileError::Read { .. }));
    }
}
