use crate::files::{self, FileError};
use crate::patch::{Mode, PatchRequest};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;

/// One patch record as described in a YAML patch file.
///
/// Every field is optional so a loaded record can be merged under explicit
/// call-site arguments, with the call-site values taking precedence. The
/// merged result must carry at least `regexp` and `text` before it can be
/// turned into a [`PatchRequest`].
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchDocument {
    /// Regular expression locating candidate edit sites.
    #[serde(default)]
    pub regexp: Option<String>,
    /// Template text; may reference capture groups as `\N`.
    #[serde(default)]
    pub text: Option<String>,
    /// append, prepend or replace. Defaults to append.
    #[serde(default)]
    pub mode: Option<Mode>,
    /// Patch all occurrences instead of just the first.
    #[serde(default)]
    pub global: Option<bool>,
    /// Byte position at which scanning begins.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Target files: a sequence of paths or a comma-separated string.
    #[serde(default)]
    pub files: Option<Value>,
}

impl PatchDocument {
    /// Sanity-check a loaded record. Fields may be absent (they can still be
    /// supplied at the call site), but present fields must be well-formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.regexp.is_none()
            && self.text.is_none()
            && self.mode.is_none()
            && self.global.is_none()
            && self.offset.is_none()
            && self.files.is_none()
        {
            issues.push(ValidationIssue::EmptyRecord);
        }

        if let Some(regexp) = &self.regexp {
            if let Err(e) = Regex::new(regexp) {
                issues.push(ValidationIssue::BadRegexp {
                    message: e.to_string(),
                });
            }
        }

        if let Some(value) = &self.files {
            if let Err(e) = files::files_from_value(value) {
                issues.push(ValidationIssue::BadFileList {
                    message: e.to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Overlay this record beneath `overrides`: any field set in `overrides`
    /// wins, anything it leaves out falls back to this record.
    pub fn merged_under(&self, overrides: &PatchDocument) -> PatchDocument {
        PatchDocument {
            regexp: overrides.regexp.clone().or_else(|| self.regexp.clone()),
            text: overrides.text.clone().or_else(|| self.text.clone()),
            mode: overrides.mode.or(self.mode),
            global: overrides.global.or(self.global),
            offset: overrides.offset.or(self.offset),
            files: overrides.files.clone().or_else(|| self.files.clone()),
        }
    }

    /// Normalized target file list, if the record names one.
    pub fn files(&self) -> Result<Option<Vec<String>>, FileError> {
        self.files.as_ref().map(files::files_from_value).transpose()
    }

    /// Build the core request from this record. `mode` defaults to append,
    /// `global` to false and `offset` to 0, matching the patch-file format's
    /// defaults.
    pub fn to_request(&self) -> Result<PatchRequest, ValidationError> {
        let mut issues = Vec::new();

        let pattern = match self.regexp.as_deref() {
            None => {
                issues.push(ValidationIssue::MissingField { field: "regexp" });
                None
            }
            Some(r) => match Regex::new(r) {
                Ok(p) => Some(p),
                Err(e) => {
                    issues.push(ValidationIssue::BadRegexp {
                        message: e.to_string(),
                    });
                    None
                }
            },
        };

        let template = match &self.text {
            None => {
                issues.push(ValidationIssue::MissingField { field: "text" });
                None
            }
            Some(t) => Some(t.clone()),
        };

        match (pattern, template) {
            (Some(pattern), Some(template)) if issues.is_empty() => Ok(PatchRequest {
                pattern,
                template,
                mode: self.mode.unwrap_or(Mode::Append),
                global: self.global.unwrap_or(false),
                offset: self.offset.unwrap_or(0),
            }),
            _ => Err(ValidationError { issues }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRecord,
    MissingField { field: &'static str },
    BadRegexp { message: String },
    BadFileList { message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRecord => write!(f, "patch record defines no fields"),
            ValidationIssue::MissingField { field } => {
                write!(f, "patch record missing required field '{field}'")
            }
            ValidationIssue::BadRegexp { message } => {
                write!(f, "invalid regexp: {message}")
            }
            ValidationIssue::BadFileList { message } => {
                write!(f, "invalid files field: {message}")
            }
        }
    }
}
