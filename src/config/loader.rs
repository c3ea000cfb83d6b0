use crate::config::schema::{PatchDocument, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Yaml {
        path: Option<PathBuf>,
        source: serde_yaml::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Yaml { path: None, source } => ConfigError::Yaml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read patch file from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Yaml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch file YAML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch file YAML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid patch record ({}): {}", path.display(), source),
                None => write!(f, "invalid patch record: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Yaml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchDocument, ConfigError> {
    let document: PatchDocument =
        serde_yaml::from_str(input).map_err(|source| ConfigError::Yaml { path: None, source })?;
    document
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(document)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchDocument, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}
