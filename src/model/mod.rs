use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod checksum;
pub mod lock;
pub mod project;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading {path}: {source}")]
    IO {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing TOML key `{0}` while parsing")]
    MissingKey(String),
    #[error("Unsupported lock file version {0}")]
    UnsupportedLockFileVersion(toml::Value),
    #[error("Module `{0}` is listed more than once")]
    DuplicateModule(ModuleName),
    #[error("Target `{0}` is declared more than once")]
    DuplicateTarget(ModuleName),
    #[error("Invalid family pattern `{pattern}`: {reason}")]
    InvalidFamilyPattern { pattern: String, reason: String },
}

impl ParseError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ParseError::IO {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Identifier of a build module, unique within a project.
#[derive(Clone, Hash, Deserialize, Serialize, Debug, PartialEq, Eq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(s: String) -> Self {
        ModuleName(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        ModuleName(s)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        ModuleName(s.to_string())
    }
}

impl std::borrow::Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
