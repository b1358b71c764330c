use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
};

use log::debug;
use serde::Deserialize;

use crate::model::ParseError;

use super::{
    checksum::{ChecksumRecord, ChecksumSet},
    ModuleName,
};

/// The locked dependency manifest: every module of the project with the
/// fingerprint of its locked version.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    #[serde(default)]
    pub modules: Vec<LockedModule>,
}

const VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Sourced from an external dependency manifest.
    Remote,
    /// Authored in the project itself.
    #[default]
    Local,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LockedModule {
    pub name: ModuleName,
    pub checksum: String,
    #[serde(default)]
    pub source: Source,
}

impl LockedModule {
    pub fn is_remote(&self) -> bool {
        self.source == Source::Remote
    }
}

impl LockFile {
    pub fn from_file(file: &Path) -> Result<LockFile, ParseError> {
        debug!("Reading lock file {}", file.display());
        let contents = std::fs::read_to_string(file).map_err(|e| ParseError::io(file, e))?;
        LockFile::from_str(&contents)
    }

    pub fn from_str(s: &str) -> Result<LockFile, ParseError> {
        let mut table = toml::from_str::<toml::Table>(s)?;
        let lock_file = match table.remove("version") {
            Some(toml::Value::Integer(VERSION)) => table.try_into::<LockFile>()?,
            Some(other) => return Err(ParseError::UnsupportedLockFileVersion(other)),
            None => return Err(ParseError::MissingKey("version".to_string())),
        };

        let mut seen = HashSet::new();
        for module in &lock_file.modules {
            if !seen.insert(&module.name) {
                return Err(ParseError::DuplicateModule(module.name.clone()));
            }
        }
        Ok(lock_file)
    }

    /// Fingerprints of every locked module, remote or not.
    pub fn checksums(&self) -> ChecksumSet {
        self.modules
            .iter()
            .map(|module| ChecksumRecord::new(module.name.clone(), module.checksum.clone()))
            .collect()
    }

    pub fn remote_modules(&self) -> BTreeSet<ModuleName> {
        self.modules
            .iter()
            .filter(|module| module.is_remote())
            .map(|module| module.name.clone())
            .collect()
    }
}
