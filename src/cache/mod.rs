use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::checksum::ChecksumSet;

const SNAPSHOT_VERSION: i64 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Could not serialize checksum snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("IO error writing checksum snapshot {path}: {source}")]
    IO {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: i64,
    #[serde(default)]
    checksums: ChecksumSet,
}

/// Checksums recorded by the previous successful run.
pub struct ChecksumStore {
    location: PathBuf,
}

impl ChecksumStore {
    pub fn new(location: PathBuf) -> Self {
        ChecksumStore { location }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Loads the previous snapshot. A missing or unreadable snapshot yields an
    /// empty set, which makes every remote module count as changed.
    pub fn load(&self) -> ChecksumSet {
        let contents = match std::fs::read_to_string(&self.location) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(
                    "No checksum snapshot at {}, treating every module as changed",
                    self.location.display()
                );
                return ChecksumSet::new();
            }
            Err(error) => {
                warn!(
                    "Could not read checksum snapshot {}, ignoring it: {error}",
                    self.location.display()
                );
                return ChecksumSet::new();
            }
        };

        match toml::from_str::<Snapshot>(&contents) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => snapshot.checksums,
            Ok(snapshot) => {
                warn!(
                    "Checksum snapshot {} has unsupported version {}, ignoring it",
                    self.location.display(),
                    snapshot.version
                );
                ChecksumSet::new()
            }
            Err(error) => {
                warn!(
                    "Checksum snapshot {} is corrupt, ignoring it: {error}",
                    self.location.display()
                );
                ChecksumSet::new()
            }
        }
    }

    pub fn save(&self, checksums: &ChecksumSet) -> Result<(), CacheError> {
        let contents = toml::to_string_pretty(&Snapshot {
            version: SNAPSHOT_VERSION,
            checksums: checksums.clone(),
        })?;
        crate::fs::write_atomic(&self.location, contents.as_bytes()).map_err(|source| {
            CacheError::IO {
                path: self.location.display().to_string(),
                source,
            }
        })?;
        debug!(
            "Wrote {} checksums to {}",
            checksums.len(),
            self.location.display()
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_file(&self.location) {
            Ok(()) => {
                info!("Removed checksum snapshot {}.", self.location.display());
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(
                    "{} is already removed, nothing to do",
                    self.location.display()
                );
                Ok(())
            }
            Err(source) => Err(CacheError::IO {
                path: self.location.display().to_string(),
                source,
            }),
        }
    }
}
