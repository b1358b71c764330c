use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::ModuleName;

/// Content fingerprint of a module's locked version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct ChecksumRecord {
    pub name: ModuleName,
    pub fingerprint: String,
}

impl ChecksumRecord {
    pub fn new(name: impl Into<ModuleName>, fingerprint: impl Into<String>) -> Self {
        ChecksumRecord {
            name: name.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// A set of checksum records holding at most one fingerprint per module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumSet {
    fingerprints: BTreeMap<ModuleName, String>,
}

impl ChecksumSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning the fingerprint it replaced.
    pub fn insert(&mut self, record: ChecksumRecord) -> Option<String> {
        self.fingerprints.insert(record.name, record.fingerprint)
    }

    pub fn fingerprint(&self, name: &str) -> Option<&str> {
        self.fingerprints.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fingerprints.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Keeps only the records whose module is in `names`.
    pub fn restricted_to(&self, names: &BTreeSet<ModuleName>) -> ChecksumSet {
        self.fingerprints
            .iter()
            .filter(|(name, _)| names.contains(*name))
            .map(|(name, fingerprint)| (name.clone(), fingerprint.clone()))
            .collect()
    }

    /// Modules whose fingerprint differs from `previous` or is missing there.
    pub fn changed_since(&self, previous: &ChecksumSet) -> BTreeSet<ModuleName> {
        self.fingerprints
            .iter()
            .filter(|(name, fingerprint)| {
                previous.fingerprint(name.as_str()) != Some(fingerprint.as_str())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl FromIterator<(ModuleName, String)> for ChecksumSet {
    fn from_iter<T: IntoIterator<Item = (ModuleName, String)>>(iter: T) -> Self {
        ChecksumSet {
            fingerprints: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<ChecksumRecord> for ChecksumSet {
    fn from_iter<T: IntoIterator<Item = ChecksumRecord>>(iter: T) -> Self {
        iter.into_iter()
            .map(|record| (record.name, record.fingerprint))
            .collect()
    }
}
