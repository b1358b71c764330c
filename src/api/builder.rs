use std::{env, error::Error, path::PathBuf};

use crate::{
    cache::ChecksumStore,
    config::ModcacheConfig,
    graph::policy::{FamilyPolicy, HyphenPrefix, PatternPolicy},
    model::ModuleName,
    Modcache,
};

const DEFAULT_LOCK_FILE_NAME: &str = "modcache.lock";
const DEFAULT_PROJECT_FILE_NAME: &str = "project.toml";
const DEFAULT_CACHE_DIRECTORY_NAME: &str = ".modcache";
const DEFAULT_BUILD_TARGET: &str = "RemoteModules";
const SNAPSHOT_FILE_NAME: &str = "checksums.toml";

#[derive(Default)]
pub struct ModcacheBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    lock_file_name: Option<PathBuf>,
    project_file_name: Option<PathBuf>,
    cache_directory_path: Option<PathBuf>,
    build_target: Option<String>,
    family_pattern: Option<String>,
    policy: Option<Box<dyn FamilyPolicy>>,
}

impl ModcacheBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the lock file listing every module with its checksum.
    ///
    /// Defaults to `modcache.lock`.
    pub fn lock_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file_name = Some(path.into());
        self
    }

    /// Name of the project descriptor declaring the build targets.
    ///
    /// Defaults to `project.toml`.
    pub fn project_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_file_name = Some(path.into());
        self
    }

    /// Location of the directory holding the checksum snapshot.
    ///
    /// Defaults to `.modcache` in the project root.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory_path = Some(path.into());
        self
    }

    /// Name of the synthesized aggregate target.
    ///
    /// Defaults to `RemoteModules`.
    pub fn build_target(mut self, name: impl Into<String>) -> Self {
        self.build_target = Some(name.into());
        self
    }

    /// Regular expression with a `family` capture group used to classify
    /// module names. Without it the family is the first hyphen-delimited segment.
    pub fn family_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.family_pattern = Some(pattern.into());
        self
    }

    /// Custom classification policy; takes precedence over `family_pattern`.
    pub fn policy(mut self, policy: impl FamilyPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn try_build(self) -> Result<Modcache, Box<dyn Error>> {
        let Self {
            root,
            lock_file_name,
            project_file_name,
            cache_directory_path,
            build_target,
            family_pattern,
            policy,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let config = ModcacheConfig::load(&root)?;

        let lock_file_name =
            lock_file_name.unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_FILE_NAME));

        let project_file_name =
            project_file_name.unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_FILE_NAME));

        let cache_directory = root.join(
            cache_directory_path
                .or(config.cache_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY_NAME)),
        );

        let build_target = ModuleName::new(
            build_target
                .or(config.build_target)
                .unwrap_or_else(|| DEFAULT_BUILD_TARGET.to_string()),
        );

        let policy: Box<dyn FamilyPolicy> = match (policy, family_pattern.or(config.family_pattern)) {
            (Some(policy), _) => policy,
            (None, Some(pattern)) => Box::new(PatternPolicy::new(&pattern)?),
            (None, None) => Box::new(HyphenPrefix),
        };

        Ok(Modcache {
            root,
            lock_file_name,
            project_file_name,
            store: ChecksumStore::new(cache_directory.join(SNAPSHOT_FILE_NAME)),
            build_target,
            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let modcache = Modcache::builder().root(dir.path()).try_build().unwrap();

        assert_eq!(modcache.lock_file_path(), dir.path().join("modcache.lock"));
        assert_eq!(modcache.project_file_path(), dir.path().join("project.toml"));
        assert_eq!(
            modcache.checksum_store().location(),
            dir.path().join(".modcache").join("checksums.toml")
        );
    }

    #[test]
    fn config_file_fills_unset_options() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("modcache.toml"),
            "[cache]\ndir = \"build/cache\"\n\n[build]\ntarget = \"FromConfig\"\n",
        )
        .unwrap();

        let modcache = Modcache::builder()
            .root(dir.path())
            .build_target("FromBuilder")
            .try_build()
            .unwrap();

        assert_eq!(modcache.build_target().as_str(), "FromBuilder");
        assert_eq!(
            modcache.checksum_store().location(),
            dir.path().join("build/cache").join("checksums.toml")
        );
    }

    #[test]
    fn invalid_family_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let result = Modcache::builder()
            .root(dir.path())
            .family_pattern("no-group")
            .try_build();
        assert!(result.is_err());
    }
}
