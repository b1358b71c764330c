use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "modcache.toml";

/// Settings read from `modcache.toml` in the project root and from
/// `MODCACHE_*` environment variables, the latter taking precedence.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ModcacheConfig {
    pub cache_dir: Option<PathBuf>,
    pub build_target: Option<String>,
    pub family_pattern: Option<String>,
}

impl ModcacheConfig {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(Some(&root.join(CONFIG_FILE_NAME)), None)?;

        Ok(Self {
            cache_dir: raw_config.cache.dir,
            build_target: raw_config.build.target,
            family_pattern: raw_config.family.pattern,
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    build: BuildConfig,
    #[serde(default)]
    family: FamilyConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CacheConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct BuildConfig {
    target: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct FamilyConfig {
    pattern: Option<String>,
}

impl RawConfig {
    fn load(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("MODCACHE")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
