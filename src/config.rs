//! Sharding configuration
//!
//! Loaded from `shardgate.toml`:
//!
//! ```toml
//! [global]
//! host = "db-global.internal"
//! dbname = "app"
//!
//! [[shards]]
//! id = 1
//! host = "db-1.internal"
//!
//! [[shards]]
//! id = 2
//! host = "db-2.internal"
//!
//! [choser]
//! kind = "static"
//! shard = 1
//! ```
//!
//! ## Environment Variables
//!
//! - `SHARDGATE_CHOSER` - choser override: `passthrough`, `hash` or `static:<id>`
//! - `SHARDGATE_GLOBAL_HOST` - host of the global shard
//! - `SHARDGATE_GLOBAL_DBNAME` - database name of the global shard
//!
//! These can be set in a `.env` file next to the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ShardError, ShardResult};
use crate::sharding::{
    HashShardChoser, PassthroughShardChoser, Shard, ShardChoser, ShardId, ShardParams,
    StaticShardChoser, GLOBAL_SHARD_ID,
};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "shardgate.toml";

pub const ENV_CHOSER: &str = "SHARDGATE_CHOSER";
pub const ENV_GLOBAL_HOST: &str = "SHARDGATE_GLOBAL_HOST";
pub const ENV_GLOBAL_DBNAME: &str = "SHARDGATE_GLOBAL_DBNAME";

/// Which choser to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChoserConfig {
    Passthrough,
    Static { shard: ShardId },
    Hash,
}

impl ChoserConfig {
    pub fn build(&self) -> Arc<dyn ShardChoser> {
        match self {
            ChoserConfig::Passthrough => Arc::new(PassthroughShardChoser),
            ChoserConfig::Static { shard } => Arc::new(StaticShardChoser::new(*shard)),
            ChoserConfig::Hash => Arc::new(HashShardChoser),
        }
    }

    /// Parse the `SHARDGATE_CHOSER` form
    pub fn parse(s: &str) -> ShardResult<Self> {
        let s = s.trim();
        match s {
            "passthrough" => Ok(ChoserConfig::Passthrough),
            "hash" => Ok(ChoserConfig::Hash),
            _ => {
                let shard = s
                    .strip_prefix("static:")
                    .and_then(|id| id.trim().parse::<ShardId>().ok())
                    .ok_or_else(|| {
                        ShardError::configuration(format!("unknown shard choser '{}'", s))
                    })?;
                Ok(ChoserConfig::Static { shard })
            }
        }
    }
}

/// Connection fields of the global shard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub dbname: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardingConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub shards: Vec<Shard>,
    #[serde(default)]
    pub choser: Option<ChoserConfig>,
}

impl ShardingConfig {
    /// Load `shardgate.toml` from a directory, after loading any `.env`
    /// file found there.
    pub fn load(dir: &Path) -> ShardResult<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(ShardError::configuration(format!(
                "configuration file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::debug!(
            "Loaded {} shards from {}",
            config.shards.len(),
            config_path.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ShardResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup` (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ShardResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(choser) = lookup(ENV_CHOSER).filter(|v| !v.is_empty()) {
            self.choser = Some(ChoserConfig::parse(&choser)?);
        }
        if let Some(host) = lookup(ENV_GLOBAL_HOST).filter(|v| !v.is_empty()) {
            self.global.host = Some(host);
        }
        if let Some(dbname) = lookup(ENV_GLOBAL_DBNAME).filter(|v| !v.is_empty()) {
            self.global.dbname = Some(dbname);
        }
        Ok(())
    }

    /// Shard ids must be unique and must not use the global id
    pub fn validate(&self) -> ShardResult<()> {
        let mut seen = HashSet::new();
        for shard in &self.shards {
            if shard.id == GLOBAL_SHARD_ID {
                return Err(ShardError::configuration(format!(
                    "shard id {} is reserved for the global shard",
                    GLOBAL_SHARD_ID
                )));
            }
            if !seen.insert(shard.id) {
                return Err(ShardError::configuration(format!(
                    "duplicate shard id {}",
                    shard.id
                )));
            }
        }
        Ok(())
    }

    pub fn global_shard(&self) -> Shard {
        Shard {
            id: GLOBAL_SHARD_ID,
            host: self.global.host.clone(),
            port: self.global.port,
            dbname: self.global.dbname.clone(),
            user: self.global.user.clone(),
            password: self.global.password.clone(),
        }
    }

    pub fn params(&self) -> ShardParams {
        ShardParams {
            shards: self.shards.clone(),
            shard_choser: self.choser.as_ref().map(ChoserConfig::build),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[global]
host = "global.internal"
dbname = "app"

[[shards]]
id = 1
host = "one.internal"

[[shards]]
id = 2
host = "two.internal"
port = 5433

[choser]
kind = "static"
shard = 1
"#;

    #[test]
    fn test_parse_sample() {
        let config = ShardingConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.shards.len(), 2);
        assert_eq!(config.shards[1].port, Some(5433));
        assert_eq!(config.choser, Some(ChoserConfig::Static { shard: 1 }));

        let global = config.global_shard();
        assert!(global.is_global());
        assert_eq!(global.host.as_deref(), Some("global.internal"));

        let params = config.params();
        let choser = params.shard_choser.unwrap();
        assert_eq!(choser.name(), "static");
        assert_eq!(choser.pick_shard(&10.into(), &params.shards).unwrap(), 1);
    }

    #[test]
    fn test_missing_choser_yields_none() {
        let config = ShardingConfig::from_toml_str("[[shards]]\nid = 1\n").unwrap();
        assert!(config.params().shard_choser.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ShardingConfig::from_toml_str("[[shards]]\nid = \"one\""),
            Err(ShardError::TomlError(_))
        ));
    }

    #[test]
    fn test_validate() {
        let config = ShardingConfig::from_toml_str("[[shards]]\nid = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ShardError::ConfigurationError(_))));

        let config =
            ShardingConfig::from_toml_str("[[shards]]\nid = 1\n[[shards]]\nid = 1\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_choser_parse() {
        assert_eq!(ChoserConfig::parse("hash").unwrap(), ChoserConfig::Hash);
        assert_eq!(
            ChoserConfig::parse(" passthrough ").unwrap(),
            ChoserConfig::Passthrough
        );
        assert_eq!(
            ChoserConfig::parse("static:4").unwrap(),
            ChoserConfig::Static { shard: 4 }
        );
        assert!(ChoserConfig::parse("static:x").is_err());
        assert!(ChoserConfig::parse("range").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = ShardingConfig::from_toml_str(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_CHOSER, "hash"),
            (ENV_GLOBAL_HOST, "override.internal"),
            (ENV_GLOBAL_DBNAME, ""),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.choser, Some(ChoserConfig::Hash));
        assert_eq!(config.global.host.as_deref(), Some("override.internal"));
        assert_eq!(config.global.dbname.as_deref(), Some("app"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let config = ShardingConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.shards.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        assert!(matches!(
            ShardingConfig::load(dir.path()),
            Err(ShardError::ConfigurationError(_))
        ));
    }
}
