use thiserror::Error;

use crate::sharding::ShardId;

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Execution error on shard {shard_id}: {message}")]
    ExecutionError { shard_id: ShardId, message: String },

    #[error("Cannot switch to shard {requested} while a transaction is active on shard {active}")]
    ActiveTransaction { active: ShardId, requested: ShardId },

    #[error("Invalid distribution value: {0}")]
    InvalidDistributionValue(String),

    #[error("Unknown parameter type code: {0}")]
    UnknownParameterType(i32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type ShardResult<T> = Result<T, ShardError>;

impl ShardError {
    pub fn connection(message: impl Into<String>) -> Self {
        ShardError::ConnectionError(message.into())
    }

    pub fn execution(shard_id: ShardId, message: impl Into<String>) -> Self {
        ShardError::ExecutionError {
            shard_id,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ShardError::ConfigurationError(message.into())
    }
}

impl serde::Serialize for ShardError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
