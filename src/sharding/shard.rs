//! Shard records and the values that flow through routing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ShardError, ShardResult};

/// Identifies a specific shard
pub type ShardId = u32;

/// Reserved id of the unsharded (global) shard
pub const GLOBAL_SHARD_ID: ShardId = 0;

/// A single result row: column name to value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A configured shard. Only `id` matters for routing; the connection
/// fields are handed to the driver untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shard {
    pub id: ShardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Shard {
    pub fn new(id: ShardId) -> Self {
        Self {
            id,
            host: None,
            port: None,
            dbname: None,
            user: None,
            password: None,
        }
    }

    pub fn is_global(&self) -> bool {
        self.id == GLOBAL_SHARD_ID
    }
}

/// Sharding key supplied by callers (tenant id, customer key, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DistributionValue {
    Int(i64),
    Text(String),
}

impl DistributionValue {
    /// Interpret the value as a shard id, if it is one
    pub fn as_shard_id(&self) -> Option<ShardId> {
        match self {
            DistributionValue::Int(v) => ShardId::try_from(*v).ok(),
            DistributionValue::Text(s) => s.trim().parse::<ShardId>().ok(),
        }
    }
}

impl fmt::Display for DistributionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionValue::Int(v) => write!(f, "{}", v),
            DistributionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for DistributionValue {
    fn from(v: i64) -> Self {
        DistributionValue::Int(v)
    }
}

impl From<i32> for DistributionValue {
    fn from(v: i32) -> Self {
        DistributionValue::Int(i64::from(v))
    }
}

impl From<u32> for DistributionValue {
    fn from(v: u32) -> Self {
        DistributionValue::Int(i64::from(v))
    }
}

impl From<&str> for DistributionValue {
    fn from(s: &str) -> Self {
        DistributionValue::Text(s.to_string())
    }
}

impl From<String> for DistributionValue {
    fn from(s: String) -> Self {
        DistributionValue::Text(s)
    }
}

/// Binding type of a statement parameter, using the conventional
/// driver codes (1 = integer, 2 = string, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ParameterType {
    Null,
    Integer,
    String,
    LargeObject,
    Boolean,
}

impl ParameterType {
    pub fn code(self) -> i32 {
        match self {
            ParameterType::Null => 0,
            ParameterType::Integer => 1,
            ParameterType::String => 2,
            ParameterType::LargeObject => 3,
            ParameterType::Boolean => 5,
        }
    }
}

impl TryFrom<i32> for ParameterType {
    type Error = ShardError;

    fn try_from(code: i32) -> ShardResult<Self> {
        match code {
            0 => Ok(ParameterType::Null),
            1 => Ok(ParameterType::Integer),
            2 => Ok(ParameterType::String),
            3 => Ok(ParameterType::LargeObject),
            5 => Ok(ParameterType::Boolean),
            other => Err(ShardError::UnknownParameterType(other)),
        }
    }
}

impl From<ParameterType> for i32 {
    fn from(t: ParameterType) -> Self {
        t.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_value_as_shard_id() {
        assert_eq!(DistributionValue::from(10).as_shard_id(), Some(10));
        assert_eq!(DistributionValue::from("7").as_shard_id(), Some(7));
        assert_eq!(DistributionValue::from(-1).as_shard_id(), None);
        assert_eq!(DistributionValue::from("tenant-a").as_shard_id(), None);
    }

    #[test]
    fn test_distribution_value_untagged_serde() {
        let v: DistributionValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, DistributionValue::Int(42));
        let v: DistributionValue = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(v, DistributionValue::Text("acme".to_string()));
        assert_eq!(v.to_string(), "acme");
    }

    #[test]
    fn test_parameter_type_codes() {
        assert_eq!(ParameterType::try_from(1).unwrap(), ParameterType::Integer);
        assert_eq!(ParameterType::try_from(5).unwrap(), ParameterType::Boolean);
        assert!(matches!(
            ParameterType::try_from(4),
            Err(ShardError::UnknownParameterType(4))
        ));

        let types: Vec<ParameterType> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(types, vec![ParameterType::Integer, ParameterType::String]);
    }

    #[test]
    fn test_shard_deserialize_minimal() {
        let shard: Shard = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert_eq!(shard, Shard::new(3));
        assert!(!shard.is_global());
        assert!(Shard::new(GLOBAL_SHARD_ID).is_global());
    }
}
