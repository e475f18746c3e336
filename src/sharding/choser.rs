//! Shard choosing strategies

use super::shard::{DistributionValue, Shard, ShardId};
use crate::error::{ShardError, ShardResult};

/// Maps a distribution value onto one of the configured shards.
///
/// Implementations must be free of side effects. The returned id is not
/// checked against `shards` by the caller; an unknown id surfaces when the
/// connection tries to switch to it.
pub trait ShardChoser: Send + Sync {
    fn pick_shard(&self, value: &DistributionValue, shards: &[Shard]) -> ShardResult<ShardId>;

    /// Short name used in logs and configuration
    fn name(&self) -> &'static str;
}

/// Uses the distribution value itself as the shard id
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughShardChoser;

impl ShardChoser for PassthroughShardChoser {
    fn pick_shard(&self, value: &DistributionValue, _shards: &[Shard]) -> ShardResult<ShardId> {
        value
            .as_shard_id()
            .ok_or_else(|| ShardError::InvalidDistributionValue(value.to_string()))
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Always routes to the same shard
#[derive(Debug, Clone, Copy)]
pub struct StaticShardChoser {
    shard_id: ShardId,
}

impl StaticShardChoser {
    pub fn new(shard_id: ShardId) -> Self {
        Self { shard_id }
    }
}

impl ShardChoser for StaticShardChoser {
    fn pick_shard(&self, _value: &DistributionValue, _shards: &[Shard]) -> ShardResult<ShardId> {
        Ok(self.shard_id)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Hashes the value with seahash and picks the shard at that position
///
/// seahash spreads small modulo ranges (like shard counts) much more evenly
/// than DefaultHasher.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashShardChoser;

impl HashShardChoser {
    pub fn position(value: &DistributionValue, num_shards: usize) -> usize {
        if num_shards == 0 {
            return 0;
        }
        let hash = seahash::hash(value.to_string().as_bytes());
        (hash % num_shards as u64) as usize
    }
}

impl ShardChoser for HashShardChoser {
    fn pick_shard(&self, value: &DistributionValue, shards: &[Shard]) -> ShardResult<ShardId> {
        if shards.is_empty() {
            return Err(ShardError::configuration(
                "hash shard choser needs at least one shard",
            ));
        }
        Ok(shards[Self::position(value, shards.len())].id)
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
