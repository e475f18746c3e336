//! Connection seams used by the shard manager
//!
//! `ShardedConnection` is what the manager drives: a single session that is
//! repointed between shards. `ShardDriver` and `ShardSession` are what a
//! pooling connection opens its per-shard sessions through.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::choser::ShardChoser;
use super::shard::{ParameterType, Row, Shard, ShardId};
use crate::error::ShardResult;

/// Snapshot of the sharding configuration held by a connection
#[derive(Clone, Default)]
pub struct ShardParams {
    pub shards: Vec<Shard>,
    pub shard_choser: Option<Arc<dyn ShardChoser>>,
}

impl ShardParams {
    pub fn new(shards: Vec<Shard>, shard_choser: Arc<dyn ShardChoser>) -> Self {
        Self {
            shards,
            shard_choser: Some(shard_choser),
        }
    }

    pub fn contains(&self, shard_id: ShardId) -> bool {
        self.shards.iter().any(|s| s.id == shard_id)
    }
}

impl fmt::Debug for ShardParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardParams")
            .field("shards", &self.shards)
            .field("shard_choser", &self.shard_choser.as_ref().map(|c| c.name()))
            .finish()
    }
}

/// A connection that can be pointed at one shard at a time
#[async_trait]
pub trait ShardedConnection: Send + Sync {
    /// Point the connection at `shard_id` (0 is the global shard)
    async fn connect(&mut self, shard_id: ShardId) -> ShardResult<()>;

    /// Current configuration; read fresh on every call
    fn params(&self) -> ShardParams;

    /// Run a statement against the shard currently connected
    async fn fetch_all(
        &mut self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>>;
}

/// An open session bound to a single shard
#[async_trait]
pub trait ShardSession: Send + Sync {
    async fn fetch_all(
        &mut self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>>;

    async fn begin(&mut self) -> ShardResult<()>;

    async fn commit(&mut self) -> ShardResult<()>;

    async fn rollback(&mut self) -> ShardResult<()>;
}

/// Opens sessions for shards
#[async_trait]
pub trait ShardDriver: Send + Sync {
    async fn open(&self, shard: &Shard) -> ShardResult<Box<dyn ShardSession>>;
}
