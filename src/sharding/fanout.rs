//! Concurrent fan-out across all shards
//!
//! Opens a dedicated session per shard and queries them all at once. No
//! routing state is shared between calls.

use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;

use super::connection::{ShardDriver, ShardSession};
use super::shard::{ParameterType, Row, Shard};
use crate::error::{ShardError, ShardResult};

pub struct ParallelFanOut {
    driver: Arc<dyn ShardDriver>,
}

impl ParallelFanOut {
    pub fn new(driver: Arc<dyn ShardDriver>) -> Self {
        Self { driver }
    }

    /// Run `statement` on every shard concurrently.
    ///
    /// Rows come back in shard order regardless of completion order. The
    /// first failing shard fails the call and the remaining shard queries
    /// are dropped.
    pub async fn query_all(
        &self,
        shards: &[Shard],
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        let per_shard = shards
            .iter()
            .map(|shard| self.query_shard(shard, statement, params, types));

        let results = try_join_all(per_shard).await.inspect_err(|e| {
            tracing::warn!("Parallel fan-out aborted: {}", e);
        })?;

        let rows: Vec<Row> = results.into_iter().flatten().collect();
        tracing::info!(
            "Parallel fan-out: {} rows from {} shards",
            rows.len(),
            shards.len()
        );
        Ok(rows)
    }

    async fn query_shard(
        &self,
        shard: &Shard,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        let mut session = self.driver.open(shard).await.map_err(|e| match e {
            ShardError::ConnectionError(_) => e,
            other => ShardError::connection(format!("failed to open shard {}: {}", shard.id, other)),
        })?;
        session
            .fetch_all(statement, params, types)
            .await
            .map_err(|e| match e {
                ShardError::ExecutionError { .. } => e,
                other => ShardError::execution(shard.id, other.to_string()),
            })
    }
}
