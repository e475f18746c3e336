//! Shard manager
//!
//! Keeps track of the distribution value currently in scope, repoints the
//! underlying connection to the shard owning it, and fans queries out to
//! every configured shard.

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use super::connection::{ShardParams, ShardedConnection};
use super::pooling::PoolingShardConnection;
use super::shard::{DistributionValue, ParameterType, Row, Shard, ShardId, GLOBAL_SHARD_ID};
use crate::error::{ShardError, ShardResult};

/// Which target the manager last pointed the connection at
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoutingState {
    /// Nothing selected, or the last target was lost
    #[default]
    Unselected,
    /// Pointed at the global shard
    Global,
    /// Pointed at `shard_id`, resolved from `value` when it was selected
    Shard {
        value: DistributionValue,
        shard_id: ShardId,
    },
}

impl RoutingState {
    pub fn distribution_value(&self) -> Option<&DistributionValue> {
        match self {
            RoutingState::Shard { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Shard the connection is pointed at in this state
    pub fn target(&self) -> Option<ShardId> {
        match self {
            RoutingState::Unselected => None,
            RoutingState::Global => Some(GLOBAL_SHARD_ID),
            RoutingState::Shard { shard_id, .. } => Some(*shard_id),
        }
    }
}

/// Routes operations to shards through a single repointable connection.
///
/// Every operation holds the connection lock for its whole duration, so a
/// repoint and the statements that follow it are never interleaved with
/// another caller's.
pub struct ShardManager<C: ShardedConnection> {
    conn: Mutex<C>,
    state: parking_lot::RwLock<RoutingState>,
}

impl<C: ShardedConnection> ShardManager<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn: Mutex::new(conn),
            state: parking_lot::RwLock::new(RoutingState::Unselected),
        }
    }

    /// Point the connection at the global shard
    pub async fn select_global(&self) -> ShardResult<()> {
        let mut conn = self.conn.lock().await;
        conn.connect(GLOBAL_SHARD_ID).await?;
        *self.state.write() = RoutingState::Global;
        tracing::debug!("Selected global shard");
        Ok(())
    }

    /// Point the connection at the shard that owns `value`
    pub async fn select_shard(&self, value: impl Into<DistributionValue>) -> ShardResult<()> {
        let value = value.into();
        let mut conn = self.conn.lock().await;

        let params = conn.params();
        let choser = params
            .shard_choser
            .ok_or_else(|| ShardError::configuration("no shard choser configured"))?;

        let shard_id = choser.pick_shard(&value, &params.shards)?;
        conn.connect(shard_id).await?;

        tracing::debug!(
            "Selected shard {} for distribution value {} ({} choser)",
            shard_id,
            value,
            choser.name()
        );
        *self.state.write() = RoutingState::Shard { value, shard_id };
        Ok(())
    }

    /// The value given to the last successful `select_shard`, if it is still in effect
    pub fn current_distribution_value(&self) -> Option<DistributionValue> {
        self.state.read().distribution_value().cloned()
    }

    pub fn state(&self) -> RoutingState {
        self.state.read().clone()
    }

    /// Shards as currently configured on the connection
    pub async fn shards(&self) -> Vec<Shard> {
        self.conn.lock().await.params().shards
    }

    /// Run `statement` on every shard in configured order and concatenate the rows.
    ///
    /// The first connect or execute failure aborts the whole call. Afterwards
    /// the connection is pointed back at the shard selected before (the id
    /// resolved at selection time, the chooser is not consulted again). If
    /// that repoint fails the manager drops to `Unselected`; rows already
    /// collected are still returned.
    pub async fn query_all(
        &self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        let mut conn = self.conn.lock().await;
        let shards = conn.params().shards;
        let target = self.state.read().target();

        let mut rows = Vec::new();
        for shard in &shards {
            tracing::debug!("query_all: connecting to shard {}", shard.id);
            let result = match conn.connect(shard.id).await {
                Ok(()) => conn.fetch_all(statement, params, types).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(shard_rows) => {
                    tracing::debug!(
                        "query_all: shard {} returned {} rows",
                        shard.id,
                        shard_rows.len()
                    );
                    rows.extend(shard_rows);
                }
                Err(e) => {
                    tracing::warn!("query_all: shard {} failed: {}", shard.id, e);
                    self.return_to(&mut conn, target).await;
                    return Err(e);
                }
            }
        }

        // Skip the return when nothing moved or the last shard is the target
        if let Some(last) = shards.last() {
            if target.is_some_and(|t| t != last.id) {
                self.return_to(&mut conn, target).await;
            }
        }

        tracing::info!(
            "query_all: {} rows from {} shards",
            rows.len(),
            shards.len()
        );
        Ok(rows)
    }

    /// Exclusive access to the connection, e.g. to run statements on the
    /// shard selected last
    pub async fn connection(&self) -> MutexGuard<'_, C> {
        self.conn.lock().await
    }

    pub fn into_inner(self) -> C {
        self.conn.into_inner()
    }

    async fn return_to(&self, conn: &mut C, target: Option<ShardId>) {
        let Some(target) = target else {
            return;
        };
        if let Err(e) = conn.connect(target).await {
            tracing::warn!("query_all: could not return to shard {}: {}", target, e);
            *self.state.write() = RoutingState::Unselected;
        }
    }
}

impl ShardManager<PoolingShardConnection> {
    /// Replace the shard configuration of the pooled connection.
    ///
    /// When the shard the manager was pointed at is no longer connected
    /// afterwards, the routing state drops to `Unselected`.
    pub async fn set_params(&self, params: ShardParams) -> ShardResult<()> {
        let mut conn = self.conn.lock().await;
        conn.set_params(params)?;

        let target = self.state.read().target();
        if target.is_some() && conn.active_shard_id() != target {
            tracing::debug!("Active shard removed by reconfiguration, routing reset");
            *self.state.write() = RoutingState::Unselected;
        }
        Ok(())
    }
}
