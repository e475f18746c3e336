//! Pooling shard connection
//!
//! Keeps one lazily opened session per shard and switches between them on
//! `connect`. Only one session is active at a time.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::connection::{ShardDriver, ShardParams, ShardSession, ShardedConnection};
use super::shard::{ParameterType, Row, Shard, ShardId, GLOBAL_SHARD_ID};
use crate::error::{ShardError, ShardResult};

struct PooledSession {
    session: Box<dyn ShardSession>,
    in_transaction: bool,
}

pub struct PoolingShardConnection {
    driver: Arc<dyn ShardDriver>,
    global: Shard,
    params: ShardParams,
    sessions: HashMap<ShardId, PooledSession>,
    active: Option<ShardId>,
}

impl PoolingShardConnection {
    pub fn new(driver: Arc<dyn ShardDriver>, global: Shard, params: ShardParams) -> Self {
        Self {
            driver,
            global,
            params,
            sessions: HashMap::new(),
            active: None,
        }
    }

    /// Replace the shard configuration. Sessions for shards that are no
    /// longer configured are dropped.
    ///
    /// When wrapped in a [`ShardManager`](super::ShardManager), reconfigure
    /// through `ShardManager::set_params` instead so the routing state is
    /// reset together with a dropped active session.
    pub fn set_params(&mut self, params: ShardParams) -> ShardResult<()> {
        if let Some(active) = self.active {
            if active != GLOBAL_SHARD_ID && !params.contains(active) && self.is_transaction_active() {
                return Err(ShardError::configuration(format!(
                    "cannot remove shard {} while a transaction is active on it",
                    active
                )));
            }
        }

        self.sessions
            .retain(|id, _| *id == GLOBAL_SHARD_ID || params.contains(*id));
        if let Some(active) = self.active {
            if !self.sessions.contains_key(&active) {
                self.active = None;
            }
        }
        self.params = params;
        Ok(())
    }

    pub fn active_shard_id(&self) -> Option<ShardId> {
        self.active
    }

    /// Whether a session to `shard_id` is open in the pool
    pub fn is_connected(&self, shard_id: ShardId) -> bool {
        self.sessions.contains_key(&shard_id)
    }

    pub fn is_transaction_active(&self) -> bool {
        self.active
            .and_then(|id| self.sessions.get(&id))
            .is_some_and(|s| s.in_transaction)
    }

    /// Drop every pooled session
    pub fn close(&mut self) {
        tracing::debug!("Closing {} pooled shard sessions", self.sessions.len());
        self.sessions.clear();
        self.active = None;
    }

    pub async fn begin_transaction(&mut self) -> ShardResult<()> {
        let pooled = self.active_session()?;
        if pooled.in_transaction {
            return Err(ShardError::connection("transaction already active"));
        }
        pooled.session.begin().await?;
        pooled.in_transaction = true;
        Ok(())
    }

    pub async fn commit(&mut self) -> ShardResult<()> {
        let pooled = self.active_session()?;
        if !pooled.in_transaction {
            return Err(ShardError::connection("no active transaction"));
        }
        pooled.session.commit().await?;
        pooled.in_transaction = false;
        Ok(())
    }

    pub async fn rollback(&mut self) -> ShardResult<()> {
        let pooled = self.active_session()?;
        if !pooled.in_transaction {
            return Err(ShardError::connection("no active transaction"));
        }
        pooled.session.rollback().await?;
        pooled.in_transaction = false;
        Ok(())
    }

    fn active_session(&mut self) -> ShardResult<&mut PooledSession> {
        let active = self
            .active
            .ok_or_else(|| ShardError::connection("not connected to any shard"))?;
        self.sessions
            .get_mut(&active)
            .ok_or_else(|| ShardError::connection(format!("no open session for shard {}", active)))
    }

    fn resolve(&self, shard_id: ShardId) -> ShardResult<Shard> {
        if shard_id == GLOBAL_SHARD_ID {
            return Ok(self.global.clone());
        }
        self.params
            .shards
            .iter()
            .find(|s| s.id == shard_id)
            .cloned()
            .ok_or_else(|| ShardError::connection(format!("unknown shard id {}", shard_id)))
    }
}

#[async_trait]
impl ShardedConnection for PoolingShardConnection {
    async fn connect(&mut self, shard_id: ShardId) -> ShardResult<()> {
        if let Some(active) = self.active {
            if active != shard_id && self.is_transaction_active() {
                return Err(ShardError::ActiveTransaction {
                    active,
                    requested: shard_id,
                });
            }
        }

        let shard = self.resolve(shard_id)?;
        if !self.sessions.contains_key(&shard_id) {
            tracing::debug!("Opening session for shard {}", shard_id);
            let session = self.driver.open(&shard).await.map_err(|e| match e {
                ShardError::ConnectionError(_) => e,
                other => ShardError::connection(format!(
                    "failed to open shard {}: {}",
                    shard_id, other
                )),
            })?;
            self.sessions.insert(
                shard_id,
                PooledSession {
                    session,
                    in_transaction: false,
                },
            );
        }

        self.active = Some(shard_id);
        Ok(())
    }

    fn params(&self) -> ShardParams {
        self.params.clone()
    }

    async fn fetch_all(
        &mut self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        let active = self
            .active
            .ok_or_else(|| ShardError::connection("not connected to any shard"))?;
        let pooled = self.active_session()?;
        pooled
            .session
            .fetch_all(statement, params, types)
            .await
            .map_err(|e| match e {
                ShardError::ExecutionError { .. } => e,
                other => ShardError::execution(active, other.to_string()),
            })
    }
}
