//! In-memory shard driver
//!
//! Answers statements from canned per-shard results instead of talking to a
//! database. Used by the CLI for dry routing and by tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::connection::{ShardDriver, ShardSession};
use super::shard::{ParameterType, Row, Shard, ShardId};
use crate::error::{ShardError, ShardResult};

/// A statement as it reached a shard
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub shard_id: ShardId,
    pub statement: String,
    pub params: Vec<Value>,
    pub types: Vec<ParameterType>,
}

#[derive(Default)]
struct MemoryState {
    rows: HashMap<(ShardId, String), Vec<Row>>,
    opened: Vec<ShardId>,
    executed: Vec<ExecutedStatement>,
    failing_opens: HashSet<ShardId>,
    failing_statements: HashSet<(ShardId, String)>,
    delays: HashMap<ShardId, Duration>,
}

#[derive(Default, Clone)]
pub struct MemoryDriver {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row returned by `statement` on `shard_id`. Non-object
    /// values are ignored.
    pub fn insert_row(&self, shard_id: ShardId, statement: &str, row: Value) {
        match row {
            Value::Object(row) => {
                self.state
                    .lock()
                    .rows
                    .entry((shard_id, statement.to_string()))
                    .or_default()
                    .push(row);
            }
            other => tracing::warn!("Ignoring non-object row for shard {}: {}", shard_id, other),
        }
    }

    /// Make opening a session to `shard_id` fail
    pub fn fail_open(&self, shard_id: ShardId) {
        self.state.lock().failing_opens.insert(shard_id);
    }

    /// Make `statement` fail when executed on `shard_id`
    pub fn fail_statement(&self, shard_id: ShardId, statement: &str) {
        self.state
            .lock()
            .failing_statements
            .insert((shard_id, statement.to_string()));
    }

    /// Make every statement on `shard_id` wait `delay` before answering
    pub fn delay_statements(&self, shard_id: ShardId, delay: Duration) {
        self.state.lock().delays.insert(shard_id, delay);
    }

    /// Shard ids sessions were opened for, in order
    pub fn opened(&self) -> Vec<ShardId> {
        self.state.lock().opened.clone()
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state.lock().executed.clone()
    }
}

#[async_trait]
impl ShardDriver for MemoryDriver {
    async fn open(&self, shard: &Shard) -> ShardResult<Box<dyn ShardSession>> {
        let mut state = self.state.lock();
        if state.failing_opens.contains(&shard.id) {
            return Err(ShardError::connection(format!(
                "shard {} refused the connection",
                shard.id
            )));
        }
        state.opened.push(shard.id);
        Ok(Box::new(MemorySession {
            shard_id: shard.id,
            state: self.state.clone(),
        }))
    }
}

struct MemorySession {
    shard_id: ShardId,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl ShardSession for MemorySession {
    async fn fetch_all(
        &mut self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        let delay = self.state.lock().delays.get(&self.shard_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.executed.push(ExecutedStatement {
            shard_id: self.shard_id,
            statement: statement.to_string(),
            params: params.to_vec(),
            types: types.to_vec(),
        });

        let key = (self.shard_id, statement.to_string());
        if state.failing_statements.contains(&key) {
            return Err(ShardError::execution(
                self.shard_id,
                format!("statement failed: {}", statement),
            ));
        }
        Ok(state.rows.get(&key).cloned().unwrap_or_default())
    }

    async fn begin(&mut self) -> ShardResult<()> {
        Ok(())
    }

    async fn commit(&mut self) -> ShardResult<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> ShardResult<()> {
        Ok(())
    }
}
