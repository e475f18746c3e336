//! Common test utilities for shard manager tests
//!
//! Provides a scripted `ShardedConnection` that records every call made on it.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use shardgate::{
    ParameterType, Row, Shard, ShardChoser, ShardError, ShardId, ShardParams, ShardResult,
    ShardedConnection,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// A call observed by the mock connection
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Params,
    Connect(ShardId),
    FetchAll {
        statement: String,
        params: Vec<Value>,
        types: Vec<ParameterType>,
    },
}

#[derive(Clone)]
pub struct MockConnection {
    pub calls: Arc<Mutex<Vec<Call>>>,
    params: Arc<Mutex<ShardParams>>,
    results: HashMap<ShardId, Result<Vec<Row>, String>>,
    failing_connects: HashSet<ShardId>,
    active: Option<ShardId>,
}

impl MockConnection {
    pub fn new(params: ShardParams) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            params: Arc::new(Mutex::new(params)),
            results: HashMap::new(),
            failing_connects: HashSet::new(),
            active: None,
        }
    }

    pub fn with_rows(mut self, shard_id: ShardId, rows: Vec<Row>) -> Self {
        self.results.insert(shard_id, Ok(rows));
        self
    }

    pub fn with_failure(mut self, shard_id: ShardId, message: &str) -> Self {
        self.results.insert(shard_id, Err(message.to_string()));
        self
    }

    pub fn with_failing_connect(mut self, shard_id: ShardId) -> Self {
        self.failing_connects.insert(shard_id);
        self
    }

    /// Handle for swapping the configuration while the connection is owned
    /// by a manager
    pub fn params_handle(&self) -> Arc<Mutex<ShardParams>> {
        self.params.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connects(&self) -> Vec<ShardId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Connect(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ShardedConnection for MockConnection {
    async fn connect(&mut self, shard_id: ShardId) -> ShardResult<()> {
        self.calls.lock().unwrap().push(Call::Connect(shard_id));
        if self.failing_connects.contains(&shard_id) {
            return Err(ShardError::connection(format!(
                "could not connect to shard {}",
                shard_id
            )));
        }
        self.active = Some(shard_id);
        Ok(())
    }

    fn params(&self) -> ShardParams {
        self.calls.lock().unwrap().push(Call::Params);
        self.params.lock().unwrap().clone()
    }

    async fn fetch_all(
        &mut self,
        statement: &str,
        params: &[Value],
        types: &[ParameterType],
    ) -> ShardResult<Vec<Row>> {
        self.calls.lock().unwrap().push(Call::FetchAll {
            statement: statement.to_string(),
            params: params.to_vec(),
            types: types.to_vec(),
        });
        let active = self
            .active
            .ok_or_else(|| ShardError::connection("not connected"))?;
        match self.results.get(&active) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(ShardError::execution(active, message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("row must be an object, got {}", other),
    }
}

pub fn id_row(id: i64) -> Row {
    row(json!({ "id": id }))
}

pub fn two_shards(choser: Arc<dyn ShardChoser>) -> ShardParams {
    ShardParams::new(vec![Shard::new(1), Shard::new(2)], choser)
}
