//! Shard routing
//!
//! A `ShardManager` drives a `ShardedConnection`, choosing the target shard
//! for a distribution value through a pluggable `ShardChoser`.

pub mod choser;
pub mod connection;
pub mod fanout;
pub mod manager;
pub mod memory;
pub mod pooling;
pub mod shard;

pub use choser::{HashShardChoser, PassthroughShardChoser, ShardChoser, StaticShardChoser};
pub use connection::{ShardDriver, ShardParams, ShardSession, ShardedConnection};
pub use fanout::ParallelFanOut;
pub use manager::{RoutingState, ShardManager};
pub use memory::{ExecutedStatement, MemoryDriver};
pub use pooling::PoolingShardConnection;
pub use shard::{DistributionValue, ParameterType, Row, Shard, ShardId, GLOBAL_SHARD_ID};
