pub mod config;
pub mod error;
pub mod sharding;

pub use config::{ChoserConfig, ShardingConfig};
pub use error::{ShardError, ShardResult};
pub use sharding::{
    DistributionValue, ExecutedStatement, HashShardChoser, MemoryDriver, ParallelFanOut,
    ParameterType, PassthroughShardChoser, PoolingShardConnection, RoutingState, Row, Shard,
    ShardChoser, ShardDriver, ShardId, ShardManager, ShardParams, ShardSession, ShardedConnection,
    StaticShardChoser, GLOBAL_SHARD_ID,
};
