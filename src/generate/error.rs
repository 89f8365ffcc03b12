//! Error types for decoy generation.
//!
//! Per-reaction chemistry failures never surface here; they are absorbed
//! as rejections inside the worker. These errors end a run: an unreadable
//! dataset, an unwritable output, or an invalid configuration.

use thiserror::Error;

/// Problems with a [`WorkerConfig`](super::WorkerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch size must be at least 1")]
    ZeroBatch,

    #[error("per-rule limit must be at least 1")]
    ZeroLimit,

    #[error("maximum number of decoys must be at least 1")]
    ZeroMaxDecoys,

    #[error("template count must be at least 1 when given")]
    ZeroTemplateCount,

    #[error("shard {shard} is out of range: the input splits into {shards} shards")]
    ShardOutOfRange { shard: usize, shards: usize },

    #[error("failed to parse worker configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize worker configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid worker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] crate::io::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
