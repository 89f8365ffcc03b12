use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, Error};

/// Candidates collected beyond `max_decoys` to absorb later rejections.
pub const CANDIDATE_HEADROOM: usize = 10;

/// Caps on how many candidates one source reaction may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationLimits {
    /// Accepted decoys per generation pass.
    pub max_decoys: usize,
    /// Distinct candidates taken from a single rule.
    pub limit: usize,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_decoys: 50,
            limit: 5,
        }
    }
}

impl GenerationLimits {
    /// Hard cap on raw candidates gathered by the rule engine.
    #[inline]
    pub fn candidate_cap(&self) -> usize {
        self.max_decoys + CANDIDATE_HEADROOM
    }
}

/// Settings shared by every shard of one generation run.
///
/// Persisted as TOML so that shards started as separate processes see the
/// same configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub input: PathBuf,
    pub rules: PathBuf,
    pub output: PathBuf,
    /// Reactions per shard.
    pub batch: usize,
    /// Use only the first N library templates; all of them when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_count: Option<usize>,
    pub verbose: bool,
    pub log: bool,
    pub log_file: PathBuf,
    pub limits: GenerationLimits,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            rules: PathBuf::new(),
            output: PathBuf::from("decoys.jsonl"),
            batch: 10_000,
            template_count: None,
            verbose: false,
            log: true,
            log_file: PathBuf::from("generate_decoys.log"),
            limits: GenerationLimits::default(),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if self.limits.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.limits.max_decoys == 0 {
            return Err(ConfigError::ZeroMaxDecoys);
        }
        if self.template_count == Some(0) {
            return Err(ConfigError::ZeroTemplateCount);
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let text = self.to_toml()?;
        fs::write(path, text).map_err(|e| crate::io::Error::io(path, e))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| crate::io::Error::io(path, e))?;
        Ok(Self::from_toml(&text)?)
    }
}

/// Division of a dataset into contiguous shards of `batch` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPlan {
    len: usize,
    batch: usize,
}

impl ShardPlan {
    pub fn new(len: usize, batch: usize) -> Self {
        Self {
            len,
            batch: batch.max(1),
        }
    }

    /// Number of records in the planned dataset.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.len.div_ceil(self.batch)
    }

    /// Record positions covered by `shard`.
    pub fn range(&self, shard: usize) -> Result<Range<usize>, ConfigError> {
        if shard >= self.shard_count() {
            return Err(ConfigError::ShardOutOfRange {
                shard,
                shards: self.shard_count(),
            });
        }
        let start = shard * self.batch;
        Ok(start..(start + self.batch).min(self.len))
    }
}
