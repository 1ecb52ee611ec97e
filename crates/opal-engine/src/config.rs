//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Verbosity the host asks the engine to log at.
///
/// The engine emits `tracing` events; the host owns the subscriber and
/// typically sets its filter from [`LogLevel::as_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Everything, including per-row decisions.
    Debug,
    /// Statement-level events.
    #[default]
    Info,
    /// Rejections and suspicious input.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// The matching `tracing` level.
    #[must_use]
    pub const fn as_tracing(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Which index structure CREATE INDEX builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexKind {
    /// Chained hash table; equality probes only.
    #[default]
    Hash,
    /// Order-m B-tree; equality and range probes.
    Btree,
}

impl IndexKind {
    /// The kind's display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Btree => "BTREE",
        }
    }
}

/// Host-visible engine options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Requested log verbosity.
    pub log_level: LogLevel,
    /// The kind CREATE INDEX builds.
    pub default_index_kind: IndexKind,
    /// B-tree order m: at most m children and m−1 keys per node.
    pub btree_order: usize,
    /// Bucket count of new hash indexes, fixed at build time.
    pub hash_buckets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            default_index_kind: IndexKind::default(),
            btree_order: 4,
            hash_buckets: 64,
        }
    }
}
