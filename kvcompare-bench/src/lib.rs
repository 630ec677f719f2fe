//! Shared types, traits and test-data generation for kvcompare-bench.
//!
//! The harness drives two key-value backends (SSDB and KVRocks) through the
//! same SET → GET → DELETE sequence, one operation at a time, and compares
//! the resulting latency distributions.

pub mod adapters;
pub mod analysis;
pub mod config;
pub mod report;
pub mod runner;
pub mod stats;
pub mod timer;

use rand::distributions::Alphanumeric;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────────
// Error type
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Malformed or non-`ok` reply from a backend.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no backend is connected")]
    NoBackends,
}

// ────────────────────────────────────────────────────────────────────────────────
// Backends and operation kinds
// ────────────────────────────────────────────────────────────────────────────────

/// One of the two stores under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ssdb,
    Kvrocks,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Ssdb, BackendKind::Kvrocks];

    /// Human-facing name used in tables and diagnostics.
    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Ssdb => "SSDB",
            BackendKind::Kvrocks => "KVRocks",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            BackendKind::Ssdb => 8890,
            BackendKind::Kvrocks => 6379,
        }
    }

    /// The other backend of the pair.
    pub fn opponent(self) -> BackendKind {
        match self {
            BackendKind::Ssdb => BackendKind::Kvrocks,
            BackendKind::Kvrocks => BackendKind::Ssdb,
        }
    }

    /// Parse a CLI/config identifier (`ssdb`, `kvrocks`), case-insensitive.
    pub fn parse(s: &str) -> BenchResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssdb" => Ok(BackendKind::Ssdb),
            "kvrocks" => Ok(BackendKind::Kvrocks),
            other => Err(BenchError::Config(format!("unknown backend: {other}"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Operation kinds, in the order the runner executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Set,
    Get,
    Del,
}

impl OpKind {
    pub const ALL: [OpKind; 3] = [OpKind::Set, OpKind::Get, OpKind::Del];

    pub fn label(self) -> &'static str {
        match self {
            OpKind::Set => "SET",
            OpKind::Get => "GET",
            OpKind::Del => "DELETE",
        }
    }

    /// Lowercase identifier, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Set => "set",
            OpKind::Get => "get",
            OpKind::Del => "del",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Backend trait
// ────────────────────────────────────────────────────────────────────────────────

/// Sentinel key written and removed by [`KvBackend::probe`].
pub const PROBE_KEY: &str = "test_connection";

/// Uniform key-value surface over one open backend connection.
pub trait KvBackend: Send {
    fn kind(&self) -> BackendKind;

    fn set(&mut self, key: &str, value: &str) -> BenchResult<()>;
    fn get(&mut self, key: &str) -> BenchResult<Option<String>>;
    fn delete(&mut self, key: &str) -> BenchResult<()>;

    fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Round-trip write + delete of [`PROBE_KEY`]; proves the backend serves
    /// requests rather than merely accepting a socket.
    fn probe(&mut self) -> BenchResult<()> {
        self.set(PROBE_KEY, "ok")?;
        self.delete(PROBE_KEY)
    }

    /// Footprint reported by the server itself, in bytes. `None` when the
    /// backend exposes no such figure and the caller has to estimate.
    fn reported_storage_bytes(&mut self) -> BenchResult<Option<u64>> {
        Ok(None)
    }

    fn close(&mut self) -> BenchResult<()> {
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Test data generator
// ────────────────────────────────────────────────────────────────────────────────

pub const KEY_PREFIX: &str = "benchmark_key_";
pub const DEFAULT_VALUE_SIZE: usize = 100;

/// One key/value pair reused across the SET, GET and DELETE phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub key: String,
    pub value: String,
}

pub struct DataGen {
    rng: ChaCha8Rng,
}

impl DataGen {
    /// Reproducible generator.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::new(s),
            None => Self::from_entropy(),
        }
    }

    /// Key for the record at `index`: `benchmark_key_{index}`.
    pub fn key(index: usize) -> String {
        format!("{KEY_PREFIX}{index}")
    }

    /// Random string of `len` symbols drawn uniformly from `[A-Za-z0-9]`.
    pub fn random_value(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    /// Eagerly build `n` records with `value_size`-character values.
    pub fn generate(&mut self, n: usize, value_size: usize) -> Vec<TestRecord> {
        (0..n)
            .map(|i| TestRecord {
                key: Self::key(i),
                value: self.random_value(value_size),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keys_and_values() {
        let mut gen = DataGen::new(42);
        let records = gen.generate(5, DEFAULT_VALUE_SIZE);

        assert_eq!(records.len(), 5);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.key, format!("benchmark_key_{i}"));
            assert_eq!(r.value.len(), 100);
            assert!(r.value.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = DataGen::new(7).generate(10, 32);
        let b = DataGen::new(7).generate(10, 32);
        let c = DataGen::new(8).generate(10, 32);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_custom_value_size() {
        let records = DataGen::from_entropy().generate(3, 17);
        assert!(records.iter().all(|r| r.value.len() == 17));
        assert!(DataGen::with_seed(None).generate(0, 10).is_empty());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(BackendKind::parse("SSDB").unwrap(), BackendKind::Ssdb);
        assert_eq!(BackendKind::parse(" kvrocks ").unwrap(), BackendKind::Kvrocks);
        assert!(matches!(
            BackendKind::parse("redis"),
            Err(BenchError::Config(_))
        ));
        assert_eq!(BackendKind::Ssdb.opponent(), BackendKind::Kvrocks);
    }

    #[test]
    fn test_op_kind_order_and_labels() {
        assert_eq!(OpKind::ALL, [OpKind::Set, OpKind::Get, OpKind::Del]);
        assert_eq!(OpKind::Del.label(), "DELETE");
        assert_eq!(
            serde_json::to_string(&OpKind::Del).unwrap(),
            "\"del\""
        );
        assert_eq!(
            serde_json::to_string(&BackendKind::Kvrocks).unwrap(),
            "\"kvrocks\""
        );
    }
}
