//! Benchmark configuration: defaults, YAML file loading and validation.
//!
//! Precedence is defaults < YAML file < command line / environment; the CLI
//! layer in `main.rs` applies its overrides on top of [`BenchConfig::load`].

use crate::{BackendKind, BenchError, BenchResult, DEFAULT_VALUE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SAMPLE_SIZE: usize = 1000;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_OUTPUT: &str = "benchmark_results.json";

/// Host/port of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn localhost(kind: BackendKind) -> Self {
        Self::new("localhost", kind.default_port())
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Operations per (backend, operation kind).
    pub sample_size: usize,
    /// Characters per generated value.
    pub value_size: usize,
    pub ssdb: Endpoint,
    pub kvrocks: Endpoint,
    /// Per-connection I/O timeout; 0 blocks indefinitely.
    pub timeout_ms: u64,
    /// JSON artifact, overwritten on every run.
    pub output: PathBuf,
    /// Optional CSV export of the statistics matrix.
    pub csv: Option<PathBuf>,
    /// Fixed RNG seed for reproducible values.
    pub seed: Option<u64>,
    /// Backends to leave out of the run.
    pub skip: Vec<BackendKind>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            value_size: DEFAULT_VALUE_SIZE,
            ssdb: Endpoint::localhost(BackendKind::Ssdb),
            kvrocks: Endpoint::localhost(BackendKind::Kvrocks),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            output: PathBuf::from(DEFAULT_OUTPUT),
            csv: None,
            seed: None,
            skip: Vec::new(),
        }
    }
}

impl BenchConfig {
    /// Load from a YAML file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> BenchResult<Self> {
        let cfg: Self = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.sample_size == 0 {
            return Err(BenchError::Config("sample_size must be at least 1".into()));
        }
        if self.value_size == 0 {
            return Err(BenchError::Config("value_size must be at least 1".into()));
        }
        for kind in BackendKind::ALL {
            let ep = self.endpoint(kind);
            if ep.host.trim().is_empty() {
                return Err(BenchError::Config(format!("{kind} host is empty")));
            }
            if ep.port == 0 {
                return Err(BenchError::Config(format!("{kind} port must be nonzero")));
            }
        }
        Ok(())
    }

    pub fn endpoint(&self, kind: BackendKind) -> &Endpoint {
        match kind {
            BackendKind::Ssdb => &self.ssdb,
            BackendKind::Kvrocks => &self.kvrocks,
        }
    }

    pub fn endpoint_mut(&mut self, kind: BackendKind) -> &mut Endpoint {
        match kind {
            BackendKind::Ssdb => &mut self.ssdb,
            BackendKind::Kvrocks => &mut self.kvrocks,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn is_skipped(&self, kind: BackendKind) -> bool {
        self.skip.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.sample_size, 1000);
        assert_eq!(cfg.value_size, 100);
        assert_eq!(cfg.ssdb.addr(), "localhost:8890");
        assert_eq!(cfg.kvrocks.addr(), "localhost:6379");
        assert_eq!(cfg.output, PathBuf::from("benchmark_results.json"));
        assert_eq!(cfg.timeout(), Some(Duration::from_millis(5000)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
sample_size: 250
kvrocks:
  host: 10.0.0.5
  port: 6666
timeout_ms: 0
seed: 42
skip: [ssdb]
"#;
        let cfg = BenchConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.sample_size, 250);
        assert_eq!(cfg.value_size, 100);
        assert_eq!(cfg.ssdb, Endpoint::localhost(BackendKind::Ssdb));
        assert_eq!(cfg.kvrocks, Endpoint::new("10.0.0.5", 6666));
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.seed, Some(42));
        assert!(cfg.is_skipped(BackendKind::Ssdb));
        assert!(!cfg.is_skipped(BackendKind::Kvrocks));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = BenchConfig {
            sample_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(BenchError::Config(_))));

        let mut cfg = BenchConfig::default();
        cfg.endpoint_mut(BackendKind::Kvrocks).port = 0;
        assert!(matches!(cfg.validate(), Err(BenchError::Config(_))));

        assert!(matches!(
            BenchConfig::from_yaml("sample_size: [1, 2]"),
            Err(BenchError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bench.yaml");
        fs::write(&path, "value_size: 64\noutput: out.json\n").unwrap();

        let cfg = BenchConfig::load(&path).unwrap();
        assert_eq!(cfg.value_size, 64);
        assert_eq!(cfg.output, PathBuf::from("out.json"));

        let missing = BenchConfig::load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(BenchError::Config(_))));
    }
}
