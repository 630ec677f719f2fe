//! SSDB vs KVRocks latency benchmark
//!
//! Usage:
//!   kvcompare-bench                               # 1000 ops per phase, localhost
//!   kvcompare-bench --samples 10000 --csv out.csv # larger run, CSV export
//!   kvcompare-bench --config bench.yaml -d        # YAML config, debug logging
//!   kvcompare-bench --skip kvrocks                # SSDB only
//!   kvcompare-bench --analyze                     # analyze the last results file

use clap::Parser;
use colored::Colorize;
use kvcompare_bench::analysis::{self, DEFAULT_ANALYSIS_OUTPUT};
use kvcompare_bench::config::BenchConfig;
use kvcompare_bench::runner;
use kvcompare_bench::{BackendKind, BenchResult};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "kvcompare-bench", about = "SSDB vs KVRocks latency benchmark")]
#[command(version)]
struct Cli {
    /// YAML config file; flags below override its values.
    #[arg(long, env = "KVBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Operations per backend per phase.
    #[arg(long, env = "KVBENCH_SAMPLES")]
    samples: Option<usize>,

    /// Length of each generated value.
    #[arg(long, env = "KVBENCH_VALUE_SIZE")]
    value_size: Option<usize>,

    #[arg(long, env = "SSDB_HOST")]
    ssdb_host: Option<String>,

    #[arg(long, env = "SSDB_PORT")]
    ssdb_port: Option<u16>,

    #[arg(long, env = "KVROCKS_HOST")]
    kvrocks_host: Option<String>,

    #[arg(long, env = "KVROCKS_PORT")]
    kvrocks_port: Option<u16>,

    /// Connect/read/write timeout in milliseconds (0 = wait forever).
    #[arg(long, env = "KVBENCH_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// JSON results file (overwritten).
    #[arg(long, env = "KVBENCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Also export the statistics as CSV.
    #[arg(long, env = "KVBENCH_CSV")]
    csv: Option<PathBuf>,

    /// Seed for reproducible test values.
    #[arg(long, env = "KVBENCH_SEED")]
    seed: Option<u64>,

    /// Skip backends (comma-separated: ssdb, kvrocks).
    #[arg(long, value_delimiter = ',')]
    skip: Vec<String>,

    /// Analyze the existing results file (--output) instead of benchmarking.
    #[arg(long)]
    analyze: bool,

    /// Where --analyze writes its report.
    #[arg(long, env = "KVBENCH_ANALYSIS_OUTPUT", default_value = DEFAULT_ANALYSIS_OUTPUT)]
    analysis_output: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> BenchResult<BenchConfig> {
        let mut cfg = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(n) = self.samples {
            cfg.sample_size = n;
        }
        if let Some(n) = self.value_size {
            cfg.value_size = n;
        }
        for (kind, host, port) in [
            (BackendKind::Ssdb, self.ssdb_host, self.ssdb_port),
            (BackendKind::Kvrocks, self.kvrocks_host, self.kvrocks_port),
        ] {
            let ep = cfg.endpoint_mut(kind);
            if let Some(host) = host {
                ep.host = host;
            }
            if let Some(port) = port {
                ep.port = port;
            }
        }
        if let Some(ms) = self.timeout_ms {
            cfg.timeout_ms = ms;
        }
        if let Some(path) = self.output {
            cfg.output = path;
        }
        if self.csv.is_some() {
            cfg.csv = self.csv;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        for name in &self.skip {
            let kind = BackendKind::parse(name)?;
            if !cfg.skip.contains(&kind) {
                cfg.skip.push(kind);
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> BenchResult<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let analyze = cli.analyze;
    let analysis_output = cli.analysis_output.clone();
    let cfg = cli.into_config()?;
    tracing::debug!(?cfg, "effective configuration");

    if analyze {
        analysis::run(&cfg.output, &analysis_output)?;
        return Ok(());
    }

    println!(
        "\n{}",
        "╔══════════════════════════════════════════════════════╗"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "║         🔥 SSDB vs KVRocks Benchmark Tool            ║"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════╝"
            .bold()
            .blue()
    );
    println!(
        "  Samples: {}  ValueSize: {}  Timeout: {}",
        cfg.sample_size,
        cfg.value_size,
        match cfg.timeout() {
            Some(t) => format!("{}ms", t.as_millis()),
            None => "none".to_string(),
        }
    );

    runner::execute(&cfg)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "kvcompare-bench",
            "--ssdb-port",
            "18890",
            "--kvrocks-host",
            "kv.internal",
            "--skip",
            "ssdb",
        ])
        .unwrap();
        assert!(!cli.analyze);
        assert_eq!(cli.analysis_output, PathBuf::from(DEFAULT_ANALYSIS_OUTPUT));

        let cfg = cli.into_config().unwrap();
        assert_eq!(cfg.endpoint(BackendKind::Ssdb).port, 18890);
        assert_eq!(cfg.endpoint(BackendKind::Kvrocks).host, "kv.internal");
        assert!(cfg.is_skipped(BackendKind::Ssdb));
    }

    #[test]
    fn test_unknown_skip_name_is_rejected() {
        let cli = Cli::try_parse_from(["kvcompare-bench", "--skip", "memcached"]).unwrap();
        assert!(cli.into_config().is_err());
    }
}
