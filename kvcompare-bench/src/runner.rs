//! Sequential SET → GET → DELETE benchmark protocol.
//!
//! Every phase visits each connected backend in turn and issues one
//! operation per test record, strictly one at a time, so the two backends
//! never contend with each other or with a second in-flight request.

use crate::adapters::connect_backend;
use crate::config::BenchConfig;
use crate::report::{self, BenchmarkReport};
use crate::timer::{self, ErrorCounter};
use crate::{
    BackendKind, BenchError, BenchResult, DataGen, KvBackend, OpKind, TestRecord,
    DEFAULT_VALUE_SIZE,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

// ────────────────────────────────────────────────────────────────────────────────
// Raw samples
// ────────────────────────────────────────────────────────────────────────────────

/// Wall-clock milliseconds spent in each phase, failures included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimes {
    pub set: f64,
    pub get: f64,
    pub del: f64,
}

impl PhaseTimes {
    pub fn of(&self, op: OpKind) -> f64 {
        match op {
            OpKind::Set => self.set,
            OpKind::Get => self.get,
            OpKind::Del => self.del,
        }
    }

    fn add(&mut self, op: OpKind, ms: f64) {
        match op {
            OpKind::Set => self.set += ms,
            OpKind::Get => self.get += ms,
            OpKind::Del => self.del += ms,
        }
    }

    pub fn total(&self) -> f64 {
        self.set + self.get + self.del
    }
}

/// Raw latency samples (ms) and error count for one backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSamples {
    pub set: Vec<f64>,
    pub get: Vec<f64>,
    pub del: Vec<f64>,
    pub errors: ErrorCounter,
    pub total_time_ms: PhaseTimes,
    /// Footprint of the benchmark keys after the GET phase, 0 if unknown.
    #[serde(default)]
    pub storage_bytes: u64,
}

impl BackendSamples {
    pub fn samples(&self, op: OpKind) -> &[f64] {
        match op {
            OpKind::Set => &self.set,
            OpKind::Get => &self.get,
            OpKind::Del => &self.del,
        }
    }

    fn samples_mut(&mut self, op: OpKind) -> &mut Vec<f64> {
        match op {
            OpKind::Set => &mut self.set,
            OpKind::Get => &mut self.get,
            OpKind::Del => &mut self.del,
        }
    }

    pub fn total_samples(&self) -> usize {
        OpKind::ALL.iter().map(|&op| self.samples(op).len()).sum()
    }
}

/// Accumulated state of a single run. Both backends always have an entry;
/// one that never ran keeps empty sample sets.
#[derive(Debug, Clone)]
pub struct RunContext {
    sample_size: usize,
    raw: BTreeMap<BackendKind, BackendSamples>,
}

impl RunContext {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            raw: BackendKind::ALL
                .iter()
                .map(|&k| (k, BackendSamples::default()))
                .collect(),
        }
    }

    pub fn backend(&self, kind: BackendKind) -> &BackendSamples {
        &self.raw[&kind]
    }

    fn backend_mut(&mut self, kind: BackendKind) -> &mut BackendSamples {
        self.raw.entry(kind).or_default()
    }

    pub fn into_report(self) -> BenchmarkReport {
        BenchmarkReport::new(self.sample_size, self.raw)
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Runner
// ────────────────────────────────────────────────────────────────────────────────

pub struct BenchmarkRunner {
    backends: Vec<Box<dyn KvBackend>>,
    value_size: usize,
    seed: Option<u64>,
}

impl BenchmarkRunner {
    /// `backends` holds only the adapters that connected successfully.
    pub fn new(backends: Vec<Box<dyn KvBackend>>) -> Self {
        Self {
            backends,
            value_size: DEFAULT_VALUE_SIZE,
            seed: None,
        }
    }

    pub fn from_config(backends: Vec<Box<dyn KvBackend>>, cfg: &BenchConfig) -> Self {
        Self::new(backends)
            .with_value_size(cfg.value_size)
            .with_seed(cfg.seed)
    }

    pub fn with_value_size(mut self, value_size: usize) -> Self {
        self.value_size = value_size;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn connected(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Generate `sample_size` records and run all three phases.
    ///
    /// Fails with [`BenchError::NoBackends`] before generating any data when
    /// nothing is connected.
    pub fn run(&mut self, sample_size: usize) -> BenchResult<BenchmarkReport> {
        if self.backends.is_empty() {
            return Err(BenchError::NoBackends);
        }
        let records = DataGen::with_seed(self.seed).generate(sample_size, self.value_size);
        Ok(self.run_records(&records))
    }

    /// Run SET, GET and DELETE, in that order, over `records`.
    pub fn run_records(&mut self, records: &[TestRecord]) -> BenchmarkReport {
        println!(
            "\n{}",
            format!(
                "🚀 Starting benchmark with {} operations per test...",
                records.len()
            )
            .bold()
        );

        let mut ctx = RunContext::new(records.len());
        for op in OpKind::ALL {
            println!("{}", format!("▶ Benchmarking {} operations...", op).bold().green());
            for db in self.backends.iter_mut() {
                let kind = db.kind();
                run_phase(db.as_mut(), op, records, ctx.backend_mut(kind));
            }
            // Every key is still present between GET and DELETE.
            if op == OpKind::Get {
                println!("{}", "💾 Measuring storage footprint...".bold().green());
                for db in self.backends.iter_mut() {
                    let out = ctx.backend_mut(db.kind());
                    out.storage_bytes = measure_storage(db.as_mut(), records, out.set.len());
                }
            }
        }
        ctx.into_report()
    }

    /// Close every adapter; failures are logged, not returned.
    pub fn close(&mut self) {
        for db in self.backends.iter_mut() {
            if let Err(e) = db.close() {
                tracing::warn!(backend = db.name(), error = %e, "close failed");
            }
        }
    }
}

fn run_phase(db: &mut dyn KvBackend, op: OpKind, records: &[TestRecord], out: &mut BackendSamples) {
    let errors_before = out.errors.get();
    let started = Instant::now();

    for record in records {
        if let Some(ms) = timer::measure(db, op, record, &mut out.errors) {
            out.samples_mut(op).push(ms);
        }
    }

    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    out.total_time_ms.add(op, elapsed_ms);

    let failed = out.errors.get() - errors_before;
    tracing::info!(
        backend = db.name(),
        op = op.as_str(),
        ok = records.len() as u64 - failed,
        failed,
        elapsed_ms,
        "{} {} phase finished in {:.2}s",
        db.name(),
        op,
        elapsed_ms / 1_000.0
    );
}

/// Server-reported footprint when available, otherwise an estimate from
/// sampled records.
fn measure_storage(db: &mut dyn KvBackend, records: &[TestRecord], stored: usize) -> u64 {
    match db.reported_storage_bytes() {
        Ok(Some(bytes)) => {
            tracing::debug!(backend = db.name(), bytes, "server-reported storage");
            return bytes;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(backend = db.name(), error = %e, "storage query failed, sampling instead");
        }
    }
    estimate_storage(db, records, stored)
}

/// Average key+value bytes of the first, middle and last record, scaled to
/// the `stored` keys that were written successfully.
fn estimate_storage(db: &mut dyn KvBackend, records: &[TestRecord], stored: usize) -> u64 {
    let Some(last) = records.len().checked_sub(1) else {
        return 0;
    };
    let mut picks = vec![0, records.len() / 2, last];
    picks.dedup();

    let (mut bytes, mut found) = (0usize, 0usize);
    for i in picks {
        let key = &records[i].key;
        match db.get(key) {
            Ok(Some(value)) if !value.is_empty() => {
                bytes += key.len() + value.len();
                found += 1;
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(backend = db.name(), key = %key, error = %e, "storage sample failed"),
        }
    }
    if found == 0 {
        return 0;
    }
    (bytes as f64 / found as f64 * stored as f64).round() as u64
}

// ────────────────────────────────────────────────────────────────────────────────
// Orchestration
// ────────────────────────────────────────────────────────────────────────────────

/// Connect, run, print and persist one benchmark as configured.
///
/// When no backend can be connected this prints a diagnostic and returns
/// `Ok(None)`: no phase runs and `cfg.output` is left untouched.
pub fn execute(cfg: &BenchConfig) -> BenchResult<Option<BenchmarkReport>> {
    let mut backends: Vec<Box<dyn KvBackend>> = Vec::new();
    for kind in BackendKind::ALL {
        if cfg.is_skipped(kind) {
            println!("  {} {}", "SKIP".yellow(), kind);
            continue;
        }
        if let Some(db) = connect_backend(kind, cfg.endpoint(kind), cfg.timeout()) {
            backends.push(db);
        }
    }

    if backends.is_empty() {
        println!(
            "{}",
            "❌ Could not connect to any database. Please ensure SSDB and/or KVRocks are running."
                .red()
        );
        return Ok(None);
    }

    let mut runner = BenchmarkRunner::from_config(backends, cfg);
    let connected = runner.connected();
    for kind in BackendKind::ALL {
        if !connected.contains(&kind) {
            println!(
                "{}",
                format!(
                    "⚠️  {} not available. Running benchmark for {} only.",
                    kind,
                    kind.opponent()
                )
                .yellow()
            );
        }
    }

    let result = runner.run(cfg.sample_size);
    runner.close();
    let report = result?;

    report::print_report(&report);
    report::save_json(&report, &cfg.output)?;
    if let Some(path) = &cfg.csv {
        report::export_csv(&report, path)?;
    }

    println!(
        "\n{}",
        format!(
            "✅ Benchmark completed! Results saved to {}",
            cfg.output.display()
        )
        .bold()
        .green()
    );
    Ok(Some(report))
}
