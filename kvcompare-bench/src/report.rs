//! Benchmark report: comparison tables, overall verdict, JSON and CSV export.

use crate::runner::{BackendSamples, PhaseTimes};
use crate::stats::{LatencyStats, Metric};
use crate::timer::ErrorCounter;
use crate::{BackendKind, BenchResult, OpKind};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

static EMPTY_STATS: LatencyStats = LatencyStats {
    count: 0,
    mean: 0.0,
    median: 0.0,
    min: 0.0,
    max: 0.0,
    std_dev: 0.0,
    p95: 0.0,
    p99: 0.0,
};

static EMPTY_RAW: BackendSamples = BackendSamples {
    set: Vec::new(),
    get: Vec::new(),
    del: Vec::new(),
    errors: ErrorCounter::new(),
    total_time_ms: PhaseTimes {
        set: 0.0,
        get: 0.0,
        del: 0.0,
    },
    storage_bytes: 0,
};

// ────────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────────

/// Everything one run produced. Serialized as-is to the JSON artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub timestamp: String,
    pub sample_size: usize,
    pub statistics: BTreeMap<BackendKind, BTreeMap<OpKind, LatencyStats>>,
    pub raw_data: BTreeMap<BackendKind, BackendSamples>,
}

impl BenchmarkReport {
    /// Summarize every sample set in `raw_data` and stamp the report with the
    /// current local time.
    pub fn new(sample_size: usize, raw_data: BTreeMap<BackendKind, BackendSamples>) -> Self {
        let statistics = raw_data
            .iter()
            .map(|(&kind, raw)| {
                let per_op: BTreeMap<OpKind, LatencyStats> = OpKind::ALL
                    .iter()
                    .map(|&op| (op, LatencyStats::from_samples(raw.samples(op))))
                    .collect();
                (kind, per_op)
            })
            .collect();

        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            sample_size,
            statistics,
            raw_data,
        }
    }

    pub fn stats(&self, kind: BackendKind, op: OpKind) -> &LatencyStats {
        self.statistics
            .get(&kind)
            .and_then(|m| m.get(&op))
            .unwrap_or(&EMPTY_STATS)
    }

    pub fn raw(&self, kind: BackendKind) -> &BackendSamples {
        self.raw_data.get(&kind).unwrap_or(&EMPTY_RAW)
    }

    pub fn errors(&self, kind: BackendKind) -> u64 {
        self.raw(kind).errors.get()
    }

    pub fn overall(&self) -> OverallSummary {
        OverallSummary::compute(self)
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Winner rules
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Backend(BackendKind),
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Backend(kind) => f.write_str(kind.display_name()),
            Winner::Tie => f.write_str("Tie"),
        }
    }
}

/// Lower latency wins. A zero means "no data", so a lone zero loses to any
/// measured value. Equal nonzero values go to KVRocks.
pub fn pick_winner(ssdb: f64, kvrocks: f64) -> Winner {
    match (ssdb == 0.0, kvrocks == 0.0) {
        (true, true) => Winner::Tie,
        (true, false) => Winner::Backend(BackendKind::Kvrocks),
        (false, true) => Winner::Backend(BackendKind::Ssdb),
        (false, false) if ssdb < kvrocks => Winner::Backend(BackendKind::Ssdb),
        (false, false) => Winner::Backend(BackendKind::Kvrocks),
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Overall verdict
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub faster: BackendKind,
    pub improvement_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallSummary {
    /// Count-weighted mean latency (ms) over all ops; only backends with at
    /// least one sample appear.
    pub averages: BTreeMap<BackendKind, f64>,
    /// Present only when both backends have samples.
    pub verdict: Option<Verdict>,
}

impl OverallSummary {
    pub fn compute(report: &BenchmarkReport) -> Self {
        let mut averages = BTreeMap::new();
        for kind in BackendKind::ALL {
            let (weighted, count) = OpKind::ALL
                .iter()
                .map(|&op| report.stats(kind, op))
                .fold((0.0, 0usize), |(sum, n), s| {
                    (sum + s.mean * s.count as f64, n + s.count)
                });
            if count > 0 {
                averages.insert(kind, weighted / count as f64);
            }
        }

        let verdict = match (
            averages.get(&BackendKind::Ssdb),
            averages.get(&BackendKind::Kvrocks),
        ) {
            (Some(&ssdb), Some(&kvrocks)) => {
                let (faster, fast, slow) = if ssdb < kvrocks {
                    (BackendKind::Ssdb, ssdb, kvrocks)
                } else {
                    (BackendKind::Kvrocks, kvrocks, ssdb)
                };
                let improvement_pct = if slow > 0.0 {
                    (slow - fast) / slow * 100.0
                } else {
                    0.0
                };
                Some(Verdict {
                    faster,
                    improvement_pct,
                })
            }
            _ => None,
        };

        Self { averages, verdict }
    }

    /// Operations per second implied by the weighted average latency.
    pub fn throughput(&self, kind: BackendKind) -> Option<f64> {
        self.averages
            .get(&kind)
            .filter(|&&avg| avg > 0.0)
            .map(|avg| 1_000.0 / avg)
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────────

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn winner_cell(winner: Winner) -> Cell {
    match winner {
        Winner::Backend(_) => Cell::new(winner.to_string()).fg(Color::Green),
        Winner::Tie => Cell::new(winner.to_string()).fg(Color::Yellow),
    }
}

fn print_op_table(report: &BenchmarkReport, op: OpKind) {
    println!(
        "\n{}",
        format!("━━━ {} Operation Results ━━━", op).bold().cyan()
    );

    let ssdb = report.stats(BackendKind::Ssdb, op);
    let kvrocks = report.stats(BackendKind::Kvrocks, op);

    let mut table = new_table();
    table.set_header(vec!["Metric", "SSDB", "KVRocks", "Winner"]);
    for metric in Metric::TABLE {
        let (a, b) = (ssdb.metric(metric), kvrocks.metric(metric));
        table.add_row(vec![
            Cell::new(metric.label()),
            Cell::new(format!("{:.3}", a)),
            Cell::new(format!("{:.3}", b)),
            winner_cell(pick_winner(a, b)),
        ]);
    }
    table.add_row(vec![
        Cell::new("ERRORS"),
        Cell::new(report.errors(BackendKind::Ssdb)),
        Cell::new(report.errors(BackendKind::Kvrocks)),
        Cell::new(""),
    ]);

    println!("{table}");
}

fn print_total_time(report: &BenchmarkReport) {
    println!("\n{}", "── Total Time (seconds) ──".bold().yellow());

    let ssdb = report.raw(BackendKind::Ssdb).total_time_ms;
    let kvrocks = report.raw(BackendKind::Kvrocks).total_time_ms;

    let mut table = new_table();
    table.set_header(vec!["Operation", "SSDB", "KVRocks", "Winner"]);
    let rows = OpKind::ALL
        .iter()
        .map(|&op| (op.label(), ssdb.of(op), kvrocks.of(op)))
        .chain(std::iter::once(("TOTAL", ssdb.total(), kvrocks.total())));
    for (label, a, b) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format!("{:.3}", a / 1_000.0)),
            Cell::new(format!("{:.3}", b / 1_000.0)),
            winner_cell(pick_winner(a, b)),
        ]);
    }

    println!("{table}");
}

fn print_storage(report: &BenchmarkReport) {
    println!("\n{}", "── Storage Footprint ──".bold().yellow());

    let ssdb = report.raw(BackendKind::Ssdb).storage_bytes;
    let kvrocks = report.raw(BackendKind::Kvrocks).storage_bytes;

    let mut table = new_table();
    table.set_header(vec!["Metric", "SSDB", "KVRocks", "Winner"]);
    table.add_row(vec![
        Cell::new("STORAGE"),
        Cell::new(format_bytes(ssdb)),
        Cell::new(format_bytes(kvrocks)),
        winner_cell(pick_winner(ssdb as f64, kvrocks as f64)),
    ]);
    println!("{table}");
}

fn print_overall(summary: &OverallSummary) {
    println!(
        "\n{}",
        "── Overall Performance Summary ──".bold().yellow()
    );

    if summary.averages.is_empty() {
        println!("  {}", "no successful operations recorded".dimmed());
        return;
    }

    println!("  Average latency across all operations:");
    for (&kind, avg) in &summary.averages {
        let tput = summary
            .throughput(kind)
            .map(|t| format!("{:.0} ops/sec", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {} {:.3} ms  ({})",
            format!("{:>8}:", kind.display_name()).bold(),
            avg,
            tput
        );
    }

    if let Some(v) = summary.verdict {
        println!(
            "  {}",
            format!(
                "🏆 {} is {:.1}% faster overall",
                v.faster, v.improvement_pct
            )
            .bold()
            .green()
        );
    }
}

/// Print every comparison table followed by the overall summary.
pub fn print_report(report: &BenchmarkReport) {
    println!(
        "\n{}",
        "╔══════════════════════════════════════════════════════════════╗"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "║              📊 SSDB vs KVRocks Benchmark Results            ║"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝"
            .bold()
            .blue()
    );
    println!(
        "  Samples: {}  Time: {}",
        report.sample_size, report.timestamp
    );

    for op in OpKind::ALL {
        print_op_table(report, op);
    }
    print_total_time(report);
    print_storage(report);
    print_overall(&report.overall());
}

// ────────────────────────────────────────────────────────────────────────────────
// JSON export
// ────────────────────────────────────────────────────────────────────────────────

/// Write the report as pretty JSON, replacing any existing file.
pub fn save_json(report: &BenchmarkReport, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "report written");
    Ok(())
}

pub fn load_json(path: &Path) -> BenchResult<BenchmarkReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// ────────────────────────────────────────────────────────────────────────────────
// CSV export
// ────────────────────────────────────────────────────────────────────────────────

/// One row per (backend, op) with every summary field.
pub fn export_csv(report: &BenchmarkReport, path: &Path) -> BenchResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "backend",
        "operation",
        "count",
        "mean_ms",
        "median_ms",
        "min_ms",
        "max_ms",
        "std_dev_ms",
        "p95_ms",
        "p99_ms",
        "errors",
        "total_time_ms",
        "storage_bytes",
    ])?;

    for kind in BackendKind::ALL {
        let raw = report.raw(kind);
        for op in OpKind::ALL {
            let s = report.stats(kind, op);
            wtr.write_record([
                kind.display_name(),
                op.as_str(),
                &s.count.to_string(),
                &format!("{:.6}", s.mean),
                &format!("{:.6}", s.median),
                &format!("{:.6}", s.min),
                &format!("{:.6}", s.max),
                &format!("{:.6}", s.std_dev),
                &format!("{:.6}", s.p95),
                &format!("{:.6}", s.p99),
                &raw.errors.get().to_string(),
                &format!("{:.3}", raw.total_time_ms.of(op)),
                &raw.storage_bytes.to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    println!("  CSV exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────────

pub(crate) fn format_bytes(b: u64) -> String {
    if b >= 1_073_741_824 {
        format!("{:.1} GB", b as f64 / 1_073_741_824.0)
    } else if b >= 1_048_576 {
        format!("{:.1} MB", b as f64 / 1_048_576.0)
    } else if b >= 1_024 {
        format!("{:.1} KB", b as f64 / 1_024.0)
    } else {
        format!("{} B", b)
    }
}
