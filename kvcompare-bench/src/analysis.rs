//! Post-run analysis of a saved report.
//!
//! Derives per-backend figures (throughput, reliability, consistency,
//! normalized 0–100 scores), per-operation speedups and a headline verdict,
//! prints them, and writes them as a second JSON artifact. Works purely from
//! `benchmark_results.json`; no backend is contacted.

use crate::report::{self, format_bytes, pick_winner, BenchmarkReport, Winner};
use crate::{BackendKind, BenchResult, OpKind};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_ANALYSIS_OUTPUT: &str = "comprehensive_report.json";

/// 0–100 scores, higher is better on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub performance: f64,
    pub throughput: f64,
    pub reliability: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendAnalysis {
    pub avg_latency_ms: f64,
    pub total_operations: usize,
    pub failed_operations: u64,
    pub throughput_ops_sec: f64,
    /// Successful share of attempted operations.
    pub reliability_pct: f64,
    /// `100 − Σ std_dev / 3`, floored at 0.
    pub consistency_score: f64,
    pub storage_bytes: u64,
    pub scores: Scores,
}

impl BackendAnalysis {
    /// `None` when the backend recorded no successful operation.
    pub fn from_report(report: &BenchmarkReport, kind: BackendKind) -> Option<Self> {
        let stats: Vec<_> = OpKind::ALL.iter().map(|&op| report.stats(kind, op)).collect();
        let total_operations: usize = stats.iter().map(|s| s.count).sum();
        if total_operations == 0 {
            return None;
        }

        let weighted: f64 = stats.iter().map(|s| s.mean * s.count as f64).sum();
        let avg_latency_ms = weighted / total_operations as f64;
        let throughput_ops_sec = if avg_latency_ms > 0.0 {
            1_000.0 / avg_latency_ms
        } else {
            0.0
        };

        let failed_operations = report.errors(kind);
        let attempted = total_operations as f64 + failed_operations as f64;
        let reliability_pct = total_operations as f64 / attempted * 100.0;

        let spread: f64 = stats.iter().map(|s| s.std_dev).sum();
        let consistency_score = (100.0 - spread / 3.0).max(0.0);

        Some(Self {
            avg_latency_ms,
            total_operations,
            failed_operations,
            throughput_ops_sec,
            reliability_pct,
            consistency_score,
            storage_bytes: report.raw(kind).storage_bytes,
            scores: Scores {
                performance: (100.0 - avg_latency_ms * 5.0).clamp(0.0, 100.0),
                throughput: (throughput_ops_sec / 10.0).min(100.0),
                reliability: reliability_pct,
                consistency: consistency_score,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpSpeedup {
    pub op: OpKind,
    pub ssdb_mean_ms: f64,
    pub kvrocks_mean_ms: f64,
    /// Set only when both backends have a nonzero mean.
    pub faster: Option<BackendKind>,
    /// Slower mean over faster mean.
    pub speedup: Option<f64>,
}

impl OpSpeedup {
    fn compute(report: &BenchmarkReport, op: OpKind) -> Self {
        let ssdb = report.stats(BackendKind::Ssdb, op).mean;
        let kvrocks = report.stats(BackendKind::Kvrocks, op).mean;
        let (faster, speedup) = if ssdb > 0.0 && kvrocks > 0.0 {
            match pick_winner(ssdb, kvrocks) {
                Winner::Backend(kind) => (Some(kind), Some(ssdb.max(kvrocks) / ssdb.min(kvrocks))),
                Winner::Tie => (None, None),
            }
        } else {
            (None, None)
        };
        Self {
            op,
            ssdb_mean_ms: ssdb,
            kvrocks_mean_ms: kvrocks,
            faster,
            speedup,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub winner: BackendKind,
    /// Loser's average latency over the winner's.
    pub latency_ratio: f64,
    pub throughput_advantage_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub generated_at: String,
    pub report_timestamp: String,
    pub sample_size: usize,
    pub backends: BTreeMap<BackendKind, BackendAnalysis>,
    pub speedups: Vec<OpSpeedup>,
    /// Present only when both backends have results.
    pub summary: Option<AnalysisSummary>,
}

impl Analysis {
    pub fn from_report(report: &BenchmarkReport) -> Self {
        let backends: BTreeMap<_, _> = BackendKind::ALL
            .iter()
            .filter_map(|&kind| BackendAnalysis::from_report(report, kind).map(|a| (kind, a)))
            .collect();

        let summary = report.overall().verdict.and_then(|v| {
            let fast = backends.get(&v.faster)?;
            let slow = backends.get(&v.faster.opponent())?;
            if fast.avg_latency_ms <= 0.0 || slow.throughput_ops_sec <= 0.0 {
                return None;
            }
            Some(AnalysisSummary {
                winner: v.faster,
                latency_ratio: slow.avg_latency_ms / fast.avg_latency_ms,
                throughput_advantage_pct: (fast.throughput_ops_sec - slow.throughput_ops_sec)
                    / slow.throughput_ops_sec
                    * 100.0,
            })
        });

        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            report_timestamp: report.timestamp.clone(),
            sample_size: report.sample_size,
            backends,
            speedups: OpKind::ALL
                .iter()
                .map(|&op| OpSpeedup::compute(report, op))
                .collect(),
            summary,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────────

fn cell_for(analysis: &Analysis, kind: BackendKind, f: impl Fn(&BackendAnalysis) -> String) -> Cell {
    match analysis.backends.get(&kind) {
        Some(a) => Cell::new(f(a)),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}

pub fn print_analysis(analysis: &Analysis) {
    println!(
        "\n{}",
        "━━━ Comprehensive Analysis ━━━".bold().cyan()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Metric", "SSDB", "KVRocks"]);

    type Row = (&'static str, fn(&BackendAnalysis) -> String);
    let rows: [Row; 7] = [
        ("Avg latency (ms)", |a| format!("{:.3}", a.avg_latency_ms)),
        ("Throughput (ops/s)", |a| format!("{:.0}", a.throughput_ops_sec)),
        ("Reliability (%)", |a| format!("{:.2}", a.reliability_pct)),
        ("Consistency", |a| format!("{:.1}", a.consistency_score)),
        ("Storage", |a| format_bytes(a.storage_bytes)),
        ("Performance score", |a| format!("{:.1}", a.scores.performance)),
        ("Throughput score", |a| format!("{:.1}", a.scores.throughput)),
    ];
    for (label, f) in rows {
        table.add_row(vec![
            Cell::new(label),
            cell_for(analysis, BackendKind::Ssdb, f),
            cell_for(analysis, BackendKind::Kvrocks, f),
        ]);
    }
    println!("{table}");

    let mut speedups = Table::new();
    speedups
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);
    speedups.set_header(vec!["Operation", "SSDB mean", "KVRocks mean", "Faster", "Speedup"]);
    for s in &analysis.speedups {
        let (faster, speedup) = match (s.faster, s.speedup) {
            (Some(kind), Some(x)) => (
                Cell::new(kind.display_name()).fg(Color::Green),
                Cell::new(format!("{:.2}x", x)),
            ),
            _ => (Cell::new("-"), Cell::new("-")),
        };
        speedups.add_row(vec![
            Cell::new(s.op.label()),
            Cell::new(format!("{:.3}", s.ssdb_mean_ms)),
            Cell::new(format!("{:.3}", s.kvrocks_mean_ms)),
            faster,
            speedup,
        ]);
    }
    println!("{speedups}");

    match &analysis.summary {
        Some(s) => {
            println!("\n{}", "🎯 Key insights".bold().yellow());
            println!("  • Winner: {}", s.winner.to_string().bold().green());
            println!("  • Performance: {:.1}x faster on average", s.latency_ratio);
            println!("  • Throughput: {:.0}% higher", s.throughput_advantage_pct);
        }
        None => println!(
            "  {}",
            "both backends need results for a head-to-head verdict".dimmed()
        ),
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────────

pub fn save(analysis: &Analysis, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(analysis)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a saved report, re-render it, analyze it and write the analysis.
pub fn run(input: &Path, output: &Path) -> BenchResult<Analysis> {
    let report = report::load_json(input)?;
    tracing::info!(input = %input.display(), timestamp = %report.timestamp, "loaded report");

    report::print_report(&report);
    let analysis = Analysis::from_report(&report);
    print_analysis(&analysis);
    save(&analysis, output)?;
    println!("\n  Analysis saved to {}", output.display());
    Ok(analysis)
}
