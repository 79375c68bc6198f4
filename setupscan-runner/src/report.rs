//! Cycle report and export: JSON and CSV artifacts.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: one row per emitted candidate for spreadsheets
//! - **Text**: the signal lines, one per row, in rank order
//! - **Opening range**: one CSV row per candidate once that phase has run
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use setupscan_core::domain::Candidate;
use setupscan_core::regime::RegimeState;
use setupscan_core::selector::Selection;

use crate::fetch::SymbolFailure;
use crate::opening::OpeningRangeReport;
use crate::screen::ScreenSummary;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub schema_version: u32,
    pub started_at: NaiveDateTime,
    pub profile: String,
    pub config_fingerprint: String,
    pub regime: RegimeState,
    /// Ranked, truncated to the screen's top-N.
    pub candidates: Vec<Candidate>,
    /// Signal lines for `candidates`, same order.
    pub lines: Vec<String>,
    pub selection: Selection,
    pub summary: ScreenSummary,
    pub failures: Vec<SymbolFailure>,
    /// Symbols not started before the deadline.
    pub skipped: Vec<String>,
    pub elapsed_ms: u64,
    /// Filled in by the opening-range phase after the session opens.
    #[serde(default)]
    pub opening_range: Option<OpeningRangeReport>,
}

impl CycleReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn selected_line(&self) -> Option<String> {
        self.selection.line().map(|l| l.to_string())
    }
}

/// Serialize a `CycleReport` to pretty JSON.
pub fn export_json(report: &CycleReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize CycleReport to JSON")
}

/// Deserialize a `CycleReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<CycleReport> {
    let report: CycleReport =
        serde_json::from_str(json).context("failed to deserialize CycleReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.decimals$}"))
}

/// Export candidates as CSV.
///
/// Columns: rank, symbol, kind, triggered, score, price, change_pct,
/// atr_ratio, zscore, rsi, adr_pct, rs_score, kinds
pub fn export_candidates_csv(candidates: &[Candidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "symbol",
        "kind",
        "triggered",
        "score",
        "price",
        "change_pct",
        "atr_ratio",
        "zscore",
        "rsi",
        "adr_pct",
        "rs_score",
        "kinds",
    ])?;
    for (i, c) in candidates.iter().enumerate() {
        let best = c.best();
        let kinds: Vec<&str> = c.tags.iter().map(|t| t.kind.name()).collect();
        wtr.write_record([
            (i + 1).to_string(),
            c.symbol.clone(),
            best.map_or_else(String::new, |t| t.kind.name().to_string()),
            best.is_some_and(|t| t.triggered).to_string(),
            opt(best.map(|t| t.score), 3),
            format!("{:.2}", c.price),
            format!("{:.2}", c.change_pct),
            opt(c.indicators.atr_ratio, 3),
            opt(c.indicators.zscore, 3),
            format!("{:.1}", c.indicators.rsi),
            opt(c.indicators.adr_pct, 2),
            opt(c.rs_score, 3),
            kinds.join(";"),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export opening-range results as CSV.
///
/// Columns: symbol, orh, orl, last, bars, triggered, breakout_pct, error
pub fn export_opening_range_csv(phase: &OpeningRangeReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "orh", "orl", "last", "bars", "triggered", "breakout_pct", "error"])?;
    for r in &phase.results {
        let range = r.range.as_ref();
        wtr.write_record([
            r.symbol.clone(),
            opt(range.map(|x| x.high), 2),
            opt(range.map(|x| x.low), 2),
            opt(range.map(|x| x.last), 2),
            range.map_or_else(String::new, |x| x.bars.to_string()),
            r.triggered().to_string(),
            format!("{:.2}", r.breakout_pct),
            r.error.clone().unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Save the artifact set for one cycle.
///
/// Creates `{profile}_{timestamp}/` under `output_dir` containing
/// `report.json`, `candidates.csv`, `signals.txt`, and `opening_range.csv`
/// once the opening-range phase has run. Returns the directory.
pub fn save_artifacts(report: &CycleReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", report.profile, report.started_at.format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("candidates.csv"), export_candidates_csv(&report.candidates)?)?;
    let mut signals = report.lines.join("\n");
    if !signals.is_empty() {
        signals.push('\n');
    }
    std::fs::write(run_dir.join("signals.txt"), signals)?;
    if let Some(phase) = &report.opening_range {
        std::fs::write(run_dir.join("opening_range.csv"), export_opening_range_csv(phase)?)?;
    }
    Ok(run_dir)
}
