//! One scan cycle: regime once, per-symbol screening and detection across a
//! worker pool, then ranking and selection.
//!
//! The per-symbol pipeline shares only read-only state (config, regime,
//! detectors, screener). Merging into the ranker after the pool finishes is
//! the single synchronization point. Symbols not started before the
//! deadline are reported as skipped; partial completion is a normal result.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use setupscan_core::domain::{BarSeries, Candidate, IndicatorSet, SessionSnapshot};
use setupscan_core::indicators::{adr_pct, align_benchmark};
use setupscan_core::ranking::Ranker;
use setupscan_core::regime::RegimeState;
use setupscan_core::selector::{CycleSelector, Selection};
use setupscan_core::setups::{DetectionContext, DetectorSet};
use setupscan_core::signal_line::SignalLine;
use setupscan_core::spike::{classify_long_entry, spike_metrics, spike_signal_line, EntryContext};
use setupscan_core::{ConfigError, ScanConfig};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fetch::{fetch_batch, FetchRequest, FetchedUniverse};
use crate::provider::BarProvider;
use crate::report::CycleReport;
use crate::screen::{ScreenSummary, ScreenVerdict, Screener};
use crate::universe::{UniverseError, UniverseProvider};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("no data for any of {requested} requested symbols")]
    NoData { requested: usize },

    #[error("universe error: {0}")]
    Universe(#[from] UniverseError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Worker threads. 1 runs sequentially on the calling thread.
    pub workers: usize,
    /// Symbols not started within this budget are skipped.
    pub timeout: Option<Duration>,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            timeout: None,
        }
    }
}

impl CycleOptions {
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            timeout: None,
        }
    }
}

enum SymbolOutcome {
    Candidate(Box<Candidate>),
    NoSetup,
    Screened(ScreenVerdict),
    Skipped(String),
}

/// Read-only state shared by every worker.
struct CycleContext<'a> {
    config: &'a ScanConfig,
    regime: RegimeState,
    benchmark: Option<&'a BarSeries>,
    detectors: DetectorSet,
    screener: Screener,
    sessions: &'a HashMap<String, SessionSnapshot>,
    deadline: Option<Instant>,
}

impl CycleContext<'_> {
    fn evaluate(&self, series: &BarSeries) -> SymbolOutcome {
        let symbol = series.symbol();
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return SymbolOutcome::Skipped(symbol.to_string());
        }

        let verdict = self.screener.check(series);
        if !verdict.passed() {
            debug!(symbol, ?verdict, "screened out");
            return SymbolOutcome::Screened(verdict);
        }

        // Bars before the benchmark's first close stay NaN; RS reads only
        // the trailing window and declines when that window is not covered.
        let aligned = self.benchmark.map(|bench| {
            let closes = align_benchmark(series.bars(), bench.bars());
            if closes.iter().any(|c| !c.is_finite()) {
                debug!(symbol, "benchmark covers only part of the series");
            }
            closes
        });

        let mut ctx = DetectionContext::new(series, &self.regime);
        if let Some(closes) = aligned.as_deref() {
            ctx = ctx.with_benchmark(closes);
        }
        if let Some(session) = self.sessions.get(symbol) {
            ctx = ctx.with_session(session);
        }

        let tags = self.detectors.detect_all(&ctx);
        if tags.is_empty() {
            debug!(symbol, bars = series.len(), "no setup");
            return SymbolOutcome::NoSetup;
        }
        debug!(
            symbol,
            kinds = ?tags.iter().map(|t| t.kind).collect::<Vec<_>>(),
            "setups detected"
        );

        let indicators = IndicatorSet::compute(series, aligned.as_deref(), &self.config.indicators);
        let price = series.last().map_or(f64::NAN, |b| b.close);
        SymbolOutcome::Candidate(Box::new(Candidate {
            symbol: symbol.to_string(),
            tags,
            price,
            change_pct: indicators.change_pct.unwrap_or(0.0),
            indicators,
            rs_score: self.screener.rs_score(symbol),
        }))
    }
}

fn map_symbols<T, F>(series: &[BarSeries], workers: usize, f: F) -> Result<Vec<T>, CycleError>
where
    T: Send,
    F: Fn(&BarSeries) -> T + Sync + Send,
{
    if workers > 1 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
        Ok(pool.install(|| series.par_iter().map(&f).collect()))
    } else {
        Ok(series.iter().map(f).collect())
    }
}

/// Run detection over already-fetched data.
///
/// `sessions` carries optional per-symbol session snapshots (gap-day open,
/// pre-session notional) for the episodic pivot detector.
pub fn run_cycle(
    config: &ScanConfig,
    data: &FetchedUniverse,
    sessions: &HashMap<String, SessionSnapshot>,
    options: &CycleOptions,
) -> Result<CycleReport, CycleError> {
    let started = Instant::now();
    let started_at = chrono::Utc::now().naive_utc();
    config.validate()?;
    let fingerprint = config.fingerprint()?;
    info!(profile = %config.profile, fingerprint = %fingerprint, "cycle starting");

    if data.series.is_empty() {
        return Err(CycleError::NoData {
            requested: data.requested(),
        });
    }

    let regime = match &data.benchmark {
        Some(bench) => RegimeState::evaluate(&bench.closes(), &config.regime),
        None => RegimeState::closed(),
    };
    info!(
        benchmark = %config.benchmark,
        open = regime.is_open,
        short_ema = ?regime.short_ema,
        long_ema = ?regime.long_ema,
        "regime evaluated"
    );

    let ctx = CycleContext {
        config,
        regime,
        benchmark: data.benchmark.as_ref(),
        detectors: DetectorSet::from_config(&config.setups),
        screener: Screener::new(config.screen.clone(), &data.series),
        sessions,
        deadline: options.timeout.map(|t| started + t),
    };

    let outcomes = map_symbols(&data.series, options.workers, |s| ctx.evaluate(s))?;

    let mut summary = ScreenSummary::default();
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            SymbolOutcome::Candidate(c) => {
                summary.record(&ScreenVerdict::Pass);
                summary.with_setups += 1;
                candidates.push(*c);
            }
            SymbolOutcome::NoSetup => summary.record(&ScreenVerdict::Pass),
            SymbolOutcome::Screened(verdict) => summary.record(&verdict),
            SymbolOutcome::Skipped(symbol) => skipped.push(symbol),
        }
    }
    if !skipped.is_empty() {
        warn!(skipped = skipped.len(), "deadline reached, ranking partial results");
    }

    let mut ranked = Ranker::new(config.ranking.clone()).rank(candidates);
    ranked.truncate(ctx.screener.top_n());
    summary.record_emitted(&ranked);

    let selection = CycleSelector::new(config.selector.clone()).select_candidates(&ranked);
    let lines = ranked.iter().map(|c| SignalLine::from_candidate(c).to_string()).collect();

    info!(
        screened = summary.screened,
        with_setups = summary.with_setups,
        emitted = summary.emitted,
        failed = data.failures.len(),
        skipped = skipped.len(),
        "cycle complete"
    );

    Ok(CycleReport {
        schema_version: crate::report::SCHEMA_VERSION,
        started_at,
        profile: config.profile.clone(),
        config_fingerprint: fingerprint,
        regime: ctx.regime,
        candidates: ranked,
        lines,
        selection,
        summary,
        failures: data.failures.clone(),
        skipped,
        elapsed_ms: started.elapsed().as_millis() as u64,
        opening_range: None,
    })
}

/// Resolve the universe, batch-fetch, then run the cycle.
pub fn run_scan(
    provider: &dyn BarProvider,
    universe: &dyn UniverseProvider,
    config: &ScanConfig,
    request: &FetchRequest,
    sessions: &HashMap<String, SessionSnapshot>,
    options: &CycleOptions,
) -> Result<CycleReport, CycleError> {
    config.validate()?;
    let symbols = universe.symbols()?;
    info!(universe = universe.name(), symbols = symbols.len(), "universe resolved");
    let data = fetch_batch(provider, &symbols, &config.benchmark, request);
    run_cycle(config, &data, sessions, options)
}

/// Result of an intraday spike cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeCycle {
    pub lines: Vec<SignalLine>,
    pub entries: usize,
    pub selection: Selection,
}

/// Classify each symbol's intraday bars for momentum entries and select
/// the most volatile line.
pub fn run_spike_cycle(
    config: &ScanConfig,
    data: &FetchedUniverse,
    contexts: &HashMap<String, EntryContext>,
    options: &CycleOptions,
) -> Result<SpikeCycle, CycleError> {
    config.validate()?;
    if data.series.is_empty() {
        return Err(CycleError::NoData {
            requested: data.requested(),
        });
    }
    let screener = Screener::new(config.screen.clone(), &data.series);
    let default_ctx = EntryContext::default();

    let lines: Vec<Option<(SignalLine, bool)>> = map_symbols(&data.series, options.workers, |series| {
        let ctx = contexts.get(series.symbol()).unwrap_or(&default_ctx);
        let metrics = spike_metrics(series.bars(), ctx.prev_close)?;
        let entry = classify_long_entry(&metrics, ctx, &config.spike);
        debug!(symbol = series.symbol(), tr_atr = ?metrics.tr_atr, z = metrics.z, entry = entry.is_some(), "spike metrics");
        let rs = screener.rs_score(series.symbol()).map(|r| r * 100.0);
        let adr = adr_pct(series.bars(), config.screen.adr_len);
        let line = spike_signal_line(series.symbol(), series.bars(), &metrics, rs, adr, entry.as_ref());
        Some((line, entry.is_some()))
    })?;

    let (lines, flags): (Vec<SignalLine>, Vec<bool>) = lines.into_iter().flatten().unzip();
    let entries = flags.iter().filter(|f| **f).count();
    let selection = CycleSelector::new(config.selector.clone()).select(&lines);
    info!(symbols = data.series.len(), lines = lines.len(), entries, "spike cycle complete");
    Ok(SpikeCycle {
        lines,
        entries,
        selection,
    })
}
