//! Setupscan Runner: scan cycle orchestration on top of `setupscan-core`.
//!
//! This crate provides:
//! - Bar providers (in-memory, CSV) behind the `BarProvider` trait
//! - Static and dynamic universe providers
//! - Batch fetch with per-symbol failure isolation
//! - Universe-wide screening (ADR, volume, cross-sectional RS)
//! - The parallel scan cycle with deadline handling
//! - The opening-range break phase over a cycle's candidates
//! - Cycle reports and JSON/CSV export
//! - Tracing subscriber setup

pub mod csv_source;
pub mod cycle;
pub mod fetch;
pub mod logging;
pub mod opening;
pub mod provider;
pub mod report;
pub mod screen;
pub mod universe;

pub use csv_source::CsvBarProvider;
pub use cycle::{run_cycle, run_scan, run_spike_cycle, CycleError, CycleOptions, SpikeCycle};
pub use fetch::{fetch_batch, session_snapshot, FetchRequest, FetchedUniverse, SymbolFailure};
pub use opening::{attach_opening_range, opening_range_phase, OpeningRangeReport, OpeningRangeResult};
pub use provider::{BarProvider, DataError, InMemoryProvider, Timeframe};
pub use report::{
    export_candidates_csv, export_json, export_opening_range_csv, import_json, save_artifacts, CycleReport,
};
pub use screen::{rs_percentiles, ScreenSummary, ScreenVerdict, Screener};
pub use universe::{
    AssetDirectory, AssetInfo, DynamicUniverse, InMemoryDirectory, StaticUniverse, UniverseConfig,
    UniverseError, UniverseFilters, UniverseMode, UniverseProvider,
};
