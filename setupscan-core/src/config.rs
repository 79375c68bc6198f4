//! Scan configuration: named profiles, TOML overrides, validation, fingerprint.
//!
//! A TOML document selects a base profile with `profile = "..."` (default
//! `stocks`) and overrides any subset of its fields. Tables are merged
//! key-by-key, so `[setups.breakout] vol_mult = 2.0` changes one threshold
//! and keeps the rest of the profile.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::IndicatorConfig;
use crate::ranking::RankingConfig;
use crate::regime::RegimeConfig;
use crate::selector::SelectorConfig;
use crate::setups::SetupsConfig;
use crate::spike::{AssetClass, SpikeThresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown profile '{0}' (expected 'stocks' or 'crypto')")]
    UnknownProfile(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Universe-wide screening, applied to each symbol before detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Minimum average daily range, percent.
    pub adr_min_pct: f64,
    pub adr_len: usize,
    /// Keep symbols at or above this percentile of the blended return rank.
    /// `None` disables the filter.
    pub rs_top_percentile: Option<f64>,
    /// Return windows (bars) blended into the RS score, equally weighted.
    pub rs_windows: Vec<usize>,
    pub min_avg_volume: f64,
    pub avg_volume_len: usize,
    pub top_n: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            adr_min_pct: 5.0,
            adr_len: 20,
            rs_top_percentile: Some(0.90),
            rs_windows: vec![21, 63, 126],
            min_avg_volume: 0.0,
            avg_volume_len: 20,
            top_n: 50,
        }
    }
}

/// Opening-range break phase run over a cycle's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningRangeConfig {
    /// Local session open the range is anchored to.
    pub session_open: NaiveTime,
    /// Range length in minutes, 1 to 30.
    pub minutes: u32,
}

impl Default for OpeningRangeConfig {
    fn default() -> Self {
        Self {
            session_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub profile: String,
    pub asset_class: AssetClass,
    /// Symbol whose bars drive the regime gate and RS ratios.
    pub benchmark: String,
    pub indicators: IndicatorConfig,
    pub regime: RegimeConfig,
    pub setups: SetupsConfig,
    pub ranking: RankingConfig,
    pub selector: SelectorConfig,
    pub spike: SpikeThresholds,
    pub screen: ScreenConfig,
    pub opening_range: OpeningRangeConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::stocks()
    }
}

impl ScanConfig {
    pub fn stocks() -> Self {
        Self {
            profile: "stocks".into(),
            asset_class: AssetClass::Stocks,
            benchmark: "SPY".into(),
            indicators: IndicatorConfig::default(),
            regime: RegimeConfig::default(),
            setups: SetupsConfig::default(),
            ranking: RankingConfig::default(),
            selector: SelectorConfig::default(),
            spike: SpikeThresholds::stocks(),
            screen: ScreenConfig::default(),
            opening_range: OpeningRangeConfig::default(),
        }
    }

    /// Crypto trades around the clock: no session gap, so the episodic pivot
    /// detector is off and the benchmark is BTC.
    pub fn crypto() -> Self {
        let mut setups = SetupsConfig::default();
        setups.disabled.push(crate::domain::SetupKind::EpisodicPivot);
        Self {
            profile: "crypto".into(),
            asset_class: AssetClass::Crypto,
            benchmark: "BTC/USD".into(),
            setups,
            spike: SpikeThresholds::crypto(),
            screen: ScreenConfig {
                rs_top_percentile: None,
                ..ScreenConfig::default()
            },
            opening_range: OpeningRangeConfig {
                session_open: NaiveTime::MIN,
                ..OpeningRangeConfig::default()
            },
            ..Self::stocks()
        }
    }

    pub fn profile(name: &str) -> Result<Self, ConfigError> {
        match name {
            "stocks" => Ok(Self::stocks()),
            "crypto" => Ok(Self::crypto()),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }

    /// Parse a TOML document layered on its named profile.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let overrides: toml::Value = toml::from_str(s)?;
        let name = overrides
            .get("profile")
            .and_then(|v| v.as_str())
            .unwrap_or("stocks");
        let mut merged = serde_json::to_value(Self::profile(name)?)?;
        merge(&mut merged, serde_json::to_value(overrides)?);
        Ok(serde_json::from_value(merged)?)
    }

    /// Reject configurations that would make detectors or the selector
    /// meaningless. Run once at cycle start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        for (field, value) in [
            ("indicators.atr_len", ind.atr_len),
            ("indicators.rsi_len", ind.rsi_len),
            ("indicators.z_lookback", ind.z_lookback),
            ("indicators.adr_len", ind.adr_len),
            ("indicators.sma_short", ind.sma_short),
            ("indicators.sma_long", ind.sma_long),
            ("indicators.ema_short", ind.ema_short),
            ("indicators.ema_long", ind.ema_long),
            ("indicators.rs_ma", ind.rs_ma),
            ("regime.short_span", self.regime.short_span),
            ("regime.rising_lookback", self.regime.rising_lookback),
            ("setups.episodic_pivot.avg_volume_len", self.setups.episodic_pivot.avg_volume_len),
            ("setups.parabolic_long.lookback", self.setups.parabolic_long.lookback),
            ("setups.parabolic_long.atr_len", self.setups.parabolic_long.atr_len),
            ("screen.adr_len", self.screen.adr_len),
            ("screen.top_n", self.screen.top_n),
        ] {
            positive_len(field, value)?;
        }
        if self.regime.short_span >= self.regime.long_span {
            return Err(invalid(
                "regime.long_span",
                format!(
                    "must exceed short_span ({} >= {})",
                    self.regime.short_span, self.regime.long_span
                ),
            ));
        }

        for (field, base) in [
            ("setups.breakout", &self.setups.breakout),
            ("setups.range_breakout", &self.setups.range_breakout),
        ] {
            if base.base_len < 2 {
                return Err(invalid(field, "base_len must be at least 2".into()));
            }
            positive_len(field, base.atr_len)?;
            positive_len(field, base.vol_ma)?;
            positive_len(field, base.pivots_needed)?;
            non_negative(field, base.vol_mult)?;
            non_negative(field, base.atr_ratio_thresh)?;
            non_negative(field, base.max_range_width_pct)?;
            non_negative(field, base.min_break_above_pct)?;
            if base.require_impulse && base.impulse_lookback < 2 * base.impulse_half_window + 1 {
                return Err(invalid(
                    field,
                    format!(
                        "impulse_lookback {} is shorter than one impulse window ({})",
                        base.impulse_lookback,
                        2 * base.impulse_half_window + 1
                    ),
                ));
            }
        }
        if !self.setups.range_breakout.require_higher_lows {
            return Err(invalid(
                "setups.range_breakout.require_higher_lows",
                "range breakouts always require higher lows".into(),
            ));
        }

        let ep = &self.setups.episodic_pivot;
        non_negative("setups.episodic_pivot.gap_min_pct", ep.gap_min_pct)?;
        non_negative("setups.episodic_pivot.premarket_notional_min", ep.premarket_notional_min)?;
        non_negative("setups.episodic_pivot.opening_volume_mult", ep.opening_volume_mult)?;
        let pl = &self.setups.parabolic_long;
        non_negative("setups.parabolic_long.crash_min_pct", pl.crash_min_pct)?;
        non_negative("setups.parabolic_long.oversold_atr_multiple", pl.oversold_atr_multiple)?;

        let sel = &self.selector;
        for (field, w) in [
            ("selector.atr_weight", sel.atr_weight),
            ("selector.z_weight", sel.z_weight),
            ("selector.change_weight", sel.change_weight),
        ] {
            non_negative(field, w)?;
        }
        if sel.atr_weight + sel.z_weight + sel.change_weight <= 0.0 {
            return Err(invalid("selector", "weights must not all be zero".into()));
        }

        let sp = &self.spike;
        non_negative("spike.breakout_tr_atr", sp.breakout_tr_atr)?;
        non_negative("spike.breakout_z", sp.breakout_z)?;
        non_negative("spike.breakout_dp", sp.breakout_dp)?;
        if sp.exit_score_min > 6 {
            return Err(invalid(
                "spike.exit_score_min",
                format!("{} exceeds the six exhaustion conditions", sp.exit_score_min),
            ));
        }

        let sc = &self.screen;
        non_negative("screen.adr_min_pct", sc.adr_min_pct)?;
        non_negative("screen.min_avg_volume", sc.min_avg_volume)?;
        if let Some(p) = sc.rs_top_percentile {
            if !(p > 0.0 && p <= 1.0) {
                return Err(invalid("screen.rs_top_percentile", format!("{p} is outside (0, 1]")));
            }
        }
        if sc.rs_windows.is_empty() || sc.rs_windows.contains(&0) {
            return Err(invalid("screen.rs_windows", "need one or more positive windows".into()));
        }
        if !(1..=30).contains(&self.opening_range.minutes) {
            return Err(invalid(
                "opening_range.minutes",
                format!("{} is outside 1..=30", self.opening_range.minutes),
            ));
        }
        if self.benchmark.trim().is_empty() {
            return Err(invalid("benchmark", "symbol is empty".into()));
        }
        Ok(())
    }

    /// Content hash of the effective configuration (hex blake3 of its JSON).
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn positive_len(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be positive".into()));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, format!("{value} must be finite and >= 0")));
    }
    Ok(())
}

/// Recursive table merge; non-table values in `overrides` replace `base`.
fn merge(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(b), serde_json::Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SetupKind;

    #[test]
    fn profiles_validate() {
        ScanConfig::stocks().validate().unwrap();
        ScanConfig::crypto().validate().unwrap();
    }

    #[test]
    fn opening_range_defaults_and_bounds() {
        let stocks = ScanConfig::stocks();
        assert_eq!(stocks.opening_range.minutes, 5);
        assert_eq!(stocks.opening_range.session_open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(ScanConfig::crypto().opening_range.session_open, NaiveTime::MIN);

        let cfg = ScanConfig::from_toml("[opening_range]\nminutes = 45\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "opening_range.minutes", .. })
        ));
        let cfg = ScanConfig::from_toml("[opening_range]\nminutes = 15\n").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.opening_range.session_open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn impulse_lookback_must_hold_one_window() {
        let cfg = ScanConfig::from_toml("[setups.breakout]\nimpulse_lookback = 30\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "setups.breakout", .. })
        ));
        // The range breakout never searches for an impulse.
        let cfg = ScanConfig::from_toml("[setups.range_breakout]\nimpulse_lookback = 30\n").unwrap();
        cfg.validate().unwrap();
    }

    #[test]
    fn unknown_profile_is_an_error() {
        assert!(matches!(
            ScanConfig::profile("forex"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn empty_toml_is_the_stocks_profile() {
        assert_eq!(ScanConfig::from_toml("").unwrap(), ScanConfig::stocks());
    }

    #[test]
    fn toml_overrides_one_field_and_keeps_the_profile() {
        let cfg = ScanConfig::from_toml(
            r#"
profile = "crypto"

[setups.breakout]
vol_mult = 2.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.asset_class, AssetClass::Crypto);
        assert_eq!(cfg.setups.breakout.vol_mult, 2.0);
        assert_eq!(
            cfg.setups.breakout.base_len,
            ScanConfig::crypto().setups.breakout.base_len
        );
        assert_eq!(cfg.spike, SpikeThresholds::crypto());
        assert!(cfg.setups.disabled.contains(&SetupKind::EpisodicPivot));
    }

    #[test]
    fn toml_priority_map_uses_kind_names() {
        let cfg = ScanConfig::from_toml(
            r#"
[ranking.priorities]
range_breakout = 9
"#,
        )
        .unwrap();
        assert_eq!(cfg.ranking.priority(SetupKind::RangeBreakout), 9);
        assert_eq!(cfg.ranking.priority(SetupKind::EpisodicPivot), 4);
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(
            ScanConfig::from_toml("setups = ["),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = ScanConfig::stocks();
        cfg.regime.long_span = cfg.regime.short_span;
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::stocks();
        cfg.setups.range_breakout.require_higher_lows = false;
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::stocks();
        cfg.selector.atr_weight = 0.0;
        cfg.selector.z_weight = 0.0;
        cfg.selector.change_weight = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::stocks();
        cfg.screen.rs_top_percentile = Some(1.5);
        assert!(cfg.validate().is_err());

        let mut cfg = ScanConfig::stocks();
        cfg.setups.breakout.vol_mult = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = ScanConfig::stocks();
        let mut b = ScanConfig::stocks();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.setups.breakout.vol_mult = 1.6;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }
}
