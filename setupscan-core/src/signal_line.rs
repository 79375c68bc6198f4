//! Textual signal line: the stable wire format handed to downstream consumers.
//!
//! Grammar: `$SYMBOL PRICE CHANGE% | METRIC | ... | KIND`
//! - PRICE: `$1,234` from 1000 up, `$12.34` below
//! - CHANGE%: always signed, two decimals (`+3.25%`)
//! - METRIC: `<label> <value>[/<reference>][<flag>]`, e.g. `ATR 2.31x`, `RSI 64/88`
//! - KIND: optional trailing single token marking a met hard threshold
//!
//! Segments are joined by the literal separator `" | "`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Candidate;

pub const SEPARATOR: &str = " | ";

#[derive(Debug, Error, PartialEq)]
pub enum SignalLineError {
    #[error("empty signal line")]
    Empty,

    #[error("malformed header: {0:?}")]
    MalformedHeader(String),

    #[error("invalid number in {field}: {token:?}")]
    BadNumber { field: &'static str, token: String },

    #[error("malformed metric: {0:?}")]
    BadMetric(String),
}

/// One `<label> <value>[/<reference>][<flag>]` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: f64,
    pub reference: Option<f64>,
    pub flag: Option<String>,
    /// Decimal places used when rendering `value` and `reference`.
    pub decimals: usize,
    pub ref_decimals: usize,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: f64, decimals: usize) -> Self {
        Self {
            label: label.into(),
            value,
            reference: None,
            flag: None,
            decimals,
            ref_decimals: 0,
        }
    }

    pub fn with_reference(mut self, reference: f64, decimals: usize) -> Self {
        self.reference = Some(reference);
        self.ref_decimals = decimals;
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.*}", self.label, self.decimals, self.value)?;
        if let Some(r) = self.reference {
            write!(f, "/{:.*}", self.ref_decimals, r)?;
        }
        if let Some(flag) = &self.flag {
            f.write_str(flag)?;
        }
        Ok(())
    }
}

impl FromStr for Metric {
    type Err = SignalLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SignalLineError::BadMetric(s.to_string());
        let (label, rest) = s.split_once(' ').ok_or_else(bad)?;
        if label.is_empty() {
            return Err(bad());
        }
        let (value_txt, rest) = split_number(rest);
        let value = value_txt.parse::<f64>().map_err(|_| bad())?;

        let (reference, ref_txt, rest) = match rest.strip_prefix('/') {
            Some(after) => {
                let (txt, rest) = split_number(after);
                (Some(txt.parse::<f64>().map_err(|_| bad())?), txt, rest)
            }
            None => (None, "", rest),
        };
        let flag = (!rest.is_empty()).then(|| rest.to_string());
        if flag.as_deref().is_some_and(|f| f.contains(' ')) {
            return Err(bad());
        }

        Ok(Self {
            label: label.to_string(),
            value,
            reference,
            flag,
            decimals: decimals_of(value_txt),
            ref_decimals: decimals_of(ref_txt),
        })
    }
}

/// Split a leading signed decimal number off `s`.
fn split_number(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(s.len(), |(i, _)| i);
    s.split_at(end)
}

fn decimals_of(txt: &str) -> usize {
    txt.split_once('.').map_or(0, |(_, frac)| frac.len())
}

/// A parsed or freshly built signal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLine {
    pub symbol: String,
    pub price: f64,
    pub change_pct: f64,
    pub metrics: Vec<Metric>,
    pub kind: Option<String>,
}

impl SignalLine {
    pub fn new(symbol: impl Into<String>, price: f64, change_pct: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change_pct,
            metrics: Vec::new(),
            kind: None,
        }
    }

    pub fn push(&mut self, metric: Metric) -> &mut Self {
        self.metrics.push(metric);
        self
    }

    pub fn metric(&self, label: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.label == label)
    }

    pub fn value(&self, label: &str) -> Option<f64> {
        self.metric(label).map(|m| m.value)
    }

    /// True when the line ends with the given KIND token.
    pub fn has_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Build the line for a ranked candidate.
    ///
    /// Metrics: `ATR <ratio>x`, `Z <z>`, `RSI <rsi>[/<rs pct>]`, `ADR <adr>%`,
    /// `Score <best score>`. Undefined values are left out rather than
    /// printed as zero. KIND is the best triggered tag's label.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let ind = &candidate.indicators;
        let mut line = Self::new(&candidate.symbol, candidate.price, candidate.change_pct);
        if let Some(r) = ind.atr_ratio {
            line.push(Metric::new("ATR", r, 2).with_flag("x"));
        }
        if let Some(z) = ind.zscore {
            line.push(Metric::new("Z", z, 2));
        }
        let rsi = Metric::new("RSI", ind.rsi, 0);
        line.push(match candidate.rs_score {
            Some(rs) => rsi.with_reference(rs * 100.0, 0),
            None => rsi,
        });
        if let Some(adr) = ind.adr_pct {
            line.push(Metric::new("ADR", adr, 1).with_flag("%"));
        }
        if let Some(best) = candidate.best() {
            line.push(Metric::new("Score", best.score, 2));
        }
        line.kind = candidate
            .tags
            .iter()
            .find(|t| t.triggered)
            .map(|t| t.kind.label().to_string());
        line
    }

    pub fn parse(s: &str) -> Result<Self, SignalLineError> {
        s.parse()
    }
}

/// `$1,234` from 1000 up, `$12.34` below. The branch is taken on the price
/// rounded to cents, so 999.996 renders as `$1,000`.
pub fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round() / 100.0;
    if cents.abs() >= 1000.0 {
        let rounded = format!("{:.0}", cents.abs());
        let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
        for (i, ch) in rounded.chars().enumerate() {
            if i > 0 && (rounded.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        let sign = if price < 0.0 { "-" } else { "" };
        format!("{sign}${grouped}")
    } else {
        format!("${cents:.2}")
    }
}

impl fmt::Display for SignalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${} {} {:+.2}%",
            self.symbol,
            format_price(self.price),
            self.change_pct
        )?;
        for m in &self.metrics {
            write!(f, "{SEPARATOR}{m}")?;
        }
        if let Some(kind) = &self.kind {
            write!(f, "{SEPARATOR}{kind}")?;
        }
        Ok(())
    }
}

impl FromStr for SignalLine {
    type Err = SignalLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SignalLineError::Empty);
        }
        let mut segments = s.split(SEPARATOR);
        let header = segments.next().ok_or(SignalLineError::Empty)?;
        let tokens: Vec<&str> = header.split_whitespace().collect();
        let [sym, price, change] = tokens[..] else {
            return Err(SignalLineError::MalformedHeader(header.to_string()));
        };
        let symbol = sym
            .strip_prefix('$')
            .filter(|sym| !sym.is_empty())
            .ok_or_else(|| SignalLineError::MalformedHeader(header.to_string()))?;
        if !(price.starts_with('$') || price.starts_with("-$")) {
            return Err(SignalLineError::MalformedHeader(header.to_string()));
        }
        let price = price
            .replace(['$', ','], "")
            .parse::<f64>()
            .map_err(|_| SignalLineError::BadNumber {
                field: "price",
                token: price.to_string(),
            })?;
        let change_pct = change
            .strip_suffix('%')
            .and_then(|c| c.parse::<f64>().ok())
            .ok_or_else(|| SignalLineError::BadNumber {
                field: "change",
                token: change.to_string(),
            })?;

        let mut line = Self::new(symbol, price, change_pct);
        let rest: Vec<&str> = segments.collect();
        for (i, seg) in rest.iter().enumerate() {
            let is_last = i + 1 == rest.len();
            if is_last && !seg.contains(' ') && !seg.is_empty() {
                line.kind = Some(seg.to_string());
            } else {
                line.metrics.push(seg.parse()?);
            }
        }
        Ok(line)
    }
}
