//! CSV bar provider: one file per symbol and timeframe.
//!
//! Files live at `{dir}/{SYMBOL}_{timeframe}.csv` with the header
//! `timestamp,open,high,low,close,volume`. Timestamps are either
//! `YYYY-MM-DD` (daily; stamped at midnight) or `YYYY-MM-DD HH:MM:SS`.
//! Symbols containing `/` (crypto pairs) map to `_` in the file name.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use setupscan_core::domain::Bar;

use crate::provider::{BarProvider, DataError, Timeframe};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvBarProvider {
    dir: PathBuf,
}

impl CsvBarProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        let stem = symbol.replace('/', "_");
        self.dir.join(format!("{stem}_{}.csv", timeframe.token()))
    }

    /// Write `bars` in the provider's format. Used to seed fixtures and to
    /// snapshot fetched data.
    pub fn write_bars(&self, symbol: &str, timeframe: Timeframe, bars: &[Bar]) -> Result<(), DataError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut wtr = csv::Writer::from_path(self.path_for(symbol, timeframe)).map_err(|e| malformed(symbol, e))?;
        wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])
            .map_err(|e| malformed(symbol, e))?;
        for b in bars {
            wtr.write_record([
                b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                b.open.to_string(),
                b.high.to_string(),
                b.low.to_string(),
                b.close.to_string(),
                b.volume.to_string(),
            ])
            .map_err(|e| malformed(symbol, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn malformed(symbol: &str, err: impl std::fmt::Display) -> DataError {
    DataError::Malformed {
        symbol: symbol.to_string(),
        reason: err.to_string(),
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl BarProvider for CsvBarProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| malformed(symbol, e))?;
        let mut bars = Vec::new();
        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| malformed(symbol, e))?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
                malformed(symbol, format!("row {}: bad timestamp {:?}", line + 1, row.timestamp))
            })?;
            if timestamp < start || timestamp > end {
                continue;
            }
            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::{day, full_range, make_bars};

    #[test]
    fn written_bars_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvBarProvider::new(dir.path());
        let bars = make_bars(&[10.0, 10.5, 11.25]);
        provider.write_bars("AAA", Timeframe::Daily, &bars).unwrap();

        let (start, end) = full_range();
        let got = provider.get_bars("AAA", Timeframe::Daily, start, end).unwrap();
        assert_eq!(got, bars);
    }

    #[test]
    fn crypto_pairs_map_to_file_names() {
        let provider = CsvBarProvider::new("/data");
        assert_eq!(
            provider.path_for("BTC/USD", Timeframe::Minute5),
            PathBuf::from("/data/BTC_USD_5min.csv")
        );
    }

    #[test]
    fn date_only_rows_and_range_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("SPY_1day.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-02,470,472,469,471,1000\n\
             2024-01-03,471,473,470,472,1100\n\
             2024-01-04,472,474,471,473,1200\n",
        )
        .unwrap();
        let provider = CsvBarProvider::new(dir.path());
        let start = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let got = provider.get_bars("SPY", Timeframe::Daily, start, day(100)).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].close, 472.0);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvBarProvider::new(dir.path());
        let (start, end) = full_range();
        assert!(matches!(
            provider.get_bars("NOPE", Timeframe::Daily, start, end),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn bad_rows_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("BAD_1day.csv"),
            "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n",
        )
        .unwrap();
        let provider = CsvBarProvider::new(dir.path());
        let (start, end) = full_range();
        assert!(matches!(
            provider.get_bars("BAD", Timeframe::Daily, start, end),
            Err(DataError::Malformed { .. })
        ));
    }
}
