//! Universe providers: which symbols a cycle scans.
//!
//! A static universe is a configured list. A dynamic universe filters a
//! broker asset listing down to liquid, optionable common stock and adds an
//! always-include list. A failed listing is an error; there is no fallback
//! symbol list.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("asset listing failed: {0}")]
    Listing(String),

    #[error("universe '{0}' resolved to no symbols")]
    Empty(String),

    #[error("dynamic universe needs an asset directory")]
    NoDirectory,

    #[error("universe TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub trait UniverseProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sorted, de-duplicated symbols.
    fn symbols(&self) -> Result<Vec<String>, UniverseError>;
}

#[derive(Debug, Clone)]
pub struct StaticUniverse {
    symbols: Vec<String>,
}

impl StaticUniverse {
    pub fn new<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        let set: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| s.into().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            symbols: set.into_iter().collect(),
        }
    }
}

impl UniverseProvider for StaticUniverse {
    fn name(&self) -> &str {
        "static"
    }

    fn symbols(&self) -> Result<Vec<String>, UniverseError> {
        if self.symbols.is_empty() {
            return Err(UniverseError::Empty(self.name().to_string()));
        }
        Ok(self.symbols.clone())
    }
}

/// One tradable instrument from a broker listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub tradable: bool,
    pub has_options: bool,
    pub last_price: Option<f64>,
    pub avg_volume: Option<f64>,
}

/// Source of the full asset listing (a broker's assets endpoint).
pub trait AssetDirectory: Send + Sync {
    fn list_assets(&self) -> Result<Vec<AssetInfo>, UniverseError>;
}

/// Directory over a fixed listing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    assets: Vec<AssetInfo>,
}

impl InMemoryDirectory {
    pub fn new(assets: Vec<AssetInfo>) -> Self {
        Self { assets }
    }
}

impl AssetDirectory for InMemoryDirectory {
    fn list_assets(&self) -> Result<Vec<AssetInfo>, UniverseError> {
        Ok(self.assets.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilters {
    pub min_price: f64,
    pub min_avg_volume: f64,
    pub require_options: bool,
    pub exchanges: Vec<String>,
    /// Name substrings marking funds and trusts.
    pub etf_keywords: Vec<String>,
    /// Name substrings marking leveraged or inverse products.
    pub leveraged_keywords: Vec<String>,
    /// Added after filtering, exempt from every filter.
    pub always_include: Vec<String>,
}

fn strings(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

impl Default for UniverseFilters {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            min_avg_volume: 100_000.0,
            require_options: true,
            exchanges: strings(&["NYSE", "NASDAQ"]),
            etf_keywords: strings(&["ETF", "Trust", "Fund", "Index", "REIT"]),
            leveraged_keywords: strings(&[
                "Ultra", "2x", "3x", "Bull", "Bear", "Inverse", "Short", "Leveraged", "ProShares",
                "Direxion", "Daily",
            ]),
            always_include: strings(&["SPY", "QQQ", "GLD"]),
        }
    }
}

impl UniverseFilters {
    pub fn accepts(&self, asset: &AssetInfo) -> bool {
        let excluded = |keywords: &[String]| keywords.iter().any(|k| asset.name.contains(k.as_str()));
        asset.tradable
            && (!self.require_options || asset.has_options)
            && self.exchanges.iter().any(|e| e.eq_ignore_ascii_case(&asset.exchange))
            && asset.last_price.is_some_and(|p| p >= self.min_price)
            && asset.avg_volume.is_some_and(|v| v >= self.min_avg_volume)
            && !excluded(&self.etf_keywords)
            && !excluded(&self.leveraged_keywords)
    }
}

pub struct DynamicUniverse {
    directory: Arc<dyn AssetDirectory>,
    filters: UniverseFilters,
}

impl DynamicUniverse {
    pub fn new(directory: Arc<dyn AssetDirectory>, filters: UniverseFilters) -> Self {
        Self { directory, filters }
    }
}

impl UniverseProvider for DynamicUniverse {
    fn name(&self) -> &str {
        "dynamic"
    }

    fn symbols(&self) -> Result<Vec<String>, UniverseError> {
        let assets = self.directory.list_assets()?;
        let listed = assets.len();
        let mut symbols: BTreeSet<String> = assets
            .into_iter()
            .filter(|a| self.filters.accepts(a))
            .map(|a| a.symbol)
            .collect();
        let filtered = symbols.len();
        symbols.extend(self.filters.always_include.iter().cloned());
        info!(listed, filtered, total = symbols.len(), "dynamic universe resolved");
        if symbols.is_empty() {
            return Err(UniverseError::Empty(self.name().to_string()));
        }
        Ok(symbols.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseMode {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub mode: UniverseMode,
    pub static_symbols: Vec<String>,
    pub filters: UniverseFilters,
}

impl UniverseConfig {
    pub fn from_toml(s: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(s)?)
    }

    /// Build the configured provider. Dynamic mode needs a directory.
    pub fn build(
        &self,
        directory: Option<Arc<dyn AssetDirectory>>,
    ) -> Result<Box<dyn UniverseProvider>, UniverseError> {
        match self.mode {
            UniverseMode::Static => Ok(Box::new(StaticUniverse::new(self.static_symbols.clone()))),
            UniverseMode::Dynamic => {
                let directory = directory.ok_or(UniverseError::NoDirectory)?;
                Ok(Box::new(DynamicUniverse::new(directory, self.filters.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(symbol: &str, name: &str, price: f64) -> AssetInfo {
        AssetInfo {
            symbol: symbol.into(),
            name: name.into(),
            exchange: "NASDAQ".into(),
            tradable: true,
            has_options: true,
            last_price: Some(price),
            avg_volume: Some(2_000_000.0),
        }
    }

    struct FailingDirectory;

    impl AssetDirectory for FailingDirectory {
        fn list_assets(&self) -> Result<Vec<AssetInfo>, UniverseError> {
            Err(UniverseError::Listing("401 unauthorized".into()))
        }
    }

    #[test]
    fn static_universe_normalizes() {
        let u = StaticUniverse::new(["nvda", " AAPL ", "NVDA", ""]);
        assert_eq!(u.symbols().unwrap(), vec!["AAPL", "NVDA"]);
    }

    #[test]
    fn empty_static_universe_is_an_error() {
        let u = StaticUniverse::new(Vec::<String>::new());
        assert!(matches!(u.symbols(), Err(UniverseError::Empty(_))));
    }

    #[test]
    fn dynamic_universe_applies_filters_and_always_include() {
        let mut otc = asset("OTCX", "Otc Corp", 20.0);
        otc.exchange = "OTC".into();
        let mut no_options = asset("NOPT", "Plain Inc", 30.0);
        no_options.has_options = false;
        let directory = InMemoryDirectory::new(vec![
            asset("NVDA", "NVIDIA Corporation", 900.0),
            asset("PENY", "Penny Holdings", 4.0),
            asset("TQQQ", "ProShares UltraPro QQQ", 60.0),
            asset("XLK", "Technology Select Sector SPDR ETF", 200.0),
            otc,
            no_options,
        ]);
        let u = DynamicUniverse::new(Arc::new(directory), UniverseFilters::default());
        assert_eq!(u.symbols().unwrap(), vec!["GLD", "NVDA", "QQQ", "SPY"]);
    }

    #[test]
    fn listing_failure_is_not_masked() {
        let u = DynamicUniverse::new(Arc::new(FailingDirectory), UniverseFilters::default());
        assert!(matches!(u.symbols(), Err(UniverseError::Listing(_))));
    }

    #[test]
    fn config_selects_mode() {
        let cfg = UniverseConfig::from_toml(
            r#"
mode = "static"
static_symbols = ["AMD", "TSLA"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.build(None).unwrap().symbols().unwrap(), vec!["AMD", "TSLA"]);

        let dynamic = UniverseConfig {
            mode: UniverseMode::Dynamic,
            ..UniverseConfig::default()
        };
        assert!(matches!(dynamic.build(None), Err(UniverseError::NoDirectory)));
        let provider = dynamic
            .build(Some(Arc::new(InMemoryDirectory::new(vec![asset("AMD", "Advanced Micro Devices", 150.0)]))))
            .unwrap();
        assert_eq!(provider.name(), "dynamic");
        assert!(provider.symbols().unwrap().contains(&"AMD".to_string()));
    }
}
