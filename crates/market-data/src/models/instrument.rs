use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset class of a ticker, which decides the remote series function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    Equity,
    Crypto,
    Forex,
}

impl AssetClass {
    /// The daily series function used for this asset class.
    pub fn series_function(&self) -> SeriesFunction {
        match self {
            Self::Equity => SeriesFunction::EquityDailyAdjusted,
            Self::Crypto => SeriesFunction::CryptoDaily,
            Self::Forex => SeriesFunction::FxDaily,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
            Self::Forex => "forex",
        };
        f.write_str(s)
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "stock" => Ok(Self::Equity),
            "crypto" => Ok(Self::Crypto),
            "forex" | "fx" => Ok(Self::Forex),
            other => Err(format!("unknown asset class '{}'", other)),
        }
    }
}

/// Remote API function variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeriesFunction {
    EquityDailyAdjusted,
    CryptoDaily,
    FxDaily,
}

impl SeriesFunction {
    /// Value of the `function` query parameter.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::EquityDailyAdjusted => "TIME_SERIES_DAILY_ADJUSTED",
            Self::CryptoDaily => "DIGITAL_CURRENCY_DAILY",
            Self::FxDaily => "FX_DAILY",
        }
    }
}

/// A ticker together with the query parameters its series needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiedSymbol {
    /// The ticker exactly as requested; cache rows are keyed by it.
    pub symbol: String,
    pub asset_class: AssetClass,
    /// Symbol sent to the API (e.g. `BTC` for `BTC-USD`).
    pub base: String,
    /// Quote currency for crypto and forex series.
    pub quote_currency: Option<String>,
}

impl ClassifiedSymbol {
    pub fn function(&self) -> SeriesFunction {
        self.asset_class.series_function()
    }
}
