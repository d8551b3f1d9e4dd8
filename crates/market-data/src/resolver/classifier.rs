//! Ticker → asset class classification.

use std::collections::HashMap;

use crate::models::{AssetClass, ClassifiedSymbol};

const CRYPTO_QUOTE: &str = "USD";
const FOREX_QUOTE: &str = "EUR";

/// Classifies tickers into the series they are fetched from.
///
/// Resolution order:
/// 1. Explicit override for the exact ticker, if one was registered.
/// 2. Substring rules: contains `USD` → crypto quoted in USD; otherwise
///    contains `EUR` → forex quoted in EUR; anything else → equity.
///
/// The substring rules are a heuristic with known false positives
/// (`USDX` is treated as crypto). Register an override for such tickers.
#[derive(Debug, Clone, Default)]
pub struct SymbolClassifier {
    overrides: HashMap<String, AssetClass>,
}

impl SymbolClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with an explicit ticker → asset class table.
    pub fn with_overrides(overrides: HashMap<String, AssetClass>) -> Self {
        Self { overrides }
    }

    pub fn add_override(&mut self, symbol: impl Into<String>, class: AssetClass) {
        self.overrides.insert(symbol.into(), class);
    }

    pub fn classify(&self, symbol: &str) -> ClassifiedSymbol {
        let asset_class = self
            .overrides
            .get(symbol)
            .copied()
            .unwrap_or_else(|| heuristic_class(symbol));
        build(symbol, asset_class)
    }
}

/// Classifies with the substring rules only.
pub fn classify(symbol: &str) -> ClassifiedSymbol {
    build(symbol, heuristic_class(symbol))
}

fn heuristic_class(symbol: &str) -> AssetClass {
    if symbol.contains(CRYPTO_QUOTE) {
        AssetClass::Crypto
    } else if symbol.contains(FOREX_QUOTE) {
        AssetClass::Forex
    } else {
        AssetClass::Equity
    }
}

fn build(symbol: &str, asset_class: AssetClass) -> ClassifiedSymbol {
    let (base, quote_currency) = match asset_class {
        AssetClass::Equity => (symbol.to_string(), None),
        AssetClass::Crypto => (
            strip_quote_suffix(symbol, CRYPTO_QUOTE),
            Some(CRYPTO_QUOTE.to_string()),
        ),
        AssetClass::Forex => (
            strip_quote_suffix(symbol, FOREX_QUOTE),
            Some(FOREX_QUOTE.to_string()),
        ),
    };

    ClassifiedSymbol {
        symbol: symbol.to_string(),
        asset_class,
        base,
        quote_currency,
    }
}

/// `BTC-USD` → `BTC`. Tickers without the dashed suffix are kept whole.
fn strip_quote_suffix(symbol: &str, quote: &str) -> String {
    symbol
        .strip_suffix(&format!("-{}", quote))
        .unwrap_or(symbol)
        .to_string()
}
