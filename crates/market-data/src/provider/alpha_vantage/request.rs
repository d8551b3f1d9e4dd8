//! Query parameters for the daily series endpoints.

use reqwest::Url;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, ClassifiedSymbol};

/// Query parameters (without the API key) for a classified ticker.
///
/// - Equity: `function=TIME_SERIES_DAILY_ADJUSTED&symbol=..&outputsize=full`
/// - Crypto: `function=DIGITAL_CURRENCY_DAILY&symbol=<base>&market=<quote>`
/// - Forex: `function=FX_DAILY&from_symbol=<base>&to_symbol=<quote>`
pub fn query_params(symbol: &ClassifiedSymbol) -> Vec<(&'static str, String)> {
    let function = ("function", symbol.function().as_api_str().to_string());
    let quote = symbol.quote_currency.clone().unwrap_or_default();

    match symbol.asset_class {
        AssetClass::Equity => vec![
            function,
            ("symbol", symbol.base.clone()),
            ("outputsize", "full".to_string()),
        ],
        AssetClass::Crypto => vec![
            function,
            ("symbol", symbol.base.clone()),
            ("market", quote),
        ],
        AssetClass::Forex => vec![
            function,
            ("from_symbol", symbol.base.clone()),
            ("to_symbol", quote),
        ],
    }
}

/// Full request URL, API key appended last.
pub fn build_url(
    base_url: &str,
    symbol: &ClassifiedSymbol,
    api_key: &str,
) -> Result<Url, MarketDataError> {
    let mut params = query_params(symbol);
    params.push(("apikey", api_key.to_string()));

    Url::parse_with_params(base_url, &params)
        .map_err(|e| MarketDataError::InvalidRequest(format!("Failed to build URL: {}", e)))
}

/// URL as it may appear in logs.
pub fn redact(url: &Url, api_key: &str) -> String {
    if api_key.is_empty() {
        return url.to_string();
    }
    url.as_str().replace(api_key, "***")
}
