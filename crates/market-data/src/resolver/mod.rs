//! Symbol resolution for the daily series API.
//!
//! Converts a requested ticker into the asset class and query parameters the
//! remote API needs:
//!
//! ```text
//! "BTC-USD" ──► SymbolClassifier ──► ClassifiedSymbol { Crypto, base: "BTC", quote: "USD" }
//!                 │
//!                 ├─ 1. explicit override table (opt-in)
//!                 └─ 2. substring rules (USD → crypto, EUR → forex, else equity)
//! ```

mod classifier;

pub use classifier::{classify, SymbolClassifier};
