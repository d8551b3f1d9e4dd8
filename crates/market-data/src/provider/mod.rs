//! Remote data source for daily series.
//!
//! - `transport` - the HTTP seam ([`HttpTransport`]) and its reqwest implementation
//! - `mock` - scripted transport for tests (`test-util` feature)
//! - `alpha_vantage` - request building, retry loop and payload normalization

pub mod alpha_vantage;
#[cfg(any(test, feature = "test-util"))]
mod mock;
pub mod transport;

pub use alpha_vantage::{AlphaVantageClient, FetchClientConfig, RawPayload};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
pub use transport::{HttpTransport, ReqwestTransport};
