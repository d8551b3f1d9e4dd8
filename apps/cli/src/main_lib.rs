use std::sync::Arc;

use tickerscope_core::prices::{FetcherConfig, PriceFetcher};
use tickerscope_market_data::{
    AlphaVantageClient, Notification, NotificationSink, Severity, SymbolClassifier,
};
use tickerscope_storage_sqlite::SqlitePriceStore;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};

pub fn init_tracing(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

/// Prints notifications for the person at the terminal.
#[derive(Debug, Default)]
pub struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn notify(&self, notification: Notification) {
        if notification.severity >= Severity::Warning {
            eprintln!("{}", notification);
        }
    }
}

pub struct Services {
    pub store: Arc<SqlitePriceStore>,
    pub fetcher: PriceFetcher,
}

/// Opens the cache and wires the fetcher. Must run inside the Tokio runtime.
pub fn build_services(
    config: &Config,
    classifier: SymbolClassifier,
    fetcher_config: FetcherConfig,
) -> anyhow::Result<Services> {
    let store = Arc::new(open_store(&config.db_path)?);
    let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleNotificationSink);
    let client = AlphaVantageClient::new(config.fetch_client_config(), sink.clone());

    let fetcher = PriceFetcher::new(store.clone(), Arc::new(client), sink)
        .with_classifier(classifier)
        .with_config(fetcher_config);

    Ok(Services { store, fetcher })
}

pub fn open_store(db_path: &str) -> anyhow::Result<SqlitePriceStore> {
    let store = SqlitePriceStore::open(db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    Ok(store)
}

/// Flushes the WAL at teardown; failures are only logged.
pub fn close_store(store: &SqlitePriceStore) {
    if let Err(e) = store.checkpoint() {
        tracing::warn!("WAL checkpoint failed: {}", e);
    }
}
