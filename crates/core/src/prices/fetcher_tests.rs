//! Tests for the PriceFetcher batch contract.
//!
//! # Contract Points
//!
//! 1. Cache-first: a complete cached range is served without network calls
//! 2. Partial failure: one symbol failing never aborts the batch
//! 3. NoDataAvailable: only when no symbol succeeded
//! 4. Deadline: in-flight and remaining symbols become DeadlineExceeded

#[cfg(test)]
mod tests {
    use crate::errors::{DatabaseError, Error, Result};
    use crate::market_data::{
        AlphaVantageClient, AssetClass, CollectingNotificationSink, DateRange, FetchClientConfig,
        MockTransport, PriceBar, Severity, SymbolClassifier,
    };
    use crate::prices::{
        store::ensure_single_symbol, CacheSummary, CompletenessPolicy, FailureKind,
        FetcherConfig, PriceFetcher, PriceStore,
    };
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use std::collections::{BTreeMap, BTreeSet, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    // =========================================================================
    // Mock PriceStore
    // =========================================================================

    #[derive(Clone, Default)]
    struct MockPriceStore {
        rows: Arc<Mutex<BTreeMap<(String, NaiveDate), PriceBar>>>,
        fail_upsert_for: Arc<Mutex<HashSet<String>>>,
        fail_cached_dates: Arc<Mutex<bool>>,
    }

    impl MockPriceStore {
        fn new() -> Self {
            Self::default()
        }

        fn fail_upsert_for(&self, symbol: &str) {
            self.fail_upsert_for
                .lock()
                .unwrap()
                .insert(symbol.to_string());
        }

        fn fail_cached_dates(&self) {
            *self.fail_cached_dates.lock().unwrap() = true;
        }

        fn row_count(&self, symbol: &str) -> usize {
            self.rows
                .lock()
                .unwrap()
                .keys()
                .filter(|(s, _)| s == symbol)
                .count()
        }
    }

    #[async_trait]
    impl PriceStore for MockPriceStore {
        fn cached_dates(&self, symbol: &str, range: &DateRange) -> Result<BTreeSet<NaiveDate>> {
            if *self.fail_cached_dates.lock().unwrap() {
                return Err(DatabaseError::QueryFailed("database is locked".into()).into());
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .keys()
                .filter(|(s, d)| s == symbol && range.contains(*d))
                .map(|(_, d)| *d)
                .collect())
        }

        fn read_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<PriceBar>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.symbol == symbol && range.contains(b.date))
                .cloned()
                .collect())
        }

        async fn upsert(&self, symbol: &str, bars: &[PriceBar]) -> Result<usize> {
            if self.fail_upsert_for.lock().unwrap().contains(symbol) {
                return Err(DatabaseError::TransactionFailed("disk I/O error".into()).into());
            }
            ensure_single_symbol(symbol, bars)?;
            let mut rows = self.rows.lock().unwrap();
            for bar in bars {
                rows.insert((bar.symbol.clone(), bar.date), bar.clone());
            }
            Ok(bars.len())
        }

        fn summaries(&self) -> Result<Vec<CacheSummary>> {
            let rows = self.rows.lock().unwrap();
            let mut summaries: Vec<CacheSummary> = Vec::new();
            for ((symbol, date), _) in rows.iter() {
                match summaries.last_mut() {
                    Some(s) if &s.symbol == symbol => {
                        s.last_date = *date;
                        s.rows += 1;
                    }
                    _ => summaries.push(CacheSummary {
                        symbol: symbol.clone(),
                        first_date: *date,
                        last_date: *date,
                        rows: 1,
                    }),
                }
            }
            Ok(summaries)
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    const HARD_ERROR_BODY: &str = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation (https://www.alphavantage.co/documentation/) for TIME_SERIES_DAILY_ADJUSTED."}"#;
    const RATE_LIMIT_BODY: &str = r#"{"Information": "We have detected your API key and our standard API rate limit is 25 requests per day. Please subscribe to any of the premium plans to instantly remove all daily rate limits."}"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn jan_1_to_5() -> DateRange {
        DateRange::new(d(2024, 1, 1), d(2024, 1, 5)).unwrap()
    }

    /// Equity payload with one row per calendar day starting at `start`.
    fn equity_payload(start: NaiveDate, days: u64) -> String {
        let rows: Vec<String> = (0..days)
            .map(|i| {
                let date = start + Days::new(i);
                format!(
                    r#""{}": {{"1. open": "100.0", "2. high": "102.0", "3. low": "99.0", "4. close": "101.5", "5. adjusted close": "101.5", "6. volume": "1000000"}}"#,
                    date
                )
            })
            .collect();
        format!(
            r#"{{"Meta Data": {{"2. Symbol": "TEST"}}, "Time Series (Daily)": {{{}}}}}"#,
            rows.join(", ")
        )
    }

    struct Harness {
        store: MockPriceStore,
        transport: MockTransport,
        sink: CollectingNotificationSink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MockPriceStore::new(),
                transport: MockTransport::new(),
                sink: CollectingNotificationSink::new(),
            }
        }

        fn fetcher(&self) -> PriceFetcher {
            let client = AlphaVantageClient::with_transport(
                FetchClientConfig::with_api_key("TESTKEY"),
                Arc::new(self.transport.clone()),
                Arc::new(self.sink.clone()),
            );
            PriceFetcher::new(
                Arc::new(self.store.clone()),
                Arc::new(client),
                Arc::new(self.sink.clone()),
            )
        }

        fn errors_for(&self, symbol: &str) -> usize {
            self.sink
                .with_severity(Severity::Error)
                .iter()
                .filter(|n| n.symbol.as_deref() == Some(symbol))
                .count()
        }
    }

    // =========================================================================
    // Cache-first
    // =========================================================================

    #[tokio::test]
    async fn test_second_identical_call_makes_no_requests() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        let fetcher = h.fetcher();

        let first = fetcher.fetch_many(["AAPL"], &jan_1_to_5()).await.unwrap();
        assert_eq!(first.success("AAPL").map(|b| b.len()), Some(5));
        assert_eq!(h.transport.calls_for("AAPL"), 1);

        let second = fetcher.fetch_many(["AAPL"], &jan_1_to_5()).await.unwrap();
        assert_eq!(second.success("AAPL"), first.success("AAPL"));
        assert_eq!(h.transport.calls_for("AAPL"), 1);
    }

    #[tokio::test]
    async fn test_incomplete_cache_refetches() {
        let h = Harness::new();
        // Only four of the five days are served, so the range never completes.
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 2), 4));
        let fetcher = h.fetcher();

        fetcher.fetch_many(["AAPL"], &jan_1_to_5()).await.unwrap();
        let second = fetcher.fetch_many(["AAPL"], &jan_1_to_5()).await.unwrap();

        assert_eq!(second.success("AAPL").map(|b| b.len()), Some(4));
        assert_eq!(h.transport.calls_for("AAPL"), 2);
    }

    #[tokio::test]
    async fn test_result_is_restricted_to_requested_range() {
        let h = Harness::new();
        h.transport
            .respond("AAPL", equity_payload(d(2023, 12, 29), 12));

        let result = h
            .fetcher()
            .fetch_many(["AAPL"], &jan_1_to_5())
            .await
            .unwrap();

        let bars = result.success("AAPL").unwrap();
        assert_eq!(bars.len(), 5);
        assert_eq!(bars.first().map(|b| b.date), Some(d(2024, 1, 1)));
        assert_eq!(bars.last().map(|b| b.date), Some(d(2024, 1, 5)));
        // The whole series is cached, not just the requested slice.
        assert_eq!(h.store.row_count("AAPL"), 12);
    }

    #[tokio::test]
    async fn test_weekday_policy_accepts_weekend_gap() {
        let h = Harness::new();
        // Friday and Monday cached, weekend missing.
        let range = DateRange::new(d(2024, 1, 5), d(2024, 1, 8)).unwrap();
        let bars: Vec<PriceBar> = [d(2024, 1, 5), d(2024, 1, 8)]
            .into_iter()
            .map(|date| PriceBar {
                symbol: "AAPL".to_string(),
                date,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 10,
                adjusted_close: Some(1.0),
            })
            .collect();
        h.store.upsert("AAPL", &bars).await.unwrap();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 5), 4));

        let weekdays = h.fetcher().with_config(FetcherConfig {
            completeness: CompletenessPolicy::Weekdays,
        });
        let result = weekdays.fetch_many(["AAPL"], &range).await.unwrap();
        assert_eq!(result.success("AAPL").map(|b| b.len()), Some(2));
        assert_eq!(h.transport.call_count(), 0);

        // The calendar-day policy sees the weekend as missing.
        h.fetcher().fetch_many(["AAPL"], &range).await.unwrap();
        assert_eq!(h.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_weekday_policy_fetches_weekend_only_range() {
        let h = Harness::new();
        h.transport.respond("NOPE123", HARD_ERROR_BODY);
        // Saturday and Sunday: no weekday to check, so an empty cache is a miss.
        let range = DateRange::new(d(2024, 1, 6), d(2024, 1, 7)).unwrap();

        let weekdays = h.fetcher().with_config(FetcherConfig {
            completeness: CompletenessPolicy::Weekdays,
        });
        let err = weekdays.fetch_many(["NOPE123"], &range).await.unwrap_err();

        assert!(matches!(err, Error::NoDataAvailable { .. }));
        assert_eq!(h.transport.calls_for("NOPE123"), 1);
    }

    #[tokio::test]
    async fn test_cache_check_failure_is_notified_and_fetch_proceeds() {
        let h = Harness::new();
        h.store.fail_cached_dates();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));

        let result = h
            .fetcher()
            .fetch_many(["AAPL"], &jan_1_to_5())
            .await
            .unwrap();

        assert_eq!(result.success("AAPL").map(|b| b.len()), Some(5));
        assert_eq!(h.transport.calls_for("AAPL"), 1);
        let warnings = h.sink.with_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].symbol.as_deref(), Some("AAPL"));
    }

    #[tokio::test]
    async fn test_completeness_survives_further_upserts() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.fetcher()
            .fetch_many(["AAPL"], &jan_1_to_5())
            .await
            .unwrap();
        assert!(h.store.has_complete_range("AAPL", &jan_1_to_5()).unwrap());

        let later = PriceBar {
            symbol: "AAPL".to_string(),
            date: d(2024, 2, 1),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
            adjusted_close: None,
        };
        h.store.upsert("AAPL", &[later]).await.unwrap();
        assert!(h.store.has_complete_range("AAPL", &jan_1_to_5()).unwrap());
    }

    // =========================================================================
    // Partial failure
    // =========================================================================

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_symbols() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.transport.respond("NOPE123", HARD_ERROR_BODY);

        let result = h
            .fetcher()
            .fetch_many(["AAPL", "NOPE123"], &jan_1_to_5())
            .await
            .unwrap();

        assert!(result.is_partial());
        assert_eq!(result.success("AAPL").map(|b| b.len()), Some(5));
        assert_eq!(
            result.failure("NOPE123").map(|f| f.kind),
            Some(FailureKind::HardApiError)
        );
        assert_eq!(h.transport.calls_for("NOPE123"), 1);
        assert_eq!(h.store.row_count("NOPE123"), 0);
        // Reported once, by the client.
        assert_eq!(h.errors_for("NOPE123"), 1);
        assert_eq!(result.combined().len(), 5);
    }

    #[tokio::test]
    async fn test_all_symbols_failing_is_no_data_available() {
        let h = Harness::new();
        h.transport.respond("NOPE123", HARD_ERROR_BODY);

        let err = h
            .fetcher()
            .fetch_many(["NOPE123"], &jan_1_to_5())
            .await
            .unwrap_err();

        match err {
            Error::NoDataAvailable { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].symbol, "NOPE123");
                assert_eq!(failures[0].kind, FailureKind::HardApiError);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let batch_errors = h
            .sink
            .with_severity(Severity::Error)
            .into_iter()
            .filter(|n| n.symbol.is_none())
            .count();
        assert_eq!(batch_errors, 1);
    }

    #[tokio::test]
    async fn test_empty_symbol_set_is_no_data_available() {
        let h = Harness::new();
        let err = h
            .fetcher()
            .fetch_many(["", "   "], &jan_1_to_5())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoDataAvailable { failures } if failures.is_empty()));
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_symbols_fetched_once() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));

        let result = h
            .fetcher()
            .fetch_many(["AAPL", " AAPL ", "AAPL"], &jan_1_to_5())
            .await
            .unwrap();

        assert_eq!(result.results().len(), 1);
        assert_eq!(h.transport.calls_for("AAPL"), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_recorded_per_symbol() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.transport.respond("MSFT", equity_payload(d(2024, 1, 1), 5));
        h.store.fail_upsert_for("MSFT");

        let result = h
            .fetcher()
            .fetch_many(["MSFT", "AAPL"], &jan_1_to_5())
            .await
            .unwrap();

        assert_eq!(
            result.failure("MSFT").map(|f| f.kind),
            Some(FailureKind::Storage)
        );
        assert!(result.success("AAPL").is_some());
        assert_eq!(h.store.row_count("MSFT"), 0);
        assert_eq!(h.errors_for("MSFT"), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reported_once() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.transport.respond("MSFT", r#"{"Meta Data": {"2. Symbol": "MSFT"}}"#);

        let result = h
            .fetcher()
            .fetch_many(["AAPL", "MSFT"], &jan_1_to_5())
            .await
            .unwrap();

        assert_eq!(
            result.failure("MSFT").map(|f| f.kind),
            Some(FailureKind::Normalization)
        );
        assert_eq!(h.errors_for("MSFT"), 1);
        assert_eq!(h.store.row_count("MSFT"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion_is_recorded() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.transport.respond("BTC", RATE_LIMIT_BODY);

        let result = h
            .fetcher()
            .fetch_many(["BTC-USD", "AAPL"], &jan_1_to_5())
            .await
            .unwrap();

        assert_eq!(
            result.failure("BTC-USD").map(|f| f.kind),
            Some(FailureKind::RateLimited)
        );
        assert_eq!(h.transport.calls_for("BTC"), 3);
        assert!(result.success("AAPL").is_some());
    }

    // =========================================================================
    // Deadline and classification
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_in_flight_and_remaining_symbols() {
        let h = Harness::new();
        h.transport.respond("AAPL", equity_payload(d(2024, 1, 1), 5));
        h.transport.respond("BTC", RATE_LIMIT_BODY);
        h.transport.respond("MSFT", equity_payload(d(2024, 1, 1), 5));

        let deadline = Instant::now() + Duration::from_secs(90);
        let result = h
            .fetcher()
            .fetch_many_until(["AAPL", "BTC-USD", "MSFT"], &jan_1_to_5(), deadline)
            .await
            .unwrap();

        assert!(result.success("AAPL").is_some());
        assert_eq!(
            result.failure("BTC-USD").map(|f| f.kind),
            Some(FailureKind::DeadlineExceeded)
        );
        assert_eq!(
            result.failure("MSFT").map(|f| f.kind),
            Some(FailureKind::DeadlineExceeded)
        );
        // Cancelled during the second backoff.
        assert_eq!(h.transport.calls_for("BTC"), 2);
        assert_eq!(h.transport.calls_for("MSFT"), 0);
    }

    #[tokio::test]
    async fn test_classifier_override_selects_series() {
        let h = Harness::new();
        h.transport.respond("USDX", equity_payload(d(2024, 1, 1), 5));

        let mut classifier = SymbolClassifier::new();
        classifier.add_override("USDX", AssetClass::Equity);
        let result = h
            .fetcher()
            .with_classifier(classifier)
            .fetch_many(["USDX"], &jan_1_to_5())
            .await
            .unwrap();

        assert!(result.success("USDX").is_some());
        let query = h.transport.calls()[0].query().unwrap_or_default().to_string();
        assert!(query.contains("function=TIME_SERIES_DAILY_ADJUSTED"));
    }
}
