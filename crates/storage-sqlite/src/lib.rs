//! SQLite storage implementation for Tickerscope.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the [`PriceStore`](tickerscope_core::prices::PriceStore) trait
//! defined in `tickerscope-core` and contains:
//! - Database initialization and connection pooling
//! - Diesel migrations
//! - The single writer actor that makes every batch atomic
//! - The price cache repository and its Diesel model
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//!        core (PriceFetcher, PriceStore)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod prices;
pub mod schema;
pub mod utils;

// Re-export database utilities
pub use db::{
    checkpoint, create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use prices::SqlitePriceStore;

// Re-export from tickerscope-core for convenience
pub use tickerscope_core::errors::{DatabaseError, Error, Result};
