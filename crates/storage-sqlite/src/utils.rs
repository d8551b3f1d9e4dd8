//! Utility functions for SQLite storage operations.

/// Maximum number of rows bound in one multi-row statement.
///
/// Every row of `price_bars` binds nine parameters. SQLite caps the number of
/// parameters per statement (SQLITE_MAX_VARIABLE_NUMBER, 32766 in the bundled
/// build), so batches are split into chunks of this many rows.
pub const SQLITE_MAX_ROWS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite statements.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_ROWS_CHUNK)
}
