//! Storage implementations.
//!
//! `schema` holds the table definitions, `sqlite` the real store, `mock`
//! an in-memory stand-in for tests and partial-failure injection.

pub mod mock;
pub mod schema;
pub mod sqlite;

pub use mock::MockLedgerStore;
pub use sqlite::SqliteLedgerStore;
