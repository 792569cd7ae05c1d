//! Backend interfaces for snippet composition
//!
//! This crate defines how the engine sees a database without depending
//! on any driver:
//! - `Catalog` answers "is this name a real table?"
//! - `Executor` runs a composed statement and reports raw failures
//! - `MemoryCatalog` and `MockExecutor` back tests and demos
//!
//! Live driver bindings implement these traits in the embedding
//! application; the engine itself never opens a connection.

pub mod catalog;
pub mod executor;
pub mod mock;

pub use catalog::{Catalog, MemoryCatalog};
pub use executor::{BackendError, Executor, RowSet};
pub use mock::MockExecutor;
