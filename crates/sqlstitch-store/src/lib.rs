//! Snippet storage and dependency resolution
//!
//! This crate handles:
//! - The insertion-ordered snippet store with save-time dependency capture
//! - Guarded removal (direct dependents block, forced removal cascades)
//! - Expanding root references into a dependency-first snippet order
//! - Cycle detection with a full traversal path

pub mod resolver;
pub mod store;

pub use resolver::resolve;
pub use store::{RemoveError, SaveError, SnippetStore};
