//! Catalog lookup interface

use serde::{Deserialize, Serialize};

/// Read-only view of the tables live in a backend.
///
/// The engine consults the catalog wherever a name could be either a
/// stored snippet or a real table: a catalog hit always wins and the
/// name is left for the backend to resolve.
pub trait Catalog {
    /// True when a table with this exact name exists
    fn table_exists(&self, name: &str) -> bool;

    /// Every table name known to the backend, used for suggestions
    fn all_table_names(&self) -> Vec<String>;
}

/// In-memory catalog over a fixed table list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCatalog {
    tables: Vec<String>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Create a catalog over the given table names
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Register another table
    pub fn add_table(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.tables.contains(&name) {
            self.tables.push(name);
        }
    }
}

impl Catalog for MemoryCatalog {
    fn table_exists(&self, name: &str) -> bool {
        self.tables.iter().any(|table| table == name)
    }

    fn all_table_names(&self) -> Vec<String> {
        self.tables.clone()
    }
}
