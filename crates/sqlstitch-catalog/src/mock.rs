//! Mock executor for tests and demos
//!
//! Serves canned results without connecting to anything. Useful for:
//! - Unit testing composition and diagnostics end to end
//! - Simulating driver failures with exact message shapes
//! - Asserting which SQL the engine actually sent

use std::cell::RefCell;
use std::collections::HashMap;

use crate::executor::{BackendError, Executor, RowSet};

/// Scripted executor
///
/// Responses can be registered per statement; anything unscripted gets
/// the default response. Every statement run is recorded and can be
/// inspected afterwards.
pub struct MockExecutor {
    /// Backend identifier reported to the diagnostics resolver
    backend: String,

    /// Exact-match responses keyed by statement text
    responses: HashMap<String, Result<RowSet, BackendError>>,

    /// Response for unscripted statements
    default_response: Result<RowSet, BackendError>,

    /// Statements run so far
    calls: RefCell<Vec<String>>,
}

impl MockExecutor {
    /// Create a mock that succeeds with an empty result
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            responses: HashMap::new(),
            default_response: Ok(RowSet::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Script a response for one exact statement
    pub fn with_response(
        mut self,
        sql: impl Into<String>,
        response: Result<RowSet, BackendError>,
    ) -> Self {
        self.responses.insert(sql.into(), response);
        self
    }

    /// Make every unscripted statement succeed with these rows
    pub fn with_rows(mut self, rows: RowSet) -> Self {
        self.default_response = Ok(rows);
        self
    }

    /// Make every unscripted statement fail with this driver message
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        let backend = self.backend.clone();
        self.default_response = Err(BackendError::new(backend, message));
        self
    }

    /// Every statement run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// The most recent statement, if any
    pub fn last_call(&self) -> Option<String> {
        self.calls.borrow().last().cloned()
    }
}

impl Executor for MockExecutor {
    fn backend(&self) -> &str {
        &self.backend
    }

    fn run(&self, sql: &str) -> Result<RowSet, BackendError> {
        self.calls.borrow_mut().push(sql.to_string());
        match self.responses.get(sql) {
            Some(response) => response.clone(),
            None => self.default_response.clone(),
        }
    }
}
