//! Where a statement should go.

/// Statements starting with this keyword are served by replicas.
const READ_KEYWORD: &str = "select";

/// Statement route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Replicas, with failover.
    Read,
    /// Primary only.
    Write,
}

impl Route {
    /// Classify a statement by its first keyword.
    ///
    /// Only a leading `SELECT` (any case, surrounding whitespace ignored)
    /// counts as a read. Anything else goes to the primary,
    /// including `WITH ... SELECT`.
    pub fn classify(query: &str) -> Self {
        let query = query.trim().to_lowercase();

        if query.starts_with(READ_KEYWORD) {
            Route::Read
        } else {
            Route::Write
        }
    }

    /// Route is served by replicas.
    pub fn is_read(&self) -> bool {
        matches!(self, Route::Read)
    }
}
