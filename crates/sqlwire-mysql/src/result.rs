//! Query results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlwire_core::{ColumnInfo, Row, Value};

/// The result of one executed statement.
///
/// Owns the ordered field names and rows plus the query timing; immutable
/// once constructed and safe to iterate any number of times. Statements
/// without a result set (INSERT, UPDATE, ...) produce an empty result;
/// their row counts live on the connection accessors.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: Arc<ColumnInfo>,
    rows: Vec<Row>,
    query_time: Duration,
}

impl QueryResult {
    /// Assemble a result from decoded parts.
    pub(crate) fn new(columns: Arc<ColumnInfo>, rows: Vec<Row>, query_time: Duration) -> Self {
        Self {
            columns,
            rows,
            query_time,
        }
    }

    /// An empty result (no result set), keeping the timing.
    pub(crate) fn empty(query_time: Duration) -> Self {
        Self {
            columns: Arc::new(ColumnInfo::new(Vec::new())),
            rows: Vec::new(),
            query_time,
        }
    }

    /// Ordered field names.
    pub fn fields(&self) -> &[String] {
        self.columns.names()
    }

    /// The rows, in server order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Wall-clock time the statement took, dispatch to final packet.
    pub fn query_time(&self) -> Duration {
        self.query_time
    }

    /// Iterate over the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Consume the result, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Iterate over rows as field-name-keyed maps.
    ///
    /// Each row's values are zipped with the field names by sequential
    /// insertion, so a duplicate field name keeps the last value.
    pub fn keyed_rows(&self) -> impl Iterator<Item = HashMap<String, Value>> + '_ {
        self.rows.iter().map(|row| {
            let mut keyed = HashMap::with_capacity(row.len());
            for (name, value) in row.iter() {
                keyed.insert(name.to_string(), value.clone());
            }
            keyed
        })
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
