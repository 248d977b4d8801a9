//! In-memory query executor.

use super::statement::{parse_batch, Statement};
use super::{QueryExecutor, QueryResult};
use crate::cancellation::{delay, CancellationToken};
use crate::errors::{CancelflowError, QueryError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Execution counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    /// Batches that ran to the end.
    pub completed: usize,
    /// Batches aborted by their token.
    pub cancelled: usize,
    /// Batches that failed for any other reason.
    pub failed: usize,
}

/// A query executor over named in-memory tables.
///
/// Table names are case-insensitive. Rows are JSON values.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: DashMap<String, Vec<serde_json::Value>>,
    completed: AtomicUsize,
    cancelled: AtomicUsize,
    failed: AtomicUsize,
}

impl InMemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the database the demonstration queries: an empty `Test` table.
    #[must_use]
    pub fn demo() -> Self {
        Self::new().with_table("Test", Vec::new())
    }

    /// Adds or replaces a table.
    #[must_use]
    pub fn with_table(self, name: &str, rows: Vec<serde_json::Value>) -> Self {
        self.tables.insert(name.to_lowercase(), rows);
        self
    }

    /// Appends rows to a table, creating it if needed.
    pub fn insert_rows(&self, name: &str, rows: impl IntoIterator<Item = serde_json::Value>) {
        self.tables
            .entry(name.to_lowercase())
            .or_default()
            .extend(rows);
    }

    /// Returns the execution counters.
    #[must_use]
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            completed: self.completed.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    async fn run_batch(
        &self,
        statements: Vec<Statement>,
        token: &CancellationToken,
    ) -> Result<QueryResult, CancelflowError> {
        let mut result = QueryResult::default();

        for statement in statements {
            match statement {
                Statement::WaitForDelay(duration) => {
                    debug!(delay_ms = duration.as_millis(), "waitfor delay");
                    delay(duration, Some(token)).await?;
                }
                Statement::SelectAll { table } => {
                    if token.is_cancelled() {
                        return Err(token.cancellation_error().into());
                    }
                    let rows = self
                        .tables
                        .get(&table.to_lowercase())
                        .map(|rows| rows.clone())
                        .ok_or(QueryError::UnknownTable(table))?;
                    result.rows.extend(rows);
                }
            }
            result.statements += 1;
        }

        Ok(result)
    }
}

#[async_trait]
impl QueryExecutor for InMemoryDatabase {
    async fn execute_raw(
        &self,
        sql: &str,
        token: &CancellationToken,
    ) -> Result<QueryResult, CancelflowError> {
        let outcome = match parse_batch(sql) {
            Ok(statements) => self.run_batch(statements, token).await,
            Err(e) => Err(e.into()),
        };

        match &outcome {
            Ok(result) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                debug!(rows = result.rows.len(), statements = result.statements, "Query completed");
            }
            Err(e) if e.is_cancellation() => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                info!(error = %e, "Query aborted");
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                warn!(error = %e, "Query failed");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_demo_query_completes_without_cancellation() {
        let db = InMemoryDatabase::demo();
        db.insert_rows("test", [json!({"id": 1}), json!({"id": 2})]);
        let token = CancellationToken::new();
        let start = Instant::now();

        let result = db.execute_raw(crate::query::DEMO_QUERY, &token).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(result.rows, vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(result.statements, 2);
        assert_eq!(db.stats().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_aborts_when_token_fires() {
        let db = Arc::new(InMemoryDatabase::demo());
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel("client disconnected");
        });

        let start = Instant::now();
        let err = db
            .execute_raw("waitfor delay '00:00:10'; select * from Test", &token)
            .await
            .unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(
            db.stats(),
            QueryStats {
                completed: 0,
                cancelled: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_prefired_token_aborts_select() {
        let db = InMemoryDatabase::demo();
        let token = CancellationToken::cancelled_with("gone");

        let err = db.execute_raw("select * from Test", &token).await.unwrap_err();
        assert!(err.is_cancellation());
        assert!(matches!(err, CancelflowError::Cancelled(c) if c.reason == "gone"));
    }

    #[tokio::test]
    async fn test_unknown_table_is_a_failure() {
        let db = InMemoryDatabase::new();
        let token = CancellationToken::new();

        let err = db.execute_raw("select * from Missing", &token).await.unwrap_err();

        assert!(matches!(
            err,
            CancelflowError::Query(QueryError::UnknownTable(ref t)) if t == "Missing"
        ));
        assert_eq!(db.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_parse_error_runs_nothing() {
        let db = InMemoryDatabase::demo();
        let token = CancellationToken::new();

        let err = db
            .execute_raw("select * from Test; drop table Test", &token)
            .await
            .unwrap_err();

        assert!(matches!(err, CancelflowError::Query(QueryError::Unsupported(_))));
        assert_eq!(db.stats().failed, 1);
    }
}
