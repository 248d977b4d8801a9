//! Data-store access with cancellation.
//!
//! Only the cancellation contract matters here: an executor receives the
//! caller's token and must abort an in-flight query when it fires, instead
//! of letting the query run on detached from the request that issued it.

mod memory;
mod statement;

pub use memory::{InMemoryDatabase, QueryStats};
pub use statement::{parse_batch, parse_delay, Statement};

use crate::cancellation::CancellationToken;
use crate::errors::CancelflowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The statement issued by the query-cancellation endpoint.
pub const DEMO_QUERY: &str = "waitfor delay '00:00:10'; select * from Test";

/// Rows produced by a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Rows returned by every `select` in the batch, in order.
    pub rows: Vec<serde_json::Value>,
    /// Number of statements executed.
    pub statements: usize,
}

/// Executes raw query batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes `sql`, aborting with [`CancelflowError::Cancelled`] when `token` fires.
    async fn execute_raw(
        &self,
        sql: &str,
        token: &CancellationToken,
    ) -> Result<QueryResult, CancelflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_executor_receives_callers_token() {
        let mut mock = MockQueryExecutor::new();
        mock.expect_execute_raw()
            .withf(|sql, token| sql.starts_with("waitfor") && token.is_cancelled())
            .times(1)
            .returning(|_, token| Err(token.cancellation_error().into()));

        let executor: Arc<dyn QueryExecutor> = Arc::new(mock);
        let token = CancellationToken::cancelled_with("client left");

        let err = executor.execute_raw(DEMO_QUERY, &token).await.unwrap_err();
        assert!(err.is_cancellation());
    }
}
