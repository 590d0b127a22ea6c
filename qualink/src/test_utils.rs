//! Helpers for building small in-memory tables in tests.
//!
//! Available to downstream crates through the `test-utils` feature.

use crate::error::Result;
use crate::source::DataFusionSource;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// Creates a session context and runs each statement against it in order.
///
/// # Examples
///
/// ```rust
/// # #[cfg(feature = "test-utils")]
/// # async fn example() -> qualink::error::Result<()> {
/// use qualink::test_utils::context_from_sql;
///
/// let ctx = context_from_sql(&[
///     "CREATE TABLE users (id BIGINT, email VARCHAR)",
///     "INSERT INTO users VALUES (1, 'a@example.com'), (2, NULL)",
/// ])
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn context_from_sql(statements: &[&str]) -> Result<SessionContext> {
    let ctx = SessionContext::new();
    for statement in statements {
        ctx.sql(statement).await?.collect().await?;
    }
    Ok(ctx)
}

/// Same as [`context_from_sql`], wrapped as a shareable data source.
pub async fn source_from_sql(statements: &[&str]) -> Result<Arc<DataFusionSource>> {
    Ok(Arc::new(DataFusionSource::new(
        context_from_sql(statements).await?,
    )))
}

/// A five-row `people` table used throughout the unit tests.
///
/// | id | name    | age | email             | score |
/// |----|---------|-----|-------------------|-------|
/// | 1  | Alice   | 25  | alice@example.com | 0.5   |
/// | 2  | Bob     | 28  | bob@example.com   | NULL  |
/// | 3  | Charlie | 30  | not-an-email      | 1.5   |
/// | 4  | Dana    | 32  | NULL              | 2.5   |
/// | 5  | Eve     | 35  | eve@example.org   | 3.5   |
pub async fn people_source() -> Result<Arc<DataFusionSource>> {
    source_from_sql(&[
        "CREATE TABLE people (id BIGINT, name VARCHAR, age BIGINT, email VARCHAR, score DOUBLE)",
        "INSERT INTO people VALUES \
            (1, 'Alice', 25, 'alice@example.com', 0.5), \
            (2, 'Bob', 28, 'bob@example.com', NULL), \
            (3, 'Charlie', 30, 'not-an-email', 1.5), \
            (4, 'Dana', 32, NULL, 2.5), \
            (5, 'Eve', 35, 'eve@example.org', 3.5)",
    ])
    .await
}
