//! DataFusion-backed [`DataSource`].

use super::{ColumnSchema, DataSource, ScalarRow};
use crate::error::{ErrorContext, QualinkError, Result};
use crate::logging::{event_at, truncate_field, LogConfig};
use arrow::array::{Array, Float64Array};
use arrow::datatypes::DataType;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::instrument;

/// Runs validation queries against tables registered in a DataFusion
/// [`SessionContext`].
///
/// # Examples
///
/// ```rust,no_run
/// use qualink::source::DataFusionSource;
/// use datafusion::prelude::*;
///
/// # async fn example() -> qualink::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("orders", "orders.csv", CsvReadOptions::new()).await?;
/// let source = DataFusionSource::new(ctx);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DataFusionSource {
    ctx: Arc<SessionContext>,
    log_config: LogConfig,
}

impl std::fmt::Debug for DataFusionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionSource")
            .field("session_id", &self.ctx.session_id())
            .field("log_config", &self.log_config)
            .finish()
    }
}

impl DataFusionSource {
    /// Wraps a session context.
    pub fn new(ctx: SessionContext) -> Self {
        Self::from_arc(Arc::new(ctx))
    }

    /// Wraps a shared session context.
    pub fn from_arc(ctx: Arc<SessionContext>) -> Self {
        Self {
            ctx,
            log_config: LogConfig::default(),
        }
    }

    /// Replaces the logging configuration used for query logging.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// The underlying session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }
}

impl From<SessionContext> for DataFusionSource {
    fn from(ctx: SessionContext) -> Self {
        Self::new(ctx)
    }
}

#[async_trait]
impl DataSource for DataFusionSource {
    #[instrument(skip_all)]
    async fn execute_scalar_query(&self, sql: &str) -> Result<ScalarRow> {
        if self.log_config.log_queries {
            event_at!(
                self.log_config.base_level,
                query.sql = %truncate_field(sql, self.log_config.max_field_length),
                "Executing scalar query"
            );
        }

        let batches = self.ctx.sql(sql).await?.collect().await?;
        let batch = batches
            .iter()
            .find(|batch| batch.num_rows() > 0)
            .ok_or_else(|| {
                QualinkError::UnexpectedResult("scalar query returned no rows".to_string())
            })?;

        let schema = batch.schema();
        let mut row = ScalarRow::new();
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let value = if column.is_null(0) {
                None
            } else {
                let cast = arrow::compute::cast(column.as_ref(), &DataType::Float64)?;
                let values = cast
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| {
                        QualinkError::UnexpectedResult(format!(
                            "column '{}' could not be read as a number",
                            field.name()
                        ))
                    })?;
                (!values.is_null(0)).then(|| values.value(0))
            };
            row.push(field.name().clone(), value);
        }

        if self.log_config.log_metrics {
            event_at!(
                self.log_config.base_level,
                query.result = ?row,
                "Scalar query returned"
            );
        }
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn schema(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let df = self
            .ctx
            .table(table)
            .await
            .with_context(|| format!("reading schema of '{table}'"))?;
        Ok(df
            .schema()
            .fields()
            .iter()
            .map(|field| ColumnSchema::new(field.name().clone(), field.data_type().to_string()))
            .collect())
    }
}
