//! Schema equality between two tables.

use super::{grade, Assertion};
use crate::core::{Constraint, ConstraintMetadata, ConstraintResult};
use crate::error::Result;
use crate::security::SqlSecurity;
use crate::source::DataSource;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Column-level differences between two schemas.
#[derive(Debug, Default, PartialEq)]
struct SchemaDiff {
    only_in_a: Vec<String>,
    only_in_b: Vec<String>,
    /// column -> (type in a, type in b)
    type_mismatches: BTreeMap<String, (String, String)>,
}

impl SchemaDiff {
    fn between(a: BTreeMap<String, String>, mut b: BTreeMap<String, String>) -> Self {
        let mut diff = SchemaDiff::default();
        for (name, type_a) in a {
            match b.remove(&name) {
                None => diff.only_in_a.push(name),
                Some(type_b) if type_b != type_a => {
                    diff.type_mismatches.insert(name, (type_a, type_b));
                }
                Some(_) => {}
            }
        }
        diff.only_in_b = b.into_keys().collect();
        diff
    }

    fn is_match(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.type_mismatches.is_empty()
    }
}

/// Checks that two tables have the same column names and declared types.
///
/// Column order is ignored. The metric is `1.0` for identical schemas and
/// `0.0` otherwise; the failure message lists the differences.
#[derive(Debug, Clone)]
pub struct SchemaMatchConstraint {
    name: String,
    table_a: String,
    table_b: String,
    assertion: Assertion,
    hint: Option<String>,
}

impl SchemaMatchConstraint {
    pub fn new(
        table_a: impl Into<String>,
        table_b: impl Into<String>,
        assertion: Assertion,
    ) -> Result<Self> {
        let table_a = table_a.into();
        let table_b = table_b.into();
        SqlSecurity::validate_table_name(&table_a)?;
        SqlSecurity::validate_table_name(&table_b)?;
        Ok(Self {
            name: format!("SchemaMatch({table_a} vs {table_b})"),
            table_a,
            table_b,
            assertion,
            hint: None,
        })
    }

    /// Appends advice to the failure message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    async fn columns(
        &self,
        source: &dyn DataSource,
        table: &str,
    ) -> Result<BTreeMap<String, String>> {
        Ok(source
            .schema(table)
            .await?
            .into_iter()
            .map(|column| (column.name, column.data_type))
            .collect())
    }

    fn describe(&self, diff: &SchemaDiff) -> String {
        let mismatches = diff
            .type_mismatches
            .iter()
            .map(|(column, (a, b))| format!("{column} ({a} vs {b})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Schemas of '{}' and '{}' differ: only in {}: [{}]; only in {}: [{}]; type mismatches: [{mismatches}]",
            self.table_a,
            self.table_b,
            self.table_a,
            diff.only_in_a.join(", "),
            self.table_b,
            diff.only_in_b.join(", "),
        )
    }
}

#[async_trait]
impl Constraint for SchemaMatchConstraint {
    #[instrument(skip(self, source, _table), fields(constraint.name = %self.name))]
    async fn evaluate(&self, source: &dyn DataSource, _table: &str) -> Result<ConstraintResult> {
        let a = self.columns(source, &self.table_a).await?;
        let b = self.columns(source, &self.table_b).await?;
        let diff = SchemaDiff::between(a, b);
        debug!(
            constraint.name = %self.name,
            only_in_a = diff.only_in_a.len(),
            only_in_b = diff.only_in_b.len(),
            type_mismatches = diff.type_mismatches.len(),
            "Schema comparison"
        );

        let value = if diff.is_match() { 1.0 } else { 0.0 };
        grade(&self.name, value, &self.assertion, self.hint.as_deref(), || {
            if diff.is_match() {
                format!("Schemas of '{}' and '{}' match", self.table_a, self.table_b)
            } else {
                self.describe(&diff)
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> ConstraintMetadata {
        ConstraintMetadata::new(&self.name)
            .with_description("Compares schemas between two tables")
            .with_extra("table_a", self.table_a.clone())
            .with_extra("table_b", self.table_b.clone())
    }
}
