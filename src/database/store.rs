use async_trait::async_trait;
use serde_json::{Map, Value};

use super::manager::DatabaseError;
use crate::filter::Filter;

/// Scalar aggregate over one numeric column
#[derive(Debug, Clone, Copy)]
pub enum Aggregate {
    Sum(&'static str),
    Avg(&'static str),
}

impl Aggregate {
    pub fn column(&self) -> &'static str {
        match self {
            Aggregate::Sum(column) | Aggregate::Avg(column) => column,
        }
    }
}

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        table: &'static str,
        record: Value,
    },
    /// With `required` set, matching no row fails the whole batch
    Update {
        table: &'static str,
        filter: Filter,
        changes: Map<String, Value>,
        required: bool,
    },
    /// Insert, or on a `conflict` key collision overwrite only the `update` columns
    Upsert {
        table: &'static str,
        record: Value,
        conflict: &'static [&'static str],
        update: &'static [&'static str],
    },
    SoftDelete {
        table: &'static str,
        filter: Filter,
    },
}

impl WriteOp {
    /// Fail the batch with `NotFound` when an update matches nothing
    pub fn require_match(self) -> Self {
        match self {
            WriteOp::Update { table, filter, changes, .. } => WriteOp::Update {
                table,
                filter,
                changes,
                required: true,
            },
            other => other,
        }
    }
}

/// Persistence collaborator used by every handler and service.
///
/// Records cross this boundary as JSON objects keyed by column name.
/// Soft-deleted rows are invisible unless the filter asks for them.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, table: &str, record: Value) -> Result<Value, DatabaseError>;

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;

    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, DatabaseError> {
        let limited = filter.clone().limit(1);
        Ok(self.select(table, &limited).await?.into_iter().next())
    }

    /// Apply `changes` to every matching row and return the updated rows
    async fn update(&self, table: &str, filter: &Filter, changes: Map<String, Value>) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, table: &str, filter: &Filter) -> Result<i64, DatabaseError>;

    /// `None` when no row carries a non-null value
    async fn aggregate(&self, table: &str, aggregate: Aggregate, filter: &Filter) -> Result<Option<f64>, DatabaseError>;

    async fn soft_delete(&self, table: &str, filter: &Filter) -> Result<u64, DatabaseError>;

    /// Apply every op or none of them; returns the rows touched by each op, in order
    async fn atomically(&self, ops: Vec<WriteOp>) -> Result<Vec<Vec<Value>>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub(crate) fn record_object(record: &Value) -> Result<&Map<String, Value>, DatabaseError> {
    record
        .as_object()
        .ok_or_else(|| DatabaseError::QueryError("record must be a JSON object".to_string()))
}
