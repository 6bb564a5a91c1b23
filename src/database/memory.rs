use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::{record_object, Aggregate, Store, WriteOp};
use crate::filter::filter_match::compare_json;
use crate::filter::{Filter, FilterMatch};

type Tables = HashMap<String, Vec<Value>>;

/// Unique keys mirrored from the SQL migrations
const UNIQUE_KEYS: &[(&str, &[&str])] = &[
    ("users", &["email"]),
    ("associate_profiles", &["associate_id"]),
    ("invoices", &["invoice_number"]),
    ("settlements", &["task_id", "associate_id"]),
];

/// In-process `Store` used by tests and local experiments.
///
/// `atomically` runs against a snapshot of every table and swaps it in only
/// when all ops succeed.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn same_key(a: &Value, b: &Value, columns: &[&str]) -> bool {
    columns.iter().all(|c| {
        let (x, y) = (a.get(*c).unwrap_or(&Value::Null), b.get(*c).unwrap_or(&Value::Null));
        // NULLs never collide, matching Postgres unique indexes
        !x.is_null() && normalize(x) == normalize(y)
    })
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

fn is_live(record: &Value) -> bool {
    record.get("deleted_at").map_or(true, Value::is_null)
}

fn check_unique(rows: &[Value], table: &str, record: &Value, skip: Option<usize>) -> Result<(), DatabaseError> {
    for (key_table, columns) in UNIQUE_KEYS {
        if *key_table != table {
            continue;
        }
        let clash = rows
            .iter()
            .enumerate()
            .any(|(i, row)| Some(i) != skip && is_live(row) && same_key(row, record, columns));
        if clash {
            return Err(DatabaseError::Conflict(format!(
                "duplicate key value violates unique constraint on {}({})",
                table,
                columns.join(", ")
            )));
        }
    }
    Ok(())
}

fn insert_into(tables: &mut Tables, table: &str, record: &Value) -> Result<Value, DatabaseError> {
    let mut object = record_object(record)?.clone();
    if object.get("id").map_or(true, Value::is_null) {
        object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    for column in ["created_at", "updated_at"] {
        if object.get(column).map_or(true, Value::is_null) {
            object.insert(column.to_string(), now_value());
        }
    }
    object.entry("deleted_at").or_insert(Value::Null);

    let record = Value::Object(object);
    let rows = tables.entry(table.to_string()).or_default();
    check_unique(rows, table, &record, None)?;
    rows.push(record.clone());
    Ok(record)
}

fn select_from(tables: &Tables, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
    filter.validate()?;
    let mut rows: Vec<Value> = tables
        .get(table)
        .map(|rows| rows.iter().filter(|r| FilterMatch::matches(filter, r)).cloned().collect())
        .unwrap_or_default();

    if !filter.order_info().is_empty() {
        rows.sort_by(|a, b| {
            for order in filter.order_info() {
                let ordering = compare_json(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                let ordering = match order.sort {
                    crate::filter::SortDirection::Asc => ordering,
                    crate::filter::SortDirection::Desc => ordering.reverse(),
                };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
    }
    if let Some(limit) = filter.limit_value() {
        rows.truncate(limit.max(0) as usize);
    }
    Ok(rows)
}

fn update_in(
    tables: &mut Tables,
    table: &str,
    filter: &Filter,
    changes: &Map<String, Value>,
) -> Result<Vec<Value>, DatabaseError> {
    filter.validate()?;
    let Some(rows) = tables.get_mut(table) else {
        return Ok(vec![]);
    };

    let matching: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| FilterMatch::matches(filter, r))
        .map(|(i, _)| i)
        .collect();

    let mut updated = Vec::with_capacity(matching.len());
    for index in matching {
        let mut candidate = rows[index].clone();
        if let Some(object) = candidate.as_object_mut() {
            for (column, value) in changes {
                object.insert(column.clone(), value.clone());
            }
            if !changes.contains_key("updated_at") {
                object.insert("updated_at".to_string(), now_value());
            }
        }
        check_unique(rows, table, &candidate, Some(index))?;
        rows[index] = candidate.clone();
        updated.push(candidate);
    }
    Ok(updated)
}

fn upsert_into(
    tables: &mut Tables,
    table: &str,
    record: &Value,
    conflict: &[&str],
    update: &[&str],
) -> Result<Value, DatabaseError> {
    let existing = tables
        .get(table)
        .and_then(|rows| rows.iter().position(|row| same_key(row, record, conflict)));

    match existing {
        Some(index) => {
            let source = record_object(record)?;
            let rows = tables.entry(table.to_string()).or_default();
            if let Some(object) = rows[index].as_object_mut() {
                for column in update {
                    object.insert(column.to_string(), source.get(*column).cloned().unwrap_or(Value::Null));
                }
                object.insert("updated_at".to_string(), now_value());
            }
            Ok(rows[index].clone())
        }
        None => insert_into(tables, table, record),
    }
}

fn soft_delete_in(tables: &mut Tables, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
    let mut changes = Map::new();
    changes.insert("deleted_at".to_string(), now_value());
    update_in(tables, table, filter, &changes)
}

fn apply(tables: &mut Tables, op: &WriteOp) -> Result<Vec<Value>, DatabaseError> {
    match op {
        WriteOp::Insert { table, record } => Ok(vec![insert_into(tables, table, record)?]),
        WriteOp::Update {
            table,
            filter,
            changes,
            required,
        } => {
            let rows = update_in(tables, table, filter, changes)?;
            if *required && rows.is_empty() {
                return Err(DatabaseError::NotFound(format!("no {} row matched the update", table)));
            }
            Ok(rows)
        }
        WriteOp::Upsert { table, record, conflict, update } => {
            Ok(vec![upsert_into(tables, table, record, conflict, update)?])
        }
        WriteOp::SoftDelete { table, filter } => soft_delete_in(tables, table, filter),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, table: &str, record: Value) -> Result<Value, DatabaseError> {
        let mut tables = self.tables.write().await;
        insert_into(&mut tables, table, &record)
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let tables = self.tables.read().await;
        select_from(&tables, table, filter)
    }

    async fn update(&self, table: &str, filter: &Filter, changes: Map<String, Value>) -> Result<Vec<Value>, DatabaseError> {
        let mut tables = self.tables.write().await;
        update_in(&mut tables, table, filter, &changes)
    }

    async fn count(&self, table: &str, filter: &Filter) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(select_from(&tables, table, filter)?.len() as i64)
    }

    async fn aggregate(&self, table: &str, aggregate: Aggregate, filter: &Filter) -> Result<Option<f64>, DatabaseError> {
        let tables = self.tables.read().await;
        let values: Vec<f64> = select_from(&tables, table, filter)?
            .iter()
            .filter_map(|row| match row.get(aggregate.column()) {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.parse().ok(),
                _ => None,
            })
            .collect();

        if values.is_empty() {
            return Ok(None);
        }
        let total: f64 = values.iter().sum();
        Ok(Some(match aggregate {
            Aggregate::Sum(_) => total,
            Aggregate::Avg(_) => total / values.len() as f64,
        }))
    }

    async fn soft_delete(&self, table: &str, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(soft_delete_in(&mut tables, table, filter)?.len() as u64)
    }

    async fn atomically(&self, ops: Vec<WriteOp>) -> Result<Vec<Vec<Value>>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let mut snapshot = tables.clone();
        let mut results = Vec::with_capacity(ops.len());
        for op in &ops {
            results.push(apply(&mut snapshot, op)?);
        }
        *tables = snapshot;
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_identity_and_timestamps() {
        let store = MemoryStore::new();
        let record = store.insert("entities", json!({ "company_name": "Acme" })).await.unwrap();
        assert!(record["id"].is_string());
        assert!(record["created_at"].is_string());
        assert!(record["deleted_at"].is_null());
    }

    #[tokio::test]
    async fn unique_email_is_enforced_case_insensitively() {
        let store = MemoryStore::new();
        store.insert("users", json!({ "email": "a@b.co" })).await.unwrap();
        let result = store.insert("users", json!({ "email": "A@B.co" })).await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn upsert_updates_only_listed_columns() {
        let store = MemoryStore::new();
        let key = json!({ "task_id": "t1", "associate_id": "a1", "expected_amount": 700, "settled_amount": 0 });
        let op = |record: Value| WriteOp::Upsert {
            table: "settlements",
            record,
            conflict: &["task_id", "associate_id"],
            update: &["expected_amount"],
        };
        store.atomically(vec![op(key)]).await.unwrap();
        store
            .atomically(vec![op(json!({ "task_id": "t1", "associate_id": "a1", "expected_amount": 900, "settled_amount": 50 }))])
            .await
            .unwrap();

        let rows = store.select("settlements", &Filter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["expected_amount"], 900);
        assert_eq!(rows[0]["settled_amount"], 0);
    }

    #[tokio::test]
    async fn failed_batch_leaves_tables_untouched() {
        let store = MemoryStore::new();
        store.insert("users", json!({ "email": "taken@x.io" })).await.unwrap();

        let result = store
            .atomically(vec![
                WriteOp::Insert { table: "entities", record: json!({ "company_name": "Ghost" }) },
                WriteOp::Insert { table: "users", record: json!({ "email": "taken@x.io" }) },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.count("entities", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn soft_delete_hides_rows_and_aggregates_skip_them() {
        let store = MemoryStore::new();
        store.insert("payments", json!({ "amount": 100.0, "status": "confirmed" })).await.unwrap();
        store.insert("payments", json!({ "amount": 50.5, "status": "confirmed" })).await.unwrap();
        store.insert("payments", json!({ "amount": 10.0, "status": "failed" })).await.unwrap();

        let confirmed = Filter::new().eq("status", "confirmed");
        assert_eq!(store.aggregate("payments", Aggregate::Sum("amount"), &confirmed).await.unwrap(), Some(150.5));
        assert_eq!(store.aggregate("payments", Aggregate::Avg("amount"), &confirmed).await.unwrap(), Some(75.25));

        let deleted = store.soft_delete("payments", &Filter::new().eq("status", "failed")).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count("payments", &Filter::new()).await.unwrap(), 2);
        assert_eq!(store.count("payments", &Filter::new().include_deleted()).await.unwrap(), 3);
        assert_eq!(store.aggregate("payments", Aggregate::Sum("amount"), &Filter::new().eq("status", "void")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn select_orders_and_limits() {
        let store = MemoryStore::new();
        for (name, at) in [("b", "2024-02-01T00:00:00Z"), ("a", "2024-03-01T00:00:00Z"), ("c", "2024-01-01T00:00:00Z")] {
            store.insert("projects", json!({ "name": name, "created_at": at })).await.unwrap();
        }
        let rows = store.select("projects", &Filter::new().order_desc("created_at").limit(2)).await.unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
