use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::Query,
    PgConnection, PgPool, Postgres, Row,
};

use super::manager::DatabaseError;
use super::store::{record_object, Aggregate, Store, WriteOp};
use crate::filter::{Filter, FilterValue};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

const ALIAS: &str = "t";

/// `Store` backed by Postgres.
///
/// Writes go through `jsonb_populate_record` so the JSON record is cast column
/// by column against the table's own row type; reads come back via `row_to_json`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &FilterValue) -> PgQuery<'q> {
    match value {
        FilterValue::Null => query.bind(Option::<String>::None),
        FilterValue::Bool(v) => query.bind(*v),
        FilterValue::Int(v) => query.bind(*v),
        FilterValue::Float(v) => query.bind(*v),
        FilterValue::Text(v) => query.bind(v.clone()),
        FilterValue::Uuid(v) => query.bind(*v),
        FilterValue::Time(v) => query.bind(*v),
    }
}

fn quote(name: &str) -> Result<String, DatabaseError> {
    Filter::validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

fn column_list(record: &Value) -> Result<Vec<String>, DatabaseError> {
    record_object(record)?.keys().map(|k| quote(k)).collect()
}

fn decode_records(rows: Vec<PgRow>) -> Result<Vec<Value>, DatabaseError> {
    rows.into_iter()
        .map(|row| row.try_get::<Value, _>("record").map_err(DatabaseError::from_sqlx))
        .collect()
}

async fn insert_on(conn: &mut PgConnection, table: &str, record: &Value) -> Result<Value, DatabaseError> {
    let table = quote(table)?;
    let columns = column_list(record)?.join(", ");
    let sql = format!(
        "INSERT INTO {table} AS {ALIAS} ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
         RETURNING row_to_json({ALIAS})::jsonb AS record"
    );
    let row = sqlx::query(&sql)
        .bind(record.clone())
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
    row.try_get::<Value, _>("record").map_err(DatabaseError::from_sqlx)
}

async fn upsert_on(
    conn: &mut PgConnection,
    table: &str,
    record: &Value,
    conflict: &[&str],
    update: &[&str],
) -> Result<Value, DatabaseError> {
    let table = quote(table)?;
    let columns = column_list(record)?.join(", ");
    let conflict_columns = conflict.iter().map(|c| quote(c)).collect::<Result<Vec<_>, _>>()?.join(", ");
    let mut assignments = update
        .iter()
        .map(|c| quote(c).map(|q| format!("{q} = EXCLUDED.{q}")))
        .collect::<Result<Vec<_>, _>>()?;
    assignments.push("\"updated_at\" = now()".to_string());

    let sql = format!(
        "INSERT INTO {table} AS {ALIAS} ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
         ON CONFLICT ({conflict_columns}) DO UPDATE SET {} \
         RETURNING row_to_json({ALIAS})::jsonb AS record",
        assignments.join(", ")
    );
    let row = sqlx::query(&sql)
        .bind(record.clone())
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
    row.try_get::<Value, _>("record").map_err(DatabaseError::from_sqlx)
}

async fn select_on(conn: &mut PgConnection, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
    let table = quote(table)?;
    let sql_result = filter.to_sql(ALIAS, 0)?;
    let sql = format!("SELECT row_to_json({ALIAS})::jsonb AS record FROM {table} AS {ALIAS}{}", sql_result.clause);

    let mut query = sqlx::query(&sql);
    for param in &sql_result.params {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(DatabaseError::from_sqlx)?;
    decode_records(rows)
}

async fn update_on(
    conn: &mut PgConnection,
    table: &str,
    filter: &Filter,
    changes: &Map<String, Value>,
) -> Result<Vec<Value>, DatabaseError> {
    let table = quote(table)?;
    let mut assignments = changes
        .keys()
        .map(|c| quote(c).map(|q| format!("{q} = r.{q}")))
        .collect::<Result<Vec<_>, _>>()?;
    if !changes.contains_key("updated_at") {
        assignments.push("\"updated_at\" = now()".to_string());
    }

    // $1 is the change set, filter parameters follow
    let sql_result = filter.to_sql(ALIAS, 1)?;
    let sql = format!(
        "UPDATE {table} AS {ALIAS} SET {} FROM jsonb_populate_record(NULL::{table}, $1) AS r{} \
         RETURNING row_to_json({ALIAS})::jsonb AS record",
        assignments.join(", "),
        sql_result.clause
    );

    let mut query = sqlx::query(&sql).bind(Value::Object(changes.clone()));
    for param in &sql_result.params {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(DatabaseError::from_sqlx)?;
    decode_records(rows)
}

async fn soft_delete_on(conn: &mut PgConnection, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
    let table = quote(table)?;
    let sql_result = filter.to_sql(ALIAS, 0)?;
    let sql = format!(
        "UPDATE {table} AS {ALIAS} SET \"deleted_at\" = now(){} RETURNING row_to_json({ALIAS})::jsonb AS record",
        sql_result.clause
    );

    let mut query = sqlx::query(&sql);
    for param in &sql_result.params {
        query = bind_value(query, param);
    }
    let rows = query.fetch_all(&mut *conn).await.map_err(DatabaseError::from_sqlx)?;
    decode_records(rows)
}

async fn apply_on(conn: &mut PgConnection, op: &WriteOp) -> Result<Vec<Value>, DatabaseError> {
    match op {
        WriteOp::Insert { table, record } => Ok(vec![insert_on(conn, table, record).await?]),
        WriteOp::Update {
            table,
            filter,
            changes,
            required,
        } => {
            let rows = update_on(conn, table, filter, changes).await?;
            if *required && rows.is_empty() {
                return Err(DatabaseError::NotFound(format!("no {} row matched the update", table)));
            }
            Ok(rows)
        }
        WriteOp::Upsert { table, record, conflict, update } => {
            Ok(vec![upsert_on(conn, table, record, conflict, update).await?])
        }
        WriteOp::SoftDelete { table, filter } => soft_delete_on(conn, table, filter).await,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, table: &str, record: Value) -> Result<Value, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        insert_on(&mut conn, table, &record).await
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        select_on(&mut conn, table, filter).await
    }

    async fn update(&self, table: &str, filter: &Filter, changes: Map<String, Value>) -> Result<Vec<Value>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        update_on(&mut conn, table, filter, &changes).await
    }

    async fn count(&self, table: &str, filter: &Filter) -> Result<i64, DatabaseError> {
        let table = quote(table)?;
        let sql_result = filter.to_sql(ALIAS, 0)?;
        let sql = format!("SELECT COUNT(*) AS count FROM {table} AS {ALIAS}{}", sql_result.clause);

        let mut query = sqlx::query(&sql);
        for param in &sql_result.params {
            query = bind_value(query, param);
        }
        let row = query.fetch_one(&self.pool).await.map_err(DatabaseError::from_sqlx)?;
        row.try_get::<i64, _>("count").map_err(DatabaseError::from_sqlx)
    }

    async fn aggregate(&self, table: &str, aggregate: Aggregate, filter: &Filter) -> Result<Option<f64>, DatabaseError> {
        let table = quote(table)?;
        let column = quote(aggregate.column())?;
        let function = match aggregate {
            Aggregate::Sum(_) => "SUM",
            Aggregate::Avg(_) => "AVG",
        };
        let sql_result = filter.to_sql(ALIAS, 0)?;
        let sql = format!(
            "SELECT {function}({ALIAS}.{column})::float8 AS value FROM {table} AS {ALIAS}{}",
            sql_result.clause
        );

        let mut query = sqlx::query(&sql);
        for param in &sql_result.params {
            query = bind_value(query, param);
        }
        let row = query.fetch_one(&self.pool).await.map_err(DatabaseError::from_sqlx)?;
        row.try_get::<Option<f64>, _>("value").map_err(DatabaseError::from_sqlx)
    }

    async fn soft_delete(&self, table: &str, filter: &Filter) -> Result<u64, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let rows = soft_delete_on(&mut conn, table, filter).await?;
        Ok(rows.len() as u64)
    }

    async fn atomically(&self, ops: Vec<WriteOp>) -> Result<Vec<Vec<Value>>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(ops.len());
        for op in &ops {
            // Dropping `tx` on error rolls the batch back
            results.push(apply_on(&mut *tx, op).await?);
        }
        tx.commit().await?;
        Ok(results)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
