use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::Model;
use super::store::{Aggregate, Store, WriteOp};
use crate::filter::Filter;

/// Typed access to one table through the shared `Store`
pub struct Repository<T: Model> {
    store: Arc<dyn Store>,
    _phantom: PhantomData<T>,
}

impl<T: Model> Repository<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    fn decode(value: Value) -> Result<T, DatabaseError> {
        Ok(serde_json::from_value(value)?)
    }

    pub async fn create(&self, record: &T) -> Result<T, DatabaseError> {
        let stored = self.store.insert(T::TABLE, serde_json::to_value(record)?).await?;
        Self::decode(stored)
    }

    pub async fn select_any(&self, filter: Filter) -> Result<Vec<T>, DatabaseError> {
        self.store
            .select(T::TABLE, &filter)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<T>, DatabaseError> {
        self.store.select_one(T::TABLE, &filter).await?.map(Self::decode).transpose()
    }

    pub async fn select_404(&self, filter: Filter) -> Result<T, DatabaseError> {
        self.select_one(filter)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::NAME)))
    }

    pub async fn select_ids(&self, ids: Vec<Uuid>) -> Result<Vec<T>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(Filter::new().is_in("id", ids)).await
    }

    pub async fn update(&self, filter: Filter, changes: Map<String, Value>) -> Result<Vec<T>, DatabaseError> {
        self.store
            .update(T::TABLE, &filter, changes)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Update the row the filter identifies, 404 when nothing matched
    pub async fn update_one(&self, filter: Filter, changes: Map<String, Value>) -> Result<T, DatabaseError> {
        self.update(filter, changes)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::NAME)))
    }

    pub async fn count(&self, filter: Filter) -> Result<i64, DatabaseError> {
        self.store.count(T::TABLE, &filter).await
    }

    /// Sum of a numeric column, zero over an empty set
    pub async fn sum(&self, column: &'static str, filter: Filter) -> Result<f64, DatabaseError> {
        Ok(self
            .store
            .aggregate(T::TABLE, Aggregate::Sum(column), &filter)
            .await?
            .unwrap_or(0.0))
    }

    pub async fn delete(&self, filter: Filter) -> Result<u64, DatabaseError> {
        self.store.soft_delete(T::TABLE, &filter).await
    }

    pub fn insert_op(record: &T) -> Result<WriteOp, DatabaseError> {
        Ok(WriteOp::Insert {
            table: T::TABLE,
            record: serde_json::to_value(record)?,
        })
    }

    pub fn update_op(filter: Filter, changes: Map<String, Value>) -> WriteOp {
        WriteOp::Update {
            table: T::TABLE,
            filter,
            changes,
            required: false,
        }
    }

    pub fn decode_all(values: Vec<Value>) -> Result<Vec<T>, DatabaseError> {
        values.into_iter().map(Self::decode).collect()
    }
}

/// Serialize a partial input into a column change set.
///
/// Inputs mark absent fields with `skip_serializing_if = "Option::is_none"` so
/// only the provided columns are written.
pub fn changes_of<S: Serialize>(input: &S) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(input)? {
        Value::Object(map) => Ok(map),
        _ => Err(DatabaseError::QueryError("change set must be a JSON object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::models::{Entity, User};

    fn repo<T: Model>(store: &Arc<dyn Store>) -> Repository<T> {
        Repository::new(store.clone())
    }

    #[tokio::test]
    async fn select_404_names_the_model() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let err = repo::<Entity>(&store).select_404(Filter::by_id(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: Entity not found");
    }

    #[tokio::test]
    async fn create_then_update_one() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let users = repo::<User>(&store);
        let user = users
            .create(&User::new("Ada".into(), "Lovelace".into(), "ADA@example.com", "hash".into()))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");

        #[derive(Serialize)]
        struct Rename {
            #[serde(skip_serializing_if = "Option::is_none")]
            firstname: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            lastname: Option<String>,
        }
        let changes = changes_of(&Rename {
            firstname: Some("Augusta".into()),
            lastname: None,
        })
        .unwrap();
        assert_eq!(changes.len(), 1);

        let updated = users.update_one(Filter::by_id(user.id), changes).await.unwrap();
        assert_eq!(updated.firstname, "Augusta");
        assert_eq!(updated.lastname, "Lovelace");
    }

    #[tokio::test]
    async fn sum_is_zero_without_rows() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let total = repo::<Entity>(&store).sum("amount", Filter::new()).await.unwrap();
        assert_eq!(total, 0.0);
    }
}
