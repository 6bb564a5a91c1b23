use std::sync::Arc;

use crate::database::{models::Model, Repository, Store};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn repo<T: Model>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }
}
