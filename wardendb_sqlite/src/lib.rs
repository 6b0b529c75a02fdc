use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct SqliteBackend {
    pub(crate) pool: Arc<SqlitePool>,
    pub(crate) url: String,
}

mod impls;
