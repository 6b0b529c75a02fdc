use itertools::Itertools;
use sqlx::{
    migrate::MigrateDatabase,
    query::QueryScalar,
    sqlite::SqliteArguments,
    Sqlite,
    SqlitePool,
};
use std::sync::Arc;
use wardencore::{
    ac::{
        predicate::{IdFilter, Predicate},
        Value,
    },
    error::BackendError,
    platform::{ConnectorOption, DefaultAccessPlatform, PlatformUrl},
};

use crate::SqliteBackend;

impl PlatformUrl for SqliteBackend {
    fn url(&self) -> &str {
        self.url.as_ref()
    }
}

impl DefaultAccessPlatform for SqliteBackend {}

pub(crate) fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).join(", ")
}

pub(crate) fn bind_scalar<'q>(
    query: QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>>,
    value: &Value,
) -> QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>> {
    match value {
        Value::Boolean(v) => query.bind(*v),
        Value::Integer(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
    }
}

impl SqliteBackend {
    pub async fn connect(opts: ConnectorOption) -> Result<SqliteBackend, sqlx::Error> {
        if opts.create_db && !Sqlite::database_exists(&opts.url).await.unwrap_or(false) {
            log::warn!("sqlite database {} does not exist; creating...", &opts.url);
            Sqlite::create_database(&opts.url).await?
        }

        let pool = SqlitePool::connect(&opts.url).await?;
        Ok(SqliteBackend {
            pool: Arc::new(pool),
            url: opts.url,
        })
    }

    pub async fn migrate(self) -> Result<Self, sqlx::Error> {
        sqlx::migrate!("migrations/warden").run(&*self.pool).await?;
        Ok(self)
    }

    /// Connects and brings the schema up to date.
    pub async fn access(opts: impl Into<ConnectorOption>) -> Result<Self, sqlx::Error> {
        Self::connect(opts.into()).await?
            .migrate()
            .await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The ids selected by a compiled filter, in ascending order.
    pub async fn select_ids(
        &self,
        filter: &IdFilter,
    ) -> Result<Vec<i64>, BackendError> {
        let fragment = filter.to_sql();
        log::trace!("select_ids: {} {:?}", fragment.sql, fragment.binds);
        let query = fragment.binds.iter()
            .fold(sqlx::query_scalar::<_, i64>(&fragment.sql), bind_scalar);
        let mut ids = query.fetch_all(&*self.pool).await?;
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn select_ids_where(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<Vec<i64>, BackendError> {
        self.select_ids(&IdFilter::new(table, predicate.clone())).await
    }
}

mod ac;
