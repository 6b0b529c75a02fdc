use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use wardencore::{
    ac::{
        traits::UserBackend,
        User,
    },
    error::BackendError,
};

use crate::SqliteBackend;

fn to_user(row: SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        firm_id: row.try_get("firm_id")?,
    })
}

async fn add_user_sqlite(
    backend: &SqliteBackend,
    name: &str,
    firm_id: Option<i64>,
) -> Result<i64, BackendError> {
    let id = sqlx::query(
        r#"
INSERT INTO 'user' (
    name,
    firm_id
)
VALUES ( ?1, ?2 )
        "#,
    )
    .bind(name)
    .bind(firm_id)
    .execute(&*backend.pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn get_user_by_id_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<Option<User>, BackendError> {
    let rec = sqlx::query(
        r#"
SELECT
    id,
    name,
    firm_id
FROM
    'user'
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .try_map(to_user)
    .fetch_optional(&*backend.pool)
    .await?;
    Ok(rec)
}

async fn get_user_by_name_sqlite(
    backend: &SqliteBackend,
    name: &str,
) -> Result<Option<User>, BackendError> {
    let rec = sqlx::query(
        r#"
SELECT
    id,
    name,
    firm_id
FROM
    'user'
WHERE
    name = ?1
        "#,
    )
    .bind(name)
    .try_map(to_user)
    .fetch_optional(&*backend.pool)
    .await?;
    Ok(rec)
}

#[async_trait]
impl UserBackend for SqliteBackend {
    async fn add_user(
        &self,
        name: &str,
        firm_id: Option<i64>,
    ) -> Result<i64, BackendError> {
        add_user_sqlite(
            &self,
            name,
            firm_id,
        ).await
    }

    async fn get_user_by_id(
        &self,
        id: i64,
    ) -> Result<Option<User>, BackendError> {
        get_user_by_id_sqlite(
            &self,
            id,
        ).await
    }

    async fn get_user_by_name(
        &self,
        name: &str,
    ) -> Result<Option<User>, BackendError> {
        get_user_by_name_sqlite(
            &self,
            name,
        ).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use wardencore::ac::{
        traits::UserBackend,
        User,
    };
    use crate::SqliteBackend;

    #[async_std::test]
    async fn test_basic() -> anyhow::Result<()> {
        let backend = SqliteBackend::access("sqlite::memory:").await?;
        let user_id = UserBackend::add_user(&backend, "test_user", Some(7)).await?;
        let user = UserBackend::get_user_by_id(&backend, user_id).await?
            .expect("user is missing?");
        assert_eq!(
            user,
            User {
                id: 1,
                name: "test_user".to_string(),
                firm_id: Some(7),
            },
        );
        assert_eq!(
            UserBackend::get_user_by_name(&backend, "test_user").await?,
            Some(user),
        );
        assert_eq!(UserBackend::get_user_by_id(&backend, 2).await?, None);
        // names are unique
        assert!(UserBackend::add_user(&backend, "test_user", None).await.is_err());
        Ok(())
    }
}
