//! PostgreSQL-backed user store

use super::store::{StoreError, UserStore};
use async_trait::async_trait;
use auth_service_shared::{Identity, NewIdentity, Page, Role};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, country, \
                            refresh_token, refresh_expiry, created_at, updated_at";

/// User record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub country: String,
    pub refresh_token: Option<String>,
    pub refresh_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for Identity {
    type Error = StoreError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let role: Role = record
            .role
            .parse()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("user {}: {}", record.id, e)))?;

        Ok(Identity {
            id: record.id,
            username: record.username,
            email: record.email,
            password_hash: record.password_hash,
            role,
            country: record.country,
            refresh_token: record.refresh_token,
            refresh_expiry: record.refresh_expiry,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateKey(db.constraint().unwrap_or("unique").to_string())
        }
        other => StoreError::Backend(other.into()),
    }
}

/// User store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Identity, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::NotFound)?;

        record.try_into()
    }

    async fn get_by_username(&self, username: &str) -> Result<Identity, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::NotFound)?;

        record.try_into()
    }

    async fn list(&self, page: Page) -> Result<Vec<Identity>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY id OFFSET $1 LIMIT $2",
            USER_COLUMNS
        );
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        records.into_iter().map(Identity::try_from).collect()
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, role, country)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&identity.username)
            .bind(&identity.email)
            .bind(&identity.password_hash)
            .bind(identity.role.as_str())
            .bind(&identity.country)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        record.try_into()
    }

    async fn update(&self, identity: &Identity) -> Result<Identity, StoreError> {
        let sql = format!(
            r#"
            UPDATE users SET
                username = $2,
                email = $3,
                password_hash = $4,
                role = $5,
                country = $6,
                refresh_token = $7,
                refresh_expiry = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(identity.id)
            .bind(&identity.username)
            .bind(&identity.email)
            .bind(&identity.password_hash)
            .bind(identity.role.as_str())
            .bind(&identity.country)
            .bind(&identity.refresh_token)
            .bind(identity.refresh_expiry)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::NotFound)?;

        record.try_into()
    }

    async fn set_refresh_token(
        &self,
        id: i64,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Only the slot columns, so concurrent profile edits survive.
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $2, refresh_expiry = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::db::health_check(&self.pool)
            .await
            .map_err(StoreError::Backend)
    }
}
