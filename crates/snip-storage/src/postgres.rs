use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::error::{StorageError, StorageResult};
use snip_core::repository::{ReadRepository, RecordId, Repository, UrlRecord};
use snip_core::shortcode::ShortCode;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

/// DDL for the `urls` table, applied by [`PostgresRepository::ensure_schema`].
pub const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

const ORIGINAL_URL_INDEX: &str = "urls_original_url_live_idx";

const SELECT_COLUMNS: &str = "id, original_url, alias, created_at, updated_at, deleted_at";

/// Postgres implementation of the repository contract.
///
/// Soft delete is implemented with `deleted_at`. Reads only return live
/// records. The alias column is unique across all rows, soft-deleted ones
/// included, so an alias is never handed out twice; the original URL is
/// unique among live rows only.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `urls` table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_live_by(&self, column: &str, value: &str) -> StorageResult<Option<UrlRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM urls WHERE {column} = $1 AND deleted_at IS NULL LIMIT 1"
        );

        sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .map(|row| record_from_row(&row))
            .transpose()
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn parse_timestamp(column: &str, seconds: i64) -> StorageResult<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn record_from_row(row: &PgRow) -> StorageResult<UrlRecord> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let alias: String = row.try_get("alias").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;
    let deleted_at: Option<i64> = row.try_get("deleted_at").map_err(map_sqlx_error)?;

    if alias.is_empty() {
        return Err(StorageError::InvalidData(format!(
            "record {id} has an empty alias"
        )));
    }

    Ok(UrlRecord {
        id: RecordId(id),
        original_url,
        alias: ShortCode::new_unchecked(alias),
        created_at: parse_timestamp("created_at", created_at)?,
        updated_at: parse_timestamp("updated_at", updated_at)?,
        deleted_at: deleted_at
            .map(|value| parse_timestamp("deleted_at", value))
            .transpose()?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// Picks the value that tripped a unique constraint on insert.
fn conflicting_value(err: &sqlx::Error, original_url: &str, alias: &ShortCode) -> String {
    let constraint = err.as_database_error().and_then(|e| e.constraint());
    if constraint == Some(ORIGINAL_URL_INDEX) {
        original_url.to_string()
    } else {
        alias.to_string()
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(message),
        sqlx::Error::RowNotFound => StorageError::NotFound(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for PostgresRepository {
    async fn find_by_alias(&self, alias: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        self.fetch_live_by("alias", alias.as_str()).await
    }

    async fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<UrlRecord>> {
        self.fetch_live_by("original_url", original_url).await
    }

    async fn exists_by_alias(&self, alias: &ShortCode) -> StorageResult<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM urls
            WHERE alias = $1
            LIMIT 1
            "#,
        )
        .bind(alias.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create(&self, original_url: &str, alias: &ShortCode) -> StorageResult<UrlRecord> {
        let now = now_unix_seconds();
        let sql = format!(
            r#"
            INSERT INTO urls (original_url, alias, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $3, NULL)
            RETURNING {SELECT_COLUMNS}
            "#
        );

        let result = sqlx::query(&sql)
            .bind(original_url)
            .bind(alias.as_str())
            .bind(now)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => record_from_row(&row),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(
                conflicting_value(&err, original_url, alias),
            )),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_alias(&self, id: RecordId, alias: &ShortCode) -> StorageResult<UrlRecord> {
        let now = now_unix_seconds();
        let sql = format!(
            r#"
            UPDATE urls
            SET alias = $1, updated_at = $2
            WHERE id = $3
              AND deleted_at IS NULL
            RETURNING {SELECT_COLUMNS}
            "#
        );

        let result = sqlx::query(&sql)
            .bind(alias.as_str())
            .bind(now)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => record_from_row(&row),
            Ok(None) => Err(StorageError::NotFound(id.to_string())),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(alias.to_string())),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn delete(&self, alias: &ShortCode) -> StorageResult<bool> {
        let now = now_unix_seconds();

        let result = sqlx::query(
            r#"
            UPDATE urls
            SET deleted_at = $1, updated_at = $1
            WHERE alias = $2
              AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(alias.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
