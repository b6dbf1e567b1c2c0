use crate::error::StorageResult;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

/// Storage-assigned identity of a [`UrlRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: RecordId,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The alias the original URL is reachable under.
    pub alias: ShortCode,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Soft-delete marker. Deleted records never resolve.
    pub deleted_at: Option<Timestamp>,
}

impl UrlRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A read-only view of a repository.
///
/// This is everything the alias allocator needs to make its decisions,
/// and everything the redirect path needs to resolve an alias.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the live record owning `alias`.
    /// Returns `None` if no live record has that alias.
    async fn find_by_alias(&self, alias: &ShortCode) -> StorageResult<Option<UrlRecord>>;

    /// Retrieves the live record for `original_url`, if one exists.
    async fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Checks whether an alias is taken.
    ///
    /// Soft-deleted records keep their alias reserved, so this reports
    /// `true` for them as well.
    async fn exists_by_alias(&self, alias: &ShortCode) -> StorageResult<bool>;
}

#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record.
    ///
    /// Returns `Err(Conflict)` if the alias is taken or a live record
    /// already exists for `original_url`.
    async fn create(&self, original_url: &str, alias: &ShortCode) -> StorageResult<UrlRecord>;

    /// Replaces the alias of a live record, keeping its original URL.
    ///
    /// Returns `Err(Conflict)` if another record holds `alias` and
    /// `Err(NotFound)` if the record does not exist or was deleted.
    async fn update_alias(&self, id: RecordId, alias: &ShortCode) -> StorageResult<UrlRecord>;

    /// Soft-deletes the live record owning `alias`.
    /// Returns `true` if a record was marked deleted.
    async fn delete(&self, alias: &ShortCode) -> StorageResult<bool>;
}

#[async_trait]
impl<T: ReadRepository + ?Sized> ReadRepository for Arc<T> {
    async fn find_by_alias(&self, alias: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        (**self).find_by_alias(alias).await
    }

    async fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<UrlRecord>> {
        (**self).find_by_original_url(original_url).await
    }

    async fn exists_by_alias(&self, alias: &ShortCode) -> StorageResult<bool> {
        (**self).exists_by_alias(alias).await
    }
}

#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn create(&self, original_url: &str, alias: &ShortCode) -> StorageResult<UrlRecord> {
        (**self).create(original_url, alias).await
    }

    async fn update_alias(&self, id: RecordId, alias: &ShortCode) -> StorageResult<UrlRecord> {
        (**self).update_alias(id, alias).await
    }

    async fn delete(&self, alias: &ShortCode) -> StorageResult<bool> {
        (**self).delete(alias).await
    }
}
