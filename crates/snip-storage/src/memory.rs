use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use snip_core::error::{StorageError, StorageResult};
use snip_core::repository::{ReadRepository, RecordId, Repository, UrlRecord};
use snip_core::shortcode::ShortCode;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: HashMap<RecordId, UrlRecord>,
    /// Every alias ever assigned, including soft-deleted records.
    by_alias: HashMap<ShortCode, RecordId>,
    /// Live records only.
    by_url: HashMap<String, RecordId>,
}

impl Inner {
    fn live(&self, id: RecordId) -> Option<&UrlRecord> {
        self.records.get(&id).filter(|record| !record.is_deleted())
    }
}

/// In-memory implementation of the Repository trait.
///
/// Both uniqueness indexes (alias and original URL) sit behind a single
/// lock so that check-and-write stays atomic across them, mirroring the
/// constraints of the Postgres schema.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, soft-deleted ones included.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_alias(&self, alias: &ShortCode) -> StorageResult<Option<UrlRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_alias
            .get(alias)
            .and_then(|id| inner.live(*id))
            .cloned())
    }

    async fn find_by_original_url(&self, original_url: &str) -> StorageResult<Option<UrlRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_url
            .get(original_url)
            .and_then(|id| inner.live(*id))
            .cloned())
    }

    async fn exists_by_alias(&self, alias: &ShortCode) -> StorageResult<bool> {
        Ok(self.inner.read().by_alias.contains_key(alias))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create(&self, original_url: &str, alias: &ShortCode) -> StorageResult<UrlRecord> {
        let mut inner = self.inner.write();

        if inner.by_alias.contains_key(alias) {
            return Err(StorageError::Conflict(alias.to_string()));
        }
        if inner.by_url.contains_key(original_url) {
            return Err(StorageError::Conflict(original_url.to_string()));
        }

        inner.next_id += 1;
        let id = RecordId(inner.next_id);
        let now = Timestamp::now();
        let record = UrlRecord {
            id,
            original_url: original_url.to_string(),
            alias: alias.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        inner.by_alias.insert(alias.clone(), id);
        inner.by_url.insert(original_url.to_string(), id);
        inner.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update_alias(&self, id: RecordId, alias: &ShortCode) -> StorageResult<UrlRecord> {
        let mut inner = self.inner.write();

        let previous = match inner.live(id) {
            Some(record) => record.alias.clone(),
            None => return Err(StorageError::NotFound(id.to_string())),
        };

        if previous == *alias {
            return Ok(inner.records[&id].clone());
        }
        if inner.by_alias.contains_key(alias) {
            return Err(StorageError::Conflict(alias.to_string()));
        }

        inner.by_alias.remove(&previous);
        inner.by_alias.insert(alias.clone(), id);

        let record = inner
            .records
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.alias = alias.clone();
        record.updated_at = Timestamp::now();
        Ok(record.clone())
    }

    async fn delete(&self, alias: &ShortCode) -> StorageResult<bool> {
        let mut inner = self.inner.write();

        let Some(id) = inner.by_alias.get(alias).copied() else {
            return Ok(false);
        };
        let Some(record) = inner.records.get_mut(&id).filter(|r| !r.is_deleted()) else {
            return Ok(false);
        };

        let now = Timestamp::now();
        record.deleted_at = Some(now);
        record.updated_at = now;
        let original_url = record.original_url.clone();

        // The alias stays reserved; the URL may be shortened again.
        inner.by_url.remove(&original_url);
        Ok(true)
    }
}
