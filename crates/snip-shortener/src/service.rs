use crate::allocator::{Allocation, AllocationAction, Allocator, DEFAULT_MAX_ATTEMPTS};
use async_trait::async_trait;
use snip_core::error::Result;
use snip_core::{
    EventKind, Notification, Notifier, ReadRepository, Repository, ResolveParams, ShortCode,
    ShortenParams, Shortened, Shortener, ShortenerError, StorageError, UrlRecord,
};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use url::Url;

/// Settings for [`ShortenerService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Public base URL short aliases are appended to, e.g. `https://sn.ip`.
    #[builder(setter(into))]
    pub base_url: String,
    /// Ceiling on generated candidates per allocation.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,
    /// Aliases callers may not request, e.g. paths the transport routes
    /// itself.
    #[builder(default)]
    pub reserved_aliases: Vec<String>,
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository`, a `Generator` and a `Notifier` to handle:
/// - URL and alias validation
/// - Alias allocation with collision re-hashing
/// - Create-or-update persistence keyed by the original URL
/// - Fire-and-forget event notifications
///
/// Persistence may still lose a race against a concurrent request that
/// claimed the same alias or URL in between. Such a late conflict is retried
/// once with a fresh allocation; a second one is reported as
/// [`ShortenerError::AliasTaken`].
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    allocator: Allocator<R, G>,
    notifier: Arc<dyn Notifier>,
    base_url: String,
    reserved_aliases: Vec<String>,
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(
        repository: R,
        generator: G,
        notifier: Arc<dyn Notifier>,
        settings: ShortenerSettings,
    ) -> Self {
        let repository = Arc::new(repository);
        let allocator = Allocator::new(Arc::clone(&repository), Arc::new(generator))
            .with_max_attempts(settings.max_attempts);

        Self {
            repository,
            allocator,
            notifier,
            base_url: settings.base_url,
            reserved_aliases: settings.reserved_aliases,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates that the URL parses, uses http(s) and names a host.
    ///
    /// Returns the URL with surrounding whitespace removed; it is otherwise
    /// stored exactly as given.
    fn validate_url(url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ShortenerError::InvalidInput(
                "URL cannot be empty".to_string(),
            ));
        }

        let parsed = Url::parse(url)
            .map_err(|e| ShortenerError::InvalidInput(format!("malformed URL '{url}': {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShortenerError::InvalidInput(format!(
                "URL scheme must be http or https: {}",
                parsed.scheme()
            )));
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ShortenerError::InvalidInput(format!(
                "URL must have a host: {url}"
            )));
        }

        Ok(url.to_string())
    }

    /// Blank aliases count as absent.
    fn requested_alias(&self, alias: Option<&str>) -> Result<Option<ShortCode>> {
        let alias = match alias.map(str::trim) {
            None | Some("") => return Ok(None),
            Some(alias) => ShortCode::new(alias)?,
        };

        if self.reserved_aliases.iter().any(|r| r == alias.as_str()) {
            return Err(ShortenerError::InvalidInput(format!(
                "alias '{alias}' is reserved"
            )));
        }

        Ok(Some(alias))
    }

    async fn persist(&self, original_url: &str, allocation: Allocation) -> Result<UrlRecord> {
        let record = match allocation.action {
            AllocationAction::Create => {
                self.repository
                    .create(original_url, &allocation.alias)
                    .await?
            }
            AllocationAction::Update { id } => {
                self.repository
                    .update_alias(id, &allocation.alias)
                    .await?
            }
        };
        Ok(record)
    }

    async fn allocate_and_persist(
        &self,
        original_url: &str,
        requested: Option<&ShortCode>,
    ) -> Result<(UrlRecord, bool)> {
        let allocation = self.allocator.allocate(original_url, requested).await?;
        let created = allocation.action == AllocationAction::Create;
        let record = self.persist(original_url, allocation).await?;
        Ok((record, created))
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn shorten(&self, params: ShortenParams) -> Result<Shortened> {
        let original_url = Self::validate_url(&params.original_url)?;
        let requested = self.requested_alias(params.custom_alias.as_deref())?;

        let (record, created) = match self
            .allocate_and_persist(&original_url, requested.as_ref())
            .await
        {
            Err(ShortenerError::Storage(StorageError::Conflict(value))) => {
                warn!(
                    original_url = %original_url,
                    conflict = %value,
                    "lost uniqueness race, retrying allocation"
                );
                match self
                    .allocate_and_persist(&original_url, requested.as_ref())
                    .await
                {
                    Err(ShortenerError::Storage(StorageError::Conflict(value))) => {
                        return Err(ShortenerError::AliasTaken(value));
                    }
                    other => other?,
                }
            }
            other => other?,
        };

        let short_url = record.alias.to_url(&self.base_url);
        info!(
            alias = %record.alias,
            original_url = %record.original_url,
            created,
            "shortened url"
        );

        self.notifier.notify(Notification {
            event: EventKind::Shortened,
            client_ip: params.client_ip,
            short_url: short_url.clone(),
            original_url: record.original_url.clone(),
        });

        Ok(Shortened {
            code: record.alias,
            short_url,
            original_url: record.original_url,
            created,
        })
    }

    async fn resolve(&self, params: ResolveParams) -> Result<UrlRecord> {
        // A malformed alias can never have been stored.
        let Ok(alias) = ShortCode::new(&params.alias) else {
            debug!(alias = %params.alias, "malformed alias");
            return Err(ShortenerError::NotFound(params.alias));
        };

        let Some(record) = self.repository.find_by_alias(&alias).await? else {
            debug!(alias = %alias, "alias not found");
            return Err(ShortenerError::NotFound(params.alias));
        };

        debug!(alias = %alias, url = %record.original_url, "resolved alias");
        self.notifier.notify(Notification {
            event: EventKind::Redirected,
            client_ip: params.client_ip,
            short_url: alias.to_url(&self.base_url),
            original_url: record.original_url.clone(),
        });

        Ok(record)
    }
}
