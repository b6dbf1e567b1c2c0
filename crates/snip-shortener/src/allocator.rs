use snip_core::error::Result;
use snip_core::{ReadRepository, RecordId, ShortCode, ShortenerError, UrlRecord};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default ceiling on generated candidates per allocation.
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// What the caller must do to persist an [`Allocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationAction {
    /// No live record maps the original URL yet.
    Create,
    /// Replace the alias of the existing record for the original URL.
    Update { id: RecordId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub alias: ShortCode,
    pub action: AllocationAction,
}

/// Decides the final alias for an original URL.
///
/// Generated aliases start from the digest of the URL. While a candidate
/// is taken, the next candidate is the digest of the previous candidate,
/// so the sequence of candidates for a URL is fully deterministic.
pub struct Allocator<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    max_attempts: usize,
}

impl<R, G> Clone for Allocator<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            max_attempts: self.max_attempts,
        }
    }
}

impl<R: ReadRepository, G: Generator> Allocator<R, G> {
    pub fn new(repository: Arc<R>, generator: Arc<G>) -> Self {
        Self {
            repository,
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the candidate ceiling. Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Picks the alias for `original_url` and whether to create or update.
    ///
    /// A requested alias is used as-is unless a different record owns it,
    /// in which case this fails with [`ShortenerError::AliasTaken`]. The
    /// record already owning the requested alias may keep it.
    pub async fn allocate(
        &self,
        original_url: &str,
        requested: Option<&ShortCode>,
    ) -> Result<Allocation> {
        let existing = self.repository.find_by_original_url(original_url).await?;

        let alias = match requested {
            Some(alias) => self.claim(alias, existing.as_ref()).await?,
            None => self.next_free(original_url).await?,
        };

        let action = match existing {
            Some(record) => AllocationAction::Update { id: record.id },
            None => AllocationAction::Create,
        };

        debug!(alias = %alias, ?action, "allocated alias");
        Ok(Allocation { alias, action })
    }

    async fn claim(&self, alias: &ShortCode, existing: Option<&UrlRecord>) -> Result<ShortCode> {
        if existing.is_some_and(|record| record.alias == *alias) {
            trace!(alias = %alias, "requested alias already owned by this url");
            return Ok(alias.clone());
        }

        if self.repository.exists_by_alias(alias).await? {
            return Err(ShortenerError::AliasTaken(alias.to_string()));
        }

        Ok(alias.clone())
    }

    /// Walks the re-hash chain seeded by `seed` until a free candidate
    /// turns up. Each candidate costs exactly one generate call.
    pub async fn next_free(&self, seed: &str) -> Result<ShortCode> {
        let mut candidate: ShortCode = self.generator.generate(seed).into();
        let mut attempts = 1;

        loop {
            if !self.repository.exists_by_alias(&candidate).await? {
                return Ok(candidate);
            }

            if attempts >= self.max_attempts {
                return Err(ShortenerError::AllocationExhausted(attempts));
            }

            trace!(candidate = %candidate, attempts, "alias collision, re-hashing");
            candidate = self.generator.generate(candidate.as_str()).into();
            attempts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::Timestamp;
    use snip_core::error::StorageResult;
    use snip_core::StorageError;
    use snip_generator::DigestGenerator;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts generate calls on top of the digest generator.
    #[derive(Default)]
    struct CountingGenerator {
        inner: DigestGenerator,
        calls: AtomicUsize,
    }

    impl CountingGenerator {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Generator for CountingGenerator {
        type Output = ShortCode;

        fn generate(&self, input: &str) -> ShortCode {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate(input)
        }
    }

    /// A read repository with a fixed set of taken aliases and at most
    /// one record.
    #[derive(Default)]
    struct ScriptedRepository {
        taken: HashSet<ShortCode>,
        record: Option<UrlRecord>,
        always_taken: bool,
        fail: bool,
    }

    #[async_trait]
    impl ReadRepository for ScriptedRepository {
        async fn find_by_alias(&self, alias: &ShortCode) -> StorageResult<Option<UrlRecord>> {
            Ok(self.record.clone().filter(|r| r.alias == *alias))
        }

        async fn find_by_original_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
            if self.fail {
                return Err(StorageError::Unavailable("connection refused".into()));
            }
            Ok(self.record.clone().filter(|r| r.original_url == url))
        }

        async fn exists_by_alias(&self, alias: &ShortCode) -> StorageResult<bool> {
            Ok(self.always_taken || self.taken.contains(alias))
        }
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(id: i64, url: &str, alias: &str) -> UrlRecord {
        let now = Timestamp::now();
        UrlRecord {
            id: RecordId(id),
            original_url: url.to_string(),
            alias: code(alias),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn chain(seed: &str, len: usize) -> Vec<ShortCode> {
        let generator = DigestGenerator::new();
        let mut codes = vec![generator.generate(seed)];
        while codes.len() < len {
            let next = generator.generate(codes[codes.len() - 1].as_str());
            codes.push(next);
        }
        codes
    }

    type TestAllocator = Allocator<ScriptedRepository, CountingGenerator>;

    fn allocator(repo: ScriptedRepository) -> (TestAllocator, Arc<CountingGenerator>) {
        let generator = Arc::new(CountingGenerator::default());
        let allocator = Allocator::new(Arc::new(repo), Arc::clone(&generator));
        (allocator, generator)
    }

    #[tokio::test]
    async fn free_seed_takes_one_generate_call() {
        let (allocator, generator) = allocator(ScriptedRepository::default());

        let allocation = allocator.allocate("https://example.com", None).await.unwrap();

        assert_eq!(allocation.alias.as_str(), "EAaArVRs");
        assert_eq!(allocation.action, AllocationAction::Create);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn collision_chain_is_deterministic() {
        for k in [1usize, 2, 5, 17] {
            let codes = chain("https://example.com", k + 1);
            let repo = ScriptedRepository {
                taken: codes[..k].iter().cloned().collect(),
                ..Default::default()
            };
            let (allocator, generator) = allocator(repo);

            let allocation = allocator.allocate("https://example.com", None).await.unwrap();

            assert_eq!(allocation.alias, codes[k], "k = {k}");
            assert_eq!(generator.calls(), k + 1, "k = {k}");
        }
    }

    #[tokio::test]
    async fn rehash_uses_previous_candidate() {
        let repo = ScriptedRepository {
            taken: [code("EAaArVRs"), code("GOxlYKNw")].into_iter().collect(),
            ..Default::default()
        };
        let (allocator, _) = allocator(repo);

        let allocation = allocator.allocate("https://example.com", None).await.unwrap();

        assert_eq!(allocation.alias.as_str(), "SZHFnCSt");
    }

    #[tokio::test]
    async fn exhaustion_is_bounded() {
        let repo = ScriptedRepository {
            always_taken: true,
            ..Default::default()
        };
        let (allocator, generator) = allocator(repo);
        let allocator = allocator.with_max_attempts(5);

        let err = allocator
            .allocate("https://example.com", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::AllocationExhausted(5)));
        assert_eq!(generator.calls(), 5);
    }

    #[tokio::test]
    async fn default_ceiling_applies() {
        let repo = ScriptedRepository {
            always_taken: true,
            ..Default::default()
        };
        let (allocator, generator) = allocator(repo);

        let err = allocator
            .allocate("https://example.com", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShortenerError::AllocationExhausted(DEFAULT_MAX_ATTEMPTS)
        ));
        assert_eq!(generator.calls(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn zero_ceiling_still_tries_once() {
        let (allocator, generator) = allocator(ScriptedRepository::default());
        let allocator = allocator.with_max_attempts(0);

        assert_eq!(allocator.max_attempts(), 1);
        allocator.allocate("https://example.com", None).await.unwrap();
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn requested_alias_is_used_without_generating() {
        let (allocator, generator) = allocator(ScriptedRepository::default());

        let allocation = allocator
            .allocate("https://example.com", Some(&code("my-alias")))
            .await
            .unwrap();

        assert_eq!(allocation.alias, code("my-alias"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn requested_alias_taken_by_another_url() {
        let repo = ScriptedRepository {
            taken: [code("abc")].into_iter().collect(),
            record: Some(record(1, "https://owner.example", "abc")),
            ..Default::default()
        };
        let (allocator, _) = allocator(repo);

        let err = allocator
            .allocate("https://other.example", Some(&code("abc")))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::AliasTaken(alias) if alias == "abc"));
    }

    #[tokio::test]
    async fn requested_alias_owned_by_same_record_is_reused() {
        let repo = ScriptedRepository {
            taken: [code("abc")].into_iter().collect(),
            record: Some(record(7, "https://example.com", "abc")),
            ..Default::default()
        };
        let (allocator, _) = allocator(repo);

        let allocation = allocator
            .allocate("https://example.com", Some(&code("abc")))
            .await
            .unwrap();

        assert_eq!(allocation.alias, code("abc"));
        assert_eq!(
            allocation.action,
            AllocationAction::Update { id: RecordId(7) }
        );
    }

    #[tokio::test]
    async fn existing_url_without_alias_is_rehashed_and_updated() {
        let repo = ScriptedRepository {
            taken: [code("EAaArVRs")].into_iter().collect(),
            record: Some(record(3, "https://example.com", "EAaArVRs")),
            ..Default::default()
        };
        let (allocator, _) = allocator(repo);

        let allocation = allocator.allocate("https://example.com", None).await.unwrap();

        assert_eq!(allocation.alias.as_str(), "GOxlYKNw");
        assert_eq!(
            allocation.action,
            AllocationAction::Update { id: RecordId(3) }
        );
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let repo = ScriptedRepository {
            fail: true,
            ..Default::default()
        };
        let (allocator, generator) = allocator(repo);

        let err = allocator
            .allocate("https://example.com", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShortenerError::Storage(StorageError::Unavailable(_))
        ));
        assert_eq!(generator.calls(), 0);
    }
}
