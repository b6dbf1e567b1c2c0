use snip_core::ShortCode;
use snip_storage::{PostgresRepository, ReadRepository, Repository, StorageError};
use snip_test_infra::postgres::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("connect postgres");

        let repo = PostgresRepository::new(pool);
        repo.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn create_and_find_live_record() {
    let fixture = Fixture::start().await;

    let created = fixture
        .repo
        .create("https://example.com", &code("abc123"))
        .await
        .unwrap();

    let by_alias = fixture
        .repo
        .find_by_alias(&code("abc123"))
        .await
        .unwrap()
        .unwrap();
    let by_url = fixture
        .repo
        .find_by_original_url("https://example.com")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(by_alias.id, created.id);
    assert_eq!(by_url.id, created.id);
    assert_eq!(by_alias.original_url, "https://example.com");
    assert!(by_alias.deleted_at.is_none());
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn ensure_schema_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture.repo.ensure_schema().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn create_conflicts_when_alias_already_exists() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .create("https://one.example", &code("abc123"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .create("https://two.example", &code("abc123"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(value) if value == "abc123"));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn create_conflicts_when_url_already_live() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .create("https://example.com", &code("first"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .create("https://example.com", &code("second"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(value) if value == "https://example.com"));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn update_alias_replaces_alias_and_keeps_url() {
    let fixture = Fixture::start().await;

    let created = fixture
        .repo
        .create("https://example.com", &code("old-alias"))
        .await
        .unwrap();
    let updated = fixture
        .repo
        .update_alias(created.id, &code("new-alias"))
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.original_url, "https://example.com");
    assert!(fixture
        .repo
        .find_by_alias(&code("old-alias"))
        .await
        .unwrap()
        .is_none());
    assert!(!fixture.repo.exists_by_alias(&code("old-alias")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn update_alias_conflicts_with_other_record() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .create("https://one.example", &code("taken"))
        .await
        .unwrap();
    let other = fixture
        .repo
        .create("https://two.example", &code("mine"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .update_alias(other.id, &code("taken"))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn delete_marks_record_as_soft_deleted() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .create("https://example.com", &code("to-delete"))
        .await
        .unwrap();

    assert!(fixture.repo.delete(&code("to-delete")).await.unwrap());
    assert!(fixture
        .repo
        .find_by_alias(&code("to-delete"))
        .await
        .unwrap()
        .is_none());
    assert!(!fixture.repo.delete(&code("to-delete")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn deleted_alias_stays_reserved_but_url_is_free() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .create("https://example.com", &code("history"))
        .await
        .unwrap();
    fixture.repo.delete(&code("history")).await.unwrap();

    assert!(fixture.repo.exists_by_alias(&code("history")).await.unwrap());
    fixture
        .repo
        .create("https://example.com", &code("fresh"))
        .await
        .unwrap();
}
