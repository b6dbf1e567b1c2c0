pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use snip_core::error::{StorageError, StorageResult};
pub use snip_core::repository::{ReadRepository, RecordId, Repository, UrlRecord};
