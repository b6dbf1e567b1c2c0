//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the types shared by the alias generator, the
//! shortener service, the storage backends and the HTTP gateway.

pub mod error;
pub mod notify;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use error::{ShortenerError, StorageError};
pub use notify::{EventKind, NoopNotifier, Notification, Notifier};
pub use repository::{ReadRepository, RecordId, Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use shortener::{ResolveParams, ShortenParams, Shortened, Shortener};
