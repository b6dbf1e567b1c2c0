//! URL shortener service implementation.
//!
//! This crate provides the alias allocator and the shortener service built
//! on top of it. Core types are re-exported from `snip_core`.

pub mod allocator;
pub mod service;

pub use allocator::{Allocation, AllocationAction, Allocator, DEFAULT_MAX_ATTEMPTS};
pub use service::{ShortenerService, ShortenerSettings};
pub use snip_core::{ResolveParams, ShortenParams, Shortened, Shortener, ShortenerError};
