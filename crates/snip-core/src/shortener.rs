use crate::error::Result;
use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenParams {
    /// The original URL to be shortened.
    pub original_url: String,
    /// Optional alias requested by the caller. Blank values count as absent.
    pub custom_alias: Option<String>,
    /// Address of the caller, forwarded to notifications.
    pub client_ip: Option<IpAddr>,
}

impl ShortenParams {
    pub fn new(original_url: impl Into<String>) -> Self {
        Self {
            original_url: original_url.into(),
            custom_alias: None,
            client_ip: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn with_client_ip(mut self, client_ip: Option<IpAddr>) -> Self {
        self.client_ip = client_ip;
        self
    }
}

/// Parameters for resolving an alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveParams {
    pub alias: String,
    pub client_ip: Option<IpAddr>,
}

impl ResolveParams {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            client_ip: None,
        }
    }

    pub fn with_client_ip(mut self, client_ip: Option<IpAddr>) -> Self {
        self.client_ip = client_ip;
        self
    }
}

/// Outcome of a successful shorten operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortened {
    /// The final alias.
    pub code: ShortCode,
    /// The alias joined onto the public base URL.
    pub short_url: String,
    pub original_url: String,
    /// `true` if a new record was created, `false` if an existing record
    /// for the same original URL had its alias replaced.
    pub created: bool,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a URL and returns the final alias.
    async fn shorten(&self, params: ShortenParams) -> Result<Shortened>;

    /// Resolves an alias to its stored record.
    /// Returns `Err(NotFound)` if no live record owns the alias.
    async fn resolve(&self, params: ResolveParams) -> Result<UrlRecord>;
}
