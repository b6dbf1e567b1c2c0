use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct EncodeRequest {
    pub url: String,
    /// Requested alias. Missing or blank means one is generated.
    pub alias: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    #[serde(rename = "shortURL")]
    pub short_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
