use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint rejected notification with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
