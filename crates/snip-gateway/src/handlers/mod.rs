mod health;
mod url;

pub use health::health_handler;
pub use url::{encode_handler, redirect_handler};
