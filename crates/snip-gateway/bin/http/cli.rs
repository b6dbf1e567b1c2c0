use clap::{Parser, ValueEnum};
use snip_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const POSTGRES_DSN_ENV: &str = "SNIP_POSTGRES_DSN";
pub const POSTGRES_MAX_CONNECTIONS_ENV: &str = "SNIP_POSTGRES_MAX_CONNECTIONS";
pub const MAX_ATTEMPTS_ENV: &str = "SNIP_MAX_ATTEMPTS";
pub const GOOGLE_CHAT_WEBHOOK_ENV: &str = "SNIP_GOOGLE_CHAT_WEBHOOK";
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "SNIP_TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "SNIP_TELEGRAM_CHAT_ID";
pub const NOTIFY_QUEUE_CAPACITY_ENV: &str = "SNIP_NOTIFY_QUEUE_CAPACITY";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "SNIP_OTLP_ENDPOINT";
pub const SERVICE_NAME_ENV: &str = "SNIP_SERVICE_NAME";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_SERVICE_NAME: &str = "snip-gateway";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway", about = "HTTP front end of the snip URL shortener")]
pub struct Cli {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public base URL short aliases are appended to.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = POSTGRES_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub postgres_dsn: Option<String>,

    #[arg(
        long,
        env = POSTGRES_MAX_CONNECTIONS_ENV,
        default_value_t = DEFAULT_POSTGRES_MAX_CONNECTIONS
    )]
    pub postgres_max_connections: u32,

    /// Ceiling on generated alias candidates per request.
    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = snip_shortener::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,

    #[arg(long, env = GOOGLE_CHAT_WEBHOOK_ENV)]
    pub google_chat_webhook: Option<String>,

    #[arg(
        long,
        env = TELEGRAM_BOT_TOKEN_ENV,
        requires = "telegram_chat_id",
        hide_env_values = true
    )]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = TELEGRAM_CHAT_ID_ENV, requires = "telegram_bot_token")]
    pub telegram_chat_id: Option<String>,

    #[arg(
        long,
        env = NOTIFY_QUEUE_CAPACITY_ENV,
        default_value_t = snip_notifier::DEFAULT_QUEUE_CAPACITY
    )]
    pub notify_queue_capacity: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// OTLP gRPC collector, e.g. `http://localhost:4317`.
    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = SERVICE_NAME_ENV, default_value = DEFAULT_SERVICE_NAME)]
    pub service_name: String,
}
