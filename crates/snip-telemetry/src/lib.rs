//! Process-wide tracing setup shared by the snip binaries.

pub mod error;

pub use error::{Result, TelemetryError};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::fmt::{Display, Formatter};
use tracing_log::LogTracer;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};
use typed_builder::TypedBuilder;

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct TelemetryConfig {
    #[builder(setter(into))]
    pub service_name: String,
    #[builder(default)]
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"), setter(into))]
    pub default_directive: String,
    /// OTLP gRPC collector endpoint. Span export is off when unset.
    #[builder(default)]
    pub otlp_endpoint: Option<String>,
}

/// Flushes and shuts down span export when dropped.
///
/// Keep it alive for the lifetime of the process.
#[must_use]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn exports_spans(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {e}");
            }
        }
    }
}

/// Builds the env filter, honouring `RUST_LOG` first.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_directive)?),
    }
}

fn fmt_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
    }
}

fn tracer_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Must be called once, from within a tokio runtime when OTLP export is
/// enabled.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = env_filter(&config.default_directive)?;
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(config.log_format)];

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let provider = tracer_provider(&config.service_name, endpoint)?;
            let tracer = provider.tracer(config.service_name.clone());
            layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
            Some(provider)
        }
        None => None,
    };

    LogTracer::init()?;
    tracing::subscriber::set_global_default(Registry::default().with(filter).with(layers))?;

    tracing::info!(
        service = %config.service_name,
        log_format = %config.log_format,
        otlp = provider.is_some(),
        "telemetry initialized"
    );

    Ok(TelemetryGuard { provider })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TelemetryConfig::builder().service_name("snip").build();

        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_directive, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn otlp_endpoint_passes_through_builder() {
        let endpoint = Some("http://localhost:4317".to_string());
        let config = TelemetryConfig::builder()
            .service_name("snip")
            .otlp_endpoint(endpoint.clone())
            .build();

        assert_eq!(config.otlp_endpoint, endpoint);
    }

    #[test]
    fn invalid_directive_is_rejected() {
        // RUST_LOG takes precedence, so only check when it is absent.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(
                env_filter("snip=notalevel"),
                Err(TelemetryError::Filter(_))
            ));
        }
    }

    #[tokio::test]
    async fn init_without_otlp() {
        let config = TelemetryConfig::builder()
            .service_name("snip-test")
            .log_format(LogFormat::Json)
            .build();

        let guard = init(&config).unwrap();
        assert!(!guard.exports_spans());
    }
}
