//! Log output and optional OTLP span export.
//!
//! Logs always go to stderr through the fmt layer. Spans are additionally
//! exported over OTLP/gRPC when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider,
};
use std::{env::var, time::Duration};
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const ENV_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const ENV_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const ENV_INSTANCE_ID: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

/// Exporter settings read from the standard `OTEL_*` variables.
#[derive(Debug)]
struct OtlpSettings {
    endpoint: String,
    metadata: MetadataMap,
    instance_id: String,
}

impl OtlpSettings {
    /// `None` when no endpoint is configured.
    fn from_env() -> Result<Option<Self>> {
        let Some(endpoint) = var(ENV_ENDPOINT).ok().and_then(|raw| endpoint_with_scheme(&raw))
        else {
            return Ok(None);
        };

        let metadata = match var(ENV_HEADERS) {
            Ok(raw) => otlp_metadata(&raw).with_context(|| format!("invalid {ENV_HEADERS}"))?,
            Err(_) => MetadataMap::new(),
        };

        Ok(Some(Self {
            endpoint,
            metadata,
            instance_id: var(ENV_INSTANCE_ID).unwrap_or_else(|_| Ulid::new().to_string()),
        }))
    }

    fn tracer_provider(self) -> Result<SdkTracerProvider> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_timeout(EXPORT_TIMEOUT)
            .with_metadata(self.metadata)
            .build()
            .context("failed to build OTLP span exporter")?;

        let resource = Resource::builder_empty()
            .with_attributes([
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id),
            ])
            .build();

        Ok(SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build())
    }
}

/// Blank means unset; a bare `host:port` gets the plaintext gRPC scheme.
fn endpoint_with_scheme(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else if trimmed.contains("://") {
        Some(trimmed.to_string())
    } else {
        Some(format!("http://{trimmed}"))
    }
}

/// Parse `key=value,key2=value2` into gRPC metadata. Entries without `=` are skipped.
fn otlp_metadata(raw: &str) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();
    for (key, value) in raw.split(',').filter_map(|pair| pair.split_once('=')) {
        let key = key.trim().to_ascii_lowercase();
        let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
            .map_err(|e| anyhow!("invalid metadata key {key:?}: {e}"))?;
        let value: MetadataValue<Ascii> = value
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid metadata value for {key:?}: {e}"))?;
        metadata.insert(name, value);
    }
    Ok(metadata)
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?))
}

/// Install the global subscriber. `None` logs errors only.
///
/// # Errors
///
/// Returns an error if the OTLP settings are invalid or a subscriber is already installed
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let provider = match OtlpSettings::from_env()? {
        Some(settings) => {
            let provider = settings.tracer_provider()?;
            let _ = TRACER_PROVIDER.set(provider.clone());
            global::set_tracer_provider(provider.clone());
            global::set_text_map_propagator(TraceContextPropagator::new());
            Some(provider)
        }
        None => None,
    };

    let otel_layer = provider.map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(env!("CARGO_PKG_NAME")))
    });

    let subscriber = Registry::default()
        .with(env_filter(verbosity_level.unwrap_or(Level::ERROR))?)
        .with(fmt::layer().with_target(false).pretty())
        .with(otel_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Flush pending spans. Does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        debug!("flushing OTLP spans");
        if let Err(err) = provider.shutdown() {
            eprintln!("failed to shut down tracer provider: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_gets_default_scheme() {
        assert_eq!(
            endpoint_with_scheme("collector:4317/").as_deref(),
            Some("http://collector:4317")
        );
        assert_eq!(
            endpoint_with_scheme(" https://otel.example.com:4317 ").as_deref(),
            Some("https://otel.example.com:4317")
        );
        assert_eq!(endpoint_with_scheme("   "), None);
    }

    #[test]
    fn metadata_skips_entries_without_value() -> Result<()> {
        let metadata = otlp_metadata("Authorization=Bearer abc, broken ,x-tenant = passreset")?;
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer abc")
        );
        assert_eq!(
            metadata.get("x-tenant").and_then(|v| v.to_str().ok()),
            Some("passreset")
        );
        Ok(())
    }

    #[test]
    fn metadata_rejects_invalid_key() {
        assert!(otlp_metadata("bad key=value").is_err());
    }

    #[test]
    fn settings_absent_without_endpoint() {
        temp_env::with_vars_unset([ENV_ENDPOINT], || {
            assert!(matches!(OtlpSettings::from_env(), Ok(None)));
        });
        temp_env::with_var(ENV_ENDPOINT, Some(""), || {
            assert!(matches!(OtlpSettings::from_env(), Ok(None)));
        });
    }

    #[test]
    fn settings_read_from_env() {
        temp_env::with_vars(
            [
                (ENV_ENDPOINT, Some("collector:4317")),
                (ENV_HEADERS, Some("api-key=secret")),
                (ENV_INSTANCE_ID, Some("node-1")),
            ],
            || {
                let settings = OtlpSettings::from_env();
                assert!(matches!(settings, Ok(Some(_))));
                if let Ok(Some(settings)) = settings {
                    assert_eq!(settings.endpoint, "http://collector:4317");
                    assert_eq!(settings.instance_id, "node-1");
                    assert!(settings.metadata.contains_key("api-key"));
                }
            },
        );
    }

    #[test]
    fn settings_fail_on_bad_headers() {
        temp_env::with_vars(
            [
                (ENV_ENDPOINT, Some("collector:4317")),
                (ENV_HEADERS, Some("bad key=value")),
            ],
            || {
                assert!(OtlpSettings::from_env().is_err());
            },
        );
    }

    #[test]
    fn env_filter_builds_for_every_level() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(env_filter(level).is_ok());
        }
    }

    #[test]
    fn shutdown_without_export_is_a_noop() {
        shutdown_tracer();
    }
}
