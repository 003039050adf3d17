use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use std::time::Duration;

/// Installs a global OTLP meter provider on creation and flushes it when
/// dropped.
///
/// Only metrics are exported. Instruments created through
/// `opentelemetry::global::meter` before the guard exists stay no-ops, so
/// hosts should create it before building any instrumented component.
///
/// # Example
/// ```ignore
/// let _metrics = MetricsGuard::init("preview", "http://localhost:4317", Duration::from_secs(10))?;
/// ```
pub struct MetricsGuard {
    provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// # Arguments
    /// * `service_name` - Reported as `service.name`
    /// * `endpoint` - OTLP gRPC collector endpoint (e.g., "http://localhost:4317")
    /// * `export_interval` - How often accumulated metrics are pushed
    pub fn init(
        service_name: &str,
        endpoint: &str,
        export_interval: Duration,
    ) -> anyhow::Result<Self> {
        let exporter = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()?;

        let provider = SdkMeterProvider::builder()
            .with_resource(service_resource(service_name))
            .with_reader(
                PeriodicReader::builder(exporter)
                    .with_interval(export_interval)
                    .build(),
            )
            .build();

        global::set_meter_provider(provider.clone());
        tracing::info!(endpoint, service_name, ?export_interval, "OTLP metrics export enabled");

        Ok(Self { provider })
    }

    /// Push whatever has accumulated without waiting for the next interval.
    pub fn flush(&self) {
        if let Err(e) = self.provider.force_flush() {
            tracing::warn!(error = %e, "Metrics flush failed");
        }
    }
}

impl Drop for MetricsGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shutdown meter provider: {:?}", e);
        }
    }
}

fn service_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

/// Creates an info-level span with optional fields and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal $(, $($fields:tt)+)?) => {
        tracing::info_span!($name $(, $($fields)+)?).entered()
    };
}

/// Creates a debug-level span with optional fields and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal $(, $($fields:tt)+)?) => {
        tracing::debug_span!($name $(, $($fields)+)?).entered()
    };
}
