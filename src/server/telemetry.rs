use crate::config::{Config, LogFormat};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const DEFAULT_FILTER: &str = "konnekt_match=debug,tower_http=debug,axum::rejection=trace,axum=trace,warn";

pub fn init_telemetry(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .json()
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true)
            .boxed(),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    install(Registry::default().with(fmt_layer).with(env_filter), config)
}

#[cfg(feature = "telemetry")]
fn install<S>(subscriber: S, config: &Config) -> Result<(), Box<dyn std::error::Error>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    if !config.enable_telemetry {
        subscriber.try_init()?;
        tracing::info!("Telemetry disabled");
        return Ok(());
    }

    let tracer = jaeger::tracer(&config.jaeger_endpoint)?;
    subscriber
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;
    tracing::info!(endpoint = %config.jaeger_endpoint, "Exporting spans to Jaeger");
    Ok(())
}

#[cfg(not(feature = "telemetry"))]
fn install<S>(subscriber: S, config: &Config) -> Result<(), Box<dyn std::error::Error>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    subscriber.try_init()?;
    if config.enable_telemetry {
        tracing::warn!("ENABLE_TELEMETRY is set but the telemetry feature is not compiled in");
    } else {
        tracing::info!("Telemetry disabled");
    }
    Ok(())
}

#[cfg(feature = "telemetry")]
pub fn shutdown_telemetry(config: &Config) {
    if config.enable_telemetry {
        // Flush pending spans.
        opentelemetry::global::shutdown_tracer_provider();
    }
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_telemetry(_config: &Config) {}

#[cfg(feature = "telemetry")]
mod jaeger {
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::trace::{self, RandomIdGenerator, Sampler, Tracer};
    use opentelemetry::sdk::Resource;
    use opentelemetry::trace::TraceError;
    use opentelemetry::{global, KeyValue};
    use std::time::Duration;

    const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
    const EXPORT_TIMEOUT: Duration = Duration::from_secs(2);

    fn trace_config() -> trace::Config {
        trace::config()
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_max_events_per_span(64)
            .with_max_attributes_per_span(16)
            .with_resource(Resource::new(vec![
                KeyValue::new("service.name", SERVICE_NAME),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]))
    }

    /// Batch exporter to the collector at `endpoint`, installed as the global provider.
    pub fn tracer(endpoint: &str) -> Result<Tracer, TraceError> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        opentelemetry_jaeger::new_collector_pipeline()
            .with_service_name(SERVICE_NAME)
            .with_endpoint(endpoint)
            .with_isahc()
            .with_trace_config(trace_config())
            .with_timeout(EXPORT_TIMEOUT)
            .install_batch(opentelemetry::runtime::Tokio)
    }
}
