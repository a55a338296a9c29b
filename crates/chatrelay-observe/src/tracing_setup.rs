//! Logging setup for the `chatrelay` binary.
//!
//! Log lines go to stderr so a reply streamed to stdout stays clean. With
//! `--otel`, spans are also exported as OpenTelemetry traces on stdout.
//!
//! ```no_run
//! let filter = chatrelay_observe::tracing_setup::filter_for_verbosity(0, false);
//! chatrelay_observe::tracing_setup::init_tracing(filter, false).unwrap();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OTEL_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Default filter for a `-v` count. `quiet` only matters at zero.
pub fn filter_for_verbosity(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,chatrelay_core=debug,chatrelay_infra=debug",
        _ => "trace",
    }
}

/// `RUST_LOG` when set and valid, otherwise `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// Span close events are logged, so every `chat_turn` span reports its
/// duration. Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str, enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("chatrelay");
        opentelemetry::global::set_tracer_provider(provider.clone());
        let _ = OTEL_PROVIDER.set(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush spans still buffered by the OTel exporter. Does nothing without `--otel`.
pub fn shutdown_tracing() {
    let Some(provider) = OTEL_PROVIDER.get() else {
        return;
    };
    if let Err(e) = provider.shutdown() {
        eprintln!("Warning: failed to flush traces: {e}");
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_shutdown_without_otel_does_nothing() {
        shutdown_tracing();
        assert!(OTEL_PROVIDER.get().is_none());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(filter_for_verbosity(0, true), "error");
        assert_eq!(filter_for_verbosity(0, false), "warn");
        assert!(filter_for_verbosity(1, true).starts_with("info"));
        assert_eq!(filter_for_verbosity(4, false), "trace");
    }

    #[test]
    fn test_default_filter_is_used_without_rust_log() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = env_filter(filter_for_verbosity(1, false));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
