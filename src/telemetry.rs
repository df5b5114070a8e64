//! Tracing initialization for binaries and examples embedding the engine.
//!
//! Libraries embedding copydesk install their own subscriber; call
//! [`init_tracing`] only from application entry points.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// warnings plus engine-level info. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,copydesk=info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Pretty panic reports through miette.
pub fn init_panic_reports() {
    miette::set_panic_hook();
}
