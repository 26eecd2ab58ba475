//! Logging setup for the server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at the default level.
const CRATES: [&str; 5] = [
    "scribble",
    "scribble_transport",
    "scribble_protocol",
    "scribble_countdown",
    "scribble_room",
];

/// Default filter directive: `default_level` for every Scribble crate,
/// the global default for everything else.
pub fn default_filter(binary_name: &str, default_level: &str) -> String {
    CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={default_level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter built by [`default_filter`].
/// Panics if a global subscriber is already set.
pub fn init_tracing(binary_name: &str, default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
