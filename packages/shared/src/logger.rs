//! Logging bootstrap shared by every binary in the workspace.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the binary's own target logs at
/// `default_level` and HTTP tracing from `tower_http` logs at `info`.
/// Calling this twice is harmless; the second call is ignored.
pub fn setup_logger(app_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(app_name, default_level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();

    if installed.is_ok() {
        tracing::debug!("logger initialized for '{}'", app_name);
    }
}

fn default_directives(app_name: &str, default_level: &str) -> String {
    let crate_target = app_name.replace('-', "_");
    format!("{crate_target}={default_level},tower_http=info")
}
