use tracing_subscriber::EnvFilter;

/// Default filter directive for a deployment environment hint.
pub fn default_directive(environment: &str) -> &'static str {
    if environment.eq_ignore_ascii_case("production") {
        "info"
    } else {
        "debug"
    }
}

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over the
/// environment hint.
pub fn init_tracing(environment: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(environment)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
