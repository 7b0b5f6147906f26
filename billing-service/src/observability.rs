use tracing_subscriber::{
    filter::{Directive, LevelFilter},
    EnvFilter,
};

/// Install the global fmt subscriber. `RUST_LOG` directives are honoured; the
/// service's own target defaults to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(default_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn default_directive() -> Directive {
    "billing_service=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into())
}
