use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,forum_auth_chat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Shortened form of a bearer token, safe to put in log lines.
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}…", prefix)
}
