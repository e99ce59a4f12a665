//! Tracing setup.
//!
//! - LOG_LEVEL is an EnvFilter directive string. Without it the default is
//!   "info,generation=debug,parsey_backend=debug,tower_http=info,axum=info".
//! - LOG_FORMAT=json switches to structured JSON lines; anything else is the
//!   human-readable formatter.
//!
//! Pipeline events log under the `generation` target, server plumbing under
//! `parsey_backend`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,generation=debug,parsey_backend=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // The two formatters are different types, so init inside each arm.
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
