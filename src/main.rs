//! mediacheck — read-integrity diagnostic for removable storage.
//!
//! Thin binary entry point. All logic lives in the `mediacheck-core`
//! and `mediacheck-cli` crates.

fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Progress output goes to stderr too, so
    // tracing is kept at WARN unless RUST_LOG says otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    mediacheck_cli::run()
}
