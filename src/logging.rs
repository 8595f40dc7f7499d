use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the stderr subscriber. Stdout stays free for encoded bundles.
pub fn init() -> anyhow::Result<()> {
    let filter = filter(std::env::var("RUST_LOG").ok().as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn filter(directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("parse log filter: {directives}")),
        None => EnvFilter::try_new(DEFAULT_DIRECTIVE).context("build default log filter"),
    }
}
