//! Shared setup for the tatame binaries.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `bin` is the binary's crate name as used in
/// tracing targets (e.g. `tatame_translate`).
pub fn init_logging(bin: &str, debug: bool) -> Result<()> {
    let (ours, rest) = if debug { ("trace", "info") } else { ("info", "warn") };
    let filter = EnvFilter::default()
        .add_directive(format!("{bin}={ours}").parse()?)
        .add_directive(format!("tatame_core={ours}").parse()?)
        .add_directive(rest.parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
