pub mod cancel;
pub mod render;
pub mod show;
pub mod watch;

use anyhow::{Context, Result};
use swarmwatch::{Config, RemoteSource};

/// Build the HTTP source from the resolved config.
pub fn remote_source(config: &Config) -> Result<RemoteSource> {
    RemoteSource::new(config.remote.source_config()).with_context(|| {
        format!(
            "Failed to create HTTP client for {}",
            config.remote.base_url
        )
    })
}

/// Context id for commands that cannot work without one.
pub fn require_context(config: &Config) -> Result<&str> {
    config.remote.context_id.as_deref().context(
        "No context id set. Pass --context, set SWARMWATCH_CONTEXT, or add context_id under [remote]",
    )
}
