//! Publish the task monitor panel
//!
//! Mounts a task monitor over the HTTP source and writes the rendered
//! container to a file or stdout once per poll period until Ctrl-C.
//!
//! Usage:
//!   swarmwatch watch --context ctx-1                  # stream to stdout
//!   swarmwatch watch --context ctx-1 -o panel.html    # rewrite a file
//!   swarmwatch watch --context ctx-1 --once           # one refresh, then exit

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use swarmwatch::{Config, Document, MIN_REFRESH_INTERVAL, PanelKind, StatusPanel};

const KIND: PanelKind = PanelKind::TaskMonitor;

pub async fn run(config: &Config, output: Option<&Path>, once: bool) -> Result<()> {
    let source = super::remote_source(config)?;
    debug!("Polling {} for background tasks", source.base_url());
    if config.remote.context_id.is_none() {
        warn!("No context id set, the task list will stay empty");
    }

    let document = Document::with_default_panels();
    let panel = StatusPanel::new(KIND, document.clone(), Arc::new(source), config.panel.clone());
    panel.init(None, config.remote.context_id.as_deref()).await;
    if !panel.is_mounted() {
        bail!("Task monitor panel failed to mount");
    }

    if once {
        let result = publish(&document, output);
        panel.destroy();
        return result;
    }

    let period = config.panel.refresh_interval().max(MIN_REFRESH_INTERVAL);
    let mut ticker = tokio::time::interval(period);
    debug!("Publishing every {:?}", period);
    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = publish(&document, output) {
                    break Err(e);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                break signal.context("Failed to listen for Ctrl-C");
            }
        }
    };

    panel.destroy();
    result
}

fn publish(document: &Document, output: Option<&Path>) -> Result<()> {
    let html = document
        .inner_html(KIND.default_container_id())
        .unwrap_or_default();
    match output {
        Some(path) => fs::write(path, &html)
            .with_context(|| format!("Failed to write panel: {}", path.display())),
        None => {
            println!("{}", html);
            Ok(())
        }
    }
}
