//! Render a panel from a snapshot file
//!
//! Loads a `StoreSnapshot` JSON document into an in-memory store, mounts the
//! requested panel over it and prints the container HTML.
//!
//! Usage:
//!   swarmwatch render --snapshot state.json              # task monitor
//!   swarmwatch render --snapshot state.json --kind swarm # agent swarm

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use swarmwatch::{Document, MemorySource, PanelKind, PanelSettings, StatusPanel, StatusStore, StoreSnapshot};

pub async fn run(snapshot: &Path, kind: PanelKind, settings: &PanelSettings) -> Result<()> {
    let html = render_snapshot(StoreSnapshot::load(snapshot)?, kind, settings).await?;
    println!("{}", html);
    Ok(())
}

pub async fn render_snapshot(
    snapshot: StoreSnapshot,
    kind: PanelKind,
    settings: &PanelSettings,
) -> Result<String> {
    let context_id = snapshot.context_id.clone();
    let store = StatusStore::from_snapshot(snapshot);
    let document = Document::with_default_panels();
    let panel = StatusPanel::new(
        kind,
        document.clone(),
        Arc::new(MemorySource::new(store)),
        settings.clone(),
    );

    panel.init(None, context_id.as_deref()).await;
    let html = document.inner_html(kind.default_container_id());
    panel.destroy();
    html.context("Panel container disappeared while rendering")
}
