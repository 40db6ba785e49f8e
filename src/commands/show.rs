use anyhow::{Context, Result};

use swarmwatch::Config;

pub async fn run(config: &Config, task_id: &str) -> Result<()> {
    let context_id = super::require_context(config)?;
    let source = super::remote_source(config)?;
    let task = source
        .task(Some(context_id), task_id)
        .await
        .with_context(|| format!("Failed to fetch task '{}'", task_id))?
        .with_context(|| format!("Task '{}' not found in context '{}'", task_id, context_id))?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
