use anyhow::{Context, Result};

use swarmwatch::{Config, StatusSource};

pub async fn run(config: &Config, task_id: &str) -> Result<()> {
    let context_id = super::require_context(config)?;
    let source = super::remote_source(config)?;
    source
        .cancel_task(Some(context_id), task_id)
        .await
        .with_context(|| format!("Failed to cancel task '{}'", task_id))?;
    println!("Cancelled task '{}'", task_id);
    Ok(())
}
