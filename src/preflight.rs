use std::path::Path;

use anyhow::Result;

use crate::config::{Overrides, Settings, load_file_config};
use crate::infer::{ContextInputs, HeadCommit, read_event};

pub struct Preflight {
    pub settings: Settings,
    pub event: HeadCommit,
}

/// Resolve settings and read the triggering event before anything talks to GitHub.
pub async fn run_preflight(
    config_path: &Path,
    overrides: &Overrides,
    inputs: &ContextInputs,
) -> Result<Preflight> {
    tracing::debug!("preflight: start");
    let file = load_file_config(config_path).await?;
    let settings = Settings::resolve(overrides, &file);
    let event = read_event(inputs.event_path.as_deref()).await?;
    tracing::info!(
        "preflight: include_latest={} require_flag={} default_type={} max_evictions={}",
        settings.include_latest,
        settings.require_flag,
        settings.default_type,
        settings.max_evictions
    );
    Ok(Preflight { settings, event })
}
