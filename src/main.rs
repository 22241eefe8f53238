mod classify;
mod config;
mod github;
mod infer;
mod plan;
mod preflight;
mod reconcile;
mod store;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::classify::{SKIP_LATEST_MARKER, classify};
use crate::config::{DEFAULT_CONFIG_FILE, Overrides, RawOverrides};
use crate::github::GitHubStore;
use crate::infer::ContextInputs;
use crate::reconcile::reconcile;

#[derive(Parser, Debug)]
#[command(
    name = "release-tagger",
    version,
    about = "Bump vMAJOR.MINOR release tags and move the floating `latest` release",
    long_about = None
)]
struct Cli {
    /// Also replace the floating `latest` release when a version tag is created
    #[arg(long, env = "INCLUDE_LATEST")]
    include_latest: Option<String>,

    /// Commit message to scan for [tag-major] / [tag-minor]
    #[arg(long, env = "COMMIT_MESSAGE")]
    commit_message: Option<String>,

    /// Only bump when the commit message carries a marker
    #[arg(long, env = "REQUIRE_FLAG")]
    require_flag: Option<String>,

    /// Bump applied without a marker: major, minor or none
    #[arg(long, env = "DEFAULT_TYPE")]
    default_type: Option<String>,

    /// Target repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Commit the new releases point at
    #[arg(long, env = "TARGET_COMMIT")]
    target_commit: Option<String>,

    /// GitHub event payload of the triggering push
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    #[arg(long, env = "GITHUB_SHA", hide = true)]
    github_sha: Option<String>,

    /// Give up after this many floating-release evictions
    #[arg(long, env = "MAX_EVICTIONS")]
    max_evictions: Option<String>,

    /// Optional TOML file with repository defaults
    #[arg(long, env = "RELEASE_TAGGER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

impl Cli {
    fn overrides(&self) -> Result<Overrides> {
        Overrides::parse(&RawOverrides {
            include_latest: self.include_latest.clone(),
            require_flag: self.require_flag.clone(),
            default_type: self.default_type.clone(),
            max_evictions: self.max_evictions.clone(),
        })
    }

    fn context_inputs(&self) -> Result<ContextInputs> {
        Ok(ContextInputs {
            repository: self.repository.clone(),
            target_commit: self.target_commit.clone(),
            commit_message: self.commit_message.clone(),
            // empty when unset in a workflow
            event_path: self
                .event_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            github_sha: self.github_sha.clone(),
            workdir: std::env::current_dir().context("failed to read working directory")?,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RELEASE_TAGGER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let inputs = cli.context_inputs()?;
    let overrides = cli.overrides()?;
    let ctx = preflight::run_preflight(&cli.config, &overrides, &inputs)
        .await
        .context("preflight checks failed")?;
    let settings = ctx.settings;

    let message = infer::commit_message(&inputs, &ctx.event).await?;
    tracing::info!("classify: commit message={}", message);
    if message.contains(SKIP_LATEST_MARKER) {
        tracing::warn!(
            "classify: {} is not supported and does not suppress the latest release",
            SKIP_LATEST_MARKER
        );
    }
    let intent = classify(
        &message,
        settings.require_flag,
        settings.default_type,
        settings.include_latest,
    );
    tracing::info!("classify: {}", intent);

    if intent.is_empty() {
        tracing::info!("classify: no release updates to apply");
        println!("release-tagger: no release updates to apply");
        return Ok(());
    }

    let target = infer::target(&inputs, &ctx.event).await?;
    let client = github::client()?;
    let store = GitHubStore::new(client, target.owner, target.repo);
    let report = reconcile(&store, intent, &target.commit, settings.reconcile_options()).await?;

    println!(
        "release-tagger: created {} (base={} evicted={})",
        report.created.join(", "),
        report.base_tag.as_deref().unwrap_or("<none>"),
        report.evicted.len()
    );
    Ok(())
}
