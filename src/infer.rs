use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use git2::Repository;
use regex::Regex;
use serde::Deserialize;

use crate::config::present;

static SSH_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^git@github\.com:(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$").unwrap()
});
static HTTPS_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?$").unwrap()
});

/// Raw inputs the run context is derived from, before any fallback.
#[derive(Debug, Clone, Default)]
pub struct ContextInputs {
    pub repository: Option<String>,
    pub target_commit: Option<String>,
    pub commit_message: Option<String>,
    pub event_path: Option<PathBuf>,
    pub github_sha: Option<String>,
    pub workdir: PathBuf,
}

/// The commit a push event was triggered by.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HeadCommit {
    pub id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PushEvent {
    head_commit: Option<HeadCommit>,
}

/// Where new releases go and what they point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub owner: String,
    pub repo: String,
    pub commit: String,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    present(value).map(str::to_string)
}

pub async fn read_event(path: Option<&Path>) -> Result<HeadCommit> {
    let Some(path) = path else {
        return Ok(HeadCommit::default());
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read event payload {}", path.display()))?;
    let event: PushEvent = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse event payload {}", path.display()))?;
    Ok(event.head_commit.unwrap_or_default())
}

pub fn parse_repository(value: &str) -> Result<(String, String)> {
    match value.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("invalid repository {:?} (expected owner/repo)", value),
    }
}

/// Parse GitHub owner/repo from an SSH or HTTPS remote URL.
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    SSH_REMOTE
        .captures(url)
        .or_else(|| HTTPS_REMOTE.captures(url))
        .map(|c| (c["owner"].to_string(), c["repo"].to_string()))
}

pub async fn infer_remote(root: &Path) -> Result<(String, String)> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(String, String)> {
        let repo = Repository::discover(root)?;
        let remotes = repo.remotes()?;
        let name = remotes
            .iter()
            .flatten()
            .find(|r| *r == "origin")
            .or_else(|| remotes.iter().flatten().next())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no git remotes found"))?;
        let remote = repo.find_remote(&name)?;
        let url = remote
            .url()
            .ok_or_else(|| anyhow::anyhow!("remote has no URL"))?;
        parse_github_remote(url)
            .ok_or_else(|| anyhow::anyhow!("unsupported remote URL (expected GitHub): {}", url))
    })
    .await
    .map_err(|e| anyhow::anyhow!("infer_remote task join error: {}", e))?
}

/// SHA and message of the local `HEAD` commit.
pub async fn local_head(root: &Path) -> Result<(String, String)> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let repo = Repository::discover(root)?;
        let commit = repo.head()?.peel_to_commit()?;
        let message = commit.message().unwrap_or_default().to_string();
        Ok::<_, anyhow::Error>((commit.id().to_string(), message))
    })
    .await
    .map_err(|e| anyhow::anyhow!("local_head task join error: {}", e))?
}

/// Commit message to classify: explicit input, then the event payload, then `HEAD`.
pub async fn commit_message(inputs: &ContextInputs, event: &HeadCommit) -> Result<String> {
    if let Some(message) = present(inputs.commit_message.as_deref()) {
        return Ok(message.to_string());
    }
    if let Some(message) = present(event.message.as_deref()) {
        return Ok(message.to_string());
    }
    tracing::debug!("infer: no commit message supplied, reading local HEAD");
    let (_, message) = local_head(&inputs.workdir)
        .await
        .context("no commit message supplied and local HEAD is unreadable")?;
    Ok(message)
}

pub async fn target(inputs: &ContextInputs, event: &HeadCommit) -> Result<Target> {
    let (owner, repo) = match non_empty(inputs.repository.as_deref()) {
        Some(value) => parse_repository(&value)?,
        None => infer_remote(&inputs.workdir)
            .await
            .context("no repository supplied and the origin remote is unusable")?,
    };

    let commit = match non_empty(inputs.target_commit.as_deref())
        .or_else(|| non_empty(event.id.as_deref()))
        .or_else(|| non_empty(inputs.github_sha.as_deref()))
    {
        Some(sha) => sha,
        None => {
            local_head(&inputs.workdir)
                .await
                .context("no target commit supplied and local HEAD is unreadable")?
                .0
        }
    };

    tracing::info!("infer: ok repo={}/{} commit={}", owner, repo, commit);
    Ok(Target {
        owner,
        repo,
        commit,
    })
}
