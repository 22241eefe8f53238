use crate::classify::TagIntent;
use crate::plan::{FLOATING_TAG, VersionTag, plan};
use crate::store::{Lookup, Release, ReleaseStore, StoreError};

pub const DEFAULT_MAX_EVICTIONS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Upper bound on floating-tag evictions before giving up on the store.
    pub max_evictions: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_evictions: DEFAULT_MAX_EVICTIONS,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error(
        "could not determine the tags to update based off the tag on the latest release: {tag}"
    )]
    MalformedCurrentTag { tag: String },

    #[error("cannot bump {tag}: the version component is already at its maximum")]
    VersionOverflow { tag: String },

    #[error("the latest release was still `latest` after {limit} evictions")]
    EvictionLimit { limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a run changed on the remote store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub evicted: Vec<Release>,
    /// Newest version tag seen once floating releases were peeled off.
    pub base_tag: Option<String>,
    pub created: Vec<String>,
}

/// Bring the store in line with `intent`, pointing new releases at `target_commit`.
///
/// The floating tag cannot be moved, so any `latest` release at the head of
/// the release list is deleted (release and tag ref) before planning. Nothing
/// is rolled back on failure.
pub async fn reconcile<S>(
    store: &S,
    intent: TagIntent,
    target_commit: &str,
    options: ReconcileOptions,
) -> Result<Report, ReconcileError>
where
    S: ReleaseStore + ?Sized,
{
    let mut report = Report::default();
    if intent.is_empty() {
        tracing::info!("reconcile: no release updates to apply");
        return Ok(report);
    }

    let current = loop {
        match store.latest_release().await? {
            Lookup::Found(release) if release.tag == FLOATING_TAG => {
                if report.evicted.len() >= options.max_evictions {
                    return Err(ReconcileError::EvictionLimit {
                        limit: options.max_evictions,
                    });
                }
                evict(store, &release).await?;
                report.evicted.push(release);
            }
            Lookup::Found(release) => {
                tracing::info!("reconcile: latest tag={}", release.tag);
                break Some(release.tag);
            }
            Lookup::NotFound => {
                tracing::info!("reconcile: no existing release");
                break None;
            }
        }
    };

    if let Some(tag) = &current {
        let version = VersionTag::parse(tag)
            .ok_or_else(|| ReconcileError::MalformedCurrentTag { tag: tag.clone() })?;
        if intent.bumps_version() && version.bump(intent).is_none() {
            return Err(ReconcileError::VersionOverflow { tag: tag.clone() });
        }
    }

    let tags = plan(current.as_deref(), intent);
    if tags.is_empty() {
        return Err(ReconcileError::MalformedCurrentTag {
            tag: current.unwrap_or_default(),
        });
    }
    tracing::info!("reconcile: planned tags={}", tags.join(","));
    report.base_tag = current;

    for tag in tags {
        tracing::info!("reconcile: creating release tag={} target={}", tag, target_commit);
        let release = store.create_release(&tag, target_commit, true).await?;
        tracing::debug!("reconcile: created release id={} tag={}", release.id, release.tag);
        report.created.push(tag);
    }

    Ok(report)
}

async fn evict<S>(store: &S, release: &Release) -> Result<(), StoreError>
where
    S: ReleaseStore + ?Sized,
{
    tracing::info!("reconcile: deleting floating release id={}", release.id);
    // Logged in full so an accidentally removed release can be recreated.
    tracing::info!(
        target_commit = release.target_commitish().unwrap_or("<unknown>"),
        "reconcile: release information: {}",
        release.data
    );

    match store.delete_release(release.id).await? {
        Lookup::Found(()) => tracing::info!("reconcile: release successfully removed"),
        Lookup::NotFound => tracing::warn!("reconcile: release could not be found"),
    }
    match store.delete_tag(&release.tag).await? {
        Lookup::Found(()) => {
            tracing::info!("reconcile: tag {} successfully removed", release.tag)
        }
        Lookup::NotFound => tracing::warn!("reconcile: tag {} could not be found", release.tag),
    }
    Ok(())
}
