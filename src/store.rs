//! Remote release store abstraction.
//!
//! Lookups and deletions report absence through [`Lookup::NotFound`] rather
//! than through an error, so callers never inspect error messages to decide
//! whether something was missing.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Outcome of a remote call that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetLatestRelease,
    CreateRelease,
    DeleteRelease,
    DeleteTag,
}

impl Operation {
    /// Whether a 404 is an expected answer rather than a failure.
    pub fn tolerates_missing(self) -> bool {
        !matches!(self, Operation::CreateRelease)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetLatestRelease => "getting the latest release",
            Operation::CreateRelease => "creating the release",
            Operation::DeleteRelease => "deleting the release",
            Operation::DeleteTag => "deleting the tag",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("unexpected status code {status} returned when {operation}")]
    UnexpectedStatus { operation: Operation, status: u16 },

    #[error(transparent)]
    Transport(#[from] octocrab::Error),

    #[error("failed to decode release payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A release as the store reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub tag: String,
    pub id: u64,
    /// Full payload, kept so evicted releases can be reconstructed by hand.
    pub data: Value,
}

#[derive(Deserialize)]
struct ReleaseFields {
    id: u64,
    tag_name: String,
}

impl Release {
    pub fn from_payload(data: Value) -> Result<Self, StoreError> {
        let fields = ReleaseFields::deserialize(&data)?;
        Ok(Self {
            tag: fields.tag_name,
            id: fields.id,
            data,
        })
    }

    pub fn target_commitish(&self) -> Option<&str> {
        self.data.get("target_commitish").and_then(Value::as_str)
    }
}

/// Release and tag operations against one repository.
///
/// Every call is awaited to completion before the next one is issued; the
/// store is never driven concurrently.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Fetch the release the store considers latest.
    async fn latest_release(&self) -> Result<Lookup<Release>, StoreError>;

    /// Create a release for `tag` pointing at `target_commit`.
    async fn create_release(
        &self,
        tag: &str,
        target_commit: &str,
        make_latest: bool,
    ) -> Result<Release, StoreError>;

    /// Delete a release by id. `NotFound` when it was already gone.
    async fn delete_release(&self, id: u64) -> Result<Lookup<()>, StoreError>;

    /// Delete the `refs/tags/<tag>` reference. `NotFound` when it was already gone.
    async fn delete_tag(&self, tag: &str) -> Result<Lookup<()>, StoreError>;
}
