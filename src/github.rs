use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::store::{Lookup, Operation, Release, ReleaseStore, StoreError};

const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Fetch the GitHub token from the environment.
pub fn token() -> Result<String> {
    TOKEN_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "missing {} for GitHub API",
                TOKEN_VARS.join(" or ")
            )
        })
}

/// Build an authenticated Octocrab client using the token.
pub fn client() -> Result<Octocrab> {
    let token = token()?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("failed to build GitHub client")
}

#[derive(Debug, Serialize)]
struct CreateReleasePayload<'a> {
    tag_name: &'a str,
    target_commitish: &'a str,
    make_latest: &'a str,
}

/// Releases and tag refs of one GitHub repository, via the REST API.
///
/// Requests go through Octocrab's raw `_get`/`_post`/`_delete` so the exact
/// status code of each reply stays visible.
pub struct GitHubStore {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubStore {
    pub fn new(client: Octocrab, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    fn route(&self, path: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner, self.repo, path)
    }
}

/// Interpret a reply status for `operation`: the expected success status is
/// `Found`, a 404 is `NotFound` where the operation tolerates it, anything
/// else is fatal.
fn interpret(
    operation: Operation,
    status: StatusCode,
    success: StatusCode,
) -> Result<Lookup<()>, StoreError> {
    if status == success {
        Ok(Lookup::Found(()))
    } else if status == StatusCode::NOT_FOUND && operation.tolerates_missing() {
        Ok(Lookup::NotFound)
    } else {
        Err(StoreError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
        })
    }
}

/// Fold an Octocrab call result into a [`Lookup`].
///
/// A structured GitHub error is judged by its status like any other reply;
/// every other client error is passed through untouched.
fn settle<R>(
    operation: Operation,
    success: StatusCode,
    result: octocrab::Result<R>,
    status_of: impl FnOnce(&R) -> StatusCode,
) -> Result<Lookup<R>, StoreError> {
    match result {
        Ok(response) => {
            let status = status_of(&response);
            Ok(interpret(operation, status, success)?.map(|()| response))
        }
        Err(octocrab::Error::GitHub { source, .. }) => {
            match interpret(operation, source.status_code, success)? {
                Lookup::NotFound => Ok(Lookup::NotFound),
                Lookup::Found(()) => Err(StoreError::UnexpectedStatus {
                    operation,
                    status: source.status_code.as_u16(),
                }),
            }
        }
        Err(err) => Err(StoreError::Transport(err)),
    }
}

#[async_trait]
impl ReleaseStore for GitHubStore {
    async fn latest_release(&self) -> Result<Lookup<Release>, StoreError> {
        let result = self.client._get(self.route("releases/latest")).await;
        let response = match settle(Operation::GetLatestRelease, StatusCode::OK, result, |r| {
            r.status()
        })? {
            Lookup::Found(response) => response,
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };
        let body = self.client.body_to_string(response).await?;
        let data: Value = serde_json::from_str(&body)?;
        Ok(Lookup::Found(Release::from_payload(data)?))
    }

    async fn create_release(
        &self,
        tag: &str,
        target_commit: &str,
        make_latest: bool,
    ) -> Result<Release, StoreError> {
        let payload = CreateReleasePayload {
            tag_name: tag,
            target_commitish: target_commit,
            make_latest: if make_latest { "true" } else { "false" },
        };
        let result = self
            .client
            ._post(self.route("releases"), Some(&payload))
            .await;
        let response = match settle(Operation::CreateRelease, StatusCode::CREATED, result, |r| {
            r.status()
        })? {
            Lookup::Found(response) => response,
            // create never tolerates a 404, so `interpret` already rejected it
            Lookup::NotFound => {
                return Err(StoreError::UnexpectedStatus {
                    operation: Operation::CreateRelease,
                    status: StatusCode::NOT_FOUND.as_u16(),
                });
            }
        };
        let body = self.client.body_to_string(response).await?;
        let data: Value = serde_json::from_str(&body)?;
        Release::from_payload(data)
    }

    async fn delete_release(&self, id: u64) -> Result<Lookup<()>, StoreError> {
        let result = self
            .client
            ._delete(self.route(&format!("releases/{id}")), None::<&()>)
            .await;
        let outcome = settle(Operation::DeleteRelease, StatusCode::NO_CONTENT, result, |r| {
            r.status()
        })?;
        Ok(outcome.map(|_| ()))
    }

    async fn delete_tag(&self, tag: &str) -> Result<Lookup<()>, StoreError> {
        let result = self
            .client
            ._delete(self.route(&format!("git/refs/tags/{tag}")), None::<&()>)
            .await;
        let outcome = settle(Operation::DeleteTag, StatusCode::NO_CONTENT, result, |r| {
            r.status()
        })?;
        Ok(outcome.map(|_| ()))
    }
}
