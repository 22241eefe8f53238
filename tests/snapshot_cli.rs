use std::fs;
use std::path::Path;

use anyhow::Result;
use assert_cmd::prelude::*;
use tempfile::TempDir;

const ENV_VARS: [&str; 13] = [
    "INCLUDE_LATEST",
    "COMMIT_MESSAGE",
    "REQUIRE_FLAG",
    "DEFAULT_TYPE",
    "GITHUB_REPOSITORY",
    "TARGET_COMMIT",
    "GITHUB_EVENT_PATH",
    "GITHUB_SHA",
    "MAX_EVICTIONS",
    "RELEASE_TAGGER_CONFIG",
    "RELEASE_TAGGER_LOG",
    "GITHUB_TOKEN",
    "GH_TOKEN",
];

fn tagger_cmd(root: &Path) -> Result<std::process::Command> {
    let mut cmd = std::process::Command::cargo_bin("release-tagger")?;
    cmd.current_dir(root);
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    Ok(cmd)
}

#[test]
fn no_marker_with_required_flag_is_a_noop() -> Result<()> {
    let td = TempDir::new()?;
    let output = tagger_cmd(td.path())?
        .args([
            "--commit-message",
            "docs: fix typo",
            "--require-flag",
            "true",
            "--default-type",
            "minor",
        ])
        .output()?;
    assert!(
        output.status.success(),
        "status: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    insta::assert_snapshot!(stdout, @r###"release-tagger: no release updates to apply
"###);
    Ok(())
}

#[test]
fn workflow_environment_is_honored() -> Result<()> {
    let td = TempDir::new()?;
    let event = td.path().join("event.json");
    fs::write(
        &event,
        r#"{"head_commit":{"id":"abc123","message":"chore: bump deps"}}"#,
    )?;
    let output = tagger_cmd(td.path())?
        .env("GITHUB_EVENT_PATH", &event)
        .env("INCLUDE_LATEST", "true")
        .env("REQUIRE_FLAG", "true")
        .env("DEFAULT_TYPE", "tag-major")
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    insta::assert_snapshot!(stdout, @r###"release-tagger: no release updates to apply
"###);
    Ok(())
}

#[test]
fn config_file_supplies_defaults() -> Result<()> {
    let td = TempDir::new()?;
    fs::write(
        td.path().join(".release-tagger.toml"),
        "require-flag = true\ndefault-type = \"major\"\n",
    )?;
    let output = tagger_cmd(td.path())?
        .args(["--commit-message", "refactor: internals"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    insta::assert_snapshot!(stdout, @r###"release-tagger: no release updates to apply
"###);
    Ok(())
}

#[test]
fn requested_bump_without_token_fails() -> Result<()> {
    let td = TempDir::new()?;
    let output = tagger_cmd(td.path())?
        .args([
            "--commit-message",
            "feat: new api [tag-minor]",
            "--repository",
            "acme/widgets",
            "--target-commit",
            "abc123",
        ])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(
        stderr.contains("missing GITHUB_TOKEN or GH_TOKEN for GitHub API"),
        "stderr: {stderr}"
    );
    Ok(())
}

#[test]
fn malformed_repository_is_rejected() -> Result<()> {
    let td = TempDir::new()?;
    let output = tagger_cmd(td.path())?
        .args([
            "--commit-message",
            "[tag-major]",
            "--repository",
            "widgets",
        ])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("expected owner/repo"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn blank_workflow_inputs_fall_back_to_config_file() -> Result<()> {
    let td = TempDir::new()?;
    fs::write(
        td.path().join(".release-tagger.toml"),
        "default-type = \"major\"\nmax-evictions = 2\n",
    )?;
    let output = tagger_cmd(td.path())?
        .args([
            "--commit-message",
            "chore",
            "--repository",
            "acme/widgets",
            "--target-commit",
            "abc123",
        ])
        .env("DEFAULT_TYPE", "")
        .env("INCLUDE_LATEST", "")
        .env("REQUIRE_FLAG", "")
        .env("MAX_EVICTIONS", "")
        .output()?;
    let stderr = String::from_utf8(output.stderr)?;
    // the bump is attempted, so the run only stops at the missing token
    assert!(!output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("default_type=major"), "stderr: {stderr}");
    assert!(stderr.contains("max_evictions=2"), "stderr: {stderr}");
    assert!(
        stderr.contains("missing GITHUB_TOKEN or GH_TOKEN for GitHub API"),
        "stderr: {stderr}"
    );
    assert!(String::from_utf8(output.stdout)?.is_empty());
    Ok(())
}

#[test]
fn blank_commit_message_defers_to_event_payload() -> Result<()> {
    let td = TempDir::new()?;
    let event = td.path().join("event.json");
    fs::write(
        &event,
        r#"{"head_commit":{"id":"abc123","message":"feat: api [tag-minor]"}}"#,
    )?;
    let output = tagger_cmd(td.path())?
        .args(["--repository", "acme/widgets"])
        .env("COMMIT_MESSAGE", "")
        .env("REQUIRE_FLAG", "true")
        .env("GITHUB_EVENT_PATH", &event)
        .output()?;
    let stderr = String::from_utf8(output.stderr)?;
    assert!(!output.status.success(), "stderr: {stderr}");
    assert!(stderr.contains("minor=true"), "stderr: {stderr}");
    assert!(
        stderr.contains("missing GITHUB_TOKEN or GH_TOKEN for GitHub API"),
        "stderr: {stderr}"
    );
    Ok(())
}
