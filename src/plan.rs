use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::classify::TagIntent;

/// Tag whose release is deleted and recreated on every run.
pub const FLOATING_TAG: &str = "latest";

const FIRST_RELEASE: VersionTag = VersionTag { major: 1, minor: 0 };

static VERSION_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v(?P<major>\d+)\.(?P<minor>\d+)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTag {
    pub major: u64,
    pub minor: u64,
}

impl VersionTag {
    /// Parse `v<major>.<minor>`. Anything else, including components that
    /// overflow `u64`, is rejected.
    pub fn parse(tag: &str) -> Option<Self> {
        let caps = VERSION_TAG_RE.captures(tag)?;
        let major = caps["major"].parse().ok()?;
        let minor = caps["minor"].parse().ok()?;
        Some(Self { major, minor })
    }

    /// `None` once the major component cannot grow any further.
    pub fn next_major(self) -> Option<Self> {
        Some(Self {
            major: self.major.checked_add(1)?,
            minor: 0,
        })
    }

    /// `None` once the minor component cannot grow any further.
    pub fn next_minor(self) -> Option<Self> {
        Some(Self {
            major: self.major,
            minor: self.minor.checked_add(1)?,
        })
    }

    /// The tag `intent` asks for, major taking precedence over minor.
    pub fn bump(self, intent: TagIntent) -> Option<Self> {
        if intent.major {
            self.next_major()
        } else if intent.minor {
            self.next_minor()
        } else {
            None
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Compute the tags to create, in creation order.
///
/// The first release is always `v1.0`. A current tag that is not a version
/// tag, or one whose bumped component would overflow, yields no version
/// entry. The floating tag, when requested, is always last so it ends up
/// pointing at the newest state. An empty result means there is nothing the
/// caller can safely create.
pub fn plan(current: Option<&str>, intent: TagIntent) -> Vec<String> {
    let mut tags = Vec::new();

    match current {
        None => tags.push(FIRST_RELEASE.to_string()),
        Some(tag) => {
            if let Some(next) = VersionTag::parse(tag).and_then(|version| version.bump(intent)) {
                tags.push(next.to_string());
            }
        }
    }

    if intent.latest {
        tags.push(FLOATING_TAG.to_string());
    }

    tags
}
