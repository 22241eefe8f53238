use std::fmt;

pub const MAJOR_MARKER: &str = "[tag-major]";
pub const MINOR_MARKER: &str = "[tag-minor]";
/// Documented in older workflow templates but never acted on.
pub const SKIP_LATEST_MARKER: &str = "[skip-latest]";

/// Which tag categories a run should create or replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagIntent {
    pub major: bool,
    pub minor: bool,
    pub latest: bool,
}

impl TagIntent {
    pub fn is_empty(&self) -> bool {
        !self.major && !self.minor && !self.latest
    }

    pub fn bumps_version(&self) -> bool {
        self.major || self.minor
    }
}

impl fmt::Display for TagIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "major={} minor={} latest={}",
            self.major, self.minor, self.latest
        )
    }
}

/// Bump applied when a commit carries no marker and markers are optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultType {
    Major,
    Minor,
    #[default]
    None,
}

impl DefaultType {
    /// Unknown values fall back to `None` instead of failing.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "major" | "tag-major" => DefaultType::Major,
            "minor" | "tag-minor" => DefaultType::Minor,
            "" | "none" => DefaultType::None,
            other => {
                tracing::warn!("classify: ignoring unknown default type {:?}", other);
                DefaultType::None
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for DefaultType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

impl fmt::Display for DefaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefaultType::Major => "major",
            DefaultType::Minor => "minor",
            DefaultType::None => "none",
        };
        f.write_str(name)
    }
}

/// Decide which tags a commit should move.
///
/// `[tag-major]` wins over `[tag-minor]`. Without either marker the
/// `default_type` applies, unless `require_flag` is set. The floating tag is
/// only requested together with a version bump.
pub fn classify(
    message: &str,
    require_flag: bool,
    default_type: DefaultType,
    include_latest: bool,
) -> TagIntent {
    let mut intent = TagIntent::default();
    if message.contains(MAJOR_MARKER) {
        intent.major = true;
    } else if message.contains(MINOR_MARKER) {
        intent.minor = true;
    } else if !require_flag {
        match default_type {
            DefaultType::Major => intent.major = true,
            DefaultType::Minor => intent.minor = true,
            DefaultType::None => {}
        }
    }

    intent.latest = intent.bumps_version() && include_latest;
    intent
}
