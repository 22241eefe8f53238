use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::classify::DefaultType;
use crate::reconcile::{DEFAULT_MAX_EVICTIONS, ReconcileOptions};

pub const DEFAULT_CONFIG_FILE: &str = ".release-tagger.toml";

/// Repository-level defaults, overridden by flags and environment variables.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    pub include_latest: Option<bool>,
    pub require_flag: Option<bool>,
    pub default_type: Option<DefaultType>,
    pub max_evictions: Option<usize>,
}

pub async fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        tracing::debug!("config: {} not present, using defaults", path.display());
        return Ok(FileConfig::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: FileConfig =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

/// Flag and environment values exactly as the command line received them.
#[derive(Debug, Default, Clone)]
pub struct RawOverrides {
    pub include_latest: Option<String>,
    pub require_flag: Option<String>,
    pub default_type: Option<String>,
    pub max_evictions: Option<String>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub include_latest: Option<bool>,
    pub require_flag: Option<bool>,
    pub default_type: Option<DefaultType>,
    pub max_evictions: Option<usize>,
}

impl Overrides {
    /// Parse raw values. Blank values count as unset, since GitHub Actions
    /// exports unset workflow inputs as empty variables.
    pub fn parse(raw: &RawOverrides) -> Result<Self> {
        let max_evictions = present(raw.max_evictions.as_deref())
            .map(|value| {
                value
                    .parse()
                    .with_context(|| format!("invalid max evictions {:?}", value))
            })
            .transpose()?;
        Ok(Self {
            include_latest: present(raw.include_latest.as_deref()).map(parse_flag),
            require_flag: present(raw.require_flag.as_deref()).map(parse_flag),
            default_type: present(raw.default_type.as_deref()).map(DefaultType::parse_lenient),
            max_evictions,
        })
    }
}

/// Fully resolved classification and reconciliation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub include_latest: bool,
    pub require_flag: bool,
    pub default_type: DefaultType,
    pub max_evictions: usize,
}

impl Settings {
    pub fn resolve(overrides: &Overrides, file: &FileConfig) -> Self {
        Self {
            include_latest: overrides
                .include_latest
                .or(file.include_latest)
                .unwrap_or(false),
            require_flag: overrides.require_flag.or(file.require_flag).unwrap_or(false),
            default_type: overrides
                .default_type
                .or(file.default_type)
                .unwrap_or_default(),
            max_evictions: overrides
                .max_evictions
                .or(file.max_evictions)
                .unwrap_or(DEFAULT_MAX_EVICTIONS),
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            max_evictions: self.max_evictions,
        }
    }
}

/// Workflow booleans: only the literal `true` is true.
pub fn parse_flag(value: &str) -> bool {
    value.trim() == "true"
}

/// `None` for missing and blank values.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let td = TempDir::new().unwrap();
        let cfg = load_file_config(&td.path().join(DEFAULT_CONFIG_FILE))
            .await
            .unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[tokio::test]
    async fn file_values_are_read() {
        let td = TempDir::new().unwrap();
        let path = td.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            "include-latest = true\ndefault-type = \"tag-minor\"\nmax-evictions = 3\n",
        )
        .unwrap();
        let cfg = load_file_config(&path).await.unwrap();
        assert_eq!(cfg.include_latest, Some(true));
        assert_eq!(cfg.require_flag, None);
        assert_eq!(cfg.default_type, Some(DefaultType::Minor));
        assert_eq!(cfg.max_evictions, Some(3));
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let td = TempDir::new().unwrap();
        let path = td.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "include-latest = \"maybe\"\n").unwrap();
        let err = load_file_config(&path).await.unwrap_err();
        assert!(format!("{err}").contains("failed to parse"));
    }

    #[test]
    fn overrides_win_over_file() {
        let file = FileConfig {
            include_latest: Some(true),
            require_flag: Some(true),
            default_type: Some(DefaultType::Major),
            max_evictions: Some(1),
        };
        let overrides = Overrides {
            require_flag: Some(false),
            default_type: Some(DefaultType::Minor),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&overrides, &file);
        assert_eq!(
            settings,
            Settings {
                include_latest: true,
                require_flag: false,
                default_type: DefaultType::Minor,
                max_evictions: 1,
            }
        );
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::resolve(&Overrides::default(), &FileConfig::default());
        assert!(!settings.include_latest);
        assert!(!settings.require_flag);
        assert_eq!(settings.default_type, DefaultType::None);
        assert_eq!(settings.max_evictions, DEFAULT_MAX_EVICTIONS);
    }

    #[test]
    fn only_literal_true_is_true() {
        assert!(parse_flag("true"));
        assert!(!parse_flag("True"));
        assert!(!parse_flag("1"));
        assert!(!parse_flag("false"));
    }

    #[test]
    fn blank_values_leave_file_settings_alone() {
        let raw = RawOverrides {
            include_latest: Some("".into()),
            require_flag: Some("  ".into()),
            default_type: Some("".into()),
            max_evictions: Some("".into()),
        };
        let overrides = Overrides::parse(&raw).unwrap();
        assert_eq!(overrides, Overrides::default());

        let file = FileConfig {
            include_latest: Some(true),
            require_flag: Some(true),
            default_type: Some(DefaultType::Major),
            max_evictions: Some(2),
        };
        let settings = Settings::resolve(&overrides, &file);
        assert!(settings.include_latest);
        assert!(settings.require_flag);
        assert_eq!(settings.default_type, DefaultType::Major);
        assert_eq!(settings.max_evictions, 2);
    }

    #[test]
    fn raw_values_are_parsed() {
        let raw = RawOverrides {
            include_latest: Some("true".into()),
            require_flag: Some("no".into()),
            default_type: Some("tag-minor".into()),
            max_evictions: Some("7".into()),
        };
        assert_eq!(
            Overrides::parse(&raw).unwrap(),
            Overrides {
                include_latest: Some(true),
                require_flag: Some(false),
                default_type: Some(DefaultType::Minor),
                max_evictions: Some(7),
            }
        );
    }

    #[test]
    fn garbage_max_evictions_is_rejected() {
        let raw = RawOverrides {
            max_evictions: Some("lots".into()),
            ..RawOverrides::default()
        };
        let err = Overrides::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("invalid max evictions"));
    }
}
