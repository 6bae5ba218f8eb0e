//! User settings for git-flow
//!
//! The branch hierarchy lives in git config (see [`crate::branch`]). This
//! module covers the per-user knobs, loaded with the following priority
//! (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GITFLOW_*)
//! 3. Repository git config (`gitflow.origin`)
//! 4. Settings file (~/.config/git-flow/config.toml)
//! 5. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Remote used when nothing else is configured
pub const DEFAULT_REMOTE: &str = "origin";

/// Remote-related settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Remote to fetch from, push to and delete on
    pub name: String,

    /// Fetch before start/finish/update even when the branch type does not
    pub fetch: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_REMOTE.to_string(),
            fetch: false,
        }
    }
}

/// Root settings structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Remote settings
    pub remote: RemoteSettings,
}

impl Settings {
    /// Load settings from the default file location
    ///
    /// Returns defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse settings {}: {}", path.display(), e))
        })
    }

    /// Get the default settings file path
    ///
    /// Returns `~/.config/git-flow/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("git-flow").join("config.toml"))
    }

    /// Apply the repository's `gitflow.origin`
    pub fn with_git_config(mut self, remote: Option<String>) -> Self {
        if let Some(remote) = remote {
            self.remote.name = remote;
        }
        self
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GITFLOW_REMOTE: remote name
    /// - GITFLOW_FETCH: fetch before operations (true/false, 1/0, yes/no)
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(remote) = lookup("GITFLOW_REMOTE").filter(|r| !r.trim().is_empty()) {
            self.remote.name = remote;
        }

        if let Some(value) = lookup("GITFLOW_FETCH") {
            match parse_bool(&value) {
                Some(fetch) => self.remote.fetch = fetch,
                None => tracing::warn!(value = %value, "Ignoring invalid GITFLOW_FETCH"),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, remote: Option<String>, fetch: Option<bool>) -> Self {
        if let Some(remote) = remote {
            self.remote.name = remote;
        }

        if let Some(fetch) = fetch {
            self.remote.fetch = fetch;
        }

        self
    }

    /// Load settings with all overrides applied
    ///
    /// Priority: CLI > env > git config > settings file > defaults
    pub fn load_with_overrides(
        git_remote: Option<String>,
        remote: Option<String>,
        fetch: Option<bool>,
    ) -> Result<Self> {
        Ok(Self::load()?
            .with_git_config(git_remote)
            .with_env_overrides()
            .with_cli_overrides(remote, fetch))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.remote.name, "origin");
        assert!(!settings.remote.fetch);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[remote]
name = "upstream"
fetch = true
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.remote.name, "upstream");
        assert!(settings.remote.fetch);
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[remote]
fetch = true
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.remote.name, "origin");
        assert!(settings.remote.fetch);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote]\nname = \"fork\"\n").unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.remote.name, "fork");

        std::fs::write(&path, "[remote\n").unwrap();
        assert!(matches!(Settings::load_from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_override_priority() {
        let env: HashMap<&str, &str> = [("GITFLOW_REMOTE", "env-remote"), ("GITFLOW_FETCH", "yes")]
            .into_iter()
            .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let settings = Settings::default().with_git_config(Some("git-remote".into()));
        assert_eq!(settings.remote.name, "git-remote");

        let settings = settings.with_overrides_from(lookup);
        assert_eq!(settings.remote.name, "env-remote");
        assert!(settings.remote.fetch);

        let settings = settings.with_cli_overrides(Some("cli-remote".into()), Some(false));
        assert_eq!(settings.remote.name, "cli-remote");
        assert!(!settings.remote.fetch);
    }

    #[test]
    fn test_invalid_env_fetch_ignored() {
        let settings = Settings::default().with_overrides_from(|key| match key {
            "GITFLOW_FETCH" => Some("maybe".to_string()),
            "GITFLOW_REMOTE" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(settings, Settings::default());
    }
}
