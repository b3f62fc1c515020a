//! Configuration management for mailarc

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Viewer settings
    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            search: SearchConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

/// External tool settings
///
/// Program names are resolved through PATH unless given as absolute paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Search engine binary
    #[serde(default = "default_notmuch")]
    pub notmuch: String,

    /// Mailbox sync binary
    #[serde(default = "default_sync")]
    pub sync: String,

    /// Sync tool configuration file (mailbox path and account are scanned
    /// from here)
    #[serde(default = "default_sync_config")]
    pub sync_config: PathBuf,

    /// Pager used by the viewer
    #[serde(default = "default_pager")]
    pub pager: String,

    /// Extra pager arguments
    #[serde(default = "default_pager_args")]
    pub pager_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            notmuch: default_notmuch(),
            sync: default_sync(),
            sync_config: default_sync_config(),
            pager: default_pager(),
            pager_args: default_pager_args(),
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Overrides the built-in default filter when no query is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_query: Option<String>,

    /// Category folders excluded by the default filter
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_query: None,
            excluded_folders: default_excluded_folders(),
        }
    }
}

/// Viewer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Directory attachments are saved to (default: current working
    /// directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dir: Option<PathBuf>,
}

// Default value functions
fn default_notmuch() -> String {
    "notmuch".to_string()
}

fn default_sync() -> String {
    "mbsync".to_string()
}

fn default_sync_config() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mbsyncrc")
}

fn default_pager() -> String {
    std::env::var("PAGER").unwrap_or_else(|_| "less".to_string())
}

fn default_pager_args() -> Vec<String> {
    vec!["-R".to_string()]
}

fn default_excluded_folders() -> Vec<String> {
    ["Spam", "Trash", "Promotions", "Social", "Updates", "Forums"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Get the config directory (XDG: ~/.config/mailarc)
fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(crate::APP_NAME)
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = get_config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            info!("No config file found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_dir().join("config.toml");
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Directory the viewer saves attachments into
    pub fn attachment_dir(&self) -> PathBuf {
        match &self.viewer.save_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Settings scanned from the sync tool's own configuration file
///
/// mailarc never writes this file; it only extracts the mailbox mirror path
/// and the primary account identifier for setup display and the category
/// folder probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSettings {
    /// Local mailbox mirror root (mbsync `Path` directive)
    pub maildir: Option<PathBuf>,

    /// Primary account identifier (mbsync `User` directive)
    pub account: Option<String>,
}

impl SyncSettings {
    /// Scan an mbsync configuration file for the mailbox path and account.
    ///
    /// Only the first occurrence of each directive is taken; mbsync allows
    /// multiple stores but the first one is the primary account by
    /// convention.
    pub fn scan(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SyncConfigNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::scan_str(&contents))
    }

    /// Scan mbsync configuration text (separated out for tests)
    pub fn scan_str(contents: &str) -> Self {
        let directive =
            Regex::new(r"(?i)^\s*(Path|User)\s+(\S.*?)\s*$").expect("directive pattern is valid");

        let mut settings = SyncSettings::default();
        for line in contents.lines() {
            let Some(caps) = directive.captures(line) else {
                continue;
            };
            let value = caps[2].to_string();
            match caps[1].to_ascii_lowercase().as_str() {
                "path" if settings.maildir.is_none() => {
                    settings.maildir = Some(expand_tilde(&value));
                }
                "user" if settings.account.is_none() => {
                    settings.account = Some(value);
                }
                _ => {}
            }
            if settings.maildir.is_some() && settings.account.is_some() {
                break;
            }
        }
        settings
    }
}

/// Expand a leading `~/` against the home directory
fn expand_tilde(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tools.notmuch, "notmuch");
        assert_eq!(config.tools.sync, "mbsync");
        assert!(config.search.excluded_folders.contains(&"Spam".to_string()));
        assert!(config.search.default_query.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.tools.pager_args, vec!["-R".to_string()]);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tools]\nnotmuch = \"/opt/notmuch/bin/notmuch\"\n\n[search]\nexcluded_folders = [\"Junk\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tools.notmuch, "/opt/notmuch/bin/notmuch");
        assert_eq!(config.tools.sync, "mbsync");
        assert_eq!(config.search.excluded_folders, vec!["Junk".to_string()]);
    }

    #[test]
    fn test_scan_mbsyncrc() {
        let contents = "\
IMAPAccount personal
Host imap.example.com
User alice@example.com
PassCmd \"pass imap\"

MaildirStore personal-local
Path /home/alice/mail/
Inbox /home/alice/mail/Inbox
";
        let settings = SyncSettings::scan_str(contents);
        assert_eq!(settings.account.as_deref(), Some("alice@example.com"));
        assert_eq!(
            settings.maildir,
            Some(PathBuf::from("/home/alice/mail/"))
        );
    }

    #[test]
    fn test_scan_takes_first_account_only() {
        let contents = "User first@example.com\nUser second@example.com\nPath /mail/\n";
        let settings = SyncSettings::scan_str(contents);
        assert_eq!(settings.account.as_deref(), Some("first@example.com"));
    }

    #[test]
    fn test_scan_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncSettings::scan(&dir.path().join(".mbsyncrc")).unwrap_err();
        assert!(matches!(err, Error::SyncConfigNotFound(_)));
    }
}
