//! Configuration handling for the application.
//!
//! Two layers live here. [`Config`] is the process configuration read from
//! environment variables with development defaults. [`SummarySettings`] is the
//! per-scan snapshot of which content types and content kinds participate,
//! handed out by a [`ConfigProvider`] so each scan or render reads it once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::entities::ContentKind;

/// Environment variable names.
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_SITE_URL: &str = "SITE_URL";
pub const ENV_STATE_DIR: &str = "STATE_DIR";
pub const ENV_MEDIA_DIR: &str = "MEDIA_DIR";
pub const ENV_MEDIA_BASE_URL: &str = "MEDIA_BASE_URL";
pub const ENV_SETTINGS_PATH: &str = "SETTINGS_PATH";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
pub const ENV_PROBE_CONCURRENCY: &str = "PROBE_CONCURRENCY";
pub const ENV_SCAN_TIMEOUT_SECS: &str = "SCAN_TIMEOUT_SECS";
pub const ENV_WORKER_CONCURRENCY: &str = "WORKER_CONCURRENCY";

/// Default development values used when environment variables are absent.
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SITE_URL: &str = "http://localhost:8080";
const DEFAULT_STATE_DIR: &str = "./data/state";
const DEFAULT_MEDIA_DIR: &str = "./data/media";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROBE_CONCURRENCY: usize = 4;
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 120;
const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    site_url: Url,
    state_dir: PathBuf,
    media_dir: PathBuf,
    media_base_url: String,
    settings_path: Option<PathBuf>,
    http_timeout: Duration,
    probe_concurrency: usize,
    scan_timeout: Duration,
    worker_concurrency: usize,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let site_url = env::var(ENV_SITE_URL).unwrap_or_else(|_| DEFAULT_SITE_URL.to_string());
        let site_url = Url::parse(&site_url).map_err(|e| ConfigError::InvalidValue {
            field: ENV_SITE_URL,
            reason: e.to_string(),
        })?;
        if site_url.host_str().is_none() {
            return Err(ConfigError::InvalidValue {
                field: ENV_SITE_URL,
                reason: "site url has no host".to_string(),
            });
        }

        Ok(Self {
            bind_addr: env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            site_url,
            state_dir: env::var(ENV_STATE_DIR)
                .unwrap_or_else(|_| DEFAULT_STATE_DIR.to_string())
                .into(),
            media_dir: env::var(ENV_MEDIA_DIR)
                .unwrap_or_else(|_| DEFAULT_MEDIA_DIR.to_string())
                .into(),
            media_base_url: env::var(ENV_MEDIA_BASE_URL)
                .unwrap_or_else(|_| DEFAULT_MEDIA_BASE_URL.to_string()),
            settings_path: env::var(ENV_SETTINGS_PATH).ok().map(PathBuf::from),
            http_timeout: Duration::from_secs(parse_env(
                ENV_HTTP_TIMEOUT_SECS,
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            probe_concurrency: parse_env(ENV_PROBE_CONCURRENCY, DEFAULT_PROBE_CONCURRENCY)?
                .max(1),
            scan_timeout: Duration::from_secs(parse_env(
                ENV_SCAN_TIMEOUT_SECS,
                DEFAULT_SCAN_TIMEOUT_SECS,
            )?),
            worker_concurrency: parse_env(ENV_WORKER_CONCURRENCY, DEFAULT_WORKER_CONCURRENCY)?
                .max(1),
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    /// Canonical URL of the hosting site; links to this host are local.
    pub fn site_url(&self) -> &Url {
        &self.site_url
    }
    /// Directory of the JSON-file scan state store.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }
    /// Directory imported assets are written to.
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }
    /// Public URL prefix imported assets are served under.
    pub fn media_base_url(&self) -> &str {
        &self.media_base_url
    }
    pub fn settings_path(&self) -> Option<&Path> {
        self.settings_path.as_deref()
    }
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
    pub fn probe_concurrency(&self) -> usize {
        self.probe_concurrency
    }
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }
    pub fn worker_concurrency(&self) -> usize {
        self.worker_concurrency
    }

    /// Load the summary settings file if one is configured, else defaults.
    pub fn load_settings(&self) -> Result<SummarySettings, ConfigError> {
        match self.settings_path() {
            Some(path) => SummarySettings::from_file(path),
            None => Ok(SummarySettings::default()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read settings file {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },
}

/// Display size hint for imported images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    #[default]
    Thumbnail,
    Medium,
    Large,
    Full,
}

impl ImageSize {
    /// Maximum rendered width in pixels, `None` for the original size.
    pub fn max_width(self) -> Option<u32> {
        match self {
            Self::Thumbnail => Some(150),
            Self::Medium => Some(300),
            Self::Large => Some(1024),
            Self::Full => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Full => "full",
        }
    }
}

/// Which content types and content kinds participate in scanning and
/// rendering, plus display hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub mime_types: BTreeSet<String>,
    pub post_types: BTreeSet<String>,
    pub comment_summary: bool,
    pub image_size: ImageSize,
    pub domain_blacklist: String,
    pub import_images: bool,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            mime_types: BTreeSet::from(["image/jpeg".to_string()]),
            post_types: BTreeSet::from(["post".to_string()]),
            comment_summary: false,
            image_size: ImageSize::Thumbnail,
            domain_blacklist: String::new(),
            import_images: true,
        }
    }
}

impl SummarySettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn type_enabled(&self, content_type: &str) -> bool {
        self.mime_types.contains(content_type)
    }

    /// Entries follow their post type; replies additionally need
    /// `comment_summary` and an enabled parent post type.
    pub fn kind_enabled(&self, kind: &ContentKind) -> bool {
        match kind {
            ContentKind::Entry { post_type } => self.post_types.contains(post_type),
            ContentKind::Reply { parent_post_type } => {
                self.comment_summary && self.post_types.contains(parent_post_type)
            }
        }
    }

    /// Blacklisted hosts: one per line, trimmed, lowercased, blanks skipped.
    pub fn blacklisted_hosts(&self) -> Vec<String> {
        self.domain_blacklist
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Read-only source of [`SummarySettings`] snapshots.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> Arc<SummarySettings>;
}

/// Provider that always hands out the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticConfig {
    settings: Arc<SummarySettings>,
}

impl StaticConfig {
    pub fn new(settings: SummarySettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn snapshot(&self) -> Arc<SummarySettings> {
        self.settings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_BIND_ADDR,
            ENV_SITE_URL,
            ENV_STATE_DIR,
            ENV_MEDIA_DIR,
            ENV_MEDIA_BASE_URL,
            ENV_SETTINGS_PATH,
            ENV_HTTP_TIMEOUT_SECS,
            ENV_PROBE_CONCURRENCY,
            ENV_SCAN_TIMEOUT_SECS,
            ENV_WORKER_CONCURRENCY,
        ] {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.site_url().host_str(), Some("localhost"));
        assert_eq!(cfg.probe_concurrency(), DEFAULT_PROBE_CONCURRENCY);
        assert_eq!(cfg.scan_timeout(), Duration::from_secs(120));
        assert!(cfg.settings_path().is_none());
        assert_eq!(cfg.load_settings().unwrap(), SummarySettings::default());
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_SITE_URL, "https://www.example.com/blog");
            env::set_var(ENV_PROBE_CONCURRENCY, "8");
            env::set_var(ENV_HTTP_TIMEOUT_SECS, "3");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.site_url().host_str(), Some("www.example.com"));
        assert_eq!(cfg.probe_concurrency(), 8);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(3));
        clear_env();
    }

    #[test]
    fn rejects_invalid_numbers_and_urls() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_SCAN_TIMEOUT_SECS, "soon");
        }
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue { field: ENV_SCAN_TIMEOUT_SECS, .. })
        ));

        clear_env();
        unsafe {
            env::set_var(ENV_SITE_URL, "not a url");
        }
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue { field: ENV_SITE_URL, .. })
        ));
        clear_env();
    }

    #[test]
    fn settings_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mime_types": ["image/png", "text/html"], "image_size": "medium"}}"#
        )
        .unwrap();

        let settings = SummarySettings::from_file(file.path()).unwrap();
        assert!(settings.type_enabled("text/html"));
        assert!(!settings.type_enabled("image/jpeg"));
        assert_eq!(settings.image_size, ImageSize::Medium);
        assert!(settings.post_types.contains("post"));
    }

    #[test]
    fn kind_enablement() {
        let mut settings = SummarySettings::default();
        let entry = ContentKind::Entry {
            post_type: "post".to_string(),
        };
        let page = ContentKind::Entry {
            post_type: "page".to_string(),
        };
        let reply = ContentKind::Reply {
            parent_post_type: "post".to_string(),
        };

        assert!(settings.kind_enabled(&entry));
        assert!(!settings.kind_enabled(&page));
        assert!(!settings.kind_enabled(&reply));

        settings.comment_summary = true;
        assert!(settings.kind_enabled(&reply));
    }

    #[test]
    fn blacklist_lines_are_trimmed_and_lowercased() {
        let settings = SummarySettings {
            domain_blacklist: " Spam.com \n\nbad.net\r\n".to_string(),
            ..SummarySettings::default()
        };
        assert_eq!(settings.blacklisted_hosts(), vec!["spam.com", "bad.net"]);
    }
}
