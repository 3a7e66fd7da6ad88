//! Configuration file parser for ~/.config/newscloud/config.toml.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged as warnings,
//! since they are usually typos.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::analysis::DEFAULT_MAX_WORDS;
use crate::auth::HashScheme;
use crate::news::{DEFAULT_SELECTORS, DEFAULT_USER_AGENT};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// Relative file names are resolved against `data_dir`, which itself
/// defaults to the directory holding the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for the credential file and run artifacts.
    pub data_dir: Option<PathBuf>,

    /// Flat `username:hash` credential file.
    pub credentials_file: PathBuf,

    /// CSV export of extracted news texts, overwritten each run.
    pub export_file: PathBuf,

    /// Word cloud PNG, overwritten each run.
    pub image_file: PathBuf,

    /// Page the pipeline scrapes.
    pub news_url: String,

    /// Sent as the User-Agent header.
    pub user_agent: String,

    /// Extra request headers. A `User-Agent` entry here wins over `user_agent`.
    pub headers: BTreeMap<String, String>,

    /// CSS selectors whose matches supply the news texts, in output order.
    pub selectors: Vec<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Permit loopback/private hosts in `news_url`.
    pub allow_local_targets: bool,

    /// Digest format for newly registered users.
    pub hash_scheme: HashScheme,

    /// Size of the frequency table.
    pub max_words: usize,

    /// Stop-words added to the built-in list.
    pub extra_stopwords: Vec<String>,

    pub cloud: CloudConfig,
}

/// Word cloud appearance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub width: u32,
    pub height: u32,
    /// `#rrggbb`
    pub background: String,
    /// TrueType/OpenType font with CJK coverage, resolved like the other
    /// data files. If the file is absent, words are drawn as blocks.
    pub font_path: Option<PathBuf>,
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Layout seed; the same seed always yields the same image.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            credentials_file: PathBuf::from("user_data.txt"),
            export_file: PathBuf::from("baidu_news.csv"),
            image_file: PathBuf::from("wordcloud.png"),
            news_url: "https://news.baidu.com/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: BTreeMap::new(),
            selectors: DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            timeout_secs: 30,
            allow_local_targets: false,
            hash_scheme: HashScheme::default(),
            max_words: DEFAULT_MAX_WORDS,
            extra_stopwords: Vec::new(),
            cloud: CloudConfig::default(),
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: "#ffffff".to_string(),
            font_path: Some(PathBuf::from("simhei.ttf")),
            min_font_size: 10.0,
            max_font_size: 96.0,
            seed: 0,
        }
    }
}

/// Resolved locations of everything the application writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub credentials: PathBuf,
    pub export: PathBuf,
    pub image: PathBuf,
    pub font: Option<PathBuf>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 14] = [
        "data_dir",
        "credentials_file",
        "export_file",
        "image_file",
        "news_url",
        "user_agent",
        "headers",
        "selectors",
        "timeout_secs",
        "allow_local_targets",
        "hash_scheme",
        "max_words",
        "extra_stopwords",
        "cloud",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), url = %config.news_url, "Loaded configuration");
        Ok(config)
    }

    /// Resolve file locations. `base_dir` is used when `data_dir` is unset.
    pub fn data_paths(&self, base_dir: &Path) -> DataPaths {
        let root = self.data_dir.as_deref().unwrap_or(base_dir);
        let resolve = |file: &Path| {
            if file.is_absolute() {
                file.to_path_buf()
            } else {
                root.join(file)
            }
        };
        DataPaths {
            credentials: resolve(&self.credentials_file),
            export: resolve(&self.export_file),
            image: resolve(&self.image_file),
            font: self.cloud.font_path.as_deref().map(resolve),
        }
    }

    /// Headers for the page request: the User-Agent plus any extras.
    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if !self
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("user-agent"))
        {
            headers.insert("User-Agent".to_string(), self.user_agent.clone());
        }
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("newscloud_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.news_url, "https://news.baidu.com/");
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(
            config.selectors,
            vec!["div.hotnews a".to_string(), "div.mod-tab-content a".to_string()]
        );
        assert_eq!(config.max_words, 100);
        assert_eq!(config.hash_scheme, HashScheme::Salted);
        assert!(!config.allow_local_targets);
        assert_eq!(config.cloud.width, 800);
        assert_eq!(config.cloud.height, 600);
        assert_eq!(
            config.cloud.font_path.as_deref(),
            Some(Path::new("simhei.ttf"))
        );
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/newscloud_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.max_words, 100);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 30);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let (dir, path) = write_config("partial", "max_words = 50\n\n[cloud]\nseed = 9\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_words, 50);
        assert_eq!(config.cloud.seed, 9);
        assert_eq!(config.cloud.width, 800);
        assert_eq!(config.news_url, "https://news.baidu.com/");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r##"
data_dir = "/var/lib/newscloud"
credentials_file = "users.txt"
export_file = "/tmp/export.csv"
image_file = "cloud.png"
news_url = "https://news.example.com/"
user_agent = "newscloud-test"
selectors = ["ul.top a"]
timeout_secs = 5
allow_local_targets = true
hash_scheme = "legacy"
max_words = 20
extra_stopwords = ["新闻", "视频"]

[headers]
Accept-Language = "zh-CN"

[cloud]
width = 400
height = 300
background = "#000000"
font_path = "/usr/share/fonts/simhei.ttf"
min_font_size = 8.0
max_font_size = 48.0
seed = 3
"##;
        let (dir, path) = write_config("full", content);
        let config = Config::load(&path).unwrap();

        assert_eq!(config.news_url, "https://news.example.com/");
        assert_eq!(config.selectors, vec!["ul.top a".to_string()]);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.allow_local_targets);
        assert_eq!(config.hash_scheme, HashScheme::Legacy);
        assert_eq!(config.extra_stopwords.len(), 2);
        assert_eq!(config.cloud.background, "#000000");
        assert_eq!(
            config.cloud.font_path.as_deref(),
            Some(Path::new("/usr/share/fonts/simhei.ttf"))
        );

        let paths = config.data_paths(Path::new("/ignored"));
        assert_eq!(paths.credentials, PathBuf::from("/var/lib/newscloud/users.txt"));
        assert_eq!(paths.export, PathBuf::from("/tmp/export.csv"));
        assert_eq!(paths.image, PathBuf::from("/var/lib/newscloud/cloud.png"));
        assert_eq!(
            paths.font,
            Some(PathBuf::from("/usr/share/fonts/simhei.ttf"))
        );

        let headers = config.request_headers();
        assert_eq!(headers.get("User-Agent").map(String::as_str), Some("newscloud-test"));
        assert_eq!(headers.get("Accept-Language").map(String::as_str), Some("zh-CN"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_data_paths_fall_back_to_base_dir() {
        let paths = Config::default().data_paths(Path::new("/home/u/.config/newscloud"));
        assert_eq!(
            paths,
            DataPaths {
                credentials: PathBuf::from("/home/u/.config/newscloud/user_data.txt"),
                export: PathBuf::from("/home/u/.config/newscloud/baidu_news.csv"),
                image: PathBuf::from("/home/u/.config/newscloud/wordcloud.png"),
                font: Some(PathBuf::from("/home/u/.config/newscloud/simhei.ttf")),
            }
        );
    }

    #[test]
    fn test_explicit_user_agent_header_wins() {
        let mut config = Config::default();
        config
            .headers
            .insert("user-agent".to_string(), "custom".to_string());
        let headers = config.request_headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("user-agent").map(String::as_str), Some("custom"));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_hash_scheme_rejected() {
        let (dir, path) = write_config("bad_scheme", "hash_scheme = \"md5\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "max_words = 10\nmystery = true\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_words, 10);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"#".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
