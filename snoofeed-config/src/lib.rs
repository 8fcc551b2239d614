//! Loader for snoofeed configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, files in the order they were
//! added, then `SNOOFEED__<SECTION>__<KEY>` environment variables. String values
//! may reference `${VAR}`, expanded after merging.
//!
//! ```yaml
//! version: "1"
//! collect:
//!   subreddit: Steam
//!   target_count: 100
//!   page_delay_ms: 1000
//!   output_dir: "."
//! reddit:
//!   timeout_secs: 30
//! logging:
//!   format: text
//!   stderr: true
//!   filter: info
//! ```
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use snoofeed_common::observability::LogFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "SNOOFEED";

/// Keys typed as strings. Environment values are parsed into scalars, so
/// `SNOOFEED__COLLECT__SUBREDDIT=1200` arrives as a number and is turned back here.
const STRING_KEYS: &[&str] = &[
    "/version",
    "/collect/subreddit",
    "/collect/output_dir",
    "/reddit/client_id",
    "/reddit/user_agent",
    "/reddit/auth_base",
    "/reddit/gql_base",
    "/logging/dir",
    "/logging/filter",
];
pub const CONFIG_FILE_NAME: &str = "snoofeed.yaml";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct SnoofeedConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to fetch and where to put it.
#[derive(Debug, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Directory for `reddit_posts_<subreddit>.json`; the working directory when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            target_count: default_target_count(),
            page_delay_ms: default_page_delay_ms(),
            output_dir: None,
        }
    }
}

/// Overrides for the mobile client identity and endpoints. Unset fields fall
/// back to the values the social crate ships with.
#[derive(Debug, Default, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub auth_base: Option<String>,
    #[serde(default)]
    pub gql_base: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::default(),
            stderr: true,
            filter: default_filter(),
        }
    }
}

fn default_subreddit() -> String {
    "Steam".into()
}
fn default_target_count() -> usize {
    100
}
fn default_page_delay_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_filter() -> String {
    "info".into()
}

impl SnoofeedConfig {
    /// Reject values no run could succeed with.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.collect.subreddit.trim().is_empty() {
            return Err(LoadError::Invalid("collect.subreddit is empty".into()));
        }
        if self.reddit.timeout_secs == Some(0) {
            return Err(LoadError::Invalid(
                "reddit.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Candidate config files, lowest precedence first: the per-user config dir,
/// then the working directory.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("snoofeed").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SnoofeedConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SnoofeedConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SnoofeedConfigLoader {
    /// Start from the built-in defaults; environment overrides are applied in [`Self::load`].
    ///
    /// ```
    /// use snoofeed_config::SnoofeedConfigLoader;
    ///
    /// let config = SnoofeedConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.collect.subreddit, "Steam");
    /// assert_eq!(config.collect.target_count, 100);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate infers
    /// format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Attach every path from [`default_config_paths`] as optional.
    pub fn with_default_files(self) -> Self {
        default_config_paths()
            .into_iter()
            .fold(self, |loader, p| loader.with_optional_file(p))
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use snoofeed_config::SnoofeedConfigLoader;
    ///
    /// let cfg = SnoofeedConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// collect:
    ///   subreddit: "rust"
    ///   target_count: 25
    /// reddit:
    ///   timeout_secs: 10
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.collect.subreddit, "rust");
    /// assert_eq!(cfg.collect.target_count, 25);
    /// assert_eq!(cfg.collect.page_delay_ms, 1000);
    /// assert_eq!(cfg.reddit.timeout_secs, Some(10));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, overlay the environment, expand `${VAR}` placeholders
    /// and deserialize into [`SnoofeedConfig`].
    pub fn load(self) -> Result<SnoofeedConfig, LoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        restore_string_keys(&mut v);
        expand_env_in_value(&mut v);

        let typed: SnoofeedConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}

fn restore_string_keys(v: &mut Value) {
    for key in STRING_KEYS {
        let Some(slot) = v.pointer_mut(key) else {
            continue;
        };
        let text = match &*slot {
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        *slot = Value::String(text);
    }
}
