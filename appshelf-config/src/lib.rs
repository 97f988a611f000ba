//! Loader for appshelf configuration with YAML + environment overlays.
//!
//! Sources are merged in order: files and inline YAML as they were added,
//! then `APPSHELF_`-prefixed environment variables on top (nested keys use
//! `__`, e.g. `APPSHELF_STORE__TTL_DAYS=7`). String values may reference
//! other environment variables as `${VAR}`; those are expanded after merging.
//! Every field has a default, so an empty configuration is valid.
use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;

const MAX_EXPANSION_PASSES: usize = 8;
const ENV_PREFIX: &str = "APPSHELF";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppshelfConfig {
    pub version: Option<String>,
    pub http: HttpSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

impl Default for AppshelfConfig {
    fn default() -> Self {
        Self {
            version: None,
            http: HttpSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Network limits applied to page loads and manifest fetches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Pages and manifests larger than this are rejected.
    pub max_body_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            user_agent: format!("appshelf/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Where saved entries live and how their keys are laid out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database_url: String,
    /// Prefix for every entry key.
    pub namespace: String,
    /// Bumped whenever the index layout changes; old indexes are simply ignored.
    pub index_version: String,
    pub ttl_days: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://appshelf.db".into(),
            namespace: "webapp".into(),
            index_version: "v4".into(),
            ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `text` or `json`.
    pub format: String,
    pub emit_stderr: bool,
    pub default_filter: String,
    pub dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: "text".into(),
            emit_stderr: false,
            default_filter: "info".into(),
            dir: None,
        }
    }
}

/// Expand `$VAR` and `${VAR}` in every string of `v`. Values that themselves
/// reference variables are followed up to `MAX_EXPANSION_PASSES` deep; unknown
/// variables are left literal.
fn expand_env(v: &mut Value) {
    match v {
        Value::String(s) => *s = expand_str(s),
        Value::Array(items) => items.iter_mut().for_each(expand_env),
        Value::Object(map) => map.values_mut().for_each(expand_env),
        _ => {}
    }
}

fn expand_str(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAX_EXPANSION_PASSES {
        if !current.contains('$') {
            break;
        }
        let next =
            shellexpand::env_with_context_no_errors(&current, |name| std::env::var(name).ok())
                .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Collects configuration sources; [`load`](Self::load) merges them.
pub struct AppshelfConfigLoader {
    builder: ConfigBuilder<DefaultState>,
}

impl Default for AppshelfConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AppshelfConfigLoader {
    /// A loader with no sources yet. Environment overrides are added by `load`.
    ///
    /// ```
    /// use appshelf_config::AppshelfConfigLoader;
    ///
    /// let cfg = AppshelfConfigLoader::new()
    ///     .with_yaml_str("version: '2'\nstore:\n  ttl_days: 7")
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("2"));
    /// assert_eq!(cfg.store.ttl_days, 7);
    /// assert_eq!(cfg.store.index_version, "v4");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    fn add_file(mut self, path: &Path, required: bool) -> Self {
        self.builder = self.builder.add_source(File::from(path).required(required));
        self
    }

    /// A file that must exist. Format follows the extension.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_file(path.as_ref(), true)
    }

    /// A file that is skipped when it does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_file(path.as_ref(), false)
    }

    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge every source, apply `APPSHELF_*` overrides, then expand placeholders.
    ///
    /// ```
    /// use appshelf_config::AppshelfConfigLoader;
    ///
    /// unsafe { std::env::set_var("APPSHELF_DOC_DB", "sqlite://from-env.db"); }
    ///
    /// let cfg = AppshelfConfigLoader::new()
    ///     .with_yaml_str("store:\n  database_url: \"${APPSHELF_DOC_DB}\"")
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(cfg.store.database_url, "sqlite://from-env.db");
    ///
    /// unsafe { std::env::remove_var("APPSHELF_DOC_DB"); }
    /// ```
    pub fn load(self) -> Result<AppshelfConfig, ConfigError> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        let merged = self.builder.add_source(env).build()?;

        let mut raw: Value = merged.try_deserialize()?;
        expand_env(&mut raw);
        serde_json::from_value(raw).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
