//! Runtime configuration
//!
//! [`WardenConfig`] is loaded with figment, in this order:
//! 1. Built-in defaults
//! 2. `warden.toml` in the working directory (or a parent)
//! 3. `WARDEN_`-prefixed environment variables, nested with `__`
//!    (`WARDEN_EXECUTOR__TIMEOUT=5s`)
//! 4. The file named by `WARDEN_CONFIG_PATH`, if set
//!
//! ```toml
//! [executor]
//! timeout = "30s"
//! max_concurrent = 4
//! recover_panics = true
//!
//! [security.denylist]
//! patterns = ["shutdown"]
//!
//! [security.paths]
//! enabled = false
//! ```

use crate::security::{
    CompositePolicy, DEFAULT_DENYLIST_TOOLS, DEFAULT_PATH_TOOLS, DenylistPolicy, PathPolicy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config file name
pub const CONFIG_FILE: &str = "warden.toml";

/// Environment variable naming an extra config file
pub const CONFIG_PATH_ENV: &str = "WARDEN_CONFIG_PATH";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "WARDEN_";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Executor settings
///
/// Immutable once handed to an executor; read it back through
/// [`Executor::config`](crate::executor::Executor::config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Default timeout, applied only when the caller's context has no
    /// deadline. Zero disables it.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Batch concurrency bound; zero means unbounded, one is sequential
    pub max_concurrent: usize,

    /// Install a panic recovery frame around every invocation
    pub recover_panics: bool,

    /// Attach a backtrace to recovered panics
    pub capture_panic_stack: bool,

    /// Truncate successful output data to this many bytes
    pub max_output_bytes: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrent: 1,
            recover_panics: true,
            capture_panic_stack: true,
            max_output_bytes: None,
        }
    }
}

impl ExecutorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_recover_panics(mut self, recover: bool) -> Self {
        self.recover_panics = recover;
        self
    }

    pub fn with_capture_panic_stack(mut self, capture: bool) -> Self {
        self.capture_panic_stack = capture;
        self
    }

    pub fn with_max_output_bytes(mut self, max_bytes: usize) -> Self {
        self.max_output_bytes = Some(max_bytes);
        self
    }

    /// Default timeout, if one applies
    pub fn default_timeout(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }

    /// Batch concurrency bound, if any
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent > 0).then_some(self.max_concurrent)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_output_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "executor.max_output_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for one built-in security check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Include this check in the built policy
    pub enabled: bool,

    /// Tools the check applies to
    pub tools: Vec<String>,

    /// Patterns added to the built-in list
    pub patterns: Vec<String>,

    /// Drop the built-in patterns and use only `patterns`
    pub replace_defaults: bool,
}

impl Default for CheckConfig {
    /// An inert check: disabled and scoped to no tools
    fn default() -> Self {
        Self {
            enabled: false,
            tools: Vec::new(),
            patterns: Vec::new(),
            replace_defaults: false,
        }
    }
}

impl CheckConfig {
    fn with_tools(tools: &[&str]) -> Self {
        Self {
            enabled: true,
            tools: tools.iter().map(|t| t.to_string()).collect(),
            patterns: Vec::new(),
            replace_defaults: false,
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.enabled && self.tools.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "security.{}.tools cannot be empty while the check is enabled",
                section
            )));
        }
        if self.replace_defaults && self.patterns.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "security.{}.patterns cannot be empty when replacing defaults",
                section
            )));
        }
        Ok(())
    }
}

/// Security policy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub denylist: CheckConfig,
    pub paths: CheckConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            denylist: CheckConfig::with_tools(DEFAULT_DENYLIST_TOOLS),
            paths: CheckConfig::with_tools(DEFAULT_PATH_TOOLS),
        }
    }
}

impl SecurityConfig {
    /// Build the composite policy these settings describe
    pub fn build_policy(&self) -> CompositePolicy {
        let mut policy = CompositePolicy::new();

        if self.denylist.enabled {
            let mut denylist = DenylistPolicy::new().with_tools(self.denylist.tools.clone());
            if self.denylist.replace_defaults {
                denylist = denylist.with_patterns(self.denylist.patterns.clone());
            } else {
                for pattern in &self.denylist.patterns {
                    denylist = denylist.add_pattern(pattern.clone());
                }
            }
            policy = policy.with(denylist);
        }

        if self.paths.enabled {
            let mut paths = PathPolicy::new().with_tools(self.paths.tools.clone());
            if self.paths.replace_defaults {
                paths = paths.with_patterns(&self.paths.patterns);
            } else {
                for pattern in &self.paths.patterns {
                    paths = paths.add_pattern(pattern);
                }
            }
            policy = policy.with(paths);
        }

        policy
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.denylist.validate("denylist")?;
        self.paths.validate("paths")
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub executor: ExecutorConfig,
    pub security: SecurityConfig,
}

impl WardenConfig {
    /// Load configuration from defaults, `warden.toml`, the environment and
    /// `WARDEN_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the merged values fail
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(WardenConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            figment = figment.merge(Toml::file(path));
        }

        let config: WardenConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file over the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: WardenConfig = Figment::from(Serialized::defaults(WardenConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        self.security.validate()
    }
}
