//! Judge configuration
//!
//! One TOML file describes the sandbox backend, the ceilings for submission
//! runs, the judging policy and the language toolchains. Every section is
//! optional.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{
    CompileStep, DEFAULT_SANDBOX_PATH, Extension, INPUT_FILE, Language, LanguageId, RunStep,
    TIMEOUT_SENTINEL,
};
use crate::isolate::{BoxPool, Mount};
use crate::limits::ResourceLimits;

pub mod language;
mod loader;

/// The configuration shipped with procon; also what [`Config::default`] loads
pub const EXAMPLE_CONFIG: &str = include_str!("../../procon.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid file extension '{0}'")]
    InvalidExtension(String),

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Ceilings for submission runs, below any per-language or per-request
    /// limits
    #[serde(default = "ResourceLimits::submission")]
    pub limits: ResourceLimits,

    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub languages: BTreeMap<LanguageId, Language>,
}

/// The isolate installation and the boxes procon may use
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    /// isolate binary, looked up in PATH when relative
    pub binary: PathBuf,

    /// Limit memory through cgroups rather than address-space limits, which
    /// runtimes that reserve large virtual regions cannot live with
    pub cgroup: bool,

    /// Must match `cg_root` in isolate's own configuration
    pub cg_root: PathBuf,

    pub first_box_id: u32,

    /// Boxes alive at once; also the number of concurrent runs
    pub pool_size: u32,

    /// Mounted into every box, compile and run steps alike
    pub mounts: Vec<Mount>,
}

impl SandboxConfig {
    /// Box IDs the pool hands out, clamped at `u32::MAX`
    pub fn box_ids(&self) -> Range<u32> {
        self.first_box_id..self.first_box_id.saturating_add(self.pool_size)
    }

    pub fn pool(&self) -> BoxPool {
        BoxPool::new(self.first_box_id, self.pool_size, &self.binary, self.cgroup)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("isolate"),
            cgroup: false,
            cg_root: PathBuf::from("/sys/fs/cgroup/isolate"),
            first_box_id: 0,
            pool_size: 4,
            mounts: Vec::new(),
        }
    }
}

/// Judging policy
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    /// Seconds of wall-clock time above which a correct run earns half
    /// credit, for problems without their own time limit
    pub scoring_threshold: f64,

    /// Seconds after which the sandbox kills a run
    pub hard_time_limit: f64,

    /// Judge stderr together with stdout
    pub merge_stderr: bool,
}

const DEFAULT_SCORING_THRESHOLD: f64 = 2.0;
const DEFAULT_HARD_TIME_LIMIT: f64 = 10.0;

impl JudgeConfig {
    /// The configured threshold, or the built-in one when it is not a
    /// positive, representable duration
    pub fn scoring_threshold(&self) -> Duration {
        Duration::try_from_secs_f64(self.scoring_threshold)
            .ok()
            .filter(|threshold| !threshold.is_zero())
            .unwrap_or(Duration::from_secs_f64(DEFAULT_SCORING_THRESHOLD))
    }

    /// Limits for a run judged against `threshold`: the hard ceiling as both
    /// CPU and wall time. The ceiling is raised to twice the threshold when
    /// it would otherwise kill runs that still deserve partial credit.
    pub fn hard_limits(&self, threshold: Duration) -> ResourceLimits {
        let ceiling = if self.hard_time_limit.is_finite() && self.hard_time_limit > 0.0 {
            self.hard_time_limit
        } else {
            DEFAULT_HARD_TIME_LIMIT
        };
        ResourceLimits::default().time(ceiling.max(2.0 * threshold.as_secs_f64()))
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            scoring_threshold: DEFAULT_SCORING_THRESHOLD,
            hard_time_limit: DEFAULT_HARD_TIME_LIMIT,
            merge_stderr: false,
        }
    }
}

impl Config {
    /// Default sandbox and policy with no languages
    pub fn empty() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            limits: ResourceLimits::submission(),
            judge: JudgeConfig::default(),
            languages: BTreeMap::new(),
        }
    }

    pub fn language(&self, id: LanguageId) -> Result<&Language, ConfigError> {
        self.languages
            .get(&id)
            .ok_or_else(|| ConfigError::UnsupportedLanguage(id.to_string()))
    }

    /// Language whose source files carry `extension`
    pub fn language_for_extension(&self, extension: &str) -> Option<LanguageId> {
        self.languages
            .iter()
            .find(|(_, language)| language.extension.as_str() == extension)
            .map(|(id, _)| *id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded example config is valid")
    }
}
