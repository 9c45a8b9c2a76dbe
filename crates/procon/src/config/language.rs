//! Language toolchains
//!
//! Each [`LanguageId`] maps to the commands that build and run a submission
//! inside a box. The submission is always stored as `sol.<extension>`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::isolate::Mount;
use crate::limits::ResourceLimits;

/// Marker placed in captured output when the hard execution ceiling fires.
///
/// Real programs never print it, so the verdict engine can match on it to tell
/// a killed run apart from legitimate output.
pub const TIMEOUT_SENTINEL: &str = "---TLE_DETECTED---";

/// Name of the stdin file materialized next to the source in every box
pub const INPUT_FILE: &str = "input.txt";

/// PATH inside the sandbox unless a run step sets its own
pub const DEFAULT_SANDBOX_PATH: &str = "/usr/bin:/bin";

const SOURCE_STEM: &str = "sol";

/// Supported submission languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    Python,
    Cpp,
    C,
}

impl LanguageId {
    pub const ALL: [LanguageId; 3] = [LanguageId::Python, LanguageId::Cpp, LanguageId::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::Python => "python",
            LanguageId::Cpp => "cpp",
            LanguageId::C => "c",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedLanguage(s.to_string()))
    }
}

/// Source file extension, without the dot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(String);

impl Extension {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Extension {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidExtension(value))
        }
    }
}

impl From<Extension> for String {
    fn from(extension: Extension) -> Self {
        extension.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Toolchain for one language
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Language {
    /// Display name, e.g. "C++ (GCC)"
    pub name: String,

    pub extension: Extension,

    /// Absent for interpreted languages
    #[serde(default)]
    pub compile: Option<CompileStep>,

    pub run: RunStep,
}

/// Builds the source into an artifact.
///
/// `command` may use `{source}` and `{output}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileStep {
    pub command: Vec<String>,

    /// Artifact file name in the box
    #[serde(default = "default_artifact")]
    pub output: String,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Laid over the compiler ceilings
    #[serde(default)]
    pub limits: ResourceLimits,
}

/// Runs the artifact, or the interpreter on the source.
///
/// `command` may use `{source}` and `{binary}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunStep {
    pub command: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Extra mounts a runtime needs, on top of the sandbox-wide ones
    #[serde(default)]
    pub mounts: Vec<Mount>,

    /// PATH inside the box
    #[serde(default = "default_sandbox_path")]
    pub path: String,

    /// Laid over the configured submission ceilings
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl Language {
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// `sol.<extension>`
    pub fn source_file(&self) -> String {
        format!("{SOURCE_STEM}.{}", self.extension)
    }

    /// What the run step executes or interprets: the compiled artifact, or
    /// the source itself
    pub fn artifact(&self) -> String {
        match self.compile {
            Some(ref compile) => compile.output.clone(),
            None => self.source_file(),
        }
    }

    pub fn compile_argv(&self) -> Option<Vec<String>> {
        self.compile
            .as_ref()
            .map(|compile| self.expand(&compile.command))
    }

    pub fn run_argv(&self) -> Vec<String> {
        self.expand(&self.run.command)
    }

    fn expand(&self, template: &[String]) -> Vec<String> {
        let source = self.source_file();
        let artifact = self.artifact();
        template
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source)
                    .replace("{output}", &artifact)
                    .replace("{binary}", &artifact)
            })
            .collect()
    }
}

fn default_artifact() -> String {
    format!("{SOURCE_STEM}.out")
}

fn default_sandbox_path() -> String {
    DEFAULT_SANDBOX_PATH.to_owned()
}
