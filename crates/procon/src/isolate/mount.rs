//! Host directories bound into a box

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::isolate::IsolateError;

/// A host directory made visible inside the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mount {
    /// Directory on the host
    pub source: PathBuf,

    /// Where it appears inside the box
    pub target: String,

    #[serde(default)]
    pub writable: bool,

    /// Skip the mount instead of failing when `source` is missing
    #[serde(default)]
    pub optional: bool,
}

impl Mount {
    /// Read-only mount of `source` at `target`
    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            writable: false,
            optional: false,
        }
    }

    /// The `--dir` flag for this mount, or `None` when it is optional and
    /// its source does not exist
    pub fn dir_flag(&self) -> Option<String> {
        if self.optional && !self.source.exists() {
            return None;
        }

        let mut flag = format!("--dir={}={}", self.target, self.source.display());
        if self.writable {
            flag.push_str(":rw");
        }
        if self.optional {
            flag.push_str(":maybe");
        }
        Some(flag)
    }

    /// Fail early when a required source directory is missing
    pub fn verify(&self) -> Result<(), IsolateError> {
        if self.optional || self.source.exists() {
            return Ok(());
        }
        Err(IsolateError::MountSourceNotFound(
            self.source.display().to_string(),
        ))
    }
}
