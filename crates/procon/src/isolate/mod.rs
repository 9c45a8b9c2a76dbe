//! IOI Isolate backend
//!
//! See <https://www.ucw.cz/isolate/isolate.1.html> for the command line and the
//! meta-file format.

use std::fs;
use std::path::Path;
use std::process::{Output, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

pub use crate::isolate::boxes::IsolateBox;
pub use crate::isolate::command::{Invocation, IsolateCommand, Redirects};
pub use crate::isolate::meta::MetaFile;
pub use crate::isolate::mount::Mount;
pub use crate::isolate::pool::BoxPool;
pub use crate::isolate::report::{IsolateStatus, LimitHit, SandboxReport};
pub use crate::isolate::step::{StepFiles, run_step};

mod boxes;
mod command;
mod meta;
mod mount;
mod pool;
mod report;
mod step;

#[derive(Debug, Error)]
pub enum IsolateError {
    #[error("failed to initialize box {id}: {message}")]
    InitFailed { id: u32, message: String },

    #[error("failed to clean up box {id}: {message}")]
    CleanupFailed { id: u32, message: String },

    #[error("isolate command failed: {0}")]
    CommandFailed(String),

    #[error("failed to spawn isolate: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("program '{0}' not found in PATH")]
    ProgramNotFound(String),

    #[error("'{0}' was not produced in the box")]
    MissingArtifact(String),

    #[error("sandbox pool is closed")]
    PoolClosed,

    #[error("invalid box file name '{0}'")]
    InvalidPath(String),

    #[error("mount source does not exist: {0}")]
    MountSourceNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run one isolate command line to completion
pub(crate) async fn spawn(args: &[String]) -> Result<Output, IsolateError> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| IsolateError::CommandFailed("empty argv".to_owned()))?;
    Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)
}

const CGROUP_FS: &str = "/sys/fs/cgroup";
const DELEGATED_CONTROLLERS: &str = "+memory +pids";

/// Delegate the memory and pids controllers to `cg_root`, as
/// `isolate-cg-keeper` would.
///
/// Returns `Ok(false)` when there is no cgroup v2 hierarchy with a memory
/// controller; callers then fall back to per-process address-space limits.
pub fn prepare_cgroup(cg_root: &Path) -> Result<bool, IsolateError> {
    let base = Path::new(CGROUP_FS);
    let Ok(available) = fs::read_to_string(base.join("cgroup.controllers")) else {
        return Ok(false);
    };
    if !lists_controller(&available, "memory") {
        return Ok(false);
    }

    let delegated = fs::read_to_string(cg_root.join("cgroup.subtree_control")).unwrap_or_default();
    if lists_controller(&delegated, "memory") {
        debug!(cg_root = %cg_root.display(), "cgroup already delegated");
        return Ok(true);
    }

    // Controllers cannot be enabled on a cgroup that has member processes,
    // so this process moves into a leaf first
    let leaf = base.join("init");
    fs::create_dir_all(&leaf)?;
    fs::write(leaf.join("cgroup.procs"), std::process::id().to_string())?;
    fs::write(base.join("cgroup.subtree_control"), DELEGATED_CONTROLLERS)?;

    fs::create_dir_all(cg_root)?;
    fs::write(cg_root.join("cgroup.subtree_control"), DELEGATED_CONTROLLERS)?;

    info!(cg_root = %cg_root.display(), "delegated memory and pids controllers");
    Ok(true)
}

fn lists_controller(list: &str, name: &str) -> bool {
    list.split_whitespace().any(|controller| controller == name)
}

/// Replace a bare program name in `argv` with its absolute host path.
///
/// isolate calls `execve` directly, which does no PATH lookup. Names that
/// already contain a `/` (like `./sol.out`) are left alone.
pub fn resolve_program(argv: &mut [String]) -> Result<(), IsolateError> {
    let Some(program) = argv.first_mut() else {
        return Ok(());
    };
    if program.contains('/') {
        return Ok(());
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    let found = std::env::split_paths(&search)
        .map(|dir| dir.join(&*program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| IsolateError::ProgramNotFound(program.clone()))?;

    // Symlinks may point outside the directories mounted into the box
    *program = fs::canonicalize(&found)
        .unwrap_or(found)
        .to_string_lossy()
        .into_owned();
    Ok(())
}
