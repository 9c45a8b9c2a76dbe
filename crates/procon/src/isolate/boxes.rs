//! Box lifecycle

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::isolate::pool::BoxLease;
use crate::isolate::{IsolateCommand, IsolateError, spawn};

/// Where the box directory appears inside the sandbox
const BOX_MOUNT: &str = "/box";

/// An initialized isolate box.
///
/// Call [`cleanup()`](Self::cleanup) when done. A box dropped while still
/// initialized is cleaned up on a background thread instead.
#[derive(Debug)]
pub struct IsolateBox {
    command: IsolateCommand,
    /// Host directory isolate created for the box
    root: PathBuf,
    live: bool,
    lease: Option<BoxLease>,
}

impl IsolateBox {
    #[instrument(skip_all, fields(box_id = command.box_id()))]
    pub async fn init(command: IsolateCommand) -> Result<Self, IsolateError> {
        let id = command.box_id();
        let output = spawn(&command.init()).await?;
        let init_failed = |message: String| IsolateError::InitFailed { id, message };

        if !output.status.success() {
            return Err(init_failed(
                String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            ));
        }

        // isolate prints the box directory on success
        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        if !root.is_dir() {
            return Err(init_failed(format!(
                "box directory {} does not exist",
                root.display()
            )));
        }

        debug!(root = %root.display(), "box initialized");
        Ok(Self {
            command,
            root,
            live: true,
            lease: None,
        })
    }

    pub(crate) fn leased(mut self, lease: BoxLease) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn id(&self) -> u32 {
        self.command.box_id()
    }

    pub fn command(&self) -> &IsolateCommand {
        &self.command
    }

    /// Host directory of the box
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Host path of a file in the box's working directory
    pub fn host_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        Ok(self.root.join("box").join(plain_name(name)?))
    }

    /// The same file as the sandboxed program sees it
    pub fn inner_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        Ok(Path::new(BOX_MOUNT).join(plain_name(name)?))
    }

    pub fn working_dir(&self) -> &'static str {
        BOX_MOUNT
    }

    #[instrument(skip(self, content), fields(box_id = self.id(), len = content.len()))]
    pub async fn write(&self, name: &str, content: &[u8]) -> Result<(), IsolateError> {
        tokio::fs::write(self.host_path(name)?, content).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, IsolateError> {
        Ok(tokio::fs::read(self.host_path(name)?).await?)
    }

    pub async fn contains(&self, name: &str) -> Result<bool, IsolateError> {
        Ok(tokio::fs::try_exists(self.host_path(name)?).await?)
    }

    /// Tear the box down and hand its ID back to the pool
    #[must_use = "cleanup errors should be handled"]
    #[instrument(skip(self), fields(box_id = self.id()))]
    pub async fn cleanup(&mut self) -> Result<(), IsolateError> {
        if !self.live {
            return Ok(());
        }

        let output = spawn(&self.command.cleanup()).await?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            warn!(%message, "cleanup failed");
            return Err(IsolateError::CleanupFailed {
                id: self.id(),
                message,
            });
        }

        self.live = false;
        self.lease = None;
        debug!("box cleaned up");
        Ok(())
    }
}

impl Drop for IsolateBox {
    fn drop(&mut self) {
        if !self.live {
            return;
        }

        let id = self.id();
        warn!(box_id = id, "box dropped while live, cleaning up in the background");

        let args = self.command.cleanup();
        // Keep the ID leased until the box is really gone
        let lease = self.lease.take();
        std::thread::spawn(move || {
            let Some((program, rest)) = args.split_first() else {
                return;
            };
            match std::process::Command::new(program).args(rest).output() {
                Ok(output) if output.status.success() => {
                    debug!(box_id = id, "background cleanup done");
                }
                Ok(output) => warn!(
                    box_id = id,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "background cleanup failed"
                ),
                Err(e) => warn!(box_id = id, error = %e, "background cleanup could not start"),
            }
            drop(lease);
        });
    }
}

/// Box files are addressed by plain relative names
fn plain_name(name: &str) -> Result<&str, IsolateError> {
    if name.is_empty() || name.starts_with('/') || name.split('/').any(|part| part == "..") {
        return Err(IsolateError::InvalidPath(name.to_owned()));
    }
    Ok(name)
}
