//! One batch run inside a box
//!
//! stdin comes from a file in the box; stdout, stderr and the meta file land
//! in the box and are read back once isolate exits.

use tracing::{debug, instrument};

use crate::config::INPUT_FILE;
use crate::isolate::{
    Invocation, IsolateBox, IsolateError, MetaFile, Redirects, SandboxReport, spawn,
};

/// Box file names used by one kind of step
#[derive(Debug, Clone, Copy)]
pub struct StepFiles {
    /// Fed to stdin; the step gets no stdin when `None`
    pub stdin: Option<&'static str>,
    pub stdout: &'static str,
    pub stderr: &'static str,
    pub meta: &'static str,
}

impl StepFiles {
    pub const COMPILE: StepFiles = StepFiles {
        stdin: None,
        stdout: "compile_stdout.txt",
        stderr: "compile_stderr.txt",
        meta: "compile_meta.txt",
    };

    pub const RUN: StepFiles = StepFiles {
        stdin: Some(INPUT_FILE),
        stdout: "stdout.txt",
        stderr: "stderr.txt",
        meta: "meta.txt",
    };

    fn redirects(&self, sandbox: &IsolateBox) -> Result<Redirects, IsolateError> {
        Ok(Redirects {
            meta: sandbox.host_path(self.meta)?,
            stdin: self.stdin.map(|name| sandbox.inner_path(name)).transpose()?,
            stdout: sandbox.inner_path(self.stdout)?,
            stderr: sandbox.inner_path(self.stderr)?,
        })
    }
}

/// Run `invocation` in `sandbox` and collect what isolate reported
#[instrument(skip_all, fields(box_id = sandbox.id()))]
pub async fn run_step(
    sandbox: &IsolateBox,
    invocation: &Invocation,
    files: StepFiles,
) -> Result<SandboxReport, IsolateError> {
    let io = files.redirects(sandbox)?;
    let args = sandbox.command().run(invocation, &io);
    debug!(?args, "running isolate");

    let output = spawn(&args).await?;

    // isolate writes the meta file for every run it manages to start
    if !tokio::fs::try_exists(&io.meta).await? {
        return Err(IsolateError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }

    let mut report = SandboxReport::from(&MetaFile::load(&io.meta).await?);
    if sandbox.contains(files.stdout).await? {
        report.stdout = sandbox.read(files.stdout).await?;
    }
    if !invocation.merge_stderr && sandbox.contains(files.stderr).await? {
        report.stderr = sandbox.read(files.stderr).await?;
    }

    debug!(
        status = ?report.status,
        cpu_time = report.cpu_time,
        wall_time = report.wall_time,
        memory_kb = report.memory_kb,
        exit_code = ?report.exit_code,
        "isolate run finished"
    );
    Ok(report)
}
