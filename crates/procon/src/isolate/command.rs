//! Isolate argv construction
//!
//! Programs are passed as argv after `--`, never through a shell. Nothing here
//! emits `--share-net`, so every run is cut off from the network.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::isolate::Mount;
use crate::limits::ResourceLimits;

/// How isolate addresses one box: the binary, the box ID and whether the box
/// lives in a cgroup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolateCommand {
    binary: PathBuf,
    box_id: u32,
    cgroup: bool,
}

impl IsolateCommand {
    pub fn new(binary: impl Into<PathBuf>, box_id: u32, cgroup: bool) -> Self {
        Self {
            binary: binary.into(),
            box_id,
            cgroup,
        }
    }

    pub fn box_id(&self) -> u32 {
        self.box_id
    }

    pub fn init(&self) -> Vec<String> {
        self.action("--init")
    }

    pub fn cleanup(&self) -> Vec<String> {
        self.action("--cleanup")
    }

    /// Argv for running `invocation` with its files wired as in `io`
    pub fn run(&self, invocation: &Invocation, io: &Redirects) -> Vec<String> {
        let mut args = self.action("--run");

        args.extend(invocation.limits.isolate_flags(self.cgroup));
        args.extend(invocation.mounts.iter().filter_map(Mount::dir_flag));
        args.extend(
            invocation
                .env
                .iter()
                .map(|(key, value)| format!("--env={key}={value}")),
        );

        args.push(format!("--meta={}", io.meta.display()));
        if let Some(ref stdin) = io.stdin {
            args.push(format!("--stdin={}", stdin.display()));
        }
        args.push(format!("--stdout={}", io.stdout.display()));
        if invocation.merge_stderr {
            args.push("--stderr-to-stdout".to_owned());
        } else {
            args.push(format!("--stderr={}", io.stderr.display()));
        }
        if let Some(ref dir) = invocation.chdir {
            args.push(format!("--chdir={dir}"));
        }

        args.push("--".to_owned());
        args.extend(invocation.program.iter().cloned());
        args
    }

    fn action(&self, action: &str) -> Vec<String> {
        let mut args = vec![
            self.binary.to_string_lossy().into_owned(),
            format!("--box-id={}", self.box_id),
        ];
        if self.cgroup {
            args.push("--cg".to_owned());
        }
        args.push(action.to_owned());
        args
    }
}

/// The program side of one `--run`: what to execute and under which
/// constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub program: Vec<String>,
    pub limits: ResourceLimits,
    pub mounts: Vec<Mount>,
    pub env: BTreeMap<String, String>,
    /// Working directory inside the box
    pub chdir: Option<String>,
    /// Send stderr into the stdout file
    pub merge_stderr: bool,
}

impl Invocation {
    pub fn new(program: Vec<String>) -> Self {
        Self {
            program,
            ..Self::default()
        }
    }

    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn mounts<'a>(mut self, mounts: impl IntoIterator<Item = &'a Mount>) -> Self {
        self.mounts.extend(mounts.into_iter().cloned());
        self
    }

    /// Add variables; later values replace earlier ones with the same name
    pub fn env<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn chdir(mut self, dir: &str) -> Self {
        self.chdir = Some(dir.to_owned());
        self
    }

    pub fn merge_stderr(mut self, merge: bool) -> Self {
        self.merge_stderr = merge;
        self
    }
}

/// Files a run reads and writes, as paths inside the sandbox except `meta`,
/// which isolate writes from the host side
#[derive(Debug, Clone, PartialEq)]
pub struct Redirects {
    pub meta: PathBuf,
    pub stdin: Option<PathBuf>,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}
