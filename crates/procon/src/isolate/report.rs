//! What isolate says about a finished run

use std::fmt;

use crate::isolate::meta::MetaFile;

/// Two-letter run status from the meta file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolateStatus {
    /// No status line; the program exited on its own
    #[default]
    Ok,
    /// `RE`: non-zero exit code
    RuntimeError,
    /// `TO`: a time limit fired
    TimedOut,
    /// `SG`: killed by a signal
    Signaled,
    /// `XX`, or anything isolate added after this was written
    InternalError,
}

impl IsolateStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "OK" => Self::Ok,
            "RE" => Self::RuntimeError,
            "TO" => Self::TimedOut,
            "SG" => Self::Signaled,
            _ => Self::InternalError,
        }
    }
}

/// The resource limit a run ran into, if any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LimitHit {
    #[default]
    Within,
    CpuTime,
    WallTime,
    Memory,
    Output,
}

impl LimitHit {
    /// Guess the limit from isolate's free-form `message`
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("time limit") {
            if message.contains("wall") {
                Self::WallTime
            } else {
                Self::CpuTime
            }
        } else if message.contains("memory") {
            Self::Memory
        } else if message.contains("output") {
            Self::Output
        } else {
            Self::Within
        }
    }

    pub fn is_hit(&self) -> bool {
        *self != Self::Within
    }
}

impl fmt::Display for LimitHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Within => "no",
            Self::CpuTime => "CPU time",
            Self::WallTime => "wall time",
            Self::Memory => "memory",
            Self::Output => "output",
        })
    }
}

/// One sandboxed process run, as seen through its meta file and captured
/// streams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SandboxReport {
    pub status: IsolateStatus,
    pub limit: LimitHit,
    /// CPU seconds
    pub cpu_time: f64,
    /// Wall-clock seconds according to isolate
    pub wall_time: f64,
    /// Peak memory; the cgroup figure when available, else max RSS
    pub memory_kb: u64,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub message: Option<String>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl SandboxReport {
    /// A run that needed no process, such as the compile step of an
    /// interpreted language
    pub fn skipped() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == IsolateStatus::Ok && self.exit_code == Some(0)
    }

    /// Attribute a failed run to the memory ceiling when its peak usage got
    /// there. Isolate itself often reports only the resulting signal.
    pub fn blame_memory(&mut self, limit_kb: u64) {
        if !self.is_success() && !self.limit.is_hit() && self.memory_kb >= limit_kb {
            self.limit = LimitHit::Memory;
        }
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// One line explaining why the run failed
    pub fn failure_reason(&self) -> String {
        let mut reason = match (&self.message, self.signal, self.exit_code) {
            (Some(message), _, _) => message.clone(),
            (None, Some(signal), _) => format!("killed by signal {signal}"),
            (None, None, Some(code)) => format!("exited with code {code}"),
            (None, None, None) => format!("isolate status {:?}", self.status),
        };
        if self.limit.is_hit() {
            reason.push_str(&format!(" ({} limit)", self.limit));
        }
        reason
    }
}

impl From<&MetaFile> for SandboxReport {
    fn from(meta: &MetaFile) -> Self {
        let status = meta
            .get("status")
            .map_or(IsolateStatus::Ok, IsolateStatus::from_code);
        let message = meta.get("message").map(str::to_owned);

        let limit = match message.as_deref().map(LimitHit::from_message) {
            Some(hit) if hit.is_hit() => hit,
            _ if status == IsolateStatus::TimedOut => LimitHit::CpuTime,
            _ => LimitHit::Within,
        };

        Self {
            status,
            limit,
            cpu_time: meta.value("time").unwrap_or(0.0),
            wall_time: meta.value("time-wall").unwrap_or(0.0),
            memory_kb: meta
                .value("cg-mem")
                .or_else(|| meta.value("max-rss"))
                .unwrap_or(0),
            exit_code: meta.value("exitcode"),
            signal: meta.value("exitsig"),
            message,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}
