//! Sandboxed execution and verdict engine for an online judge.
//!
//! procon takes untrusted source code, runs it against a problem's test cases
//! inside IOI Isolate sandboxes, and turns the results into a verdict and a
//! score.
//!
//! # Features
//!
//! - **Sandboxed execution**: every test case runs in a fresh box with no network, a memory ceiling and a hard wall-clock ceiling.
//! - **Toolchains**: Python, C++ and C out of the box, configured in TOML.
//! - **Verdicts**: AC, WA, TLE (with half credit for slow but correct runs), RE and CE, short-circuiting on the first failing test.
//! - **Scoring**: a recorder trait for signed-in users and a session ledger for guests.
//! - **cgroup v2 support**: memory limiting in container environments.
//!
//! # Example
//!
//! ```no_run
//! use procon::{Config, Judge, LanguageId, Problem, SandboxExecutor, TestCase};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let judge = Judge::new(SandboxExecutor::new(config.clone()), config.judge.clone());
//!
//! let problem = Problem::new(1, "Double it").with_test_case(TestCase::new("50\n", "100\n"));
//! let source = "#include <stdio.h>\nint main(){int n;scanf(\"%d\",&n);printf(\"%d\\n\",n*2);}";
//!
//! let verdict = judge.judge(&problem, source, LanguageId::C).await?;
//! println!("{}", verdict.message());
//! # Ok(())
//! # }
//! ```

pub use config::{
    Config, ConfigError, EXAMPLE_CONFIG, JudgeConfig, Language, LanguageId, SandboxConfig,
};
pub use isolate::{BoxPool, IsolateBox, IsolateError, LimitHit, Mount, prepare_cgroup};
pub use judge::{Judge, JudgeError, Problem, ProblemError, SubmissionStatus, TestCase, Verdict};
pub use record::{
    GuestLedger, MemoryRecorder, RecordError, Submission, SubmissionId, SubmissionRecorder,
};
pub use limits::ResourceLimits;
pub use sandbox::{ExecutionRequest, ExecutionResult, Executor, Outcome, SandboxExecutor};

pub mod config;
pub mod isolate;
pub mod judge;
pub mod limits;
pub mod record;
pub mod sandbox;
