//! procon CLI
//!
//! Runs programs and judges submissions against problem files in IOI isolate
//! sandboxes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procon::{
    Config, EXAMPLE_CONFIG, ExecutionRequest, Executor, GuestLedger, Judge, JudgeError,
    LanguageId, MemoryRecorder, Outcome, Problem, ResourceLimits, SandboxExecutor, Submission,
    SubmissionRecorder, Verdict, prepare_cgroup,
};
use tokio::task::JoinSet;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procon")]
#[command(about = "Judge submissions in isolate sandboxes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "procon.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// List available languages
    Languages,

    /// Show the effective configuration
    ShowConfig,

    /// Run a program once (compile if needed, then execute)
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Language ID (python, cpp, c); inferred from the file extension if omitted
        #[arg(short, long)]
        language: Option<LanguageId>,

        /// Input file (default: empty input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Wall-clock limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Memory limit in KB
        #[arg(short, long)]
        memory_limit: Option<u64>,
    },

    /// Judge one or more submissions against a problem file
    Judge {
        /// Problem definition (TOML)
        #[arg(value_name = "PROBLEM")]
        problem: PathBuf,

        /// Submission source files, judged concurrently
        #[arg(value_name = "SOURCE", required = true)]
        sources: Vec<PathBuf>,

        /// Language ID for every source; inferred per file if omitted
        #[arg(short, long)]
        language: Option<LanguageId>,

        /// Record verdicts for this user
        #[arg(short, long, default_value = "local", conflicts_with = "session")]
        user: String,

        /// Score verdicts in an anonymous guest session instead
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    if config.sandbox.cgroup {
        let ready = prepare_cgroup(&config.sandbox.cg_root)
            .inspect_err(|e| warn!("cgroup setup failed: {e}"))
            .unwrap_or(false);
        if ready {
            debug!(cg_root = %config.sandbox.cg_root.display(), "cgroup hierarchy ready");
        } else {
            warn!("memory controller unavailable, limiting address space instead");
            config.sandbox.cgroup = false;
        }
    }

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Languages => {
            list_languages(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
        Commands::Run {
            source,
            language,
            input,
            time_limit,
            memory_limit,
        } => {
            run_program(
                config,
                &source,
                language,
                input.as_deref(),
                time_limit,
                memory_limit,
            )
            .await
        }
        Commands::Judge {
            problem,
            sources,
            language,
            user,
            session,
        } => judge_sources(config, &problem, sources, language, &user, session.as_deref()).await,
    }
}

/// Pick the language whose configured extension matches the file
fn infer_language(config: &Config, path: &Path) -> Result<LanguageId> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("'{}' has no file extension", path.display()))?;

    config
        .language_for_extension(ext)
        .with_context(|| format!("no language configured for '.{ext}' files"))
}

async fn run_program(
    config: Config,
    source: &Path,
    language: Option<LanguageId>,
    input: Option<&Path>,
    time_limit: Option<f64>,
    memory_limit: Option<u64>,
) -> Result<()> {
    let language = match language {
        Some(id) => id,
        None => infer_language(&config, source)?,
    };

    let code = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;
    let input = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .context("failed to read input file")?,
        None => String::new(),
    };

    // Only explicitly given values, so per-language limits still apply
    let mut limits = ResourceLimits::default();
    if let Some(seconds) = time_limit {
        limits = limits.time(seconds);
    }
    if let Some(kb) = memory_limit {
        limits = limits.memory_kb(kb);
    }

    let executor = SandboxExecutor::new(config);
    if !executor.supports(language) {
        anyhow::bail!("language '{language}' is not configured");
    }

    info!(%language, "running program");
    let request = ExecutionRequest::new(language, code, input).with_limits(limits);
    let result = executor.execute(&request).await;
    executor.shutdown();

    print!("{}", result.output);
    if !result.diagnostic.is_empty() {
        eprintln!("{}", result.diagnostic);
    }

    // Keep stdout clean for piping
    info!(
        outcome = ?result.outcome,
        elapsed = format_args!("{:.3}s", result.elapsed.as_secs_f64()),
        "execution result"
    );

    if result.outcome == Outcome::Completed {
        Ok(())
    } else {
        std::io::stdout().flush().context("failed to flush stdout")?;
        std::process::exit(1);
    }
}

async fn judge_sources(
    config: Config,
    problem_path: &Path,
    sources: Vec<PathBuf>,
    language: Option<LanguageId>,
    user: &str,
    session: Option<&str>,
) -> Result<()> {
    let problem = Arc::new(Problem::from_file(problem_path).context("failed to load problem")?);
    info!(
        problem = problem.id,
        title = %problem.title,
        cases = problem.test_cases.len(),
        "loaded problem"
    );

    let mut submissions = Vec::with_capacity(sources.len());
    for path in sources {
        let language = match language {
            Some(id) => id,
            None => infer_language(&config, &path)?,
        };
        let code = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        submissions.push((path, language, code));
    }

    let settings = config.judge.clone();
    let judge = Arc::new(Judge::new(SandboxExecutor::new(config), settings));

    let mut tasks = JoinSet::new();
    for (index, (path, language, code)) in submissions.into_iter().enumerate() {
        let judge = Arc::clone(&judge);
        let problem = Arc::clone(&problem);
        tasks.spawn(async move {
            let verdict = judge.judge(&problem, &code, language).await;
            (index, path, language, code, verdict)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.context("judging task panicked")?);
    }
    results.sort_by_key(|(index, ..)| *index);
    judge.executor().shutdown();

    let recorder = MemoryRecorder::new();
    let ledger = GuestLedger::new();
    let mut all_accepted = true;

    for (_, path, language, code, verdict) in results {
        let Some(verdict) = settle(&path, verdict) else {
            all_accepted = false;
            continue;
        };
        println!("{}: {}", path.display(), verdict.message());
        all_accepted &= verdict.is_accepted();

        match session {
            Some(session) => {
                ledger.apply(session, problem.id, &verdict);
            }
            None => {
                let submission =
                    Submission::new(problem.id, user, code, language).with_verdict(&verdict);
                recorder
                    .record(submission)
                    .await
                    .context("failed to record submission")?;
            }
        }
    }

    match session {
        Some(session) => println!(
            "Guest session '{session}': score {}, solved {:?}",
            ledger.score(session),
            ledger.solved(session)
        ),
        None => println!(
            "User '{user}': score {}, solved {:?}",
            recorder.user_score(user).await?,
            recorder.solved_problems(user).await?
        ),
    }

    if all_accepted {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Unwrap one source's verdict, reporting a failure to judge it so the
/// remaining sources still get theirs
fn settle(path: &Path, verdict: Result<Verdict, JudgeError>) -> Option<Verdict> {
    match verdict {
        Ok(verdict) => Some(verdict),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "submission not judged");
            println!("{}: not judged ({e})", path.display());
            None
        }
    }
}

fn list_languages(config: &Config) {
    if config.languages.is_empty() {
        println!("No languages configured");
        return;
    }

    for (id, language) in &config.languages {
        let steps = match language.compile {
            Some(ref step) => format!(
                "{} -> {}",
                step.command.join(" "),
                language.run.command.join(" ")
            ),
            None => language.run.command.join(" "),
        };
        println!("{id:<8} {:<12} *.{:<5} {steps}", language.name, language.extension);
    }
}

fn show_config(config: &Config) {
    let sandbox = &config.sandbox;
    println!("[sandbox]");
    println!("  binary        {}", sandbox.binary.display());
    println!("  boxes         {:?}", sandbox.box_ids());
    if sandbox.cgroup {
        println!("  cgroup        {}", sandbox.cg_root.display());
    } else {
        println!("  cgroup        off");
    }
    println!("  mounts        {}", sandbox.mounts.len());

    let judge = &config.judge;
    println!("[judge]");
    println!("  threshold     {}s", judge.scoring_threshold);
    println!("  hard limit    {}s", judge.hard_time_limit);
    println!("  merge stderr  {}", judge.merge_stderr);

    let limits = &config.limits;
    println!("[limits]");
    let show = |name: &str, value: Option<String>| {
        println!("  {name:<13} {}", value.as_deref().unwrap_or("-"));
    };
    show("cpu time", limits.cpu_time.map(|s| format!("{s}s")));
    show("wall time", limits.wall_time.map(|s| format!("{s}s")));
    show("memory", limits.memory_kb.map(|kb| format!("{kb} KB")));
    show("stack", limits.stack_kb.map(|kb| format!("{kb} KB")));
    show("output", limits.output_kb.map(|kb| format!("{kb} KB")));
    show("processes", limits.processes.map(|n| n.to_string()));

    println!("{} languages configured", config.languages.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(output).await.unwrap_or(false) {
        anyhow::bail!("'{}' exists; pass --force to replace it", output.display());
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .with_context(|| format!("could not write '{}'", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_source_is_skipped_not_fatal() {
        let path = Path::new("empty.py");
        assert_eq!(settle(path, Err(JudgeError::NoTestCases(7))), None);
        assert_eq!(
            settle(path, Ok(Verdict::accepted(100))),
            Some(Verdict::accepted(100))
        );
    }

    #[test]
    fn extension_picks_the_language() {
        let config = Config::default();
        assert_eq!(
            infer_language(&config, Path::new("sol.cpp")).unwrap(),
            LanguageId::Cpp
        );
        assert!(infer_language(&config, Path::new("Makefile")).is_err());
        assert!(infer_language(&config, Path::new("main.rs")).is_err());
    }
}
