use procon::config::LanguageId;
use procon::judge::{Judge, JudgeError, Problem, SubmissionStatus, TestCase};
use procon::record::{GuestLedger, MemoryRecorder, Submission, SubmissionRecorder};
use procon::sandbox::SandboxExecutor;

use super::{FIXTURES_PATH, fixture_source, test_config};

fn judge(first_box_id: u32) -> Judge<SandboxExecutor> {
    let config = test_config(first_box_id);
    let settings = config.judge.clone();
    Judge::new(SandboxExecutor::new(config), settings)
}

fn double_once() -> Problem {
    Problem::new(1, "Double it")
        .with_score(100)
        .with_test_case(TestCase::new("50", "100"))
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_correct_c_submission_is_accepted() {
    let verdict = judge(70)
        .judge(&double_once(), &fixture_source("double.c"), LanguageId::C)
        .await
        .unwrap();

    assert_eq!(verdict.status, SubmissionStatus::Accepted, "{}", verdict.detail);
    assert_eq!(verdict.score, 100);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_slow_submission_gets_half_credit() {
    let verdict = judge(74)
        .judge(&double_once(), &fixture_source("slow_double.c"), LanguageId::C)
        .await
        .unwrap();

    assert_eq!(verdict.status, SubmissionStatus::TimeLimitExceeded, "{}", verdict.detail);
    assert_eq!(verdict.score, 50);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_compile_error_scores_zero() {
    let verdict = judge(78)
        .judge(&double_once(), &fixture_source("compile_error.c"), LanguageId::C)
        .await
        .unwrap();

    assert_eq!(verdict.status, SubmissionStatus::CompilationError);
    assert_eq!(verdict.score, 0);
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_problem_file_across_languages() {
    let problem = Problem::from_file(format!("{FIXTURES_PATH}/problems/double.toml")).unwrap();
    let judge = judge(82);

    for (language, source) in [
        (LanguageId::C, "double.c"),
        (LanguageId::Cpp, "double.cpp"),
        (LanguageId::Python, "double.py"),
    ] {
        let verdict = judge
            .judge(&problem, &fixture_source(source), language)
            .await
            .unwrap();
        assert_eq!(verdict.status, SubmissionStatus::Accepted, "{source}: {}", verdict.detail);
    }

    let verdict = judge
        .judge(&problem, &fixture_source("off_by_one.c"), LanguageId::C)
        .await
        .unwrap();
    assert_eq!(verdict.status, SubmissionStatus::WrongAnswer);
    assert!(verdict.detail.starts_with("test 1:"));

    let verdict = judge
        .judge(&problem, &fixture_source("raise.py"), LanguageId::Python)
        .await
        .unwrap();
    assert_eq!(verdict.status, SubmissionStatus::RuntimeError);
}

#[tokio::test]
async fn test_problem_without_tests_is_refused() {
    let problem = Problem::from_file(format!("{FIXTURES_PATH}/problems/no_tests.toml")).unwrap();
    let result = judge(86)
        .judge(&problem, &fixture_source("double.py"), LanguageId::Python)
        .await;

    assert_eq!(result, Err(JudgeError::NoTestCases(2)));
}

#[tokio::test]
#[ignore = "requires root"]
async fn test_verdicts_feed_recorder_and_guest_ledger() {
    let judge = judge(90);
    let problem = double_once();
    let recorder = MemoryRecorder::new();
    let ledger = GuestLedger::new();

    for source in ["slow_double.c", "double.c", "double.c"] {
        let code = fixture_source(source);
        let verdict = judge.judge(&problem, &code, LanguageId::C).await.unwrap();

        let submission = Submission::new(problem.id, "alice", code, LanguageId::C).with_verdict(&verdict);
        recorder.record(submission).await.unwrap();
        ledger.apply("guest-1", problem.id, &verdict);
    }

    assert_eq!(recorder.user_score("alice").await.unwrap(), 100);
    assert_eq!(recorder.solved_problems("alice").await.unwrap(), vec![1]);
    assert_eq!(ledger.score("guest-1"), 100);
    assert_eq!(ledger.solved("guest-1"), vec![1]);
}
