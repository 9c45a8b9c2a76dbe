use procon::judge::{Problem, ProblemError};

use super::FIXTURES_PATH;

#[test]
fn test_load_problem() {
    let path = format!("{FIXTURES_PATH}/problems/double.toml");
    let problem = Problem::from_file(&path).expect("Failed to load problem");

    assert_eq!(problem.id, 1);
    assert_eq!(problem.title, "Double it");
    assert_eq!(problem.score, 100);
    assert_eq!(problem.time_limit, None);
    assert_eq!(problem.test_cases.len(), 3);
    assert_eq!(problem.test_cases[1].input, "-7\n");
    assert_eq!(problem.test_cases[1].expected, "-14\n");

    let samples: Vec<_> = problem.samples().collect();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].input, "50\n");
}

#[test]
fn test_load_problem_without_tests() {
    let path = format!("{FIXTURES_PATH}/problems/no_tests.toml");
    let problem = Problem::from_file(&path).expect("Failed to load problem");
    assert!(problem.test_cases.is_empty());
}

#[test]
fn test_load_invalid_time_limit() {
    let path = format!("{FIXTURES_PATH}/problems/invalid_time_limit.toml");
    let result = Problem::from_file(&path);
    assert!(matches!(result, Err(ProblemError::Invalid(_))));
}
