use procon::config::{Config, LanguageId};

use super::FIXTURES_PATH;

fn load(name: &str) -> Result<Config, procon::ConfigError> {
    Config::from_file(format!("{FIXTURES_PATH}/configs/{name}"))
}

#[test]
fn test_load_valid_config() {
    let config = load("valid_full.toml").expect("Failed to load config");

    assert!(config.languages.contains_key(&LanguageId::Python));
    assert!(config.languages.contains_key(&LanguageId::C));
    assert!(!config.languages.contains_key(&LanguageId::Cpp));
    assert!(!config.sandbox.cgroup);
    assert_eq!(config.sandbox.first_box_id, 40);
    assert_eq!(config.sandbox.pool_size, 2);
    assert_eq!(config.judge.scoring_threshold, 1.5);
    assert_eq!(config.judge.hard_time_limit, 5.0);
    assert!(config.judge.merge_stderr);
    assert_eq!(config.limits.memory_kb, Some(262144));
    assert_eq!(config.limits.processes, None);

    let c = config.language(LanguageId::C).unwrap();
    assert_eq!(c.compile_argv().unwrap()[2], "-O2");
    assert_eq!(c.run_argv(), vec!["./sol.out"]);
    assert_eq!(config.language_for_extension("py"), Some(LanguageId::Python));
}

#[test]
fn test_load_invalid_threshold() {
    assert!(load("invalid_threshold.toml").is_err());
}

#[test]
fn test_load_invalid_unknown_language() {
    assert!(load("invalid_unknown_language.toml").is_err());
}

#[test]
fn test_load_invalid_empty_run_command() {
    assert!(load("invalid_empty_run_command.toml").is_err());
}

#[test]
fn test_load_missing_file() {
    assert!(load("does_not_exist.toml").is_err());
}
