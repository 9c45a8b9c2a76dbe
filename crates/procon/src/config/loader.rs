//! Loading and validating configuration files

use std::path::Path;

use config::{File, FileFormat, Source};
use tracing::debug;

use crate::config::{Config, ConfigError};

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading configuration");
        Self::load(File::from(path).format(FileFormat::Toml))
    }

    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        Self::load(File::from_str(content, FileFormat::Toml))
    }

    fn load(source: impl Source + Send + Sync + 'static) -> Result<Self, ConfigError> {
        let config: Config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        for (id, language) in &self.languages {
            if language.name.trim().is_empty() {
                return invalid(format!("languages.{id}: name is empty"));
            }
            if language.run.command.is_empty() {
                return invalid(format!("languages.{id}.run: command is empty"));
            }
            if let Some(ref compile) = language.compile {
                if compile.command.is_empty() {
                    return invalid(format!("languages.{id}.compile: command is empty"));
                }
                if compile.output.is_empty() || compile.output.contains('/') {
                    return invalid(format!(
                        "languages.{id}.compile: output must be a plain file name"
                    ));
                }
            }
        }

        if self.sandbox.pool_size == 0 {
            return invalid("sandbox.pool_size must be at least 1".into());
        }

        let judge = &self.judge;
        if !judge.scoring_threshold.is_finite() || judge.scoring_threshold <= 0.0 {
            return invalid(
                "judge.scoring_threshold must be a positive number of seconds".into(),
            );
        }
        if !judge.hard_time_limit.is_finite()
            || judge.hard_time_limit <= judge.scoring_threshold
        {
            return invalid(format!(
                "judge.hard_time_limit ({}) must exceed judge.scoring_threshold ({})",
                judge.hard_time_limit, judge.scoring_threshold
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::LanguageId;
    use crate::limits::ResourceLimits;

    fn invalid_message(toml: &str) -> String {
        match Config::parse_toml(toml) {
            Err(ConfigError::Invalid(message)) => message,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let toml = r#"
[languages.python]
name = "Python"
extension = "py"

[languages.python.run]
command = ["python3", "{source}"]
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.languages.len(), 1);
        assert_eq!(config.languages[&LanguageId::Python].name, "Python");
        assert_eq!(config.judge.scoring_threshold, 2.0);
        assert_eq!(config.sandbox.pool_size, 4);
        assert_eq!(config.limits, ResourceLimits::submission());
    }

    #[test]
    fn full_config() {
        let toml = r#"
[sandbox]
binary = "/usr/local/bin/isolate"
first_box_id = 10
pool_size = 2

[judge]
scoring_threshold = 1.5
hard_time_limit = 5.0
merge_stderr = true

[limits]
wall_time = 5.0
memory_kb = 262144

[languages.c]
name = "C (GCC)"
extension = "c"

[languages.c.compile]
command = ["gcc", "{source}", "-O2", "-o", "{output}"]

[languages.c.compile.limits]
processes = 10

[languages.c.run]
command = ["./{binary}"]
"#;

        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(
            config.sandbox.binary,
            PathBuf::from("/usr/local/bin/isolate")
        );
        assert_eq!((config.sandbox.first_box_id, config.sandbox.pool_size), (10, 2));
        assert_eq!(config.judge.scoring_threshold, 1.5);
        assert!(config.judge.merge_stderr);
        assert_eq!(config.limits.memory_kb, Some(262144));
        // A limits table replaces the built-in ceilings entirely
        assert_eq!(config.limits.cpu_time, None);

        let compile = config.languages[&LanguageId::C].compile.as_ref().unwrap();
        assert_eq!(compile.output, "sol.out");
        assert_eq!(compile.limits.processes, Some(10));
        assert_eq!(compile.limits.cpu_time, None);
    }

    #[test]
    fn unknown_language_rejected() {
        let toml = r#"
[languages.ruby]
name = "Ruby"
extension = "rb"

[languages.ruby.run]
command = ["ruby", "{source}"]
"#;

        assert!(matches!(
            Config::parse_toml(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn misspelled_limit_rejected() {
        let toml = r#"
[limits]
memory_limit = 1024
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn bad_extension_rejected() {
        let toml = r#"
[languages.c]
name = "C"
extension = ".c"

[languages.c.run]
command = ["./{binary}"]
"#;

        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn empty_name_rejected() {
        let message = invalid_message(
            r#"
[languages.c]
name = " "
extension = "c"

[languages.c.run]
command = ["./test"]
"#,
        );
        assert!(message.contains("languages.c"));
    }

    #[test]
    fn empty_run_command_rejected() {
        let message = invalid_message(
            r#"
[languages.python]
name = "Python"
extension = "py"

[languages.python.run]
command = []
"#,
        );
        assert!(message.contains("run: command is empty"));
    }

    #[test]
    fn nested_compile_output_rejected() {
        let message = invalid_message(
            r#"
[languages.c]
name = "C"
extension = "c"

[languages.c.compile]
command = ["gcc", "{source}", "-o", "{output}"]
output = "bin/sol"

[languages.c.run]
command = ["./{binary}"]
"#,
        );
        assert!(message.contains("plain file name"));
    }

    #[test]
    fn hard_limit_must_exceed_threshold() {
        let message = invalid_message(
            r#"
[judge]
scoring_threshold = 3.0
hard_time_limit = 2.0
"#,
        );
        assert!(message.contains("hard_time_limit"));
    }

    #[test]
    fn non_positive_threshold_rejected() {
        let message = invalid_message("[judge]\nscoring_threshold = 0.0\n");
        assert!(message.contains("scoring_threshold"));
    }

    #[test]
    fn infinite_hard_limit_rejected() {
        let message = invalid_message("[judge]\nhard_time_limit = inf\n");
        assert!(message.contains("hard_time_limit"));
    }

    #[test]
    fn empty_pool_rejected() {
        let message = invalid_message("[sandbox]\npool_size = 0\n");
        assert!(message.contains("pool_size"));
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::parse_toml(crate::config::EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.languages.len(), LanguageId::ALL.len());
    }
}
