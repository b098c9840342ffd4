use crate::error::{Result, TranscribeError};
use std::fmt;

/// Bug-name used when a command does not name one
pub const DEFAULT_BUG_NAME: &str = "nuance_transcribe";

pub const SYNTAX: &str = "<uuid> [start|stop] [lang-code] [interim|full] [stereo|mono] [bug-name]";

const MAX_ARGS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start {
        language: String,
        interim: bool,
        stereo: bool,
        bug_name: String,
    },
    Stop {
        bug_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub call_id: String,
    pub action: Action,
}

impl Command {
    /// Parse with the stock default bug-name
    pub fn parse(line: &str) -> Result<Self> {
        Self::parse_with_default(line, DEFAULT_BUG_NAME)
    }

    /// Parse `<call-id> start <lang> [interim|full] [stereo|mono] [bug-name]`
    /// or `<call-id> stop [bug-name]`.
    ///
    /// `start`/`stop` match case-insensitively; `interim` and `stereo` must
    /// match exactly, anything else in their position means full/mono.
    pub fn parse_with_default(line: &str, default_bug_name: &str) -> Result<Self> {
        let args: Vec<&str> = line.split_whitespace().collect();

        let Some(call_id) = args.first() else {
            return Err(TranscribeError::Usage("empty command".to_string()));
        };
        if args.len() > MAX_ARGS {
            return Err(TranscribeError::Usage(format!(
                "expected at most {} arguments, got {}",
                MAX_ARGS,
                args.len()
            )));
        }
        let Some(action) = args.get(1) else {
            return Err(TranscribeError::Usage("missing action".to_string()));
        };

        let bug_name_at = |index: usize| {
            args.get(index)
                .map(|name| name.to_string())
                .unwrap_or_else(|| default_bug_name.to_string())
        };

        let action = if action.eq_ignore_ascii_case("stop") {
            if args.len() > 3 {
                return Err(TranscribeError::Usage(
                    "stop takes at most a bug-name".to_string(),
                ));
            }
            Action::Stop {
                bug_name: bug_name_at(2),
            }
        } else if action.eq_ignore_ascii_case("start") {
            let Some(language) = args.get(2) else {
                return Err(TranscribeError::Usage(
                    "start requires a language code".to_string(),
                ));
            };
            Action::Start {
                language: language.to_string(),
                interim: args.get(3) == Some(&"interim"),
                stereo: args.get(4) == Some(&"stereo"),
                bug_name: bug_name_at(5),
            }
        } else {
            return Err(TranscribeError::Usage(format!("unknown action '{}'", action)));
        };

        Ok(Self {
            call_id: call_id.to_string(),
            action,
        })
    }

    pub fn bug_name(&self) -> &str {
        match &self.action {
            Action::Start { bug_name, .. } | Action::Stop { bug_name } => bug_name,
        }
    }
}

/// Result reported to the issuer of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok,
    Usage,
    Failed,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Ok => write!(f, "+OK Success"),
            CommandOutcome::Usage => write!(f, "-USAGE: {}", SYNTAX),
            CommandOutcome::Failed => write!(f, "-ERR Operation Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(language: &str, interim: bool, stereo: bool, bug_name: &str) -> Action {
        Action::Start {
            language: language.to_string(),
            interim,
            stereo,
            bug_name: bug_name.to_string(),
        }
    }

    #[test]
    fn test_start_with_defaults() {
        let cmd = Command::parse("abc-123 start en-US").unwrap();
        assert_eq!(cmd.call_id, "abc-123");
        assert_eq!(cmd.action, start("en-US", false, false, DEFAULT_BUG_NAME));
    }

    #[test]
    fn test_start_interim_mono() {
        let cmd = Command::parse("abc start en-US interim mono").unwrap();
        assert_eq!(cmd.action, start("en-US", true, false, DEFAULT_BUG_NAME));
    }

    #[test]
    fn test_start_full_stereo_named() {
        let cmd = Command::parse("abc start en-GB full stereo agent_leg").unwrap();
        assert_eq!(cmd.action, start("en-GB", false, true, "agent_leg"));
        assert_eq!(cmd.bug_name(), "agent_leg");
    }

    #[test]
    fn test_option_words_are_case_sensitive() {
        let cmd = Command::parse("abc START en-US INTERIM STEREO").unwrap();
        assert_eq!(cmd.action, start("en-US", false, false, DEFAULT_BUG_NAME));
    }

    #[test]
    fn test_stop() {
        assert_eq!(
            Command::parse("abc stop").unwrap().action,
            Action::Stop { bug_name: DEFAULT_BUG_NAME.to_string() }
        );
        assert_eq!(
            Command::parse("abc Stop agent_leg").unwrap().action,
            Action::Stop { bug_name: "agent_leg".to_string() }
        );
    }

    #[test]
    fn test_custom_default_bug_name() {
        let cmd = Command::parse_with_default("abc stop", "google_transcribe").unwrap();
        assert_eq!(cmd.bug_name(), "google_transcribe");
    }

    #[test]
    fn test_extra_spaces_and_newline() {
        let cmd = Command::parse("  abc   start  en-US \n").unwrap();
        assert_eq!(cmd.action, start("en-US", false, false, DEFAULT_BUG_NAME));
    }

    #[test]
    fn test_usage_errors() {
        for line in [
            "",
            "   ",
            "abc",
            "abc start",
            "abc pause",
            "abc stop a b",
            "abc start en-US interim stereo bug extra",
        ] {
            assert!(
                matches!(Command::parse(line), Err(TranscribeError::Usage(_))),
                "'{line}' should be a usage error"
            );
        }
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(CommandOutcome::Ok.to_string(), "+OK Success");
        assert_eq!(CommandOutcome::Failed.to_string(), "-ERR Operation Failed");
        assert_eq!(CommandOutcome::Usage.to_string(), format!("-USAGE: {}", SYNTAX));
    }
}
