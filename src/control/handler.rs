use super::command::{Action, Command, CommandOutcome};
use crate::call::{CallLocator, InterceptFlags};
use crate::error::{Result, TranscribeError};
use crate::session::{SessionManager, StartRequest};
use std::sync::Arc;
use tracing::{error, info};

/// Call ids and bug-names each become exactly one NATS subject token
fn check_subject_token(what: &str, token: &str) -> Result<()> {
    let invalid = token.is_empty()
        || token
            .chars()
            .any(|c| matches!(c, '.' | '*' | '>') || c.is_whitespace());
    if invalid {
        return Err(TranscribeError::Usage(format!("invalid {} '{}'", what, token)));
    }
    Ok(())
}

/// Executes control commands against the session manager
pub struct ControlHandler {
    locator: Arc<dyn CallLocator>,
    manager: SessionManager,
    default_bug_name: String,
}

impl ControlHandler {
    pub fn new(
        locator: Arc<dyn CallLocator>,
        manager: SessionManager,
        default_bug_name: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            manager,
            default_bug_name: default_bug_name.into(),
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn default_bug_name(&self) -> &str {
        &self.default_bug_name
    }

    /// Parse and run a textual command
    pub async fn execute_line(&self, line: &str) -> CommandOutcome {
        match Command::parse_with_default(line, &self.default_bug_name) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                error!("Error with command '{}': {}", line.trim(), e);
                CommandOutcome::Usage
            }
        }
    }

    /// Run a parsed command
    pub async fn execute(&self, command: Command) -> CommandOutcome {
        match self.run(command).await {
            Ok(()) => CommandOutcome::Ok,
            Err(TranscribeError::Usage(reason)) => {
                error!("Rejected command: {}", reason);
                CommandOutcome::Usage
            }
            Err(e) => {
                error!("Command failed: {}", e);
                CommandOutcome::Failed
            }
        }
    }

    /// Resolve the call and invoke the manager. The call reference is
    /// released when this returns, whatever the outcome.
    pub async fn run(&self, command: Command) -> Result<()> {
        if command.call_id.is_empty() {
            return Err(TranscribeError::Usage("missing call id".to_string()));
        }
        check_subject_token("call id", &command.call_id)?;
        check_subject_token("bug-name", command.bug_name())?;

        let call = self
            .locator
            .locate(&command.call_id)
            .await
            .map_err(|e| TranscribeError::CallNotFound(format!("{}: {:#}", command.call_id, e)))?
            .ok_or_else(|| TranscribeError::CallNotFound(command.call_id.clone()))?;

        match command.action {
            Action::Stop { bug_name } => {
                info!("{} stop transcribing on {}", bug_name, command.call_id);
                self.manager.stop(call.id(), &bug_name).await
            }
            Action::Start {
                language,
                interim,
                stereo,
                bug_name,
            } => {
                if language.is_empty() {
                    return Err(TranscribeError::Usage(
                        "start requires a language code".to_string(),
                    ));
                }
                info!(
                    "{} start transcribing {} {}",
                    bug_name,
                    language,
                    if interim { "interim" } else { "complete" }
                );
                let flags = if stereo {
                    InterceptFlags::stereo()
                } else {
                    InterceptFlags::mono()
                };
                let request = StartRequest {
                    language,
                    interim,
                    flags,
                    bug_name,
                };
                self.manager.start(&*call, request).await.map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_tokens() {
        for token in ["abc-123", "nuance_transcribe", "agent:leg", "5f0c8e9a-0d6b"] {
            assert!(check_subject_token("bug-name", token).is_ok(), "{token}");
        }
        for token in ["", ">", "*", "a.b", "agent.>", "a b", "a\tb"] {
            assert!(
                matches!(check_subject_token("bug-name", token), Err(TranscribeError::Usage(_))),
                "{token:?} should be rejected"
            );
        }
    }
}
