//! Control API: `<call-id> start|stop ...` commands
//!
//! Commands are parsed into a typed `Command`, the target call is resolved
//! and the `SessionManager` is invoked. Each command yields exactly one
//! `CommandOutcome`.

mod command;
mod handler;

pub use command::{Action, Command, CommandOutcome, DEFAULT_BUG_NAME, SYNTAX};
pub use handler::ControlHandler;
