//! Argument-vector command execution with timeouts and captured output.

pub mod error;
pub mod guard;
pub mod privilege;
pub mod runner;
pub mod spec;

pub use error::ExecutorError;
pub use guard::ArgGuard;
pub use privilege::Privilege;
pub use runner::{
    decode_line, CommandResult, CommandRunner, LineStream, ReplayStream, SystemRunner,
    EXIT_ABNORMAL, EXIT_COMMAND_NOT_FOUND,
};
pub use spec::{CommandSpec, DEFAULT_TIMEOUT};
