use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
