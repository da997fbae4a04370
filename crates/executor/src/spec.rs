//! Argument-vector command descriptions.

use crate::error::ExecutorError;
use std::fmt;
use std::time::Duration;

/// Timeout applied to every command unless the caller overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An external program plus its literal arguments.
///
/// The vector is handed to the OS as-is; nothing here is ever joined into a
/// shell string. Builder methods consume `self`, so a spec cannot change once
/// it has been handed to a runner.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl CommandSpec {
    /// For programs named in code. Runtime argv goes through [`Self::from_argv`].
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Build from a full argv (`argv[0]` is the program).
    pub fn from_argv<I, S>(argv: I) -> Result<Self, ExecutorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = argv.into_iter().map(Into::into);
        let program = parts.next().ok_or(ExecutorError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }
        Ok(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Extra environment variable for the child. Values never show up in
    /// `Debug` output, so this is the channel for secrets.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// No deadline at all. Only the installation command uses this.
    pub fn unbounded(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Prepend a launcher (`pkexec`, `sudo -n`) in front of this command.
    pub fn prefixed(self, launcher: &str, launcher_args: &[&str]) -> Self {
        let mut args: Vec<String> = launcher_args.iter().map(|a| (*a).to_string()).collect();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: launcher.to_string(),
            args,
            env: self.env,
            timeout: self.timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("CommandSpec")
            .field("argv", &self.argv())
            .field("env", &env_keys)
            .field("timeout", &self.timeout)
            .finish()
    }
}
