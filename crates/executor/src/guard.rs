use crate::error::ExecutorError;

const DANGEROUS_CHARS: &[char] = &[
    '|', '&', ';', '>', '<', '`', '$', '(', ')', '{', '}', '\'', '"', '*', '?', '!', '~',
];
const MAX_UNIT_NAME_LEN: usize = 256;
const DEVICE_PREFIX: &str = "/dev/";

/// Checks on values that end up as command arguments.
///
/// Commands are never run through a shell, so these checks are about option
/// injection (`--now`, `-f`) and about refusing names no real unit or device
/// could have.
pub struct ArgGuard;

impl ArgGuard {
    pub fn validate_unit_name(name: &str) -> Result<(), ExecutorError> {
        if name.is_empty() {
            return Err(ExecutorError::InvalidArgument("Empty unit name".into()));
        }

        if name.len() > MAX_UNIT_NAME_LEN {
            return Err(ExecutorError::InvalidArgument(format!(
                "Unit name longer than {} bytes",
                MAX_UNIT_NAME_LEN
            )));
        }

        if name.starts_with('-') {
            return Err(ExecutorError::InvalidArgument(format!(
                "Unit name looks like an option: {}",
                name
            )));
        }

        if name.contains('/') {
            return Err(ExecutorError::InvalidArgument(format!(
                "Path separator in unit name: {}",
                name
            )));
        }

        Self::reject_unsafe_chars(name)
    }

    /// Block device paths handed to the installer backend.
    pub fn validate_device_path(path: &str) -> Result<(), ExecutorError> {
        let Some(rest) = path.strip_prefix(DEVICE_PREFIX) else {
            return Err(ExecutorError::InvalidArgument(format!(
                "Not a device path: {}",
                path
            )));
        };

        if rest.is_empty() || rest.starts_with('-') || rest.split('/').any(|c| c == "..") {
            return Err(ExecutorError::InvalidArgument(format!(
                "Invalid device path: {}",
                path
            )));
        }

        Self::reject_unsafe_chars(path)
    }

    fn reject_unsafe_chars(value: &str) -> Result<(), ExecutorError> {
        for &ch in DANGEROUS_CHARS {
            if value.contains(ch) {
                return Err(ExecutorError::InvalidArgument(format!(
                    "Dangerous character in argument: {:?}",
                    ch
                )));
            }
        }

        if value.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(ExecutorError::InvalidArgument(
                "Whitespace or control character in argument".into(),
            ));
        }

        Ok(())
    }
}
