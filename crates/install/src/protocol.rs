//! `PROGRESS:<percent>:<message>` lines written by the installer backend.

use serde::Serialize;

const PREFIX: &str = "PROGRESS:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Always within 0..=100. Not guaranteed to increase between events.
    pub percent: u8,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }
}

/// Parse one output line. Anything that is not a well-formed progress line
/// yields `None` and is treated as plain log output.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.strip_prefix(PREFIX)?;
    let (percent, message) = rest.split_once(':')?;
    let percent: i64 = percent.trim().parse().ok()?;
    let percent = percent.clamp(0, 100) as u8;
    Some(ProgressEvent::new(percent, message.trim()))
}
