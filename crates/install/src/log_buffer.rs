use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only installation log shared between the streaming worker and
/// whoever displays it. Readers get copies; the worker never waits on them
/// for longer than one push.
#[derive(Debug, Clone, Default)]
pub struct InstallLog {
    lines: Arc<RwLock<Vec<String>>>,
}

impl InstallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lines.write().push(line.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.read().clone()
    }

    /// Lines appended after the first `from`, for incremental display.
    pub fn since(&self, from: usize) -> Vec<String> {
        self.lines.read().iter().skip(from).cloned().collect()
    }

    pub fn text(&self) -> String {
        self.lines.read().join("\n")
    }

    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }
}
