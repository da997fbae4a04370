//! Maps raw command results onto [`Outcome`]s.
//!
//! Classification reads human-readable stderr from systemctl and polkit.
//! A change in upstream wording silently moves results into `Unknown`.

use crate::outcome::{OperationTag, Outcome};
use icenet_executor::CommandResult;
use std::sync::OnceLock;
use tracing::debug;

/// What a rule looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    ExitSuccess,
    /// Any of the needles appears in stderr, ignoring case.
    StderrContains(Vec<String>),
    TimedOut,
}

impl Condition {
    pub fn stderr_contains(needles: &[&str]) -> Self {
        Condition::StderrContains(needles.iter().map(|n| n.to_lowercase()).collect())
    }

    fn holds(&self, result: &CommandResult, stderr_lower: &str) -> bool {
        match self {
            Condition::ExitSuccess => result.exit_code == 0,
            Condition::StderrContains(needles) => {
                needles.iter().any(|n| stderr_lower.contains(n.as_str()))
            }
            Condition::TimedOut => result.timed_out,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub name: &'static str,
    /// `None` applies the rule to every operation.
    pub operations: Option<Vec<OperationTag>>,
    pub condition: Condition,
    pub outcome: Outcome,
}

impl ClassificationRule {
    pub fn new(name: &'static str, condition: Condition, outcome: Outcome) -> Self {
        Self {
            name,
            operations: None,
            condition,
            outcome,
        }
    }

    pub fn only_for(mut self, operations: &[OperationTag]) -> Self {
        self.operations = Some(operations.to_vec());
        self
    }

    fn matches(&self, op: OperationTag, result: &CommandResult, stderr_lower: &str) -> bool {
        let applies = self
            .operations
            .as_ref()
            .map_or(true, |ops| ops.contains(&op));
        applies && self.condition.holds(result, stderr_lower)
    }
}

/// Ordered rule list. The first matching rule wins; when none matches the
/// result is `Unknown` carrying stderr.
#[derive(Debug, Clone)]
pub struct ResultClassifier {
    rules: Vec<ClassificationRule>,
}

impl ResultClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// The systemctl rule set. Specific, actionable categories come before
    /// the timeout check and the generic fallback.
    pub fn standard() -> Self {
        Self::new(vec![
            ClassificationRule::new("exit-zero", Condition::ExitSuccess, Outcome::Success),
            ClassificationRule::new(
                "already-running",
                Condition::stderr_contains(&["already"]),
                Outcome::AlreadyInDesiredState,
            )
            .only_for(&[OperationTag::Start]),
            ClassificationRule::new(
                "already-stopped",
                Condition::stderr_contains(&["not loaded", "not running"]),
                Outcome::AlreadyInDesiredState,
            )
            .only_for(&[OperationTag::Stop]),
            ClassificationRule::new(
                "permission",
                Condition::stderr_contains(&["permission denied", "authentication"]),
                Outcome::PermissionDenied,
            ),
            ClassificationRule::new(
                "not-found",
                Condition::stderr_contains(&["not found"]),
                Outcome::NotFound,
            ),
            ClassificationRule::new("timeout", Condition::TimedOut, Outcome::TimedOut),
        ])
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(&self, op: OperationTag, result: &CommandResult) -> Outcome {
        let stderr_lower = result.stderr.to_lowercase();
        for rule in &self.rules {
            if rule.matches(op, result, &stderr_lower) {
                debug!("{} result matched rule '{}'", op, rule.name);
                return rule.outcome.clone();
            }
        }
        debug!("{} result matched no rule (exit {})", op, result.exit_code);
        Outcome::Unknown(result.stderr.clone())
    }
}

impl Default for ResultClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

/// Classify with the standard rule set.
pub fn classify(op: OperationTag, result: &CommandResult) -> Outcome {
    static STANDARD: OnceLock<ResultClassifier> = OnceLock::new();
    STANDARD
        .get_or_init(ResultClassifier::standard)
        .classify(op, result)
}
