//! Outcome taxonomy and failure classification for unit operations.

pub mod classifier;
pub mod outcome;

pub use classifier::{classify, ClassificationRule, Condition, ResultClassifier};
pub use outcome::{Notice, OperationTag, Outcome, Severity};
