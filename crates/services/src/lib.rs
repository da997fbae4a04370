//! Service catalog, state probes and privileged unit control.

pub mod catalog;
pub mod controller;
pub mod diagnostics;
pub mod locks;
pub mod probe;

pub use catalog::{CatalogError, ServiceCatalog, ServiceRef};
pub use controller::{ServiceStatus, ToggleReport, UnitController, DEFAULT_ACTION_TIMEOUT};
pub use diagnostics::{MissingSensorProbe, PostFailureProbe, DEFAULT_JOURNAL_LINES};
pub use locks::UnitLocks;
pub use probe::{ServiceState, ServiceStateProbe};
