use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per unit name. Operations on the same unit queue up;
/// different units proceed independently.
#[derive(Clone, Default)]
pub struct UnitLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

pub type UnitGuard = OwnedMutexGuard<()>;

impl UnitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, unit: &str) -> UnitGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(unit.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
