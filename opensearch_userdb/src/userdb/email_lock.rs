use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-email async locks serialising check-then-insert within this process.
///
/// Entries are removed once no task holds or waits for them. Writers in other
/// processes are not covered.
#[derive(Default)]
pub(crate) struct EmailLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub(crate) struct EmailGuard<'a> {
    registry: &'a EmailLocks,
    email: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EmailLocks {
    pub(crate) async fn lock(&self, email: &str) -> EmailGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(email.to_string()).or_default().clone()
        };

        EmailGuard {
            registry: self,
            email: email.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for EmailGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.registry.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the registry still references it: nobody holds or waits
        if locks
            .get(&self.email)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.email);
        }
    }
}
