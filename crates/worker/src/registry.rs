use std::collections::HashMap;
use std::sync::Mutex;

use auris_core::JobId;
use tokio_util::sync::CancellationToken;

/// Tracks the cancellation token for every job currently in flight, so
/// the Job API's cancel endpoint can reach into a worker without
/// sharing any other state with it.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<JobId, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: JobId, token: CancellationToken) {
        self.tokens.lock().unwrap().insert(id, token);
    }

    pub(crate) fn unregister(&self, id: JobId) {
        self.tokens.lock().unwrap().remove(&id);
    }

    /// Cooperatively cancel an in-flight job. Returns `false` if the job
    /// is not currently being processed by this pool (e.g. already
    /// terminal, or still pending in the scheduler).
    pub fn cancel(&self, id: JobId) -> bool {
        if let Some(token) = self.tokens.lock().unwrap().get(&id) {
            token.cancel();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn cancel_returns_false_for_unknown_job() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(Uuid::new_v4()));
    }

    #[test]
    fn cancel_triggers_registered_token() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        registry.register(id, token.clone());
        assert!(registry.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn unregister_removes_the_token() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, CancellationToken::new());
        registry.unregister(id);
        assert!(!registry.cancel(id));
    }
}
