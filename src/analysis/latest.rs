use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Broadcasts the id of the most recently completed analysis.
#[derive(Clone)]
pub struct LatestAnalysis {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl LatestAnalysis {
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, id: &str) {
        self.tx.send_replace(Some(id.to_string()));
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Resolves once with the first latest id that differs from `after`, or
    /// with whatever is current when `timeout` elapses.
    pub async fn wait_newer(&self, after: Option<&str>, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut rx = self.tx.subscribe();
        loop {
            {
                let seen = rx.borrow_and_update();
                if let Some(id) = seen.as_deref() {
                    if Some(id) != after {
                        return Some(id.to_string());
                    }
                }
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                // sender lives in self, so a closed channel can't happen here
                Ok(Err(_)) | Err(_) => return self.current(),
            }
        }
    }
}
