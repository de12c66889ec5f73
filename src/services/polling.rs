use tokio::task::JoinHandle;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// Handle to an ongoing status poll.
///
/// The cleanup runs at most once: on the first `cancel()` or, failing that,
/// when the handle is dropped.
pub struct PollingSubscription {
    cleanup: Option<Cleanup>,
}

impl PollingSubscription {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Subscription backed by a polling task; cleanup aborts the task.
    pub fn from_task(handle: JoinHandle<()>) -> Self {
        Self::new(move || handle.abort())
    }

    /// Subscription for a poll that has already finished; nothing to clean up.
    pub fn noop() -> Self {
        Self { cleanup: None }
    }

    pub fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for PollingSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PollingSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}
