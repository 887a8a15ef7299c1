//! Session-wide signals for serve mode.
//!
//! Two shared cells coordinate every worker:
//! - `Shutdown`: one cancellation signal, triggered by Ctrl+C or by the
//!   orchestration root when it starts draining.
//! - `FirstError`: the first session-fatal failure. Set at most once; later
//!   failures are logged and dropped.
//!
//! Both are cheap to clone and are handed to each worker's constructor.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::log;

// =============================================================================
// Shutdown
// =============================================================================

/// Shared cancellation signal.
///
/// Triggering is idempotent. Async loops await [`Shutdown::cancelled`];
/// blocking threads poll [`Shutdown::is_triggered`].
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Safe to call any number of times.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

// =============================================================================
// FirstError
// =============================================================================

/// Compare-and-set-once slot for the first session-fatal error.
#[derive(Clone)]
pub struct FirstError {
    inner: Arc<FirstErrorInner>,
}

struct FirstErrorInner {
    slot: Mutex<Option<anyhow::Error>>,
    set: watch::Sender<bool>,
}

impl Default for FirstError {
    fn default() -> Self {
        Self::new()
    }
}

impl FirstError {
    pub fn new() -> Self {
        let (set, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(FirstErrorInner {
                slot: Mutex::new(None),
                set,
            }),
        }
    }

    /// Record `err` if no error has been recorded yet.
    ///
    /// Returns `true` when this call filled the slot. A later error is logged
    /// and discarded.
    pub fn report(&self, err: anyhow::Error) -> bool {
        let mut slot = self.inner.slot.lock();
        if slot.is_some() {
            log!("error"; "{:#}", err);
            return false;
        }
        *slot = Some(err);
        drop(slot);

        self.inner.set.send_replace(true);
        true
    }

    #[cfg(test)]
    pub fn is_set(&self) -> bool {
        *self.inner.set.borrow()
    }

    /// Resolve once an error has been recorded.
    pub async fn wait(&self) {
        let mut rx = self.inner.set.subscribe();
        let _ = rx.wait_for(|set| *set).await;
    }

    /// Take the recorded error, leaving the slot marked as set.
    pub fn take(&self) -> Option<anyhow::Error> {
        self.inner.slot.lock().take()
    }
}

// =============================================================================
// Interrupt handler
// =============================================================================

/// Route Ctrl+C into `shutdown`. Call once at program start.
///
/// A second interrupt while draining exits immediately.
pub fn install_interrupt_handler(shutdown: Shutdown) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if shutdown.is_triggered() {
            std::process::exit(130);
        }
        log!("serve"; "shutting down...");
        shutdown.trigger();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

// =============================================================================
// Tests
// =============================================================================
