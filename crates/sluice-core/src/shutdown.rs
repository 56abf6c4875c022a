//! Shutdown signalling — one idempotent broadcast flag observed by every
//! producer, consumer and reporter task.
//!
//! Backed by a `watch` channel rather than `broadcast`: a listener that
//! subscribes (or polls) after the trigger still sees it, and triggering
//! twice is harmless.

use tokio::sync::watch;

/// Owning side. Cloneable; any clone may trigger.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

/// Listening side handed to each task.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Raise the signal. Returns true only for the call that raised it.
    pub fn trigger(&self) -> bool {
        let raised = self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
        if raised {
            tracing::info!("shutdown signal raised");
        }
        raised
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is raised. Also resolves if every
    /// `ShutdownSignal` was dropped, since nothing could raise it any more.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}
