//! Coarse-grained cancellation for ranking runs

use tokio::sync::watch;

/// Held by the caller; flips the run into cancelled state
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observed by the engine between candidates
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_to_all_signals() {
        let (handle, signal) = cancel_pair();
        let second = handle.signal();
        assert!(!signal.is_cancelled());

        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(second.is_cancelled());
    }

    #[test]
    fn test_signal_survives_dropped_handle() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        drop(handle);
        assert!(signal.is_cancelled());
    }
}
