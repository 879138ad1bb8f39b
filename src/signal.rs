//! One-slot "close the detail view" signal.
//!
//! At most one signal is pending at a time. Sending while one is pending
//! drops the new signal, and sending after the listener is gone is a no-op.

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Create a connected notifier/listener pair.
pub fn close_detail_channel() -> (CloseDetailNotifier, CloseDetailListener) {
    let (tx, rx) = mpsc::channel(1);
    (CloseDetailNotifier { tx }, CloseDetailListener { rx })
}

#[derive(Debug, Clone)]
pub struct CloseDetailNotifier {
    tx: mpsc::Sender<()>,
}

impl CloseDetailNotifier {
    /// Offer a signal without waiting. Returns false when it was dropped.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                tracing::debug!("close-detail signal already pending, dropping");
                false
            }
            Err(TrySendError::Closed(())) => false,
        }
    }
}

#[derive(Debug)]
pub struct CloseDetailListener {
    rx: mpsc::Receiver<()>,
}

impl CloseDetailListener {
    /// Wait for the next signal. Returns false once every notifier is gone.
    pub async fn closed(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Consume a pending signal if there is one.
    pub fn try_closed(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }
}
