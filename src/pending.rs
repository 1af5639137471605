use std::sync::mpsc;

/// Result of polling a [`Pending`] value.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll<T> {
    Waiting,
    Ready(T),
    /// The producer went away without ever sending.
    Dropped,
}

/// A one-shot value delivered from another thread or a later UI frame.
///
/// Fires at most once. There is no cancellation and no timeout; the owner
/// polls it every frame until it resolves.
pub struct Pending<T> {
    rx: mpsc::Receiver<T>,
    resolved: bool,
}

impl<T> Pending<T> {
    pub fn channel() -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                rx,
                resolved: false,
            },
        )
    }

    /// A value that is already available.
    pub fn ready(value: T) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(value);
        pending
    }

    pub fn poll(&mut self) -> Poll<T> {
        if self.resolved {
            return Poll::Dropped;
        }
        match self.rx.try_recv() {
            Ok(value) => {
                self.resolved = true;
                Poll::Ready(value)
            }
            Err(mpsc::TryRecvError::Empty) => Poll::Waiting,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.resolved = true;
                Poll::Dropped
            }
        }
    }

    /// Blocks until the value arrives. `None` if the producer was dropped.
    pub fn wait(self) -> Option<T> {
        if self.resolved {
            return None;
        }
        self.rx.recv().ok()
    }
}
