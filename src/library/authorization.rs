use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use serde::{Deserialize, Serialize};

use crate::pending::Pending;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Granted,
    Denied,
    /// The user has not decided yet.
    Unknown,
}

/// Capability check guarding writes into the photo library.
pub trait Authorizer {
    fn status(&self) -> AuthorizationStatus;

    /// Resolves immediately once a decision exists; otherwise resolves when
    /// the user decides.
    fn request_authorization(&self) -> Pending<AuthorizationStatus>;
}

struct Inner {
    status: AuthorizationStatus,
    waiters: Vec<mpsc::Sender<AuthorizationStatus>>,
}

/// Library-write authorization decided once by the user and cached.
///
/// Clones share the same decision.
#[derive(Clone)]
pub struct LibraryAuthorization {
    inner: Arc<Mutex<Inner>>,
}

impl LibraryAuthorization {
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status,
                waiters: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a request is parked waiting for the user's answer.
    pub fn awaiting_decision(&self) -> bool {
        let inner = self.lock();
        inner.status == AuthorizationStatus::Unknown && !inner.waiters.is_empty()
    }

    /// Records the user's answer and resolves every parked request.
    pub fn decide(&self, granted: bool) -> AuthorizationStatus {
        let status = if granted {
            AuthorizationStatus::Granted
        } else {
            AuthorizationStatus::Denied
        };
        let waiters = {
            let mut inner = self.lock();
            inner.status = status;
            std::mem::take(&mut inner.waiters)
        };
        tracing::info!(?status, "photo library authorization decided");
        for tx in waiters {
            let _ = tx.send(status);
        }
        status
    }
}

impl Authorizer for LibraryAuthorization {
    fn status(&self) -> AuthorizationStatus {
        self.lock().status
    }

    fn request_authorization(&self) -> Pending<AuthorizationStatus> {
        let mut inner = self.lock();
        if inner.status != AuthorizationStatus::Unknown {
            return Pending::ready(inner.status);
        }
        let (tx, pending) = Pending::channel();
        inner.waiters.push(tx);
        pending
    }
}
