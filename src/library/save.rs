use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;

use super::authorization::{AuthorizationStatus, Authorizer};
use super::{AssetCreationRequest, LibraryError, PhotoLibrary};
use crate::pending::{Pending, Poll};

/// Lifecycle of one save action.
///
/// `Idle → AwaitingAuthorization → {Aborted | Committing} → {Failed | Done}`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    AwaitingAuthorization,
    Aborted,
    Committing,
    Failed,
    Done,
}

impl SaveState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SaveState::Aborted | SaveState::Failed | SaveState::Done)
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("photo library access is {0:?}")]
    NotAuthorized(AuthorizationStatus),
    #[error("authorization request was dropped before it resolved")]
    AuthorizationDropped,
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("change transaction ended without reporting a result")]
    CommitDropped,
}

/// One user-initiated save of a filtered photo. Attempted exactly once.
pub struct SaveJob {
    state: SaveState,
    image: Option<DynamicImage>,
    authorization: Option<Pending<AuthorizationStatus>>,
    commit: Option<Pending<Result<PathBuf, LibraryError>>>,
    saved_path: Option<PathBuf>,
    error: Option<SaveError>,
}

impl SaveJob {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            state: SaveState::Idle,
            image: Some(image),
            authorization: None,
            commit: None,
            saved_path: None,
            error: None,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn saved_path(&self) -> Option<&Path> {
        self.saved_path.as_deref()
    }

    pub fn error(&self) -> Option<&SaveError> {
        self.error.as_ref()
    }

    /// Requests library-write authorization. No-op unless `Idle`.
    pub fn start(&mut self, authorizer: &dyn Authorizer) {
        if self.state != SaveState::Idle {
            return;
        }
        tracing::debug!(status = ?authorizer.status(), "requesting photo library access");
        self.authorization = Some(authorizer.request_authorization());
        self.state = SaveState::AwaitingAuthorization;
    }

    /// Advances the machine as far as the pending results allow.
    pub fn poll(&mut self, library: &PhotoLibrary) -> SaveState {
        if self.state == SaveState::AwaitingAuthorization {
            self.poll_authorization(library);
        }
        if self.state == SaveState::Committing {
            self.poll_commit();
        }
        self.state
    }

    /// Polls once, then blocks until an in-flight commit has landed.
    ///
    /// A job still waiting for the user's decision is left as it is.
    pub fn finish(&mut self, library: &PhotoLibrary) -> SaveState {
        self.poll(library);
        if self.state == SaveState::Committing {
            if let Some(pending) = self.commit.take() {
                let outcome = match pending.wait() {
                    Some(result) => Poll::Ready(result),
                    None => Poll::Dropped,
                };
                self.resolve_commit(outcome);
            }
        }
        self.state
    }

    fn poll_authorization(&mut self, library: &PhotoLibrary) {
        let Some(pending) = self.authorization.as_mut() else {
            return;
        };
        match pending.poll() {
            Poll::Waiting => {}
            Poll::Ready(AuthorizationStatus::Granted) => {
                self.authorization = None;
                let Some(image) = self.image.take() else {
                    self.fail(SaveError::CommitDropped);
                    return;
                };
                self.commit =
                    Some(library.perform_changes(AssetCreationRequest::from_image(image)));
                self.state = SaveState::Committing;
            }
            Poll::Ready(status) => {
                tracing::warn!(
                    ?status,
                    "the user has not authorized photo library usage; nothing saved"
                );
                self.abort(SaveError::NotAuthorized(status));
            }
            Poll::Dropped => {
                tracing::warn!("photo library authorization request was dropped");
                self.abort(SaveError::AuthorizationDropped);
            }
        }
    }

    fn poll_commit(&mut self) {
        let Some(pending) = self.commit.as_mut() else {
            return;
        };
        let outcome = pending.poll();
        self.resolve_commit(outcome);
    }

    fn resolve_commit(&mut self, outcome: Poll<Result<PathBuf, LibraryError>>) {
        match outcome {
            Poll::Waiting => {}
            Poll::Ready(Ok(path)) => {
                tracing::info!(path = %path.display(), "saved photo to library");
                self.commit = None;
                self.saved_path = Some(path);
                self.state = SaveState::Done;
            }
            Poll::Ready(Err(err)) => {
                tracing::error!(%err, "error saving photo asset");
                self.fail(SaveError::Library(err));
            }
            Poll::Dropped => {
                tracing::error!("photo library change transaction vanished");
                self.fail(SaveError::CommitDropped);
            }
        }
    }

    fn abort(&mut self, err: SaveError) {
        self.authorization = None;
        self.image = None;
        self.error = Some(err);
        self.state = SaveState::Aborted;
    }

    fn fail(&mut self, err: SaveError) {
        self.commit = None;
        self.error = Some(err);
        self.state = SaveState::Failed;
    }
}
