//! Discard confirmation capability.
//!
//! Whenever leaving the current session would drop unsaved, unvalidated or unsynced changes, the
//! coordinator asks its [`DiscardConfirmation`] and waits for the answer. Hosts implement it with
//! a prompt; tests implement it with a closure.

use crate::model::ArtifactId;
use crate::session::SessionState;

/// What would be lost by leaving the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChanges {
    /// Artifact of the session being left.
    pub artifact_id: ArtifactId,
    /// Its path.
    pub path: String,
    /// Session state at the time of the question.
    pub state: SessionState,
    /// Buffer differs from the baseline.
    pub unsaved_buffer: bool,
    /// A write has not resolved yet.
    pub save_in_flight: bool,
}

/// Asked before a session with pending changes is destroyed.
pub trait DiscardConfirmation: Send {
    /// Return `true` to discard the pending changes.
    fn confirm_discard(&mut self, pending: &PendingChanges) -> bool;
}

impl<F> DiscardConfirmation for F
where
    F: FnMut(&PendingChanges) -> bool + Send,
{
    fn confirm_discard(&mut self, pending: &PendingChanges) -> bool {
        self(pending)
    }
}

/// Never confirms. The default until a host installs a real prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefuseDiscard;

impl DiscardConfirmation for RefuseDiscard {
    fn confirm_discard(&mut self, _pending: &PendingChanges) -> bool {
        false
    }
}
