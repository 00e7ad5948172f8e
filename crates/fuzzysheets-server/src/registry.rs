// SPDX-License-Identifier: Apache-2.0

use fuzzysheets_model::ArtifactDescriptor;
use std::sync::Arc;

use crate::session::{SessionId, SessionStore};

/// Session-scoped list of downloadable artifacts.
///
/// Entries are replaced wholesale and never merged. Two submissions racing
/// in one session resolve to whichever `set` lands last.
#[derive(Clone)]
pub struct SessionArtifactRegistry {
    sessions: Arc<SessionStore>,
}

impl SessionArtifactRegistry {
    #[must_use]
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    pub fn clear(&self, session: &SessionId) {
        self.sessions
            .update(session, |s| s.download_files.clear());
    }

    pub fn set(&self, session: &SessionId, artifacts: Vec<ArtifactDescriptor>) {
        self.sessions
            .update(session, |s| s.download_files = artifacts);
    }

    #[must_use]
    pub fn get(&self, session: &SessionId) -> Vec<ArtifactDescriptor> {
        self.sessions
            .update(session, |s| s.download_files.clone())
    }

    /// Reads and clears in one step, for views that show the links once.
    #[must_use]
    pub fn take(&self, session: &SessionId) -> Vec<ArtifactDescriptor> {
        self.sessions
            .update(session, |s| std::mem::take(&mut s.download_files))
    }
}
