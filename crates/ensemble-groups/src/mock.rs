//! In-memory collaborators for testing
//!
//! ## Usage
//!
//! ```rust,ignore
//! let source = MockMemberListSource::new();
//! let engine = MockGroupEngine::new();
//!
//! source.push(vec![alice, bob]).await?;
//! engine.fail_next(EngineError::Unavailable);
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use ensemble_core::{GroupId, Identity, MemberOrPending};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::diff::WireDiff;
use crate::engine::{GroupEngine, MemberListSource};
use crate::error::EngineError;

/// Member-list source fed by hand
///
/// Supports a single subscriber; snapshots pushed before the subscription
/// are buffered.
pub struct MockMemberListSource {
    sender: mpsc::Sender<Vec<MemberOrPending>>,
    receiver: Mutex<Option<mpsc::Receiver<Vec<MemberOrPending>>>>,
}

impl MockMemberListSource {
    /// Create a source with the default buffer size
    pub fn new() -> Self {
        Self::with_buffer_size(64)
    }

    /// Create a source with a specific buffer size
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Deliver a new snapshot
    pub async fn push(&self, members: Vec<MemberOrPending>) -> Result<(), EngineError> {
        self.sender
            .send(members)
            .await
            .map_err(|_| EngineError::Unavailable)
    }
}

impl Default for MockMemberListSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberListSource for MockMemberListSource {
    async fn subscribe(
        &self,
        _owned_identity: &Identity,
        _group: &GroupId,
    ) -> Result<mpsc::Receiver<Vec<MemberOrPending>>, EngineError> {
        self.receiver.lock().take().ok_or(EngineError::Unavailable)
    }
}

/// A recorded engine submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub owned_identity: Identity,
    pub group: GroupId,
    pub diff: WireDiff,
}

/// Group engine that records submissions and fails on demand
#[derive(Default)]
pub struct MockGroupEngine {
    submissions: Mutex<Vec<Submission>>,
    failures: Mutex<VecDeque<EngineError>>,
}

impl MockGroupEngine {
    /// Create an engine that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next submission fail with `error`
    ///
    /// Failures queue up and are consumed in order.
    pub fn fail_next(&self, error: EngineError) {
        self.failures.lock().push_back(error);
    }

    /// All submissions so far, failed ones included
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    /// Number of submissions so far
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }
}

#[async_trait]
impl GroupEngine for MockGroupEngine {
    async fn submit_group_update(
        &self,
        owned_identity: &Identity,
        group: &GroupId,
        diff: WireDiff,
    ) -> Result<(), EngineError> {
        self.submissions.lock().push(Submission {
            owned_identity: owned_identity.clone(),
            group: group.clone(),
            diff,
        });

        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
