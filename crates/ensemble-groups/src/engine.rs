//! Collaborator abstractions
//!
//! The session never touches storage or the network itself. It reads member
//! lists from a [`MemberListSource`] and hands compiled diffs to a
//! [`GroupEngine`].
//!
//! ## Implementations
//!
//! - [`MockMemberListSource`](crate::mock::MockMemberListSource) and
//!   [`MockGroupEngine`](crate::mock::MockGroupEngine): in-memory, for tests
//!   and the replay tool

use async_trait::async_trait;
use ensemble_core::{GroupId, Identity, MemberOrPending};
use tokio::sync::mpsc;

use crate::diff::WireDiff;
use crate::error::EngineError;

/// Source of member-list snapshots for a group
///
/// Every message on the returned channel is a complete replacement of the
/// previous list. The channel closing ends the observation.
#[async_trait]
pub trait MemberListSource: Send + Sync {
    /// Start observing the members of `group` as seen by `owned_identity`
    async fn subscribe(
        &self,
        owned_identity: &Identity,
        group: &GroupId,
    ) -> Result<mpsc::Receiver<Vec<MemberOrPending>>, EngineError>;
}

/// Remote group engine
#[async_trait]
pub trait GroupEngine: Send + Sync {
    /// Submit a group update
    ///
    /// `Ok` means the engine accepted the update for processing. Completion
    /// is reported separately, through the session's
    /// `publication_finished` signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses or cannot take the update.
    async fn submit_group_update(
        &self,
        owned_identity: &Identity,
        group: &GroupId,
        diff: WireDiff,
    ) -> Result<(), EngineError>;
}
