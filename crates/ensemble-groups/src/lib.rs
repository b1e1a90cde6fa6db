//! # Ensemble Groups
//!
//! Membership change-set reconciliation for group details screens.
//!
//! A user edits a group (adds and removes members, toggles admins, changes
//! the group type) while the authoritative member list keeps changing
//! underneath. This crate keeps those edits consistent with every new
//! snapshot, projects the list the screen should show, and compiles the
//! edits into a minimal [`WireDiff`] for the group engine.
//!
//! ## Components
//!
//! - [`MemberStore`]: latest authoritative member list
//! - [`PendingChangeSet`]: uncommitted edits, reconciled on every refresh
//! - [`project_members`]: the list to display while editing
//! - [`resolve_permissions`]: permissions implied by a group type
//! - [`compile_diff`]: edits to wire diff
//! - [`EditSession`]: `Idle -> Editing -> Publishing -> Idle` lifecycle
//! - [`GroupSession`]: single-owner task tying it all to the collaborators
//!
//! ## Example
//!
//! ```rust,ignore
//! use ensemble_groups::{SessionBuilder, MockGroupEngine, MockMemberListSource};
//!
//! let session = SessionBuilder::new(owned, group)
//!     .initial_group_type(GroupType::Private)
//!     .spawn(source, engine)
//!     .await?;
//!
//! session.start_editing().await?;
//! session.member_added(bob, b"bob".to_vec()).await?;
//! session.publish().await?;
//!
//! let mut notices = session.notices();
//! while let Ok(notice) = notices.recv().await {
//!     println!("{notice:?}");
//! }
//! ```

pub mod changeset;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod engine;
pub mod error;
pub mod mock;
pub mod permissions;
pub mod projection;
pub mod scenario;
pub mod session;
pub mod store;

// Re-exports
pub use changeset::{PendingChangeSet, ReconcileReport};
pub use config::{Preset, SessionConfig};
pub use coordinator::{EditSession, PublishOutcome, SessionState};
pub use diff::{WireDiff, compile_diff};
pub use engine::{GroupEngine, MemberListSource};
pub use error::{EngineError, GroupsError, GroupsResult};
pub use mock::{MockGroupEngine, MockMemberListSource, Submission};
pub use permissions::{admin_and_member_permissions, resolve_permissions};
pub use projection::{project_members, stored_members};
pub use scenario::{ReplayReport, Scenario, Step, StepOutcome, replay};
pub use session::{GroupSession, SessionBuilder, SessionNotice};
pub use store::MemberStore;
