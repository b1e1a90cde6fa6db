//! Group-session context injection
//!
//! Thread-local storage for the (owned identity, group) pair a piece of code
//! is working on, so that every span opened in that scope can be tagged with
//! it by [`SessionContextLayer`](crate::layers::SessionContextLayer).

use std::cell::RefCell;

use ensemble_core::{GroupId, Identity};
use uuid::Uuid;

/// Session context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContextData {
    /// Short form of the owned identity
    pub owned_identity: String,
    /// Short form of the group identifier
    pub group_id: String,
    /// Unique id of this edit session
    pub instance_id: Uuid,
}

thread_local! {
    static SESSION_CONTEXT: RefCell<Option<SessionContextData>> = const { RefCell::new(None) };
}

/// RAII guard for session context
///
/// Sets the session context for the current thread and restores the
/// previous one (if any) on drop. Must not be held across `.await`.
///
/// # Example
///
/// ```ignore
/// let _guard = SessionContextGuard::new(&owned, &group);
/// tracing::info!("Reconciling member list");
/// ```
pub struct SessionContextGuard {
    previous: Option<SessionContextData>,
}

impl SessionContextGuard {
    /// Enter a context with a fresh instance ID
    pub fn new(owned_identity: &Identity, group_id: &GroupId) -> Self {
        Self::with_instance_id(owned_identity, group_id, Uuid::new_v4())
    }

    /// Enter a context with a specific instance ID
    ///
    /// Long-lived sessions re-enter with the same ID for every unit of work.
    pub fn with_instance_id(owned_identity: &Identity, group_id: &GroupId, instance_id: Uuid) -> Self {
        let new_ctx = SessionContextData {
            owned_identity: owned_identity.short_id(),
            group_id: group_id.short_id(),
            instance_id,
        };

        let previous = SESSION_CONTEXT.with(|ctx| ctx.borrow_mut().replace(new_ctx));

        Self { previous }
    }

    /// Get the current session context (if any)
    pub fn current() -> Option<SessionContextData> {
        SESSION_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current group identifier (if set)
    pub fn current_group_id() -> Option<String> {
        Self::current().map(|ctx| ctx.group_id)
    }
}

impl Drop for SessionContextGuard {
    fn drop(&mut self) {
        SESSION_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block inside a session context scope
///
/// ```ignore
/// with_session_context!(&owned, &group, {
///     tracing::info!("Publishing");
/// });
/// ```
#[macro_export]
macro_rules! with_session_context {
    ($owned:expr, $group:expr, $body:block) => {{
        let _guard = $crate::context::SessionContextGuard::new($owned, $group);
        $body
    }};
}
