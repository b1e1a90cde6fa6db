//! Group session actor
//!
//! One task owns the [`MemberStore`] and the [`EditSession`] of a group and
//! is the only writer of both. It serializes three inputs:
//!
//! - edit commands from the screen (bounded `mpsc`)
//! - member-list snapshots from the [`MemberListSource`]
//! - results of engine submissions it spawned
//!
//! and republishes the displayed list and lifecycle state over `watch`
//! channels. Transient user-facing events go out on a `broadcast` channel.

use std::sync::Arc;

use ensemble_core::{GroupId, GroupType, Identity, MemberOrPending};
use ensemble_logging::SessionContextGuard;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::changeset::PendingChangeSet;
use crate::config::SessionConfig;
use crate::coordinator::{EditSession, PublishOutcome, SessionState};
use crate::engine::{GroupEngine, MemberListSource};
use crate::error::{EngineError, GroupsError, GroupsResult};
use crate::store::MemberStore;

/// Transient events for the user (toasts)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Publish found nothing to change
    NothingToPublish,
    /// The engine accepted the update and is processing it
    Submitted,
    /// The engine confirmed the update
    Published,
    /// The update failed; edits are kept for a retry
    PublishFailed { reason: String },
}

enum Command {
    StartEditing,
    MemberAdded { identity: Identity, sort_key: Vec<u8> },
    MemberRemoved(Identity),
    PermissionChanged { identity: Identity, is_admin: bool },
    GroupTypeChanged(GroupType),
    EngineGroupType(GroupType),
    Publish,
    PublicationFinished,
    Discard,
    PendingChanges(oneshot::Sender<PendingChangeSet>),
    CurrentGroupType(oneshot::Sender<GroupType>),
    Shutdown,
}

/// Builder for a [`GroupSession`]
pub struct SessionBuilder {
    owned_identity: Identity,
    group: GroupId,
    config: SessionConfig,
    initial_group_type: Option<GroupType>,
}

impl SessionBuilder {
    /// Start building a session for `group` as seen by `owned_identity`
    pub fn new(owned_identity: Identity, group: GroupId) -> Self {
        Self {
            owned_identity,
            group,
            config: SessionConfig::default(),
            initial_group_type: None,
        }
    }

    /// Use a specific configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Group type reported by the engine
    ///
    /// Without it the type is inferred from the first member snapshot.
    pub fn initial_group_type(mut self, group_type: GroupType) -> Self {
        self.initial_group_type = Some(group_type);
        self
    }

    /// Subscribe to the member list and spawn the session task
    pub async fn spawn(
        self,
        source: Arc<dyn MemberListSource>,
        engine: Arc<dyn GroupEngine>,
    ) -> GroupsResult<GroupSession> {
        let upstream = source.subscribe(&self.owned_identity, &self.group).await?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_capacity());
        let (members_tx, members_rx) = watch::channel(Vec::new());
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let (notice_tx, _) = broadcast::channel(self.config.notice_capacity());
        let (publish_result_tx, publish_result_rx) = mpsc::channel(4);

        let span = info_span!(
            "group_session",
            owned = %self.owned_identity.short_id(),
            group = %self.group.short_id()
        );

        let actor = SessionActor {
            instance_id: Uuid::new_v4(),
            session: EditSession::new(
                self.owned_identity.clone(),
                self.initial_group_type.unwrap_or(GroupType::Private),
            ),
            group_type_known: self.initial_group_type.is_some(),
            owned_identity: self.owned_identity,
            group: self.group,
            store: MemberStore::new(),
            engine,
            members_tx,
            state_tx,
            notice_tx: notice_tx.clone(),
            publish_result_tx,
        };

        let task = tokio::spawn(
            actor
                .run(command_rx, upstream, publish_result_rx)
                .instrument(span),
        );

        Ok(GroupSession {
            commands: command_tx,
            members_rx,
            state_rx,
            notice_tx,
            task,
        })
    }
}

/// Handle to a running group session
///
/// Edit calls made in a state that does not accept them are ignored by the
/// session; they only fail once the session has stopped.
pub struct GroupSession {
    commands: mpsc::Sender<Command>,
    members_rx: watch::Receiver<Vec<MemberOrPending>>,
    state_rx: watch::Receiver<SessionState>,
    notice_tx: broadcast::Sender<SessionNotice>,
    task: JoinHandle<()>,
}

impl GroupSession {
    async fn send(&self, command: Command) -> GroupsResult<()> {
        self.commands.send(command).await?;
        Ok(())
    }

    /// Enter edit mode
    pub async fn start_editing(&self) -> GroupsResult<()> {
        self.send(Command::StartEditing).await
    }

    /// Select a new member
    pub async fn member_added(&self, identity: Identity, sort_key: Vec<u8>) -> GroupsResult<()> {
        self.send(Command::MemberAdded { identity, sort_key }).await
    }

    /// Remove a member, or deselect a newly added one
    pub async fn member_removed(&self, identity: Identity) -> GroupsResult<()> {
        self.send(Command::MemberRemoved(identity)).await
    }

    /// Toggle a member's admin flag
    pub async fn permission_changed(&self, identity: Identity, is_admin: bool) -> GroupsResult<()> {
        self.send(Command::PermissionChanged { identity, is_admin }).await
    }

    /// Change the group type
    pub async fn group_type_changed(&self, group_type: GroupType) -> GroupsResult<()> {
        self.send(Command::GroupTypeChanged(group_type)).await
    }

    /// Record a group type reported by the engine
    pub async fn engine_group_type(&self, group_type: GroupType) -> GroupsResult<()> {
        self.send(Command::EngineGroupType(group_type)).await
    }

    /// Compile and submit the pending edits
    pub async fn publish(&self) -> GroupsResult<()> {
        self.send(Command::Publish).await
    }

    /// The engine confirmed the last submitted update
    pub async fn publication_finished(&self) -> GroupsResult<()> {
        self.send(Command::PublicationFinished).await
    }

    /// Drop every edit and leave edit mode
    pub async fn discard(&self) -> GroupsResult<()> {
        self.send(Command::Discard).await
    }

    /// Snapshot of the pending edits
    pub async fn pending_changes(&self) -> GroupsResult<PendingChangeSet> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::PendingChanges(tx)).await?;
        Ok(rx.await?)
    }

    /// The group type in effect, including a pending change
    pub async fn group_type(&self) -> GroupsResult<GroupType> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::CurrentGroupType(tx)).await?;
        Ok(rx.await?)
    }

    /// Subscribe to the displayed member list
    pub fn members(&self) -> watch::Receiver<Vec<MemberOrPending>> {
        self.members_rx.clone()
    }

    /// The member list displayed right now
    pub fn current_members(&self) -> Vec<MemberOrPending> {
        self.members_rx.borrow().clone()
    }

    /// Subscribe to lifecycle state changes
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// The lifecycle state right now
    pub fn current_state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to user-facing notices
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notice_tx.subscribe()
    }

    /// Stop the session task and wait for it to exit
    pub async fn shutdown(self) -> GroupsResult<()> {
        // The task may already be gone; joining tells us either way
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await.map_err(|_| GroupsError::SessionClosed)
    }
}

struct SessionActor {
    owned_identity: Identity,
    group: GroupId,
    instance_id: Uuid,
    store: MemberStore,
    session: EditSession,
    group_type_known: bool,
    engine: Arc<dyn GroupEngine>,
    members_tx: watch::Sender<Vec<MemberOrPending>>,
    state_tx: watch::Sender<SessionState>,
    notice_tx: broadcast::Sender<SessionNotice>,
    publish_result_tx: mpsc::Sender<Result<(), EngineError>>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut upstream: mpsc::Receiver<Vec<MemberOrPending>>,
        mut publish_results: mpsc::Receiver<Result<(), EngineError>>,
    ) {
        let mut upstream_open = true;

        loop {
            // Snapshots and engine results drain before the next command, so
            // every edit applies to the newest member list.
            tokio::select! {
                biased;

                snapshot = upstream.recv(), if upstream_open => match snapshot {
                    Some(members) => self.handle_snapshot(members),
                    None => {
                        debug!("Member list source closed");
                        upstream_open = false;
                    }
                },
                Some(result) = publish_results.recv() => self.handle_publish_result(result),
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
            self.publish_view();
        }

        debug!("Group session task exited");
    }

    fn context(&self) -> SessionContextGuard {
        SessionContextGuard::with_instance_id(&self.owned_identity, &self.group, self.instance_id)
    }

    fn notify(&self, notice: SessionNotice) {
        // A notice never runs ahead of the state it reports
        self.publish_view();
        // No subscriber is fine
        let _ = self.notice_tx.send(notice);
    }

    fn handle_command(&mut self, command: Command) {
        let _ctx = self.context();
        let store = &self.store;

        match command {
            Command::StartEditing => {
                self.session.start_editing();
            }
            Command::MemberAdded { identity, sort_key } => {
                self.session.member_added(store, identity, sort_key);
            }
            Command::MemberRemoved(identity) => {
                self.session.member_removed(store, &identity);
            }
            Command::PermissionChanged { identity, is_admin } => {
                self.session.permission_changed(store, &identity, is_admin);
            }
            Command::GroupTypeChanged(group_type) => {
                self.session.group_type_changed(group_type);
            }
            Command::EngineGroupType(group_type) => {
                self.group_type_known = true;
                self.session.set_initial_group_type(group_type);
            }
            Command::Publish => self.publish(),
            Command::PublicationFinished => {
                if self.session.publication_finished() {
                    self.notify(SessionNotice::Published);
                }
            }
            Command::Discard => {
                self.session.discard();
            }
            Command::PendingChanges(reply) => {
                let _ = reply.send(self.session.changes().clone());
            }
            Command::CurrentGroupType(reply) => {
                let _ = reply.send(self.session.group_type());
            }
            // Handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn publish(&mut self) {
        match self.session.publish(&self.store) {
            Ok(PublishOutcome::Submit(diff)) => {
                let engine = self.engine.clone();
                let owned = self.owned_identity.clone();
                let group = self.group.clone();
                let results = self.publish_result_tx.clone();
                tokio::spawn(
                    async move {
                        let result = engine.submit_group_update(&owned, &group, diff).await;
                        // The session may have shut down meanwhile
                        let _ = results.send(result).await;
                    }
                    .in_current_span(),
                );
            }
            Ok(PublishOutcome::NothingToPublish) => self.notify(SessionNotice::NothingToPublish),
            Ok(PublishOutcome::Ignored) => {}
            Err(e) => {
                warn!(error = %e, "Failed to compile group update");
                self.notify(SessionNotice::PublishFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn handle_publish_result(&mut self, result: Result<(), EngineError>) {
        let _ctx = self.context();
        match result {
            Ok(()) => {
                info!("Group update accepted by engine");
                self.notify(SessionNotice::Submitted);
            }
            Err(e) => {
                if !self.session.publication_failed() {
                    debug!(error = %e, "Engine error for an update no longer publishing");
                    return;
                }
                warn!(error = %e, "Group update failed, edits kept for retry");
                self.notify(SessionNotice::PublishFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn handle_snapshot(&mut self, members: Vec<MemberOrPending>) {
        let _ctx = self.context();

        let vanished = self.store.refresh(members);
        debug!(
            members = self.store.len(),
            vanished = vanished.len(),
            "Member list refreshed"
        );

        // An empty list says nothing about the template; keep waiting
        if !self.group_type_known && !self.store.is_empty() {
            let inferred = GroupType::infer(self.store.members());
            info!(?inferred, "Group type inferred from member permissions");
            self.session.set_initial_group_type(inferred);
            self.group_type_known = true;
        }

        self.session.reconcile(&self.store);
    }

    fn publish_view(&self) {
        let displayed = self.session.displayed_members(&self.store);
        self.members_tx.send_if_modified(|current| {
            if *current == displayed {
                false
            } else {
                *current = displayed;
                true
            }
        });

        let state = self.session.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
