//! Scripted replay of an edit session
//!
//! A [`Scenario`] describes a group, its initial members and a sequence of
//! steps. [`replay`] drives a live [`GroupSession`] through the steps with
//! the in-memory collaborators and records what the screen and the engine
//! would have seen after each one.
//!
//! ```json
//! {
//!   "owned_identity": "ee",
//!   "group": "0102",
//!   "group_type": {"type": "private"},
//!   "members": [{"identity": "01", "sort_key": [97], "permissions": {...}}],
//!   "steps": [
//!     {"op": "start_editing"},
//!     {"op": "add", "identity": "05", "name": "eve"},
//!     {"op": "publish"}
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ensemble_core::{GroupId, GroupType, Identity, MemberOrPending};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::SessionConfig;
use crate::coordinator::SessionState;
use crate::diff::WireDiff;
use crate::error::{EngineError, GroupsError, GroupsResult};
use crate::mock::{MockGroupEngine, MockMemberListSource};
use crate::session::{GroupSession, SessionBuilder, SessionNotice};

/// How long to wait for the engine to answer a publish
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// A scripted edit session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub owned_identity: Identity,
    pub group: GroupId,
    /// Engine-reported group type; inferred from `members` when absent
    #[serde(default)]
    pub group_type: Option<GroupType>,
    #[serde(default)]
    pub config: SessionConfig,
    #[serde(default)]
    pub members: Vec<MemberOrPending>,
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a JSON file
    pub fn load(path: &Path) -> GroupsResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| GroupsError::Scenario(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// One scripted action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    StartEditing,
    /// Select a new member; `name` is used as sort key
    Add { identity: Identity, name: String },
    Remove { identity: Identity },
    SetAdmin { identity: Identity, admin: bool },
    SetGroupType { group_type: GroupType },
    /// Deliver a new member snapshot
    Refresh { members: Vec<MemberOrPending> },
    /// Make the next engine submission fail
    FailNext { reason: String },
    Publish,
    /// Engine confirmation of the last submission
    Confirm,
    Discard,
}

/// State observed after a step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub state: SessionState,
    pub displayed: Vec<MemberOrPending>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<WireDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Everything a replay observed
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<StepOutcome>,
    pub submissions: usize,
}

/// Replay a scenario against a live session
pub async fn replay(scenario: Scenario) -> GroupsResult<ReplayReport> {
    let source = Arc::new(MockMemberListSource::with_buffer_size(
        scenario.steps.len() + 1,
    ));
    let engine = Arc::new(MockGroupEngine::new());

    source.push(scenario.members.clone()).await?;

    let mut builder = SessionBuilder::new(scenario.owned_identity.clone(), scenario.group.clone())
        .config(scenario.config.clone());
    if let Some(group_type) = scenario.group_type {
        builder = builder.initial_group_type(group_type);
    }
    let session = builder.spawn(source.clone(), engine.clone()).await?;
    let mut notices = session.notices();

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.into_iter().enumerate() {
        let submissions_before = engine.submission_count();
        let notice = apply_step(&session, &source, &engine, &mut notices, step).await?;

        // Round trip through the command queue so the step has been applied
        session.pending_changes().await?;

        let submitted = engine
            .submissions()
            .get(submissions_before)
            .map(|s| s.diff.clone());
        outcomes.push(StepOutcome {
            step: index,
            state: session.current_state(),
            displayed: session.current_members(),
            submitted,
            notice: notice.map(|n| format!("{n:?}")),
        });
    }

    let submissions = engine.submission_count();
    session.shutdown().await?;
    info!(steps = outcomes.len(), submissions, "Scenario replayed");

    Ok(ReplayReport {
        outcomes,
        submissions,
    })
}

async fn apply_step(
    session: &GroupSession,
    source: &MockMemberListSource,
    engine: &MockGroupEngine,
    notices: &mut broadcast::Receiver<SessionNotice>,
    step: Step,
) -> GroupsResult<Option<SessionNotice>> {
    match step {
        Step::StartEditing => session.start_editing().await?,
        Step::Add { identity, name } => session.member_added(identity, name.into_bytes()).await?,
        Step::Remove { identity } => session.member_removed(identity).await?,
        Step::SetAdmin { identity, admin } => session.permission_changed(identity, admin).await?,
        Step::SetGroupType { group_type } => session.group_type_changed(group_type).await?,
        Step::Refresh { members } => source.push(members).await?,
        Step::FailNext { reason } => engine.fail_next(EngineError::Rejected(reason)),
        Step::Publish => {
            // Make sure earlier steps are applied before looking at the state
            session.pending_changes().await?;
            if session.current_state() != SessionState::Editing {
                session.publish().await?;
                return Ok(None);
            }
            session.publish().await?;
            return wait_for_publish_notice(notices).await.map(Some);
        }
        Step::Confirm => {
            session.publication_finished().await?;
        }
        Step::Discard => session.discard().await?,
    }
    Ok(None)
}

async fn wait_for_publish_notice(
    notices: &mut broadcast::Receiver<SessionNotice>,
) -> GroupsResult<SessionNotice> {
    let wait = async {
        loop {
            match notices.recv().await {
                Ok(SessionNotice::Published) => continue,
                Ok(notice) => return Ok(notice),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(GroupsError::SessionClosed),
            }
        }
    };
    tokio::time::timeout(PUBLISH_TIMEOUT, wait)
        .await
        .map_err(|_| GroupsError::Scenario("timed out waiting for publish result".to_string()))?
}
