//! Change requests and their lifecycle.
//!
//! # State machine
//!
//! ```text
//!            approve()
//!   PENDING ───────────► APPROVED
//!      │
//!      │ reject(reason)
//!      ▼
//!   REJECTED
//! ```
//!
//! APPROVED and REJECTED are sinks: every transition attempted from them
//! fails and leaves the request untouched (including `resolved_at`).
//! There is no student-side cancellation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{ChangeRequestId, GroupId, ProgramId, StudentId};

/// Change request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeRequestStatus {
    /// Whether no further transitions are possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, ChangeRequestStatus::Pending)
    }
}

impl fmt::Display for ChangeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeRequestStatus::Pending => "PENDING",
            ChangeRequestStatus::Approved => "APPROVED",
            ChangeRequestStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// Which routing row assigned the owning program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingReason {
    /// Source and target courses share a program.
    SameProgram,
    /// The target course's program owns the approval.
    TargetProgram,
    /// Only the source course is mapped.
    SourceProgram,
    /// Neither course is mapped; the student's own program.
    StudentProgram,
}

impl fmt::Display for RoutingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoutingReason::SameProgram => "SAME_PROGRAM",
            RoutingReason::TargetProgram => "TARGET_PROGRAM",
            RoutingReason::SourceProgram => "SOURCE_PROGRAM",
            RoutingReason::StudentProgram => "STUDENT_PROGRAM",
        };
        f.write_str(s)
    }
}

/// Lifecycle operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    Approve,
    Reject,
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionAction::Approve => f.write_str("approve"),
            TransitionAction::Reject => f.write_str("reject"),
        }
    }
}

/// Lifecycle violations raised by [`ChangeRequest`] transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {action} change request {id}: it is already {from}")]
    InvalidStateTransition {
        id: ChangeRequestId,
        from: ChangeRequestStatus,
        action: TransitionAction,
    },
    #[error("a resolution reason is required to reject a change request")]
    MissingResolutionReason,
}

/// Student-supplied payload for filing a change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChangeRequest {
    /// Group the student wants to leave.
    pub source_group_id: GroupId,
    /// Group the student wants to join.
    pub target_group_id: GroupId,
    /// Student's motivation.
    #[serde(default)]
    pub reason: String,
}

impl CreateChangeRequest {
    pub fn new(source: impl Into<GroupId>, target: impl Into<GroupId>) -> Self {
        Self {
            source_group_id: source.into(),
            target_group_id: target.into(),
            reason: String::new(),
        }
    }

    /// Sets the student's motivation.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// A student's petition to move between two groups of the same course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: ChangeRequestId,
    pub student_id: StudentId,
    pub source_group_id: GroupId,
    pub target_group_id: GroupId,
    /// Program whose reviewers own the decision.
    pub assigned_program_id: ProgramId,
    /// Routing row that picked `assigned_program_id`.
    pub routing_reason: RoutingReason,
    pub status: ChangeRequestStatus,
    /// Student's motivation.
    pub reason: String,
    /// Reviewer's reason (mandatory on rejection).
    pub resolution_reason: Option<String>,
    /// Free-form reviewer notes.
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    /// Creates a PENDING request with a generated id.
    pub fn pending(
        student_id: StudentId,
        draft: CreateChangeRequest,
        assigned_program_id: ProgramId,
        routing_reason: RoutingReason,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ChangeRequestId::generate(),
            student_id,
            source_group_id: draft.source_group_id,
            target_group_id: draft.target_group_id,
            assigned_program_id,
            routing_reason,
            status: ChangeRequestStatus::Pending,
            reason: draft.reason,
            resolution_reason: None,
            observations: None,
            created_at,
            resolved_at: None,
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == ChangeRequestStatus::Pending
    }

    /// Fails unless the request is still PENDING.
    pub fn ensure_pending(&self, action: TransitionAction) -> Result<(), LifecycleError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(LifecycleError::InvalidStateTransition {
                id: self.id.clone(),
                from: self.status,
                action,
            })
        }
    }

    /// PENDING → APPROVED.
    ///
    /// Only the in-memory state changes here; persisting it together with
    /// the enrollment swap is the caller's job.
    pub fn approve(
        &mut self,
        observations: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.ensure_pending(TransitionAction::Approve)?;
        self.status = ChangeRequestStatus::Approved;
        self.observations = observations;
        self.resolved_at = Some(now);
        Ok(())
    }

    /// PENDING → REJECTED. `resolution_reason` must not be blank.
    pub fn reject(
        &mut self,
        resolution_reason: &str,
        observations: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.ensure_pending(TransitionAction::Reject)?;
        let reason = resolution_reason.trim();
        if reason.is_empty() {
            return Err(LifecycleError::MissingResolutionReason);
        }
        self.status = ChangeRequestStatus::Rejected;
        self.resolution_reason = Some(reason.to_string());
        self.observations = observations;
        self.resolved_at = Some(now);
        Ok(())
    }
}
