//! Lifecycle audit trail.
//!
//! The service notifies an [`AuditSink`] after every successful creation,
//! approval and rejection. Sink failures are logged and never undo or
//! block the transition.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

use crate::models::{ChangeRequest, ChangeRequestId, ProgramId, StudentId};

/// Audited lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::Created => "CREATED",
            AuditAction::Approved => "APPROVED",
            AuditAction::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub request_id: ChangeRequestId,
    pub student_id: StudentId,
    pub program_id: ProgramId,
    pub at: DateTime<Utc>,
    /// Free-form context (reason, observations).
    pub details: Option<String>,
}

impl AuditEvent {
    /// Builds an event describing `request`.
    pub fn for_request(action: AuditAction, request: &ChangeRequest, at: DateTime<Utc>) -> Self {
        let details = match action {
            AuditAction::Created => Some(request.reason.clone()).filter(|r| !r.is_empty()),
            AuditAction::Rejected => request.resolution_reason.clone(),
            AuditAction::Approved => request.observations.clone(),
        };
        Self {
            action,
            request_id: request.id.clone(),
            student_id: request.student_id.clone(),
            program_id: request.assigned_program_id.clone(),
            at,
            details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit sink failed: {0}")]
pub struct AuditError(pub String);

/// Receives lifecycle events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        info!(
            target: "registrar::audit",
            action = %event.action,
            request_id = %event.request_id,
            student_id = %event.student_id,
            program_id = %event.program_id,
            at = %event.at,
            details = event.details.as_deref().unwrap_or(""),
            "change request audit"
        );
        Ok(())
    }
}

/// Keeps events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.events.lock().iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
