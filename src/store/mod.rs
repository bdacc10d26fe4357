//! Persistence collaborator.
//!
//! The engine never talks to a database directly: every read and write goes
//! through [`RegistrarStore`]. [`InMemoryStore`] is the bundled
//! implementation used by tests and embedding applications.
//!
//! # Atomicity
//!
//! [`RegistrarStore::commit_approval`] must apply the request status change,
//! the source cancellation and the new target enrollment as one unit: either
//! all three are visible afterwards or none is.

mod memory;

pub use memory::InMemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    AcademicTerm, ChangeRequest, ChangeRequestId, ChangeRequestStatus, ChangeWindow, Course,
    CourseGroup, CourseId, CourseProgramMapping, Enrollment, EnrollmentId, EnrollmentStatus,
    GroupId, ProgramId, Student, StudentId, TermId, WeeklySlot, WindowType,
};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A conditional write lost a race or would break a uniqueness rule.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// Backend temporarily unreachable. Safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Enrollment query. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentFilter {
    pub student_id: Option<StudentId>,
    pub group_id: Option<GroupId>,
    pub term_id: Option<TermId>,
    /// Accepted statuses; empty means any.
    pub statuses: Vec<EnrollmentStatus>,
}

impl EnrollmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_student(mut self, student_id: impl Into<StudentId>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn in_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn in_term(mut self, term_id: impl Into<TermId>) -> Self {
        self.term_id = Some(term_id.into());
        self
    }

    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.statuses.push(status);
        self
    }

    /// Shorthand for ENROLLED rows only.
    pub fn enrolled(self) -> Self {
        self.with_status(EnrollmentStatus::Enrolled)
    }

    pub fn matches(&self, e: &Enrollment) -> bool {
        self.student_id.as_ref().map_or(true, |s| &e.student_id == s)
            && self.group_id.as_ref().map_or(true, |g| &e.group_id == g)
            && self.term_id.as_ref().map_or(true, |t| &e.term_id == t)
            && (self.statuses.is_empty() || self.statuses.contains(&e.status))
    }
}

/// Change request query. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRequestFilter {
    pub student_id: Option<StudentId>,
    pub program_id: Option<ProgramId>,
    pub status: Option<ChangeRequestStatus>,
    pub source_group_id: Option<GroupId>,
}

impl ChangeRequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_student(mut self, student_id: impl Into<StudentId>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn for_program(mut self, program_id: impl Into<ProgramId>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    pub fn with_status(mut self, status: ChangeRequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn from_group(mut self, group_id: impl Into<GroupId>) -> Self {
        self.source_group_id = Some(group_id.into());
        self
    }

    pub fn matches(&self, r: &ChangeRequest) -> bool {
        self.student_id.as_ref().map_or(true, |s| &r.student_id == s)
            && self
                .program_id
                .as_ref()
                .map_or(true, |p| &r.assigned_program_id == p)
            && self.status.map_or(true, |s| r.status == s)
            && self
                .source_group_id
                .as_ref()
                .map_or(true, |g| &r.source_group_id == g)
    }
}

/// Reviewer-supplied fields written with a status change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionFields {
    pub resolution_reason: Option<String>,
    pub observations: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ResolutionFields {
    /// Copies the resolution fields off a transitioned request.
    pub fn from_request(request: &ChangeRequest) -> Self {
        Self {
            resolution_reason: request.resolution_reason.clone(),
            observations: request.observations.clone(),
            resolved_at: request.resolved_at,
        }
    }
}

/// Everything an approval writes, applied atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalCommit {
    pub request_id: ChangeRequestId,
    pub resolution: ResolutionFields,
    /// Source enrollment moving ENROLLED → CANCELLED.
    pub cancel_enrollment_id: EnrollmentId,
    /// Fresh ENROLLED row in the target group.
    pub new_enrollment: Enrollment,
}

/// Data access used by the engine.
///
/// Lookups return `Ok(None)` for absent rows; writes return
/// [`StoreError::NotFound`] when the row they modify does not exist.
pub trait RegistrarStore: Send + Sync {
    fn find_course_group(&self, id: &GroupId) -> StoreResult<Option<CourseGroup>>;

    fn find_course(&self, id: &CourseId) -> StoreResult<Option<Course>>;

    fn find_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<Vec<Enrollment>>;

    /// Live count of matching rows.
    fn count_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<u32>;

    /// Meetings of a group; empty for an unknown group.
    fn find_weekly_slots(&self, group_id: &GroupId) -> StoreResult<Vec<WeeklySlot>>;

    /// The term flagged active, if any.
    fn find_active_term(&self) -> StoreResult<Option<AcademicTerm>>;

    fn find_change_window(
        &self,
        term_id: &TermId,
        window_type: WindowType,
    ) -> StoreResult<Option<ChangeWindow>>;

    fn find_student(&self, id: &StudentId) -> StoreResult<Option<Student>>;

    /// Program ownership of a course, if mapped.
    fn find_course_program_mapping(
        &self,
        course_id: &CourseId,
    ) -> StoreResult<Option<CourseProgramMapping>>;

    fn find_change_request(&self, id: &ChangeRequestId) -> StoreResult<Option<ChangeRequest>>;

    /// Matching requests, oldest first.
    fn find_change_requests(&self, filter: &ChangeRequestFilter) -> StoreResult<Vec<ChangeRequest>>;

    /// Persists a new request.
    ///
    /// Fails with [`StoreError::Conflict`] if the id exists, or if the request
    /// is PENDING and the student already has a PENDING request from the same
    /// source group.
    fn create_change_request(&self, request: &ChangeRequest) -> StoreResult<()>;

    /// Moves a PENDING request to `status`.
    ///
    /// Fails with [`StoreError::Conflict`] if the stored request is no longer
    /// PENDING.
    fn update_change_request_status(
        &self,
        id: &ChangeRequestId,
        status: ChangeRequestStatus,
        resolution: &ResolutionFields,
    ) -> StoreResult<()>;

    fn create_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()>;

    fn update_enrollment_status(
        &self,
        id: &EnrollmentId,
        status: EnrollmentStatus,
    ) -> StoreResult<()>;

    /// Applies an approval as one unit. See the module docs.
    fn commit_approval(&self, commit: &ApprovalCommit) -> StoreResult<()>;

    /// Overwrites a group's cached counter.
    fn sync_enrollment_count(&self, group_id: &GroupId, count: u32) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_filter() {
        let e = Enrollment::enrolled("S1", "G1", "T1");
        assert!(EnrollmentFilter::new().matches(&e));
        assert!(EnrollmentFilter::new().for_student("S1").enrolled().matches(&e));
        assert!(!EnrollmentFilter::new().in_group("G2").matches(&e));
        assert!(!EnrollmentFilter::new()
            .with_status(EnrollmentStatus::Passed)
            .matches(&e));
        assert!(EnrollmentFilter::new()
            .with_status(EnrollmentStatus::Passed)
            .with_status(EnrollmentStatus::Enrolled)
            .in_term("T1")
            .matches(&e));
    }

    #[test]
    fn test_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::Conflict("lost race".into()).is_retryable());
        assert!(!StoreError::not_found("group", "G1").is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(StoreError::not_found("group", "G9").to_string(), "group G9 not found");
    }
}
