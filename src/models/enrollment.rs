//! Enrollment records.
//!
//! An enrollment ties a student to a course group for one term.
//!
//! # Status transitions
//! Statuses only move forward from ENROLLED:
//!
//! | From | To |
//! |------|----|
//! | ENROLLED | CANCELLED, PASSED, FAILED |
//!
//! CANCELLED, PASSED and FAILED are final. Cancelled rows are kept (not
//! deleted) so a swapped-out group stays visible in the student's history.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{EnrollmentId, GroupId, StudentId, TermId};

/// Enrollment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    /// Currently attending.
    Enrolled,
    /// Dropped or swapped out.
    Cancelled,
    /// Completed with a passing grade.
    Passed,
    /// Completed with a failing grade.
    Failed,
}

impl EnrollmentStatus {
    /// Whether this status can still change.
    #[inline]
    pub fn is_final(self) -> bool {
        !matches!(self, EnrollmentStatus::Enrolled)
    }

    /// Statuses that count as holding a seat or credit in a group
    /// (duplicate-enrollment check).
    #[inline]
    pub fn is_holding(self) -> bool {
        matches!(self, EnrollmentStatus::Enrolled | EnrollmentStatus::Passed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: EnrollmentStatus) -> bool {
        matches!(
            (self, next),
            (
                EnrollmentStatus::Enrolled,
                EnrollmentStatus::Cancelled | EnrollmentStatus::Passed | EnrollmentStatus::Failed
            )
        )
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnrollmentStatus::Enrolled => "ENROLLED",
            EnrollmentStatus::Cancelled => "CANCELLED",
            EnrollmentStatus::Passed => "PASSED",
            EnrollmentStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Rejected status change on an enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("enrollment {id} cannot move from {from} to {to}")]
pub struct EnrollmentTransitionError {
    pub id: EnrollmentId,
    pub from: EnrollmentStatus,
    pub to: EnrollmentStatus,
}

/// A student's enrollment in a course group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Unique enrollment identifier.
    pub id: EnrollmentId,
    /// Enrolled student.
    pub student_id: StudentId,
    /// Group the student sits in.
    pub group_id: GroupId,
    /// Term of the group (denormalized for filtering).
    pub term_id: TermId,
    /// Current status.
    pub status: EnrollmentStatus,
    /// Final grade on the 0..5 scale, if graded.
    pub grade: Option<f64>,
}

impl Enrollment {
    /// Creates an ENROLLED record with a generated id.
    pub fn enrolled(
        student_id: impl Into<StudentId>,
        group_id: impl Into<GroupId>,
        term_id: impl Into<TermId>,
    ) -> Self {
        Self {
            id: EnrollmentId::generate(),
            student_id: student_id.into(),
            group_id: group_id.into(),
            term_id: term_id.into(),
            status: EnrollmentStatus::Enrolled,
            grade: None,
        }
    }

    /// Replaces the generated id.
    pub fn with_id(mut self, id: impl Into<EnrollmentId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the status without transition checks (fixtures, imports).
    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the grade.
    pub fn with_grade(mut self, grade: f64) -> Self {
        self.grade = Some(grade);
        self
    }

    /// Whether the student currently attends this group.
    #[inline]
    pub fn is_enrolled(&self) -> bool {
        self.status == EnrollmentStatus::Enrolled
    }

    /// Applies a status change, enforcing the one-way transition table.
    pub fn transition_to(&mut self, next: EnrollmentStatus) -> Result<(), EnrollmentTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(EnrollmentTransitionError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrolled_constructor() {
        let e = Enrollment::enrolled("S1", "G1", "T1");
        assert!(e.is_enrolled());
        assert_eq!(e.grade, None);
        assert!(!e.status.is_final());
    }

    #[test]
    fn test_forward_transitions() {
        for next in [
            EnrollmentStatus::Cancelled,
            EnrollmentStatus::Passed,
            EnrollmentStatus::Failed,
        ] {
            let mut e = Enrollment::enrolled("S1", "G1", "T1");
            assert!(e.transition_to(next).is_ok());
            assert_eq!(e.status, next);
        }
    }

    #[test]
    fn test_final_statuses_are_sinks() {
        let mut e = Enrollment::enrolled("S1", "G1", "T1").with_status(EnrollmentStatus::Cancelled);
        let err = e.transition_to(EnrollmentStatus::Enrolled).unwrap_err();
        assert_eq!(err.from, EnrollmentStatus::Cancelled);
        assert_eq!(err.to, EnrollmentStatus::Enrolled);
        assert_eq!(e.status, EnrollmentStatus::Cancelled);

        let mut passed = Enrollment::enrolled("S1", "G1", "T1").with_status(EnrollmentStatus::Passed);
        assert!(passed.transition_to(EnrollmentStatus::Failed).is_err());
    }

    #[test]
    fn test_holding_statuses() {
        assert!(EnrollmentStatus::Enrolled.is_holding());
        assert!(EnrollmentStatus::Passed.is_holding());
        assert!(!EnrollmentStatus::Cancelled.is_holding());
        assert!(!EnrollmentStatus::Failed.is_holding());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&EnrollmentStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }
}
