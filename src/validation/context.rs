//! Input data for validator evaluation.

use chrono::{DateTime, Utc};

use crate::models::{AcademicTerm, ChangeWindow, CourseGroup, Enrollment, StudentId};
use crate::schedule::ScheduledSlot;

/// Everything the validators need, fetched before the pipeline runs.
///
/// The active term is passed in explicitly; validators never look it up.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Requesting student.
    pub student_id: StudentId,
    /// Group being left.
    pub source: CourseGroup,
    /// Group being joined.
    pub target: CourseGroup,
    /// The current term, if one is active.
    pub active_term: Option<AcademicTerm>,
    /// CREATION window of the active term, if the registrar defined one.
    pub creation_window: Option<ChangeWindow>,
    /// Whether change windows are enforced at all.
    pub enforce_windows: bool,
    /// Evaluation instant.
    pub now: DateTime<Utc>,
    /// Live ENROLLED count of the target group.
    pub target_enrolled: u32,
    /// All of the student's enrollments.
    pub student_enrollments: Vec<Enrollment>,
    /// Meetings of every group the student currently attends.
    pub committed_slots: Vec<ScheduledSlot>,
    /// Occupancy ratio at which a capacity warning is emitted.
    pub capacity_warning_ratio: f64,
}

impl ValidationContext {
    /// Creates a context with no term, no enrollments and an empty target.
    pub fn new(
        student_id: impl Into<StudentId>,
        source: CourseGroup,
        target: CourseGroup,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            source,
            target,
            active_term: None,
            creation_window: None,
            enforce_windows: true,
            now,
            target_enrolled: 0,
            student_enrollments: Vec::new(),
            committed_slots: Vec::new(),
            capacity_warning_ratio: 0.9,
        }
    }

    /// Sets the active term.
    pub fn with_active_term(mut self, term: AcademicTerm) -> Self {
        self.active_term = Some(term);
        self
    }

    /// Sets the creation window.
    pub fn with_creation_window(mut self, window: ChangeWindow) -> Self {
        self.creation_window = Some(window);
        self
    }

    /// Sets the live target count.
    pub fn with_target_enrolled(mut self, count: u32) -> Self {
        self.target_enrolled = count;
        self
    }

    /// Sets the student's enrollments.
    pub fn with_enrollments(mut self, enrollments: Vec<Enrollment>) -> Self {
        self.student_enrollments = enrollments;
        self
    }

    /// Sets the committed meetings.
    pub fn with_committed_slots(mut self, slots: Vec<ScheduledSlot>) -> Self {
        self.committed_slots = slots;
        self
    }

    /// Sets the capacity warning threshold.
    pub fn with_capacity_warning_ratio(mut self, ratio: f64) -> Self {
        self.capacity_warning_ratio = ratio;
        self
    }

    /// Turns change-window enforcement on or off.
    pub fn with_window_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_windows = enforce;
        self
    }
}
