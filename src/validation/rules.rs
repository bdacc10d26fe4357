//! The five structural validators, in pipeline order.
//!
//! 1. [`ActiveWindow`]: term active, accepting requests, window open
//! 2. [`TargetCapacity`]: free seat in the target (live count)
//! 3. [`ConflictFree`]: target meetings don't collide with other groups
//! 4. [`Ownership`]: student attends the source, not yet the target
//! 5. [`SameCourseTerm`]: a group swap, never a course change

use super::{ValidationContext, ValidationErrorKind, ValidationResult, Validator};
use crate::schedule::{detect_conflicts, ScheduledSlot};

/// An active term accepting change requests, and an open CREATION window.
///
/// Without a window record the term flags alone decide.
#[derive(Debug, Clone, Copy)]
pub struct ActiveWindow;

impl Validator for ActiveWindow {
    fn name(&self) -> &'static str {
        "ACTIVE_WINDOW"
    }

    fn check(&self, context: &ValidationContext) -> ValidationResult {
        let term = match &context.active_term {
            Some(term) if term.accepts_change_requests() => term,
            _ => {
                return ValidationResult::failure(
                    ValidationErrorKind::NoActiveTerm,
                    "no active term accepting change requests",
                )
            }
        };

        if context.enforce_windows {
            if let Some(window) = &context.creation_window {
                if !window.is_open_at(context.now) {
                    return ValidationResult::failure(
                        ValidationErrorKind::WindowClosed,
                        format!("change request window for term {} is closed", term.code),
                    );
                }
            }
        }

        ValidationResult::ok()
    }

    fn description(&self) -> &'static str {
        "Active term with an open change window"
    }
}

/// A free seat in the target group.
///
/// Uses the live ENROLLED count, never the cached counter. Warns when the
/// group is nearly full or the cached counter has drifted.
#[derive(Debug, Clone, Copy)]
pub struct TargetCapacity;

impl Validator for TargetCapacity {
    fn name(&self) -> &'static str {
        "TARGET_CAPACITY"
    }

    fn check(&self, context: &ValidationContext) -> ValidationResult {
        let target = &context.target;
        let enrolled = context.target_enrolled;
        let mut result = ValidationResult::ok();

        if !target.has_seat(enrolled) {
            result.push_error(
                ValidationErrorKind::TargetFull,
                format!(
                    "target group {} is full ({}/{} seats taken)",
                    target.id, enrolled, target.capacity
                ),
            );
        } else if target.occupancy(enrolled) >= context.capacity_warning_ratio {
            result.push_warning(format!(
                "target group {} is at {:.0}% capacity",
                target.id,
                target.occupancy(enrolled) * 100.0
            ));
        }

        if target.current_enrollment_count != enrolled {
            result.push_warning(format!(
                "cached enrollment count for group {} is stale (cached {}, live {})",
                target.id, target.current_enrollment_count, enrolled
            ));
        }

        result
    }

    fn description(&self) -> &'static str {
        "Target group has a free seat"
    }
}

/// Target meetings must not collide with the student's other groups.
///
/// The source group is excluded since the student is leaving it.
#[derive(Debug, Clone, Copy)]
pub struct ConflictFree;

impl Validator for ConflictFree {
    fn name(&self) -> &'static str {
        "CONFLICT_FREE"
    }

    fn check(&self, context: &ValidationContext) -> ValidationResult {
        let candidate = ScheduledSlot::from_group(&context.target.id, &context.target.slots);
        let committed: Vec<ScheduledSlot> = context
            .committed_slots
            .iter()
            .filter(|s| s.group_id != context.source.id && s.group_id != context.target.id)
            .cloned()
            .collect();

        let mut result = ValidationResult::ok();
        for conflict in detect_conflicts(&candidate, &committed) {
            result.push_error(
                ValidationErrorKind::ScheduleConflict,
                format!("schedule conflict: {conflict}"),
            );
        }
        result
    }

    fn description(&self) -> &'static str {
        "Target meetings fit the student's timetable"
    }
}

/// The student attends the source group and holds no seat in the target.
#[derive(Debug, Clone, Copy)]
pub struct Ownership;

impl Validator for Ownership {
    fn name(&self) -> &'static str {
        "OWNERSHIP"
    }

    fn check(&self, context: &ValidationContext) -> ValidationResult {
        let mine = context
            .student_enrollments
            .iter()
            .filter(|e| e.student_id == context.student_id);

        let mut in_source = false;
        let mut in_target = false;
        for e in mine {
            if e.group_id == context.source.id && e.is_enrolled() {
                in_source = true;
            }
            if e.group_id == context.target.id && e.status.is_holding() {
                in_target = true;
            }
        }

        let mut result = ValidationResult::ok();
        if !in_source {
            result.push_error(
                ValidationErrorKind::NotEnrolledInSource,
                format!(
                    "student {} is not enrolled in source group {}",
                    context.student_id, context.source.id
                ),
            );
        }
        if in_target {
            result.push_error(
                ValidationErrorKind::AlreadyEnrolledInTarget,
                format!(
                    "student {} already holds a seat in target group {}",
                    context.student_id, context.target.id
                ),
            );
        }
        result
    }

    fn description(&self) -> &'static str {
        "Student attends the source group"
    }
}

/// Source and target teach the same course in the same (active) term.
#[derive(Debug, Clone, Copy)]
pub struct SameCourseTerm;

impl Validator for SameCourseTerm {
    fn name(&self) -> &'static str {
        "SAME_COURSE_TERM"
    }

    fn check(&self, context: &ValidationContext) -> ValidationResult {
        let (source, target) = (&context.source, &context.target);
        let mut result = ValidationResult::ok();

        if source.course_id != target.course_id {
            result.push_error(
                ValidationErrorKind::CourseMismatch,
                format!(
                    "groups {} and {} teach different courses ({} vs {})",
                    source.id, target.id, source.course_id, target.course_id
                ),
            );
        }
        if source.term_id != target.term_id {
            result.push_error(
                ValidationErrorKind::TermMismatch,
                format!(
                    "groups {} and {} run in different terms ({} vs {})",
                    source.id, target.id, source.term_id, target.term_id
                ),
            );
        } else if let Some(term) = &context.active_term {
            if source.term_id != term.id {
                result.push_error(
                    ValidationErrorKind::TermMismatch,
                    format!("groups do not belong to the active term {}", term.code),
                );
            }
        }
        result
    }

    fn description(&self) -> &'static str {
        "Source and target share course and term"
    }
}
