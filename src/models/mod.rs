//! Registrar domain models.
//!
//! Core data types for course groups, enrollments and change requests.
//! Entity references are typed ids ([`GroupId`], [`CourseId`], ...) resolved
//! through the store at the boundary; models never embed each other.
//!
//! # Ownership
//!
//! | Entity | Owned by | Mutated by the engine |
//! |--------|----------|-----------------------|
//! | CourseGroup / WeeklySlot | Registrar office | counter re-sync only |
//! | Enrollment | Student record | status, on approval |
//! | ChangeRequest | Student, then reviewer | lifecycle transitions |
//! | AcademicTerm / ChangeWindow | Registrar office | never |

mod change_request;
mod enrollment;
mod group;
mod ids;
mod slot;
mod student;
mod term;

pub use change_request::{
    ChangeRequest, ChangeRequestStatus, CreateChangeRequest, LifecycleError, RoutingReason,
    TransitionAction,
};
pub use enrollment::{Enrollment, EnrollmentStatus, EnrollmentTransitionError};
pub use group::{Course, CourseGroup};
pub use ids::{ChangeRequestId, CourseId, EnrollmentId, GroupId, ProgramId, StudentId, TermId};
pub use slot::{format_clock, overlaps, parse_clock, DayOfWeek, SlotError, WeeklySlot, MINUTES_PER_DAY};
pub use student::{CourseProgramMapping, Student};
pub use term::{AcademicTerm, ChangeWindow, WindowType};
