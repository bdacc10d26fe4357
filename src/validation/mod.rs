//! Structural validation of change requests.
//!
//! Checks whether moving a student from a source group to a target group
//! is legal before anything is persisted. Detects:
//! - No active term (or a closed creation window)
//! - A full target group
//! - Weekly schedule collisions with the student's other groups
//! - A source group the student doesn't attend
//! - Source and target groups of different courses or terms
//!
//! Validators are independent [`Validator`] implementations registered in a
//! fixed order in a [`ValidationPipeline`]. The pipeline runs all of them
//! and accumulates every error, so the caller sees the complete set of
//! reasons; the request is rejected if any error exists.
//!
//! Validators are pure over a [`ValidationContext`] fetched up front, which
//! makes validation idempotent: the same context always yields the same
//! result.

mod context;
pub mod rules;

pub use context::ValidationContext;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::debug;

use crate::models::GroupId;

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    /// Source and target are the same group.
    SameGroup,
    /// No active term accepting change requests.
    NoActiveTerm,
    /// The creation or approval window is closed.
    WindowClosed,
    /// The target group has no free seat.
    TargetFull,
    /// A target meeting collides with another attended group.
    ScheduleConflict,
    /// The student doesn't attend the source group.
    NotEnrolledInSource,
    /// The student already holds a seat in the target group.
    AlreadyEnrolledInTarget,
    /// Source and target teach different courses.
    CourseMismatch,
    /// Source and target run in different terms (or not the active one).
    TermMismatch,
    /// A PENDING request for the same source group already exists.
    DuplicatePendingRequest,
    /// Rejection without a reason.
    MissingResolutionReason,
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one validator or of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Hard failures.
    pub errors: Vec<ValidationError>,
    /// Advisory notes that never fail a request.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no notes.
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failing result with a single error.
    pub fn failure(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        let mut result = Self::ok();
        result.push_error(kind, message);
        result
    }

    /// Records a hard failure.
    pub fn push_error(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ValidationError::new(kind, message));
        self.is_valid = false;
    }

    /// Records an advisory note.
    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Folds another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid && other.errors.is_empty();
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Whether any error has the given kind.
    pub fn has_error(&self, kind: ValidationErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Error messages in pipeline order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// All error messages joined with `"; "`.
    pub fn summary(&self) -> String {
        self.messages().join("; ")
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// A structural check on a change request.
pub trait Validator: Send + Sync + Debug {
    /// Short rule name (e.g., "ACTIVE_WINDOW").
    fn name(&self) -> &'static str;

    /// Checks the request described by `context`.
    fn check(&self, context: &ValidationContext) -> ValidationResult;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Rejects a request whose source and target are the same group.
///
/// Runs at the entry point, before any data is fetched or any validator runs.
pub fn check_distinct_groups(source: &GroupId, target: &GroupId) -> Option<ValidationResult> {
    if source == target {
        Some(ValidationResult::failure(
            ValidationErrorKind::SameGroup,
            format!("source and target group must differ (both are {source})"),
        ))
    } else {
        None
    }
}

/// Ordered list of validators.
///
/// # Example
/// ```
/// use u_registrar::validation::ValidationPipeline;
///
/// let pipeline = ValidationPipeline::standard();
/// assert_eq!(
///     pipeline.names(),
///     vec!["ACTIVE_WINDOW", "TARGET_CAPACITY", "CONFLICT_FREE", "OWNERSHIP", "SAME_COURSE_TERM"]
/// );
/// ```
#[derive(Clone)]
pub struct ValidationPipeline {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidationPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// The five structural checks in their fixed order.
    pub fn standard() -> Self {
        Self::new()
            .with_validator(rules::ActiveWindow)
            .with_validator(rules::TargetCapacity)
            .with_validator(rules::ConflictFree)
            .with_validator(rules::Ownership)
            .with_validator(rules::SameCourseTerm)
    }

    /// Appends a validator.
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Registered rule names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Runs the entry-point check, then every validator, accumulating all
    /// errors and warnings.
    pub fn validate(&self, context: &ValidationContext) -> ValidationResult {
        if let Some(result) = check_distinct_groups(&context.source.id, &context.target.id) {
            return result;
        }
        self.run(context)
    }

    /// Runs every validator without the entry-point check.
    pub fn run(&self, context: &ValidationContext) -> ValidationResult {
        let mut result = ValidationResult::ok();
        for validator in &self.validators {
            let outcome = validator.check(context);
            debug!(
                rule = validator.name(),
                valid = outcome.is_valid,
                errors = outcome.errors.len(),
                "validator evaluated"
            );
            result.merge(outcome);
        }
        result
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Debug for ValidationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("validators", &self.names())
            .finish()
    }
}
