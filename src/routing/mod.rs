//! Program routing for change requests.
//!
//! Assigns every change request to exactly one academic program's approval
//! queue. The decision is a small ordered table of [`RoutingRule`]s
//! evaluated top to bottom; the first rule that returns a decision wins.
//!
//! | # | Rule | Condition | Assigned program |
//! |---|------|-----------|------------------|
//! | 1 | SAME_PROGRAM | both courses mapped, same program | that program |
//! | 2 | TARGET_PROGRAM | both mapped, different programs | target's |
//! | 3 | SOURCE_PROGRAM | only source mapped | source's |
//! | 4 | TARGET_ONLY | only target mapped | target's (reason TARGET_PROGRAM) |
//! | 5 | STUDENT_PROGRAM | nothing mapped | student's declared program |
//!
//! Program liveness is a separate, injectable [`ProgramDirectory`] check
//! applied to the inputs before the table runs, so the table itself stays
//! a pure function of the mappings.
//!
//! # Usage
//!
//! ```
//! use u_registrar::models::{ProgramId, RoutingReason, StudentId};
//! use u_registrar::routing::RoutingEngine;
//!
//! let engine = RoutingEngine::standard();
//! let p1 = ProgramId::new("P1");
//! let decision = engine
//!     .route(&StudentId::new("S1"), Some(&p1), Some(&p1), None)
//!     .unwrap();
//! assert_eq!(decision.reason, RoutingReason::SameProgram);
//! assert_eq!(decision.program_id, p1);
//! ```

mod engine;
pub mod rules;

pub use engine::{AllProgramsActive, ProgramDirectory, RoutingEngine};

use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

pub use crate::models::RoutingReason;
use crate::models::{ProgramId, StudentId};

/// Program ownership facts a routing rule looks at.
///
/// Mappings to inactive programs have already been dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingContext {
    /// Program owning the source course.
    pub source_program: Option<ProgramId>,
    /// Program owning the target course.
    pub target_program: Option<ProgramId>,
    /// Requesting student's declared program.
    pub student_program: Option<ProgramId>,
}

impl RoutingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, program: impl Into<ProgramId>) -> Self {
        self.source_program = Some(program.into());
        self
    }

    pub fn with_target(mut self, program: impl Into<ProgramId>) -> Self {
        self.target_program = Some(program.into());
        self
    }

    pub fn with_student(mut self, program: impl Into<ProgramId>) -> Self {
        self.student_program = Some(program.into());
        self
    }
}

/// The owning program and the rule that chose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub program_id: ProgramId,
    pub reason: RoutingReason,
    /// Name of the matching table row.
    pub rule: &'static str,
}

/// Routing failures. Never retryable: they signal missing reference data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no program could be determined for student {student_id}: no active course mapping and no declared program")]
    NoProgram { student_id: StudentId },
}

/// One row of the routing table.
pub trait RoutingRule: Send + Sync + Debug {
    /// Row name (e.g., "SAME_PROGRAM").
    fn name(&self) -> &'static str;

    /// Returns a decision if this row applies.
    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision>;

    /// Row description.
    fn description(&self) -> &'static str {
        self.name()
    }
}
