//! Routing engine: liveness filtering plus first-match table evaluation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{rules, RoutingContext, RoutingDecision, RoutingError, RoutingRule};
use crate::models::{ProgramId, StudentId};

/// Answers whether a program may currently own approvals.
pub trait ProgramDirectory: Send + Sync {
    fn is_active(&self, program_id: &ProgramId) -> bool;
}

/// Every program is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllProgramsActive;

impl ProgramDirectory for AllProgramsActive {
    fn is_active(&self, _program_id: &ProgramId) -> bool {
        true
    }
}

/// A fixed set of inactive programs.
impl ProgramDirectory for HashSet<ProgramId> {
    fn is_active(&self, program_id: &ProgramId) -> bool {
        !self.contains(program_id)
    }
}

impl<F> ProgramDirectory for F
where
    F: Fn(&ProgramId) -> bool + Send + Sync,
{
    fn is_active(&self, program_id: &ProgramId) -> bool {
        self(program_id)
    }
}

/// Ordered routing table with a program-liveness filter.
///
/// Total as long as the fallback row can produce a program; otherwise
/// [`RoutingError::NoProgram`].
#[derive(Clone)]
pub struct RoutingEngine {
    rules: Vec<Arc<dyn RoutingRule>>,
    directory: Arc<dyn ProgramDirectory>,
}

impl RoutingEngine {
    /// Creates an engine with no rows.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            directory: Arc::new(AllProgramsActive),
        }
    }

    /// The five-row table in its fixed order.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(rules::SameProgram)
            .with_rule(rules::TargetProgram)
            .with_rule(rules::SourceProgram)
            .with_rule(rules::TargetOnly)
            .with_rule(rules::StudentProgram)
    }

    /// Appends a row.
    pub fn with_rule<R: RoutingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Sets the liveness check.
    pub fn with_directory<D: ProgramDirectory + 'static>(mut self, directory: D) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    /// Shares an existing liveness check.
    pub fn with_shared_directory(mut self, directory: Arc<dyn ProgramDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Row names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Routes a request from raw mappings.
    ///
    /// Mappings to inactive programs are treated as absent, so an inactive
    /// program is never returned.
    pub fn route(
        &self,
        student_id: &StudentId,
        source_program: Option<&ProgramId>,
        target_program: Option<&ProgramId>,
        student_program: Option<&ProgramId>,
    ) -> Result<RoutingDecision, RoutingError> {
        let context = RoutingContext {
            source_program: self.live(source_program),
            target_program: self.live(target_program),
            student_program: self.live(student_program),
        };
        self.route_context(student_id, &context)
    }

    /// Evaluates the table against an already-filtered context.
    pub fn route_context(
        &self,
        student_id: &StudentId,
        context: &RoutingContext,
    ) -> Result<RoutingDecision, RoutingError> {
        for rule in &self.rules {
            if let Some(decision) = rule.route(context) {
                debug!(
                    student = %student_id,
                    rule = decision.rule,
                    program = %decision.program_id,
                    "change request routed"
                );
                return Ok(decision);
            }
        }
        Err(RoutingError::NoProgram {
            student_id: student_id.clone(),
        })
    }

    fn live(&self, program: Option<&ProgramId>) -> Option<ProgramId> {
        program
            .filter(|p| self.directory.is_active(p))
            .cloned()
    }
}

impl Default for RoutingEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("rules", &self.names())
            .finish()
    }
}
