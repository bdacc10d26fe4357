//! Built-in routing table rows, in evaluation order.
//!
//! Each row only fires under its own condition, so the rows stay correct
//! even if evaluated out of order; order matters only for the
//! STUDENT_PROGRAM fallback, which must come last.

use super::{RoutingContext, RoutingDecision, RoutingReason, RoutingRule};

/// Both courses belong to the same program.
#[derive(Debug, Clone, Copy)]
pub struct SameProgram;

impl RoutingRule for SameProgram {
    fn name(&self) -> &'static str {
        "SAME_PROGRAM"
    }

    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision> {
        match (&context.source_program, &context.target_program) {
            (Some(s), Some(t)) if s == t => Some(RoutingDecision {
                program_id: s.clone(),
                reason: RoutingReason::SameProgram,
                rule: self.name(),
            }),
            _ => None,
        }
    }

    fn description(&self) -> &'static str {
        "Source and target courses share a program"
    }
}

/// Both courses are mapped to different programs: the destination owns
/// the approval.
#[derive(Debug, Clone, Copy)]
pub struct TargetProgram;

impl RoutingRule for TargetProgram {
    fn name(&self) -> &'static str {
        "TARGET_PROGRAM"
    }

    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision> {
        match (&context.source_program, &context.target_program) {
            (Some(s), Some(t)) if s != t => Some(RoutingDecision {
                program_id: t.clone(),
                reason: RoutingReason::TargetProgram,
                rule: self.name(),
            }),
            _ => None,
        }
    }

    fn description(&self) -> &'static str {
        "Different programs; the target's program decides"
    }
}

/// Only the source course is mapped.
#[derive(Debug, Clone, Copy)]
pub struct SourceProgram;

impl RoutingRule for SourceProgram {
    fn name(&self) -> &'static str {
        "SOURCE_PROGRAM"
    }

    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision> {
        match (&context.source_program, &context.target_program) {
            (Some(s), None) => Some(RoutingDecision {
                program_id: s.clone(),
                reason: RoutingReason::SourceProgram,
                rule: self.name(),
            }),
            _ => None,
        }
    }

    fn description(&self) -> &'static str {
        "Only the source course has a program"
    }
}

/// Only the target course is mapped.
#[derive(Debug, Clone, Copy)]
pub struct TargetOnly;

impl RoutingRule for TargetOnly {
    fn name(&self) -> &'static str {
        "TARGET_ONLY"
    }

    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision> {
        match (&context.source_program, &context.target_program) {
            (None, Some(t)) => Some(RoutingDecision {
                program_id: t.clone(),
                reason: RoutingReason::TargetProgram,
                rule: self.name(),
            }),
            _ => None,
        }
    }

    fn description(&self) -> &'static str {
        "Only the target course has a program"
    }
}

/// Fallback: the requesting student's declared program.
#[derive(Debug, Clone, Copy)]
pub struct StudentProgram;

impl RoutingRule for StudentProgram {
    fn name(&self) -> &'static str {
        "STUDENT_PROGRAM"
    }

    fn route(&self, context: &RoutingContext) -> Option<RoutingDecision> {
        context.student_program.as_ref().map(|p| RoutingDecision {
            program_id: p.clone(),
            reason: RoutingReason::StudentProgram,
            rule: self.name(),
        })
    }

    fn description(&self) -> &'static str {
        "Student's own declared program"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgramId;

    #[test]
    fn test_same_program_row() {
        let ctx = RoutingContext::new().with_source("P1").with_target("P1");
        let d = SameProgram.route(&ctx).unwrap();
        assert_eq!(d.program_id, ProgramId::new("P1"));
        assert!(TargetProgram.route(&ctx).is_none());
    }

    #[test]
    fn test_target_program_row() {
        let ctx = RoutingContext::new().with_source("P1").with_target("P2");
        assert!(SameProgram.route(&ctx).is_none());
        assert_eq!(TargetProgram.route(&ctx).unwrap().program_id, ProgramId::new("P2"));
        assert!(SourceProgram.route(&ctx).is_none());
        assert!(TargetOnly.route(&ctx).is_none());
    }

    #[test]
    fn test_single_mapping_rows() {
        let source_only = RoutingContext::new().with_source("P1");
        assert_eq!(
            SourceProgram.route(&source_only).unwrap().reason,
            RoutingReason::SourceProgram
        );
        assert!(TargetOnly.route(&source_only).is_none());

        let target_only = RoutingContext::new().with_target("P2");
        let d = TargetOnly.route(&target_only).unwrap();
        assert_eq!(d.reason, RoutingReason::TargetProgram);
        assert_eq!(d.rule, "TARGET_ONLY");
    }

    #[test]
    fn test_student_row() {
        assert!(StudentProgram.route(&RoutingContext::new()).is_none());
        let ctx = RoutingContext::new().with_student("P3");
        assert_eq!(StudentProgram.route(&ctx).unwrap().program_id, ProgramId::new("P3"));
    }
}
