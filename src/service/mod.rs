//! Change request service.
//!
//! [`ChangeRequestService`] is the engine's public surface: it fetches data
//! through a [`RegistrarStore`], runs the [`ValidationPipeline`], routes
//! with the [`RoutingEngine`] and drives the request lifecycle.
//!
//! # Operations
//!
//! | Operation | Writes |
//! |-----------|--------|
//! | [`validate_change_request`](ChangeRequestService::validate_change_request) | nothing |
//! | [`create_change_request`](ChangeRequestService::create_change_request) | one PENDING request |
//! | [`approve_change_request`](ChangeRequestService::approve_change_request) | status + enrollment swap (atomic), counters |
//! | [`reject_change_request`](ChangeRequestService::reject_change_request) | status |
//! | [`detect_schedule_conflicts`](ChangeRequestService::detect_schedule_conflicts) | nothing |
//! | [`get_student_risk_status`](ChangeRequestService::get_student_risk_status) | nothing |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use u_registrar::models::*;
//! use u_registrar::service::ChangeRequestService;
//! use u_registrar::store::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
//! store.insert_term(AcademicTerm::new("T1", start, end));
//! store.insert_student(Student::new("S1").with_program("P1"));
//! store.insert_group(CourseGroup::new("G1", "C1", "T1", 30));
//! store.insert_group(CourseGroup::new("G2", "C1", "T1", 30));
//! store.insert_enrollment(Enrollment::enrolled("S1", "G1", "T1"));
//!
//! let service = ChangeRequestService::new(store);
//! let request = service
//!     .create_change_request(CreateChangeRequest::new("G1", "G2"), &StudentId::new("S1"))
//!     .unwrap();
//! assert_eq!(request.status, ChangeRequestStatus::Pending);
//! assert_eq!(request.routing_reason, RoutingReason::StudentProgram);
//! ```

mod locks;

pub use locks::GroupLocks;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ChangeRequest, ChangeRequestId, ChangeRequestStatus, CourseGroup, CreateChangeRequest,
    Enrollment, EnrollmentStatus, GroupId, ProgramId, Student, StudentId, TermId,
    TransitionAction, WindowType,
};
use crate::risk::{EnrollmentRecord, RiskCalculator, RiskReport};
use crate::routing::RoutingEngine;
use crate::schedule::{
    detect_schedule_conflicts, ConflictPair, ScheduleEntry, ScheduledSlot, WeeklySchedule,
};
use crate::store::{
    ApprovalCommit, ChangeRequestFilter, EnrollmentFilter, RegistrarStore, ResolutionFields,
};
use crate::validation::{
    check_distinct_groups, ValidationContext, ValidationErrorKind, ValidationPipeline,
    ValidationResult,
};

/// Validation inputs gathered for one request.
struct Prepared {
    student: Student,
    context: ValidationContext,
}

/// Validates, routes and resolves change requests.
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct ChangeRequestService {
    store: Arc<dyn RegistrarStore>,
    pipeline: ValidationPipeline,
    router: RoutingEngine,
    risk: RiskCalculator,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    locks: GroupLocks,
}

impl ChangeRequestService {
    /// Creates a service with the standard pipeline and routing table,
    /// default configuration, the system clock and a tracing audit sink.
    pub fn new(store: Arc<dyn RegistrarStore>) -> Self {
        let config = EngineConfig::default();
        Self {
            store,
            pipeline: ValidationPipeline::standard(),
            router: RoutingEngine::standard(),
            risk: risk_calculator(&config),
            audit: Arc::new(TracingAuditSink),
            clock: Arc::new(SystemClock),
            config,
            locks: GroupLocks::new(),
        }
    }

    /// Sets the configuration (also reconfigures risk thresholds).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.risk = risk_calculator(&config);
        self.config = config;
        self
    }

    pub fn with_pipeline(mut self, pipeline: ValidationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_router(mut self, router: RoutingEngine) -> Self {
        self.router = router;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every structural check without writing anything.
    ///
    /// Identical source and target ids short-circuit with a single error.
    /// Unknown groups or student yield [`EngineError::NotFound`].
    pub fn validate_change_request(
        &self,
        student_id: &StudentId,
        source_group_id: &GroupId,
        target_group_id: &GroupId,
    ) -> EngineResult<ValidationResult> {
        if let Some(result) = check_distinct_groups(source_group_id, target_group_id) {
            return Ok(result);
        }
        let prepared = self.prepare(student_id, source_group_id, target_group_id)?;
        Ok(self.pipeline.run(&prepared.context))
    }

    /// Validates, routes and persists a new PENDING request.
    ///
    /// The duplicate check and the insert run under the source group's
    /// lock, so concurrent requests from one source yield a single PENDING.
    pub fn create_change_request(
        &self,
        draft: CreateChangeRequest,
        requester_id: &StudentId,
    ) -> EngineResult<ChangeRequest> {
        if let Some(result) = check_distinct_groups(&draft.source_group_id, &draft.target_group_id)
        {
            return Err(EngineError::Validation(result));
        }

        let prepared = self.prepare(requester_id, &draft.source_group_id, &draft.target_group_id)?;
        let mut result = self.pipeline.run(&prepared.context);

        let lock = self.locks.get(&draft.source_group_id);
        let _guard = lock.lock();

        let open = self.store.find_change_requests(
            &ChangeRequestFilter::new()
                .for_student(requester_id.clone())
                .from_group(draft.source_group_id.clone())
                .with_status(ChangeRequestStatus::Pending),
        )?;
        if let Some(existing) = open.first() {
            result.push_error(
                ValidationErrorKind::DuplicatePendingRequest,
                format!(
                    "student {} already has pending change request {} for group {}",
                    requester_id, existing.id, draft.source_group_id
                ),
            );
        }

        if !result.is_valid {
            debug!(
                student_id = %requester_id,
                errors = result.errors.len(),
                "change request rejected by validation"
            );
            return Err(EngineError::Validation(result));
        }
        for warning in &result.warnings {
            warn!(student_id = %requester_id, "{}", warning);
        }

        let context = &prepared.context;
        let source_program = self
            .store
            .find_course_program_mapping(&context.source.course_id)?
            .map(|m| m.program_id);
        let target_program = self
            .store
            .find_course_program_mapping(&context.target.course_id)?
            .map(|m| m.program_id);
        let decision = self.router.route(
            requester_id,
            source_program.as_ref(),
            target_program.as_ref(),
            prepared.student.program_id.as_ref(),
        )?;

        let request = ChangeRequest::pending(
            requester_id.clone(),
            draft,
            decision.program_id,
            decision.reason,
            context.now,
        );
        self.store.create_change_request(&request)?;

        info!(
            request_id = %request.id,
            student_id = %request.student_id,
            program_id = %request.assigned_program_id,
            routing_reason = %request.routing_reason,
            "change request created"
        );
        self.notify(AuditAction::Created, &request);
        Ok(request)
    }

    /// PENDING → APPROVED with the enrollment swap.
    ///
    /// Under the locks of both groups, re-checks that a seat is free and the
    /// student still attends the source, then commits status, cancellation
    /// and new enrollment in one store call. Cached counters of both
    /// groups are re-synced before the locks are released.
    pub fn approve_change_request(
        &self,
        id: &ChangeRequestId,
        observations: Option<String>,
    ) -> EngineResult<ChangeRequest> {
        let request = self.load_request(id)?;
        request.ensure_pending(TransitionAction::Approve)?;

        let source = self.load_group(&request.source_group_id)?;
        let target = self.load_group(&request.target_group_id)?;
        self.ensure_resolution_window(&target.term_id, TransitionAction::Approve)?;

        // Fixed lock order across groups.
        let (first, second) = if source.id <= target.id {
            (&source.id, &target.id)
        } else {
            (&target.id, &source.id)
        };
        let first_lock = self.locks.get(first);
        let second_lock = self.locks.get(second);
        let _first_guard = first_lock.lock();
        let _second_guard = (first != second).then(|| second_lock.lock());

        // Another reviewer may have resolved it while we waited.
        let mut request = self.load_request(id)?;
        request.ensure_pending(TransitionAction::Approve)?;

        let live = self.live_count(&target.id)?;
        if !target.has_seat(live) {
            return Err(EngineError::Validation(ValidationResult::failure(
                ValidationErrorKind::TargetFull,
                format!(
                    "target group {} is full ({}/{} seats taken)",
                    target.id, live, target.capacity
                ),
            )));
        }

        let source_enrollment = self
            .store
            .find_enrollments(
                &EnrollmentFilter::new()
                    .for_student(request.student_id.clone())
                    .in_group(source.id.clone())
                    .enrolled(),
            )?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EngineError::Validation(ValidationResult::failure(
                    ValidationErrorKind::NotEnrolledInSource,
                    format!(
                        "student {} is no longer enrolled in source group {}",
                        request.student_id, source.id
                    ),
                ))
            })?;

        request.approve(observations, self.clock.now())?;
        let commit = ApprovalCommit {
            request_id: request.id.clone(),
            resolution: ResolutionFields::from_request(&request),
            cancel_enrollment_id: source_enrollment.id,
            new_enrollment: Enrollment::enrolled(
                request.student_id.clone(),
                target.id.clone(),
                target.term_id.clone(),
            ),
        };
        if let Err(e) = self.store.commit_approval(&commit) {
            warn!(request_id = %request.id, error = %e, "approval commit failed");
            return Err(e.into());
        }

        self.resync_counter(&source.id);
        self.resync_counter(&target.id);

        info!(
            request_id = %request.id,
            student_id = %request.student_id,
            source_group = %source.id,
            target_group = %target.id,
            "change request approved"
        );
        self.notify(AuditAction::Approved, &request);
        Ok(request)
    }

    /// PENDING → REJECTED. `resolution_reason` must not be blank.
    pub fn reject_change_request(
        &self,
        id: &ChangeRequestId,
        resolution_reason: &str,
        observations: Option<String>,
    ) -> EngineResult<ChangeRequest> {
        let mut request = self.load_request(id)?;
        request.ensure_pending(TransitionAction::Reject)?;

        let target = self.load_group(&request.target_group_id)?;
        self.ensure_resolution_window(&target.term_id, TransitionAction::Reject)?;

        request.reject(resolution_reason, observations, self.clock.now())?;
        self.store.update_change_request_status(
            &request.id,
            ChangeRequestStatus::Rejected,
            &ResolutionFields::from_request(&request),
        )?;

        info!(
            request_id = %request.id,
            student_id = %request.student_id,
            "change request rejected"
        );
        self.notify(AuditAction::Rejected, &request);
        Ok(request)
    }

    pub fn get_change_request(&self, id: &ChangeRequestId) -> EngineResult<ChangeRequest> {
        self.load_request(id)
    }

    /// A student's requests, oldest first.
    pub fn list_student_requests(&self, student_id: &StudentId) -> EngineResult<Vec<ChangeRequest>> {
        Ok(self
            .store
            .find_change_requests(&ChangeRequestFilter::new().for_student(student_id.clone()))?)
    }

    /// PENDING requests assigned to a program, oldest first.
    pub fn list_program_queue(&self, program_id: &ProgramId) -> EngineResult<Vec<ChangeRequest>> {
        Ok(self.store.find_change_requests(
            &ChangeRequestFilter::new()
                .for_program(program_id.clone())
                .with_status(ChangeRequestStatus::Pending),
        )?)
    }

    /// Overlaps between different groups of a rendered schedule.
    pub fn detect_schedule_conflicts(&self, schedule: &WeeklySchedule) -> Vec<ConflictPair> {
        detect_schedule_conflicts(schedule)
    }

    /// The student's ENROLLED groups in `term_id`, annotated with conflicts.
    pub fn student_weekly_schedule(
        &self,
        student_id: &StudentId,
        term_id: &TermId,
    ) -> EngineResult<WeeklySchedule> {
        self.load_student(student_id)?;

        let mut schedule = WeeklySchedule::new(student_id.clone(), term_id.clone());
        let enrollments = self.store.find_enrollments(
            &EnrollmentFilter::new()
                .for_student(student_id.clone())
                .in_term(term_id.clone())
                .enrolled(),
        )?;
        for enrollment in enrollments {
            let group = self.load_group(&enrollment.group_id)?;
            schedule.add_entry(
                ScheduleEntry::new(group.id, group.course_id)
                    .with_label(group.group_label)
                    .with_slots(group.slots),
            );
        }
        schedule.annotate();
        Ok(schedule)
    }

    /// Traffic-light classification over the student's full history.
    pub fn get_student_risk_status(&self, student_id: &StudentId) -> EngineResult<RiskReport> {
        self.load_student(student_id)?;

        let enrollments = self
            .store
            .find_enrollments(&EnrollmentFilter::new().for_student(student_id.clone()))?;
        let mut records = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let group = self.load_group(&enrollment.group_id)?;
            let course = self
                .store
                .find_course(&group.course_id)?
                .ok_or_else(|| EngineError::not_found("course", &group.course_id))?;
            let mut record =
                EnrollmentRecord::new(enrollment.id, course.id, course.credits, enrollment.status);
            record.grade = enrollment.grade;
            records.push(record);
        }

        let report = self.risk.calculate(student_id, &records);
        debug!(
            student_id = %student_id,
            band = %report.band,
            anomalies = report.anomalies.len(),
            "risk status computed"
        );
        Ok(report)
    }

    fn prepare(
        &self,
        student_id: &StudentId,
        source_group_id: &GroupId,
        target_group_id: &GroupId,
    ) -> EngineResult<Prepared> {
        let student = self.load_student(student_id)?;
        let source = self.load_group(source_group_id)?;
        let target = self.load_group(target_group_id)?;

        let active_term = self.store.find_active_term()?;
        let creation_window = match &active_term {
            Some(term) => self.store.find_change_window(&term.id, WindowType::Creation)?,
            None => None,
        };
        let target_enrolled = self.live_count(&target.id)?;
        let student_enrollments = self
            .store
            .find_enrollments(&EnrollmentFilter::new().for_student(student_id.clone()))?;

        let mut committed_slots = Vec::new();
        for e in student_enrollments
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Enrolled && e.term_id == target.term_id)
        {
            let slots = self.store.find_weekly_slots(&e.group_id)?;
            committed_slots.extend(ScheduledSlot::from_group(&e.group_id, &slots));
        }

        let mut context = ValidationContext::new(student_id.clone(), source, target, self.clock.now())
            .with_target_enrolled(target_enrolled)
            .with_enrollments(student_enrollments)
            .with_committed_slots(committed_slots)
            .with_capacity_warning_ratio(self.config.capacity_warning_ratio)
            .with_window_enforcement(self.config.enforce_change_windows);
        if let Some(term) = active_term {
            context = context.with_active_term(term);
        }
        if let Some(window) = creation_window {
            context = context.with_creation_window(window);
        }

        Ok(Prepared { student, context })
    }

    fn ensure_resolution_window(&self, term_id: &TermId, action: TransitionAction) -> EngineResult<()> {
        if !self.config.enforce_change_windows {
            return Ok(());
        }
        match self.store.find_change_window(term_id, WindowType::Approval)? {
            Some(window) if !window.is_open_at(self.clock.now()) => {
                Err(EngineError::Validation(ValidationResult::failure(
                    ValidationErrorKind::WindowClosed,
                    format!("approval window for term {} is closed; cannot {}", term_id, action),
                )))
            }
            _ => Ok(()),
        }
    }

    fn live_count(&self, group_id: &GroupId) -> EngineResult<u32> {
        Ok(self
            .store
            .count_enrollments(&EnrollmentFilter::new().in_group(group_id.clone()).enrolled())?)
    }

    fn resync_counter(&self, group_id: &GroupId) {
        let result = self.live_count(group_id).and_then(|count| {
            self.store
                .sync_enrollment_count(group_id, count)
                .map_err(EngineError::from)
        });
        if let Err(e) = result {
            warn!(group_id = %group_id, error = %e, "enrollment counter re-sync failed");
        }
    }

    fn notify(&self, action: AuditAction, request: &ChangeRequest) {
        let event = AuditEvent::for_request(action, request, self.clock.now());
        if let Err(e) = self.audit.record(&event) {
            warn!(request_id = %request.id, action = %action, error = %e, "audit sink failed");
        }
    }

    fn load_request(&self, id: &ChangeRequestId) -> EngineResult<ChangeRequest> {
        self.store
            .find_change_request(id)?
            .ok_or_else(|| EngineError::not_found("change request", id))
    }

    fn load_group(&self, id: &GroupId) -> EngineResult<CourseGroup> {
        self.store
            .find_course_group(id)?
            .ok_or_else(|| EngineError::not_found("course group", id))
    }

    fn load_student(&self, id: &StudentId) -> EngineResult<Student> {
        self.store
            .find_student(id)?
            .ok_or_else(|| EngineError::not_found("student", id))
    }
}

fn risk_calculator(config: &EngineConfig) -> RiskCalculator {
    RiskCalculator::new()
        .with_thresholds(config.risk.clone())
        .with_grade_scale_max(config.grade_scale_max)
}

impl std::fmt::Debug for ChangeRequestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeRequestService")
            .field("pipeline", &self.pipeline)
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditError, MemoryAuditSink};
    use crate::clock::FixedClock;
    use crate::models::{
        AcademicTerm, ChangeWindow, Course, DayOfWeek, EnrollmentId, RoutingReason, WeeklySlot,
    };
    use crate::risk::RiskBand;
    use crate::store::InMemoryStore;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    struct Fixture {
        store: Arc<InMemoryStore>,
        audit: Arc<MemoryAuditSink>,
        clock: Arc<FixedClock>,
        service: ChangeRequestService,
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap()
    }

    fn slot(day: DayOfWeek, start: &str, end: &str) -> WeeklySlot {
        WeeklySlot::at(day, start, end).unwrap()
    }

    fn group(id: &str, course: &str, capacity: u32, s: WeeklySlot) -> CourseGroup {
        CourseGroup::new(id, course, "T1", capacity).with_slot(s)
    }

    /// S1 attends G1 (C1, Mon 08-10) and G3 (C2, Wed 10-12).
    ///
    /// C1 groups: G2 Tue (free), G4 Wed 11-13 (clashes with G3),
    /// G5 Thu (full), G7 Fri (one seat). C3/G6 is another course.
    /// Only C1 is mapped, to P1.
    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        store.insert_term(AcademicTerm::new(
            "T1",
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 15).unwrap(),
        ));
        store.insert_course(Course::new("C1", 3));
        store.insert_course(Course::new("C2", 4));
        store.insert_course(Course::new("C3", 3));

        store.insert_group(group("G1", "C1", 30, slot(DayOfWeek::Monday, "08:00", "10:00")));
        store.insert_group(group("G2", "C1", 30, slot(DayOfWeek::Tuesday, "08:00", "10:00")));
        store.insert_group(group("G3", "C2", 30, slot(DayOfWeek::Wednesday, "10:00", "12:00")));
        store.insert_group(group("G4", "C1", 30, slot(DayOfWeek::Wednesday, "11:00", "13:00")));
        store.insert_group(group("G5", "C1", 1, slot(DayOfWeek::Thursday, "08:00", "10:00")));
        store.insert_group(group("G6", "C3", 30, slot(DayOfWeek::Tuesday, "14:00", "16:00")));
        store.insert_group(group("G7", "C1", 1, slot(DayOfWeek::Friday, "08:00", "10:00")));
        store.insert_group(group("G8", "C2", 30, slot(DayOfWeek::Friday, "14:00", "16:00")));
        store.map_course_program("C1", "P1");

        store.insert_student(Student::new("S1").with_program("P9"));
        store.insert_student(Student::new("S2"));
        store.insert_enrollment(Enrollment::enrolled("S1", "G1", "T1").with_id("E1"));
        store.insert_enrollment(Enrollment::enrolled("S1", "G3", "T1").with_id("E2"));
        store.insert_enrollment(Enrollment::enrolled("S2", "G5", "T1"));

        let audit = Arc::new(MemoryAuditSink::new());
        let clock = Arc::new(FixedClock::new(now()));
        let service = ChangeRequestService::new(store.clone())
            .with_audit(audit.clone())
            .with_clock(clock.clone());
        Fixture {
            store,
            audit,
            clock,
            service,
        }
    }

    fn s1() -> StudentId {
        StudentId::new("S1")
    }

    fn g(id: &str) -> GroupId {
        GroupId::new(id)
    }

    fn create(f: &Fixture, source: &str, target: &str) -> EngineResult<ChangeRequest> {
        f.service
            .create_change_request(CreateChangeRequest::new(source, target), &s1())
    }

    fn validation_kinds(err: &EngineError) -> Vec<ValidationErrorKind> {
        err.validation()
            .map(|r| r.errors.iter().map(|e| e.kind).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_create_routes_and_persists() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();

        assert_eq!(cr.status, ChangeRequestStatus::Pending);
        assert_eq!(cr.assigned_program_id, ProgramId::new("P1"));
        assert_eq!(cr.routing_reason, RoutingReason::SameProgram);
        assert_eq!(cr.created_at, now());
        assert_eq!(f.service.get_change_request(&cr.id).unwrap(), cr);
        assert_eq!(f.service.list_program_queue(&ProgramId::new("P1")).unwrap().len(), 1);
        assert_eq!(f.audit.actions(), vec![AuditAction::Created]);
    }

    #[test]
    fn test_validate_is_idempotent_and_read_only() {
        let f = fixture();
        let first = f.service.validate_change_request(&s1(), &g("G1"), &g("G2")).unwrap();
        let second = f.service.validate_change_request(&s1(), &g("G1"), &g("G2")).unwrap();

        assert!(first.is_valid);
        assert_eq!(first, second);
        assert!(f.service.list_student_requests(&s1()).unwrap().is_empty());
        assert!(f.audit.events().is_empty());
    }

    #[test]
    fn test_same_group_short_circuits() {
        let f = fixture();
        let result = f.service.validate_change_request(&s1(), &g("G1"), &g("G1")).unwrap();
        assert_eq!(result.errors.len(), 1);
        assert!(result.has_error(ValidationErrorKind::SameGroup));

        // Unknown ids are never looked up.
        let result = f.service.validate_change_request(&s1(), &g("GX"), &g("GX")).unwrap();
        assert!(result.has_error(ValidationErrorKind::SameGroup));
    }

    #[test]
    fn test_full_target_rejected_and_nothing_persisted() {
        let f = fixture();
        let err = create(&f, "G1", "G5").unwrap_err();
        assert_eq!(validation_kinds(&err), vec![ValidationErrorKind::TargetFull]);
        assert!(f.service.list_student_requests(&s1()).unwrap().is_empty());
        assert!(f.audit.events().is_empty());
    }

    #[test]
    fn test_schedule_conflict_rejected() {
        let f = fixture();
        let result = f.service.validate_change_request(&s1(), &g("G1"), &g("G4")).unwrap();
        assert!(!result.is_valid);
        assert!(result.has_error(ValidationErrorKind::ScheduleConflict));
        assert!(result.summary().contains("G3"));
    }

    #[test]
    fn test_course_change_rejected() {
        let f = fixture();
        let result = f.service.validate_change_request(&s1(), &g("G1"), &g("G6")).unwrap();
        assert!(result.has_error(ValidationErrorKind::CourseMismatch));
    }

    #[test]
    fn test_source_not_owned() {
        let f = fixture();
        let result = f.service.validate_change_request(&s1(), &g("G2"), &g("G7")).unwrap();
        assert!(result.has_error(ValidationErrorKind::NotEnrolledInSource));
    }

    #[test]
    fn test_unknown_entities() {
        let f = fixture();
        let err = f
            .service
            .validate_change_request(&s1(), &g("G1"), &g("G404"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "course group", .. }));

        let err = f
            .service
            .validate_change_request(&StudentId::new("S404"), &g("G1"), &g("G2"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "student", .. }));

        let err = f
            .service
            .approve_change_request(&ChangeRequestId::new("R404"), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_pending_request() {
        let f = fixture();
        create(&f, "G1", "G2").unwrap();
        let err = create(&f, "G1", "G7").unwrap_err();
        assert_eq!(
            validation_kinds(&err),
            vec![ValidationErrorKind::DuplicatePendingRequest]
        );
    }

    #[test]
    fn test_creation_window_closed() {
        let f = fixture();
        f.store.insert_window(ChangeWindow::new(
            "T1",
            WindowType::Creation,
            now() - Duration::days(10),
            now() - Duration::days(1),
        ));
        let err = create(&f, "G1", "G2").unwrap_err();
        assert_eq!(validation_kinds(&err), vec![ValidationErrorKind::WindowClosed]);

        let relaxed = ChangeRequestService::new(f.store.clone())
            .with_clock(f.clock.clone())
            .with_config(EngineConfig::default().with_change_windows(false));
        assert!(relaxed
            .create_change_request(CreateChangeRequest::new("G1", "G2"), &s1())
            .is_ok());
    }

    #[test]
    fn test_no_program_fails_routing() {
        let f = fixture();
        f.store.insert_enrollment(Enrollment::enrolled("S2", "G3", "T1"));
        let err = f
            .service
            .create_change_request(CreateChangeRequest::new("G3", "G8"), &StudentId::new("S2"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Routing(_)));
        assert!(!err.is_retryable());
        assert!(f
            .service
            .list_student_requests(&StudentId::new("S2"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_student_program_fallback() {
        let f = fixture();
        f.store.insert_enrollment(Enrollment::enrolled("S1", "G8", "T1").with_id("E8"));
        // Neither C2 group is mapped; S1 declares P9.
        f.store.insert_group(group("G9", "C2", 30, slot(DayOfWeek::Saturday, "08:00", "10:00")));
        let cr = create(&f, "G8", "G9").unwrap();
        assert_eq!(cr.routing_reason, RoutingReason::StudentProgram);
        assert_eq!(cr.assigned_program_id, ProgramId::new("P9"));
    }

    #[test]
    fn test_approve_swaps_enrollments() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();
        f.clock.advance(Duration::hours(3));

        let approved = f
            .service
            .approve_change_request(&cr.id, Some("ok by coordinator".into()))
            .unwrap();
        assert_eq!(approved.status, ChangeRequestStatus::Approved);
        assert_eq!(approved.resolved_at, Some(now() + Duration::hours(3)));
        assert_eq!(approved.observations.as_deref(), Some("ok by coordinator"));
        assert_eq!(f.service.get_change_request(&cr.id).unwrap(), approved);

        let rows = f.store.all_enrollments();
        let source = rows.iter().find(|e| e.id == EnrollmentId::new("E1")).unwrap();
        assert_eq!(source.status, EnrollmentStatus::Cancelled);
        assert!(rows
            .iter()
            .any(|e| e.student_id == s1() && e.group_id == g("G2") && e.is_enrolled()));

        let g1 = f.store.find_course_group(&g("G1")).unwrap().unwrap();
        let g2 = f.store.find_course_group(&g("G2")).unwrap().unwrap();
        assert_eq!(g1.current_enrollment_count, 0);
        assert_eq!(g2.current_enrollment_count, 1);

        assert_eq!(f.audit.actions(), vec![AuditAction::Created, AuditAction::Approved]);
        assert!(f.service.list_program_queue(&ProgramId::new("P1")).unwrap().is_empty());
    }

    #[test]
    fn test_terminal_requests_are_sinks() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();
        let approved = f.service.approve_change_request(&cr.id, None).unwrap();
        f.clock.advance(Duration::days(1));

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidStateTransition {
                from: ChangeRequestStatus::Approved,
                action: TransitionAction::Approve,
                ..
            }
        ));
        let err = f
            .service
            .reject_change_request(&cr.id, "too late", None)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidStateTransition { .. }));

        let stored = f.service.get_change_request(&cr.id).unwrap();
        assert_eq!(stored.resolved_at, approved.resolved_at);
    }

    #[test]
    fn test_reject_requires_reason() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();

        let err = f.service.reject_change_request(&cr.id, "   ", None).unwrap_err();
        assert_eq!(
            validation_kinds(&err),
            vec![ValidationErrorKind::MissingResolutionReason]
        );
        assert!(f.service.get_change_request(&cr.id).unwrap().is_pending());

        let rejected = f
            .service
            .reject_change_request(&cr.id, " schedule is fixed ", None)
            .unwrap();
        assert_eq!(rejected.status, ChangeRequestStatus::Rejected);
        assert_eq!(rejected.resolution_reason.as_deref(), Some("schedule is fixed"));
        // Enrollments untouched.
        assert!(f.store.all_enrollments().iter().all(|e| e.group_id != g("G2")));

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidStateTransition {
                from: ChangeRequestStatus::Rejected,
                ..
            }
        ));
        assert_eq!(f.audit.actions(), vec![AuditAction::Created, AuditAction::Rejected]);
    }

    #[test]
    fn test_approve_rechecks_capacity() {
        let f = fixture();
        let cr = create(&f, "G1", "G7").unwrap();
        f.store.insert_enrollment(Enrollment::enrolled("S2", "G7", "T1"));

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert_eq!(validation_kinds(&err), vec![ValidationErrorKind::TargetFull]);
        assert!(f.service.get_change_request(&cr.id).unwrap().is_pending());
    }

    #[test]
    fn test_approve_rechecks_source_enrollment() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();
        f.store
            .update_enrollment_status(&EnrollmentId::new("E1"), EnrollmentStatus::Cancelled)
            .unwrap();

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert_eq!(
            validation_kinds(&err),
            vec![ValidationErrorKind::NotEnrolledInSource]
        );
    }

    #[test]
    fn test_failed_commit_persists_nothing() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();
        f.store.fail_commits(true);

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert!(err.is_retryable());

        let stored = f.service.get_change_request(&cr.id).unwrap();
        assert!(stored.is_pending());
        assert_eq!(stored.resolved_at, None);
        let e1 = f.store.all_enrollments().into_iter().find(|e| e.id == EnrollmentId::new("E1"));
        assert!(e1.is_some_and(|e| e.is_enrolled()));
        assert_eq!(f.audit.actions(), vec![AuditAction::Created]);

        f.store.fail_commits(false);
        assert!(f.service.approve_change_request(&cr.id, None).is_ok());
    }

    #[test]
    fn test_approval_window() {
        let f = fixture();
        let cr = create(&f, "G1", "G2").unwrap();
        f.store.insert_window(ChangeWindow::new(
            "T1",
            WindowType::Approval,
            now() + Duration::days(1),
            now() + Duration::days(5),
        ));

        let err = f.service.approve_change_request(&cr.id, None).unwrap_err();
        assert_eq!(validation_kinds(&err), vec![ValidationErrorKind::WindowClosed]);

        f.clock.advance(Duration::days(2));
        assert!(f.service.approve_change_request(&cr.id, None).is_ok());
    }

    #[test]
    fn test_concurrent_approvals_never_overbook() {
        let f = fixture();
        f.store.insert_student(Student::new("S3"));
        f.store.insert_enrollment(Enrollment::enrolled("S3", "G2", "T1"));

        let first = create(&f, "G1", "G7").unwrap();
        let second = f
            .service
            .create_change_request(CreateChangeRequest::new("G2", "G7"), &StudentId::new("S3"))
            .unwrap();

        let service = &f.service;
        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = [&first.id, &second.id]
                .into_iter()
                .map(|id| scope.spawn(move || service.approve_change_request(id, None).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let filter = EnrollmentFilter::new().in_group("G7").enrolled();
        assert_eq!(f.store.count_enrollments(&filter).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_creates_keep_one_pending_per_source() {
        let f = fixture();
        let service = &f.service;
        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["G2", "G7"]
                .into_iter()
                .map(|target| {
                    scope.spawn(move || {
                        service
                            .create_change_request(CreateChangeRequest::new("G1", target), &s1())
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let pending: Vec<_> = f
            .service
            .list_student_requests(&s1())
            .unwrap()
            .into_iter()
            .filter(|r| r.is_pending() && r.source_group_id == g("G1"))
            .collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(f.audit.actions(), vec![AuditAction::Created]);
    }

    #[test]
    fn test_crossing_approvals_keep_counters_in_sync() {
        let f = fixture();
        f.store.insert_student(Student::new("S3"));
        f.store.insert_enrollment(Enrollment::enrolled("S3", "G2", "T1"));

        let forward = create(&f, "G1", "G2").unwrap();
        let backward = f
            .service
            .create_change_request(CreateChangeRequest::new("G2", "G1"), &StudentId::new("S3"))
            .unwrap();

        let service = &f.service;
        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = [&forward.id, &backward.id]
                .into_iter()
                .map(|id| scope.spawn(move || service.approve_change_request(id, None).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(outcomes, vec![true, true]);

        for id in ["G1", "G2"] {
            let cached = f
                .store
                .find_course_group(&g(id))
                .unwrap()
                .unwrap()
                .current_enrollment_count;
            let live = f
                .store
                .count_enrollments(&EnrollmentFilter::new().in_group(id).enrolled())
                .unwrap();
            assert_eq!(live, 1);
            assert_eq!(cached, live);
        }
    }

    #[derive(Debug)]
    struct FailingAuditSink;

    impl AuditSink for FailingAuditSink {
        fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            Err(AuditError("sink down".into()))
        }
    }

    #[test]
    fn test_audit_failure_never_blocks_transitions() {
        let f = fixture();
        let service = ChangeRequestService::new(f.store.clone())
            .with_clock(f.clock.clone())
            .with_audit(Arc::new(FailingAuditSink));

        let created = service
            .create_change_request(CreateChangeRequest::new("G1", "G2"), &s1())
            .unwrap();
        assert!(service.get_change_request(&created.id).unwrap().is_pending());

        let approved = service.approve_change_request(&created.id, None).unwrap();
        assert_eq!(
            service.get_change_request(&created.id).unwrap().status,
            ChangeRequestStatus::Approved
        );
        assert_eq!(approved.status, ChangeRequestStatus::Approved);
        assert!(f
            .store
            .all_enrollments()
            .iter()
            .any(|e| e.student_id == s1() && e.group_id == g("G2") && e.is_enrolled()));

        let other = service
            .create_change_request(CreateChangeRequest::new("G3", "G8"), &s1())
            .unwrap();
        let rejected = service
            .reject_change_request(&other.id, "no seats in lab", None)
            .unwrap();
        assert_eq!(rejected.status, ChangeRequestStatus::Rejected);
        assert_eq!(
            service
                .get_change_request(&other.id)
                .unwrap()
                .resolution_reason
                .as_deref(),
            Some("no seats in lab")
        );
    }

    #[test]
    fn test_weekly_schedule_with_conflicts() {
        let f = fixture();
        let schedule = f
            .service
            .student_weekly_schedule(&s1(), &TermId::new("T1"))
            .unwrap();
        assert_eq!(schedule.entries.len(), 2);
        assert!(!schedule.has_conflicts());

        f.store.insert_enrollment(Enrollment::enrolled("S1", "G4", "T1"));
        let schedule = f
            .service
            .student_weekly_schedule(&s1(), &TermId::new("T1"))
            .unwrap();
        assert!(schedule.has_conflicts());
        assert_eq!(f.service.detect_schedule_conflicts(&schedule).len(), 1);
        assert_eq!(schedule.conflicts[0].overlap_minutes, 60);
    }

    #[test]
    fn test_risk_status_from_history() {
        let f = fixture();
        f.store.insert_student(Student::new("S7"));
        f.store.insert_enrollment(
            Enrollment::enrolled("S7", "G1", "T1")
                .with_status(EnrollmentStatus::Passed)
                .with_grade(4.0),
        );
        f.store.insert_enrollment(
            Enrollment::enrolled("S7", "G3", "T1")
                .with_status(EnrollmentStatus::Passed)
                .with_grade(3.5),
        );

        let report = f.service.get_student_risk_status(&StudentId::new("S7")).unwrap();
        assert_eq!(report.gpa, Some(3.71));
        assert_eq!(report.passed_credits, 7);
        assert_eq!(report.band, RiskBand::Green);

        assert!(f
            .service
            .get_student_risk_status(&StudentId::new("S404"))
            .is_err());
    }
}
