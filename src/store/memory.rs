//! In-memory [`RegistrarStore`].

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{
    ApprovalCommit, ChangeRequestFilter, EnrollmentFilter, RegistrarStore, ResolutionFields,
    StoreError, StoreResult,
};
use crate::models::{
    AcademicTerm, ChangeRequest, ChangeRequestId, ChangeRequestStatus, ChangeWindow, Course,
    CourseGroup, CourseId, CourseProgramMapping, Enrollment, EnrollmentId, EnrollmentStatus, GroupId,
    ProgramId, Student, StudentId, TermId, WeeklySlot, WindowType,
};

#[derive(Debug, Default)]
struct Tables {
    courses: HashMap<CourseId, Course>,
    groups: HashMap<GroupId, CourseGroup>,
    enrollments: Vec<Enrollment>,
    terms: Vec<AcademicTerm>,
    windows: Vec<ChangeWindow>,
    students: HashMap<StudentId, Student>,
    mappings: HashMap<CourseId, CourseProgramMapping>,
    requests: Vec<ChangeRequest>,
}

impl Tables {
    fn enrollment_index(&self, id: &EnrollmentId) -> StoreResult<usize> {
        self.enrollments
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| StoreError::not_found("enrollment", id))
    }

    fn request_index(&self, id: &ChangeRequestId) -> StoreResult<usize> {
        self.requests
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| StoreError::not_found("change request", id))
    }

    /// At most one ENROLLED/PASSED row per (student, group).
    fn check_unique_holding(&self, enrollment: &Enrollment) -> StoreResult<()> {
        if self.enrollments.iter().any(|e| e.id == enrollment.id) {
            return Err(StoreError::Conflict(format!(
                "enrollment {} already exists",
                enrollment.id
            )));
        }
        if enrollment.status.is_holding()
            && self.enrollments.iter().any(|e| {
                e.student_id == enrollment.student_id
                    && e.group_id == enrollment.group_id
                    && e.status.is_holding()
            })
        {
            return Err(StoreError::Conflict(format!(
                "student {} already holds a seat in group {}",
                enrollment.student_id, enrollment.group_id
            )));
        }
        Ok(())
    }
}

/// Thread-safe store backed by hash maps behind one `RwLock`.
///
/// Seed it with the `insert_*` methods. [`InMemoryStore::fail_commits`]
/// makes every approval commit fail, to exercise rollback paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_commits: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_course(&self, course: Course) {
        self.tables.write().courses.insert(course.id.clone(), course);
    }

    pub fn insert_group(&self, group: CourseGroup) {
        self.tables.write().groups.insert(group.id.clone(), group);
    }

    /// Inserts a row without uniqueness checks.
    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        self.tables.write().enrollments.push(enrollment);
    }

    /// Inserts or replaces a term.
    pub fn insert_term(&self, term: AcademicTerm) {
        let mut tables = self.tables.write();
        tables.terms.retain(|t| t.id != term.id);
        tables.terms.push(term);
    }

    pub fn insert_window(&self, window: ChangeWindow) {
        self.tables.write().windows.push(window);
    }

    pub fn insert_student(&self, student: Student) {
        self.tables.write().students.insert(student.id.clone(), student);
    }

    /// Inserts or replaces the owning program of a course.
    pub fn insert_mapping(&self, mapping: CourseProgramMapping) {
        self.tables
            .write()
            .mappings
            .insert(mapping.course_id.clone(), mapping);
    }

    pub fn map_course_program(&self, course_id: impl Into<CourseId>, program_id: impl Into<ProgramId>) {
        self.insert_mapping(CourseProgramMapping::new(course_id, program_id));
    }

    /// Makes subsequent `commit_approval` calls fail with
    /// [`StoreError::Unavailable`].
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Every enrollment row in insertion order.
    pub fn all_enrollments(&self) -> Vec<Enrollment> {
        self.tables.read().enrollments.clone()
    }
}

impl RegistrarStore for InMemoryStore {
    fn find_course_group(&self, id: &GroupId) -> StoreResult<Option<CourseGroup>> {
        Ok(self.tables.read().groups.get(id).cloned())
    }

    fn find_course(&self, id: &CourseId) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().courses.get(id).cloned())
    }

    fn find_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<Vec<Enrollment>> {
        Ok(self
            .tables
            .read()
            .enrollments
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn count_enrollments(&self, filter: &EnrollmentFilter) -> StoreResult<u32> {
        let count = self
            .tables
            .read()
            .enrollments
            .iter()
            .filter(|e| filter.matches(e))
            .count();
        Ok(count as u32)
    }

    fn find_weekly_slots(&self, group_id: &GroupId) -> StoreResult<Vec<WeeklySlot>> {
        Ok(self
            .tables
            .read()
            .groups
            .get(group_id)
            .map(|g| g.slots.clone())
            .unwrap_or_default())
    }

    fn find_active_term(&self) -> StoreResult<Option<AcademicTerm>> {
        Ok(self.tables.read().terms.iter().find(|t| t.is_active).cloned())
    }

    fn find_change_window(
        &self,
        term_id: &TermId,
        window_type: WindowType,
    ) -> StoreResult<Option<ChangeWindow>> {
        Ok(self
            .tables
            .read()
            .windows
            .iter()
            .find(|w| &w.term_id == term_id && w.window_type == window_type)
            .cloned())
    }

    fn find_student(&self, id: &StudentId) -> StoreResult<Option<Student>> {
        Ok(self.tables.read().students.get(id).cloned())
    }

    fn find_course_program_mapping(
        &self,
        course_id: &CourseId,
    ) -> StoreResult<Option<CourseProgramMapping>> {
        Ok(self.tables.read().mappings.get(course_id).cloned())
    }

    fn find_change_request(&self, id: &ChangeRequestId) -> StoreResult<Option<ChangeRequest>> {
        Ok(self.tables.read().requests.iter().find(|r| &r.id == id).cloned())
    }

    fn find_change_requests(&self, filter: &ChangeRequestFilter) -> StoreResult<Vec<ChangeRequest>> {
        let mut found: Vec<ChangeRequest> = self
            .tables
            .read()
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    fn create_change_request(&self, request: &ChangeRequest) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.requests.iter().any(|r| r.id == request.id) {
            return Err(StoreError::Conflict(format!(
                "change request {} already exists",
                request.id
            )));
        }
        if request.is_pending()
            && tables.requests.iter().any(|r| {
                r.is_pending()
                    && r.student_id == request.student_id
                    && r.source_group_id == request.source_group_id
            })
        {
            return Err(StoreError::Conflict(format!(
                "student {} already has a pending request from group {}",
                request.student_id, request.source_group_id
            )));
        }
        tables.requests.push(request.clone());
        Ok(())
    }

    fn update_change_request_status(
        &self,
        id: &ChangeRequestId,
        status: ChangeRequestStatus,
        resolution: &ResolutionFields,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let idx = tables.request_index(id)?;
        let request = &mut tables.requests[idx];
        if !request.is_pending() {
            return Err(StoreError::Conflict(format!(
                "change request {} is already {}",
                id, request.status
            )));
        }
        request.status = status;
        request.resolution_reason = resolution.resolution_reason.clone();
        request.observations = resolution.observations.clone();
        request.resolved_at = resolution.resolved_at;
        Ok(())
    }

    fn create_enrollment(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.check_unique_holding(enrollment)?;
        tables.enrollments.push(enrollment.clone());
        Ok(())
    }

    fn update_enrollment_status(
        &self,
        id: &EnrollmentId,
        status: EnrollmentStatus,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let idx = tables.enrollment_index(id)?;
        tables.enrollments[idx]
            .transition_to(status)
            .map_err(|e| StoreError::Conflict(e.to_string()))
    }

    fn commit_approval(&self, commit: &ApprovalCommit) -> StoreResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "commit of change request {} aborted",
                commit.request_id
            )));
        }

        let mut tables = self.tables.write();

        // Check every precondition before touching any row.
        let request_idx = tables.request_index(&commit.request_id)?;
        let request = &tables.requests[request_idx];
        if !request.is_pending() {
            return Err(StoreError::Conflict(format!(
                "change request {} is already {}",
                request.id, request.status
            )));
        }

        let cancel_idx = tables.enrollment_index(&commit.cancel_enrollment_id)?;
        let source = &tables.enrollments[cancel_idx];
        if !source.status.can_transition_to(EnrollmentStatus::Cancelled) {
            return Err(StoreError::Conflict(format!(
                "enrollment {} is {}, expected ENROLLED",
                source.id, source.status
            )));
        }
        tables.check_unique_holding(&commit.new_enrollment)?;

        let request = &mut tables.requests[request_idx];
        request.status = ChangeRequestStatus::Approved;
        request.resolution_reason = commit.resolution.resolution_reason.clone();
        request.observations = commit.resolution.observations.clone();
        request.resolved_at = commit.resolution.resolved_at;

        tables.enrollments[cancel_idx].status = EnrollmentStatus::Cancelled;
        tables.enrollments.push(commit.new_enrollment.clone());
        Ok(())
    }

    fn sync_enrollment_count(&self, group_id: &GroupId, count: u32) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let group = tables
            .groups
            .get_mut(group_id)
            .ok_or_else(|| StoreError::not_found("group", group_id))?;
        group.current_enrollment_count = count;
        Ok(())
    }
}
