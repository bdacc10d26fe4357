//! Course catalog and course group (section) models.
//!
//! A course is the catalog entry (code, credits). A course group is one
//! scheduled section of that course within a term, with a seat capacity
//! and a set of weekly meetings.

use serde::{Deserialize, Serialize};

use super::{CourseId, GroupId, TermId, WeeklySlot};

/// A catalog course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: CourseId,
    /// Catalog code (e.g., "MAT-101").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Credit weight used by GPA and completion metrics.
    pub credits: u32,
}

impl Course {
    /// Creates a course with the given credit weight.
    pub fn new(id: impl Into<CourseId>, credits: u32) -> Self {
        Self {
            id: id.into(),
            code: String::new(),
            name: String::new(),
            credits,
        }
    }

    /// Sets the catalog code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the course name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// One section of a course in a term.
///
/// `current_enrollment_count` is a cached counter. It may go stale under
/// concurrent enroll/unenroll, so seat decisions always use a live count of
/// ENROLLED rows instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGroup {
    /// Unique group identifier.
    pub id: GroupId,
    /// Course this group teaches.
    pub course_id: CourseId,
    /// Term the group runs in.
    pub term_id: TermId,
    /// Section label shown to students (e.g., "A", "02").
    pub group_label: String,
    /// Seat capacity.
    pub capacity: u32,
    /// Cached enrollment counter.
    pub current_enrollment_count: u32,
    /// Weekly meetings.
    pub slots: Vec<WeeklySlot>,
}

impl CourseGroup {
    /// Creates an empty group with the given capacity.
    pub fn new(
        id: impl Into<GroupId>,
        course_id: impl Into<CourseId>,
        term_id: impl Into<TermId>,
        capacity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            course_id: course_id.into(),
            term_id: term_id.into(),
            group_label: String::new(),
            capacity,
            current_enrollment_count: 0,
            slots: Vec::new(),
        }
    }

    /// Sets the section label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.group_label = label.into();
        self
    }

    /// Adds a weekly meeting.
    pub fn with_slot(mut self, slot: WeeklySlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Sets the cached enrollment counter.
    pub fn with_enrollment_count(mut self, count: u32) -> Self {
        self.current_enrollment_count = count;
        self
    }

    /// Whether another student fits given a live enrollment count.
    #[inline]
    pub fn has_seat(&self, enrolled: u32) -> bool {
        enrolled < self.capacity
    }

    /// Occupancy ratio for a live count (0.0..). A zero-capacity group is full.
    pub fn occupancy(&self, enrolled: u32) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        enrolled as f64 / self.capacity as f64
    }

    /// Total weekly contact minutes.
    pub fn weekly_minutes(&self) -> u32 {
        self.slots.iter().map(|s| s.duration_minutes() as u32).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;

    #[test]
    fn test_group_builder() {
        let g = CourseGroup::new("G1", "MAT-101", "2026-1", 30)
            .with_label("A")
            .with_enrollment_count(12)
            .with_slot(WeeklySlot::at(DayOfWeek::Monday, "08:00", "10:00").unwrap())
            .with_slot(WeeklySlot::at(DayOfWeek::Wednesday, "08:00", "09:30").unwrap());

        assert_eq!(g.id, GroupId::new("G1"));
        assert_eq!(g.course_id, CourseId::new("MAT-101"));
        assert_eq!(g.group_label, "A");
        assert_eq!(g.current_enrollment_count, 12);
        assert_eq!(g.weekly_minutes(), 210);
    }

    #[test]
    fn test_seat_and_occupancy() {
        let g = CourseGroup::new("G1", "C1", "T1", 10);
        assert!(g.has_seat(9));
        assert!(!g.has_seat(10));
        assert!((g.occupancy(9) - 0.9).abs() < 1e-10);

        let closed = CourseGroup::new("G2", "C1", "T1", 0);
        assert!(!closed.has_seat(0));
        assert!((closed.occupancy(0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_course_builder() {
        let c = Course::new("C1", 4).with_code("PHY-201").with_name("Mechanics");
        assert_eq!(c.credits, 4);
        assert_eq!(c.code, "PHY-201");
        assert_eq!(c.name, "Mechanics");
    }
}
