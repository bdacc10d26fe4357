//! Weekly schedules and conflict detection.
//!
//! A [`WeeklySchedule`] is the rendered timetable of one student for one
//! term: the groups they attend and those groups' meetings. The same
//! conflict detector backs both the change-request validator (reject an
//! illegal move) and the schedule view (annotate overlaps as warnings).

mod conflicts;

pub use conflicts::{detect_conflicts, detect_schedule_conflicts, ConflictPair, ScheduledSlot};

use serde::{Deserialize, Serialize};

use crate::models::{CourseId, DayOfWeek, GroupId, StudentId, TermId, WeeklySlot};

/// One attended group in a weekly schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub group_id: GroupId,
    pub course_id: CourseId,
    pub group_label: String,
    pub slots: Vec<WeeklySlot>,
}

impl ScheduleEntry {
    pub fn new(group_id: impl Into<GroupId>, course_id: impl Into<CourseId>) -> Self {
        Self {
            group_id: group_id.into(),
            course_id: course_id.into(),
            group_label: String::new(),
            slots: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.group_label = label.into();
        self
    }

    pub fn with_slot(mut self, slot: WeeklySlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_slots(mut self, slots: Vec<WeeklySlot>) -> Self {
        self.slots.extend(slots);
        self
    }
}

/// A student's weekly timetable with conflict annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub student_id: StudentId,
    pub term_id: TermId,
    /// Attended groups.
    pub entries: Vec<ScheduleEntry>,
    /// Overlaps between groups, filled by [`WeeklySchedule::annotate`].
    pub conflicts: Vec<ConflictPair>,
}

impl WeeklySchedule {
    /// Creates an empty schedule.
    pub fn new(student_id: impl Into<StudentId>, term_id: impl Into<TermId>) -> Self {
        Self {
            student_id: student_id.into(),
            term_id: term_id.into(),
            entries: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Adds an attended group.
    pub fn add_entry(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    /// Recomputes conflict annotations from the current entries.
    pub fn annotate(&mut self) {
        self.conflicts = detect_schedule_conflicts(self);
    }

    /// Whether any two groups collide. Only meaningful after [`annotate`](Self::annotate).
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Human-readable conflict warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.conflicts.iter().map(|c| c.to_string()).collect()
    }

    /// Meetings on one day, sorted by start minute.
    pub fn meetings_on(&self, day: DayOfWeek) -> Vec<ScheduledSlot> {
        let mut meetings: Vec<ScheduledSlot> = self
            .entries
            .iter()
            .flat_map(|e| {
                e.slots
                    .iter()
                    .filter(move |s| s.day == day)
                    .map(move |s| ScheduledSlot::new(e.group_id.clone(), s.clone()))
            })
            .collect();
        meetings.sort_by_key(|m| (m.slot.start_minute, m.slot.end_minute));
        meetings
    }

    /// Every meeting in the week, ordered by day then start minute.
    pub fn all_meetings(&self) -> Vec<ScheduledSlot> {
        DayOfWeek::ALL
            .iter()
            .flat_map(|&d| self.meetings_on(d))
            .collect()
    }

    /// Total contact minutes per week.
    pub fn total_weekly_minutes(&self) -> u32 {
        self.entries
            .iter()
            .flat_map(|e| e.slots.iter())
            .map(|s| s.duration_minutes() as u32)
            .sum()
    }
}
