//! Pairwise conflict detection between weekly meetings.
//!
//! # Algorithm
//! Brute-force pairwise comparison. A student carries a handful of groups
//! with a few meetings each, so O(c × m) over candidate × committed
//! meetings is cheap and keeps every pair visible.
//!
//! No deduplication is done: if two different committed meetings overlap
//! the same candidate meeting, both pairs are reported.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::WeeklySchedule;
use crate::models::{GroupId, WeeklySlot};

/// A meeting tagged with the group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSlot {
    /// Owning group.
    pub group_id: GroupId,
    /// The meeting.
    pub slot: WeeklySlot,
}

impl ScheduledSlot {
    pub fn new(group_id: impl Into<GroupId>, slot: WeeklySlot) -> Self {
        Self {
            group_id: group_id.into(),
            slot,
        }
    }

    /// Tags every meeting of a group.
    pub fn from_group(group_id: &GroupId, slots: &[WeeklySlot]) -> Vec<Self> {
        slots
            .iter()
            .map(|s| Self::new(group_id.clone(), s.clone()))
            .collect()
    }
}

/// Two colliding meetings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    /// Meeting being added (or the earlier entry in a rendered schedule).
    pub candidate: ScheduledSlot,
    /// Meeting already on the student's timetable.
    pub committed: ScheduledSlot,
    /// Length of the collision (minutes).
    pub overlap_minutes: u16,
}

impl fmt::Display for ConflictPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {} meeting {} overlaps group {} meeting {} by {} min",
            self.candidate.group_id,
            self.candidate.slot,
            self.committed.group_id,
            self.committed.slot,
            self.overlap_minutes
        )
    }
}

/// Reports every (candidate, committed) pair that overlaps.
///
/// Pure: the caller fetches the student's committed meetings up front.
pub fn detect_conflicts(
    candidate: &[ScheduledSlot],
    committed: &[ScheduledSlot],
) -> Vec<ConflictPair> {
    let mut conflicts = Vec::new();
    for c in candidate {
        for k in committed {
            if let Some(minutes) = c.slot.overlap_minutes(&k.slot) {
                conflicts.push(ConflictPair {
                    candidate: c.clone(),
                    committed: k.clone(),
                    overlap_minutes: minutes,
                });
            }
        }
    }
    conflicts
}

/// Reports every collision between meetings of *different* groups in a
/// rendered weekly schedule.
///
/// Each unordered pair of groups is compared once; the earlier entry is
/// reported as the candidate.
pub fn detect_schedule_conflicts(schedule: &WeeklySchedule) -> Vec<ConflictPair> {
    let tagged: Vec<Vec<ScheduledSlot>> = schedule
        .entries
        .iter()
        .map(|e| ScheduledSlot::from_group(&e.group_id, &e.slots))
        .collect();

    let mut conflicts = Vec::new();
    for i in 0..tagged.len() {
        for j in (i + 1)..tagged.len() {
            if schedule.entries[i].group_id == schedule.entries[j].group_id {
                continue;
            }
            conflicts.extend(detect_conflicts(&tagged[i], &tagged[j]));
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayOfWeek;
    use crate::schedule::ScheduleEntry;

    fn meeting(group: &str, day: DayOfWeek, start: &str, end: &str) -> ScheduledSlot {
        ScheduledSlot::new(group, WeeklySlot::at(day, start, end).unwrap())
    }

    #[test]
    fn test_detects_overlap_and_ignores_adjacency() {
        let candidate = vec![meeting("A", DayOfWeek::Monday, "08:00", "10:00")];
        let committed = vec![
            meeting("B", DayOfWeek::Monday, "09:00", "11:00"),
            meeting("C", DayOfWeek::Monday, "10:00", "12:00"),
        ];

        let conflicts = detect_conflicts(&candidate, &committed);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].committed.group_id, GroupId::new("B"));
        assert_eq!(conflicts[0].overlap_minutes, 60);
    }

    #[test]
    fn test_no_dedup_across_committed_meetings() {
        let candidate = vec![meeting("T", DayOfWeek::Tuesday, "08:00", "12:00")];
        let committed = vec![
            meeting("X", DayOfWeek::Tuesday, "08:00", "09:00"),
            meeting("Y", DayOfWeek::Tuesday, "10:00", "11:00"),
            meeting("X", DayOfWeek::Tuesday, "11:00", "13:00"),
        ];

        let conflicts = detect_conflicts(&candidate, &committed);
        assert_eq!(conflicts.len(), 3);
    }

    #[test]
    fn test_empty_inputs() {
        let one = vec![meeting("A", DayOfWeek::Friday, "08:00", "09:00")];
        assert!(detect_conflicts(&[], &one).is_empty());
        assert!(detect_conflicts(&one, &[]).is_empty());
    }

    #[test]
    fn test_different_days_no_conflict() {
        let candidate = vec![meeting("A", DayOfWeek::Monday, "08:00", "10:00")];
        let committed = vec![meeting("B", DayOfWeek::Tuesday, "08:00", "10:00")];
        assert!(detect_conflicts(&candidate, &committed).is_empty());
    }

    #[test]
    fn test_schedule_conflicts_between_groups_only() {
        let mut schedule = WeeklySchedule::new("S1", "T1");
        schedule.add_entry(
            ScheduleEntry::new("G1", "C1")
                .with_slot(WeeklySlot::at(DayOfWeek::Monday, "08:00", "10:00").unwrap())
                .with_slot(WeeklySlot::at(DayOfWeek::Monday, "09:00", "09:30").unwrap()),
        );
        schedule.add_entry(
            ScheduleEntry::new("G2", "C2")
                .with_slot(WeeklySlot::at(DayOfWeek::Monday, "09:30", "11:00").unwrap()),
        );
        schedule.add_entry(
            ScheduleEntry::new("G3", "C3")
                .with_slot(WeeklySlot::at(DayOfWeek::Monday, "11:00", "12:00").unwrap()),
        );

        // G1's own meetings overlap each other but that is not a conflict.
        let conflicts = detect_schedule_conflicts(&schedule);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].candidate.group_id, GroupId::new("G1"));
        assert_eq!(conflicts[0].committed.group_id, GroupId::new("G2"));
        assert_eq!(conflicts[0].overlap_minutes, 30);
    }

    #[test]
    fn test_conflict_display() {
        let conflicts = detect_conflicts(
            &[meeting("A", DayOfWeek::Monday, "08:00", "10:00")],
            &[meeting("B", DayOfWeek::Monday, "09:00", "11:00")],
        );
        assert_eq!(
            conflicts[0].to_string(),
            "group A meeting Mon 08:00-10:00 overlaps group B meeting Mon 09:00-11:00 by 60 min"
        );
    }
}
