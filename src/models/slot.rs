//! Weekly recurring class meetings.
//!
//! # Time Model
//! A meeting is a day of the week plus a minute range within that day.
//! Minutes count from midnight (0..=1440). The range is half-open:
//! it includes the start minute and excludes the end minute, so a class
//! ending at 10:00 and another starting at 10:00 do not collide.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minutes in a day; the largest legal end minute.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Day of the week, ISO ordering (Monday = 1 .. Sunday = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl DayOfWeek {
    /// All days, Monday first.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// ISO day number (1..=7).
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Parses an ISO day number.
    pub fn from_number(n: u8) -> Result<Self, SlotError> {
        match n {
            1..=7 => Ok(Self::ALL[(n - 1) as usize]),
            _ => Err(SlotError::InvalidDay(n)),
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        Self::ALL[day.num_days_from_monday() as usize]
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
            DayOfWeek::Sunday => "Sun",
        };
        f.write_str(name)
    }
}

/// Errors building a [`WeeklySlot`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("day of week must be 1..=7, got {0}")]
    InvalidDay(u8),
    #[error("slot start {start} must be before end {end}")]
    EmptyRange { start: u16, end: u16 },
    #[error("slot end {0} is past the end of the day")]
    PastMidnight(u16),
    #[error("invalid clock time '{0}', expected HH:MM")]
    InvalidClock(String),
}

/// A weekly recurring meeting [start, end) on one day.
///
/// Immutable once created; construct through [`WeeklySlot::new`] or
/// [`WeeklySlot::at`] so `start_minute < end_minute` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeeklySlot {
    /// Meeting day.
    pub day: DayOfWeek,
    /// Start minute from midnight (inclusive).
    pub start_minute: u16,
    /// End minute from midnight (exclusive).
    pub end_minute: u16,
    /// Optional room label.
    pub room: Option<String>,
}

impl WeeklySlot {
    /// Creates a slot from minute offsets.
    pub fn new(day: DayOfWeek, start_minute: u16, end_minute: u16) -> Result<Self, SlotError> {
        if start_minute >= end_minute {
            return Err(SlotError::EmptyRange {
                start: start_minute,
                end: end_minute,
            });
        }
        if end_minute > MINUTES_PER_DAY {
            return Err(SlotError::PastMidnight(end_minute));
        }
        Ok(Self {
            day,
            start_minute,
            end_minute,
            room: None,
        })
    }

    /// Creates a slot from `"HH:MM"` clock strings.
    pub fn at(day: DayOfWeek, start: &str, end: &str) -> Result<Self, SlotError> {
        Self::new(day, parse_clock(start)?, parse_clock(end)?)
    }

    /// Sets the room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Meeting length in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> u16 {
        self.end_minute - self.start_minute
    }

    /// Whether the given minute of `day` falls inside this meeting.
    #[inline]
    pub fn contains(&self, day: DayOfWeek, minute: u16) -> bool {
        self.day == day && minute >= self.start_minute && minute < self.end_minute
    }

    /// Whether two meetings collide: same day and intersecting ranges.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day
            && self.start_minute < other.end_minute
            && other.start_minute < self.end_minute
    }

    /// Length of the collision in minutes, `None` if the meetings don't overlap.
    pub fn overlap_minutes(&self, other: &Self) -> Option<u16> {
        if self.day != other.day {
            return None;
        }
        let start = self.start_minute.max(other.start_minute);
        let end = self.end_minute.min(other.end_minute);
        if end > start {
            Some(end - start)
        } else {
            None
        }
    }
}

impl fmt::Display for WeeklySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day,
            format_clock(self.start_minute),
            format_clock(self.end_minute)
        )?;
        if let Some(room) = &self.room {
            write!(f, " ({room})")?;
        }
        Ok(())
    }
}

/// Free-function form of [`WeeklySlot::overlaps`].
#[inline]
pub fn overlaps(a: &WeeklySlot, b: &WeeklySlot) -> bool {
    a.overlaps(b)
}

/// Parses `"HH:MM"` into minutes from midnight. `"24:00"` is accepted as 1440.
pub fn parse_clock(s: &str) -> Result<u16, SlotError> {
    let invalid = || SlotError::InvalidClock(s.to_string());
    let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
    let h: u16 = h.parse().map_err(|_| invalid())?;
    let m: u16 = m.parse().map_err(|_| invalid())?;
    if m >= 60 || h > 24 || (h == 24 && m != 0) {
        return Err(invalid());
    }
    Ok(h * 60 + m)
}

/// Formats minutes from midnight as `"HH:MM"`.
pub fn format_clock(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
