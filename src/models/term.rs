//! Academic terms and change windows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::TermId;

/// An academic period (e.g., a semester).
///
/// At most one term is active at a time. Core operations receive the active
/// term as an explicit argument rather than looking it up themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicTerm {
    /// Unique term identifier.
    pub id: TermId,
    /// Display code (e.g., "2026-2").
    pub code: String,
    /// First day of classes.
    pub start_date: NaiveDate,
    /// Last day of classes.
    pub end_date: NaiveDate,
    /// Whether this is the current term.
    pub is_active: bool,
    /// Whether students may file change requests in this term.
    pub allows_change_requests: bool,
}

impl AcademicTerm {
    /// Creates an active term that accepts change requests.
    pub fn new(id: impl Into<TermId>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let id = id.into();
        Self {
            code: id.to_string(),
            id,
            start_date,
            end_date,
            is_active: true,
            allows_change_requests: true,
        }
    }

    /// Sets the display code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Sets whether change requests are allowed.
    pub fn with_change_requests(mut self, allowed: bool) -> Self {
        self.allows_change_requests = allowed;
        self
    }

    /// Active and open to change requests.
    #[inline]
    pub fn accepts_change_requests(&self) -> bool {
        self.is_active && self.allows_change_requests
    }
}

/// What a change window gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowType {
    /// Filing new change requests.
    Creation,
    /// Approving or rejecting pending requests.
    Approval,
}

/// A time range during which creation or resolution of requests is allowed.
///
/// Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeWindow {
    /// Term the window belongs to.
    pub term_id: TermId,
    /// Gated operation.
    pub window_type: WindowType,
    /// Opening instant (inclusive).
    pub starts_at: DateTime<Utc>,
    /// Closing instant (inclusive).
    pub ends_at: DateTime<Utc>,
    /// Administrative on/off switch.
    pub active: bool,
}

impl ChangeWindow {
    /// Creates an active window.
    pub fn new(
        term_id: impl Into<TermId>,
        window_type: WindowType,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            term_id: term_id.into(),
            window_type,
            starts_at,
            ends_at,
            active: true,
        }
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether the window is active and `now` lies inside it.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.active && now >= self.starts_at && now <= self.ends_at
    }
}
