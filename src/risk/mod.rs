//! Academic risk ("traffic light") classification.
//!
//! Aggregates a student's enrollment history into standard academic
//! indicators and classifies the student into a risk band.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Passed credits | Σ credits of PASSED |
//! | Total credits | Σ credits of PASSED + FAILED |
//! | GPA | Σ(grade × credits) / Σ credits over graded PASSED + FAILED, 2 decimals |
//! | Completion rate | passed credits / total credits |
//! | Failed courses | number of FAILED records |
//!
//! ENROLLED (in progress) and CANCELLED records carry no credit.
//!
//! # Bands
//!
//! | Band | Condition (first match) |
//! |------|-------------------------|
//! | RED | gpa < 3.0 or completion < 0.6 or failed > 2 |
//! | YELLOW | gpa < 3.5 or completion < 0.8 or failed > 0 |
//! | GREEN | otherwise |
//!
//! Consistency anomalies are reported next to the band and never change it.

mod anomalies;

pub use anomalies::{detect_anomalies, Anomaly, AnomalyKind};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{CourseId, EnrollmentId, EnrollmentStatus, StudentId};

/// Risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    /// Low risk.
    Green,
    /// Medium risk.
    Yellow,
    /// High risk.
    Red,
}

impl RiskBand {
    /// Fixed advice attached to this band.
    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            RiskBand::Red => RED_RECOMMENDATIONS,
            RiskBand::Yellow => YELLOW_RECOMMENDATIONS,
            RiskBand::Green => GREEN_RECOMMENDATIONS,
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskBand::Green => "GREEN",
            RiskBand::Yellow => "YELLOW",
            RiskBand::Red => "RED",
        };
        f.write_str(s)
    }
}

const RED_RECOMMENDATIONS: &[&str] = &[
    "Schedule weekly tutoring sessions with an academic tutor",
    "Meet with your program advisor to review your study plan",
    "Reduce your course load next term",
    "Attend study skills workshops offered by student services",
];

const YELLOW_RECOMMENDATIONS: &[&str] = &[
    "Attend office hours in courses where your grade is below 3.5",
    "Form or join a study group",
    "Review your progress with your program advisor mid-term",
];

const GREEN_RECOMMENDATIONS: &[&str] = &[
    "Keep up your current study habits",
    "Consider tutoring peers or joining research activities",
];

/// Band thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// GPA below this is RED.
    pub red_gpa: f64,
    /// Completion rate below this is RED.
    pub red_completion_rate: f64,
    /// More failed courses than this is RED.
    pub red_max_failed: u32,
    /// GPA below this is YELLOW.
    pub yellow_gpa: f64,
    /// Completion rate below this is YELLOW.
    pub yellow_completion_rate: f64,
    /// More failed courses than this is YELLOW.
    pub yellow_max_failed: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            red_gpa: 3.0,
            red_completion_rate: 0.6,
            red_max_failed: 2,
            yellow_gpa: 3.5,
            yellow_completion_rate: 0.8,
            yellow_max_failed: 0,
        }
    }
}

/// One enrollment joined with its course's credit weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub enrollment_id: EnrollmentId,
    pub course_id: CourseId,
    pub credits: u32,
    pub status: EnrollmentStatus,
    pub grade: Option<f64>,
}

impl EnrollmentRecord {
    pub fn new(
        enrollment_id: impl Into<EnrollmentId>,
        course_id: impl Into<CourseId>,
        credits: u32,
        status: EnrollmentStatus,
    ) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            course_id: course_id.into(),
            credits,
            status,
            grade: None,
        }
    }

    pub fn with_grade(mut self, grade: f64) -> Self {
        self.grade = Some(grade);
        self
    }
}

/// A student's risk classification with its supporting indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub student_id: StudentId,
    pub band: RiskBand,
    /// `None` when nothing has been graded yet.
    pub gpa: Option<f64>,
    pub passed_credits: u32,
    pub total_credits: u32,
    /// 0.0..=1.0, rounded to 2 decimals.
    pub completion_rate: f64,
    pub failed_course_count: u32,
    pub recommendations: Vec<String>,
    /// Advisory data anomalies.
    pub anomalies: Vec<Anomaly>,
}

impl RiskReport {
    /// Whether the band is RED.
    pub fn is_high_risk(&self) -> bool {
        self.band == RiskBand::Red
    }
}

/// Computes [`RiskReport`]s from enrollment history.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    thresholds: RiskThresholds,
    grade_scale_max: f64,
}

impl RiskCalculator {
    /// Default thresholds on a 0..5 grade scale.
    pub fn new() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
            grade_scale_max: 5.0,
        }
    }

    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_grade_scale_max(mut self, max: f64) -> Self {
        self.grade_scale_max = max;
        self
    }

    /// Aggregates and classifies one student's history.
    pub fn calculate(&self, student_id: &StudentId, records: &[EnrollmentRecord]) -> RiskReport {
        let mut passed_credits: u32 = 0;
        let mut total_credits: u32 = 0;
        let mut failed_count: u32 = 0;
        let mut weighted_grades: f64 = 0.0;
        let mut graded_credits: u32 = 0;

        for r in records {
            match r.status {
                EnrollmentStatus::Passed => {
                    passed_credits += r.credits;
                    total_credits += r.credits;
                }
                EnrollmentStatus::Failed => {
                    failed_count += 1;
                    total_credits += r.credits;
                }
                EnrollmentStatus::Enrolled | EnrollmentStatus::Cancelled => continue,
            }
            if let Some(grade) = r.grade {
                weighted_grades += grade * r.credits as f64;
                graded_credits += r.credits;
            }
        }

        let gpa = if graded_credits == 0 {
            None
        } else {
            Some(round2(weighted_grades / graded_credits as f64))
        };

        let completion = if total_credits == 0 {
            1.0
        } else {
            passed_credits as f64 / total_credits as f64
        };

        // Band thresholds apply to the exact ratio; only the report is rounded.
        let band = self.classify(gpa, completion, failed_count);

        RiskReport {
            student_id: student_id.clone(),
            band,
            gpa,
            passed_credits,
            total_credits,
            completion_rate: round2(completion),
            failed_course_count: failed_count,
            recommendations: band.recommendations().iter().map(|s| s.to_string()).collect(),
            anomalies: detect_anomalies(records, self.grade_scale_max),
        }
    }

    /// Band for the given indicators.
    pub fn classify(&self, gpa: Option<f64>, completion_rate: f64, failed: u32) -> RiskBand {
        let t = &self.thresholds;
        let below = |limit: f64| gpa.is_some_and(|g| g < limit);

        if below(t.red_gpa) || completion_rate < t.red_completion_rate || failed > t.red_max_failed
        {
            RiskBand::Red
        } else if below(t.yellow_gpa)
            || completion_rate < t.yellow_completion_rate
            || failed > t.yellow_max_failed
        {
            RiskBand::Yellow
        } else {
            RiskBand::Green
        }
    }
}

impl Default for RiskCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
