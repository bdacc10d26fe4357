//! Enrollment history consistency checks.
//!
//! Advisory only: anomalies are reported alongside a [`RiskReport`]
//! and never alter its band.
//!
//! [`RiskReport`]: super::RiskReport

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::EnrollmentRecord;
use crate::models::{CourseId, EnrollmentId, EnrollmentStatus};

/// Anomaly category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// PASSED record with no grade.
    PassedWithoutGrade,
    /// Grade outside `0..=grade_scale_max`.
    GradeOutOfRange,
    /// Same course passed more than once.
    DuplicatePassed,
}

/// One detected inconsistency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub enrollment_id: EnrollmentId,
    pub course_id: CourseId,
    pub message: String,
}

/// Scans a history for inconsistent records.
pub fn detect_anomalies(records: &[EnrollmentRecord], grade_scale_max: f64) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    let mut passed_by_course: HashMap<&CourseId, usize> = HashMap::new();

    for r in records {
        if r.status == EnrollmentStatus::Passed {
            if r.grade.is_none() {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::PassedWithoutGrade,
                    enrollment_id: r.enrollment_id.clone(),
                    course_id: r.course_id.clone(),
                    message: format!("enrollment {} is PASSED but has no grade", r.enrollment_id),
                });
            }

            let seen = passed_by_course.entry(&r.course_id).or_insert(0);
            *seen += 1;
            if *seen == 2 {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::DuplicatePassed,
                    enrollment_id: r.enrollment_id.clone(),
                    course_id: r.course_id.clone(),
                    message: format!("course {} is passed more than once", r.course_id),
                });
            }
        }

        if let Some(grade) = r.grade {
            if !(0.0..=grade_scale_max).contains(&grade) {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::GradeOutOfRange,
                    enrollment_id: r.enrollment_id.clone(),
                    course_id: r.course_id.clone(),
                    message: format!(
                        "enrollment {} has grade {} outside 0..={}",
                        r.enrollment_id, grade, grade_scale_max
                    ),
                });
            }
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_history() {
        let records = vec![
            EnrollmentRecord::new("E1", "C1", 3, EnrollmentStatus::Passed).with_grade(4.0),
            EnrollmentRecord::new("E2", "C2", 3, EnrollmentStatus::Enrolled),
        ];
        assert!(detect_anomalies(&records, 5.0).is_empty());
    }

    #[test]
    fn test_each_kind() {
        let records = vec![
            EnrollmentRecord::new("E1", "C1", 3, EnrollmentStatus::Passed),
            EnrollmentRecord::new("E2", "C2", 3, EnrollmentStatus::Failed).with_grade(7.5),
            EnrollmentRecord::new("E3", "C3", 3, EnrollmentStatus::Passed).with_grade(4.0),
            EnrollmentRecord::new("E4", "C3", 3, EnrollmentStatus::Passed).with_grade(4.2),
        ];
        let kinds: Vec<AnomalyKind> = detect_anomalies(&records, 5.0)
            .into_iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AnomalyKind::PassedWithoutGrade,
                AnomalyKind::GradeOutOfRange,
                AnomalyKind::DuplicatePassed,
            ]
        );
    }

    #[test]
    fn test_duplicate_reported_once() {
        let records: Vec<_> = (0..3)
            .map(|i| {
                EnrollmentRecord::new(format!("E{i}"), "C1", 3, EnrollmentStatus::Passed)
                    .with_grade(3.0)
            })
            .collect();
        assert_eq!(detect_anomalies(&records, 5.0).len(), 1);
    }
}
