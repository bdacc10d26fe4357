//! Student and program reference data.

use serde::{Deserialize, Serialize};

use super::{CourseId, ProgramId, StudentId};

/// A student as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Unique student identifier.
    pub id: StudentId,
    /// Display name.
    pub name: String,
    /// Declared academic program, if any.
    pub program_id: Option<ProgramId>,
}

impl Student {
    /// Creates a student with no declared program.
    pub fn new(id: impl Into<StudentId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            program_id: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the declared program.
    pub fn with_program(mut self, program_id: impl Into<ProgramId>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }
}

/// Ownership of a course by an academic program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseProgramMapping {
    pub course_id: CourseId,
    pub program_id: ProgramId,
}

impl CourseProgramMapping {
    pub fn new(course_id: impl Into<CourseId>, program_id: impl Into<ProgramId>) -> Self {
        Self {
            course_id: course_id.into(),
            program_id: program_id.into(),
        }
    }
}
