//! Typed identifiers.
//!
//! Every entity reference inside the engine is one of these newtypes, so a
//! group id can never be passed where a course id is expected. Generated
//! ids (requests, enrollments) are UUID v4 strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrowed string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Student identifier.
    StudentId
);
string_id!(
    /// Course (catalog entry) identifier.
    CourseId
);
string_id!(
    /// Course group (section) identifier.
    GroupId
);
string_id!(
    /// Academic term identifier.
    TermId
);
string_id!(
    /// Academic program identifier.
    ProgramId
);
string_id!(
    /// Enrollment record identifier.
    EnrollmentId
);
string_id!(
    /// Change request identifier.
    ChangeRequestId
);

impl EnrollmentId {
    /// Fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ChangeRequestId {
    /// Fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_conversions() {
        let g = GroupId::from("G-101");
        assert_eq!(g.to_string(), "G-101");
        assert_eq!(g.as_str(), "G-101");
        assert_eq!(g, GroupId::new(String::from("G-101")));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ChangeRequestId::generate();
        let b = ChangeRequestId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_serde_transparent() {
        let id = StudentId::new("S1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"S1\"");
    }
}
