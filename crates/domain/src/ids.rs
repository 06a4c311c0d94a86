//! Strongly-typed identifiers for access-control records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub const fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a role definition.
    RoleId
);

define_id!(
    /// Identifier of one role assignment row.
    AssignmentId
);

define_id!(
    /// Identifier of the academic year an assignment is scoped to.
    AcademicYearId
);

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{AcademicYearId, RoleId};

    #[test]
    fn identifiers_keep_their_uuid() {
        let value = Uuid::new_v4();
        assert_eq!(RoleId::from_uuid(value).as_uuid(), value);
        assert_eq!(AcademicYearId::from(value).to_string(), value.to_string());
    }
}
