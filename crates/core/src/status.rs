//! Text-backed enums shared by every layer.
//!
//! Each enum serializes to (and is stored in the database as) its display
//! string, e.g. `TaskStatus::InProgress` is `"In Progress"` on the wire and in
//! the `tasks.status` column. The `CHECK` constraints in the migrations list
//! the same strings.

use std::str::FromStr;

/// Returned when a string does not name a variant of a text-backed enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{value}'. Must be one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal, default = $default:ident) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire / database representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::status::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::status::ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::status::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use define_string_enum;

define_string_enum! {
    /// Project lifecycle status.
    ProjectStatus ("project status", default = Planning) {
        Planning => "Planning",
        InProgress => "In Progress",
        OnHold => "On Hold",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

define_string_enum! {
    /// Task workflow status.
    TaskStatus ("task status", default = Todo) {
        Todo => "Todo",
        InProgress => "In Progress",
        Done => "Done",
    }
}

define_string_enum! {
    /// Priority shared by projects and tasks.
    Priority ("priority", default = Medium) {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Urgent => "Urgent",
    }
}

define_string_enum! {
    /// Kind of work a task represents.
    TaskCategory ("task category", default = Other) {
        Development => "Development",
        Design => "Design",
        Testing => "Testing",
        Documentation => "Documentation",
        Research => "Research",
        Meeting => "Meeting",
        Other => "Other",
    }
}

define_string_enum! {
    /// A team member's role inside one project. Does not affect authorization.
    TeamRole ("team role", default = Member) {
        Viewer => "Viewer",
        Member => "Member",
        Lead => "Lead",
    }
}

impl Priority {
    /// Ordinal used for sorting (Low = 1 .. Urgent = 4).
    pub fn rank(self) -> i16 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        self == TaskStatus::Done
    }
}

/// Parse an optional query-string value into an enum, treating blank as absent.
pub fn parse_optional<T>(value: Option<&str>) -> Result<Option<T>, ParseEnumError>
where
    T: FromStr<Err = ParseEnumError>,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}
