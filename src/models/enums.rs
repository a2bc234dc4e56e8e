//! Enumerations shared by the planner records.
//!
//! Wire spelling matches the JSON export format (`one-off`, `fixed-date`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! wire_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", $what, other)),
                }
            }
        }
    };
}

/// Recurrence interval of a topic's requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cadence {
    OneOff,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

wire_enum!(Cadence, "cadence", {
    OneOff => "one-off",
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});

/// How the due date of a request is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DueStrategy {
    FixedDate,
    /// Due a number of days (`dueOffsetDays`) after the request is sent.
    Relative,
}

wire_enum!(DueStrategy, "due strategy", {
    FixedDate => "fixed-date",
    Relative => "relative",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

wire_enum!(Priority, "priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Planned,
    Active,
    Blocked,
    Done,
}

wire_enum!(Status, "status", {
    Planned => "planned",
    Active => "active",
    Blocked => "blocked",
    Done => "done",
});

impl Status {
    /// Statuses that count towards a team's active load.
    pub fn is_open(&self) -> bool {
        !matches!(self, Status::Done)
    }
}

/// Result recorded for a sent request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Sent,
    Ack,
    Delivered,
    Overdue,
}

wire_enum!(Outcome, "outcome", {
    Sent => "sent",
    Ack => "ack",
    Delivered => "delivered",
    Overdue => "overdue",
});
