//! Team model: the requesting side of a work request.

use serde::{Deserialize, Serialize};

use crate::ids::{IdGenerator, IdKind};

/// A team that owns topics and sends requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

/// Input for creating a new team.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDraft {
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

impl TeamDraft {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }

    /// Build a team with a fresh identifier and trimmed fields.
    pub fn build(self, ids: &mut impl IdGenerator) -> Team {
        Team {
            id: ids.next_id(IdKind::Team),
            name: self.name.trim().to_string(),
            owner: self.owner.trim().to_string(),
        }
    }
}
