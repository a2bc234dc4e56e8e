//! Area model: the department a request is addressed to.

use serde::{Deserialize, Serialize};

use crate::ids::{IdGenerator, IdKind};

/// An area referenced by topics and targeted by request logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl Area {
    /// True when no usable contact is recorded.
    pub fn missing_contact(&self) -> bool {
        self.contact
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Input for creating a new area.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDraft {
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
}

impl AreaDraft {
    pub fn new(name: impl Into<String>, contact: Option<&str>) -> Self {
        Self {
            name: name.into(),
            contact: contact.map(str::to_string),
        }
    }

    /// Build an area with a fresh identifier; a blank contact becomes `None`.
    pub fn build(self, ids: &mut impl IdGenerator) -> Area {
        let contact = self
            .contact
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Area {
            id: ids.next_id(IdKind::Area),
            name: self.name.trim().to_string(),
            contact,
        }
    }
}
