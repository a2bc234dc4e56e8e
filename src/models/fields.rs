//! Serde helpers for fields whose wire form differs from their in-memory form.
//!
//! Older exports stored `areaIds` and `tags` as comma-separated strings and used
//! empty strings for absent dates; both are accepted on input.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Split a comma-separated list into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join a set back into the comma-separated form used at the CSV boundary.
pub fn join_list(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// `BTreeSet<String>` serialized as an array, read from an array or a comma string.
pub mod string_set {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    pub fn serialize<S: Serializer>(set: &BTreeSet<String>, s: S) -> Result<S::Ok, S::Error> {
        set.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
        let raw = Option::<Raw>::deserialize(d)?;
        Ok(match raw {
            None => BTreeSet::new(),
            Some(Raw::Joined(text)) => split_list(&text),
            Some(Raw::List(items)) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// `Option<NaiveDate>` where an empty string reads as `None`.
pub mod optional_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        date.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid date '{}'", text))),
        }
    }
}
