//! Wire representation of a task.

use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque task identifier.
///
/// Stores have been seen to hand out both numeric and string ids, so either
/// JSON form is accepted. Ids always serialize as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as an unsigned integer, if it is one.
    pub fn as_numeric(&self) -> Option<u64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => TaskId(text),
            RawId::Number(number) => TaskId(number.to_string()),
        })
    }
}

/// A task as it travels to and from the store.
///
/// Only `title` and `description` are always present. The trailing
/// presentation fields are filled in by the client before sending; values
/// echoed back by a store are discarded on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    /// RFC 3339 timestamp, kept as text so a malformed value cannot fail a
    /// whole listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub valid: Option<String>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub task_button_text: Option<String>,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub user_has_pressed: Option<bool>,

    #[serde(
        rename = "ButtonDelete",
        skip_deserializing,
        skip_serializing_if = "Option::is_none"
    )]
    pub button_delete: Option<String>,
}

impl TaskRecord {
    /// The same record with its id removed, as sent on create.
    pub fn without_id(self) -> Self {
        Self { id: None, ..self }
    }
}
