use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// BugStatus
// ---------------------------------------------------------------------------

/// Workflow state of a bug.
///
/// ```text
/// open → in-progress → resolved
/// ```
///
/// Transitions are not enforced; any status may be set by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BugStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
}

impl BugStatus {
    pub const ALL: [BugStatus; 3] = [Self::Open, Self::InProgress, Self::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for BugStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BugStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{s}' (expected open, in-progress or resolved)"))
    }
}

// ---------------------------------------------------------------------------
// Bug: the stored document
// ---------------------------------------------------------------------------

/// A single bug report.
///
/// `id` and `created_at` are assigned by the store on insert and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: BugStatus,
    pub created_at: String,
}

impl Bug {
    /// Merge the fields present in `patch` into this record.
    pub fn apply(&mut self, patch: BugPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /bugs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBug {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Defaults to `open` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BugStatus>,
}

/// Body of `PUT /bugs/{id}`: any subset of the mutable fields.
///
/// Absent fields are left untouched. `"description": null` clears the
/// description; `null` for `title` or `status` is ignored. Unknown keys such
/// as `id` or `createdAt` are ignored, so a client may send back a whole
/// record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BugStatus>,
}

impl BugPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
