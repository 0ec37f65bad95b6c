//! Drive resource types.
//!
//! 64-bit counters (`size`, `usage`, `limit`) arrive from the REST API as
//! JSON strings; they are accepted in either form.

use serde::{Deserialize, Deserializer, Serialize};

/// OAuth scope granting full read/write access to Drive.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Largest page the files.list endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Fields requested from files.list.
pub const LIST_FIELDS: &str = "files(id,name,size),nextPageToken";

/// A file as reported by the Drive API.
///
/// Listings only populate `id`, `name` and `size`. A full metadata fetch
/// also fills in `mime_type` and `parents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File id. Cleared before a copy so the API allocates a new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes. Folders and native Google documents have none.
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<i64>,
    /// Parent folder ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl DriveFile {
    /// Create a file descriptor with an id, name and size.
    pub fn new(id: impl Into<String>, name: impl Into<String>, size: i64) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            size: Some(size),
            ..Self::default()
        }
    }

    /// Set the parent folders.
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// File id, or an empty string when absent.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// Size in bytes, with a missing size reported as zero.
    pub fn size_bytes(&self) -> i64 {
        self.size.unwrap_or(0)
    }
}

/// One page of a files.list response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Files on this page.
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Token for the next page, if any.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Storage quota snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    /// Bytes used across all services.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub usage: Option<i64>,
    /// Storage limit in bytes. Absent for unlimited plans, which are
    /// treated as having no room at all.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
}

impl Quota {
    /// Create a snapshot with a fixed limit.
    pub fn new(usage: i64, limit: i64) -> Self {
        Self {
            usage: Some(usage),
            limit: Some(limit),
        }
    }

    /// Bytes used.
    pub fn used(&self) -> i64 {
        self.usage.unwrap_or(0)
    }

    /// Limit in bytes, with a missing limit reported as zero.
    pub fn total(&self) -> i64 {
        self.limit.unwrap_or(0)
    }

    /// Remaining bytes.
    pub fn free(&self) -> i64 {
        self.total().saturating_sub(self.used())
    }

    /// Whether usage has reached the limit.
    pub fn is_exhausted(&self) -> bool {
        self.used() >= self.total()
    }
}

/// Search queries used against files.list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    /// Files directly inside a folder.
    InParents(String),
    /// Files owned by the authenticated identity.
    OwnedByMe,
}

impl ListQuery {
    /// Render the query in Drive search syntax.
    pub fn to_q(&self) -> String {
        match self {
            Self::InParents(id) => format!("'{}' in parents", escape_q(id)),
            Self::OwnedByMe => "'me' in owners".to_string(),
        }
    }
}

fn escape_q(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive encodes int64 fields as JSON strings.
fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}
