use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

/// Canonical content-type key, e.g. `image/png` or `text/html`.
pub type ContentType = String;

/// Opaque handler-defined payload stored per content type.
pub type HandlerPayload = serde_json::Value;

/// Bucketed probe output: content type -> URLs in discovery order.
pub type DiscoveredUrls = BTreeMap<ContentType, Vec<String>>;

/// Dispatcher output: content type -> handler payload.
pub type FetchedData = BTreeMap<ContentType, HandlerPayload>;

/// Identifier of a host-owned content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What flavor of content an item is. Entries are top-level content typed by
/// the host's post type; replies are threaded comments attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentKind {
    Entry { post_type: String },
    Reply { parent_post_type: String },
}

/// Lifecycle state reported by the host alongside a finalized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Published,
    Draft,
    AutoDraft,
    Autosave,
    Revision,
}

impl ItemStatus {
    /// Only durable, non-draft content is eligible for scanning.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Published)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    pub id: ItemId,
    pub kind: ContentKind,
    pub status: ItemStatus,
    pub body: String,
}

impl ContentItem {
    pub fn published_entry(
        id: impl Into<String>,
        post_type: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(id),
            kind: ContentKind::Entry {
                post_type: post_type.into(),
            },
            status: ItemStatus::Published,
            body: body.into(),
        }
    }
}

/// Sidecar state persisted against a content item.
///
/// `discovered_urls` and `fetched_data` are `None` when that stage never
/// produced anything, which keeps "never tried" apart from "tried and got
/// nothing" (`Some` of an empty map).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanState {
    pub scanned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub discovered_urls: Option<DiscoveredUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fetched_data: Option<FetchedData>,
}

/// True for payloads the renderer treats as absent.
pub fn is_empty_payload(payload: &HandlerPayload) -> bool {
    match payload {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Number(_) => false,
    }
}
