use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ContentItem, ContentKind, ItemId, ItemStatus};

/// Lifecycle event body; the item id comes from the path.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinalizedRequest {
    pub kind: ContentKind,
    pub status: ItemStatus,
    pub body: String,
}

impl FinalizedRequest {
    pub fn into_item(self, id: ItemId) -> ContentItem {
        ContentItem {
            id,
            kind: self.kind,
            status: self.status,
            body: self.body,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedResponse {
    pub id: ItemId,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
