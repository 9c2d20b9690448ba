use crate::{CoreError, Item, RawComment};

/// Read access to the discussion forum.
pub trait ContentSource {
    /// Most recent items of `source_id`, newest first, at most `limit` of them.
    async fn list_recent_items(&self, source_id: &str, limit: u32)
        -> Result<Vec<Item>, CoreError>;

    /// Top-level comments of an item with their nested replies. "Load more"
    /// placeholders are returned as [`RawComment::MoreMarker`] and never
    /// expanded.
    async fn fetch_comments(&self, item_id: &str) -> Result<Vec<RawComment>, CoreError>;
}
