use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body text used in place of an empty self text (link, image or video posts).
pub const LINK_POST_PLACEHOLDER: &str = "No content (link or image post).";

/// Author handle recorded for comments whose author was deleted.
pub const DELETED_AUTHOR: &str = "None";

/// A forum post as returned by the content source. Never mutated after fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub is_self: bool,
    pub author: String,
    pub url: String,
    pub num_comments: u32,
    pub score: i64,
    pub created_utc: DateTime<Utc>,
}

impl Item {
    /// The self text, or [`LINK_POST_PLACEHOLDER`] when there is none.
    pub fn display_body(&self) -> &str {
        let body = self.selftext.trim();
        if body.is_empty() {
            LINK_POST_PLACEHOLDER
        } else {
            body
        }
    }

    pub fn has_body(&self) -> bool {
        !self.selftext.trim().is_empty()
    }
}

/// One node of a comment thread as delivered by the content source, before
/// any ranking or trimming.
#[derive(Debug, Clone, PartialEq)]
pub enum RawComment {
    Comment(RawCommentData),
    /// A "load more comments" placeholder. Never materialised in a tree.
    MoreMarker { count: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCommentData {
    /// `None` when the author account was deleted.
    pub author: Option<String>,
    pub body: String,
    pub score: Option<i64>,
    pub replies: Vec<RawComment>,
}

impl RawCommentData {
    pub fn ranking_score(&self) -> i64 {
        self.score.unwrap_or(0)
    }
}

/// A ranked, trimmed comment with its retained replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub score: i64,
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Number of edges on the longest path from this comment down to a leaf.
    pub fn reply_depth(&self) -> usize {
        self.replies
            .iter()
            .map(|reply| reply.reply_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// A selected item together with its comment tree, ready for summarization.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDocument {
    pub item: Item,
    pub comments: Vec<Comment>,
}

impl AssembledDocument {
    /// Number of edges on the longest path from the item to a leaf comment.
    pub fn tree_depth(&self) -> usize {
        self.comments
            .iter()
            .map(|comment| comment.reply_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}
