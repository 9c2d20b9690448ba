use threadcast_core::{AuthorExclusion, Comment, RawComment, RawCommentData, DELETED_AUTHOR};

/// Shape of the comment tree kept for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLimits {
    /// Maximum siblings kept at the top level.
    pub top_level: usize,
    /// Maximum siblings kept at every reply level.
    pub replies: usize,
    /// Deepest level kept. Top-level comments are level 1.
    pub depth_limit: u32,
    pub author_exclusion: AuthorExclusion,
}

impl TreeLimits {
    fn branching_at(&self, depth: u32) -> usize {
        if depth <= 1 {
            self.top_level
        } else {
            self.replies
        }
    }

    fn excludes_authors_at(&self, depth: u32) -> bool {
        match self.author_exclusion {
            AuthorExclusion::Disabled => false,
            AuthorExclusion::TopLevel => depth <= 1,
            AuthorExclusion::AllLevels => true,
        }
    }
}

/// `false` for deleted accounts, handles containing "bot" and AutoModerator.
pub fn is_qualifying_author(author: Option<&str>) -> bool {
    match author {
        None => false,
        Some(name) => {
            let name = name.to_lowercase();
            !name.contains("bot") && name != "automoderator"
        }
    }
}

/// Builds the tree of top-level comments and their replies.
pub fn build_comment_tree(raw: &[RawComment], limits: &TreeLimits) -> Vec<Comment> {
    build_comment_level(raw, 1, limits)
}

/// Builds one level of the tree whose nodes sit at `depth`, recursing into
/// replies until `limits.depth_limit` is reached.
///
/// "Load more" markers are dropped, remaining comments are sorted by score
/// (highest first, stable for equal scores) and cut to the branching limit
/// of the level.
pub fn build_comment_level(raw: &[RawComment], depth: u32, limits: &TreeLimits) -> Vec<Comment> {
    if depth > limits.depth_limit {
        return Vec::new();
    }

    let exclude_authors = limits.excludes_authors_at(depth);
    let mut retained: Vec<&RawCommentData> = raw
        .iter()
        .filter_map(|node| match node {
            RawComment::Comment(data) => Some(data),
            RawComment::MoreMarker { .. } => None,
        })
        .filter(|data| !exclude_authors || is_qualifying_author(data.author.as_deref()))
        .collect();

    retained.sort_by(|a, b| b.ranking_score().cmp(&a.ranking_score()));

    retained
        .into_iter()
        .take(limits.branching_at(depth))
        .map(|data| Comment {
            author: data
                .author
                .clone()
                .unwrap_or_else(|| DELETED_AUTHOR.to_string()),
            body: data.body.clone(),
            score: data.ranking_score(),
            replies: build_comment_level(&data.replies, depth + 1, limits),
        })
        .collect()
}
