use crate::comment_tree::{build_comment_tree, TreeLimits};
use threadcast_core::{AssembledDocument, Item, RawComment};

/// Pairs the selected item with its ranked, bounded comment tree.
pub fn assemble_document(
    item: Item,
    raw_comments: &[RawComment],
    limits: &TreeLimits,
) -> AssembledDocument {
    let comments = build_comment_tree(raw_comments, limits);
    AssembledDocument { item, comments }
}
