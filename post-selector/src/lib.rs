//! Picks the next item to summarize and assembles its comment tree.
//!
//! The pipeline is: [`filter::filter_candidates`] (recency, content rule,
//! ledger), [`ranker::select_most_discussed`] (highest comment count, first
//! seen wins), then [`assembler::assemble_document`] over the item's comments.

pub mod assembler;
pub mod comment_tree;
pub mod filter;
pub mod ranker;

pub use assembler::assemble_document;
pub use comment_tree::{build_comment_level, build_comment_tree, is_qualifying_author, TreeLimits};
pub use filter::{filter_candidates, is_textual};
pub use ranker::{most_discussed_index, select_most_discussed};

use chrono::{DateTime, Utc};
use threadcast_core::{AssembledDocument, CoreError, DedupLedger, Item, RawComment, SelectionPolicy};
use tracing::{debug, info};

pub struct PostSelector {
    policy: SelectionPolicy,
}

impl PostSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn tree_limits(&self) -> TreeLimits {
        TreeLimits {
            top_level: self.policy.num_comments_to_fetch,
            replies: self.policy.num_replies_to_fetch,
            depth_limit: self.policy.depth_limit,
            author_exclusion: self.policy.author_exclusion,
        }
    }

    /// Filters and ranks `items`, then records the winner in `ledger` before
    /// returning it.
    ///
    /// Once returned, an item is never selected again for the lifetime of the
    /// ledger, even if summarizing or publishing it later fails.
    pub async fn select<L: DedupLedger>(
        &self,
        items: Vec<Item>,
        now: DateTime<Utc>,
        ledger: &mut L,
    ) -> Result<Option<Item>, CoreError> {
        let fetched = items.len();
        let cutoff = self.policy.cutoff(now);
        let eligible = filter_candidates(items, cutoff, self.policy.content_rule, &*ledger).await?;
        debug!(
            stage = "filtering",
            fetched,
            eligible = eligible.len(),
            cutoff = %cutoff,
            "Filtered candidates"
        );

        let Some(winner) = select_most_discussed(eligible) else {
            info!(
                stage = "ranking",
                time_range_hours = self.policy.time_range_hours,
                "No eligible items in the time window"
            );
            return Ok(None);
        };

        ledger.add(&winner.id).await?;
        info!(
            stage = "ranking",
            item_id = %winner.id,
            num_comments = winner.num_comments,
            title = %winner.title,
            "Selected item with the most comments"
        );
        Ok(Some(winner))
    }

    pub fn assemble(&self, item: Item, raw_comments: &[RawComment]) -> AssembledDocument {
        assemble_document(item, raw_comments, &self.tree_limits())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, Utc};
    use threadcast_core::Item;

    pub fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-12-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn item_aged(id: &str, age_hours: i64, num_comments: u32) -> Item {
        Item {
            id: id.to_string(),
            title: format!("Post {}", id),
            selftext: "What do you all think about the new patch?".to_string(),
            is_self: true,
            author: "poster".to_string(),
            url: format!("https://www.reddit.com/r/test/comments/{}/", id),
            num_comments,
            score: 10,
            created_utc: now() - Duration::hours(age_hours),
        }
    }
}
