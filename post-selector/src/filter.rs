use chrono::{DateTime, Utc};
use threadcast_core::{ContentRule, CoreError, DedupLedger, Item};
use tracing::debug;

/// Whether `item` passes the textual-content rule.
pub fn is_textual(item: &Item, rule: ContentRule) -> bool {
    match rule {
        ContentRule::SelfPost => item.is_self && item.has_body(),
        ContentRule::NonEmptyBody => item.has_body(),
        ContentRule::Any => true,
    }
}

/// Keeps the items created at or after `cutoff` that pass `rule` and are not
/// in the ledger, preserving input order.
///
/// `items` must be ordered newest first: the scan stops at the first item
/// older than `cutoff`.
pub async fn filter_candidates<L: DedupLedger>(
    items: Vec<Item>,
    cutoff: DateTime<Utc>,
    rule: ContentRule,
    ledger: &L,
) -> Result<Vec<Item>, CoreError> {
    let mut eligible = Vec::new();

    for item in items {
        if item.created_utc < cutoff {
            debug!(item_id = %item.id, "Reached items older than the time window");
            break;
        }
        if !is_textual(&item, rule) {
            debug!(item_id = %item.id, "Skipping non-textual item");
            continue;
        }
        if ledger.contains(&item.id).await? {
            debug!(item_id = %item.id, "Skipping already processed item");
            continue;
        }
        eligible.push(item);
    }

    Ok(eligible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item_aged, now};
    use threadcast_core::{MemoryLedger, SelectionPolicy};

    #[tokio::test]
    async fn test_window_keeps_recent_items() {
        let items = vec![
            item_aged("a", 1, 10),
            item_aged("b", 3, 10),
            item_aged("c", 10, 10),
        ];
        let cutoff = SelectionPolicy::scheduled().cutoff(now());

        let eligible = filter_candidates(items, cutoff, ContentRule::SelfPost, &MemoryLedger::new())
            .await
            .unwrap();

        let ids: Vec<_> = eligible.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_scan_stops_at_first_stale_item() {
        // Out-of-order input: the fresh item after the stale one is never seen.
        let items = vec![item_aged("a", 1, 10), item_aged("old", 8, 10), item_aged("b", 2, 10)];
        let cutoff = SelectionPolicy::scheduled().cutoff(now());

        let eligible = filter_candidates(items, cutoff, ContentRule::Any, &MemoryLedger::new())
            .await
            .unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "a");
    }

    #[tokio::test]
    async fn test_item_exactly_at_cutoff_is_kept() {
        let items = vec![item_aged("edge", 6, 1)];
        let cutoff = SelectionPolicy::scheduled().cutoff(now());

        let eligible = filter_candidates(items, cutoff, ContentRule::Any, &MemoryLedger::new())
            .await
            .unwrap();

        assert_eq!(eligible.len(), 1);
    }

    #[tokio::test]
    async fn test_processed_items_are_excluded() {
        let mut ledger = MemoryLedger::new();
        ledger.add("seen").await.unwrap();

        let items = vec![item_aged("seen", 1, 50), item_aged("fresh", 2, 5)];
        let cutoff = SelectionPolicy::scheduled().cutoff(now());

        let eligible = filter_candidates(items, cutoff, ContentRule::SelfPost, &ledger)
            .await
            .unwrap();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "fresh");
    }

    #[test]
    fn test_content_rules() {
        let mut link = item_aged("link", 1, 10);
        link.is_self = false;
        link.selftext = String::new();

        let mut blank = item_aged("blank", 1, 10);
        blank.selftext = "   \n".to_string();

        let mut crosspost = item_aged("crosspost", 1, 10);
        crosspost.is_self = false;

        assert!(!is_textual(&link, ContentRule::SelfPost));
        assert!(!is_textual(&link, ContentRule::NonEmptyBody));
        assert!(is_textual(&link, ContentRule::Any));

        assert!(!is_textual(&blank, ContentRule::SelfPost));
        assert!(!is_textual(&blank, ContentRule::NonEmptyBody));

        assert!(!is_textual(&crosspost, ContentRule::SelfPost));
        assert!(is_textual(&crosspost, ContentRule::NonEmptyBody));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let cutoff = SelectionPolicy::continuous().cutoff(now());
        let eligible = filter_candidates(Vec::new(), cutoff, ContentRule::Any, &MemoryLedger::new())
            .await
            .unwrap();
        assert!(eligible.is_empty());
    }
}
