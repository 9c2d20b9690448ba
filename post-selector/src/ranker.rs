use threadcast_core::Item;

/// Index of the item with the most comments. Ties go to the earliest item.
pub fn most_discussed_index(candidates: &[Item]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, item) in candidates.iter().enumerate() {
        match best {
            Some(current) if candidates[current].num_comments >= item.num_comments => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Takes the most discussed item out of `candidates`. `None` means there is
/// nothing to do this cycle.
pub fn select_most_discussed(mut candidates: Vec<Item>) -> Option<Item> {
    most_discussed_index(&candidates).map(|index| candidates.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::item_aged;

    #[test]
    fn test_picks_highest_comment_count() {
        let candidates = vec![item_aged("five", 1, 5), item_aged("twelve", 2, 12)];
        let winner = select_most_discussed(candidates).unwrap();
        assert_eq!(winner.id, "twelve");
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let candidates = vec![
            item_aged("a", 1, 3),
            item_aged("b", 1, 9),
            item_aged("c", 2, 9),
            item_aged("d", 3, 9),
        ];
        assert_eq!(most_discussed_index(&candidates), Some(1));
        assert_eq!(select_most_discussed(candidates).unwrap().id, "b");
    }

    #[test]
    fn test_deterministic_across_runs() {
        let candidates = vec![item_aged("x", 1, 0), item_aged("y", 1, 0), item_aged("z", 1, 0)];
        let first = most_discussed_index(&candidates);
        for _ in 0..10 {
            assert_eq!(most_discussed_index(&candidates), first);
        }
        assert_eq!(first, Some(0));
    }

    #[test]
    fn test_empty_input_selects_nothing() {
        assert_eq!(most_discussed_index(&[]), None);
        assert!(select_most_discussed(Vec::new()).is_none());
    }
}
