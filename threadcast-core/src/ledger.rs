use crate::CoreError;
use std::collections::HashSet;

/// Set of item identifiers already selected for processing.
///
/// Identifiers are only ever added. Adding an identifier that is already
/// present is a no-op, so `add` may be called any number of times for the
/// same item.
pub trait DedupLedger {
    async fn contains(&self, item_id: &str) -> Result<bool, CoreError>;
    async fn add(&mut self, item_id: &str) -> Result<(), CoreError>;
}

/// Ledger that lives as long as the process. History is lost on restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    processed: HashSet<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

impl DedupLedger for MemoryLedger {
    async fn contains(&self, item_id: &str) -> Result<bool, CoreError> {
        Ok(self.processed.contains(item_id))
    }

    async fn add(&mut self, item_id: &str) -> Result<(), CoreError> {
        self.processed.insert(item_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_then_contains() {
        let mut ledger = MemoryLedger::new();
        assert!(!ledger.contains("abc123").await.unwrap());

        ledger.add("abc123").await.unwrap();
        assert!(ledger.contains("abc123").await.unwrap());
        assert!(!ledger.contains("def456").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let mut once = MemoryLedger::new();
        once.add("abc123").await.unwrap();

        let mut twice = MemoryLedger::new();
        twice.add("abc123").await.unwrap();
        twice.add("abc123").await.unwrap();

        assert_eq!(once.len(), twice.len());
        assert_eq!(twice.len(), 1);
        assert!(twice.contains("abc123").await.unwrap());
    }
}
