//! Process-lifetime set of models that reported themselves retired.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, append-only blacklist of model identifiers.
///
/// Cloning shares the underlying set. Construct one per process and pass it
/// into every pool that should honour it; tests build a fresh one per case.
#[derive(Debug, Clone, Default)]
pub struct UnavailableModelSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl UnavailableModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set holds plain strings; a panic mid-insert cannot corrupt it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, model: &str) -> bool {
        self.guard().contains(model)
    }

    /// Record `model`. Returns `true` if it was not already present.
    pub fn insert(&self, model: &str) -> bool {
        self.guard().insert(model.to_string())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Sorted copy of the current members.
    pub fn snapshot(&self) -> Vec<String> {
        let mut models: Vec<String> = self.guard().iter().cloned().collect();
        models.sort();
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let set = UnavailableModelSet::new();
        let other = set.clone();
        assert!(set.insert("gemini-old"));
        assert!(!other.insert("gemini-old"));
        assert!(other.contains("gemini-old"));
        assert_eq!(set.snapshot(), vec!["gemini-old".to_string()]);
    }

    #[test]
    fn fresh_sets_are_independent() {
        let a = UnavailableModelSet::new();
        a.insert("m");
        assert!(UnavailableModelSet::new().is_empty());
        assert_eq!(a.len(), 1);
    }
}
