use std::collections::{HashSet, VecDeque};

/// Bounded set of already-handled message keys.
///
/// Once more than `high_water` keys are held, the oldest are dropped until
/// `low_water` remain. Insertion order is the eviction order.
#[derive(Debug)]
pub struct SeenSet {
    order: VecDeque<String>,
    keys: HashSet<String>,
    high_water: usize,
    low_water: usize,
}

impl SeenSet {
    pub const DEFAULT_HIGH_WATER: usize = 1000;
    pub const DEFAULT_LOW_WATER: usize = 500;

    pub fn new(high_water: usize, low_water: usize) -> Self {
        let low_water = low_water.min(high_water);
        Self {
            order: VecDeque::with_capacity(high_water + 1),
            keys: HashSet::with_capacity(high_water + 1),
            high_water,
            low_water,
        }
    }

    /// Record `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);

        if self.order.len() > self.high_water {
            while self.order.len() > self.low_water {
                if let Some(old) = self.order.pop_front() {
                    self.keys.remove(&old);
                }
            }
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HIGH_WATER, Self::DEFAULT_LOW_WATER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut seen = SeenSet::default();
        assert!(seen.insert("t1_m1"));
        assert!(!seen.insert("t1_m1"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn trims_to_newest_low_water_keys() {
        let mut seen = SeenSet::new(10, 5);
        for i in 0..11 {
            seen.insert(format!("k{i}"));
        }
        assert_eq!(seen.len(), 5);
        assert!(!seen.contains("k5"));
        assert!(seen.contains("k6"));
        assert!(seen.contains("k10"));
    }

    #[test]
    fn evicted_keys_can_be_seen_again() {
        let mut seen = SeenSet::new(2, 1);
        seen.insert("a");
        seen.insert("b");
        seen.insert("c");
        assert!(seen.insert("a"));
    }

    #[test]
    fn stays_bounded_under_load() {
        let mut seen = SeenSet::default();
        for i in 0..5000 {
            seen.insert(format!("k{i}"));
        }
        assert!(seen.len() <= SeenSet::DEFAULT_HIGH_WATER);
    }
}
