//! In-memory deduplication guard over sequence numbers dispatched in
//! the current run. Purely an optimization — authoritative
//! deduplication lives in the destination contract, which rejects any
//! already-used sequence, so this set needs no persistence.

use std::collections::HashSet;

use ethers::types::U256;

#[derive(Default)]
pub struct ProcessedSet {
    seen: HashSet<U256>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, sequence: U256) -> bool {
        self.seen.contains(&sequence)
    }

    pub fn insert(&mut self, sequence: U256) {
        self.seen.insert(sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_set_contains_nothing() {
        let set = ProcessedSet::new();
        assert!(!set.contains(U256::from(1u64)));
    }

    #[test]
    fn insert_then_contains() {
        let mut set = ProcessedSet::new();
        set.insert(U256::from(7u64));
        assert!(set.contains(U256::from(7u64)));
        assert!(!set.contains(U256::from(8u64)));
    }
}
