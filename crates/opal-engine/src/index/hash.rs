//! Chained hash index for equality probes.

use super::AccessMethod;
use crate::value::Value;

/// Fallback bucket count when a caller passes zero.
const DEFAULT_BUCKETS: usize = 64;

/// An open-chained hash table from key values to row positions.
///
/// The bucket count is fixed at build time; collisions chain within
/// the bucket and are resolved by walking the chain with value
/// equality.
#[derive(Debug)]
pub struct HashIndex {
    /// `buckets[h]` is the chain of `(key, position)` pairs hashing
    /// to `h`.
    buckets: Vec<Vec<(Value, usize)>>,
}

impl HashIndex {
    /// Creates an empty index with the given bucket count.
    #[must_use]
    pub fn new(bucket_count: usize) -> Self {
        let n = if bucket_count == 0 {
            DEFAULT_BUCKETS
        } else {
            bucket_count
        };
        Self {
            buckets: vec![Vec::new(); n],
        }
    }

    /// The fixed bucket count.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, key: &Value) -> usize {
        key.bucket_hash(self.buckets.len())
    }

    /// True when `a` and `b` are the same key. NULL keys chain
    /// together even though they never match an equality probe.
    fn same_key(a: &Value, b: &Value) -> bool {
        (a.is_null() && b.is_null()) || a.sql_eq(b) == Some(true)
    }
}

impl AccessMethod for HashIndex {
    fn insert(&mut self, key: Value, position: usize) {
        let bucket = self.bucket_of(&key);
        self.buckets[bucket].push((key, position));
    }

    fn remove(&mut self, key: &Value, position: usize) {
        let bucket = self.bucket_of(key);
        self.buckets[bucket].retain(|(k, p)| !(*p == position && Self::same_key(k, key)));
    }

    fn find_equal(&self, key: &Value) -> Vec<usize> {
        if key.is_null() {
            return Vec::new();
        }
        let bucket = self.bucket_of(key);
        let mut positions: Vec<usize> = self.buckets[bucket]
            .iter()
            .filter(|(k, _)| k.sql_eq(key) == Some(true))
            .map(|(_, p)| *p)
            .collect();
        positions.sort_unstable();
        positions
    }

    fn find_range(&self, min: Option<&Value>, max: Option<&Value>) -> Vec<usize> {
        // A hash table has no key order; answer range probes by
        // filtering every chain. The planner never picks this path.
        let mut positions: Vec<usize> = self
            .buckets
            .iter()
            .flatten()
            .filter(|(k, _)| super::in_bounds(k, min, max))
            .map(|(_, p)| *p)
            .collect();
        positions.sort_unstable();
        positions
    }

    fn key_count(&self) -> usize {
        let mut distinct = 0usize;
        for bucket in &self.buckets {
            for (i, (key, _)) in bucket.iter().enumerate() {
                if !bucket[..i].iter().any(|(k, _)| Self::same_key(k, key)) {
                    distinct += 1;
                }
            }
        }
        distinct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashIndex {
        let mut index = HashIndex::new(8);
        index.insert(Value::Int(1), 0);
        index.insert(Value::Int(2), 1);
        index.insert(Value::Int(1), 2);
        index.insert(Value::Null, 3);
        index
    }

    #[test]
    fn test_probe_collects_all_positions() {
        let index = sample();
        assert_eq!(index.find_equal(&Value::Int(1)), vec![0, 2]);
        assert_eq!(index.find_equal(&Value::Int(2)), vec![1]);
        assert_eq!(index.find_equal(&Value::Int(9)), Vec::<usize>::new());
    }

    #[test]
    fn test_null_probe_matches_nothing() {
        let index = sample();
        assert_eq!(index.find_equal(&Value::Null), Vec::<usize>::new());
    }

    #[test]
    fn test_remove() {
        let mut index = sample();
        index.remove(&Value::Int(1), 0);
        assert_eq!(index.find_equal(&Value::Int(1)), vec![2]);
        // Removing an unknown pair is a no-op.
        index.remove(&Value::Int(7), 9);
        assert_eq!(index.find_equal(&Value::Int(2)), vec![1]);
    }

    #[test]
    fn test_key_count_counts_distinct_keys() {
        let index = sample();
        // 1, 2, and the NULL chain.
        assert_eq!(index.key_count(), 3);
    }

    #[test]
    fn test_collisions_resolve_by_equality() {
        // One bucket forces every key into the same chain.
        let mut index = HashIndex::new(1);
        index.insert(Value::Str("a".into()), 0);
        index.insert(Value::Str("b".into()), 1);
        index.insert(Value::Str("a".into()), 2);
        assert_eq!(index.find_equal(&Value::Str("a".into())), vec![0, 2]);
        assert_eq!(index.find_equal(&Value::Str("b".into())), vec![1]);
    }

    #[test]
    fn test_range_filter_fallback() {
        let index = sample();
        assert_eq!(
            index.find_range(Some(&Value::Int(1)), Some(&Value::Int(2))),
            vec![0, 1, 2]
        );
        assert_eq!(index.find_range(Some(&Value::Int(2)), None), vec![1]);
    }
}
