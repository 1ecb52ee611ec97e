//! The indexing subsystem: hash and B-tree access methods behind one
//! seam.
//!
//! Indexes map a key [`Value`] to the positions of the rows currently
//! holding that value. They are maintained synchronously by every
//! INSERT, UPDATE, and DELETE touching the indexed column; the planner
//! depends only on the [`AccessMethod`] interface.

mod btree;
mod hash;

use core::cmp::Ordering;
use core::fmt;

pub use btree::BTreeIndex;
pub use hash::HashIndex;

use crate::config::IndexKind;
use crate::row::Row;
use crate::value::Value;

/// Total ordering over index keys.
///
/// NULL sorts before everything; values of one type order as
/// [`Value::compare`]; a cross-type pair that does not promote falls
/// back to the type name so the ordering stays total.
#[must_use]
pub fn key_cmp(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a
            .compare(b)
            .unwrap_or_else(|| a.type_name().cmp(b.type_name())),
    }
}

/// The operations an index structure must provide.
///
/// `find_equal` and `find_range` return row positions sorted
/// ascending, so candidate sets are deterministic regardless of the
/// structure's internal order.
pub trait AccessMethod: fmt::Debug {
    /// Registers `position` under `key`.
    fn insert(&mut self, key: Value, position: usize);

    /// Unregisters `position` from `key`. Unknown pairs are ignored.
    fn remove(&mut self, key: &Value, position: usize);

    /// Positions of rows whose key equals `key`.
    ///
    /// A NULL probe matches nothing: `x = NULL` is never true.
    fn find_equal(&self, key: &Value) -> Vec<usize>;

    /// Positions of rows whose key lies in `[min, max]`, both bounds
    /// inclusive and optional.
    fn find_range(&self, min: Option<&Value>, max: Option<&Value>) -> Vec<usize>;

    /// The number of distinct keys currently holding entries.
    fn key_count(&self) -> usize;
}

/// True when `key` lies within the inclusive bounds.
fn in_bounds(key: &Value, min: Option<&Value>, max: Option<&Value>) -> bool {
    if key.is_null() {
        return false;
    }
    if let Some(lo) = min {
        if key.compare(lo).is_none_or(Ordering::is_lt) {
            return false;
        }
    }
    if let Some(hi) = max {
        if key.compare(hi).is_none_or(Ordering::is_gt) {
            return false;
        }
    }
    true
}

/// A named index over one column of one table.
#[derive(Debug)]
pub struct Index {
    /// Globally-unique index name.
    pub name: String,
    /// The indexed table.
    pub table: String,
    /// The indexed column.
    pub column: String,
    payload: Payload,
}

#[derive(Debug)]
enum Payload {
    Hash(HashIndex),
    Btree(BTreeIndex),
}

impl Index {
    /// Creates an empty index of the given kind.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
        kind: IndexKind,
        btree_order: usize,
        hash_buckets: usize,
    ) -> Self {
        let payload = match kind {
            IndexKind::Hash => Payload::Hash(HashIndex::new(hash_buckets)),
            IndexKind::Btree => Payload::Btree(BTreeIndex::new(btree_order)),
        };
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
            payload,
        }
    }

    /// The index kind.
    #[must_use]
    pub const fn kind(&self) -> IndexKind {
        match self.payload {
            Payload::Hash(_) => IndexKind::Hash,
            Payload::Btree(_) => IndexKind::Btree,
        }
    }

    /// True when the structure answers range probes in key order.
    #[must_use]
    pub const fn supports_range(&self) -> bool {
        matches!(self.payload, Payload::Btree(_))
    }

    /// The access-method view of the payload.
    #[must_use]
    pub fn access(&self) -> &dyn AccessMethod {
        match &self.payload {
            Payload::Hash(h) => h,
            Payload::Btree(b) => b,
        }
    }

    fn access_mut(&mut self) -> &mut dyn AccessMethod {
        match &mut self.payload {
            Payload::Hash(h) => h,
            Payload::Btree(b) => b,
        }
    }

    /// Registers a row's key.
    pub fn insert(&mut self, key: Value, position: usize) {
        self.access_mut().insert(key, position);
    }

    /// Unregisters a row's key.
    pub fn remove(&mut self, key: &Value, position: usize) {
        self.access_mut().remove(key, position);
    }

    /// Rebuilds the index from a full table scan.
    ///
    /// `column_index` is the indexed column's position in the schema.
    /// Every live row gets exactly one entry, NULL keys included, so
    /// the index stays consistent with the table after position
    /// compaction.
    pub fn build_from_scan(&mut self, rows: &[Row], column_index: usize) {
        let kind = self.kind();
        self.payload = match kind {
            IndexKind::Hash => {
                let buckets = match &self.payload {
                    Payload::Hash(h) => h.bucket_count(),
                    Payload::Btree(_) => 0,
                };
                Payload::Hash(HashIndex::new(buckets))
            }
            IndexKind::Btree => {
                let order = match &self.payload {
                    Payload::Btree(b) => b.order(),
                    Payload::Hash(_) => 0,
                };
                Payload::Btree(BTreeIndex::new(order))
            }
        };
        for (position, row) in rows.iter().enumerate() {
            let key = row.get(column_index).cloned().unwrap_or(Value::Null);
            self.insert(key, position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_cmp_null_first() {
        assert_eq!(key_cmp(&Value::Null, &Value::Int(1)), Ordering::Less);
        assert_eq!(key_cmp(&Value::Null, &Value::Null), Ordering::Equal);
        assert_eq!(key_cmp(&Value::Int(2), &Value::Int(1)), Ordering::Greater);
    }

    #[test]
    fn test_index_kind_and_range_support() {
        let hash = Index::new("ih", "t", "c", IndexKind::Hash, 4, 16);
        let btree = Index::new("ib", "t", "c", IndexKind::Btree, 4, 16);
        assert_eq!(hash.kind(), IndexKind::Hash);
        assert!(!hash.supports_range());
        assert!(btree.supports_range());
    }

    #[test]
    fn test_build_from_scan_covers_every_row() {
        let rows = vec![
            Row::new(vec![Value::Int(3)]),
            Row::new(vec![Value::Null]),
            Row::new(vec![Value::Int(3)]),
        ];
        let mut index = Index::new("ix", "t", "c", IndexKind::Btree, 4, 16);
        index.build_from_scan(&rows, 0);
        assert_eq!(index.access().find_equal(&Value::Int(3)), vec![0, 2]);
        // NULL keys are stored but never match an equality probe.
        assert_eq!(index.access().find_equal(&Value::Null), Vec::<usize>::new());
    }
}
