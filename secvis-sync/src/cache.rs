//! Id-indexed cache of bulk-loaded objects.
//!
//! Populated during the bulk-load phase and only read during the join. A
//! lookup that finds nothing is a normal outcome: referenced objects may have
//! been garbage-collected or never populated.

use secvis_types::{ObjectKind, Record};
use std::collections::HashMap;

/// Objects of one run, keyed by kind and id.
#[derive(Debug, Default, Clone)]
pub struct ObjectCache {
    objects: HashMap<ObjectKind, HashMap<String, Record>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record under its own id. A later record with the same id
    /// replaces the earlier one, which is returned.
    pub fn insert(&mut self, kind: ObjectKind, record: Record) -> Option<Record> {
        self.objects
            .entry(kind)
            .or_default()
            .insert(record.id().to_string(), record)
    }

    pub fn extend(&mut self, kind: ObjectKind, records: impl IntoIterator<Item = Record>) {
        let bucket = self.objects.entry(kind).or_default();
        for record in records {
            bucket.insert(record.id().to_string(), record);
        }
    }

    pub fn get(&self, kind: ObjectKind, id: &str) -> Option<&Record> {
        self.objects.get(&kind).and_then(|bucket| bucket.get(id))
    }

    /// Resolves an optional reference.
    pub fn lookup(&self, kind: ObjectKind, id: Option<&str>) -> Option<&Record> {
        id.and_then(|id| self.get(kind, id))
    }

    pub fn contains(&self, kind: ObjectKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Number of cached objects of one kind.
    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.get(&kind).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
