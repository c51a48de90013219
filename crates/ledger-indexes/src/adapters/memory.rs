use crate::ports::outbound::{BatchOperation, IndexStore, StoreError, WriteBatch, COLUMN_FAMILIES};
use parking_lot::RwLock;
use std::collections::HashMap;

type ColumnFamily = HashMap<Vec<u8>, Vec<u8>>;

/// In-memory key-value store with column families.
///
/// A batch is checked against the known column families before anything is
/// applied, then applied under a single write lock, so readers observe all
/// of it or none of it.
pub struct InMemoryIndexStore {
    families: RwLock<HashMap<&'static str, ColumnFamily>>,
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::with_column_families(COLUMN_FAMILIES)
    }
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_families(names: &[&'static str]) -> Self {
        let families = names.iter().map(|name| (*name, ColumnFamily::new())).collect();
        Self {
            families: RwLock::new(families),
        }
    }

    /// Number of keys in `cf` (0 for an unknown family).
    pub fn len_cf(&self, cf: &str) -> usize {
        self.families.read().get(cf).map_or(0, HashMap::len)
    }

    /// All pairs in `cf` whose key starts with `prefix`, sorted by key.
    pub fn prefix_scan_cf(&self, cf: &str, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let families = self.families.read();
        let mut results: Vec<_> = families
            .get(cf)
            .into_iter()
            .flat_map(|family| family.iter())
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        results.sort();
        results
    }
}

impl IndexStore for InMemoryIndexStore {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let families = self.families.read();
        let family = families
            .get(cf)
            .ok_or_else(|| StoreError::UnknownColumnFamily { name: cf.to_string() })?;
        Ok(family.get(key).cloned())
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut families = self.families.write();

        if let Some(op) = batch.operations().iter().find(|op| !families.contains_key(op.cf())) {
            return Err(StoreError::UnknownColumnFamily {
                name: op.cf().to_string(),
            });
        }

        for op in batch.into_operations() {
            match op {
                BatchOperation::Put { cf, key, value } => {
                    if let Some(family) = families.get_mut(cf) {
                        family.insert(key, value);
                    }
                }
                BatchOperation::Delete { cf, key } => {
                    if let Some(family) = families.get_mut(cf) {
                        family.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }
}
