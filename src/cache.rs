use alloc::sync::Arc;
use parking_lot::Mutex;

use crate::any::{self, Instance, TypeInfo};

/// Resolved instances of one cache tier
#[derive(Clone, Default)]
pub(crate) struct Cache {
    map: any::Map,
}

/// Container tier, shared by every resolver opened from one container
pub(crate) type SharedCache = Arc<Mutex<Cache>>;

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self { map: any::Map::new() }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, contract: &TypeInfo) -> Option<Instance> {
        self.map.get(contract).cloned()
    }

    /// Stores the instance unless the contract is already cached.
    /// Returns the instance kept in the cache.
    #[inline]
    pub(crate) fn get_or_insert(&mut self, contract: TypeInfo, instance: Instance) -> Instance {
        self.map.entry(contract).or_insert(instance).clone()
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;
    use crate::any::{Instance, TypeInfo};

    use alloc::sync::Arc;

    struct Engine;

    #[test]
    fn test_first_writer_wins() {
        let mut cache = Cache::new();
        let first: Instance = Arc::new(Engine);
        let second: Instance = Arc::new(Engine);

        let kept = cache.get_or_insert(TypeInfo::of::<Engine>(), first.clone());
        assert!(Arc::ptr_eq(&kept, &first));

        let kept = cache.get_or_insert(TypeInfo::of::<Engine>(), second);
        assert!(Arc::ptr_eq(&kept, &first));
        assert!(Arc::ptr_eq(&cache.get(&TypeInfo::of::<Engine>()).unwrap(), &first));
        assert_eq!(cache.len(), 1);
    }
}
