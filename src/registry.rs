use alloc::{collections::BTreeMap, vec::Vec};

use crate::{
    any::TypeInfo,
    errors::ConfigurationErrorKind,
    unit::{CacheScope, Trigger, Unit, UnitKey, UnitKind},
    utils::merge::Merge,
};

/// Units keyed by contract and kind, kept in registration order
#[derive(Clone, Default)]
pub struct Registry {
    units: Vec<Unit>,
    index: BTreeMap<UnitKey, usize>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            units: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Puts the unit, replacing the one with the same key.
    /// A replaced unit keeps its registration position.
    pub fn put(&mut self, unit: Unit) -> Option<Unit> {
        let key = unit.key();
        match self.index.get(&key) {
            Some(&position) => Some(core::mem::replace(&mut self.units[position], unit)),
            None => {
                self.index.insert(key, self.units.len());
                self.units.push(unit);
                None
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &UnitKey) -> Option<&Unit> {
        self.index.get(key).map(|&position| &self.units[position])
    }

    #[inline]
    #[must_use]
    pub fn get_dependency(&self, contract: TypeInfo) -> Option<&Unit> {
        self.get(&UnitKey::dependency(contract))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Callbacks of the trigger in registration order
    #[inline]
    pub fn callbacks(&self, trigger: Trigger) -> impl Iterator<Item = &Unit> {
        self.units
            .iter()
            .filter(move |unit| unit.kind() == UnitKind::Callback(trigger))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copies the cache scope of each dependency into its callbacks
    pub(crate) fn align_callbacks(&mut self) {
        for position in 0..self.units.len() {
            let unit = &self.units[position];
            if unit.execution_trigger().is_none() {
                continue;
            }
            if let Some(cache_scope) = self.get_dependency(unit.contract()).map(Unit::cache_scope) {
                self.units[position].set_cache_scope(cache_scope);
            }
        }
    }

    /// Checks that every callback is attached to a session cached dependency.
    /// Static values are never cached, callbacks can't be attached to them.
    ///
    /// # Errors
    /// Returns [`ConfigurationErrorKind::CallbackForUncached`] for the first callback that isn't
    pub fn check_integrity(&self) -> Result<(), ConfigurationErrorKind> {
        for unit in self.units.iter().filter(|unit| unit.execution_trigger().is_some()) {
            let cache_scope = self.get_dependency(unit.contract()).map(Unit::effective_cache_scope);
            if cache_scope != Some(CacheScope::Session) {
                return Err(ConfigurationErrorKind::CallbackForUncached {
                    contract: unit.contract(),
                    cache_scope,
                });
            }
        }
        Ok(())
    }
}

impl Merge<Registry> for Registry {
    type Output = Registry;

    #[inline]
    fn merge(self, other: Registry) -> Self::Output {
        other.units.into_iter().fold(self, Merge::merge)
    }
}

impl Merge<Unit> for Registry {
    type Output = Registry;

    #[inline]
    fn merge(mut self, unit: Unit) -> Self::Output {
        self.put(unit);
        self
    }
}

impl Extend<Unit> for Registry {
    fn extend<I: IntoIterator<Item = Unit>>(&mut self, iter: I) {
        for unit in iter {
            self.put(unit);
        }
    }
}

impl FromIterator<Unit> for Registry {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.units.iter()).finish()
    }
}
