use alloc::{borrow::Cow, collections::BTreeMap, sync::Arc, vec::Vec};
use core::fmt;

use crate::any::{self, Instance, TypeInfo};

/// Values that take precedence over caches and registered units.
///
/// An entry is keyed either by a contract or by a parameter name.
/// Contract entries are matched on every resolution, name entries only when a parameter with that name is resolved.
#[derive(Clone, Default)]
pub struct Context {
    contracts: any::Map,
    names: BTreeMap<Cow<'static, str>, Instance>,
}

impl Context {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            contracts: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// Inserts the value keyed by its own type
    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<Instance> {
        self.insert_rc(Arc::new(value))
    }

    #[inline]
    pub fn insert_rc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> Option<Instance> {
        self.contracts.insert(TypeInfo::of::<T>(), value)
    }

    /// Inserts the value for another contract, like a trait object implemented by the value
    #[inline]
    pub fn insert_for(&mut self, contract: TypeInfo, value: Instance) -> Option<Instance> {
        self.contracts.insert(contract, value)
    }

    #[inline]
    pub fn insert_named(&mut self, name: impl Into<Cow<'static, str>>, value: Instance) -> Option<Instance> {
        self.names.insert(name.into(), value)
    }

    #[inline]
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_named(mut self, name: impl Into<Cow<'static, str>>, value: Instance) -> Self {
        self.insert_named(name, value);
        self
    }

    #[inline]
    #[must_use]
    pub fn get_contract(&self, contract: &TypeInfo) -> Option<&Instance> {
        self.contracts.get(contract)
    }

    #[inline]
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Instance> {
        self.names.get(name)
    }

    /// Moves entries of `other` into this context, entries of `other` win on conflict
    #[inline]
    pub fn extend(&mut self, other: Context) {
        self.contracts.extend(other.contracts);
        self.names.extend(other.names);
    }

    /// Moves entries of `other` that aren't in this context yet
    pub fn extend_missing(&mut self, other: Context) {
        for (contract, value) in other.contracts {
            self.contracts.entry(contract).or_insert(value);
        }
        for (name, value) in other.names {
            self.names.entry(name).or_insert(value);
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty() && self.names.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .field("names", &self.names.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Argument used to build the context of a resolver
#[derive(Clone)]
pub enum ContextArg {
    /// Merged into the context entry by entry
    Mapping(Context),
    /// Keyed by the contract
    Value(TypeInfo, Instance),
    /// Not supported, rejected when a resolver is created
    Sequence(Vec<ContextArg>),
}

impl ContextArg {
    #[inline]
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(TypeInfo::of::<T>(), Arc::new(value))
    }
}

impl From<Context> for ContextArg {
    #[inline]
    fn from(context: Context) -> Self {
        Self::Mapping(context)
    }
}

impl From<Vec<ContextArg>> for ContextArg {
    #[inline]
    fn from(args: Vec<ContextArg>) -> Self {
        Self::Sequence(args)
    }
}

impl fmt::Debug for ContextArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapping(context) => f.debug_tuple("Mapping").field(context).finish(),
            Self::Value(contract, _) => f.debug_tuple("Value").field(contract).finish(),
            Self::Sequence(args) => f.debug_tuple("Sequence").field(args).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, ContextArg};
    use crate::any::{Instance, TypeInfo};

    use alloc::{sync::Arc, vec};

    trait Storage: Send + Sync {}

    struct Memory;

    impl Storage for Memory {}

    #[test]
    fn test_keys() {
        let memory: Instance = Arc::new(Memory);
        let mut context = Context::new().with(5u8).with_named("user_id", Arc::new(10u32));
        context.insert_for(TypeInfo::of::<dyn Storage>(), memory.clone());

        assert!(context.get_contract(&TypeInfo::of::<u8>()).is_some());
        assert!(context.get_contract(&TypeInfo::of::<u32>()).is_none());
        assert!(context.get_named("user_id").is_some());
        assert!(Arc::ptr_eq(
            context.get_contract(&TypeInfo::of::<dyn Storage>()).unwrap(),
            &memory
        ));
    }

    #[test]
    fn test_extend_later_wins() {
        let mut context = Context::new().with(1u8);
        context.extend(Context::new().with(2u8).with_named("name", Arc::new("pg")));

        let value = context.get_contract(&TypeInfo::of::<u8>()).unwrap().clone();
        assert_eq!(*value.downcast::<u8>().unwrap(), 2);
        assert!(context.get_named("name").is_some());
        assert!(!context.is_empty());
        assert!(Context::new().is_empty());

        context.extend_missing(Context::new().with(3u8).with(4u16));
        let value = context.get_contract(&TypeInfo::of::<u8>()).unwrap().clone();
        assert_eq!(*value.downcast::<u8>().unwrap(), 2);
        assert!(context.get_contract(&TypeInfo::of::<u16>()).is_some());
    }

    #[test]
    fn test_context_arg() {
        assert!(matches!(ContextArg::value(1u8), ContextArg::Value(contract, _) if contract == TypeInfo::of::<u8>()));
        assert!(matches!(ContextArg::from(Context::new()), ContextArg::Mapping(_)));
        assert!(matches!(
            ContextArg::from(vec![ContextArg::value(1u8)]),
            ContextArg::Sequence(args) if args.len() == 1
        ));
    }
}
