use alloc::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    any::{Instance, TypeInfo},
    cache::{Cache, SharedCache},
    callback::LifecycleContext,
    context::{Context, ContextArg},
    errors::ConfigurationErrorKind,
    registry::Registry,
    resolver::Resolver,
    unit::{CacheScope, Unit},
    utils::merge::Merge as _,
};

/// Composition root.
///
/// Owns the registry and the container cache, every resolver opened from it shares that cache.
/// Units should be registered before resolvers are opened, an opened resolver keeps the registry it was opened with.
#[derive(Default)]
pub struct Container {
    registry: Arc<Registry>,
    cache: SharedCache,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            cache: Arc::new(Mutex::new(Cache::new())),
        }
    }

    /// Creates a container from the units of the registry
    ///
    /// # Errors
    /// Returns [`ConfigurationErrorKind::CallbackForUncached`] if a callback isn't attached to a session cached dependency
    pub fn with_registry(mut registry: Registry) -> Result<Self, ConfigurationErrorKind> {
        registry.align_callbacks();
        registry.check_integrity().inspect_err(|err| error!("{}", err))?;

        Ok(Self {
            registry: Arc::new(registry),
            cache: Arc::new(Mutex::new(Cache::new())),
        })
    }

    /// Registers the unit, replacing the one with the same contract and kind.
    ///
    /// A callback takes the cache scope of its dependency.
    ///
    /// # Errors
    /// Returns [`ConfigurationErrorKind::CallbackForUncached`] if
    /// - a callback is registered for a dependency that isn't registered or isn't session cached
    /// - a dependency with callbacks is replaced by a dependency that isn't session cached
    ///
    /// Static values are never cached, whatever their cache scope.
    pub fn register(&mut self, mut unit: Unit) -> Result<&mut Self, ConfigurationErrorKind> {
        let contract = unit.contract();

        match unit.execution_trigger() {
            Some(trigger) => {
                let cache_scope = self.registry.get_dependency(contract).map(Unit::effective_cache_scope);
                if cache_scope != Some(CacheScope::Session) {
                    let err = ConfigurationErrorKind::CallbackForUncached { contract, cache_scope };
                    error!("{}", err);
                    return Err(err);
                }
                unit.set_cache_scope(CacheScope::Session);
                debug!(%contract, %trigger, "Callback registered");
            }
            None => {
                let cache_scope = unit.effective_cache_scope();
                let has_callbacks = self
                    .registry
                    .iter()
                    .any(|registered| registered.contract() == contract && registered.execution_trigger().is_some());
                if has_callbacks && cache_scope != CacheScope::Session {
                    let err = ConfigurationErrorKind::CallbackForUncached {
                        contract,
                        cache_scope: Some(cache_scope),
                    };
                    error!("{}", err);
                    return Err(err);
                }
                debug!(%contract, %cache_scope, kind = ?unit.implementation_kind(), "Registered");
            }
        }

        Arc::make_mut(&mut self.registry).put(unit);
        Ok(self)
    }

    /// Merges units of the other container into this one, units of `other` win on conflict.
    /// The cache of `other` isn't merged.
    ///
    /// # Errors
    /// Returns [`ConfigurationErrorKind::CallbackForUncached`] if the merged units break callback rules.
    /// This container is left unchanged in that case.
    pub fn merge(&mut self, other: Container) -> Result<&mut Self, ConfigurationErrorKind> {
        let mut registry = Registry::clone(&self.registry).merge(Arc::unwrap_or_clone(other.registry));
        registry.align_callbacks();
        registry.check_integrity().inspect_err(|err| error!("{}", err))?;

        debug!(units = registry.len(), "Merged");
        self.registry = Arc::new(registry);
        Ok(self)
    }

    /// Opens a resolver with the context built from the arguments.
    ///
    /// Mappings are merged into the context by key, values are keyed by their own type.
    /// Later arguments win on conflict.
    ///
    /// # Errors
    /// Returns [`ConfigurationErrorKind::SequenceContext`] if any of the arguments is a sequence
    pub fn get_resolver<I>(&self, args: I) -> Result<Resolver, ConfigurationErrorKind>
    where
        I: IntoIterator<Item = ContextArg>,
    {
        let mut context = Context::new();
        for arg in args {
            match arg {
                ContextArg::Mapping(mapping) => context.extend(mapping),
                ContextArg::Value(contract, value) => {
                    context.insert_for(contract, value);
                }
                ContextArg::Sequence(_) => {
                    let err = ConfigurationErrorKind::SequenceContext;
                    error!("{}", err);
                    return Err(err);
                }
            }
        }

        Ok(Resolver::new(self.registry.clone(), self.cache.clone(), context))
    }

    /// Opens a resolver without context
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.registry.clone(), self.cache.clone(), Context::new())
    }

    #[inline]
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.registry.iter()
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Instance of the contract cached in the container
    #[inline]
    #[must_use]
    pub fn cached(&self, contract: TypeInfo) -> Option<Instance> {
        self.cache.lock().get(&contract)
    }

    /// Container level shutdown. Callbacks are dispatched when a resolver is closed, so nothing is called here.
    #[inline]
    pub fn shutdown(&self, context: &LifecycleContext) {
        debug!(failure = context.is_failure(), "Container shutdown");
    }
}
