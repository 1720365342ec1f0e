use alloc::sync::Arc;
use core::{
    fmt::{self, Display, Formatter},
    future::Future,
};

use crate::{
    any::{Instance, TypeInfo},
    callback::{boxed_async_callback, boxed_callback, BoxedCloneAsyncCallback, BoxedCloneCallback, LifecycleContext},
    errors::{CallbackErrorKind, InstantiateErrorKind},
    instantiator::{boxed_async_instantiator, boxed_instantiator, BoxedCloneAsyncInstantiator, BoxedCloneInstantiator},
    signature::{Arguments, Signature},
};

/// Lifecycle event a callback is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger {
    Startup,
    Shutdown,
}

impl Trigger {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Shutdown => "shutdown",
        }
    }
}

impl Display for Trigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cache tier a resolved instance is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum CacheScope {
    /// Never cached, built on every resolution
    #[default]
    Transient,
    /// Cached for the lifetime of one resolver
    Session,
    /// Cached for the lifetime of the container, shared by all its resolvers
    Container,
}

impl CacheScope {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            CacheScope::Transient => "transient",
            CacheScope::Session => "session",
            CacheScope::Container => "container",
        }
    }
}

impl Display for CacheScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitKind {
    Dependency,
    Callback(Trigger),
}

/// Registry key. A contract may have a dependency and a callback per trigger at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub contract: TypeInfo,
    pub kind: UnitKind,
}

impl UnitKey {
    #[inline]
    #[must_use]
    pub const fn dependency(contract: TypeInfo) -> Self {
        Self {
            contract,
            kind: UnitKind::Dependency,
        }
    }

    #[inline]
    #[must_use]
    pub const fn callback(contract: TypeInfo, trigger: Trigger) -> Self {
        Self {
            contract,
            kind: UnitKind::Callback(trigger),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    Static,
    Class,
    Callable,
    Callback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sync,
    Async,
}

#[derive(Clone)]
pub(crate) enum Invoker {
    Sync(BoxedCloneInstantiator),
    Async(BoxedCloneAsyncInstantiator),
}

#[derive(Clone)]
pub(crate) enum CallbackInvoker {
    Sync(BoxedCloneCallback),
    Async(BoxedCloneAsyncCallback),
}

#[derive(Clone)]
pub(crate) enum Implementation {
    Static(Instance),
    Class(BoxedCloneInstantiator),
    Callable(Invoker),
    Callback(CallbackInvoker),
}

/// Binding of a contract to the way its instance is produced, or to a lifecycle callback.
///
/// A unit is immutable once registered, re-registering the same key replaces it.
#[derive(Clone)]
pub struct Unit {
    key: UnitKey,
    pub(crate) implementation: Implementation,
    cache_scope: CacheScope,
    signature: Signature,
}

impl Unit {
    /// Binds the contract to a ready value. The value is returned as is and never cached.
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(contract: TypeInfo, value: T) -> Self {
        Self::from_instance(contract, Arc::new(value))
    }

    #[must_use]
    pub fn from_instance(contract: TypeInfo, instance: Instance) -> Self {
        Self {
            key: UnitKey::dependency(contract),
            implementation: Implementation::Static(instance),
            cache_scope: CacheScope::Transient,
            signature: Signature::new(),
        }
    }

    /// Binds the contract to a constructor, called with the resolved `constructor_signature`
    #[must_use]
    pub fn class<T, F>(contract: TypeInfo, constructor_signature: Signature, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(Arguments) -> Result<T, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            key: UnitKey::dependency(contract),
            implementation: Implementation::Class(boxed_instantiator(constructor)),
            cache_scope: CacheScope::Transient,
            signature: constructor_signature,
        }
    }

    /// Binds the contract to a factory function, called with the resolved `execution_signature`
    #[must_use]
    pub fn callable<T, F>(contract: TypeInfo, execution_signature: Signature, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(Arguments) -> Result<T, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            key: UnitKey::dependency(contract),
            implementation: Implementation::Callable(Invoker::Sync(boxed_instantiator(factory))),
            cache_scope: CacheScope::Transient,
            signature: execution_signature,
        }
    }

    #[must_use]
    pub fn callable_async<T, F, Fut>(contract: TypeInfo, execution_signature: Signature, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(Arguments) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, InstantiateErrorKind>> + Send + 'static,
    {
        Self {
            key: UnitKey::dependency(contract),
            implementation: Implementation::Callable(Invoker::Async(boxed_async_instantiator(factory))),
            cache_scope: CacheScope::Transient,
            signature: execution_signature,
        }
    }

    /// Attaches a callback to the instance of the contract.
    ///
    /// The cache scope is taken from the dependency when the unit is registered in a container.
    #[must_use]
    pub fn callback<T, F>(contract: TypeInfo, trigger: Trigger, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(Arc<T>, LifecycleContext) -> Result<(), CallbackErrorKind> + Clone + Send + Sync + 'static,
    {
        Self {
            key: UnitKey::callback(contract, trigger),
            implementation: Implementation::Callback(CallbackInvoker::Sync(boxed_callback::<T, F>(callback))),
            cache_scope: CacheScope::Transient,
            signature: Signature::new(),
        }
    }

    #[must_use]
    pub fn callback_async<T, F, Fut>(contract: TypeInfo, trigger: Trigger, callback: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnMut(Arc<T>, LifecycleContext) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CallbackErrorKind>> + Send + 'static,
    {
        Self {
            key: UnitKey::callback(contract, trigger),
            implementation: Implementation::Callback(CallbackInvoker::Async(boxed_async_callback::<T, F>(callback))),
            cache_scope: CacheScope::Transient,
            signature: Signature::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_cache_scope(mut self, cache_scope: CacheScope) -> Self {
        self.cache_scope = cache_scope;
        self
    }

    #[inline]
    pub(crate) fn set_cache_scope(&mut self, cache_scope: CacheScope) {
        self.cache_scope = cache_scope;
    }

    #[inline]
    #[must_use]
    pub const fn contract(&self) -> TypeInfo {
        self.key.contract
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> UnitKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.key.kind
    }

    #[must_use]
    pub const fn implementation_kind(&self) -> ImplementationKind {
        match self.implementation {
            Implementation::Static(_) => ImplementationKind::Static,
            Implementation::Class(_) => ImplementationKind::Class,
            Implementation::Callable(_) => ImplementationKind::Callable,
            Implementation::Callback(_) => ImplementationKind::Callback,
        }
    }

    #[must_use]
    pub const fn execution_mode(&self) -> ExecutionMode {
        match self.implementation {
            Implementation::Callable(Invoker::Async(_)) | Implementation::Callback(CallbackInvoker::Async(_)) => ExecutionMode::Async,
            _ => ExecutionMode::Sync,
        }
    }

    #[must_use]
    pub const fn execution_trigger(&self) -> Option<Trigger> {
        match self.key.kind {
            UnitKind::Dependency => None,
            UnitKind::Callback(trigger) => Some(trigger),
        }
    }

    #[inline]
    #[must_use]
    pub const fn cache_scope(&self) -> CacheScope {
        self.cache_scope
    }

    /// Scope the instance is really cached in. Static values are never cached, so they report [`CacheScope::Transient`].
    #[must_use]
    pub const fn effective_cache_scope(&self) -> CacheScope {
        match self.implementation {
            Implementation::Static(_) => CacheScope::Transient,
            _ => self.cache_scope,
        }
    }

    #[must_use]
    pub const fn constructor_signature(&self) -> Option<&Signature> {
        match self.implementation {
            Implementation::Class(_) => Some(&self.signature),
            _ => None,
        }
    }

    #[must_use]
    pub const fn execution_signature(&self) -> Option<&Signature> {
        match self.implementation {
            Implementation::Callable(_) => Some(&self.signature),
            _ => None,
        }
    }

    /// Parameters resolved before the implementation is called, empty for statics and callbacks
    #[inline]
    pub(crate) const fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("contract", &self.key.contract)
            .field("kind", &self.key.kind)
            .field("implementation_kind", &self.implementation_kind())
            .field("execution_mode", &self.execution_mode())
            .field("cache_scope", &self.cache_scope)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
