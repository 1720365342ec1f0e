use alloc::{boxed::Box, sync::Arc, vec::Vec};
use async_recursion::async_recursion;
use core::any::type_name;
use tracing::{debug, debug_span, error, Instrument as _};

use crate::{
    any::{Instance, TypeInfo},
    cache::{Cache, SharedCache},
    callback::LifecycleContext,
    context::Context,
    dispatcher::dispatch,
    errors::{CyclePath, DispatchErrorKind, ResolveErrorKind},
    registry::Registry,
    service::{AsyncService as _, Service as _},
    signature::{Arguments, Signature},
    unit::{CacheScope, Implementation, Invoker, Trigger, UnitKey},
};

/// Resolution session.
///
/// Owns the session cache and the session context, shares the container cache with the container it was opened from.
/// Session cached instances live until the resolver is closed or dropped.
pub struct Resolver {
    registry: Arc<Registry>,
    shared: SharedCache,
    cache: Cache,
    context: Context,
    stack: Vec<TypeInfo>,
}

impl Resolver {
    #[inline]
    #[must_use]
    pub(crate) const fn new(registry: Arc<Registry>, shared: SharedCache, context: Context) -> Self {
        Self {
            registry,
            shared,
            cache: Cache::new(),
            context,
            stack: Vec::new(),
        }
    }

    /// Resolves an instance of the contract.
    ///
    /// `context` overrides the session context for this call only.
    /// Returns `None` if the contract isn't registered and isn't provided by a context.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::AmbiguousUnion`] if a parameter type has more than one non-null variant
    /// - Returns [`ResolveErrorKind::CannotResolveParameters`] if a constructor or a callable failed
    /// - Returns [`ResolveErrorKind::CyclicDependency`] if the contract depends on itself
    #[inline]
    pub async fn resolve(&mut self, contract: TypeInfo, context: Option<&Context>) -> Result<Option<Instance>, ResolveErrorKind> {
        self.resolve_with_default(contract, None, context).await
    }

    /// Same as [`Resolver::resolve`], but returns `default` instead of `None`
    #[allow(clippy::missing_errors_doc)]
    pub async fn resolve_with_default(
        &mut self,
        contract: TypeInfo,
        default: Option<Instance>,
        context: Option<&Context>,
    ) -> Result<Option<Instance>, ResolveErrorKind> {
        self.stack.clear();
        self.resolve_inner(contract, default, context).await
    }

    /// Resolves the contract `T` and downcasts it to `T`
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub async fn get<T: Send + Sync + 'static>(&mut self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        self.get_as::<T, T>().await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn get_with_context<T: Send + Sync + 'static>(&mut self, context: &Context) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let contract = TypeInfo::of::<T>();
        match self.resolve(contract, Some(context)).await? {
            Some(instance) => downcast(contract, instance).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the contract `C` and downcasts the instance to its implementation `T`
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the instance isn't `T`
    pub async fn get_as<C: ?Sized + 'static, T: Send + Sync + 'static>(&mut self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let contract = TypeInfo::of::<C>();
        match self.resolve(contract, None).await? {
            Some(instance) => downcast(contract, instance).map(Some),
            None => Ok(None),
        }
    }

    /// Adds entries to the session context. Entries already in it are kept.
    ///
    /// Instances cached before the call aren't affected.
    #[inline]
    pub fn add_context(&mut self, context: Context) -> &mut Self {
        self.context.extend_missing(context);
        self
    }

    /// Instance of the contract cached in this session
    #[inline]
    #[must_use]
    pub fn cached(&self, contract: TypeInfo) -> Option<Instance> {
        self.cache.get(&contract)
    }

    /// Calls startup callbacks for instances already resolved in this session
    ///
    /// # Errors
    /// Returns [`DispatchErrorKind::Callback`] for the first failed callback, the rest aren't called
    pub async fn startup(&self) -> Result<(), DispatchErrorKind> {
        dispatch(&self.registry, &self.cache, Trigger::Startup, &LifecycleContext::success()).await
    }

    /// Closes the session, calling shutdown callbacks for resolved instances in registration order.
    ///
    /// The session cache is dropped even if a callback fails.
    ///
    /// # Errors
    /// Returns [`DispatchErrorKind::Callback`] for the first failed callback, the rest aren't called
    pub async fn close(self, context: LifecycleContext) -> Result<(), DispatchErrorKind> {
        let result = dispatch(&self.registry, &self.cache, Trigger::Shutdown, &context).await;
        debug!(failure = context.is_failure(), "Session closed");
        result
    }

    #[async_recursion]
    async fn resolve_inner<'a>(
        &'a mut self,
        contract: TypeInfo,
        default: Option<Instance>,
        context: Option<&'a Context>,
    ) -> Result<Option<Instance>, ResolveErrorKind> {
        let span = debug_span!("resolve", contract = contract.name);

        async move {
            let provided = context
                .and_then(|context| context.get_contract(&contract))
                .or_else(|| self.context.get_contract(&contract));
            if let Some(instance) = provided {
                debug!("Found in context");
                return Ok(Some(instance.clone()));
            }

            if let Some(instance) = self.cache.get(&contract) {
                debug!("Found in session cache");
                return Ok(Some(instance));
            }
            let shared = self.shared.lock().get(&contract);
            if let Some(instance) = shared {
                debug!("Found in container cache");
                return Ok(Some(instance));
            }
            debug!("Not found in cache");

            let registry = self.registry.clone();
            let Some(unit) = registry.get(&UnitKey::dependency(contract)) else {
                debug!("Not registered");
                return Ok(default);
            };

            if self.stack.contains(&contract) {
                let mut path = self.stack.clone();
                path.push(contract);

                let err = ResolveErrorKind::CyclicDependency(CyclePath(path.into_boxed_slice()));
                error!("{}", err);
                return Err(err);
            }

            let result = match &unit.implementation {
                Implementation::Static(instance) => {
                    debug!("Static value");
                    return Ok(Some(instance.clone()));
                }
                Implementation::Callback(_) => {
                    debug!("Callback unit can't provide an instance");
                    return Ok(default);
                }
                Implementation::Class(instantiator) | Implementation::Callable(Invoker::Sync(instantiator)) => {
                    let arguments = self.arguments(contract, unit.signature(), context).await?;
                    instantiator.clone().call(arguments)
                }
                Implementation::Callable(Invoker::Async(instantiator)) => {
                    let arguments = self.arguments(contract, unit.signature(), context).await?;
                    instantiator.clone().call(arguments).await
                }
            };
            let instance = match result {
                Ok(instance) => instance,
                Err(source) => {
                    let err = ResolveErrorKind::CannotResolveParameters { contract, source };
                    error!("{}", err);
                    return Err(err);
                }
            };

            let instance = match unit.cache_scope() {
                CacheScope::Transient => instance,
                CacheScope::Session => {
                    debug!("Cached in session");
                    self.cache.get_or_insert(contract, instance)
                }
                CacheScope::Container => {
                    debug!("Cached in container");
                    self.shared.lock().get_or_insert(contract, instance)
                }
            };
            Ok(Some(instance))
        }
        .instrument(span)
        .await
    }

    /// Resolves parameters of the signature in their declared order
    async fn arguments(&mut self, contract: TypeInfo, signature: &Signature, context: Option<&Context>) -> Result<Arguments, ResolveErrorKind> {
        self.stack.push(contract);
        let result = self.resolve_parameters(contract, signature, context).await;
        self.stack.pop();
        result
    }

    async fn resolve_parameters(
        &mut self,
        contract: TypeInfo,
        signature: &Signature,
        context: Option<&Context>,
    ) -> Result<Arguments, ResolveErrorKind> {
        let mut arguments = Arguments::new();

        for parameter in signature.iter().filter(|parameter| !parameter.is_variadic()) {
            let parameter_contract = match parameter.ty().unwrap_contract() {
                Ok(parameter_contract) => parameter_contract,
                Err(variants) => {
                    let err = ResolveErrorKind::AmbiguousUnion {
                        contract,
                        parameter: parameter.name.clone(),
                        variants: variants.into(),
                    };
                    error!("{}", err);
                    return Err(err);
                }
            };

            let value = match self.provided(parameter_contract, parameter.name(), context) {
                Some(value) => Some(value),
                None => {
                    self.resolve_inner(parameter_contract, parameter.default.clone(), context)
                        .await?
                }
            };
            arguments.insert(parameter.name.clone(), value);
        }

        Ok(arguments)
    }

    /// Looks for a parameter value in the call context, then in the session context.
    /// In each of them a contract entry wins over a name entry.
    fn provided(&self, contract: TypeInfo, name: &str, context: Option<&Context>) -> Option<Instance> {
        let lookup = |context: &Context| context.get_contract(&contract).or_else(|| context.get_named(name)).cloned();

        context.and_then(lookup).or_else(|| lookup(&self.context))
    }
}

fn downcast<T: Send + Sync + 'static>(contract: TypeInfo, instance: Instance) -> Result<Arc<T>, ResolveErrorKind> {
    instance.downcast::<T>().map_err(|instance| {
        let err = ResolveErrorKind::IncorrectType {
            contract,
            expected: type_name::<T>(),
            actual: (*instance).type_id(),
        };
        error!("{}", err);
        err
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Resolver;
    use crate::{
        any::{Instance, TypeInfo},
        cache::Cache,
        context::Context,
        errors::{InstantiateErrorKind, ResolveErrorKind},
        registry::Registry,
        signature::{Arguments, Parameter, Signature},
        unit::{CacheScope, Unit},
        Container,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
        vec::Vec,
    };
    use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct C;
    #[derive(Debug)]
    struct B(Arc<C>);
    #[derive(Debug)]
    struct A(Arc<B>);

    struct Config {
        dsn: &'static str,
    }

    fn resolver(units: impl IntoIterator<Item = Unit>) -> Resolver {
        Resolver::new(
            Arc::new(Registry::from_iter(units)),
            Arc::new(Mutex::new(Cache::new())),
            Context::new(),
        )
    }

    fn counted<T: Send + Sync + 'static>(
        counter: &Arc<AtomicU8>,
        signature: Signature,
        build: fn(&Arguments) -> Result<T, InstantiateErrorKind>,
    ) -> Unit {
        let counter = counter.clone();
        Unit::class(TypeInfo::of::<T>(), signature, move |arguments: Arguments| {
            counter.fetch_add(1, Ordering::SeqCst);
            build(&arguments)
        })
    }

    fn recorded<T: Send + Sync + 'static>(
        calls: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        signature: Signature,
        build: fn(&Arguments) -> Result<T, InstantiateErrorKind>,
    ) -> Unit {
        let calls = calls.clone();
        Unit::class(TypeInfo::of::<T>(), signature, move |arguments: Arguments| {
            calls.lock().push(name);
            build(&arguments)
        })
    }

    #[tokio::test]
    #[traced_test]
    async fn test_deep_resolution() {
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mut resolver = resolver([
            recorded(&calls, "A", Signature::new().parameter(Parameter::of::<B>("b")), |arguments| {
                Ok(A(arguments.get("b")?))
            })
            .with_cache_scope(CacheScope::Session),
            recorded(&calls, "B", Signature::new().parameter(Parameter::of::<C>("c")), |arguments| {
                Ok(B(arguments.get("c")?))
            })
            .with_cache_scope(CacheScope::Session),
            recorded(&calls, "C", Signature::new(), |_| Ok(C)).with_cache_scope(CacheScope::Session),
        ]);

        let a = resolver.get::<A>().await.unwrap().unwrap();
        assert_eq!(*calls.lock(), ["C", "B", "A"]);

        let b = resolver.get::<B>().await.unwrap().unwrap();
        let c = resolver.get::<C>().await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&a.0, &b));
        assert!(Arc::ptr_eq(&b.0, &c));
        assert_eq!(*calls.lock(), ["C", "B", "A"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_transient_rebuilt() {
        let c_count = Arc::new(AtomicU8::new(0));
        let mut resolver = resolver([counted(&c_count, Signature::new(), |_| Ok(C))]);

        let first = resolver.get::<C>().await.unwrap().unwrap();
        let second = resolver.get::<C>().await.unwrap().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(c_count.load(Ordering::SeqCst), 2);
        assert!(resolver.cached(TypeInfo::of::<C>()).is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_absence() {
        let mut resolver = resolver([]);

        assert!(resolver.get::<C>().await.unwrap().is_none());
        assert!(resolver.resolve(TypeInfo::of::<C>(), None).await.unwrap().is_none());

        let default: Instance = Arc::new(C);
        let resolved = resolver
            .resolve_with_default(TypeInfo::of::<C>(), Some(default.clone()), None)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&resolved, &default));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_session_context_precedence() {
        let c_count = Arc::new(AtomicU8::new(0));
        let provided = Arc::new(C);
        let mut context = Context::new();
        context.insert_rc(provided.clone());

        let mut resolver = Resolver::new(
            Arc::new(Registry::from_iter([
                counted(&c_count, Signature::new(), |_| Ok(C)).with_cache_scope(CacheScope::Container)
            ])),
            Arc::new(Mutex::new(Cache::new())),
            context,
        );

        let c = resolver.get::<C>().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&c, &provided));
        assert_eq!(c_count.load(Ordering::SeqCst), 0);
        assert!(resolver.cached(TypeInfo::of::<C>()).is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_parameter_precedence() {
        struct Connection(&'static str);

        let mut resolver = resolver([
            Unit::value(TypeInfo::of::<Config>(), Config { dsn: "registered" }),
            Unit::class(
                TypeInfo::of::<Connection>(),
                Signature::new().parameter(Parameter::of::<Config>("config")),
                |arguments: Arguments| Ok(Connection(arguments.get::<Config>("config")?.dsn)),
            ),
        ]);

        let connection = resolver.get::<Connection>().await.unwrap().unwrap();
        assert_eq!(connection.0, "registered");

        resolver.context.insert_named("config", Arc::new(Config { dsn: "session name" }));
        let connection = resolver.get::<Connection>().await.unwrap().unwrap();
        assert_eq!(connection.0, "session name");

        let call_context = Context::new().with_named("config", Arc::new(Config { dsn: "call name" }));
        let connection = resolver.get_with_context::<Connection>(&call_context).await.unwrap().unwrap();
        assert_eq!(connection.0, "call name");

        let call_context = call_context.with(Config { dsn: "call type" });
        let connection = resolver.get_with_context::<Connection>(&call_context).await.unwrap().unwrap();
        assert_eq!(connection.0, "call type");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_add_context_keeps_existing() {
        let mut resolver = resolver([]);
        resolver
            .add_context(Context::new().with(Config { dsn: "first" }))
            .add_context(Context::new().with(Config { dsn: "second" }).with(C));

        assert_eq!(resolver.get::<Config>().await.unwrap().unwrap().dsn, "first");
        assert!(resolver.get::<C>().await.unwrap().is_some());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_optional_and_default_parameters() {
        let mut resolver = resolver([Unit::class(
            TypeInfo::of::<B>(),
            Signature::new()
                .parameter(Parameter::optional::<C>("c").with_default(C))
                .parameter(Parameter::optional::<Config>("config"))
                .parameter(Parameter::variadic("rest")),
            |arguments: Arguments| {
                assert!(arguments.get_optional::<Config>("config")?.is_none());
                assert!(arguments.get_raw("rest").is_none());
                Ok(B(arguments.get("c")?))
            },
        )]);

        assert!(resolver.get::<B>().await.unwrap().is_some());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_ambiguous_union() {
        let mut resolver = resolver([Unit::class(
            TypeInfo::of::<B>(),
            Signature::new().parameter(Parameter::union("c", [TypeInfo::of::<C>(), TypeInfo::of::<Config>()])),
            |arguments: Arguments| Ok(B(arguments.get("c")?)),
        )]);

        assert!(matches!(
            resolver.get::<B>().await,
            Err(ResolveErrorKind::AmbiguousUnion { ref variants, .. }) if variants.len() == 2
        ));
        assert!(logs_contain("ambiguous"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_cannot_resolve_parameters() {
        let mut resolver = resolver([Unit::class(
            TypeInfo::of::<B>(),
            Signature::new().parameter(Parameter::of::<C>("c")),
            |arguments: Arguments| Ok(B(arguments.get("c")?)),
        )]);

        let err = resolver.get::<B>().await.unwrap_err();
        assert!(matches!(
            err,
            ResolveErrorKind::CannotResolveParameters {
                source: InstantiateErrorKind::MissingParameter { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_cyclic_dependency() {
        let mut resolver = resolver([
            Unit::class(
                TypeInfo::of::<A>(),
                Signature::new().parameter(Parameter::of::<B>("b")),
                |arguments: Arguments| Ok(A(arguments.get("b")?)),
            ),
            Unit::class(
                TypeInfo::of::<B>(),
                Signature::new().parameter(Parameter::of::<A>("a")),
                |_: Arguments| Ok(B(Arc::new(C))),
            ),
        ]);

        let Err(ResolveErrorKind::CyclicDependency(path)) = resolver.get::<A>().await else {
            panic!("Cycle must be detected");
        };
        assert_eq!(&*path.0, [TypeInfo::of::<A>(), TypeInfo::of::<B>(), TypeInfo::of::<A>()]);

        // Stack is reset between calls
        assert!(matches!(
            resolver.get::<B>().await,
            Err(ResolveErrorKind::CyclicDependency(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_async_callable_and_incorrect_type() {
        trait Storage: Send + Sync {}
        struct Memory;
        impl Storage for Memory {}

        let mut resolver = resolver([Unit::callable_async(
            TypeInfo::of::<dyn Storage>(),
            Signature::new(),
            |_: Arguments| async { Ok::<_, InstantiateErrorKind>(Memory) },
        )
        .with_cache_scope(CacheScope::Session)]);

        let memory = resolver.get_as::<dyn Storage, Memory>().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(
            &(memory as Instance),
            &resolver.cached(TypeInfo::of::<dyn Storage>()).unwrap()
        ));
        assert!(matches!(
            resolver.get_as::<dyn Storage, C>().await,
            Err(ResolveErrorKind::IncorrectType { .. })
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_constructor_not_cached() {
        let c_count = Arc::new(AtomicU8::new(0));
        let mut resolver = resolver([counted(&c_count, Signature::new(), |_| {
            Err::<C, _>(InstantiateErrorKind::Custom(anyhow::anyhow!("connection refused")))
        })
        .with_cache_scope(CacheScope::Session)]);

        assert!(matches!(
            resolver.get::<C>().await,
            Err(ResolveErrorKind::CannotResolveParameters { .. })
        ));
        assert!(resolver.cached(TypeInfo::of::<C>()).is_none());

        assert!(resolver.get::<C>().await.is_err());
        assert_eq!(c_count.load(Ordering::SeqCst), 2);
        assert!(logs_contain("connection refused"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_dropped_resolution_not_cached() {
        let started = Arc::new(AtomicBool::new(false));
        let mut container = Container::new();
        container
            .register(
                Unit::callable_async(TypeInfo::of::<C>(), Signature::new(), {
                    let started = started.clone();
                    move |_: Arguments| {
                        let started = started.clone();
                        async move {
                            started.store(true, Ordering::SeqCst);
                            core::future::pending::<()>().await;
                            Ok::<_, InstantiateErrorKind>(C)
                        }
                    }
                })
                .with_cache_scope(CacheScope::Container),
            )
            .unwrap();

        let mut resolver = container.resolver();
        tokio::select! {
            biased;
            _ = resolver.get::<C>() => panic!("Pending callable can't complete"),
            () = tokio::task::yield_now() => {}
        }

        assert!(started.load(Ordering::SeqCst));
        assert!(container.cached(TypeInfo::of::<C>()).is_none());
        assert!(resolver.cached(TypeInfo::of::<C>()).is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_static_value_never_cached() {
        let stored: Instance = Arc::new(Config { dsn: "static" });
        let mut resolver = resolver([
            Unit::from_instance(TypeInfo::of::<Config>(), stored.clone()).with_cache_scope(CacheScope::Container)
        ]);

        let first = resolver.resolve(TypeInfo::of::<Config>(), None).await.unwrap().unwrap();
        let second = resolver.resolve(TypeInfo::of::<Config>(), None).await.unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &stored));
        assert!(Arc::ptr_eq(&second, &stored));
        assert!(resolver.cached(TypeInfo::of::<Config>()).is_none());
        assert!(resolver.shared.lock().get(&TypeInfo::of::<Config>()).is_none());
    }
}
