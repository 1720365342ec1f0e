use alloc::sync::Arc;
use core::{any::type_name, future::Future};

use crate::{
    any::Instance,
    errors::CallbackErrorKind,
    service::{service_fn, BoxCloneAsyncService, BoxCloneService},
};

/// What a callback receives besides the instance.
/// Carries the error the session ended with, if any.
#[derive(Debug, Clone, Default)]
pub struct LifecycleContext {
    failure: Option<SessionFailure>,
}

#[derive(Debug, Clone)]
pub struct SessionFailure {
    error_type: &'static str,
    error: Arc<anyhow::Error>,
}

impl SessionFailure {
    #[inline]
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        self.error_type
    }

    /// With `std` enabled the error also holds the backtrace of the place it was created
    #[inline]
    #[must_use]
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

impl LifecycleContext {
    #[inline]
    #[must_use]
    pub const fn success() -> Self {
        Self { failure: None }
    }

    #[inline]
    #[must_use]
    pub fn failure<E>(error: E) -> Self
    where
        E: Into<anyhow::Error> + 'static,
    {
        Self {
            failure: Some(SessionFailure {
                error_type: type_name::<E>(),
                error: Arc::new(error.into()),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn session_failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }
}

pub(crate) trait Callback<Dep>: Clone + Send + Sync + 'static {
    fn call(&mut self, dependency: Arc<Dep>, context: LifecycleContext) -> Result<(), CallbackErrorKind>;
}

impl<F, Dep> Callback<Dep> for F
where
    F: FnMut(Arc<Dep>, LifecycleContext) -> Result<(), CallbackErrorKind> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn call(&mut self, dependency: Arc<Dep>, context: LifecycleContext) -> Result<(), CallbackErrorKind> {
        self(dependency, context)
    }
}

pub(crate) trait AsyncCallback<Dep>: Clone + Send + Sync + 'static {
    fn call(&mut self, dependency: Arc<Dep>, context: LifecycleContext) -> impl Future<Output = Result<(), CallbackErrorKind>> + Send + 'static;
}

impl<F, Fut, Dep> AsyncCallback<Dep> for F
where
    F: FnMut(Arc<Dep>, LifecycleContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CallbackErrorKind>> + Send + 'static,
{
    #[inline]
    fn call(&mut self, dependency: Arc<Dep>, context: LifecycleContext) -> impl Future<Output = Result<(), CallbackErrorKind>> + Send + 'static {
        self(dependency, context)
    }
}

pub(crate) type BoxedCloneCallback = BoxCloneService<(Instance, LifecycleContext), (), CallbackErrorKind>;

pub(crate) type BoxedCloneAsyncCallback = BoxCloneAsyncService<(Instance, LifecycleContext), (), CallbackErrorKind>;

fn downcast<Dep: Send + Sync + 'static>(instance: Instance) -> Result<Arc<Dep>, CallbackErrorKind> {
    instance.downcast::<Dep>().map_err(|instance| CallbackErrorKind::IncorrectType {
        expected: type_name::<Dep>(),
        actual: (*instance).type_id(),
    })
}

#[must_use]
pub(crate) fn boxed_callback<Dep, Cb>(mut callback: Cb) -> BoxedCloneCallback
where
    Dep: Send + Sync + 'static,
    Cb: Callback<Dep>,
{
    BoxCloneService::new(service_fn(move |(instance, context): (Instance, LifecycleContext)| {
        callback.call(downcast(instance)?, context)
    }))
}

#[must_use]
pub(crate) fn boxed_async_callback<Dep, Cb>(callback: Cb) -> BoxedCloneAsyncCallback
where
    Dep: Send + Sync + 'static,
    Cb: AsyncCallback<Dep>,
{
    BoxCloneAsyncService::new(service_fn(move |(instance, context): (Instance, LifecycleContext)| {
        let mut callback = callback.clone();

        async move { callback.call(downcast(instance)?, context).await }
    }))
}
