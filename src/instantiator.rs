use alloc::sync::Arc;
use core::future::Future;

use crate::{
    any::Instance,
    errors::InstantiateErrorKind,
    service::{service_fn, BoxCloneAsyncService, BoxCloneService},
    signature::Arguments,
};

/// Blocking factory of a class or a sync callable
pub(crate) trait Instantiator: Clone + Send + Sync + 'static {
    type Provides: Send + Sync + 'static;

    fn instantiate(&mut self, arguments: Arguments) -> Result<Self::Provides, InstantiateErrorKind>;
}

impl<F, Response> Instantiator for F
where
    F: FnMut(Arguments) -> Result<Response, InstantiateErrorKind> + Clone + Send + Sync + 'static,
    Response: Send + Sync + 'static,
{
    type Provides = Response;

    #[inline]
    fn instantiate(&mut self, arguments: Arguments) -> Result<Self::Provides, InstantiateErrorKind> {
        self(arguments)
    }
}

/// Suspending factory of an async callable
pub(crate) trait AsyncInstantiator: Clone + Send + Sync + 'static {
    type Provides: Send + Sync + 'static;

    fn instantiate(&mut self, arguments: Arguments) -> impl Future<Output = Result<Self::Provides, InstantiateErrorKind>> + Send + 'static;
}

impl<F, Fut, Response> AsyncInstantiator for F
where
    F: FnMut(Arguments) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, InstantiateErrorKind>> + Send + 'static,
    Response: Send + Sync + 'static,
{
    type Provides = Response;

    #[inline]
    fn instantiate(&mut self, arguments: Arguments) -> impl Future<Output = Result<Self::Provides, InstantiateErrorKind>> + Send + 'static {
        self(arguments)
    }
}

pub(crate) type BoxedCloneInstantiator = BoxCloneService<Arguments, Instance, InstantiateErrorKind>;

pub(crate) type BoxedCloneAsyncInstantiator = BoxCloneAsyncService<Arguments, Instance, InstantiateErrorKind>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst: Instantiator>(mut instantiator: Inst) -> BoxedCloneInstantiator {
    BoxCloneService::new(service_fn(move |arguments| {
        instantiator
            .instantiate(arguments)
            .map(|provides| Arc::new(provides) as Instance)
    }))
}

#[must_use]
pub(crate) fn boxed_async_instantiator<Inst: AsyncInstantiator>(instantiator: Inst) -> BoxedCloneAsyncInstantiator {
    BoxCloneAsyncService::new(service_fn(move |arguments| {
        let mut instantiator = instantiator.clone();

        async move {
            instantiator
                .instantiate(arguments)
                .await
                .map(|provides| Arc::new(provides) as Instance)
        }
    }))
}
