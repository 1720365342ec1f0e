use alloc::boxed::Box;
use core::future::Future;

use crate::utils::future::BoxFuture;

/// Blocking call site, used by constructors, sync callables and sync callbacks
pub(crate) trait Service<Request> {
    type Response;
    type Error;

    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error>;
}

/// Suspending call site, used by async callables and async callbacks
pub(crate) trait AsyncService<Request> {
    type Response;
    type Error;

    fn call(&mut self, request: Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>>;
}

#[inline]
#[must_use]
pub(crate) const fn service_fn<F>(f: F) -> ServiceFn<F> {
    ServiceFn { f }
}

#[derive(Clone)]
pub(crate) struct ServiceFn<F> {
    f: F,
}

impl<F, Request, Response, Error> Service<Request> for ServiceFn<F>
where
    F: FnMut(Request) -> Result<Response, Error>,
{
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        (self.f)(request)
    }
}

impl<F, Fut, Request, Response, Error> AsyncService<Request> for ServiceFn<F>
where
    F: FnMut(Request) -> Fut,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>> {
        Box::pin((self.f)(request))
    }
}

pub(crate) struct BoxCloneService<Request, Response, Error>(
    Box<dyn CloneService<Request, Response = Response, Error = Error> + Send + Sync>,
);

impl<Request, Response, Error> BoxCloneService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + Sync + 'static,
    {
        Self(Box::new(service))
    }
}

trait CloneService<Request>: Service<Request> {
    fn clone_box(&self) -> Box<dyn CloneService<Request, Response = Self::Response, Error = Self::Error> + Send + Sync>;
}

impl<Request, S> CloneService<Request> for S
where
    S: Service<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<dyn CloneService<Request, Response = S::Response, Error = S::Error> + Send + Sync> {
        Box::new(self.clone())
    }
}

impl<Request, Response, Error> Clone for BoxCloneService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Service<Request> for BoxCloneService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        self.0.call(request)
    }
}

pub(crate) struct BoxCloneAsyncService<Request, Response, Error>(
    Box<dyn CloneAsyncService<Request, Response = Response, Error = Error> + Send + Sync>,
);

impl<Request, Response, Error> BoxCloneAsyncService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: AsyncService<Request, Response = Response, Error = Error> + Clone + Send + Sync + 'static,
    {
        Self(Box::new(service))
    }
}

trait CloneAsyncService<Request>: AsyncService<Request> {
    fn clone_box(&self) -> Box<dyn CloneAsyncService<Request, Response = Self::Response, Error = Self::Error> + Send + Sync>;
}

impl<Request, S> CloneAsyncService<Request> for S
where
    S: AsyncService<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> Box<dyn CloneAsyncService<Request, Response = S::Response, Error = S::Error> + Send + Sync> {
        Box::new(self.clone())
    }
}

impl<Request, Response, Error> Clone for BoxCloneAsyncService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> AsyncService<Request> for BoxCloneAsyncService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>> {
        self.0.call(request)
    }
}
