use tracing::{debug, debug_span, error, Instrument as _};

use crate::{
    cache::Cache,
    callback::LifecycleContext,
    errors::DispatchErrorKind,
    registry::Registry,
    service::{AsyncService as _, Service as _},
    unit::{CacheScope, CallbackInvoker, Implementation, Trigger},
};

/// Calls callbacks of the trigger for instances resolved in the session.
///
/// Callbacks are called one by one in registration order, the first failed one stops the dispatch.
/// A callback whose instance wasn't resolved is skipped, an instance is never built here.
pub(crate) async fn dispatch(
    registry: &Registry,
    cache: &Cache,
    trigger: Trigger,
    context: &LifecycleContext,
) -> Result<(), DispatchErrorKind> {
    let span = debug_span!("dispatch", %trigger, cached = cache.len());

    async move {
        for unit in registry.callbacks(trigger) {
            let contract = unit.contract();

            if unit.cache_scope() != CacheScope::Session {
                debug!(%contract, "Callback of uncached dependency skipped");
                continue;
            }
            let Some(instance) = cache.get(&contract) else {
                debug!(%contract, "Not resolved, callback skipped");
                continue;
            };
            let Implementation::Callback(invoker) = &unit.implementation else {
                continue;
            };

            let result = match invoker.clone() {
                CallbackInvoker::Sync(mut callback) => callback.call((instance, context.clone())),
                CallbackInvoker::Async(mut callback) => callback.call((instance, context.clone())).await,
            };
            if let Err(source) = result {
                let err = DispatchErrorKind::Callback { contract, trigger, source };
                error!("{}", err);
                return Err(err);
            }
            debug!(%contract, "Callback called");
        }
        Ok(())
    }
    .instrument(span)
    .await
}
