use crate::{any::TypeInfo, unit::CacheScope};

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationErrorKind {
    #[error(
        "Callback registered for {contract}, but its dependency is {}. \
        Callbacks can only be attached to session cached dependencies",
        describe_scope(.cache_scope),
    )]
    CallbackForUncached {
        contract: TypeInfo,
        cache_scope: Option<CacheScope>,
    },
    #[error("Sequence context arguments aren't supported, pass each value as a separate argument instead")]
    SequenceContext,
}

fn describe_scope(cache_scope: &Option<CacheScope>) -> &'static str {
    match cache_scope {
        Some(scope) => scope.name(),
        None => "not registered",
    }
}
