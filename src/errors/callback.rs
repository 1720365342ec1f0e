use core::any::TypeId;

use crate::{any::TypeInfo, unit::Trigger};

/// Error returned by callbacks.
#[derive(thiserror::Error, Debug)]
pub enum CallbackErrorKind {
    #[error("Incorrect instance type passed to callback. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: &'static str, actual: TypeId },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchErrorKind {
    #[error("{trigger} callback for {contract} failed: {source}")]
    Callback {
        contract: TypeInfo,
        trigger: Trigger,
        #[source]
        source: CallbackErrorKind,
    },
}
