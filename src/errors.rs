mod callback;
mod configuration;
mod instantiate;
mod resolver;

pub use callback::{CallbackErrorKind, DispatchErrorKind};
pub use configuration::ConfigurationErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use resolver::{CyclePath, ResolveErrorKind};
