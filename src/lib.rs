#![no_std]

extern crate alloc;

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod callback;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod dispatcher;
pub(crate) mod errors;
pub(crate) mod instantiator;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod service;
pub(crate) mod signature;
pub(crate) mod unit;
pub(crate) mod utils;

pub use any::{Instance, TypeInfo};
pub use callback::{LifecycleContext, SessionFailure};
pub use container::Container;
pub use context::{Context, ContextArg};
pub use errors::{
    CallbackErrorKind, ConfigurationErrorKind, CyclePath, DispatchErrorKind, InstantiateErrorKind, ResolveErrorKind,
};
pub use registry::Registry;
pub use resolver::Resolver;
pub use signature::{Arguments, Parameter, ParameterType, Signature};
pub use unit::{CacheScope, ExecutionMode, ImplementationKind, Trigger, Unit, UnitKey, UnitKind};
pub use utils::merge::Merge;
