use alloc::{borrow::Cow, boxed::Box};
use core::{
    any::TypeId,
    fmt::{self, Display, Formatter},
};

use super::instantiate::InstantiateErrorKind;
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error(
        "Parameter `{parameter}` of {contract} has ambiguous union type: {} non-null variants, expected exactly one",
        .variants.len(),
    )]
    AmbiguousUnion {
        contract: TypeInfo,
        parameter: Cow<'static, str>,
        variants: Box<[TypeInfo]>,
    },
    #[error("Cannot resolve parameters for {contract}: {source}")]
    CannotResolveParameters {
        contract: TypeInfo,
        #[source]
        source: InstantiateErrorKind,
    },
    #[error("{0}")]
    CyclicDependency(CyclePath),
    #[error("Incorrect instance type for {contract}. Actual: {actual:?}, expected: {expected}")]
    IncorrectType {
        contract: TypeInfo,
        expected: &'static str,
        actual: TypeId,
    },
}

#[derive(Debug, Clone)]
pub struct CyclePath(pub Box<[TypeInfo]>);

impl Display for CyclePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cyclic dependency detected: ")?;
        for (index, contract) in self.0.iter().enumerate() {
            if index != 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", contract.short_name())?;
        }
        Ok(())
    }
}
