use alloc::{borrow::Cow, boxed::Box, sync::Arc, vec::Vec};
use core::{any::type_name, fmt};

use crate::{
    any::{Instance, TypeInfo},
    errors::InstantiateErrorKind,
};

/// Declared type of a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    /// Plain contract, resolved as is
    Contract(TypeInfo),
    /// Nullable contract, unwrapped to its inner contract before resolution
    Optional(TypeInfo),
    /// Nullable union, holds only non-null variants.
    /// Can be resolved only if there is exactly one of them.
    Union(Box<[TypeInfo]>),
}

impl ParameterType {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Contract(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self::Optional(TypeInfo::of::<T>())
    }

    /// Returns the contract to resolve, or the non-null variants if there isn't exactly one
    pub(crate) fn unwrap_contract(&self) -> Result<TypeInfo, &[TypeInfo]> {
        match self {
            Self::Contract(contract) | Self::Optional(contract) => Ok(*contract),
            Self::Union(variants) => match &**variants {
                [contract] => Ok(*contract),
                variants => Err(variants),
            },
        }
    }
}

#[derive(Clone)]
pub struct Parameter {
    pub(crate) name: Cow<'static, str>,
    pub(crate) ty: ParameterType,
    pub(crate) default: Option<Instance>,
    pub(crate) variadic: bool,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            variadic: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ParameterType::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn optional<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ParameterType::optional::<T>())
    }

    #[inline]
    #[must_use]
    pub fn union(name: impl Into<Cow<'static, str>>, variants: impl IntoIterator<Item = TypeInfo>) -> Self {
        Self::new(name, ParameterType::Union(variants.into_iter().collect()))
    }

    /// Catch-all parameter (`*args`/`**kwargs` like). It's never resolved.
    #[inline]
    #[must_use]
    pub fn variadic(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: ParameterType::Union(Box::new([])),
            default: None,
            variadic: true,
        }
    }

    /// Value used when the parameter contract isn't registered and there is no context for it
    #[inline]
    #[must_use]
    pub fn with_default<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn ty(&self) -> &ParameterType {
        &self.ty
    }

    #[inline]
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("has_default", &self.default.is_some())
            .field("variadic", &self.variadic)
            .finish()
    }
}

/// Ordered parameters of a constructor or a callable.
/// Parameters are resolved one by one in this order.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub(crate) parameters: Vec<Parameter>,
}

impl Signature {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { parameters: Vec::new() }
    }

    #[inline]
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl FromIterator<Parameter> for Signature {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}

/// Parameter mapping passed to a constructor or a callable.
///
/// A parameter that resolved to nothing is kept as absent,
/// so the constructor decides whether it can live without it.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<(Cow<'static, str>, Option<Instance>)>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    #[inline]
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: Option<Instance>) {
        let name = name.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
    }

    #[inline]
    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<&Instance> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// Gets a required parameter
    ///
    /// # Errors
    /// - Returns [`InstantiateErrorKind::MissingParameter`] if the parameter is absent
    /// - Returns [`InstantiateErrorKind::IncorrectParameterType`] if the parameter has another type
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, InstantiateErrorKind> {
        self.get_optional(name)?.ok_or_else(|| InstantiateErrorKind::MissingParameter {
            name: Cow::Owned(name.into()),
        })
    }

    /// Gets an optional parameter
    ///
    /// # Errors
    /// Returns [`InstantiateErrorKind::IncorrectParameterType`] if the parameter has another type
    pub fn get_optional<T: Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>, InstantiateErrorKind> {
        let Some(value) = self.get_raw(name) else {
            return Ok(None);
        };
        match value.clone().downcast::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(InstantiateErrorKind::IncorrectParameterType {
                name: Cow::Owned(name.into()),
                expected: type_name::<T>(),
            }),
        }
    }

    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| &**name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.iter().map(|(name, value)| (name, value.is_some())))
            .finish()
    }
}
