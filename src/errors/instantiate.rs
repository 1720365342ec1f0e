use alloc::borrow::Cow;

/// Error returned by constructors and callables.
/// A required parameter that couldn't be supplied surfaces here, from the constructor itself.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Missing required parameter `{name}`")]
    MissingParameter { name: Cow<'static, str> },
    #[error("Parameter `{name}` has incorrect type, expected: {expected}")]
    IncorrectParameterType { name: Cow<'static, str>, expected: &'static str },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
