use thiserror::Error;

/// Errors raised while invoking a callable.
///
/// Hook signatures are not validated when a patch is installed, so a hook
/// that reads more arguments than the caller supplied fails here, at call
/// time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("expected at least {expected} positional argument(s), got {got}")]
    Arity { expected: usize, got: usize },

    #[error("missing keyword argument '{name}'")]
    MissingKeyword { name: String },

    #[error("argument {index} has the wrong type: expected {expected}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
    },

    #[error("'{namespace}' has no attribute '{name}'")]
    AttributeNotFound { namespace: String, name: String },

    #[error("'{namespace}.{name}' is not callable")]
    NotCallable { namespace: String, name: String },

    #[error("'{name}' needs an instance receiver")]
    MissingReceiver { name: String },

    #[error("{0}")]
    Raised(String),
}

impl CallError {
    /// Build an error raised by user code inside a hook or callable body.
    pub fn raised(message: impl Into<String>) -> Self {
        CallError::Raised(message.into())
    }
}
