use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeSitterError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("invalid tree-sitter query: {message}")]
    InvalidQuery { message: String },

    #[error("'{target}' matched {count} items, expected exactly 1")]
    AmbiguousMatch { target: String, count: usize },

    #[error("no item matches '{target}'")]
    NoMatch { target: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    #[error("'{target}' has no body")]
    MissingBody { target: String },
}
