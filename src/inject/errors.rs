use crate::edit::EditError;
use crate::registry::CallableIdentity;
use crate::ts::TreeSitterError;
use crate::validate::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InjectError {
    /// The item could not be found, or found more than once.
    #[error("no source for {target} in module '{module}'")]
    SourceUnavailable {
        module: String,
        target: String,
        #[source]
        source: TreeSitterError,
    },

    /// The item's own text, or the code to inject, does not parse.
    #[error("{target}: {message}")]
    SyntaxInjectionError { target: String, message: String },

    /// The rewritten module is not valid Rust.
    #[error("injecting into {target} breaks module '{module}'")]
    CompileError {
        module: String,
        target: String,
        #[source]
        source: ValidationError,
    },

    /// The rebuilt item cannot take the original's place.
    #[error("cannot rebind {target}: {reason}")]
    RebindError { target: String, reason: String },

    #[error("{identity} has no recorded injection")]
    NotInjected { identity: CallableIdentity },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InjectError {
    pub(crate) fn rebind(target: impl ToString, source: EditError) -> Self {
        InjectError::RebindError {
            target: target.to_string(),
            reason: source.to_string(),
        }
    }
}
