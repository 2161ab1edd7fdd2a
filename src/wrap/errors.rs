use crate::registry::CallableIdentity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WrapError {
    #[error("'{namespace}' has no attribute '{name}'{}", did_you_mean(.suggestion))]
    AttributeNotFound {
        namespace: String,
        name: String,
        suggestion: Option<String>,
    },

    #[error("'{namespace}.{name}' is not callable")]
    NotCallable { namespace: String, name: String },

    #[error("{identity} is not patched")]
    NotPatched { identity: CallableIdentity },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(candidate) => format!(" (did you mean '{candidate}'?)"),
        None => String::new(),
    }
}

/// Closest attribute name to `name`, when one is close enough to be a likely typo.
pub(crate) fn suggest(name: &str, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
        .filter(|(score, _)| *score >= 0.85)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, candidate)| candidate.clone())
}
