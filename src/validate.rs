//! Checks run on a rewritten module before it replaces the live text.
//!
//! 1. **Parse validation**: the rewrite is re-parsed with tree-sitter and
//!    must not contain more ERROR nodes than the text it replaces.
//! 2. **syn validation**: the rewrite must parse as a complete Rust file.

use crate::pool;
use crate::ts::{ParsedSource, TreeSitterError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rewrite introduced {count} new parse errors")]
    ParseErrorIntroduced {
        count: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("syn validation failed: {message}")]
    SynValidationFailed { message: String },

    #[error(transparent)]
    TreeSitter(#[from] TreeSitterError),
}

/// Location of an error node in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Reject `edited` if it has more ERROR nodes than `original`.
///
/// Counts are compared rather than positions: an insertion shifts every
/// offset after it, so pre-existing errors would otherwise look new.
pub fn validate_rewrite(original: &str, edited: &str) -> Result<(), ValidationError> {
    pool::with_parser(|parser| {
        let before = parser.parse_with_source(original)?.error_nodes().len();
        let edited_parsed = parser.parse_with_source(edited)?;
        let errors = collect_errors(&edited_parsed);

        if errors.len() > before {
            return Err(ValidationError::ParseErrorIntroduced {
                count: errors.len() - before,
                errors,
            });
        }
        Ok(())
    })?
}

fn collect_errors(parsed: &ParsedSource<'_>) -> Vec<ErrorLocation> {
    parsed
        .error_nodes()
        .into_iter()
        .map(|node| {
            // Up to 20 bytes of context on each side, clamped to char boundaries
            let mut context_start = node.byte_start.saturating_sub(20);
            while !parsed.source.is_char_boundary(context_start) {
                context_start -= 1;
            }
            let mut context_end = (node.byte_end + 20).min(parsed.source.len());
            while !parsed.source.is_char_boundary(context_end) {
                context_end += 1;
            }

            ErrorLocation {
                byte_start: node.byte_start,
                byte_end: node.byte_end,
                line: node.start_point.row + 1,
                column: node.start_point.column + 1,
                context: parsed.source[context_start..context_end].replace('\n', "\\n"),
            }
        })
        .collect()
}

/// syn-based validation.
pub mod syn_validate {
    use super::ValidationError;

    /// Parse `code` as a complete Rust file.
    pub fn validate_file(code: &str) -> Result<syn::File, ValidationError> {
        syn::parse_file(code).map_err(|e| ValidationError::SynValidationFailed {
            message: e.to_string(),
        })
    }
}
