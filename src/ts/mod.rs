//! Tree-sitter integration for locating function items.
//!
//! Spans come from the concrete syntax tree, so comments and formatting
//! around an item survive every rewrite.

pub mod errors;
pub mod locator;
pub mod parser;
pub mod query;

pub use errors::TreeSitterError;
pub use locator::{locate, BodyLayout, FunctionSource, FunctionTarget, StatementSpan};
pub use parser::{ErrorNode, ParsedSource, RustParser};
pub use query::{QueryEngine, QueryMatch};
