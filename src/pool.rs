//! Thread-local parser reuse.
//!
//! Locating an item, validating a rewrite and re-locating the result each
//! need a parser; building one per call dominates small injections.

use crate::ts::{RustParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static RUST_PARSER: RefCell<Option<RustParser>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's pooled parser, creating it on first use.
///
/// The parser is taken out of the pool while `f` runs, so a nested call gets
/// a fresh parser instead of a borrow panic.
///
/// ```
/// use harmonify::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source("fn main() {}").map(|parsed| parsed.has_errors())
/// })??;
/// assert!(!has_errors);
/// # Ok::<(), harmonify::ts::TreeSitterError>(())
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut RustParser) -> R,
{
    let pooled = RUST_PARSER.with(|cell| cell.borrow_mut().take());
    let mut parser = match pooled {
        Some(parser) => parser,
        None => RustParser::new()?,
    };

    let result = f(&mut parser);
    RUST_PARSER.with(|cell| *cell.borrow_mut() = Some(parser));
    Ok(result)
}
