use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ParsedSource;
use ast_grep_language::{LanguageExt, SupportLang};
use std::collections::HashMap;
use tree_sitter::{Query, QueryCursor, StreamingIterator};

/// A match from a tree-sitter query with captured nodes.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub byte_start: usize,
    pub byte_end: usize,
    pub captures: HashMap<String, CapturedNode>,
}

#[derive(Debug, Clone)]
pub struct CapturedNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
    pub kind: String,
}

/// Engine for executing tree-sitter queries against parsed Rust source.
pub struct QueryEngine {
    query: Query,
    capture_names: Vec<String>,
}

impl QueryEngine {
    /// Compile an S-expression query such as
    /// ```text
    /// (function_item
    ///   name: (identifier) @name
    ///   body: (block) @body)
    /// ```
    pub fn new(query_str: &str) -> Result<Self, TreeSitterError> {
        let language = SupportLang::Rust.get_ts_language();
        let query = Query::new(&language, query_str).map_err(|e| TreeSitterError::InvalidQuery {
            message: e.to_string(),
        })?;

        let capture_names = query.capture_names().iter().map(|s| s.to_string()).collect();

        Ok(Self {
            query,
            capture_names,
        })
    }

    /// Every match of the query, in document order.
    pub fn find_all(&self, parsed: &ParsedSource<'_>) -> Vec<QueryMatch> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, parsed.root_node(), parsed.source.as_bytes());

        let mut results = Vec::new();

        // tree-sitter 0.25+ uses StreamingIterator
        while let Some(m) = matches.next() {
            let mut captures = HashMap::new();
            let mut overall_start = usize::MAX;
            let mut overall_end = 0usize;

            for capture in m.captures {
                let node = capture.node;
                let name = &self.capture_names[capture.index as usize];

                overall_start = overall_start.min(node.start_byte());
                overall_end = overall_end.max(node.end_byte());

                captures.insert(
                    name.clone(),
                    CapturedNode {
                        byte_start: node.start_byte(),
                        byte_end: node.end_byte(),
                        text: parsed.node_text(node).to_string(),
                        kind: node.kind().to_string(),
                    },
                );
            }

            if overall_start != usize::MAX {
                results.push(QueryMatch {
                    byte_start: overall_start,
                    byte_end: overall_end,
                    captures,
                });
            }
        }

        results
    }
}

/// Queries for the function items injection can target.
pub mod queries {
    /// A free function declared at the top level of a file.
    pub fn top_level_function(name: &str) -> String {
        format!(
            r#"(source_file
                (function_item
                    name: (identifier) @name
                    (#eq? @name "{name}")
                ) @function
            )"#
        )
    }

    /// A function declared inside any `impl` block. The implementing type is
    /// captured as `@type` and filtered by the caller, since generics and
    /// paths make a text predicate unreliable.
    pub fn impl_function(name: &str) -> String {
        format!(
            r#"(impl_item
                type: (_) @type
                body: (declaration_list
                    (function_item
                        name: (identifier) @name
                        (#eq? @name "{name}")
                    ) @function
                )
            )"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::parser::RustParser;

    #[test]
    fn top_level_query_skips_methods() {
        let mut parser = RustParser::new().unwrap();
        let source = r#"
fn render() {}

struct Widget;

impl Widget {
    fn render(&self) {}
}
"#;
        let parsed = parser.parse_with_source(source).unwrap();
        let engine = QueryEngine::new(&queries::top_level_function("render")).unwrap();

        let matches = engine.find_all(&parsed);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].captures["function"].text, "fn render() {}");
    }

    #[test]
    fn impl_query_captures_type() {
        let mut parser = RustParser::new().unwrap();
        let source = r#"
impl Widget {
    fn render(&self) {}
}

impl<T> Holder<T> {
    fn render(&self) {}
}
"#;
        let parsed = parser.parse_with_source(source).unwrap();
        let engine = QueryEngine::new(&queries::impl_function("render")).unwrap();

        let types: Vec<_> = engine
            .find_all(&parsed)
            .into_iter()
            .map(|m| m.captures["type"].text.clone())
            .collect();
        assert_eq!(types, ["Widget", "Holder<T>"]);
    }

    #[test]
    fn invalid_query_is_reported() {
        assert!(matches!(
            QueryEngine::new("(function_item"),
            Err(TreeSitterError::InvalidQuery { .. })
        ));
    }
}
