use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser for Rust source.
pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // The grammar comes from ast-grep-language so both agree on node kinds
        let ts_lang = SupportLang::Rust.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse source code and keep it next to its tree.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Every ERROR or MISSING node, in document order.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
}

fn collect_error_nodes(node: Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
        });
    }

    // Subtrees without errors are skipped entirely
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
