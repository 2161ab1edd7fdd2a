use crate::pool;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ParsedSource;
use crate::ts::query::{queries, QueryEngine, QueryMatch};
use std::fmt;
use syn::punctuated::Punctuated;
use syn::Token;
use tree_sitter::Node;

/// The function item an injection addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionTarget {
    /// A free function at the top level of a file.
    Function { name: String },
    /// A function inside an `impl` block for `type_name`.
    Method { type_name: String, name: String },
}

impl FunctionTarget {
    pub fn function(name: impl Into<String>) -> Self {
        FunctionTarget::Function { name: name.into() }
    }

    pub fn method(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        FunctionTarget::Method {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FunctionTarget::Function { name } | FunctionTarget::Method { name, .. } => name,
        }
    }

    fn to_query(&self) -> String {
        match self {
            FunctionTarget::Function { name } => queries::top_level_function(name),
            FunctionTarget::Method { name, .. } => queries::impl_function(name),
        }
    }

    fn accepts(&self, m: &QueryMatch) -> bool {
        match self {
            FunctionTarget::Function { .. } => true,
            FunctionTarget::Method { type_name, .. } => m
                .captures
                .get("type")
                .is_some_and(|ty| base_type_name(&ty.text) == type_name),
        }
    }
}

impl fmt::Display for FunctionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionTarget::Function { name } => write!(f, "fn {name}"),
            FunctionTarget::Method { type_name, name } => write!(f, "{type_name}::{name}"),
        }
    }
}

/// A located function item.
///
/// All byte offsets are absolute positions in the searched source. Lines are
/// counted from the row the item starts on, which is line 0, so the first
/// body line is line 1. Outer attributes and doc comments sit before the item
/// and are not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
    pub start_row: usize,
    /// Outer attributes directly above the item, as written.
    pub attributes: Vec<String>,
    pub body: BodyLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLayout {
    /// Offset just past the opening brace.
    pub open: usize,
    /// Offset of the closing brace.
    pub close: usize,
    /// Offset past the inner attributes that open the body, or `open` when
    /// there are none. Statements inserted first go here.
    pub head: usize,
    pub statements: Vec<StatementSpan>,
}

/// One top-level statement of a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementSpan {
    pub line: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl FunctionSource {
    pub fn statement_lines(&self) -> Vec<usize> {
        self.body.statements.iter().map(|s| s.line).collect()
    }

    /// Whether an outer attribute's path ends in `name`, so both
    /// `#[no_inject]` and `#[harmonify::no_inject]` count. Attributes behind
    /// `cfg_attr` count whatever the predicate.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|text| {
            syn::parse::Parser::parse_str(syn::Attribute::parse_outer, text)
                .map(|attrs| attrs.iter().any(|attr| meta_names(&attr.meta, name)))
                .unwrap_or(false)
        })
    }
}

fn meta_names(meta: &syn::Meta, name: &str) -> bool {
    let path = meta.path();
    if path.is_ident("cfg_attr") {
        let syn::Meta::List(list) = meta else {
            return false;
        };
        return list
            .parse_args_with(Punctuated::<syn::Meta, Token![,]>::parse_terminated)
            .map(|metas| metas.iter().skip(1).any(|meta| meta_names(meta, name)))
            .unwrap_or(false);
    }
    path.segments.last().is_some_and(|segment| segment.ident == name)
}

// Nodes that share a body with statements but are not statements themselves.
const NON_STATEMENT_KINDS: &[&str] = &[
    "line_comment",
    "block_comment",
    "attribute_item",
    "inner_attribute_item",
];

// What may sit between an item and the outer attributes above it.
const OUTER_KINDS: &[&str] = &["line_comment", "block_comment", "attribute_item"];

/// Find `target` in `source`. Exactly one item must match.
pub fn locate(source: &str, target: &FunctionTarget) -> Result<FunctionSource, TreeSitterError> {
    if !is_identifier(target.name()) {
        return Err(TreeSitterError::InvalidIdentifier {
            name: target.name().to_string(),
        });
    }
    let engine = QueryEngine::new(&target.to_query())?;

    pool::with_parser(|parser| {
        let parsed = parser.parse_with_source(source)?;
        let mut matches: Vec<_> = engine
            .find_all(&parsed)
            .into_iter()
            .filter(|m| target.accepts(m))
            .collect();

        let function = match matches.len() {
            0 => {
                return Err(TreeSitterError::NoMatch {
                    target: target.to_string(),
                })
            }
            1 => matches.remove(0).captures.remove("function"),
            count => {
                return Err(TreeSitterError::AmbiguousMatch {
                    target: target.to_string(),
                    count,
                })
            }
        };
        let function = function.ok_or_else(|| TreeSitterError::NoMatch {
            target: target.to_string(),
        })?;

        let node = parsed
            .root_node()
            .descendant_for_byte_range(function.byte_start, function.byte_end)
            .filter(|node| node.kind() == "function_item")
            .ok_or_else(|| TreeSitterError::NoMatch {
                target: target.to_string(),
            })?;
        describe(&parsed, node, target)
    })?
}

fn describe(
    parsed: &ParsedSource<'_>,
    function: Node<'_>,
    target: &FunctionTarget,
) -> Result<FunctionSource, TreeSitterError> {
    let body = function
        .child_by_field_name("body")
        .ok_or_else(|| TreeSitterError::MissingBody {
            target: target.to_string(),
        })?;
    let start_row = function.start_position().row;

    let open = body.start_byte() + 1;
    let mut cursor = body.walk();
    let children: Vec<Node<'_>> = body.named_children(&mut cursor).collect();
    let head = children
        .iter()
        .take_while(|node| NON_STATEMENT_KINDS.contains(&node.kind()))
        .filter(|node| node.kind() == "inner_attribute_item")
        .last()
        .map_or(open, |node| node.end_byte());
    let statements = children
        .iter()
        .filter(|node| !NON_STATEMENT_KINDS.contains(&node.kind()))
        .map(|node| StatementSpan {
            line: node.start_position().row - start_row,
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
        })
        .collect();

    let mut attributes = Vec::new();
    let mut sibling = function.prev_named_sibling();
    while let Some(node) = sibling.filter(|node| OUTER_KINDS.contains(&node.kind())) {
        if node.kind() == "attribute_item" {
            attributes.push(parsed.node_text(node).to_string());
        }
        sibling = node.prev_named_sibling();
    }
    attributes.reverse();

    Ok(FunctionSource {
        byte_start: function.start_byte(),
        byte_end: function.end_byte(),
        text: parsed.node_text(function).to_string(),
        start_row,
        attributes,
        body: BodyLayout {
            open,
            close: body.end_byte().saturating_sub(1),
            head,
            statements,
        },
    })
}

/// `Holder<T>` and `crate::ui::Holder` both name `Holder`.
fn base_type_name(text: &str) -> &str {
    let without_generics = text.split('<').next().unwrap_or(text).trim();
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .trim()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}
