//! Where injected statements go and what they look like once there.

use crate::edit::Edit;
use crate::ts::FunctionSource;

/// Where to inject and what.
///
/// `insert_after_line` counts from the line holding the `fn` keyword, which
/// is line 0, so the first body line is line 1. The code lands after the last
/// top-level body statement that starts on or before that line, or at the
/// top of the body if none does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertionSpec {
    pub insert_after_line: usize,
    pub code: Option<String>,
}

impl InsertionSpec {
    pub fn new(insert_after_line: usize, code: impl Into<String>) -> Self {
        Self {
            insert_after_line,
            code: Some(code.into()),
        }
    }

    /// Rebuild and record the item without adding anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The code to inject, unless there is none worth parsing.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.trim().is_empty())
    }
}

/// Index in the statement list at which new statements are inserted.
///
/// `lines` holds the relative line of each top-level statement in order. The
/// result is one past the highest index whose line is at or before
/// `insert_after_line`, or 0 when every statement starts later.
pub fn insertion_index(lines: &[usize], insert_after_line: usize) -> usize {
    lines
        .iter()
        .rposition(|&line| line <= insert_after_line)
        .map_or(0, |index| index + 1)
}

/// Statements parsed from caller code and normalized by prettyplease, one
/// entry per output line with no leading indentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedBlock {
    lines: Vec<String>,
}

impl InjectedBlock {
    /// Parse `code` as a sequence of statements.
    ///
    /// The code must be self-contained: braces balance within it, so it can
    /// never close the body it is spliced into. Ordinary comments do not
    /// survive formatting. `Ok(None)` means the code holds no statements.
    pub fn parse(code: &str) -> syn::Result<Option<Self>> {
        let block: syn::Block = syn::parse_str(&format!("{{\n{code}\n}}"))?;
        if block.stmts.is_empty() {
            return Ok(None);
        }

        let holder = syn::ItemFn {
            attrs: Vec::new(),
            vis: syn::Visibility::Inherited,
            sig: syn::parse_str("fn __injected()")?,
            block: Box::new(block),
        };
        let formatted = prettyplease::unparse(&syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: vec![syn::Item::Fn(holder)],
        });

        // Drop the `fn __injected() {` and `}` lines along with one level of indentation
        let body: Vec<&str> = formatted.lines().collect();
        let inner = body.get(1..body.len().saturating_sub(1)).unwrap_or_default();
        let lines = inner
            .iter()
            .map(|&line| line.strip_prefix("    ").unwrap_or(line).to_string())
            .collect();
        Ok(Some(Self { lines }))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Each line on its own row, prefixed by a newline and `indent`.
    fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
                out.push_str(line);
            }
        }
        out
    }
}

/// The edit that splices `block` into `function` at statement `index`.
pub fn splice_edit(module: &str, function: &FunctionSource, index: usize, block: &InjectedBlock) -> Edit {
    let item_indent = line_indent(module, function.byte_start);
    let statements = &function.body.statements;
    let body_indent = statements
        .first()
        .filter(|first| starts_line(module, first.byte_start))
        .map(|first| line_indent(module, first.byte_start).to_string())
        .unwrap_or_else(|| format!("{item_indent}    "));
    let rendered = block.render(&body_indent);

    let interior = &module[function.body.open..function.body.close];
    if statements.is_empty() && interior.trim().is_empty() {
        // `{}` or a blank body: give the closing brace its own line again
        return Edit::new(
            function.body.open,
            function.body.close,
            format!("{rendered}\n{item_indent}"),
            interior,
        );
    }

    let at = match index {
        0 => function.body.head,
        n => statements[n.min(statements.len()) - 1].byte_end,
    };
    Edit::insertion(at, rendered)
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

fn starts_line(text: &str, offset: usize) -> bool {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    text[line_start..offset].trim().is_empty()
}
