//! How a function item binds, read from its signature.

use crate::runtime::MethodKind;
use syn::visit::{self, Visit};

/// Parse an item's text and report its kind.
///
/// Free functions are always [`MethodKind::Static`]. Inside an `impl`, a
/// receiver makes an instance method; a receiverless function that returns
/// something built from `Self` is the constructor-style class method; the
/// rest are static.
pub fn detect(item_text: &str, in_impl: bool) -> syn::Result<MethodKind> {
    if !in_impl {
        syn::parse_str::<syn::ItemFn>(item_text)?;
        return Ok(MethodKind::Static);
    }

    let item: syn::ImplItemFn = syn::parse_str(item_text)?;
    Ok(kind_of(&item.sig))
}

fn kind_of(sig: &syn::Signature) -> MethodKind {
    if sig.receiver().is_some() {
        return MethodKind::Instance;
    }

    let mut finder = SelfFinder::default();
    finder.visit_return_type(&sig.output);
    if finder.found {
        MethodKind::Class
    } else {
        MethodKind::Static
    }
}

#[derive(Default)]
struct SelfFinder {
    found: bool,
}

impl<'ast> Visit<'ast> for SelfFinder {
    fn visit_path(&mut self, path: &'ast syn::Path) {
        if path.segments.iter().any(|segment| segment.ident == "Self") {
            self.found = true;
        }
        visit::visit_path(self, path);
    }
}
