extern crate proc_macro;
use proc_macro::TokenStream;

mod a2lspec;
mod codegenerator;
mod util;

/// Generate the node types of the document model from a declarative specification
///
/// For every declared node this produces the struct with its constructor and its `Debug` and
/// `PartialEq` impls, the static schema table (`<NAME>_SCHEMA`, `<NAME>_FIELDS`), and the
/// `Node` / `NodeType` impls that connect the struct to the generic encoder and decoder.
/// Every declared enum becomes a Rust enum plus its `<NAME>_ENUM` label table.
#[proc_macro]
pub fn a2l_specification(tokens: TokenStream) -> TokenStream {
    let tokens2: proc_macro2::TokenStream = tokens.into();
    a2lspec::a2l_specification(tokens2).into()
}
