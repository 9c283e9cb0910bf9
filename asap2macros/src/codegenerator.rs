use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};

use super::util::*;

mod data_structure;
mod parser;
mod schema;
mod writer;

/// The shape of a declared node
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NodeForm {
    Document,
    Block,
    Keyword,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DataType {
    Uint,
    Ulong,
    Int64,
    Double,
    Ident,
    String,
    Verbatim,
    Enum(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Multiplicity {
    One,
    ZeroOrOne,
    List,
    Dictionary,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldKind {
    /// positional if there is no tag, otherwise an optional named element
    Scalar {
        datatype: DataType,
        hex: bool,
        repeated: bool,
    },
    NameToken(String),
    Flag,
    Reference {
        target: String,
        multiplicity: Multiplicity,
    },
}

#[derive(Debug)]
pub(crate) struct FieldSpec {
    pub(crate) varname: String,
    pub(crate) ordinal: u32,
    pub(crate) kind: FieldKind,
    pub(crate) tag: Option<String>,
    pub(crate) doc: Option<String>,
    pub(crate) comment: Option<String>,
    pub(crate) force_new_line: bool,
    pub(crate) is_key: bool,
}

#[derive(Debug)]
pub(crate) struct NodeSpec {
    /// the keyword, or the type name of nodes that have none (e.g. A2L_FILE)
    pub(crate) name: String,
    pub(crate) form: NodeForm,
    pub(crate) doc: Option<String>,
    pub(crate) fields: Vec<FieldSpec>,
}

#[derive(Debug)]
pub(crate) struct EnumSpec {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) labels: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Specification {
    pub(crate) nodes: Vec<NodeSpec>,
    pub(crate) enums: Vec<EnumSpec>,
}

pub(crate) fn generate(spec: &Specification) -> TokenStream {
    let mut result = quote! {};

    for enumspec in &spec.enums {
        result.extend(data_structure::generate_enum(enumspec));
        result.extend(schema::generate_enum_schema(enumspec));
        result.extend(parser::generate_enum_conversion(enumspec));
        result.extend(writer::generate_enum_scalar(enumspec));
    }

    for node in &spec.nodes {
        result.extend(data_structure::generate_node(node));
        result.extend(schema::generate_node_schema(node));
        result.extend(parser::generate_node_type(node));
        result.extend(writer::generate_node_view(node));
    }

    result
}

impl NodeSpec {
    pub(crate) fn typename(&self) -> Ident {
        format_ident!("{}", ucname_to_typename(&self.name))
    }

    pub(crate) fn schema_ident(&self) -> Ident {
        format_ident!("{}_SCHEMA", self.name)
    }

    pub(crate) fn fields_ident(&self) -> Ident {
        format_ident!("{}_FIELDS", self.name)
    }

    pub(crate) fn key_field(&self) -> Option<(usize, &FieldSpec)> {
        self.fields.iter().enumerate().find(|(_, field)| field.is_key)
    }
}

impl FieldSpec {
    pub(crate) fn ident(&self) -> Ident {
        format_ident!("{}", self.varname)
    }

    /// positional scalars and name tokens, which are passed to new()
    pub(crate) fn is_constructor_arg(&self) -> bool {
        match &self.kind {
            FieldKind::Scalar { repeated, .. } => self.tag.is_none() && !*repeated,
            FieldKind::NameToken(_) => true,
            FieldKind::Flag => false,
            FieldKind::Reference { multiplicity, .. } => *multiplicity == Multiplicity::One,
        }
    }

    /// the full Rust type of the field, e.g. `Option<BitMask>`
    pub(crate) fn rust_type(&self) -> TokenStream {
        match &self.kind {
            FieldKind::Scalar {
                datatype, repeated, ..
            } => {
                let base = datatype.rust_type();
                if *repeated {
                    quote! { Vec<#base> }
                } else if self.tag.is_some() {
                    quote! { Option<#base> }
                } else {
                    base
                }
            }
            FieldKind::NameToken(enumname) => {
                let enumident = format_ident!("{}", enumname);
                quote! { #enumident }
            }
            FieldKind::Flag => quote! { bool },
            FieldKind::Reference {
                target,
                multiplicity,
            } => {
                let typeident = format_ident!("{}", ucname_to_typename(target));
                match multiplicity {
                    Multiplicity::One => quote! { #typeident },
                    Multiplicity::ZeroOrOne => quote! { Option<#typeident> },
                    Multiplicity::List => quote! { Vec<#typeident> },
                    Multiplicity::Dictionary => quote! { ItemList<#typeident> },
                }
            }
        }
    }

    /// the initial value of a field that is not a constructor argument
    pub(crate) fn default_value(&self) -> TokenStream {
        match &self.kind {
            FieldKind::Scalar { repeated: true, .. } => quote! { Vec::new() },
            FieldKind::Flag => quote! { false },
            FieldKind::Reference {
                multiplicity: Multiplicity::List,
                ..
            } => quote! { Vec::new() },
            FieldKind::Reference {
                multiplicity: Multiplicity::Dictionary,
                ..
            } => quote! { ItemList::new() },
            _ => quote! { None },
        }
    }
}

impl DataType {
    pub(crate) fn rust_type(&self) -> TokenStream {
        match self {
            DataType::Uint => quote! { u32 },
            DataType::Ulong => quote! { u64 },
            DataType::Int64 => quote! { i64 },
            DataType::Double => quote! { f64 },
            DataType::Ident | DataType::String | DataType::Verbatim => quote! { String },
            DataType::Enum(enumname) => {
                let enumident = format_ident!("{}", enumname);
                quote! { #enumident }
            }
        }
    }
}

pub(crate) fn enum_schema_ident(enumname: &str) -> Ident {
    format_ident!("{}_ENUM", camel_to_upper(enumname))
}

pub(crate) fn index_literal(index: usize) -> Literal {
    Literal::usize_unsuffixed(index)
}

pub(crate) fn optional_str(text: &Option<String>) -> TokenStream {
    match text {
        Some(text) => quote! { Some(#text) },
        None => quote! { None },
    }
}
