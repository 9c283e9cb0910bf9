use proc_macro2::TokenStream;
use quote::quote;

use super::*;

// generate_enum_conversion()
// the decoder delivers enum values as static labels, which are already validated against the
// label table of the enum
pub(crate) fn generate_enum_conversion(enumspec: &EnumSpec) -> TokenStream {
    let typeident = format_ident!("{}", enumspec.name);

    quote! {
        impl FromValue for #typeident {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Label(label) => Self::from_label(label),
                    _ => None,
                }
            }
        }
    }
}

// generate_node_type()
// from_raw() moves the decoded values of each field into the typed struct
pub(crate) fn generate_node_type(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let schemaident = node.schema_ident();

    let mut initializers = Vec::new();
    for (idx, field) in node.fields.iter().enumerate() {
        let itemname = field.ident();
        let idx = index_literal(idx);
        let take = match &field.kind {
            FieldKind::Scalar { repeated: true, .. } => quote! { raw.take_repeated(#idx)? },
            FieldKind::Scalar { .. } if field.tag.is_some() => {
                quote! { raw.take_optional(#idx)? }
            }
            FieldKind::Scalar { .. } | FieldKind::NameToken(_) => quote! { raw.take(#idx)? },
            FieldKind::Flag => quote! { raw.take_flag(#idx)? },
            FieldKind::Reference { multiplicity, .. } => match multiplicity {
                Multiplicity::One => quote! { raw.take_node(#idx)? },
                Multiplicity::ZeroOrOne => quote! { raw.take_optional_node(#idx)? },
                Multiplicity::List => quote! { raw.take_list(#idx)? },
                Multiplicity::Dictionary => quote! { raw.take_dict(#idx)? },
            },
        };
        initializers.push(quote! { #itemname: #take });
    }

    quote! {
        impl NodeType for #typeident {
            fn node_schema() -> &'static NodeSchema {
                &#schemaident
            }

            fn from_raw(mut raw: RawNode) -> Result<Self, DecodeError> {
                let __sequence = raw.sequence();
                Ok(Self {
                    #(#initializers,)*
                    __sequence
                })
            }
        }
    }
}
