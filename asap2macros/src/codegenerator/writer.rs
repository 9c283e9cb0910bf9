use proc_macro2::TokenStream;
use quote::quote;

use super::*;

// generate_enum_scalar()
// label lookup in both directions, Display and the scalar view used by the encoder
pub(crate) fn generate_enum_scalar(enumspec: &EnumSpec) -> TokenStream {
    let typeident = format_ident!("{}", enumspec.name);
    let labels = &enumspec.labels;
    let enumidents: Vec<Ident> = labels
        .iter()
        .map(|label| format_ident!("{}", ucname_to_typename(label)))
        .collect();

    quote! {
        impl EnumLabel for #typeident {
            fn label(&self) -> &'static str {
                match self {
                    #(Self::#enumidents => #labels),*
                }
            }

            fn from_label(label: &str) -> Option<Self> {
                match label {
                    #(#labels => Some(Self::#enumidents),)*
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for #typeident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ToScalar for #typeident {
            fn to_scalar(&self) -> ScalarRef<'_> {
                ScalarRef::Label(self.label())
            }
        }
    }
}

// generate_node_view()
// the Node impl gives the encoder and the consistency checks uniform access to all fields
pub(crate) fn generate_node_view(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let schemaident = node.schema_ident();

    let mut arms = Vec::new();
    for (idx, field) in node.fields.iter().enumerate() {
        let itemname = field.ident();
        let idx = index_literal(idx);
        let view = match &field.kind {
            FieldKind::Scalar { repeated: true, .. } => {
                quote! { FieldRef::from_repeated(&self.#itemname) }
            }
            FieldKind::Scalar { .. } if field.tag.is_some() => {
                quote! { FieldRef::from_optional(self.#itemname.as_ref()) }
            }
            FieldKind::Scalar { .. } | FieldKind::NameToken(_) => {
                quote! { FieldRef::Scalar(self.#itemname.to_scalar()) }
            }
            FieldKind::Flag => quote! { FieldRef::Flag(self.#itemname) },
            FieldKind::Reference { multiplicity, .. } => match multiplicity {
                Multiplicity::One => quote! { FieldRef::Node(&self.#itemname) },
                Multiplicity::ZeroOrOne => {
                    quote! { FieldRef::from_optional_node(self.#itemname.as_ref()) }
                }
                Multiplicity::List | Multiplicity::Dictionary => {
                    quote! { FieldRef::from_nodes(self.#itemname.iter()) }
                }
            },
        };
        arms.push(quote! { #idx => #view });
    }

    let key = if node.key_field().is_some() {
        quote! { Some(A2lObjectName::get_name(self)) }
    } else {
        quote! { None }
    };

    quote! {
        impl Node for #typeident {
            fn schema(&self) -> &'static NodeSchema {
                &#schemaident
            }

            fn sequence(&self) -> SequenceNumber {
                self.__sequence
            }

            fn field(&self, index: usize) -> FieldRef<'_> {
                match index {
                    #(#arms,)*
                    _ => FieldRef::Absent,
                }
            }

            fn key(&self) -> Option<&str> {
                #key
            }
        }
    }
}
