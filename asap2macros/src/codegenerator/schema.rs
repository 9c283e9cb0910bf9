use proc_macro2::{Literal, TokenStream};
use quote::quote;

use super::*;

// generate_enum_schema()
// the label table that the decoder uses to validate enumerated values
pub(crate) fn generate_enum_schema(enumspec: &EnumSpec) -> TokenStream {
    let staticident = enum_schema_ident(&enumspec.name);
    let typename = &enumspec.name;
    let labels = &enumspec.labels;

    quote! {
        pub(crate) static #staticident: EnumSchema = EnumSchema {
            type_name: #typename,
            labels: &[#(#labels),*],
        };
    }
}

// generate_node_schema()
// the static NodeSchema of a node and the array of its field descriptors
pub(crate) fn generate_node_schema(node: &NodeSpec) -> TokenStream {
    let schemaident = node.schema_ident();
    let fieldsident = node.fields_ident();
    let type_name = &node.name;
    let field_count = Literal::usize_unsuffixed(node.fields.len());

    let keyword = match node.form {
        NodeForm::Document | NodeForm::Anonymous => quote! { Keyword::None },
        _ if node
            .fields
            .iter()
            .any(|field| matches!(field.kind, FieldKind::NameToken(_))) =>
        {
            quote! { Keyword::NameToken }
        }
        _ => quote! { Keyword::Fixed(#type_name) },
    };
    let kind = match node.form {
        NodeForm::Document => quote! { NodeKind::Document },
        NodeForm::Block => quote! { NodeKind::Block },
        NodeForm::Keyword | NodeForm::Anonymous => quote! { NodeKind::Simple },
    };
    let key_field = match node.key_field() {
        Some((idx, _)) => {
            let idx = index_literal(idx);
            quote! { Some(#idx) }
        }
        None => quote! { None },
    };

    let descriptors: Vec<TokenStream> = node.fields.iter().map(generate_descriptor).collect();

    quote! {
        pub(crate) static #fieldsident: [FieldDescriptor; #field_count] = [
            #(#descriptors),*
        ];

        pub(crate) static #schemaident: NodeSchema = NodeSchema {
            type_name: #type_name,
            keyword: #keyword,
            kind: #kind,
            fields: &#fieldsident,
            key_field: #key_field,
        };
    }
}

fn generate_descriptor(field: &FieldSpec) -> TokenStream {
    let name = &field.varname;
    let ordinal = Literal::u32_unsuffixed(field.ordinal);
    let tag = optional_str(&field.tag);
    let comment = optional_str(&field.comment);
    let force_new_line = field.force_new_line;

    let (role, optional, repeated) = match &field.kind {
        FieldKind::Scalar {
            datatype,
            hex,
            repeated,
        } => {
            let role = match datatype {
                DataType::String => quote! { FieldRole::QuotedString },
                _ => {
                    let valuetype = generate_valuetype(datatype);
                    if *hex {
                        quote! { FieldRole::HexArgument(#valuetype) }
                    } else {
                        quote! { FieldRole::Argument(#valuetype) }
                    }
                }
            };
            (role, field.tag.is_some(), *repeated)
        }
        FieldKind::NameToken(enumname) => {
            let enumschema = enum_schema_ident(enumname);
            (quote! { FieldRole::NameToken(&#enumschema) }, false, false)
        }
        FieldKind::Flag => (quote! { FieldRole::PresenceFlag }, false, false),
        FieldKind::Reference {
            target,
            multiplicity,
        } => {
            let schemaident = format_ident!("{}_SCHEMA", target);
            let role = match multiplicity {
                Multiplicity::One | Multiplicity::ZeroOrOne => {
                    quote! { FieldRole::Child(&#schemaident) }
                }
                Multiplicity::List => quote! { FieldRole::List(&#schemaident) },
                Multiplicity::Dictionary => quote! { FieldRole::Dictionary(&#schemaident) },
            };
            (role, *multiplicity == Multiplicity::ZeroOrOne, false)
        }
    };

    quote! {
        FieldDescriptor {
            name: #name,
            ordinal: #ordinal,
            role: #role,
            tag: #tag,
            optional: #optional,
            repeated: #repeated,
            force_new_line: #force_new_line,
            comment: #comment,
        }
    }
}

fn generate_valuetype(datatype: &DataType) -> TokenStream {
    match datatype {
        DataType::Uint => quote! { ValueType::U32 },
        DataType::Ulong => quote! { ValueType::U64 },
        DataType::Int64 => quote! { ValueType::I64 },
        DataType::Double => quote! { ValueType::Float },
        DataType::Ident => quote! { ValueType::Ident },
        DataType::String => quote! { ValueType::Text },
        DataType::Verbatim => quote! { ValueType::Verbatim },
        DataType::Enum(enumname) => {
            let enumschema = enum_schema_ident(enumname);
            quote! { ValueType::Enum(&#enumschema) }
        }
    }
}
