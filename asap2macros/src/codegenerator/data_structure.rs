use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;

use super::*;

// generate_enum()
// generate an enum with the given name and items
pub(crate) fn generate_enum(enumspec: &EnumSpec) -> TokenStream {
    let typeident = format_ident!("{}", enumspec.name);
    let doc = doc_attr(&enumspec.doc);

    let enumidents: Vec<Ident> = enumspec
        .labels
        .iter()
        .map(|label| format_ident!("{}", ucname_to_typename(label)))
        .collect();

    quote! {
        #doc
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
        pub enum #typeident {
            #(#enumidents),*
        }
    }
}

// generate_node()
// generate the data structure of a node and all of the associated functions that do not
// depend on the schema tables
pub(crate) fn generate_node(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let doc = doc_attr(&node.doc);

    let mut definitions = Vec::new();
    for field in &node.fields {
        let fielddoc = doc_attr(&field.doc);
        let itemname = field.ident();
        let fieldtype = field.rust_type();
        definitions.push(quote! {
            #fielddoc
            pub #itemname: #fieldtype
        });
    }
    definitions.push(quote! { pub(crate) __sequence: SequenceNumber });

    let debug = generate_debug(node);
    let constructor = generate_constructor(node);
    let partialeq = generate_partialeq(node);
    let trait_name = generate_trait_name(node);

    quote! {
        #doc
        #[derive(Clone)]
        pub struct #typeident {
            #(#definitions),*
        }

        #debug
        #constructor
        #partialeq
        #trait_name
    }
}

// generate_debug()
// the sequence number is an implementation detail and is left out of the debug output
fn generate_debug(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let typename = typeident.to_string();
    let itemnames: Vec<String> = node.fields.iter().map(|f| f.varname.clone()).collect();
    let itemidents: Vec<Ident> = node.fields.iter().map(FieldSpec::ident).collect();

    quote! {
        impl std::fmt::Debug for #typeident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(#typename)
                #(.field(#itemnames, &self.#itemidents))*
                .finish()
            }
        }
    }
}

// generate_constructor()
// new() takes all mandatory items as arguments; optional items start out empty.
// The node's sequence number is allocated first.
fn generate_constructor(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let mut arguments = Vec::new();
    let mut initializers = Vec::new();

    for field in &node.fields {
        let itemname = field.ident();
        if field.is_constructor_arg() {
            let fieldtype = field.rust_type();
            arguments.push(quote! { #itemname: #fieldtype });
            initializers.push(quote! { #itemname });
        } else {
            let default = field.default_value();
            initializers.push(quote! { #itemname: #default });
        }
    }

    let doc = format!(" create a new {typeident} with the given mandatory items");
    quote! {
        impl #typeident {
            #[doc = #doc]
            #[must_use]
            #[allow(clippy::too_many_arguments)]
            pub fn new(context: &mut BuildContext, #(#arguments),*) -> Self {
                let __sequence = context.next_sequence();
                Self {
                    #(#initializers,)*
                    __sequence
                }
            }
        }
    }
}

// generate_partialeq()
// equality compares the content only; nodes that were created in a different order can be equal
fn generate_partialeq(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let mut body = quote! {};
    for field in &node.fields {
        let itemname = field.ident();
        if !body.is_empty() {
            body.extend(quote! { && });
        }
        body.extend(quote! { (self.#itemname == other.#itemname) });
    }
    if body.is_empty() {
        body = quote! {
            let _ = other;
            true
        };
    }

    quote! {
        impl PartialEq for #typeident {
            fn eq(&self, other: &Self) -> bool {
                #body
            }
        }
    }
}

// generate_trait_name()
// nodes that have a key can be stored in an ItemList
fn generate_trait_name(node: &NodeSpec) -> TokenStream {
    let typeident = node.typename();
    let Some((_, key)) = node.key_field() else {
        return quote! {};
    };
    let keyname = key.ident();

    match &key.kind {
        FieldKind::NameToken(_) => quote! {
            impl A2lObjectName for #typeident {
                fn get_name(&self) -> &str {
                    self.#keyname.label()
                }
            }
        },
        // the first word of the content, e.g. the protocol name of an IF_DATA block
        FieldKind::Scalar {
            datatype: DataType::Verbatim,
            ..
        } => quote! {
            impl A2lObjectName for #typeident {
                fn get_name(&self) -> &str {
                    self.#keyname.split_whitespace().next().unwrap_or_default()
                }
            }
        },
        _ => quote! {
            impl A2lObjectName for #typeident {
                fn get_name(&self) -> &str {
                    &self.#keyname
                }
            }

            impl A2lObjectNameSetter for #typeident {
                fn set_name(&mut self, new_name: String) {
                    self.#keyname = new_name;
                }
            }
        },
    }
}

fn doc_attr(doc: &Option<String>) -> TokenStream {
    match doc {
        Some(text) => quote! { #[doc = #text] },
        None => quote! {},
    }
}
