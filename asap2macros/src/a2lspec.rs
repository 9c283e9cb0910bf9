use proc_macro2::{Delimiter, TokenStream, TokenTree};
use std::collections::{HashMap, HashSet};

use super::codegenerator::{
    self, DataType, EnumSpec, FieldKind, FieldSpec, Multiplicity, NodeForm, NodeSpec,
    Specification,
};
use super::util::*;

pub(crate) fn a2l_specification(tokens: TokenStream) -> TokenStream {
    let mut iter: TokenStreamIter = tokens.into_iter().peekable();
    let spec = parse_specification(&mut iter);

    consistency_check(&spec);

    codegenerator::generate(&spec)
}

//----------------------------------------------------------------------------------------------------

// attributes that may precede a declaration or an item
#[derive(Debug, Default)]
struct Attributes {
    doc: Option<String>,
    comment: Option<String>,
    newline: bool,
    key: bool,
    dict: bool,
}

fn parse_specification(token_iter: &mut TokenStreamIter) -> Specification {
    let mut spec = Specification::default();

    while token_iter.peek().is_some() {
        let attributes = parse_attributes(token_iter);
        let decltype = get_ident(token_iter);
        let name = get_ident(token_iter);
        let body = get_group(token_iter, Delimiter::Brace);
        let body_iter = &mut body.into_iter().peekable();

        let form = match &*decltype {
            "enum" => {
                spec.enums.push(parse_enum(name, attributes.doc, body_iter));
                continue;
            }
            "document" => NodeForm::Document,
            "block" => NodeForm::Block,
            "keyword" => NodeForm::Keyword,
            "anonymous" => NodeForm::Anonymous,
            _ => panic!(
                "expected one of document, block, keyword, anonymous or enum, but got {}",
                decltype
            ),
        };
        let fields = parse_node_items(&name, body_iter);
        spec.nodes.push(NodeSpec {
            name,
            form,
            doc: attributes.doc,
            fields,
        });
    }

    spec
}

// parse_attributes()
// doc comments ("///", which arrive as #[doc = "..."]) and the specification attributes
// #[comment = "..."], #[newline], #[key] and #[dict]
fn parse_attributes(token_iter: &mut TokenStreamIter) -> Attributes {
    let mut attributes = Attributes::default();

    while next_is_punct(token_iter, '#') {
        let attr_tokens = get_group(token_iter, Delimiter::Bracket);
        let attr_iter = &mut attr_tokens.into_iter().peekable();
        let attr_name = get_ident(attr_iter);
        match &*attr_name {
            "doc" => {
                require_punct(attr_iter, '=');
                let text = get_string(attr_iter);
                // multi-line doc comments arrive as one attribute per line
                attributes.doc = Some(match attributes.doc.take() {
                    Some(prev) => format!("{prev}\n{text}"),
                    None => text,
                });
            }
            "comment" => {
                require_punct(attr_iter, '=');
                attributes.comment = Some(get_string(attr_iter));
            }
            "newline" => attributes.newline = true,
            "key" => attributes.key = true,
            "dict" => attributes.dict = true,
            _ => panic!("unknown attribute #[{}]", attr_name),
        }
        assert!(
            attr_iter.next().is_none(),
            "unexpected extra tokens in attribute #[{}]",
            attr_name
        );
    }

    attributes
}

fn parse_enum(name: String, doc: Option<String>, token_iter: &mut TokenStreamIter) -> EnumSpec {
    let mut labels = Vec::new();
    while token_iter.peek().is_some() {
        labels.push(get_ident(token_iter));
        if token_iter.peek().is_some() {
            require_punct(token_iter, ',');
        }
    }
    EnumSpec { name, doc, labels }
}

fn parse_node_items(nodename: &str, token_iter: &mut TokenStreamIter) -> Vec<FieldSpec> {
    let mut fields = Vec::new();
    while token_iter.peek().is_some() {
        fields.push(parse_item(nodename, token_iter));
    }
    fields
}

// parse_item()
// one item has the form
//   attributes ordinal spec
// where spec is one of
//   type name [*]               a positional argument; "*" repeats it
//   hex type name [*]           a positional argument that is written in hex
//   "TAG" [hex] type [name]     an optional named element
//   "TAG" flag [name]           a presence flag
//   nametoken Enum name         the keyword of the statement
//   [-> BLOCK] [!|*] [as name]  a sub-node: mandatory, optional or a list (#[dict]: dictionary)
fn parse_item(nodename: &str, token_iter: &mut TokenStreamIter) -> FieldSpec {
    let attributes = parse_attributes(token_iter);
    let ordinal = get_integer(token_iter);

    let (kind, tag, varname) = match classify_item(token_iter) {
        ItemStart::Reference => parse_reference(token_iter, attributes.dict),
        ItemStart::Tag => {
            let tag = get_string(token_iter);
            let kind = if peek_ident_is(token_iter, "flag") {
                token_iter.next();
                FieldKind::Flag
            } else {
                let (datatype, hex) = parse_datatype(token_iter);
                FieldKind::Scalar {
                    datatype,
                    hex,
                    repeated: false,
                }
            };
            let varname = if peek_is_ident(token_iter) {
                get_ident(token_iter)
            } else {
                make_varname(&tag)
            };
            (kind, Some(tag), varname)
        }
        ItemStart::NameToken => {
            token_iter.next();
            let enumname = get_ident(token_iter);
            let varname = get_ident(token_iter);
            (FieldKind::NameToken(enumname), None, varname)
        }
        ItemStart::Type => {
            let (datatype, hex) = parse_datatype(token_iter);
            let varname = get_ident(token_iter);
            let repeated = next_is_punct(token_iter, '*');
            (
                FieldKind::Scalar {
                    datatype,
                    hex,
                    repeated,
                },
                None,
                varname,
            )
        }
        ItemStart::Invalid => panic!(
            "invalid item specification in {} after ordinal {}",
            nodename, ordinal
        ),
    };

    assert!(
        !attributes.dict
            || matches!(
                kind,
                FieldKind::Reference {
                    multiplicity: Multiplicity::Dictionary,
                    ..
                }
            ),
        "#[dict] can only be used on a reference with multiplicity *, in {}.{}",
        nodename,
        varname
    );

    FieldSpec {
        varname,
        ordinal,
        kind,
        tag,
        doc: attributes.doc,
        comment: attributes.comment,
        force_new_line: attributes.newline,
        is_key: attributes.key,
    }
}

enum ItemStart {
    Reference,
    Tag,
    NameToken,
    Type,
    Invalid,
}

fn classify_item(token_iter: &mut TokenStreamIter) -> ItemStart {
    match token_iter.peek() {
        Some(TokenTree::Group(_)) => ItemStart::Reference,
        Some(TokenTree::Literal(_)) => ItemStart::Tag,
        Some(TokenTree::Ident(ident)) if *ident == "nametoken" => ItemStart::NameToken,
        Some(TokenTree::Ident(_)) => ItemStart::Type,
        _ => ItemStart::Invalid,
    }
}

fn parse_datatype(token_iter: &mut TokenStreamIter) -> (DataType, bool) {
    let mut typename = get_ident(token_iter);
    let hex = typename == "hex";
    if hex {
        typename = get_ident(token_iter);
    }
    let datatype = match &*typename {
        "uint" => DataType::Uint,
        "ulong" => DataType::Ulong,
        "int64" => DataType::Int64,
        "double" => DataType::Double,
        "ident" => DataType::Ident,
        "string" => DataType::String,
        "verbatim" => DataType::Verbatim,
        _ => {
            assert!(
                typename.starts_with(|c: char| c.is_ascii_uppercase()),
                "unknown data type {}",
                typename
            );
            DataType::Enum(typename)
        }
    };
    (datatype, hex)
}

// parse_reference()
// a reference to another node looks like [-> BLOCKNAME]
fn parse_reference(
    token_iter: &mut TokenStreamIter,
    is_dict: bool,
) -> (FieldKind, Option<String>, String) {
    let reftokens = get_group(token_iter, Delimiter::Bracket);
    let ref_iter = &mut reftokens.into_iter().peekable();
    require_punct(ref_iter, '-');
    require_punct(ref_iter, '>');
    let target = get_ident(ref_iter);

    let multiplicity = if next_is_punct(token_iter, '!') {
        Multiplicity::One
    } else if next_is_punct(token_iter, '*') {
        if is_dict {
            Multiplicity::Dictionary
        } else {
            Multiplicity::List
        }
    } else {
        Multiplicity::ZeroOrOne
    };

    let varname = if peek_ident_is(token_iter, "as") {
        token_iter.next();
        get_ident(token_iter)
    } else {
        make_varname(&target)
    };

    (
        FieldKind::Reference {
            target,
            multiplicity,
        },
        None,
        varname,
    )
}

fn peek_ident_is(token_iter: &mut TokenStreamIter, text: &str) -> bool {
    matches!(token_iter.peek(), Some(TokenTree::Ident(ident)) if *ident == text)
}

//----------------------------------------------------------------------------------------------------

// consistency_check()
// make sure that every referenced node and enum exists, so that the generated code can compile.
// The full grammar rules are validated at run time when the schema registry is built.
fn consistency_check(spec: &Specification) {
    let mut nodes = HashMap::<&str, &NodeSpec>::new();
    for node in &spec.nodes {
        if nodes.insert(&node.name, node).is_some() {
            panic!("node {} is declared more than once", node.name);
        }
    }
    let mut enums = HashSet::<&str>::new();
    for enumspec in &spec.enums {
        if !enums.insert(&enumspec.name) {
            panic!("enum {} is declared more than once", enumspec.name);
        }
        let mut labels = HashSet::<&str>::new();
        for label in &enumspec.labels {
            if !labels.insert(label) {
                panic!("label {} is repeated in enum {}", label, enumspec.name);
            }
        }
    }

    let documents = spec
        .nodes
        .iter()
        .filter(|node| node.form == NodeForm::Document)
        .count();
    if documents != 1 {
        panic!("exactly one document must be declared, found {}", documents);
    }

    for node in &spec.nodes {
        let mut varnames = HashSet::<&str>::new();
        let mut keys = 0;
        for field in &node.fields {
            if !varnames.insert(&field.varname) {
                panic!("item {} is declared more than once in {}", field.varname, node.name);
            }
            if field.is_key {
                keys += 1;
            }
            match &field.kind {
                FieldKind::Reference { target, .. } => match nodes.get(&**target) {
                    None => panic!("reference to undeclared node {} in {}", target, node.name),
                    Some(refnode) if refnode.form == NodeForm::Document => {
                        panic!("the document {} cannot be referenced by {}", target, node.name)
                    }
                    Some(_) => {}
                },
                FieldKind::NameToken(enumname)
                | FieldKind::Scalar {
                    datatype: DataType::Enum(enumname),
                    ..
                } => {
                    if !enums.contains(&**enumname) {
                        panic!("enum {} used by {} is not declared", enumname, node.name);
                    }
                }
                _ => {}
            }
        }
        if keys > 1 {
            panic!("node {} has more than one #[key] item", node.name);
        }
    }
}
