use fnv::FnvHashSet;
use thiserror::Error;

use crate::node::{FieldRef, Node, ScalarRef};
use crate::schema::{
    FieldDescriptor, FieldRole, Keyword, NodeKind, SchemaEntry, SchemaError, SchemaRegistry,
    ValueType, registry,
};
use crate::tokenizer::{is_identchar, is_valid_verbatim};
use crate::writer::Writer;

const MAX_IDENT: usize = 1024;

/// Settings for the encoder
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// write the declared field comments, e.g. `/* Name */ RPM`
    pub comments: bool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("the node schema is invalid: {schema_error}")]
    SchemaError { schema_error: SchemaError },

    #[error("node type {node} is not part of the schema registry")]
    UnknownNodeType { node: String },

    #[error("{block}.{field}: \"{text}\" is not a valid identifier")]
    InvalidIdentifier {
        block: String,
        field: String,
        text: String,
    },

    #[error("{block}.{field}: the value {value} cannot be written")]
    NonFiniteNumber {
        block: String,
        field: String,
        value: f64,
    },

    #[error("{block}.{field}: the text would not end at /end {block}")]
    InvalidVerbatimText { block: String, field: String },

    #[error("{block}.{field}: more than one entry is named \"{name}\"")]
    DuplicateName {
        block: String,
        field: String,
        name: String,
    },
}

/// encode a node and everything below it
///
/// The whole tree is checked before any text is produced, so a failed call leaves no partial
/// output. A document node is terminated by a line break.
///
/// # Errors
///
/// An [`EncodeError`] if the tree contains a value that cannot be written in a way that reads back
/// unchanged.
pub fn encode(node: &dyn Node, options: &EncodeOptions) -> Result<String, EncodeError> {
    let registry = registry().map_err(|schema_error| EncodeError::SchemaError { schema_error })?;
    check_node(registry, node)?;

    let mut writer = Writer::new(0);
    encode_node(&mut writer, registry, node, options)?;
    let mut outstring = writer.finish();
    if node.schema().kind == NodeKind::Document {
        outstring.push('\n');
    }
    Ok(outstring)
}

fn lookup<'r>(
    registry: &'r SchemaRegistry,
    node: &dyn Node,
) -> Result<&'r SchemaEntry, EncodeError> {
    registry
        .entry(node.schema())
        .ok_or_else(|| EncodeError::UnknownNodeType {
            node: node.schema().type_name.to_string(),
        })
}

// check_node()
// Verify that every value of the tree can be written and read back unchanged
fn check_node(registry: &SchemaRegistry, node: &dyn Node) -> Result<(), EncodeError> {
    let entry = lookup(registry, node)?;
    let schema = entry.schema;

    for idx in &entry.ordered {
        let field = &schema.fields[*idx];
        match node.field(*idx) {
            FieldRef::Absent | FieldRef::Flag(_) => {}
            FieldRef::Scalar(value) => check_scalar(schema.type_name, field, value)?,
            FieldRef::Repeated(values) => {
                for value in values {
                    check_scalar(schema.type_name, field, value)?;
                }
            }
            FieldRef::Node(child) => check_node(registry, child)?,
            FieldRef::Nodes(children) => {
                if let FieldRole::Dictionary(_) = field.role {
                    let mut names = FnvHashSet::<&str>::default();
                    for child in &children {
                        let name = child.key().unwrap_or_default();
                        if !names.insert(name) {
                            return Err(EncodeError::DuplicateName {
                                block: schema.type_name.to_string(),
                                field: field.name.to_string(),
                                name: name.to_string(),
                            });
                        }
                    }
                }
                for child in children {
                    check_node(registry, child)?;
                }
            }
        }
    }

    Ok(())
}

fn check_scalar(
    block: &'static str,
    field: &FieldDescriptor,
    value: ScalarRef,
) -> Result<(), EncodeError> {
    match (field.role.value_type(), value) {
        (Some(ValueType::Ident), ScalarRef::Text(text)) if !is_valid_identifier(text) => {
            Err(EncodeError::InvalidIdentifier {
                block: block.to_string(),
                field: field.name.to_string(),
                text: text.to_string(),
            })
        }
        (Some(ValueType::Verbatim), ScalarRef::Text(text)) if !is_valid_verbatim(text) => {
            Err(EncodeError::InvalidVerbatimText {
                block: block.to_string(),
                field: field.name.to_string(),
            })
        }
        (_, ScalarRef::Float(value)) if !value.is_finite() => Err(EncodeError::NonFiniteNumber {
            block: block.to_string(),
            field: field.name.to_string(),
            value,
        }),
        _ => Ok(()),
    }
}

pub(crate) fn is_valid_identifier(text: &str) -> bool {
    text.len() <= MAX_IDENT
        && text
            .as_bytes()
            .first()
            .is_some_and(|first| !first.is_ascii_digit())
        && text.bytes().all(is_identchar)
}

fn encode_node(
    writer: &mut Writer,
    registry: &SchemaRegistry,
    node: &dyn Node,
    options: &EncodeOptions,
) -> Result<(), EncodeError> {
    let entry = lookup(registry, node)?;
    let schema = entry.schema;

    match schema.kind {
        NodeKind::Document => {
            encode_keyworded(writer, registry, entry, node, options)?;
        }
        NodeKind::Block => {
            writer.new_line();
            writer.add_str("/begin");
            writer.add_str(schema.display_name());
            encode_positional(writer, entry, node, options);
            writer.indent();
            encode_keyworded(writer, registry, entry, node, options)?;
            writer.dedent();
            writer.new_line();
            writer.add_str("/end");
            writer.add_str(schema.display_name());
        }
        NodeKind::Simple => {
            writer.new_line();
            if let Keyword::Fixed(keyword) = schema.keyword {
                writer.add_str(keyword);
            }
            // the keyword of a name token node is written as its first positional value
            encode_positional(writer, entry, node, options);
        }
    }

    Ok(())
}

// encode_positional()
// Write the untagged values of a node on the statement line. Fields with force_new_line, and
// commented fields if comments are enabled, are placed on their own lines one level deeper.
fn encode_positional(
    writer: &mut Writer,
    entry: &SchemaEntry,
    node: &dyn Node,
    options: &EncodeOptions,
) {
    for idx in &entry.positional {
        let field = &entry.schema.fields[*idx];
        let comment = field.comment.filter(|_| options.comments);
        let values = match node.field(*idx) {
            FieldRef::Scalar(value) => vec![value],
            FieldRef::Repeated(values) => values,
            _ => continue,
        };

        writer.indent();
        if let Some(comment) = comment {
            writer.new_line();
            writer.add_comment(comment);
        }
        for (pos, value) in values.into_iter().enumerate() {
            if field.force_new_line && (pos > 0 || comment.is_none()) {
                writer.new_line();
            }
            write_scalar(writer, field, value);
        }
        writer.dedent();
    }
}

fn encode_keyworded(
    writer: &mut Writer,
    registry: &SchemaRegistry,
    entry: &SchemaEntry,
    node: &dyn Node,
    options: &EncodeOptions,
) -> Result<(), EncodeError> {
    for idx in &entry.keyworded {
        let field = &entry.schema.fields[*idx];
        match node.field(*idx) {
            FieldRef::Absent | FieldRef::Flag(false) => {}
            FieldRef::Flag(true) => {
                writer.new_line();
                writer.add_str(field.tag.unwrap_or_default());
            }
            FieldRef::Scalar(value) => {
                writer.new_line();
                writer.add_str(field.tag.unwrap_or_default());
                write_scalar(writer, field, value);
            }
            FieldRef::Repeated(values) => {
                // tagged values cannot be repeated, this only happens for a hand-built schema
                for value in values {
                    writer.new_line();
                    writer.add_str(field.tag.unwrap_or_default());
                    write_scalar(writer, field, value);
                }
            }
            FieldRef::Node(child) => {
                write_field_comment(writer, field, options);
                encode_node(writer, registry, child, options)?;
            }
            FieldRef::Nodes(children) => {
                if !children.is_empty() {
                    write_field_comment(writer, field, options);
                }
                encode_children(writer, registry, field, children, options)?;
            }
        }
    }
    Ok(())
}

fn encode_children(
    writer: &mut Writer,
    registry: &SchemaRegistry,
    field: &FieldDescriptor,
    mut children: Vec<&dyn Node>,
    options: &EncodeOptions,
) -> Result<(), EncodeError> {
    if let FieldRole::Dictionary(_) = field.role {
        // dictionaries are written in creation order, lists in the order of their elements
        children.sort_by_key(|child| child.sequence());
    }
    for child in children {
        encode_node(writer, registry, child, options)?;
    }
    Ok(())
}

fn write_field_comment(writer: &mut Writer, field: &FieldDescriptor, options: &EncodeOptions) {
    if let Some(comment) = field.comment.filter(|_| options.comments) {
        writer.new_line();
        writer.add_comment(comment);
    }
}

fn write_scalar(writer: &mut Writer, field: &FieldDescriptor, value: ScalarRef) {
    let is_hex = field.role.is_hex();
    match value {
        ScalarRef::UInt(num) => writer.add_integer(num, is_hex),
        ScalarRef::Int(num) => writer.add_integer(num, is_hex),
        ScalarRef::Float(num) => writer.add_float(num),
        ScalarRef::Label(label) => writer.add_str(label),
        ScalarRef::Text(text) => match field.role {
            FieldRole::QuotedString => writer.add_quoted_string(text),
            FieldRole::Argument(ValueType::Verbatim) => writer.add_verbatim(text),
            _ => writer.add_str(text),
        },
    }
}
