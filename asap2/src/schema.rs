use fnv::FnvHashMap;
use std::fmt::Debug;
use std::sync::OnceLock;
use thiserror::Error;

use crate::specification::A2L_FILE_SCHEMA;

/// The shape of a node in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// the root of a file: a sequence of statements without enclosing keywords
    Document,
    /// `/begin KEYWORD ... /end KEYWORD`
    Block,
    /// a single statement
    Simple,
}

/// How a node announces itself in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fixed(&'static str),
    /// the keyword is the value of the node's name token field, e.g. `ALIGNMENT_BYTE 4`
    NameToken,
    /// no keyword at all; the node is recognized by its leading number
    None,
}

/// The type of a scalar value
#[derive(Debug, Clone, Copy)]
pub enum ValueType {
    U32,
    U64,
    I64,
    Float,
    Ident,
    Text,
    /// foreign text that is carried through without interpretation (A2ML, IF_DATA)
    Verbatim,
    Enum(&'static EnumSchema),
}

/// The closed vocabulary of an enumerated value
#[derive(Debug, PartialEq, Eq)]
pub struct EnumSchema {
    pub type_name: &'static str,
    pub labels: &'static [&'static str],
}

/// The grammar role of one field
#[derive(Debug, Clone, Copy)]
pub enum FieldRole {
    /// an unquoted value: number, identifier, enum label or verbatim text
    Argument(ValueType),
    QuotedString,
    /// an integer that is always written as `0x...`
    HexArgument(ValueType),
    /// the statement keyword doubles as the value of this field
    NameToken(&'static EnumSchema),
    /// a tag without a value; its presence means `true`
    PresenceFlag,
    /// a single sub-node, either optional or mandatory
    Child(&'static NodeSchema),
    /// sub-nodes in append order
    List(&'static NodeSchema),
    /// sub-nodes keyed by their name, written in creation order
    Dictionary(&'static NodeSchema),
}

/// Static description of one field of a node type
#[derive(Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// emission and match order; unique within a node type
    pub ordinal: u32,
    pub role: FieldRole,
    /// set for named elements like `DISPLAY_IDENTIFIER x` and for presence flags
    pub tag: Option<&'static str>,
    pub optional: bool,
    pub repeated: bool,
    pub force_new_line: bool,
    pub comment: Option<&'static str>,
}

/// Static description of a node type
pub struct NodeSchema {
    /// unique name of the node type, used in messages
    pub type_name: &'static str,
    pub keyword: Keyword,
    pub kind: NodeKind,
    pub fields: &'static [FieldDescriptor],
    /// index of the field that names the node inside a dictionary
    pub key_field: Option<usize>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("node type {node}: fields {field_1} and {field_2} both use the ordinal {ordinal}")]
    DuplicateOrdinal {
        node: &'static str,
        field_1: &'static str,
        field_2: &'static str,
        ordinal: u32,
    },

    #[error("node type {node}: {field} {reason}")]
    ConflictingFlags {
        node: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("node type {node}: keyword {keyword} is claimed by both {field_1} and {field_2}")]
    DuplicateKeyword {
        node: &'static str,
        keyword: &'static str,
        field_1: &'static str,
        field_2: &'static str,
    },

    #[error("node type {node} is stored in the dictionary {parent}.{field}, but it has no key field")]
    MissingKeyField {
        node: &'static str,
        parent: &'static str,
        field: &'static str,
    },

    #[error("the type name {node} is used by more than one node schema")]
    DuplicateTypeName { node: &'static str },
}

/// how the decoder recognizes a keyworded field
#[derive(Debug, Clone, Copy)]
pub(crate) enum Matcher {
    Tag(&'static str),
    Labels(&'static [&'static str]),
    Numeric,
}

/// validated, precomputed view of a `NodeSchema`
#[derive(Debug)]
pub(crate) struct SchemaEntry {
    pub(crate) schema: &'static NodeSchema,
    /// all field indices in ordinal order
    pub(crate) ordered: Vec<usize>,
    pub(crate) positional: Vec<usize>,
    pub(crate) keyworded: Vec<usize>,
    pub(crate) dispatch: Vec<(Matcher, usize)>,
}

/// All node schemas reachable from a root schema, validated
#[derive(Debug)]
pub struct SchemaRegistry {
    entries: FnvHashMap<&'static str, SchemaEntry>,
}

const KEYWORD_PSEUDO_FIELD: &str = "(keyword)";

impl ValueType {
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::U32 | ValueType::U64 | ValueType::I64)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ValueType::Float)
    }
}

impl EnumSchema {
    /// find the static label matching `text`
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<&'static str> {
        self.labels.iter().copied().find(|label| *label == text)
    }
}

impl FieldRole {
    /// the value type of a scalar role; `None` for flags and child references
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            FieldRole::Argument(vtype) | FieldRole::HexArgument(vtype) => Some(*vtype),
            FieldRole::QuotedString => Some(ValueType::Text),
            FieldRole::NameToken(enum_schema) => Some(ValueType::Enum(enum_schema)),
            FieldRole::PresenceFlag
            | FieldRole::Child(_)
            | FieldRole::List(_)
            | FieldRole::Dictionary(_) => None,
        }
    }

    #[must_use]
    pub fn child_schema(&self) -> Option<&'static NodeSchema> {
        match self {
            FieldRole::Child(schema) | FieldRole::List(schema) | FieldRole::Dictionary(schema) => {
                Some(schema)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_hex(&self) -> bool {
        matches!(self, FieldRole::HexArgument(_))
    }
}

impl FieldDescriptor {
    /// positional fields are bound by position; all others are found by their keyword
    #[must_use]
    pub fn is_positional(&self) -> bool {
        self.tag.is_none() && self.role.value_type().is_some()
    }
}

impl NodeSchema {
    /// the word used to name this node type in the text or in messages
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self.keyword {
            Keyword::Fixed(keyword) => keyword,
            Keyword::NameToken | Keyword::None => self.type_name,
        }
    }

    /// the labels that introduce a name token node
    pub(crate) fn name_token_labels(&self) -> &'static [&'static str] {
        self.fields
            .iter()
            .find_map(|field| match field.role {
                FieldRole::NameToken(enum_schema) => Some(enum_schema.labels),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

// a derived Debug would recurse through all child schemas
impl Debug for NodeSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSchema")
            .field("type_name", &self.type_name)
            .field("keyword", &self.keyword)
            .field("kind", &self.kind)
            .field(
                "fields",
                &self.fields.iter().map(|fd| fd.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Matcher {
    pub(crate) fn matches_word(&self, word: &str) -> bool {
        match self {
            Matcher::Tag(tag) => *tag == word,
            Matcher::Labels(labels) => labels.contains(&word),
            Matcher::Numeric => false,
        }
    }

    // returns the keyword that both matchers would accept
    fn overlap(&self, other: &Matcher) -> Option<&'static str> {
        match (self, other) {
            (Matcher::Numeric, Matcher::Numeric) => Some("(number)"),
            (Matcher::Tag(tag), other) | (other, Matcher::Tag(tag)) => {
                other.matches_word(tag).then_some(*tag)
            }
            (Matcher::Labels(labels), other) => {
                labels.iter().copied().find(|label| other.matches_word(label))
            }
            (Matcher::Numeric, Matcher::Labels(_)) => None,
        }
    }
}

impl SchemaEntry {
    pub(crate) fn find_keyword(&self, word: &str) -> Option<usize> {
        self.dispatch
            .iter()
            .find(|(matcher, _)| matcher.matches_word(word))
            .map(|(_, idx)| *idx)
    }

    pub(crate) fn find_numeric(&self) -> Option<usize> {
        self.dispatch
            .iter()
            .find(|(matcher, _)| matches!(matcher, Matcher::Numeric))
            .map(|(_, idx)| *idx)
    }
}

impl SchemaRegistry {
    /// collect and validate `root` and every node schema reachable from it
    ///
    /// # Errors
    ///
    /// The first inconsistency that is found is returned as a [`SchemaError`].
    pub fn build(root: &'static NodeSchema) -> Result<Self, SchemaError> {
        let mut entries = FnvHashMap::<&'static str, SchemaEntry>::default();
        let mut pending = vec![root];

        while let Some(schema) = pending.pop() {
            if let Some(existing) = entries.get(schema.type_name) {
                if std::ptr::eq(existing.schema, schema) {
                    continue;
                }
                return Err(SchemaError::DuplicateTypeName {
                    node: schema.type_name,
                });
            }

            let entry = build_entry(schema)?;
            pending.extend(
                schema
                    .fields
                    .iter()
                    .filter_map(|field| field.role.child_schema()),
            );
            entries.insert(schema.type_name, entry);
        }

        Ok(Self { entries })
    }

    /// true if exactly this schema is part of the registry
    #[must_use]
    pub fn contains(&self, schema: &NodeSchema) -> bool {
        self.entry(schema).is_some()
    }

    /// the number of node types in the registry
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entry(&self, schema: &NodeSchema) -> Option<&SchemaEntry> {
        self.entries
            .get(schema.type_name)
            .filter(|entry| std::ptr::eq(entry.schema, schema))
    }
}

/// The registry of all ASAP2 node types
///
/// It is built and validated on first use; later calls return the cached result.
///
/// # Errors
///
/// A [`SchemaError`] if the built-in node specification is inconsistent.
pub fn registry() -> Result<&'static SchemaRegistry, SchemaError> {
    static REGISTRY: OnceLock<Result<SchemaRegistry, SchemaError>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| SchemaRegistry::build(&A2L_FILE_SCHEMA))
        .as_ref()
        .map_err(Clone::clone)
}

fn build_entry(schema: &'static NodeSchema) -> Result<SchemaEntry, SchemaError> {
    let node = schema.type_name;
    let fields = schema.fields;
    let conflict = |field: &'static str, reason: &'static str| SchemaError::ConflictingFlags {
        node,
        field,
        reason,
    };

    let mut ordered: Vec<usize> = (0..fields.len()).collect();
    ordered.sort_by_key(|idx| fields[*idx].ordinal);
    for pair in ordered.windows(2) {
        let (first, second) = (&fields[pair[0]], &fields[pair[1]]);
        if first.ordinal == second.ordinal {
            return Err(SchemaError::DuplicateOrdinal {
                node,
                field_1: first.name,
                field_2: second.name,
                ordinal: first.ordinal,
            });
        }
    }

    for field in fields {
        check_field_flags(field).map_err(|reason| conflict(field.name, reason))?;
    }

    let positional: Vec<usize> = ordered
        .iter()
        .copied()
        .filter(|idx| fields[*idx].is_positional())
        .collect();
    let keyworded: Vec<usize> = ordered
        .iter()
        .copied()
        .filter(|idx| !fields[*idx].is_positional())
        .collect();

    if let (Some(last_pos), Some(first_kw)) = (positional.last(), keyworded.first()) {
        if fields[*last_pos].ordinal > fields[*first_kw].ordinal {
            return Err(conflict(
                fields[*last_pos].name,
                "is an untagged argument that follows a keyworded field",
            ));
        }
    }
    for (pos, idx) in positional.iter().enumerate() {
        if fields[*idx].repeated && pos + 1 != positional.len() {
            return Err(conflict(
                fields[*idx].name,
                "is repeated but is not the last positional field",
            ));
        }
    }

    check_node_form(schema, &positional, &keyworded)?;

    if let Some(key) = schema.key_field {
        let Some(key_field) = fields.get(key) else {
            return Err(conflict("(key)", "key field index is out of range"));
        };
        let usable = !key_field.optional
            && !key_field.repeated
            && key_field.tag.is_none()
            && matches!(
                key_field.role,
                FieldRole::NameToken(_)
                    | FieldRole::QuotedString
                    | FieldRole::Argument(ValueType::Ident | ValueType::Verbatim)
            );
        if !usable {
            return Err(conflict(key_field.name, "cannot be used as a key"));
        }
    }

    let trailing_numeric_list = positional.last().is_some_and(|idx| {
        fields[*idx].repeated
            && fields[*idx]
                .role
                .value_type()
                .is_some_and(|vtype| vtype.is_numeric())
    });

    let mut dispatch: Vec<(Matcher, usize)> = Vec::with_capacity(keyworded.len());
    for idx in &keyworded {
        let field = &fields[*idx];
        let matcher = match field.role.child_schema() {
            Some(child) => match child.keyword {
                Keyword::Fixed(keyword) => Matcher::Tag(keyword),
                Keyword::NameToken => Matcher::Labels(child.name_token_labels()),
                Keyword::None => Matcher::Numeric,
            },
            // check_field_flags guarantees the tag of keyworded scalars and flags
            None => Matcher::Tag(field.tag.unwrap_or_default()),
        };

        for (existing, other_idx) in &dispatch {
            if let Some(keyword) = existing.overlap(&matcher) {
                return Err(SchemaError::DuplicateKeyword {
                    node,
                    keyword,
                    field_1: fields[*other_idx].name,
                    field_2: field.name,
                });
            }
        }
        if matches!(matcher, Matcher::Numeric) && trailing_numeric_list {
            return Err(conflict(
                field.name,
                "holds keyless nodes, but follows a repeated numeric argument",
            ));
        }
        if let FieldRole::Dictionary(child) = field.role {
            if child.key_field.is_none() {
                return Err(SchemaError::MissingKeyField {
                    node: child.type_name,
                    parent: node,
                    field: field.name,
                });
            }
        }

        dispatch.push((matcher, *idx));
    }

    Ok(SchemaEntry {
        schema,
        ordered,
        positional,
        keyworded,
        dispatch,
    })
}

fn check_field_flags(field: &FieldDescriptor) -> Result<(), &'static str> {
    match field.role {
        FieldRole::HexArgument(vtype) if !vtype.is_integer() => {
            Err("is written as hex, but its type is not an integer")
        }
        FieldRole::NameToken(_) => {
            if field.tag.is_some() || field.optional || field.repeated {
                Err("is a name token, which must be a plain mandatory field")
            } else {
                Ok(())
            }
        }
        FieldRole::Argument(vtype) | FieldRole::HexArgument(vtype) => {
            check_scalar_flags(field, vtype.is_numeric())
        }
        FieldRole::QuotedString => check_scalar_flags(field, true),
        FieldRole::PresenceFlag => {
            if field.tag.is_none() {
                Err("is a presence flag without a tag")
            } else if field.optional || field.repeated {
                Err("is a presence flag, which cannot be optional or repeated")
            } else {
                Ok(())
            }
        }
        FieldRole::Child(_) | FieldRole::List(_) | FieldRole::Dictionary(_) => {
            if field.tag.is_some() {
                Err("references a child node, so it cannot carry a tag")
            } else if field.repeated {
                Err("references a child node, so it cannot be marked as repeated")
            } else if field.optional && !matches!(field.role, FieldRole::Child(_)) {
                Err("is a child collection, so it cannot be marked as optional")
            } else {
                Ok(())
            }
        }
    }
}

fn check_scalar_flags(field: &FieldDescriptor, repeatable: bool) -> Result<(), &'static str> {
    if field.tag.is_none() && field.optional {
        Err("is an untagged argument, so it cannot be optional")
    } else if field.tag.is_some() && field.repeated {
        Err("is a tagged value, so it cannot be repeated")
    } else if field.repeated && !repeatable {
        Err("is repeated, but only numbers and quoted strings can be repeated")
    } else {
        Ok(())
    }
}

fn check_node_form(
    schema: &'static NodeSchema,
    positional: &[usize],
    keyworded: &[usize],
) -> Result<(), SchemaError> {
    let node = schema.type_name;
    let fields = schema.fields;
    let conflict = |field: &'static str, reason: &'static str| SchemaError::ConflictingFlags {
        node,
        field,
        reason,
    };
    let name_tokens: Vec<usize> = (0..fields.len())
        .filter(|idx| matches!(fields[*idx].role, FieldRole::NameToken(_)))
        .collect();

    match schema.kind {
        NodeKind::Document => {
            if let Some(idx) = positional.first() {
                return Err(conflict(fields[*idx].name, "is positional inside a document"));
            }
            if schema.keyword != Keyword::None {
                return Err(conflict(KEYWORD_PSEUDO_FIELD, "a document cannot have a keyword"));
            }
        }
        NodeKind::Simple => {
            if let Some(idx) = keyworded.first() {
                return Err(conflict(fields[*idx].name, "is keyworded inside a simple node"));
            }
        }
        NodeKind::Block => {
            if !matches!(schema.keyword, Keyword::Fixed(_)) {
                return Err(conflict(KEYWORD_PSEUDO_FIELD, "a block needs a fixed keyword"));
            }
        }
    }

    match schema.keyword {
        Keyword::NameToken => {
            if schema.kind != NodeKind::Simple {
                return Err(conflict(
                    KEYWORD_PSEUDO_FIELD,
                    "a name token node must be a simple node",
                ));
            }
            if name_tokens.len() != 1 || positional.first() != name_tokens.first() {
                return Err(conflict(
                    KEYWORD_PSEUDO_FIELD,
                    "a name token node needs exactly one name token as its first field",
                ));
            }
        }
        Keyword::None if schema.kind != NodeKind::Document => {
            let leading_number = positional.first().is_some_and(|idx| {
                !fields[*idx].repeated
                    && fields[*idx]
                        .role
                        .value_type()
                        .is_some_and(|vtype| vtype.is_numeric())
            });
            if !leading_number {
                return Err(conflict(
                    KEYWORD_PSEUDO_FIELD,
                    "a keyless node must start with a single numeric argument",
                ));
            }
        }
        _ => {
            if let Some(idx) = name_tokens.first() {
                return Err(conflict(
                    fields[*idx].name,
                    "is a name token, but the node has its own keyword",
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn field(name: &'static str, ordinal: u32, role: FieldRole) -> FieldDescriptor {
        FieldDescriptor {
            name,
            ordinal,
            role,
            tag: None,
            optional: false,
            repeated: false,
            force_new_line: false,
            comment: None,
        }
    }

    const fn block(
        type_name: &'static str,
        fields: &'static [FieldDescriptor],
        key_field: Option<usize>,
    ) -> NodeSchema {
        NodeSchema {
            type_name,
            keyword: Keyword::Fixed(type_name),
            kind: NodeKind::Block,
            fields,
            key_field,
        }
    }

    const fn root(fields: &'static [FieldDescriptor]) -> NodeSchema {
        NodeSchema {
            type_name: "ROOT",
            keyword: Keyword::None,
            kind: NodeKind::Document,
            fields,
            key_field: None,
        }
    }

    // two string fields sharing one ordinal
    static NAME_VALUE_FIELDS: [FieldDescriptor; 2] = [
        field("name", 1, FieldRole::QuotedString),
        field("value", 1, FieldRole::QuotedString),
    ];
    static NAME_VALUE: NodeSchema = NodeSchema {
        type_name: "SYSTEM_CONSTANT",
        keyword: Keyword::Fixed("SYSTEM_CONSTANT"),
        kind: NodeKind::Simple,
        fields: &NAME_VALUE_FIELDS,
        key_field: Some(0),
    };
    static DUP_ORDINAL_ROOT_FIELDS: [FieldDescriptor; 1] =
        [field("constants", 0, FieldRole::Dictionary(&NAME_VALUE))];
    static DUP_ORDINAL_ROOT: NodeSchema = root(&DUP_ORDINAL_ROOT_FIELDS);

    static HEX_FLOAT_FIELDS: [FieldDescriptor; 1] =
        [field("limit", 0, FieldRole::HexArgument(ValueType::Float))];
    static HEX_FLOAT: NodeSchema = block("HEX_FLOAT", &HEX_FLOAT_FIELDS, None);

    static OPTIONAL_ARG_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor {
        optional: true,
        ..field("value", 0, FieldRole::Argument(ValueType::U32))
    }];
    static OPTIONAL_ARG: NodeSchema = block("OPTIONAL_ARG", &OPTIONAL_ARG_FIELDS, None);

    static LATE_ARG_FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor {
            tag: Some("FLAG"),
            ..field("flag", 0, FieldRole::PresenceFlag)
        },
        field("value", 1, FieldRole::Argument(ValueType::U32)),
    ];
    static LATE_ARG: NodeSchema = block("LATE_ARG", &LATE_ARG_FIELDS, None);

    static UNKEYED_FIELDS: [FieldDescriptor; 1] =
        [field("text", 0, FieldRole::QuotedString)];
    static UNKEYED: NodeSchema = block("UNKEYED", &UNKEYED_FIELDS, None);
    static NO_KEY_ROOT_FIELDS: [FieldDescriptor; 1] =
        [field("items", 0, FieldRole::Dictionary(&UNKEYED))];
    static NO_KEY_ROOT: NodeSchema = root(&NO_KEY_ROOT_FIELDS);

    static DUP_KEYWORD_FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor {
            tag: Some("UNKEYED"),
            optional: true,
            ..field("tagged", 0, FieldRole::QuotedString)
        },
        FieldDescriptor {
            optional: true,
            ..field("child", 1, FieldRole::Child(&UNKEYED))
        },
    ];
    static DUP_KEYWORD: NodeSchema = root(&DUP_KEYWORD_FIELDS);

    // a second schema with the type name "UNKEYED", reached through another keyword
    static UNKEYED_TWIN: NodeSchema = NodeSchema {
        keyword: Keyword::Fixed("UNKEYED_TWIN"),
        ..block("UNKEYED", &UNKEYED_FIELDS, None)
    };
    static TWIN_ROOT_FIELDS: [FieldDescriptor; 2] = [
        field("first", 0, FieldRole::List(&UNKEYED)),
        field("second", 1, FieldRole::List(&UNKEYED_TWIN)),
    ];
    static TWIN_ROOT: NodeSchema = root(&TWIN_ROOT_FIELDS);

    static KEYLESS_TEXT_FIELDS: [FieldDescriptor; 1] =
        [field("text", 0, FieldRole::QuotedString)];
    static KEYLESS_TEXT: NodeSchema = NodeSchema {
        type_name: "KeylessText",
        keyword: Keyword::None,
        kind: NodeKind::Simple,
        fields: &KEYLESS_TEXT_FIELDS,
        key_field: None,
    };

    #[test]
    fn builtin_registry_is_valid() {
        let reg = registry().unwrap();
        assert!(reg.contains(&A2L_FILE_SCHEMA));
        assert!(reg.contains(&crate::specification::MEASUREMENT_SCHEMA));
        assert!(reg.contains(&crate::specification::VTAB_ENTRY_SCHEMA));
        assert!(reg.len() > 30);
        // cached
        assert!(std::ptr::eq(reg, registry().unwrap()));
    }

    #[test]
    fn duplicate_ordinal() {
        let result = SchemaRegistry::build(&DUP_ORDINAL_ROOT);
        assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicateOrdinal {
                node: "SYSTEM_CONSTANT",
                field_1: "name",
                field_2: "value",
                ordinal: 1
            }
        );
    }

    #[test]
    fn conflicting_flags() {
        let result = build_entry(&HEX_FLOAT);
        assert!(matches!(
            result,
            Err(SchemaError::ConflictingFlags { field: "limit", .. })
        ));

        let result = build_entry(&OPTIONAL_ARG);
        assert!(matches!(
            result,
            Err(SchemaError::ConflictingFlags { field: "value", .. })
        ));

        let result = build_entry(&LATE_ARG);
        assert!(matches!(
            result,
            Err(SchemaError::ConflictingFlags { field: "value", .. })
        ));

        let result = build_entry(&KEYLESS_TEXT);
        assert!(matches!(
            result,
            Err(SchemaError::ConflictingFlags {
                field: KEYWORD_PSEUDO_FIELD,
                ..
            })
        ));
    }

    #[test]
    fn missing_key_field() {
        let result = SchemaRegistry::build(&NO_KEY_ROOT);
        assert!(matches!(
            result,
            Err(SchemaError::MissingKeyField {
                node: "UNKEYED",
                parent: "ROOT",
                field: "items"
            })
        ));
    }

    #[test]
    fn duplicate_keyword() {
        let result = SchemaRegistry::build(&DUP_KEYWORD);
        assert!(matches!(
            result,
            Err(SchemaError::DuplicateKeyword {
                keyword: "UNKEYED",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_type_name() {
        let result = SchemaRegistry::build(&TWIN_ROOT);
        assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicateTypeName { node: "UNKEYED" }
        );
    }

    #[test]
    fn entry_order_and_dispatch() {
        let reg = registry().unwrap();
        let entry = reg.entry(&crate::specification::MEASUREMENT_SCHEMA).unwrap();
        // name, long identifier, datatype, conversion, resolution, accuracy, limits
        assert_eq!(entry.positional.len(), 8);
        assert_eq!(
            entry.ordered.len(),
            entry.positional.len() + entry.keyworded.len()
        );
        let bit_mask = entry.find_keyword("BIT_MASK").unwrap();
        assert_eq!(entry.schema.fields[bit_mask].name, "bit_mask");
        assert!(entry.find_keyword("ANNOTATION_TEXT").is_none());
        assert!(entry.find_numeric().is_none());

        let entry = reg.entry(&crate::specification::MOD_COMMON_SCHEMA).unwrap();
        let alignment = entry.find_keyword("ALIGNMENT_FLOAT32_IEEE").unwrap();
        assert_eq!(entry.schema.fields[alignment].name, "alignment");

        let entry = reg.entry(&crate::specification::COMPU_VTAB_SCHEMA).unwrap();
        let entries = entry.find_numeric().unwrap();
        assert_eq!(entry.schema.fields[entries].name, "entries");
    }
}
