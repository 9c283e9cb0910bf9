use fnv::FnvHashMap;
use std::fmt::Display;
use thiserror::Error;

use crate::node::NodeType;
use crate::schema::{FieldRole, Keyword, NodeKind, NodeSchema, SchemaEntry, SchemaRegistry, ValueType};
use crate::sequence::BuildContext;
use crate::tokenizer::{A2lToken, A2lTokenType, TokenResult};
use crate::value::{RawNode, Value};
use crate::{A2lError, Filename};

const MAX_IDENT: usize = 1024;

struct TokenIter<'a> {
    tokens: &'a [A2lToken],
    pos: usize,
}

/// The versions of the ASAP2 standard that are recognized in `ASAP2_VERSION`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum A2lVersion {
    V1_5_0,
    V1_5_1,
    V1_6_0,
    V1_6_1,
    V1_7_0,
    V1_7_1,
}

pub(crate) struct ParserState<'a> {
    token_cursor: TokenIter<'a>,
    filedata: &'a [String],
    filenames: &'a [Filename],
    last_token_position: u32,
    log_msgs: &'a mut Vec<A2lError>,
    build_context: &'a mut BuildContext,
    registry: &'static SchemaRegistry,
}

/// describes the current parser context, giving the name of the current element and its file and line number
#[derive(Debug, Clone)]
pub(crate) struct ParseContext {
    pub(crate) element: String,
    pub(crate) fileid: usize,
    pub(crate) line: u32,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("{filename}:{error_line}: expected token of type {expected_ttype:?}, got {actual_ttype:?} (\"{actual_text}\") inside block {element} starting on line {block_line}")]
    UnexpectedTokenType {
        filename: String,
        error_line: u32,
        block_line: u32,
        element: String,
        actual_ttype: A2lTokenType,
        actual_text: String,
        expected_ttype: A2lTokenType,
    },

    #[error("{filename}:{error_line}: string \"{numstr}\" in block {block} could not be interpreted as a number")]
    MalformedNumber {
        filename: String,
        error_line: u32,
        numstr: String,
        block: String,
    },

    #[error("{filename}:{error_line}: expected a hex number like 0x1F, but found \"{numstr}\" in block {block} starting on line {block_line}")]
    ExpectedHexNumber {
        filename: String,
        error_line: u32,
        numstr: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: expected an enum value, but \"{enumtxt}\" is not part of the enum (located inside block {block} starting on line {block_line})")]
    InvalidEnumValue {
        filename: String,
        error_line: u32,
        enumtxt: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: optional element {tag} occurs too often within block {block} starting on line {block_line}")]
    InvalidMultiplicityTooMany {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: element {tag} is missing in block {block} starting on line {block_line}")]
    InvalidMultiplicityNotPresent {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: element {tag} in block {block} starting on line {block_line} must be enclosed in /begin and /end")]
    IncorrectBlockError {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: element {tag} in block {block} starting on line {block_line} may not be enclosed in /begin and /end")]
    IncorrectKeywordError {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: Wrong end tag {tag} found at the end of block {block} starting on line {block_line}")]
    IncorrectEndTag {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: Unknown sub-block {tag} found inside block {block} starting on line {block_line}")]
    UnknownSubBlock {
        filename: String,
        error_line: u32,
        tag: String,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: encountered end of file while not done parsing block {block} starting on line {block_line}")]
    UnexpectedEOF {
        filename: String,
        error_line: u32,
        block: String,
        block_line: u32,
    },

    #[error("{filename}:{error_line}: /begin in block {block} is not followed by a valid tag")]
    InvalidBegin {
        filename: String,
        error_line: u32,
        block: String,
    },

    #[error(
        "{filename}:{error_line}: The string '{ident}' in block {block} is not a valid identifier"
    )]
    InvalidIdentifier {
        filename: String,
        error_line: u32,
        ident: String,
        block: String,
    },

    #[error("{filename}: {block} blocks on line {line_1} and {line_2} both use the name \"{name}\"")]
    DuplicateName {
        filename: String,
        block: String,
        name: String,
        line_1: u32,
        line_2: u32,
    },

    /// `AdditionalTokensError` parsing finished without consuming all data in the file
    #[error("{filename}:{error_line}: unexpected additional data \"{text}...\" after parsed a2l file content")]
    AdditionalTokensError {
        filename: String,
        error_line: u32,
        text: String,
    },

    /// the decoded values do not fit the node type; this indicates an inconsistent node specification
    #[error("line {line}: the value of {block}.{field} does not match its declared type")]
    ValueMismatch {
        block: String,
        field: String,
        line: u32,
    },

    #[error("node type {node} is not part of the schema registry")]
    UnknownNodeType { node: String },

    /// `MissingVersionInfo`: no version information in the file
    #[error("File is not recognized as an a2l file. Mandatory version information is missing.")]
    MissingVersionInfo,

    /// The version number in the file does not correspond to a known A2L specification
    #[error("File has invalid version {major} {minor}")]
    InvalidVersion { major: u16, minor: u16 },
}

// it pretends to be an Iter, but it really isn't
impl<'a> TokenIter<'a> {
    fn next(&mut self) -> Option<&'a A2lToken> {
        let item = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn peek(&self) -> Option<&'a A2lToken> {
        self.tokens.get(self.pos)
    }
}

impl<'a> ParserState<'a> {
    pub(crate) fn new<'b>(
        tokenresult: &'b TokenResult,
        log_msgs: &'b mut Vec<A2lError>,
        build_context: &'b mut BuildContext,
        registry: &'static SchemaRegistry,
    ) -> ParserState<'b> {
        ParserState {
            token_cursor: TokenIter {
                tokens: &tokenresult.tokens,
                pos: 0,
            },
            filedata: &tokenresult.filedata,
            filenames: &tokenresult.filenames,
            last_token_position: 0,
            log_msgs,
            build_context,
            registry,
        }
    }

    /// decode a whole file. A missing or unknown `ASAP2_VERSION` only causes a warning.
    pub(crate) fn parse_file<T: NodeType>(&mut self) -> Result<T, DecodeError> {
        self.check_version();
        self.parse_fragment()
    }

    /// decode exactly one node of type `T`; the input must end after it
    pub(crate) fn parse_fragment<T: NodeType>(&mut self) -> Result<T, DecodeError> {
        let schema = T::node_schema();
        let entry = self.entry_for(schema)?;
        let context = ParseContext {
            element: schema.display_name().to_string(),
            fileid: self.peek_token().map_or(0, |tok| tok.fileid),
            line: self.peek_token().map_or(1, |tok| tok.line),
        };

        let raw = match schema.kind {
            NodeKind::Document => self.parse_document(entry, &context)?,
            NodeKind::Block => {
                self.expect_token(&context, A2lTokenType::Begin)?;
                self.expect_keyword(&context, schema.display_name())?;
                self.parse_block(entry, &context)?
            }
            NodeKind::Simple => {
                if let Keyword::Fixed(keyword) = schema.keyword {
                    self.expect_keyword(&context, keyword)?;
                }
                self.parse_simple(entry, &context)?
            }
        };

        // make sure this is the end of the input, i.e. no additional data after the parsed data
        if let Some(token) = self.peek_token() {
            return Err(DecodeError::AdditionalTokensError {
                filename: self.filenames[token.fileid].to_string(),
                error_line: token.line,
                text: self.get_token_text(token).to_owned(),
            });
        }

        T::from_raw(raw)
    }

    // check_version()
    // Starting with 1.60, the ASAP2_VERSION element is mandatory. Old files without it can still be
    // loaded, so a missing or unknown version is reported as a warning.
    fn check_version(&mut self) {
        let tokens = self.token_cursor.tokens;
        let version = match tokens {
            [tag, major, minor, ..]
                if tag.ttype == A2lTokenType::Identifier
                    && self.get_token_text(tag) == "ASAP2_VERSION" =>
            {
                let major = self.get_token_text(major).parse::<u16>();
                let minor = self.get_token_text(minor).parse::<u16>();
                match (major, minor) {
                    (Ok(major), Ok(minor)) => A2lVersion::new(major, minor).map(|_| ()),
                    // malformed numbers are reported by the decoder itself
                    _ => Ok(()),
                }
            }
            _ => Err(DecodeError::MissingVersionInfo),
        };
        if let Err(warning) = version {
            self.log_warning(warning);
        }
    }

    fn entry_for(&self, schema: &'static NodeSchema) -> Result<&'static SchemaEntry, DecodeError> {
        self.registry
            .entry(schema)
            .ok_or_else(|| DecodeError::UnknownNodeType {
                node: schema.type_name.to_string(),
            })
    }

    fn parse_document(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
    ) -> Result<RawNode, DecodeError> {
        let mut raw = RawNode::new(entry.schema, context.line);
        self.parse_keyworded(entry, context, &mut raw)?;
        self.finish_node(entry, context, raw)
    }

    // parse_block()
    // The tokens "/begin KEYWORD" have already been consumed
    fn parse_block(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
    ) -> Result<RawNode, DecodeError> {
        let mut raw = RawNode::new(entry.schema, context.line);
        self.parse_positional(entry, context, &mut raw)?;
        self.parse_keyworded(entry, context, &mut raw)?;

        self.expect_token(context, A2lTokenType::End)?;
        let tag_token = self.expect_token(context, A2lTokenType::Identifier)?;
        let tag = self.get_token_text(tag_token);
        if tag != entry.schema.display_name() {
            return Err(DecodeError::incorrect_end_tag(self, context, tag));
        }

        self.finish_node(entry, context, raw)
    }

    // parse_simple()
    // A fixed keyword has already been consumed. The keyword of a name token node is read as the
    // value of its first field.
    fn parse_simple(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
    ) -> Result<RawNode, DecodeError> {
        let mut raw = RawNode::new(entry.schema, context.line);
        self.parse_positional(entry, context, &mut raw)?;
        self.finish_node(entry, context, raw)
    }

    fn finish_node(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
        mut raw: RawNode,
    ) -> Result<RawNode, DecodeError> {
        for idx in &entry.keyworded {
            let field = &entry.schema.fields[*idx];
            if let FieldRole::Child(child_schema) = field.role {
                if !field.optional && raw.values[*idx].is_none() {
                    return Err(DecodeError::invalid_multiplicity_not_present(
                        self,
                        context,
                        child_schema.display_name(),
                    ));
                }
            }
        }
        raw.sequence = self.build_context.next_sequence();
        Ok(raw)
    }

    // parse_positional()
    // Bind the untagged values in ordinal order, one token each. A repeated field consumes
    // tokens as long as they have the right type.
    fn parse_positional(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
        raw: &mut RawNode,
    ) -> Result<(), DecodeError> {
        for idx in &entry.positional {
            let field = &entry.schema.fields[*idx];
            let Some(vtype) = field.role.value_type() else {
                continue;
            };
            let is_hex = field.role.is_hex();
            let value = if field.repeated {
                let ttype = token_type_for(vtype);
                let mut values = Vec::new();
                while self.peek_token().is_some_and(|tok| tok.ttype == ttype) {
                    values.push(self.parse_scalar(context, vtype, is_hex)?);
                }
                Value::Repeated(values)
            } else {
                self.parse_scalar(context, vtype, is_hex)?
            };
            raw.values[*idx] = Some(value);
        }
        Ok(())
    }

    // parse_keyworded()
    // Match tagged values, flags and sub-nodes by their keyword, in any order, until the /end of
    // the current block or the end of the input is reached.
    fn parse_keyworded(
        &mut self,
        entry: &'static SchemaEntry,
        context: &ParseContext,
        raw: &mut RawNode,
    ) -> Result<(), DecodeError> {
        let is_document = entry.schema.kind == NodeKind::Document;
        let mut dict_names = FnvHashMap::<(usize, String), u32>::default();

        loop {
            let Some(token) = self.peek_token() else {
                if is_document {
                    break;
                }
                return Err(DecodeError::unexpected_eof(self, context));
            };

            let (idx, is_block, tag) = match token.ttype {
                A2lTokenType::End => break,
                A2lTokenType::Begin => {
                    self.get_token(context)?;
                    let tag_token = self.get_token(context)?;
                    if tag_token.ttype != A2lTokenType::Identifier {
                        return Err(DecodeError::InvalidBegin {
                            filename: self.filenames[context.fileid].to_string(),
                            error_line: self.last_token_position,
                            block: context.element.clone(),
                        });
                    }
                    let tag = self.get_token_text(tag_token);
                    let Some(idx) = entry.find_keyword(tag) else {
                        return Err(DecodeError::unknown_sub_block(self, context, tag));
                    };
                    (idx, true, tag)
                }
                A2lTokenType::Identifier => {
                    let tag = self.get_token_text(token);
                    let Some(idx) = entry.find_keyword(tag) else {
                        self.get_token(context)?;
                        return Err(DecodeError::unknown_sub_block(self, context, tag));
                    };
                    (idx, false, tag)
                }
                A2lTokenType::Number => {
                    // keyless nodes start with a number
                    let Some(idx) = entry.find_numeric() else {
                        self.get_token(context)?;
                        return Err(DecodeError::unexpected_token_type(
                            self,
                            context,
                            token,
                            A2lTokenType::Identifier,
                        ));
                    };
                    (idx, false, self.get_token_text(token))
                }
                _ => {
                    self.get_token(context)?;
                    return Err(DecodeError::unexpected_token_type(
                        self,
                        context,
                        token,
                        A2lTokenType::Identifier,
                    ));
                }
            };

            let field = &entry.schema.fields[idx];
            let single_valued = !matches!(field.role, FieldRole::List(_) | FieldRole::Dictionary(_));
            if single_valued && raw.values[idx].is_some() {
                if !is_block {
                    self.get_token(context)?;
                }
                return Err(DecodeError::invalid_multiplicity_too_many(
                    self, context, tag,
                ));
            }

            let Some(child_schema) = field.role.child_schema() else {
                // tagged scalar or presence flag
                if is_block {
                    return Err(DecodeError::incorrect_keyword(self, context, tag));
                }
                self.get_token(context)?;
                let value = match field.role.value_type() {
                    Some(vtype) => self.parse_scalar(context, vtype, field.role.is_hex())?,
                    None => Value::Flag(true),
                };
                raw.values[idx] = Some(value);
                continue;
            };

            let child_entry = self.entry_for(child_schema)?;
            let child_context = ParseContext {
                element: child_schema.display_name().to_string(),
                fileid: token.fileid,
                line: token.line,
            };
            let child = match (child_schema.kind, is_block) {
                (NodeKind::Block, true) => self.parse_block(child_entry, &child_context)?,
                (NodeKind::Simple, false) => {
                    if let Keyword::Fixed(_) = child_schema.keyword {
                        self.get_token(context)?;
                    }
                    self.parse_simple(child_entry, &child_context)?
                }
                (NodeKind::Simple, true) => {
                    return Err(DecodeError::incorrect_keyword(self, context, tag));
                }
                _ => {
                    self.get_token(context)?;
                    return Err(DecodeError::incorrect_block(self, context, tag));
                }
            };

            match field.role {
                FieldRole::Dictionary(_) => {
                    let name = raw_key(&child);
                    if let Some(line_1) = dict_names.insert((idx, name.clone()), child.line) {
                        return Err(DecodeError::DuplicateName {
                            filename: self.filenames[child_context.fileid].to_string(),
                            block: child_context.element,
                            name,
                            line_1,
                            line_2: child.line,
                        });
                    }
                    push_node(&mut raw.values[idx], child);
                }
                FieldRole::List(_) => push_node(&mut raw.values[idx], child),
                _ => raw.values[idx] = Some(Value::Node(child)),
            }
        }

        Ok(())
    }

    fn parse_scalar(
        &mut self,
        context: &ParseContext,
        vtype: ValueType,
        is_hex: bool,
    ) -> Result<Value, DecodeError> {
        match vtype {
            ValueType::Text => Ok(Value::Text(self.get_string(context)?)),
            ValueType::Ident => Ok(Value::Text(self.get_identifier(context)?)),
            ValueType::Verbatim => {
                let token = self.expect_token(context, A2lTokenType::Verbatim)?;
                Ok(Value::Text(self.get_token_text(token).to_owned()))
            }
            ValueType::Enum(enum_schema) => {
                let token = self.expect_token(context, A2lTokenType::Identifier)?;
                let text = self.get_token_text(token);
                enum_schema
                    .lookup(text)
                    .map(Value::Label)
                    .ok_or_else(|| DecodeError::invalid_enum_value(self, context, text))
            }
            ValueType::U32 => {
                let (num, text) = self.get_integer(context, is_hex)?;
                if num > u64::from(u32::MAX) {
                    return Err(DecodeError::malformed_number(self, context, text));
                }
                Ok(Value::UInt(num))
            }
            ValueType::U64 => Ok(Value::UInt(self.get_integer(context, is_hex)?.0)),
            ValueType::I64 => Ok(Value::Int(self.get_integer_i64(context, is_hex)?)),
            ValueType::Float => Ok(Value::Float(self.get_double(context)?)),
        }
    }

    // get_token
    // get one token from the list of tokens and unwrap it
    pub(crate) fn get_token(
        &mut self,
        context: &ParseContext,
    ) -> Result<&'a A2lToken, DecodeError> {
        if let Some(token) = self.token_cursor.next() {
            self.last_token_position = token.line;
            Ok(token)
        } else {
            Err(DecodeError::unexpected_eof(self, context))
        }
    }

    pub(crate) fn peek_token(&self) -> Option<&'a A2lToken> {
        self.token_cursor.peek()
    }

    pub(crate) fn log_warning(&mut self, decode_error: DecodeError) {
        self.log_msgs.push(A2lError::DecodeError { decode_error });
    }

    pub(crate) fn get_token_text(&self, token: &'a A2lToken) -> &'a str {
        let data = &self.filedata[token.fileid];
        &data[token.startpos..token.endpos]
    }

    // expect_token get a token which has to be of a particular type (hence: expect)
    // getting a token of any other type is a DecodeError
    pub(crate) fn expect_token(
        &mut self,
        context: &ParseContext,
        token_type: A2lTokenType,
    ) -> Result<&'a A2lToken, DecodeError> {
        let token = self.get_token(context)?;
        if token.ttype != token_type {
            return Err(DecodeError::unexpected_token_type(
                self, context, token, token_type,
            ));
        }
        Ok(token)
    }

    fn expect_keyword(&mut self, context: &ParseContext, keyword: &str) -> Result<(), DecodeError> {
        let token = self.expect_token(context, A2lTokenType::Identifier)?;
        let text = self.get_token_text(token);
        if text != keyword {
            return Err(DecodeError::unknown_sub_block(self, context, text));
        }
        Ok(())
    }

    // get_string()
    // Get the content of a String token as a string
    pub(crate) fn get_string(&mut self, context: &ParseContext) -> Result<String, DecodeError> {
        let token = self.expect_token(context, A2lTokenType::String)?;
        let text = self.get_token_text(token);
        let inner = text
            .strip_prefix('"')
            .and_then(|text| text.strip_suffix('"'))
            .unwrap_or(text);
        Ok(unescape_string(inner))
    }

    // get_identifier()
    // Get the content of an Identifier token as a string
    pub(crate) fn get_identifier(&mut self, context: &ParseContext) -> Result<String, DecodeError> {
        let token = self.expect_token(context, A2lTokenType::Identifier)?;
        let text = self.get_token_text(token);
        if text.starts_with(|c: char| c.is_ascii_digit()) || text.len() > MAX_IDENT {
            return Err(DecodeError::InvalidIdentifier {
                filename: self.filenames[context.fileid].to_string(),
                error_line: self.last_token_position,
                block: context.element.clone(),
                ident: text.to_owned(),
            });
        }
        Ok(String::from(text))
    }

    // get_double()
    // Get the content of a Number token as a double(f64)
    // Since the Number token stores text internally, the text must be converted first
    pub(crate) fn get_double(&mut self, context: &ParseContext) -> Result<f64, DecodeError> {
        let token = self.expect_token(context, A2lTokenType::Number)?;
        let text = self.get_token_text(token);
        // some vendor tools write integer limits as 0xNNN
        let result = match hex_digits(text) {
            Some(digits) => u64::from_str_radix(digits, 16).map(|num| num as f64).ok(),
            None => text.parse::<f64>().ok(),
        };
        result.ok_or_else(|| DecodeError::malformed_number(self, context, text))
    }

    // get_integer()
    // Get an unsigned integer. If `hex_required` is set, a decimal number is rejected.
    // The text of the token is returned too, for a range error in the caller.
    pub(crate) fn get_integer(
        &mut self,
        context: &ParseContext,
        hex_required: bool,
    ) -> Result<(u64, &'a str), DecodeError> {
        let token = self.expect_token(context, A2lTokenType::Number)?;
        let text = self.get_token_text(token);
        let result = match hex_digits(text) {
            Some(digits) => u64::from_str_radix(digits, 16).ok(),
            None if hex_required => {
                return Err(DecodeError::expected_hex_number(self, context, text));
            }
            None => text.parse::<u64>().ok(),
        };
        result
            .map(|num| (num, text))
            .ok_or_else(|| DecodeError::malformed_number(self, context, text))
    }

    // get_integer_i64()
    // Signed data that is written as hex may have the high bit set: 0xFFFFFFFFFFFFFFFF is -1.
    pub(crate) fn get_integer_i64(
        &mut self,
        context: &ParseContext,
        hex_required: bool,
    ) -> Result<i64, DecodeError> {
        let token = self.expect_token(context, A2lTokenType::Number)?;
        let text = self.get_token_text(token);
        let result = match hex_digits(text) {
            Some(digits) => u64::from_str_radix(digits, 16).map(|num| num as i64).ok(),
            None if hex_required => {
                return Err(DecodeError::expected_hex_number(self, context, text));
            }
            None => text.parse::<i64>().ok(),
        };
        result.ok_or_else(|| DecodeError::malformed_number(self, context, text))
    }
}

fn hex_digits(text: &str) -> Option<&str> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .filter(|digits| !digits.is_empty())
}

fn token_type_for(vtype: ValueType) -> A2lTokenType {
    match vtype {
        ValueType::Text => A2lTokenType::String,
        ValueType::Verbatim => A2lTokenType::Verbatim,
        ValueType::Ident | ValueType::Enum(_) => A2lTokenType::Identifier,
        ValueType::U32 | ValueType::U64 | ValueType::I64 | ValueType::Float => {
            A2lTokenType::Number
        }
    }
}

fn push_node(slot: &mut Option<Value>, node: RawNode) {
    match slot {
        Some(Value::Nodes(nodes)) => nodes.push(node),
        _ => *slot = Some(Value::Nodes(vec![node])),
    }
}

// raw_key()
// The dictionary key of a decoded node. Verbatim text is keyed by its first word.
fn raw_key(raw: &RawNode) -> String {
    let Some(key_field) = raw.schema.key_field else {
        return String::new();
    };
    let is_verbatim = matches!(
        raw.schema.fields.get(key_field).map(|field| field.role),
        Some(FieldRole::Argument(ValueType::Verbatim))
    );
    match raw.values.get(key_field) {
        Some(Some(Value::Text(text))) if is_verbatim => {
            text.split_whitespace().next().unwrap_or_default().to_string()
        }
        Some(Some(Value::Text(text))) => text.clone(),
        Some(Some(Value::Label(label))) => (*label).to_string(),
        _ => String::new(),
    }
}

impl DecodeError {
    pub(crate) fn unexpected_token_type(
        parser: &ParserState,
        context: &ParseContext,
        token: &A2lToken,
        expected_ttype: A2lTokenType,
    ) -> Self {
        Self::UnexpectedTokenType {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            block_line: context.line,
            element: context.element.clone(),
            actual_ttype: token.ttype,
            actual_text: parser.get_token_text(token).to_owned(),
            expected_ttype,
        }
    }

    pub(crate) fn malformed_number(
        parser: &ParserState,
        context: &ParseContext,
        numstr: &str,
    ) -> Self {
        Self::MalformedNumber {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            numstr: numstr.to_owned(),
            block: context.element.clone(),
        }
    }

    pub(crate) fn expected_hex_number(
        parser: &ParserState,
        context: &ParseContext,
        numstr: &str,
    ) -> Self {
        Self::ExpectedHexNumber {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            numstr: numstr.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn invalid_enum_value(
        parser: &ParserState,
        context: &ParseContext,
        enumitem: &str,
    ) -> Self {
        Self::InvalidEnumValue {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            enumtxt: enumitem.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn invalid_multiplicity_too_many(
        parser: &ParserState,
        context: &ParseContext,
        tag: &str,
    ) -> Self {
        Self::InvalidMultiplicityTooMany {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_string(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn invalid_multiplicity_not_present(
        parser: &ParserState,
        context: &ParseContext,
        tag: &str,
    ) -> Self {
        Self::InvalidMultiplicityNotPresent {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_string(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn incorrect_block(parser: &ParserState, context: &ParseContext, tag: &str) -> Self {
        Self::IncorrectBlockError {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn incorrect_keyword(
        parser: &ParserState,
        context: &ParseContext,
        tag: &str,
    ) -> Self {
        Self::IncorrectKeywordError {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn incorrect_end_tag(
        parser: &ParserState,
        context: &ParseContext,
        tag: &str,
    ) -> Self {
        Self::IncorrectEndTag {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn unknown_sub_block(
        parser: &ParserState,
        context: &ParseContext,
        tag: &str,
    ) -> Self {
        Self::UnknownSubBlock {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            tag: tag.to_owned(),
            block: context.element.clone(),
            block_line: context.line,
        }
    }

    pub(crate) fn unexpected_eof(parser: &ParserState, context: &ParseContext) -> Self {
        Self::UnexpectedEOF {
            filename: parser.filenames[context.fileid].to_string(),
            error_line: parser.last_token_position,
            block: context.element.clone(),
            block_line: context.line,
        }
    }
}

// unescape_string()
// Strings may contain the escape sequences \" \' \\ \n \r \t; a quote can also be escaped as ""
fn unescape_string(text: &str) -> String {
    if !text.contains(['\\', '"']) {
        return text.to_owned();
    }

    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let replacement = match (c, chars.peek().copied()) {
            ('\\' | '"', Some('"')) => Some('"'),
            ('\\', Some('\'')) => Some('\''),
            ('\\', Some('\\')) => Some('\\'),
            ('\\', Some('n')) => Some('\n'),
            ('\\', Some('r')) => Some('\r'),
            ('\\', Some('t')) => Some('\t'),
            _ => None,
        };
        match replacement {
            Some(unescaped) => {
                output.push(unescaped);
                chars.next();
            }
            None => output.push(c),
        }
    }
    output
}

impl A2lVersion {
    /// map the numbers of an `ASAP2_VERSION` statement to a known version
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidVersion`] if the version is not known.
    pub fn new(major: u16, minor: u16) -> Result<Self, DecodeError> {
        match (major, minor) {
            (1, 50) => Ok(A2lVersion::V1_5_0),
            (1, 51) => Ok(A2lVersion::V1_5_1),
            (1, 60) => Ok(A2lVersion::V1_6_0),
            (1, 61) => Ok(A2lVersion::V1_6_1),
            (1, 70) => Ok(A2lVersion::V1_7_0),
            (1, 71) => Ok(A2lVersion::V1_7_1),
            _ => Err(DecodeError::InvalidVersion { major, minor }),
        }
    }
}

impl Display for A2lVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            A2lVersion::V1_5_0 => "1.5.0",
            A2lVersion::V1_5_1 => "1.5.1",
            A2lVersion::V1_6_0 => "1.6.0",
            A2lVersion::V1_6_1 => "1.6.1",
            A2lVersion::V1_7_0 => "1.7.0",
            A2lVersion::V1_7_1 => "1.7.1",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry;
    use crate::specification::{
        A2lFile, AlignmentType, BitMask, CalibrationHandle, IfData, Measurement, ModCommon,
        SystemConstant, VtabEntry,
    };
    use crate::{A2lObjectName, load_from_string, tokenizer};

    fn parse_text<T: NodeType>(text: &str) -> Result<T, DecodeError> {
        let tokenresult = tokenizer::tokenize(&Filename::from("test_input"), 0, text).unwrap();
        let mut log_msgs = Vec::<A2lError>::new();
        let mut build_context = BuildContext::new();
        let mut parser = ParserState::new(
            &tokenresult,
            &mut log_msgs,
            &mut build_context,
            registry().unwrap(),
        );
        parser.parse_fragment()
    }

    fn load_error(text: &str) -> DecodeError {
        match load_from_string(text) {
            Err(A2lError::DecodeError { decode_error }) => decode_error,
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn parsing_numbers_test() {
        let input_text = r##"0 0x1 1.0e+2 0x1F 0X2f 2F 18446744073709551615 0xFFFFFFFFFFFFFFFF"##;
        let tokenresult = tokenizer::tokenize(&Filename::from("test_input"), 0, input_text).unwrap();
        let mut log_msgs = Vec::<A2lError>::new();
        let mut build_context = BuildContext::new();
        let mut parser = ParserState::new(
            &tokenresult,
            &mut log_msgs,
            &mut build_context,
            registry().unwrap(),
        );
        let context = ParseContext {
            element: "TEST".to_string(),
            fileid: 0,
            line: 0,
        };

        assert_eq!(parser.get_integer(&context, false).unwrap().0, 0);
        assert_eq!(parser.get_integer(&context, true).unwrap().0, 1);
        // 1.0e+2 is not an integer
        assert!(matches!(
            parser.get_integer(&context, false),
            Err(DecodeError::MalformedNumber { .. })
        ));
        assert_eq!(parser.get_double(&context).unwrap(), 31.0);
        assert_eq!(parser.get_integer(&context, true).unwrap().0, 47);
        // 2F is neither decimal nor hex
        assert!(parser.get_double(&context).is_err());
        assert_eq!(parser.get_integer(&context, false).unwrap().0, u64::MAX);
        assert_eq!(parser.get_integer_i64(&context, true).unwrap(), -1);
    }

    #[test]
    fn hex_required() {
        let result = parse_text::<BitMask>("BIT_MASK 255");
        assert!(matches!(result, Err(DecodeError::ExpectedHexNumber { .. })));
        let bit_mask = parse_text::<BitMask>("BIT_MASK 0x1F").unwrap();
        assert_eq!(bit_mask.value, 31);
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string(" "), " ");
        assert_eq!(unescape_string(r#""""#), r#"""#);
        assert_eq!(unescape_string(r#"\""#), r#"""#);
        assert_eq!(unescape_string(r#"\'"#), "'");
        assert_eq!(unescape_string(r#"\\"#), r#"\"#);
        assert_eq!(unescape_string(r#"\n"#), "\n");
        assert_eq!(unescape_string(r#"\r"#), "\r");
        assert_eq!(unescape_string(r#"\txx"#), "\txx");
        assert_eq!(unescape_string(r#"a\qb"#), r#"a\qb"#);
    }

    #[test]
    fn parsing_identifiers_test() {
        let meas = parse_text::<Measurement>(
            r#"/begin MEASUREMENT 0ident "" UBYTE NO_COMPU_METHOD 0 0 0 255 /end MEASUREMENT"#,
        );
        assert!(matches!(meas, Err(DecodeError::InvalidIdentifier { .. })));

        let meas = parse_text::<Measurement>(
            r#"/begin MEASUREMENT m "" UBYTE NO_COMPU_METHOD 0 0 0 255 /end MEASUREMENT"#,
        )
        .unwrap();
        assert_eq!(meas.get_name(), "m");
    }

    #[test]
    fn parse_simple_nodes() {
        let constant = parse_text::<SystemConstant>(r#"SYSTEM_CONSTANT "c" "1 + 2""#).unwrap();
        assert_eq!(constant.get_name(), "c");
        assert_eq!(constant.value, "1 + 2");

        let entry = parse_text::<VtabEntry>(r#"3 "three""#).unwrap();
        assert_eq!(entry.in_val, 3.0);
        assert_eq!(entry.out_val, "three");
    }

    #[test]
    fn parse_repeated_and_tagged() {
        let handle = parse_text::<CalibrationHandle>(
            r#"/begin CALIBRATION_HANDLE 0x10000 0x200 CALIBRATION_HANDLE_TEXT "x" /end CALIBRATION_HANDLE"#,
        )
        .unwrap();
        assert_eq!(handle.handles, vec![0x10000, 0x200]);
        assert_eq!(handle.calibration_handle_text.as_deref(), Some("x"));
    }

    #[test]
    fn parse_name_tokens() {
        let mod_common = parse_text::<ModCommon>(
            r#"/begin MOD_COMMON "" ALIGNMENT_BYTE 1 ALIGNMENT_WORD 2 /end MOD_COMMON"#,
        )
        .unwrap();
        assert_eq!(mod_common.alignment.len(), 2);
        let word = mod_common.alignment.get("ALIGNMENT_WORD").unwrap();
        assert_eq!(word.alignment_type, AlignmentType::AlignmentWord);
        assert_eq!(word.border, 2);

        let result = parse_text::<ModCommon>(
            r#"/begin MOD_COMMON "" ALIGNMENT_BYTE 1 ALIGNMENT_BYTE 2 /end MOD_COMMON"#,
        );
        assert!(matches!(result, Err(DecodeError::DuplicateName { .. })));
    }

    #[test]
    fn parse_verbatim() {
        let if_data =
            parse_text::<IfData>("/begin IF_DATA XCP\n  /begin A 1 /end A\n/end IF_DATA").unwrap();
        assert_eq!(if_data.get_name(), "XCP");
        assert_eq!(if_data.data, "XCP\n  /begin A 1 /end A");
    }

    #[test]
    fn sequence_assigned_when_done() {
        let meas = parse_text::<Measurement>(
            r#"/begin MEASUREMENT m "" UBYTE NO_COMPU_METHOD 0 0 0 255 BIT_MASK 0x1 /end MEASUREMENT"#,
        )
        .unwrap();
        // the child is complete before its parent
        let bit_mask = meas.bit_mask.as_ref().unwrap();
        assert!(crate::Node::sequence(bit_mask) < crate::Node::sequence(&meas));
    }

    #[test]
    fn additional_tokens() {
        let result = parse_text::<BitMask>("BIT_MASK 0x1 0x2");
        assert!(matches!(
            result,
            Err(DecodeError::AdditionalTokensError { .. })
        ));
        let result = parse_text::<A2lFile>(
            r#"/begin PROJECT p "" /end PROJECT /end PROJECT"#,
        );
        assert!(matches!(
            result,
            Err(DecodeError::AdditionalTokensError { .. })
        ));
    }

    #[test]
    fn a2lversion() {
        let v150 = A2lVersion::new(1, 50).unwrap();
        let v151 = A2lVersion::new(1, 51).unwrap();
        let v160 = A2lVersion::new(1, 60).unwrap();
        let v161 = A2lVersion::new(1, 61).unwrap();
        let v170 = A2lVersion::new(1, 70).unwrap();
        let v171 = A2lVersion::new(1, 71).unwrap();
        assert!(v150 < v151);
        assert!(v151 < v160);
        assert!(v160 < v161);
        assert!(v161 < v170);
        assert!(v170 < v171);
        assert!(A2lVersion::new(1, 80).is_err());
        assert_eq!(format!("{v150}"), "1.5.0");
        assert_eq!(format!("{v171}"), "1.7.1");
    }

    #[test]
    fn version_warnings() {
        let (_, log_msgs) = load_from_string(r#"/begin PROJECT p "" /end PROJECT"#).unwrap();
        assert!(matches!(
            log_msgs.as_slice(),
            [A2lError::DecodeError {
                decode_error: DecodeError::MissingVersionInfo
            }]
        ));

        let (_, log_msgs) =
            load_from_string(r#"ASAP2_VERSION 1 99 /begin PROJECT p "" /end PROJECT"#).unwrap();
        assert!(matches!(
            log_msgs.as_slice(),
            [A2lError::DecodeError {
                decode_error: DecodeError::InvalidVersion { major: 1, minor: 99 }
            }]
        ));

        let (_, log_msgs) =
            load_from_string(r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /end PROJECT"#).unwrap();
        assert!(log_msgs.is_empty());
    }

    #[test]
    fn error_invalid_mult_not_present() {
        let error = load_error(r#"ASAP2_VERSION 1 71"#);
        assert!(matches!(
            error,
            DecodeError::InvalidMultiplicityNotPresent { .. }
        ));
    }

    #[test]
    fn error_invalid_mult_too_many() {
        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /end PROJECT /begin PROJECT p2 "" /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::InvalidMultiplicityTooMany { .. }));

        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /begin MODULE m "" /begin MEASUREMENT x "" UBYTE NO_COMPU_METHOD 0 0 0 1 READ_WRITE READ_WRITE /end MEASUREMENT /end MODULE /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::InvalidMultiplicityTooMany { .. }));
    }

    #[test]
    fn error_unknown_subblock() {
        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /begin MODULE m "" ABCDEF /end MODULE /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::UnknownSubBlock { .. }));

        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /begin MODULE m "" /begin ABCDEF /end ABCDEF /end MODULE /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::UnknownSubBlock { .. }));
    }

    #[test]
    fn error_incorrect_end_tag() {
        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /begin MODULE m "" /end MODULE_ /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::IncorrectEndTag { .. }));
    }

    #[test]
    fn error_block_form() {
        // MODULE is a block, it can't be used without /begin
        let error = load_error(r#"ASAP2_VERSION 1 71 /begin PROJECT p "" MODULE m "" /end PROJECT"#);
        assert!(matches!(error, DecodeError::IncorrectBlockError { .. }));

        // ASAP2_VERSION is a simple statement
        let error = load_error(r#"/begin ASAP2_VERSION 1 71 /end ASAP2_VERSION"#);
        assert!(matches!(error, DecodeError::IncorrectKeywordError { .. }));
    }

    #[test]
    fn error_unexpected_eof() {
        let error = load_error(r#"ASAP2_VERSION 1 71 /begin PROJECT p """#);
        assert!(matches!(error, DecodeError::UnexpectedEOF { .. }));
    }

    #[test]
    fn error_invalid_enum_value() {
        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p "" /begin MODULE m "" /begin MEASUREMENT x "" NOT_A_TYPE NO_COMPU_METHOD 0 0 0 1 /end MEASUREMENT /end MODULE /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::InvalidEnumValue { .. }));
    }

    #[test]
    fn error_unexpected_token_type() {
        let error = load_error(
            r#"ASAP2_VERSION 1 71 /begin PROJECT p 17 /end PROJECT"#,
        );
        assert!(matches!(error, DecodeError::UnexpectedTokenType { .. }));
    }

    #[test]
    fn error_duplicate_name() {
        let error = load_error(
            "ASAP2_VERSION 1 71\n/begin PROJECT p \"\"\n/begin MODULE m \"\"\n/end MODULE\n/begin MODULE m \"\"\n/end MODULE\n/end PROJECT",
        );
        let DecodeError::DuplicateName {
            name,
            line_1,
            line_2,
            ..
        } = error
        else {
            panic!("expected DuplicateName, got {error:?}");
        };
        assert_eq!(name, "m");
        assert_eq!((line_1, line_2), (3, 5));
    }
}
