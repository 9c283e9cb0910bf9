use num_traits::FromPrimitive;

use crate::decoder::DecodeError;
use crate::itemlist::ItemList;
use crate::node::{A2lObjectName, NodeType};
use crate::schema::NodeSchema;
use crate::sequence::SequenceNumber;

/// A decoded field value, before it is moved into the typed node struct
#[derive(Debug)]
pub enum Value {
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    Label(&'static str),
    Flag(bool),
    Repeated(Vec<Value>),
    Node(RawNode),
    Nodes(Vec<RawNode>),
}

/// The untyped result of decoding one node
///
/// The values are indexed by the declaration index of their field. Generated code converts a
/// `RawNode` into the typed struct with the `take*` functions.
#[doc(hidden)]
#[derive(Debug)]
pub struct RawNode {
    pub(crate) schema: &'static NodeSchema,
    pub(crate) sequence: SequenceNumber,
    pub(crate) line: u32,
    pub(crate) values: Vec<Option<Value>>,
}

/// Conversion of a decoded scalar into a field type
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

impl FromValue for u32 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::UInt(num) => u32::from_u64(num),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::UInt(num) => Some(num),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Int(num) => Some(num),
            Value::UInt(num) => i64::from_u64(num),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(num) => Some(num),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl RawNode {
    pub(crate) fn new(schema: &'static NodeSchema, line: u32) -> Self {
        let mut values = Vec::with_capacity(schema.fields.len());
        values.resize_with(schema.fields.len(), || None);
        Self {
            schema,
            sequence: SequenceNumber::default(),
            line,
            values,
        }
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    /// mandatory scalar
    pub fn take<T: FromValue>(&mut self, index: usize) -> Result<T, DecodeError> {
        let value = self.take_value(index);
        value
            .and_then(T::from_value)
            .ok_or_else(|| self.mismatch(index))
    }

    pub fn take_optional<T: FromValue>(&mut self, index: usize) -> Result<Option<T>, DecodeError> {
        match self.take_value(index) {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| self.mismatch(index)),
        }
    }

    pub fn take_repeated<T: FromValue>(&mut self, index: usize) -> Result<Vec<T>, DecodeError> {
        match self.take_value(index) {
            None => Ok(Vec::new()),
            Some(Value::Repeated(values)) => values
                .into_iter()
                .map(T::from_value)
                .collect::<Option<Vec<T>>>()
                .ok_or_else(|| self.mismatch(index)),
            Some(_) => Err(self.mismatch(index)),
        }
    }

    pub fn take_flag(&mut self, index: usize) -> Result<bool, DecodeError> {
        match self.take_value(index) {
            None => Ok(false),
            Some(Value::Flag(flag)) => Ok(flag),
            Some(_) => Err(self.mismatch(index)),
        }
    }

    pub fn take_node<T: NodeType>(&mut self, index: usize) -> Result<T, DecodeError> {
        match self.take_value(index) {
            Some(Value::Node(raw)) => T::from_raw(raw),
            _ => Err(self.mismatch(index)),
        }
    }

    pub fn take_optional_node<T: NodeType>(
        &mut self,
        index: usize,
    ) -> Result<Option<T>, DecodeError> {
        match self.take_value(index) {
            None => Ok(None),
            Some(Value::Node(raw)) => T::from_raw(raw).map(Some),
            Some(_) => Err(self.mismatch(index)),
        }
    }

    pub fn take_list<T: NodeType>(&mut self, index: usize) -> Result<Vec<T>, DecodeError> {
        match self.take_value(index) {
            None => Ok(Vec::new()),
            Some(Value::Nodes(raws)) => raws.into_iter().map(T::from_raw).collect(),
            Some(_) => Err(self.mismatch(index)),
        }
    }

    pub fn take_dict<T: NodeType + A2lObjectName>(
        &mut self,
        index: usize,
    ) -> Result<ItemList<T>, DecodeError> {
        match self.take_value(index) {
            None => Ok(ItemList::new()),
            Some(Value::Nodes(raws)) => {
                let mut itemlist = ItemList::with_capacity(raws.len());
                for raw in raws {
                    // the decoder has already rejected duplicate names
                    if itemlist.push(T::from_raw(raw)?).is_err() {
                        return Err(self.mismatch(index));
                    }
                }
                Ok(itemlist)
            }
            Some(_) => Err(self.mismatch(index)),
        }
    }

    fn take_value(&mut self, index: usize) -> Option<Value> {
        self.values.get_mut(index).and_then(Option::take)
    }

    fn mismatch(&self, index: usize) -> DecodeError {
        DecodeError::ValueMismatch {
            block: self.schema.type_name.to_string(),
            field: self
                .schema
                .fields
                .get(index)
                .map_or("?", |field| field.name)
                .to_string(),
            line: self.line,
        }
    }
}
