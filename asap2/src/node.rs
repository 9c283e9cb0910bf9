use std::fmt::Debug;

use crate::schema::NodeSchema;
use crate::sequence::SequenceNumber;
use crate::value::RawNode;
use crate::DecodeError;

/// Read access to any node of the document tree
///
/// This is the uniform view that the encoder and the consistency checks work with; the generated
/// node structs implement it.
pub trait Node: Debug {
    /// the static description of this node's type
    fn schema(&self) -> &'static NodeSchema;

    /// the creation order of this node
    fn sequence(&self) -> SequenceNumber;

    /// the value of the field with the given declaration index
    fn field(&self, index: usize) -> FieldRef<'_>;

    /// the key of this node inside a dictionary, if the node type has a key field
    fn key(&self) -> Option<&str>;
}

/// Node types with a static schema that can be constructed by the decoder
pub trait NodeType: Node + Sized {
    fn node_schema() -> &'static NodeSchema;

    #[doc(hidden)]
    fn from_raw(raw: RawNode) -> Result<Self, DecodeError>;
}

/// A borrowed view of one field
#[derive(Debug)]
pub enum FieldRef<'a> {
    /// an optional field that is not set
    Absent,
    Scalar(ScalarRef<'a>),
    Repeated(Vec<ScalarRef<'a>>),
    Flag(bool),
    Node(&'a dyn Node),
    Nodes(Vec<&'a dyn Node>),
}

/// A borrowed scalar value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarRef<'a> {
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(&'a str),
    Label(&'static str),
}

pub trait ToScalar {
    fn to_scalar(&self) -> ScalarRef<'_>;
}

/// Conversion between the variants of a generated enum and their text labels
pub trait EnumLabel: Copy {
    fn label(&self) -> &'static str;
    fn from_label(label: &str) -> Option<Self>;
}

pub trait A2lObjectName {
    fn get_name(&self) -> &str;
}

pub trait A2lObjectNameSetter {
    fn set_name(&mut self, new_name: String);
}

impl ToScalar for u32 {
    fn to_scalar(&self) -> ScalarRef<'_> {
        ScalarRef::UInt(u64::from(*self))
    }
}

impl ToScalar for u64 {
    fn to_scalar(&self) -> ScalarRef<'_> {
        ScalarRef::UInt(*self)
    }
}

impl ToScalar for i64 {
    fn to_scalar(&self) -> ScalarRef<'_> {
        ScalarRef::Int(*self)
    }
}

impl ToScalar for f64 {
    fn to_scalar(&self) -> ScalarRef<'_> {
        ScalarRef::Float(*self)
    }
}

impl ToScalar for String {
    fn to_scalar(&self) -> ScalarRef<'_> {
        ScalarRef::Text(self)
    }
}

impl<'a> FieldRef<'a> {
    /// view an optional scalar field
    pub fn from_optional<T: ToScalar>(value: Option<&'a T>) -> Self {
        match value {
            Some(value) => FieldRef::Scalar(value.to_scalar()),
            None => FieldRef::Absent,
        }
    }

    /// view an optional child node
    pub fn from_optional_node<T: Node + 'a>(value: Option<&'a T>) -> Self {
        match value {
            Some(node) => FieldRef::Node(node),
            None => FieldRef::Absent,
        }
    }

    pub fn from_repeated<T: ToScalar>(values: &'a [T]) -> Self {
        FieldRef::Repeated(values.iter().map(ToScalar::to_scalar).collect())
    }

    pub fn from_nodes<T: Node + 'a>(nodes: impl Iterator<Item = &'a T>) -> Self {
        FieldRef::Nodes(nodes.map(|node| node as &dyn Node).collect())
    }
}

impl ScalarRef<'_> {
    /// the text of a text or label value
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarRef::Text(text) => Some(text),
            ScalarRef::Label(label) => Some(label),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::{BitMask, DataType, Format};
    use crate::BuildContext;

    #[test]
    fn scalar_views() {
        assert_eq!(7u32.to_scalar(), ScalarRef::UInt(7));
        assert_eq!((-3i64).to_scalar(), ScalarRef::Int(-3));
        assert_eq!("abc".to_string().to_scalar(), ScalarRef::Text("abc"));
        assert_eq!(DataType::Uword.to_scalar(), ScalarRef::Label("UWORD"));
        assert_eq!(ScalarRef::Label("UWORD").as_text(), Some("UWORD"));
        assert_eq!(ScalarRef::Float(1.5).as_text(), None);

        let missing: Option<&u32> = None;
        assert!(matches!(FieldRef::from_optional(missing), FieldRef::Absent));
        let values = vec![1u32, 2];
        let FieldRef::Repeated(items) = FieldRef::from_repeated(&values) else {
            panic!("expected a repeated field");
        };
        assert_eq!(items, vec![ScalarRef::UInt(1), ScalarRef::UInt(2)]);
    }

    #[test]
    fn enum_labels() {
        assert_eq!(DataType::from_label("SLONG"), Some(DataType::Slong));
        assert_eq!(DataType::from_label("slong"), None);
        assert_eq!(DataType::Float32Ieee.label(), "FLOAT32_IEEE");
        assert_eq!(DataType::Float32Ieee.to_string(), "FLOAT32_IEEE");
    }

    #[test]
    fn node_view() {
        let mut context = BuildContext::new();
        let bit_mask = BitMask::new(&mut context, 0xff00);
        assert_eq!(bit_mask.schema().type_name, "BIT_MASK");
        assert_eq!(bit_mask.sequence().value(), 1);
        assert!(matches!(
            bit_mask.field(0),
            FieldRef::Scalar(ScalarRef::UInt(0xff00))
        ));
        assert_eq!(bit_mask.key(), None);

        let format = Format::new(&mut context, "%6.2".to_string());
        assert!(matches!(
            format.field(0),
            FieldRef::Scalar(ScalarRef::Text("%6.2"))
        ));
        assert_eq!(format.sequence().value(), 2);
    }
}
