// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph record types: classes, objects, edges, primitive fields, and roots.
//!
//! These are the owned, materialised forms used when building a graph and
//! when reading one back field by field. The compact store keeps none of
//! them; it holds columns and reconstructs records on demand.

use serde::Serialize;

use crate::ident::{ClassId, ObjectId};

/// Materialised class description.
///
/// Invariants
/// - `instance_fields` is in canonical layout order (the order the runtime
///   lays the fields out), not sorted.
/// - `superclass`, when present, must name a class in the same graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    /// Fully qualified class name.
    pub name: String,
    /// Direct superclass, if any.
    pub superclass: Option<ClassId>,
    /// Declared instance field names, in layout order.
    pub instance_fields: Vec<String>,
}

/// Label of an outgoing reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    /// A named instance (or static) field.
    Field(String),
    /// An array element.
    Index(u32),
}

/// Declared type tag of a field, when the capture recorded it.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Reference to another object.
    Object = 1,
    /// `boolean`
    Boolean = 2,
    /// `char`
    Char = 3,
    /// `float`
    Float = 4,
    /// `double`
    Double = 5,
    /// `byte`
    Byte = 6,
    /// `short`
    Short = 7,
    /// `int`
    Int = 8,
    /// `long`
    Long = 9,
}

impl FieldType {
    /// Returns the on-disk tag (never zero; zero means "no type recorded").
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Decodes an on-disk tag. Zero and unknown tags yield `None`.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Object,
            2 => Self::Boolean,
            3 => Self::Char,
            4 => Self::Float,
            5 => Self::Double,
            6 => Self::Byte,
            7 => Self::Short,
            8 => Self::Int,
            9 => Self::Long,
            _ => return None,
        })
    }

    /// Human-readable type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Float => "float",
            Self::Double => "double",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
        }
    }
}

/// Outgoing reference from one object to another.
///
/// The target may not exist in the graph (a dangling reference); the store
/// keeps the raw identifier so the edge survives an encode/decode cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Referenced object.
    pub target: ObjectId,
    /// Field name or array index through which the reference is held.
    pub label: EdgeLabel,
    /// Declared type of the field, if recorded.
    pub field_type: Option<FieldType>,
}

impl EdgeRecord {
    /// Reference held by a named field.
    pub fn field(name: impl Into<String>, target: ObjectId) -> Self {
        Self {
            target,
            label: EdgeLabel::Field(name.into()),
            field_type: Some(FieldType::Object),
        }
    }

    /// Reference held by an array slot.
    pub fn element(index: u32, target: ObjectId) -> Self {
        Self {
            target,
            label: EdgeLabel::Index(index),
            field_type: None,
        }
    }
}

/// Value of a non-reference field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrimitiveValue {
    /// `boolean`
    Boolean(bool),
    /// `char` (UTF-16 code unit)
    Char(u16),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
}

impl PrimitiveValue {
    /// Field type this value belongs to.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Boolean(_) => FieldType::Boolean,
            Self::Char(_) => FieldType::Char,
            Self::Float(_) => FieldType::Float,
            Self::Double(_) => FieldType::Double,
            Self::Byte(_) => FieldType::Byte,
            Self::Short(_) => FieldType::Short,
            Self::Int(_) => FieldType::Int,
            Self::Long(_) => FieldType::Long,
        }
    }

    /// Packs the value into `(tag, bits)` for columnar storage.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_bits(&self) -> (u8, u64) {
        let bits = match *self {
            Self::Boolean(v) => u64::from(v),
            Self::Char(v) => u64::from(v),
            Self::Float(v) => u64::from(v.to_bits()),
            Self::Double(v) => v.to_bits(),
            Self::Byte(v) => u64::from(v as u8),
            Self::Short(v) => u64::from(v as u16),
            Self::Int(v) => u64::from(v as u32),
            Self::Long(v) => v as u64,
        };
        (self.field_type().tag(), bits)
    }

    /// Unpacks a `(tag, bits)` pair. Returns `None` for reference or unknown tags.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_bits(tag: u8, bits: u64) -> Option<Self> {
        Some(match FieldType::from_tag(tag)? {
            FieldType::Object => return None,
            FieldType::Boolean => Self::Boolean(bits != 0),
            FieldType::Char => Self::Char(bits as u16),
            FieldType::Float => Self::Float(f32::from_bits(bits as u32)),
            FieldType::Double => Self::Double(f64::from_bits(bits)),
            FieldType::Byte => Self::Byte(bits as u8 as i8),
            FieldType::Short => Self::Short(bits as u16 as i16),
            FieldType::Int => Self::Int(bits as u32 as i32),
            FieldType::Long => Self::Long(bits as i64),
        })
    }
}

/// A named non-reference field value.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimitiveField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: PrimitiveValue,
}

/// Materialised object record.
///
/// Invariants
/// - `class` must name a class in the same graph.
/// - `edges` order is the canonical field/array order and is preserved by
///   every traversal and by the snapshot codec.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectRecord {
    /// Class of the object.
    pub class: ClassId,
    /// Bytes occupied by the object itself.
    pub shallow_size: u64,
    /// Outgoing references in canonical order.
    pub edges: Vec<EdgeRecord>,
    /// Primitive field values in canonical order.
    pub primitives: Vec<PrimitiveField>,
}

impl ObjectRecord {
    /// Object without outgoing references or primitive fields.
    pub fn new(class: ClassId, shallow_size: u64) -> Self {
        Self {
            class,
            shallow_size,
            edges: Vec::new(),
            primitives: Vec::new(),
        }
    }

    /// Adds an outgoing reference.
    pub fn with_edge(mut self, edge: EdgeRecord) -> Self {
        self.edges.push(edge);
        self
    }

    /// Adds a primitive field value.
    pub fn with_primitive(mut self, name: impl Into<String>, value: PrimitiveValue) -> Self {
        self.primitives.push(PrimitiveField {
            name: name.into(),
            value,
        });
        self
    }
}

/// Why an object is treated as a GC root.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    /// Root of unknown origin.
    Unknown = 0,
    /// Global JNI reference.
    JniGlobal = 1,
    /// Local JNI reference.
    JniLocal = 2,
    /// Local variable in a Java stack frame.
    JavaFrame = 3,
    /// Reference from native stack.
    NativeStack = 4,
    /// Class pinned by the system class loader.
    StickyClass = 5,
    /// Reference from a thread block.
    ThreadBlock = 6,
    /// Object used as a monitor.
    MonitorUsed = 7,
    /// Thread object itself.
    ThreadObject = 8,
    /// System class.
    SystemClass = 9,
    /// Static field of a loaded class.
    StaticField = 10,
    /// Object awaiting finalization.
    Finalizing = 11,
}

impl RootKind {
    /// Decodes an on-disk tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Unknown,
            1 => Self::JniGlobal,
            2 => Self::JniLocal,
            3 => Self::JavaFrame,
            4 => Self::NativeStack,
            5 => Self::StickyClass,
            6 => Self::ThreadBlock,
            7 => Self::MonitorUsed,
            8 => Self::ThreadObject,
            9 => Self::SystemClass,
            10 => Self::StaticField,
            11 => Self::Finalizing,
            _ => return None,
        })
    }

    /// Returns the on-disk tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

/// One entry of the GC root set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GcRoot {
    /// Rooted object.
    pub object: ObjectId,
    /// Root kind.
    pub kind: RootKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_bits_survive_packing() {
        let values = [
            PrimitiveValue::Boolean(true),
            PrimitiveValue::Char(0x263A),
            PrimitiveValue::Float(-1.5),
            PrimitiveValue::Double(std::f64::consts::PI),
            PrimitiveValue::Byte(-7),
            PrimitiveValue::Short(-300),
            PrimitiveValue::Int(i32::MIN),
            PrimitiveValue::Long(-42),
        ];
        for value in values {
            let (tag, bits) = value.to_bits();
            assert_eq!(PrimitiveValue::from_bits(tag, bits), Some(value));
        }
    }

    #[test]
    fn object_tag_is_not_a_primitive() {
        assert_eq!(PrimitiveValue::from_bits(FieldType::Object.tag(), 0), None);
        assert_eq!(PrimitiveValue::from_bits(0, 0), None);
        assert_eq!(FieldType::from_tag(0), None);
    }

    #[test]
    fn root_kind_tags_are_stable() {
        for tag in 0..=11u8 {
            let kind = RootKind::from_tag(tag);
            assert_eq!(kind.map(RootKind::tag), Some(tag));
        }
        assert_eq!(RootKind::from_tag(12), None);
    }
}
