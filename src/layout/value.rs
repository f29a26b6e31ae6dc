//! Storage-level values written into layout fields.

use std::{fmt, sync::Arc};

use crate::layout::descriptor::FieldKind;

/// A value as seen by the field storage layer.
///
/// Narrower than a full script value: objects are referenced through an opaque heap handle
/// owned by the embedding runtime.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The script `undefined` value; the initial content of every field
    #[default]
    Undefined,
    /// The script `null` value
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Opaque handle to a heap object owned by the runtime
    Ref(u64),
}

impl Value {
    /// Encodes the value into unboxed bits if it matches `kind` exactly.
    ///
    /// Returns `None` for [`FieldKind::Object`] and for any value of a different kind.
    #[must_use]
    pub(crate) fn to_bits(&self, kind: FieldKind) -> Option<u64> {
        match (kind, self) {
            (FieldKind::Int, Value::Int(v)) => Some(u64::from(*v as u32)),
            (FieldKind::Long, Value::Long(v)) => Some(*v as u64),
            (FieldKind::Double, Value::Double(v)) => Some(v.to_bits()),
            _ => None,
        }
    }

    /// Decodes unboxed bits previously produced by [`Value::to_bits`].
    #[must_use]
    pub(crate) fn from_bits(kind: FieldKind, bits: u64) -> Value {
        match kind {
            FieldKind::Int => Value::Int(bits as u32 as i32),
            FieldKind::Long => Value::Long(bits as i64),
            FieldKind::Double => Value::Double(f64::from_bits(bits)),
            FieldKind::Object => Value::Undefined,
        }
    }

    /// Returns `true` for `undefined`.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Ref(handle) => write!(f, "[object #{handle}]"),
        }
    }
}
