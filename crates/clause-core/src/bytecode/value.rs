use core::fmt;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resolution scope of a [`Value::DataRef`]. Only `Static` is executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Scope {
    /// Host-registered static binding.
    Static,
    /// Reserved.
    Global,
    /// Reserved.
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Global => "global",
            Self::Local => "local",
        })
    }
}

/// Tagged datum manipulated by the VM.
///
/// `DataRef` and `AttrRef` are placeholders that only live in the constant
/// pool. `Object` and `Array` come from the host bridge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Double(f64),
    /// Boolean, stored as 0/1 by the integer family.
    Bool(bool),
    /// Character.
    Char(char),
    /// UTF-8 string.
    String(String),
    /// Named fields.
    Object(BTreeMap<String, Value>),
    /// Ordered elements.
    Array(Vec<Value>),
    /// Reference to an external binding.
    DataRef {
        /// Binding name.
        name: String,
        /// Resolution scope.
        scope: Scope,
    },
    /// Attribute of the value produced by constant `owner`.
    AttrRef {
        /// Attribute name (or decimal index for arrays).
        name: String,
        /// Constant-pool index of the owning reference.
        owner: u32,
    },
}

/// Tag of a [`Value`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueKind {
    /// [`Value::Int`]
    Int,
    /// [`Value::Double`]
    Double,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::Char`]
    Char,
    /// [`Value::String`]
    String,
    /// [`Value::Object`]
    Object,
    /// [`Value::Array`]
    Array,
    /// [`Value::DataRef`]
    DataRef,
    /// [`Value::AttrRef`]
    AttrRef,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
            Self::DataRef => "data-ref",
            Self::AttrRef => "attr-ref",
        })
    }
}

impl Value {
    /// Tag of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Bool(_) => ValueKind::Bool,
            Self::Char(_) => ValueKind::Char,
            Self::String(_) => ValueKind::String,
            Self::Object(_) => ValueKind::Object,
            Self::Array(_) => ValueKind::Array,
            Self::DataRef { .. } => ValueKind::DataRef,
            Self::AttrRef { .. } => ValueKind::AttrRef,
        }
    }

    /// Builds an `Object` from `(name, value)` pairs.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Integer view for the Int family: Int as is, Bool as 0/1.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Float view for the Double family: Double only, Int is not widened.
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Float view for ordering comparisons: Int, Double, Bool and Char.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_ordered(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Char(c) => Some(f64::from(u32::from(*c))),
            _ => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// True for `DataRef`/`AttrRef`.
    pub const fn is_reference(&self) -> bool { matches!(self, Self::DataRef { .. } | Self::AttrRef { .. }) }

    /// Representational equality used by `cmp_eq`/`cmp_ne`.
    ///
    /// Int and Bool share the integer representation; Int and Double never
    /// compare equal. Containers compare element-wise.
    pub fn repr_eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.as_int(), other.as_int()) {
            return a == b;
        }
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|((ka, va), (kb, vb))| ka == kb && va.repr_eq(vb))
            }
            (Self::Array(a), Self::Array(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.repr_eq(y)),
            (Self::DataRef { .. }, Self::DataRef { .. }) | (Self::AttrRef { .. }, Self::AttrRef { .. }) => self == other,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::String(s) => f.write_str(s),
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Self::DataRef { name, scope } => write!(f, "<{scope} {name}>"),
            Self::AttrRef { name, owner } => write!(f, "<attr {name} of #{owner}>"),
        }
    }
}

/* Conversions */
impl From<i64> for Value { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Self::Int(i64::from(v)) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Self::Double(v) } }
impl From<bool> for Value { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<char> for Value { fn from(v: char) -> Self { Self::Char(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Self::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Self::String(v.to_owned()) } }
impl From<Vec<Value>> for Value { fn from(v: Vec<Value>) -> Self { Self::Array(v) } }
impl From<BTreeMap<String, Value>> for Value { fn from(v: BTreeMap<String, Value>) -> Self { Self::Object(v) } }
