// used to keep the one-to-one mapping between enum member names and their values
use bimap::BiMap;

// used to serialize values into trace records
use serde::ser::{Serialize, SerializeStruct, Serializer};

// used to print out readable forms of a data type
use std::fmt;
// used to indicate that type tags need to be hashable
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{InvokeError, Result};

// ------------- Type Tags -------------
/// The closed set of parameter types a member may declare.
///
/// Arrays nest at most one level; the coercer refuses anything deeper.
#[derive(Clone, Debug)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    String,
    Enum(Arc<EnumDescriptor>),
    Array(Box<TypeTag>),
}

impl TypeTag {
    pub fn array_of(element: TypeTag) -> Self {
        TypeTag::Array(Box::new(element))
    }
    pub fn enumeration(descriptor: &Arc<EnumDescriptor>) -> Self {
        TypeTag::Enum(Arc::clone(descriptor))
    }
    /// Tags that may appear as array elements.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, TypeTag::Array(_))
    }
    pub fn name(&self) -> String {
        match self {
            TypeTag::Int => "Int".into(),
            TypeTag::Float => "Float".into(),
            TypeTag::Bool => "Bool".into(),
            TypeTag::String => "String".into(),
            TypeTag::Enum(e) => e.name().to_owned(),
            TypeTag::Array(element) => format!("{}[]", element.name()),
        }
    }
}
// enums compare by name, two descriptors with the same name are the same type
impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeTag::Int, TypeTag::Int)
            | (TypeTag::Float, TypeTag::Float)
            | (TypeTag::Bool, TypeTag::Bool)
            | (TypeTag::String, TypeTag::String) => true,
            (TypeTag::Enum(a), TypeTag::Enum(b)) => a.name() == b.name(),
            (TypeTag::Array(a), TypeTag::Array(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for TypeTag {}
impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}
impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

// ------------- Enumerations -------------
/// An enumeration with explicit (name, value) pairs.
///
/// Names and values are both unique, which is what allows the bidirectional
/// lookup used when coercing either form.
#[derive(Debug)]
pub struct EnumDescriptor {
    name: String,
    members: BiMap<String, i64>,
}

impl EnumDescriptor {
    pub fn new<N, I, M>(name: N, members: I) -> Result<Arc<Self>>
    where
        N: Into<String>,
        I: IntoIterator<Item = (M, i64)>,
        M: Into<String>,
    {
        let name = name.into();
        let mut kept = BiMap::new();
        for (member, value) in members {
            let member = member.into();
            if kept.insert_no_overwrite(member.clone(), value).is_err() {
                return Err(InvokeError::Registration(format!(
                    "enum {name} declares {member} = {value} twice (by name or by value)"
                )));
            }
        }
        Ok(Arc::new(Self { name, members: kept }))
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members.get_by_left(member).copied()
    }
    pub fn member_of(&self, value: i64) -> Option<&str> {
        self.members.get_by_right(&value).map(String::as_str)
    }
    pub fn is_defined(&self, value: i64) -> bool {
        self.members.contains_right(&value)
    }
    pub fn len(&self) -> usize {
        self.members.len()
    }
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
    /// Renders a value as member names, `A|B` for bit combinations and the
    /// bare integer when no combination of declared members spells it.
    pub fn render(&self, value: i64) -> String {
        if let Some(member) = self.member_of(value) {
            return member.to_owned();
        }
        let mut flags: Vec<(&String, &i64)> = self
            .members
            .iter()
            .filter(|(_, v)| **v != 0 && *v & value == **v)
            .collect();
        flags.sort_by_key(|(_, v)| **v);
        let covered = flags.iter().fold(0, |acc, (_, v)| acc | **v);
        if covered == value && !flags.is_empty() {
            flags.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join("|")
        } else {
            value.to_string()
        }
    }
}

// ------------- Parsed Values -------------
/// A coerced argument or a callee's return value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum { ty: Arc<EnumDescriptor>, value: i64 },
    Array { element: TypeTag, values: Vec<ParsedValue> },
}

impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl ParsedValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            ParsedValue::Int(_) => TypeTag::Int,
            ParsedValue::Float(_) => TypeTag::Float,
            ParsedValue::Bool(_) => TypeTag::Bool,
            ParsedValue::Str(_) => TypeTag::String,
            ParsedValue::Enum { ty, .. } => TypeTag::Enum(Arc::clone(ty)),
            ParsedValue::Array { element, .. } => TypeTag::array_of(element.clone()),
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParsedValue::Int(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParsedValue::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_enum(&self) -> Option<i64> {
        match self {
            ParsedValue::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&[ParsedValue]> {
        match self {
            ParsedValue::Array { values, .. } => Some(values),
            _ => None,
        }
    }
}
impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParsedValue::Int(i) => write!(f, "{i}"),
            ParsedValue::Float(v) => write!(f, "{v}"),
            ParsedValue::Bool(b) => write!(f, "{b}"),
            ParsedValue::Str(s) => write!(f, "{s}"),
            ParsedValue::Enum { ty, value } => write!(f, "{}", ty.render(*value)),
            ParsedValue::Array { values, .. } => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}
impl Serialize for ParsedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ParsedValue", 2)?;
        s.serialize_field("tag", &self.tag())?;
        s.serialize_field("value", &self.to_string())?;
        s.end()
    }
}

// ------------- Data Types --------------
/// Rust types that can be handed to and returned from registered callables.
pub trait DataType: Sized {
    fn tag() -> TypeTag;
    fn from_value(value: &ParsedValue) -> Option<Self>;
    fn into_value(self) -> ParsedValue;
}
impl DataType for i64 {
    fn tag() -> TypeTag {
        TypeTag::Int
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_int()
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Int(self)
    }
}
impl DataType for i32 {
    fn tag() -> TypeTag {
        TypeTag::Int
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_int().and_then(|i| i32::try_from(i).ok())
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Int(self as i64)
    }
}
impl DataType for f64 {
    fn tag() -> TypeTag {
        TypeTag::Float
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_float()
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Float(self)
    }
}
impl DataType for bool {
    fn tag() -> TypeTag {
        TypeTag::Bool
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_bool()
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Bool(self)
    }
}
impl DataType for String {
    fn tag() -> TypeTag {
        TypeTag::String
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Str(self)
    }
}
impl<T: DataType> DataType for Vec<T> {
    fn tag() -> TypeTag {
        TypeTag::array_of(T::tag())
    }
    fn from_value(value: &ParsedValue) -> Option<Self> {
        value.as_array()?.iter().map(T::from_value).collect()
    }
    fn into_value(self) -> ParsedValue {
        ParsedValue::Array {
            element: T::tag(),
            values: self.into_iter().map(T::into_value).collect(),
        }
    }
}

/// Pulls argument `index` out of a coerced argument list as a Rust value.
pub fn arg<T: DataType>(args: &[ParsedValue], index: usize) -> anyhow::Result<T> {
    let value = args
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("missing argument {index}"))?;
    T::from_value(value)
        .ok_or_else(|| anyhow::anyhow!("argument {index} is {} not {}", value.tag(), T::tag()))
}
