use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Leaf types with a direct JSON-Schema rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Any,
    Uuid,
    DateTime,
    Bytes,
}

impl Primitive {
    /// Parse the scalar names accepted in type expressions
    pub fn parse(s: &str) -> Option<Self> {
        let p = match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Primitive::String,
            "int" | "integer" => Primitive::Integer,
            "float" | "number" => Primitive::Number,
            "bool" | "boolean" => Primitive::Boolean,
            "none" | "null" => Primitive::Null,
            "any" => Primitive::Any,
            "uuid" => Primitive::Uuid,
            "datetime" | "date-time" => Primitive::DateTime,
            "bytes" => Primitive::Bytes,
            _ => return None,
        };
        Some(p)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
            Primitive::Any => "any",
            Primitive::Uuid => "uuid",
            Primitive::DateTime => "datetime",
            Primitive::Bytes => "bytes",
        };
        write!(f, "{}", s)
    }
}

/// Generic container origins.
///
/// `Other` carries the name of an origin the rewriter does not recognize;
/// such descriptors stay opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Sequence,
    Set,
    Mapping,
    Tuple,
    Other(String),
}

/// Identity of a native type, used as the key of the registry caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub String);

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named field of a record or handler parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: TypeDesc,
}

impl FieldDesc {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        FieldDesc {
            name: name.into(),
            ty,
        }
    }
}

type FieldFn = Arc<dyn Fn() -> Vec<FieldDesc> + Send + Sync>;

enum FieldSource {
    Eager(Vec<FieldDesc>),
    Deferred(FieldFn),
}

/// A plain structured record: named, statically declared fields and no
/// schema of its own.
///
/// Fields may be deferred so that self-referential records can be described
/// without building a cyclic value.
pub struct RecordType {
    name: String,
    key: TypeKey,
    fields: FieldSource,
}

impl RecordType {
    /// Record whose identity key is its name
    pub fn new(name: impl Into<String>, fields: Vec<FieldDesc>) -> Self {
        let name = name.into();
        RecordType {
            key: TypeKey(name.clone()),
            name,
            fields: FieldSource::Eager(fields),
        }
    }

    /// Record whose fields are produced on demand
    pub fn deferred<F>(name: impl Into<String>, key: impl Into<String>, fields: F) -> Self
    where
        F: Fn() -> Vec<FieldDesc> + Send + Sync + 'static,
    {
        RecordType {
            name: name.into(),
            key: TypeKey(key.into()),
            fields: FieldSource::Deferred(Arc::new(fields)),
        }
    }

    /// Override the identity key (e.g. with a fully qualified type path)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = TypeKey(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub fn fields(&self) -> Vec<FieldDesc> {
        match &self.fields {
            FieldSource::Eager(fields) => fields.clone(),
            FieldSource::Deferred(f) => f(),
        }
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// A type owned by some other library (a data-store model, a foreign struct).
///
/// Only an [`IdentifierCapability`](super::IdentifierCapability) can give it a
/// document schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalType {
    pub name: String,
    pub key: TypeKey,
}

impl ExternalType {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        ExternalType {
            key: TypeKey(name.clone()),
            name,
        }
    }
}

/// Language-neutral type descriptor consumed by the rewriter.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Primitive(Primitive),
    /// A type that declares its own JSON schema
    Declared(Value),
    Record(Arc<RecordType>),
    External(Arc<ExternalType>),
    Generic { origin: Origin, args: Vec<TypeDesc> },
    Union(Vec<TypeDesc>),
    /// Trailing marker of a variable-length tuple (`tuple[T, ...]`)
    Repeat,
}

impl TypeDesc {
    pub fn string() -> Self {
        TypeDesc::Primitive(Primitive::String)
    }

    pub fn integer() -> Self {
        TypeDesc::Primitive(Primitive::Integer)
    }

    pub fn number() -> Self {
        TypeDesc::Primitive(Primitive::Number)
    }

    pub fn boolean() -> Self {
        TypeDesc::Primitive(Primitive::Boolean)
    }

    pub fn null() -> Self {
        TypeDesc::Primitive(Primitive::Null)
    }

    pub fn any() -> Self {
        TypeDesc::Primitive(Primitive::Any)
    }

    pub fn list(item: TypeDesc) -> Self {
        TypeDesc::Generic {
            origin: Origin::Sequence,
            args: vec![item],
        }
    }

    pub fn set(item: TypeDesc) -> Self {
        TypeDesc::Generic {
            origin: Origin::Set,
            args: vec![item],
        }
    }

    pub fn map(key: TypeDesc, value: TypeDesc) -> Self {
        TypeDesc::Generic {
            origin: Origin::Mapping,
            args: vec![key, value],
        }
    }

    pub fn tuple(items: Vec<TypeDesc>) -> Self {
        TypeDesc::Generic {
            origin: Origin::Tuple,
            args: items,
        }
    }

    pub fn var_tuple(item: TypeDesc) -> Self {
        TypeDesc::Generic {
            origin: Origin::Tuple,
            args: vec![item, TypeDesc::Repeat],
        }
    }

    pub fn optional(inner: TypeDesc) -> Self {
        TypeDesc::Union(vec![inner, TypeDesc::null()])
    }

    pub fn record(record: RecordType) -> Self {
        TypeDesc::Record(Arc::new(record))
    }

    pub fn external(name: impl Into<String>) -> Self {
        TypeDesc::External(Arc::new(ExternalType::new(name)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypeDesc::Primitive(Primitive::Null))
    }
}

/// Compile-time descriptor derivation.
///
/// Implemented here for std types; `#[derive(Reflect)]` from
/// `sio_asyncapi_macros` implements it for named-field structs.
pub trait Reflect {
    fn type_desc() -> TypeDesc;
}

macro_rules! reflect_primitive {
    ($prim:ident => $($ty:ty),+) => {
        $(impl Reflect for $ty {
            fn type_desc() -> TypeDesc {
                TypeDesc::Primitive(Primitive::$prim)
            }
        })+
    };
}

reflect_primitive!(String => String, str, char);
reflect_primitive!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
reflect_primitive!(Number => f32, f64);
reflect_primitive!(Boolean => bool);
reflect_primitive!(Null => ());
reflect_primitive!(Any => Value);
reflect_primitive!(Uuid => uuid::Uuid);

impl<T: Reflect + ?Sized> Reflect for &T {
    fn type_desc() -> TypeDesc {
        T::type_desc()
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_desc() -> TypeDesc {
        T::type_desc()
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::optional(T::type_desc())
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::list(T::type_desc())
    }
}

impl<T: Reflect> Reflect for [T] {
    fn type_desc() -> TypeDesc {
        TypeDesc::list(T::type_desc())
    }
}

impl<T: Reflect, S> Reflect for HashSet<T, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::set(T::type_desc())
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::set(T::type_desc())
    }
}

impl<K: Reflect, V: Reflect, S> Reflect for HashMap<K, V, S> {
    fn type_desc() -> TypeDesc {
        TypeDesc::map(K::type_desc(), V::type_desc())
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn type_desc() -> TypeDesc {
        TypeDesc::map(K::type_desc(), V::type_desc())
    }
}

macro_rules! reflect_tuple {
    ($($name:ident),+) => {
        impl<$($name: Reflect),+> Reflect for ($($name,)+) {
            fn type_desc() -> TypeDesc {
                TypeDesc::tuple(vec![$($name::type_desc()),+])
            }
        }
    };
}

reflect_tuple!(A);
reflect_tuple!(A, B);
reflect_tuple!(A, B, C);
reflect_tuple!(A, B, C, D);
