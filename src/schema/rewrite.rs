use super::identifier::{IdentifierCapability, IdentifierRef};
use super::types::{Origin, Primitive, RecordType, TypeDesc, TypeKey};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A descriptor after rewriting: records have become [`SchemaModel`]s and
/// managed record types have become [`IdentifierRef`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    /// Returned unchanged by the rewriter
    Leaf(TypeDesc),
    Identifier(Arc<IdentifierRef>),
    Model(Arc<SchemaModel>),
    /// Back-edge to a model whose synthesis was in progress when it was met
    ModelRef { name: String, key: TypeKey },
    Sequence(Box<SchemaType>),
    Set(Box<SchemaType>),
    Mapping(Box<SchemaType>, Box<SchemaType>),
    Tuple(Vec<SchemaType>),
    VarTuple(Box<SchemaType>),
    Union(Vec<SchemaType>),
}

impl SchemaType {
    pub fn leaf(p: Primitive) -> Self {
        SchemaType::Leaf(TypeDesc::Primitive(p))
    }

    /// Optional fields are unions admitting null, or `any`
    pub fn is_optional(&self) -> bool {
        match self {
            SchemaType::Leaf(TypeDesc::Primitive(Primitive::Null | Primitive::Any)) => true,
            SchemaType::Union(members) => members.iter().any(SchemaType::is_optional),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub ty: SchemaType,
    pub required: bool,
}

/// A synthesized schema node: a name and an ordered field list.
///
/// Models synthesized from records carry the record's [`TypeKey`]; two
/// models may share a name while describing different types.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    pub name: String,
    pub key: Option<TypeKey>,
    pub fields: Vec<SchemaField>,
}

impl SchemaModel {
    pub fn new(name: impl Into<String>) -> Self {
        SchemaModel {
            name: name.into(),
            key: None,
            fields: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: TypeKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Append a required field
    pub fn field(mut self, name: impl Into<String>, ty: SchemaType) -> Self {
        self.fields.push(SchemaField {
            name: name.into(),
            ty,
            required: true,
        });
        self
    }

    /// Append a field that is required unless its type admits null
    pub fn field_auto(mut self, name: impl Into<String>, ty: SchemaType) -> Self {
        let required = !ty.is_optional();
        self.fields.push(SchemaField {
            name: name.into(),
            ty,
            required,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Default)]
struct RegistryState {
    models: HashMap<TypeKey, Arc<SchemaModel>>,
    identifiers: HashMap<TypeKey, Arc<IdentifierRef>>,
}

/// Identity caches for the rewriter.
///
/// A source type maps to exactly one synthesized model (or identifier ref)
/// for as long as the registry lives. Share one registry between documents
/// by cloning its `Arc`.
#[derive(Default)]
pub struct TypeRegistry {
    state: Mutex<RegistryState>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_model(&self, key: &TypeKey) -> Option<Arc<SchemaModel>> {
        self.state.lock().models.get(key).cloned()
    }

    pub fn cached_identifier(&self, key: &TypeKey) -> Option<Arc<IdentifierRef>> {
        self.state.lock().identifiers.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.models.len() + state.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached model and identifier ref
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.models.clear();
        state.identifiers.clear();
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TypeRegistry")
            .field("models", &state.models.len())
            .field("identifiers", &state.identifiers.len())
            .finish()
    }
}

/// Rewrites type descriptors into schema types.
///
/// The set of records under synthesis belongs to the rewriter, so rewriters
/// running on other threads over the same registry never see each other's
/// partial work. Racing rewriters may both synthesize a record; the first
/// model cached wins.
pub struct TypeRewriter<'a> {
    registry: &'a TypeRegistry,
    identifiers: Option<&'a dyn IdentifierCapability>,
    in_progress: RefCell<HashSet<TypeKey>>,
}

impl<'a> TypeRewriter<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        TypeRewriter {
            registry,
            identifiers: None,
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_identifiers(mut self, identifiers: Option<&'a dyn IdentifierCapability>) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn rewrite(&self, ty: &TypeDesc) -> SchemaType {
        match ty {
            TypeDesc::External(ext) => {
                if let Some(id_ref) = self.identifier_ref(ext) {
                    return SchemaType::Identifier(id_ref);
                }
                SchemaType::Leaf(ty.clone())
            }
            TypeDesc::Record(record) => self.record_model(record),
            TypeDesc::Generic { origin, args } => self.rewrite_generic(ty, origin, args),
            TypeDesc::Union(members) => {
                SchemaType::Union(members.iter().map(|m| self.rewrite(m)).collect())
            }
            TypeDesc::Primitive(_) | TypeDesc::Declared(_) | TypeDesc::Repeat => {
                SchemaType::Leaf(ty.clone())
            }
        }
    }

    fn identifier_ref(&self, ext: &super::types::ExternalType) -> Option<Arc<IdentifierRef>> {
        if let Some(cached) = self.registry.cached_identifier(&ext.key) {
            return Some(cached);
        }
        let managed = self.identifiers?.managed_record(ext)?;
        let mut state = self.registry.state.lock();
        let id_ref = state
            .identifiers
            .entry(ext.key.clone())
            .or_insert_with(|| Arc::new(IdentifierRef::new(ext, managed)));
        Some(Arc::clone(id_ref))
    }

    fn record_model(&self, record: &RecordType) -> SchemaType {
        let name = format!("{}Schema", record.name());
        if let Some(model) = self.registry.cached_model(record.key()) {
            return SchemaType::Model(model);
        }
        if !self.in_progress.borrow_mut().insert(record.key().clone()) {
            return SchemaType::ModelRef {
                name,
                key: record.key().clone(),
            };
        }

        let fields = record
            .fields()
            .into_iter()
            .map(|f| SchemaField {
                ty: self.rewrite(&f.ty),
                name: f.name,
                required: true,
            })
            .collect();
        debug!(record = %record.key(), model = %name, "synthesized record schema");

        self.in_progress.borrow_mut().remove(record.key());
        let mut state = self.registry.state.lock();
        let model = state.models.entry(record.key().clone()).or_insert_with(|| {
            Arc::new(SchemaModel {
                name,
                key: Some(record.key().clone()),
                fields,
            })
        });
        SchemaType::Model(Arc::clone(model))
    }

    fn rewrite_generic(&self, ty: &TypeDesc, origin: &Origin, args: &[TypeDesc]) -> SchemaType {
        let arg = |i: usize| Box::new(self.rewrite(&args[i]));
        match (origin, args.len()) {
            (Origin::Sequence, 1) => SchemaType::Sequence(arg(0)),
            (Origin::Set, 1) => SchemaType::Set(arg(0)),
            (Origin::Mapping, 2) => SchemaType::Mapping(arg(0), arg(1)),
            (Origin::Tuple, 2) if args[1] == TypeDesc::Repeat => SchemaType::VarTuple(arg(0)),
            (Origin::Tuple, _) => SchemaType::Tuple(args.iter().map(|a| self.rewrite(a)).collect()),
            _ => SchemaType::Leaf(ty.clone()),
        }
    }
}

/// Rewrite with a one-off rewriter over `registry`
pub fn rewrite(
    ty: &TypeDesc,
    registry: &TypeRegistry,
    identifiers: Option<&dyn IdentifierCapability>,
) -> SchemaType {
    TypeRewriter::new(registry)
        .with_identifiers(identifiers)
        .rewrite(ty)
}
