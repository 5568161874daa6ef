use crate::schema::{FieldDesc, SchemaModel, TypeDesc};
use std::sync::Arc;

/// Descriptor of an event handler: what `add_event` synthesizes schemas from.
///
/// `returns` is `None` when the handler declares no return type; a declared
/// null return means "no acknowledgement" as well.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSignature {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<FieldDesc>,
    pub returns: Option<TypeDesc>,
}

impl HandlerSignature {
    pub fn new(name: impl Into<String>) -> Self {
        HandlerSignature {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.params.push(FieldDesc::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: TypeDesc) -> Self {
        self.returns = Some(ty);
        self
    }

    /// Return type that warrants an acknowledgement schema
    pub fn ack_type(&self) -> Option<&TypeDesc> {
        self.returns.as_ref().filter(|ty| !ty.is_null())
    }
}

/// An explicitly supplied payload or acknowledgement model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSpec {
    /// Document the message with the `NoSpec` placeholder schema
    NotProvided,
    Model(Arc<SchemaModel>),
}

impl From<SchemaModel> for ModelSpec {
    fn from(model: SchemaModel) -> Self {
        ModelSpec::Model(Arc::new(model))
    }
}

impl From<Arc<SchemaModel>> for ModelSpec {
    fn from(model: Arc<SchemaModel>) -> Self {
        ModelSpec::Model(model)
    }
}
