//! Declarative document description.
//!
//! A manifest lists channels, events with their handler signatures written
//! as [type expressions](TypeExpr), plain records, managed identifier
//! records and legacy receivers/senders. [`Manifest::build`] replays it
//! through the builder.
//!
//! ```yaml
//! document:
//!   title: Chat API
//! identifiers:
//!   User: id
//! records:
//!   - name: Room
//!     fields:
//!       - { name: name, type: str }
//!       - { name: owner, type: User }
//! channels:
//!   - id: chat
//! events:
//!   - channel: chat
//!     id: on_message
//!     handler:
//!       name: on_message
//!       params:
//!         - { name: text, type: str }
//!       returns: bool
//! ```

mod type_expr;

pub use type_expr::{TypeExpr, TypeExprError};

use crate::config::DocConfig;
use crate::document::{
    Action, AsyncApiDoc, ChannelOptions, EventOptions, HandlerSignature, ModelSpec,
};
use crate::schema::{
    rewrite, FieldDesc, IdentifierCapability, RecordType, SchemaModel, TypeDesc, UuidRecords,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub document: DocConfig,
    pub tags: Vec<TagDef>,
    /// Managed record name -> primary-key field
    pub identifiers: BTreeMap<String, String>,
    pub records: Vec<RecordDef>,
    pub channels: Vec<ChannelDef>,
    pub events: Vec<EventDef>,
    pub receivers: Vec<ReceiverDef>,
    pub senders: Vec<SenderDef>,
    pub components: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagDef {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDef {
    pub id: String,
    pub address: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandlerDef {
    pub name: String,
    pub doc: Option<String>,
    #[serde(default)]
    pub params: Vec<FieldDef>,
    pub returns: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModelKeyword {
    NotProvided,
}

/// An explicit model: the `NotProvided` keyword or an inline field list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModelDef {
    Keyword(ModelKeyword),
    Model {
        name: String,
        #[serde(default)]
        fields: Vec<FieldDef>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDef {
    pub channel: String,
    pub id: String,
    pub handler: Option<HandlerDef>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ack: Option<ModelDef>,
    pub payload: Option<ModelDef>,
    #[serde(default)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverDef {
    pub handler: HandlerDef,
    pub name: String,
    pub message_name: Option<String>,
    pub ack: Option<ModelDef>,
    pub payload: Option<ModelDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderDef {
    pub event: String,
    pub description: Option<String>,
    pub payload: Option<ModelDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDef {
    pub kind: String,
    pub name: String,
    pub value: Value,
}

/// Parsed record fields, shared with the deferred record descriptors
#[derive(Debug, Default)]
struct Scope {
    records: HashMap<String, Vec<(String, TypeExpr)>>,
}

impl Scope {
    fn resolve(self: &Arc<Self>, expr: &TypeExpr) -> TypeDesc {
        let named = |name: &str| -> TypeDesc {
            if !self.records.contains_key(name) {
                return TypeDesc::external(name);
            }
            let scope = Arc::clone(self);
            let record = name.to_string();
            TypeDesc::record(RecordType::deferred(
                name,
                format!("manifest::{name}"),
                move || scope.record_fields(&record),
            ))
        };
        expr.to_desc(&named)
    }

    fn record_fields(self: &Arc<Self>, record: &str) -> Vec<FieldDesc> {
        self.records
            .get(record)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(name, expr)| FieldDesc::new(name, self.resolve(expr)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_field(field: &FieldDef) -> Result<(String, TypeExpr)> {
    let expr = TypeExpr::parse(&field.ty)
        .with_context(|| format!("Invalid type for field '{}'", field.name))?;
    Ok((field.name.clone(), expr))
}

impl Manifest {
    /// Load a manifest from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let manifest = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON manifest: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML manifest: {}", path.display()))?
        };
        Ok(manifest)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse YAML manifest")
    }

    /// Build a fresh document from the manifest
    pub fn build(&self) -> Result<AsyncApiDoc> {
        let mut scope = Scope::default();
        for record in &self.records {
            let fields = record
                .fields
                .iter()
                .map(parse_field)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("In record '{}'", record.name))?;
            scope.records.insert(record.name.clone(), fields);
        }
        let scope = Arc::new(scope);

        let identifiers: Option<Arc<UuidRecords>> = (!self.identifiers.is_empty()).then(|| {
            Arc::new(self.identifiers.iter().fold(UuidRecords::new(), |caps, (name, pk)| {
                caps.with_record(name, pk)
            }))
        });

        let mut doc = AsyncApiDoc::default_init(&self.document);
        if let Some(caps) = &identifiers {
            doc = doc.with_identifiers(Arc::clone(caps) as Arc<dyn IdentifierCapability>);
        }
        let ctx = BuildContext {
            scope: &scope,
            identifiers: identifiers.as_deref().map(|c| c as &dyn IdentifierCapability),
        };

        for tag in &self.tags {
            doc.add_global_tag(&tag.name, tag.description.as_deref());
        }

        for ch in &self.channels {
            let options = ChannelOptions {
                address: ch.address.clone(),
                title: ch.title.clone(),
                summary: ch.summary.clone(),
                description: ch.description.clone(),
                servers: ch.servers.clone(),
            };
            doc.add_channel(&ch.id, options)
                .with_context(|| format!("Failed to add channel '{}'", ch.id))?;
        }

        for component in &self.components {
            doc.add_component(&component.value, &component.kind, &component.name)
                .with_context(|| {
                    format!("Failed to add component '{}/{}'", component.kind, component.name)
                })?;
        }

        for event in &self.events {
            let context = || format!("Failed to add event '{}' on '{}'", event.id, event.channel);
            let options = EventOptions {
                handler: event
                    .handler
                    .as_ref()
                    .map(|h| ctx.handler(h))
                    .transpose()
                    .with_context(context)?,
                title: event.title.clone(),
                name: event.name.clone(),
                summary: event.summary.clone(),
                description: event.description.clone(),
                tags: event.tags.clone(),
                ack_data_model: ctx.model(event.ack.as_ref(), &doc).with_context(context)?,
                payload_model: ctx.model(event.payload.as_ref(), &doc).with_context(context)?,
                action: event.action,
            };
            doc.add_event(&event.channel, &event.id, options)
                .with_context(context)?;
        }

        for receiver in &self.receivers {
            let context = || format!("Failed to add receiver '{}'", receiver.name);
            let handler = ctx.handler(&receiver.handler).with_context(context)?;
            let ack = ctx.model(receiver.ack.as_ref(), &doc).with_context(context)?;
            let payload = ctx.model(receiver.payload.as_ref(), &doc).with_context(context)?;
            doc.add_new_receiver(
                &handler,
                &receiver.name,
                receiver.message_name.as_deref(),
                ack,
                payload,
            )
            .with_context(context)?;
        }

        for sender in &self.senders {
            let context = || format!("Failed to add sender '{}'", sender.event);
            let payload = ctx.model(sender.payload.as_ref(), &doc).with_context(context)?;
            doc.add_new_sender(&sender.event, payload, sender.description.as_deref())
                .with_context(context)?;
        }

        debug!(
            channels = doc.spec().channels.len(),
            operations = doc.spec().operations.len(),
            schemas = doc.spec().components.schemas.len(),
            "built document from manifest"
        );
        Ok(doc)
    }
}

struct BuildContext<'a> {
    scope: &'a Arc<Scope>,
    identifiers: Option<&'a dyn IdentifierCapability>,
}

impl BuildContext<'_> {
    fn type_desc(&self, src: &str) -> Result<TypeDesc> {
        Ok(self.scope.resolve(&TypeExpr::parse(src)?))
    }

    fn handler(&self, def: &HandlerDef) -> Result<HandlerSignature> {
        let mut sig = HandlerSignature::new(&def.name);
        sig.doc = def.doc.clone();
        for param in &def.params {
            let ty = self
                .type_desc(&param.ty)
                .with_context(|| format!("Invalid type for parameter '{}'", param.name))?;
            sig = sig.param(&param.name, ty);
        }
        if let Some(returns) = &def.returns {
            sig = sig.returns(self.type_desc(returns).context("Invalid return type")?);
        }
        Ok(sig)
    }

    fn model(&self, def: Option<&ModelDef>, doc: &AsyncApiDoc) -> Result<Option<ModelSpec>> {
        let Some(def) = def else {
            return Ok(None);
        };
        let spec = match def {
            ModelDef::Keyword(ModelKeyword::NotProvided) => ModelSpec::NotProvided,
            ModelDef::Model { name, fields } => {
                let mut model = SchemaModel::new(name);
                for field in fields {
                    let (field_name, expr) = parse_field(field)?;
                    let ty = rewrite(&self.scope.resolve(&expr), doc.registry(), self.identifiers);
                    model = model.field_auto(field_name, ty);
                }
                model.into()
            }
        };
        Ok(Some(spec))
    }
}
