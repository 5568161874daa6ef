use super::handler::{HandlerSignature, ModelSpec};
use super::model::*;
use super::node::Node;
use crate::config::DocConfig;
use crate::error::{DocError, Result};
use crate::naming::{
    dedent_description, model_prefix, sanitize_id, strip_handler_prefix, titleize,
};
use crate::reference::{self, collect_refs, make_ref, RefOr, Reference, Target};
use crate::schema::{
    add_ref_prepath, render_model, IdentifierCapability, SchemaModel, SchemaType, TypeDesc,
    TypeRegistry, TypeRewriter,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Appended to the configured description of every bootstrapped document
pub const ADD_DESCRIPTION: &str = "
<br/> AsyncAPI currently does not support Socket.IO binding and Web Socket like syntax used for now.
In order to add support for Socket.IO ACK value, AsyncAPI is extended with with x-ack keyword.
This documentation should **NOT** be used for generating code due to these limitations.
";

/// Name of the placeholder schema seeded into every document
pub const NO_SPEC: &str = "NoSpec";

/// Key of the legacy single channel used by receivers and senders
pub const DEFAULT_CHANNEL: &str = "/";

/// Optional settings for [`AsyncApiDoc::add_channel`]
#[derive(Debug, Clone, Default)]
pub struct ChannelOptions {
    pub address: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Names of document servers the channel is available on
    pub servers: Vec<String>,
}

impl ChannelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn server(mut self, name: impl Into<String>) -> Self {
        self.servers.push(name.into());
        self
    }
}

/// Optional settings for [`AsyncApiDoc::add_event`]
#[derive(Debug, Clone, Default)]
pub struct EventOptions {
    pub handler: Option<HandlerSignature>,
    pub title: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub ack_data_model: Option<ModelSpec>,
    pub payload_model: Option<ModelSpec>,
    pub action: Action,
}

impl EventOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(mut self, handler: HandlerSignature) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn ack_data_model(mut self, model: impl Into<ModelSpec>) -> Self {
        self.ack_data_model = Some(model.into());
        self
    }

    pub fn payload_model(mut self, model: impl Into<ModelSpec>) -> Self {
        self.payload_model = Some(model.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }
}

/// A schema ready to be wired in: the pointer to use and, for models, the
/// rendered value still to be inserted.
#[derive(Debug)]
struct PreparedSchema {
    reference: Reference,
    insert: Option<(String, Value)>,
}

/// Incrementally built AsyncAPI document.
///
/// Every mutating call either completes or returns an error with the
/// document unchanged.
#[derive(Clone)]
pub struct AsyncApiDoc {
    spec: AsyncApi,
    registry: Arc<TypeRegistry>,
    identifiers: Option<Arc<dyn IdentifierCapability>>,
}

impl std::fmt::Debug for AsyncApiDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncApiDoc")
            .field("spec", &self.spec)
            .field("registry", &self.registry)
            .field("identifiers", &self.identifiers.is_some())
            .finish()
    }
}

impl AsyncApiDoc {
    /// Bootstrap a document with its own type registry.
    ///
    /// The result has the format version, an info block whose description
    /// carries [`ADD_DESCRIPTION`], one server, empty channel and operation
    /// tables and the [`NO_SPEC`] placeholder schema.
    pub fn default_init(config: &DocConfig) -> Self {
        Self::with_registry(config, Arc::new(TypeRegistry::new()))
    }

    /// Bootstrap a document sharing `registry` with other documents
    pub fn with_registry(config: &DocConfig, registry: Arc<TypeRegistry>) -> Self {
        info!(
            server_url = %config.server_url,
            server_name = %config.server_name,
            server_protocol = %config.server_protocol,
            "initializing document"
        );

        let mut servers = BTreeMap::new();
        servers.insert(
            config.server_name.clone(),
            Server::new(&config.server_url, &config.server_protocol),
        );

        let mut components = Components::default();
        components.schemas.insert(
            NO_SPEC.to_string(),
            json!({"description": "Specification is not provided"}),
        );

        let spec = AsyncApi {
            asyncapi: ASYNCAPI_VERSION.to_string(),
            info: Info {
                title: config.title.clone(),
                version: config.version.clone(),
                description: Some(format!("{}{}", config.description, ADD_DESCRIPTION)),
                terms_of_service: None,
                contact: None,
                license: None,
                tags: Vec::new(),
                external_docs: None,
            },
            servers,
            default_content_type: None,
            channels: BTreeMap::new(),
            operations: BTreeMap::new(),
            components,
        };

        AsyncApiDoc {
            spec,
            registry,
            identifiers: None,
        }
    }

    /// Recognize managed record types through `identifiers`
    pub fn with_identifiers(mut self, identifiers: Arc<dyn IdentifierCapability>) -> Self {
        self.identifiers = Some(identifiers);
        self
    }

    pub fn spec(&self) -> &AsyncApi {
        &self.spec
    }

    pub fn into_spec(self) -> AsyncApi {
        self.spec
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// `#<path>`
    pub fn make_ref(&self, path: &str) -> Reference {
        make_ref(path)
    }

    /// Resolve a pointer (or pass a node through) against the current state.
    ///
    /// # Errors
    ///
    /// [`DocError::MalformedReference`] or [`DocError::BrokenReference`]
    pub fn resolve_ref<'p, 's>(&'s self, target: impl Into<Target<'p, 's>>) -> Result<Node<'s>> {
        reference::resolve(Node::Document(&self.spec), target.into())
    }

    /// Insert `node` into `components.<kind>[name]`, replacing any previous
    /// entry, and return its pointer.
    ///
    /// # Errors
    ///
    /// - [`DocError::UnknownComponentKind`] when `kind` names no components table
    /// - [`DocError::Serialization`] when `node` does not serialize
    ///
    /// A `messages` entry that does not read as a message object is kept
    /// as a raw value.
    pub fn add_component<T: Serialize>(
        &mut self,
        node: &T,
        kind: &str,
        name: &str,
    ) -> Result<Reference> {
        let kind: ComponentKind = kind.parse()?;
        let value = serde_json::to_value(node)?;
        let components = &mut self.spec.components;
        match kind {
            ComponentKind::Schemas => {
                components.schemas.insert(name.to_string(), value);
            }
            ComponentKind::Messages => {
                let message: ComponentMessage = serde_json::from_value(value)?;
                components.messages.insert(name.to_string(), message);
            }
            other => {
                components
                    .tables
                    .entry(other.as_str().to_string())
                    .or_default()
                    .insert(name.to_string(), value);
            }
        }
        debug!(kind = %kind, name, "registered component");
        Ok(make_ref(&format!("/components/{kind}/{name}")))
    }

    /// Add a tag to `info.tags`, or update the description of the tag
    /// already carrying `name`
    pub fn add_global_tag(&mut self, name: &str, description: Option<&str>) {
        let description = description.map(str::to_string);
        match self.spec.info.tags.iter_mut().find(|t| t.name == name) {
            Some(tag) => tag.description = description,
            None => self.spec.info.tags.push(Tag {
                name: name.to_string(),
                description,
                external_docs: None,
            }),
        }
    }

    /// Register a channel under `id` with slashes stripped.
    ///
    /// The address defaults to the raw `id` and the title to the titleized
    /// sanitized id.
    ///
    /// # Errors
    ///
    /// [`DocError::DuplicateChannel`] if the sanitized id is taken
    pub fn add_channel(&mut self, id: &str, options: ChannelOptions) -> Result<()> {
        let key = sanitize_id(id);
        if self.spec.channels.contains_key(&key) {
            return Err(DocError::DuplicateChannel(key));
        }
        let channel = Channel {
            address: Some(options.address.unwrap_or_else(|| id.to_string())),
            title: Some(options.title.unwrap_or_else(|| titleize(&key))),
            summary: options.summary,
            description: options.description,
            servers: options
                .servers
                .iter()
                .map(|s| make_ref(&format!("/servers/{s}")))
                .collect(),
            ..Default::default()
        };
        debug!(channel = %key, "registered channel");
        self.spec.channels.insert(key, channel);
        Ok(())
    }

    /// Register an event on `channel`: its message, its operation
    /// `<channel>/<id>` and, for handlers with a return type, the
    /// acknowledgement message and reply.
    ///
    /// A leading `on_` is stripped from `id`. With a handler, the payload
    /// model `<Prefix>Payload` mirrors its parameters and the ack model
    /// `<Prefix>Ack` carries `success`, `error` and `data`; explicit models
    /// win over synthesized ones. A synthesized name already holding another
    /// shape is qualified with the channel (`LobbyMessagePayload`). A model
    /// that cannot be rendered is skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`DocError::BrokenReference`] if the channel does not exist
    /// - [`DocError::DuplicateMessage`] / [`DocError::DuplicateOperation`]
    /// - [`DocError::SchemaConflict`] if a model name is taken by another shape
    pub fn add_event(&mut self, channel: &str, id: &str, options: EventOptions) -> Result<()> {
        let id = strip_handler_prefix(id).to_string();
        let channel_id = sanitize_id(channel);
        let channel_ref = make_ref(&format!("/channels/{channel_id}"));
        let ack_id = format!("{id}Ack");
        let operation_id = format!("{channel_id}/{id}");

        let existing = self
            .spec
            .channels
            .get(&channel_id)
            .ok_or_else(|| DocError::broken(channel_ref.pointer(), &channel_id))?;
        if existing.messages.contains_key(&id) {
            return Err(DocError::DuplicateMessage {
                scope: channel_id,
                message: id,
            });
        }
        if self.spec.operations.contains_key(&operation_id) {
            return Err(DocError::DuplicateOperation(operation_id));
        }

        let EventOptions {
            handler,
            title,
            mut name,
            summary,
            mut description,
            tags,
            mut ack_data_model,
            mut payload_model,
            action,
        } = options;

        let prefix = model_prefix(&id);
        if let Some(handler) = &handler {
            name.get_or_insert_with(|| handler.name.clone());
            if description.is_none() {
                description = handler.doc.as_deref().map(dedent_description);
            }
            if payload_model.is_none() {
                let model = self.payload_model(&prefix, handler);
                payload_model = Some(self.scoped_to_channel(model, &channel_id).into());
            }
            if ack_data_model.is_none() {
                if let Some(ret) = handler.ack_type() {
                    let model = self.ack_model(&prefix, ret);
                    ack_data_model = Some(self.scoped_to_channel(model, &channel_id).into());
                }
            }
        }
        let name = name.unwrap_or_else(|| id.clone());
        let title = title.unwrap_or_else(|| name.clone());

        let mut payload = self.prepare_lenient(payload_model.as_ref(), &id, "payload")?;
        let mut ack = self.prepare_lenient(ack_data_model.as_ref(), &id, "ack")?;
        if let (Some(p), Some(a)) = (&payload, &ack) {
            if let (Some((pn, pv)), Some((an, av))) = (&p.insert, &a.insert) {
                if pn == an && pv != av {
                    return Err(DocError::SchemaConflict(an.clone()));
                }
            }
        }
        if ack.is_some() && existing.messages.contains_key(&ack_id) {
            return Err(DocError::DuplicateMessage {
                scope: channel_id,
                message: ack_id,
            });
        }

        // Every check has passed; from here on nothing fails.
        for prepared in [payload.as_mut(), ack.as_mut()].into_iter().flatten() {
            if let Some((schema_name, value)) = prepared.insert.take() {
                self.insert_schema(schema_name, value);
            }
        }

        let tags: Vec<Tag> = tags.iter().map(Tag::named).collect();
        let Some(channel_obj) = self.spec.channels.get_mut(&channel_id) else {
            return Err(DocError::broken(channel_ref.pointer(), &channel_id));
        };

        let reply = ack.map(|ack| {
            let ack_message = Message {
                name: Some(format!("{name}_ack")),
                title: Some(format!("{prefix}Ack")),
                payload: Some(ack.reference.into()),
                tags: tags.clone(),
                ..Default::default()
            };
            channel_obj.messages.insert(ack_id.clone(), ack_message);
            OperationReply {
                address: None,
                channel: Some(channel_ref.clone()),
                messages: vec![make_ref(&format!(
                    "/channels/{channel_id}/messages/{ack_id}"
                ))],
            }
        });

        let message = Message {
            name: Some(name),
            title: Some(title.clone()),
            summary,
            description,
            payload: payload.map(|p| p.reference.into()),
            tags: tags.clone(),
            ..Default::default()
        };
        channel_obj.messages.insert(id.clone(), message);

        let operation = Operation {
            action,
            channel: channel_ref,
            title: Some(title),
            summary: Some(id.clone()),
            description: None,
            messages: vec![make_ref(&format!("/channels/{channel_id}/messages/{id}"))],
            reply: reply.map(RefOr::Object),
            tags,
            external_docs: None,
            security: None,
            bindings: None,
            traits: None,
        };
        debug!(operation = %operation_id, action = %action, "registered event");
        self.spec.operations.insert(operation_id, operation);
        Ok(())
    }

    /// Legacy path: register a component message for an incoming event and
    /// list it in the default channel's `publish.message.oneOf`.
    ///
    /// `message_name` defaults to the titleized `name`. Receivers carry their
    /// acknowledgement schema under `x-ack`.
    ///
    /// # Errors
    ///
    /// - [`DocError::DuplicateMessage`] if the component message name is taken
    /// - [`DocError::Schema`] / [`DocError::SchemaConflict`] for explicit models
    pub fn add_new_receiver(
        &mut self,
        handler: &HandlerSignature,
        name: &str,
        message_name: Option<&str>,
        ack_data_model: Option<ModelSpec>,
        payload_model: Option<ModelSpec>,
    ) -> Result<()> {
        let message_name = message_name.map_or_else(|| titleize(name), str::to_string);
        self.ensure_component_message_free(&message_name)?;

        let ack = ack_data_model
            .as_ref()
            .map(|m| self.prepare_schema(m))
            .transpose()?;
        let payload = payload_model
            .as_ref()
            .map(|m| self.prepare_schema(m))
            .transpose()?;
        if let (Some(p), Some(a)) = (&payload, &ack) {
            if let (Some((pn, pv)), Some((an, av))) = (&p.insert, &a.insert) {
                if pn == an && pv != av {
                    return Err(DocError::SchemaConflict(an.clone()));
                }
            }
        }

        let mut message = Message {
            name: Some(name.to_string()),
            description: handler
                .doc
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(dedent_description),
            ..Default::default()
        };
        if let Some(ack) = ack {
            message
                .extensions
                .insert("x-ack".to_string(), serde_json::to_value(&ack.reference)?);
            if let Some((schema_name, value)) = ack.insert {
                self.insert_schema(schema_name, value);
            }
        }
        if let Some(payload) = payload {
            message.payload = Some(payload.reference.into());
            if let Some((schema_name, value)) = payload.insert {
                self.insert_schema(schema_name, value);
            }
        }

        self.spec
            .components
            .messages
            .insert(message_name.clone(), message.into());
        let publish = self
            .default_channel()
            .publish
            .get_or_insert_with(LegacyOperation::default);
        publish
            .message
            .one_of
            .push(make_ref(&format!("/components/messages/{message_name}")));
        debug!(message = %message_name, "registered receiver");
        Ok(())
    }

    /// Legacy path: register a component message named `event` for an
    /// outgoing event and list it in the default channel's
    /// `subscribe.message.oneOf`.
    ///
    /// # Errors
    ///
    /// - [`DocError::DuplicateMessage`] if the component message name is taken
    /// - [`DocError::Schema`] / [`DocError::SchemaConflict`] for explicit models
    pub fn add_new_sender(
        &mut self,
        event: &str,
        payload_model: Option<ModelSpec>,
        description: Option<&str>,
    ) -> Result<()> {
        self.ensure_component_message_free(event)?;
        let payload = payload_model
            .as_ref()
            .map(|m| self.prepare_schema(m))
            .transpose()?;

        let mut message = Message {
            name: Some(event.to_string()),
            description: description
                .filter(|d| !d.is_empty())
                .map(dedent_description),
            ..Default::default()
        };
        if let Some(payload) = payload {
            message.payload = Some(payload.reference.into());
            if let Some((schema_name, value)) = payload.insert {
                self.insert_schema(schema_name, value);
            }
        }

        self.spec
            .components
            .messages
            .insert(event.to_string(), message.into());
        let subscribe = self
            .default_channel()
            .subscribe
            .get_or_insert_with(LegacyOperation::default);
        subscribe
            .message
            .one_of
            .push(make_ref(&format!("/components/messages/{event}")));
        debug!(message = %event, "registered sender");
        Ok(())
    }

    /// Check that every `$ref` in the document resolves
    pub fn check_references(&self) -> Result<()> {
        let value = self.to_value()?;
        for (_, pointer) in collect_refs(&value) {
            self.resolve_ref(pointer.as_str())?;
        }
        Ok(())
    }

    /// The document as a plain nested value, absent fields omitted
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.spec)?)
    }

    /// YAML text of the document.
    ///
    /// # Errors
    ///
    /// [`DocError::BrokenReference`] / [`DocError::MalformedReference`] if a
    /// `$ref` does not resolve
    pub fn to_yaml(&self) -> Result<String> {
        self.check_references()?;
        Ok(serde_yaml::to_string(&self.spec)?)
    }

    /// Pretty-printed JSON text of the document
    pub fn to_json(&self) -> Result<String> {
        self.check_references()?;
        Ok(serde_json::to_string_pretty(&self.spec)?)
    }

    fn rewriter(&self) -> TypeRewriter<'_> {
        TypeRewriter::new(&self.registry).with_identifiers(self.identifiers.as_deref())
    }

    fn payload_model(&self, prefix: &str, handler: &HandlerSignature) -> SchemaModel {
        let rewriter = self.rewriter();
        handler
            .params
            .iter()
            .fold(SchemaModel::new(format!("{prefix}Payload")), |model, p| {
                model.field_auto(&p.name, rewriter.rewrite(&p.ty))
            })
    }

    fn ack_model(&self, prefix: &str, returns: &TypeDesc) -> SchemaModel {
        SchemaModel::new(format!("{prefix}Ack"))
            .field("success", SchemaType::Leaf(TypeDesc::boolean()))
            .field(
                "error",
                SchemaType::Union(vec![
                    SchemaType::Leaf(TypeDesc::any()),
                    SchemaType::Leaf(TypeDesc::null()),
                ]),
            )
            .field("data", self.rewriter().rewrite(returns))
    }

    /// Qualify a synthesized model's name with its channel when another shape
    /// is already registered under the plain name
    fn scoped_to_channel(&self, mut model: SchemaModel, channel_id: &str) -> SchemaModel {
        let taken = self.spec.components.schemas.get(&model.name).is_some_and(|existing| {
            let path = format!("/components/schemas/{}", model.name);
            render_model(&model, Some(&self.registry))
                .map(|mut value| {
                    add_ref_prepath(&mut value, &path);
                    value != *existing
                })
                .unwrap_or(false)
        });
        if taken {
            let scoped = format!("{}{}", model_prefix(channel_id), model.name);
            debug!(model = %model.name, scoped = %scoped, "qualified synthesized model with its channel");
            model.name = scoped;
        }
        model
    }

    /// Render `spec` and work out its pointer without touching the document
    fn prepare_schema(&self, spec: &ModelSpec) -> Result<PreparedSchema> {
        let model = match spec {
            ModelSpec::NotProvided => {
                return Ok(PreparedSchema {
                    reference: make_ref(&format!("/components/schemas/{NO_SPEC}")),
                    insert: None,
                })
            }
            ModelSpec::Model(model) => model,
        };
        let path = format!("/components/schemas/{}", model.name);
        let mut value = render_model(model, Some(&self.registry))?;
        add_ref_prepath(&mut value, &path);

        let insert = match self.spec.components.schemas.get(&model.name) {
            Some(existing) if *existing == value => None,
            Some(_) => return Err(DocError::SchemaConflict(model.name.clone())),
            None => Some((model.name.clone(), value)),
        };
        Ok(PreparedSchema {
            reference: make_ref(&path),
            insert,
        })
    }

    /// Like [`prepare_schema`](Self::prepare_schema), but a model that cannot
    /// be rendered is skipped with a warning
    fn prepare_lenient(
        &self,
        spec: Option<&ModelSpec>,
        event: &str,
        role: &str,
    ) -> Result<Option<PreparedSchema>> {
        let Some(spec) = spec else {
            return Ok(None);
        };
        match self.prepare_schema(spec) {
            Ok(prepared) => Ok(Some(prepared)),
            Err(DocError::Schema(err)) => {
                warn!(event, role, error = %err, "skipping schema that cannot be rendered");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn insert_schema(&mut self, name: String, value: Value) {
        debug!(schema = %name, "registered schema");
        self.spec.components.schemas.entry(name).or_insert(value);
    }

    fn ensure_component_message_free(&self, name: &str) -> Result<()> {
        if self.spec.components.messages.contains_key(name) {
            return Err(DocError::DuplicateMessage {
                scope: "components".to_string(),
                message: name.to_string(),
            });
        }
        Ok(())
    }

    fn default_channel(&mut self) -> &mut Channel {
        self.spec
            .channels
            .entry(DEFAULT_CHANNEL.to_string())
            .or_insert_with(|| Channel {
                address: Some(DEFAULT_CHANNEL.to_string()),
                ..Default::default()
            })
    }
}
