use crate::reference::{RefOr, Reference};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Document format version stamped by [`AsyncApiDoc::default_init`](super::AsyncApiDoc::default_init)
pub const ASYNCAPI_VERSION: &str = "3.0.0";

/// Root of an AsyncAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncApi {
    pub asyncapi: String,
    pub info: Info,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub servers: BTreeMap<String, Server>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_content_type: Option<String>,
    #[serde(default)]
    pub channels: BTreeMap<String, Channel>,
    #[serde(default)]
    pub operations: BTreeMap<String, Operation>,
    #[serde(default)]
    pub components: Components,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDocs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
}

impl Tag {
    pub fn named(name: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            description: None,
            external_docs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub host: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Value>,
}

impl Server {
    pub fn new(host: impl Into<String>, protocol: impl Into<String>) -> Self {
        Server {
            host: host.into(),
            protocol: protocol.into(),
            protocol_version: None,
            pathname: None,
            title: None,
            summary: None,
            description: None,
            variables: None,
            security: None,
            bindings: None,
        }
    }
}

/// A channel: an address plus the messages exchanged on it.
///
/// `publish`/`subscribe` only appear on the legacy default channel `/`,
/// where they collect component messages as `oneOf` unions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<LegacyOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<LegacyOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyOperation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub message: OneOfMessages,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOfMessages {
    #[serde(rename = "oneOf", default)]
    pub one_of: Vec<Reference>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Send,
    #[default]
    Receive,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Send => "send",
            Action::Receive => "receive",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(Action::Send),
            "receive" => Ok(Action::Receive),
            other => Err(format!("unknown operation action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub action: Action,
    pub channel: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<RefOr<OperationReply>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bindings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Value>,
}

/// The reply half of a request/acknowledgement operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<RefOr<OperationReplyAddress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReplyAddress {
    /// Runtime expression locating the reply address
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// A schema pointer, or an inline schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RefOr<Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// `x-*` extension keys such as `x-ack`
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Entry of `components.messages`: a message object, or a value registered
/// through [`add_component`](crate::AsyncApiDoc::add_component) that does not
/// read as one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentMessage {
    Message(Message),
    Raw(Value),
}

impl ComponentMessage {
    pub fn message(&self) -> Option<&Message> {
        match self {
            ComponentMessage::Message(m) => Some(m),
            ComponentMessage::Raw(_) => None,
        }
    }
}

impl From<Message> for ComponentMessage {
    fn from(message: Message) -> Self {
        ComponentMessage::Message(message)
    }
}

/// Named tables of the components object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Schemas,
    Messages,
    Servers,
    Channels,
    Operations,
    Replies,
    ReplyAddresses,
    Parameters,
    CorrelationIds,
    OperationTraits,
    MessageTraits,
    ServerBindings,
    ChannelBindings,
    OperationBindings,
    MessageBindings,
    SecuritySchemes,
    ServerVariables,
    ExternalDocs,
    Tags,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 19] = [
        ComponentKind::Schemas,
        ComponentKind::Messages,
        ComponentKind::Servers,
        ComponentKind::Channels,
        ComponentKind::Operations,
        ComponentKind::Replies,
        ComponentKind::ReplyAddresses,
        ComponentKind::Parameters,
        ComponentKind::CorrelationIds,
        ComponentKind::OperationTraits,
        ComponentKind::MessageTraits,
        ComponentKind::ServerBindings,
        ComponentKind::ChannelBindings,
        ComponentKind::OperationBindings,
        ComponentKind::MessageBindings,
        ComponentKind::SecuritySchemes,
        ComponentKind::ServerVariables,
        ComponentKind::ExternalDocs,
        ComponentKind::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Messages => "messages",
            ComponentKind::Servers => "servers",
            ComponentKind::Channels => "channels",
            ComponentKind::Operations => "operations",
            ComponentKind::Replies => "replies",
            ComponentKind::ReplyAddresses => "replyAddresses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::CorrelationIds => "correlationIds",
            ComponentKind::OperationTraits => "operationTraits",
            ComponentKind::MessageTraits => "messageTraits",
            ComponentKind::ServerBindings => "serverBindings",
            ComponentKind::ChannelBindings => "channelBindings",
            ComponentKind::OperationBindings => "operationBindings",
            ComponentKind::MessageBindings => "messageBindings",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::ServerVariables => "serverVariables",
            ComponentKind::ExternalDocs => "externalDocs",
            ComponentKind::Tags => "tags",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = crate::error::DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| crate::error::DocError::UnknownComponentKind(s.to_string()))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reusable objects. Schemas and messages are typed; every other table
/// holds opaque values keyed by its [`ComponentKind`] name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
    #[serde(default)]
    pub messages: BTreeMap<String, ComponentMessage>,
    #[serde(flatten)]
    pub tables: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Components {
    /// Opaque table for `kind`, if anything was registered under it
    pub fn table(&self, kind: ComponentKind) -> Option<&BTreeMap<String, Value>> {
        match kind {
            ComponentKind::Schemas => Some(&self.schemas),
            ComponentKind::Messages => None,
            other => self.tables.get(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::make_ref;
    use serde_json::json;

    #[test]
    fn test_message_omits_absent_fields_and_flattens_extensions() {
        let mut msg = Message {
            name: Some("join".into()),
            payload: Some(make_ref("/components/schemas/NoSpec").into()),
            ..Default::default()
        };
        msg.extensions
            .insert("x-ack".into(), json!({"$ref": "#/components/schemas/NoSpec"}));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "name": "join",
                "payload": {"$ref": "#/components/schemas/NoSpec"},
                "x-ack": {"$ref": "#/components/schemas/NoSpec"}
            })
        );
    }

    #[test]
    fn test_component_kind_parse() {
        assert_eq!("schemas".parse::<ComponentKind>().unwrap(), ComponentKind::Schemas);
        assert_eq!(
            "securitySchemes".parse::<ComponentKind>().unwrap(),
            ComponentKind::SecuritySchemes
        );
        assert!("widgets".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_operation_reply_inline_round_trip() {
        let op: Operation = serde_json::from_value(json!({
            "action": "receive",
            "channel": {"$ref": "#/channels/chat"},
            "reply": {
                "channel": {"$ref": "#/channels/chat"},
                "messages": [{"$ref": "#/channels/chat/messages/messageAck"}]
            }
        }))
        .unwrap();
        assert_eq!(op.action, Action::Receive);
        let reply = op.reply.as_ref().and_then(RefOr::object).unwrap();
        assert_eq!(reply.messages.len(), 1);
    }

    #[test]
    fn test_components_other_tables_are_flattened() {
        let mut c = Components::default();
        c.tables
            .entry("securitySchemes".into())
            .or_default()
            .insert("token".into(), json!({"type": "httpApiKey"}));
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["securitySchemes"]["token"]["type"], json!("httpApiKey"));
        assert_eq!(v["messages"], json!({}));
    }

    #[test]
    fn test_component_message_reads_inline_payload_and_raw_values() {
        let inline: ComponentMessage =
            serde_json::from_value(json!({"name": "raw", "payload": {"type": "string"}})).unwrap();
        let message = inline.message().unwrap();
        assert_eq!(
            message.payload,
            Some(RefOr::Object(json!({"type": "string"})))
        );

        let referenced: ComponentMessage =
            serde_json::from_value(json!({"payload": {"$ref": "#/components/schemas/NoSpec"}}))
                .unwrap();
        assert_eq!(
            referenced.message().unwrap().payload,
            Some(RefOr::Ref(make_ref("/components/schemas/NoSpec")))
        );

        let raw: ComponentMessage = serde_json::from_value(json!("legacy")).unwrap();
        assert_eq!(raw, ComponentMessage::Raw(json!("legacy")));
        assert_eq!(serde_json::to_value(&raw).unwrap(), json!("legacy"));
    }
}
