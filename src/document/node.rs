use super::model::*;
use crate::reference::{RefOr, Reference};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A borrowed view of any addressable place in the document.
///
/// Returned by reference resolution; one variant per node kind, plus named
/// tables and opaque JSON values (schemas, bindings).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Document(&'a AsyncApi),
    Info(&'a Info),
    Contact(&'a Contact),
    License(&'a License),
    ExternalDocs(&'a ExternalDocs),
    Tags(&'a [Tag]),
    Tag(&'a Tag),
    Servers(&'a BTreeMap<String, Server>),
    Server(&'a Server),
    Channels(&'a BTreeMap<String, Channel>),
    Channel(&'a Channel),
    LegacyOperation(&'a LegacyOperation),
    OneOf(&'a OneOfMessages),
    Messages(&'a BTreeMap<String, Message>),
    ComponentMessages(&'a BTreeMap<String, ComponentMessage>),
    Message(&'a Message),
    Operations(&'a BTreeMap<String, Operation>),
    Operation(&'a Operation),
    OperationReply(&'a OperationReply),
    ReplyAddress(&'a OperationReplyAddress),
    References(&'a [Reference]),
    Reference(&'a Reference),
    Components(&'a Components),
    Table(&'a BTreeMap<String, Value>),
    Value(&'a Value),
    Str(&'a str),
}

fn opt_str(s: &Option<String>) -> Option<Node<'_>> {
    s.as_deref().map(Node::Str)
}

fn index<'a, T>(items: &'a [T], seg: &str) -> Option<&'a T> {
    seg.parse::<usize>().ok().and_then(|i| items.get(i))
}

impl<'a> Node<'a> {
    /// Step into the child named `seg`, or `None` if it is absent
    pub fn child(self, seg: &str) -> Option<Node<'a>> {
        match self {
            Node::Document(doc) => match seg {
                "asyncapi" => Some(Node::Str(&doc.asyncapi)),
                "info" => Some(Node::Info(&doc.info)),
                "servers" => Some(Node::Servers(&doc.servers)),
                "defaultContentType" => opt_str(&doc.default_content_type),
                "channels" => Some(Node::Channels(&doc.channels)),
                "operations" => Some(Node::Operations(&doc.operations)),
                "components" => Some(Node::Components(&doc.components)),
                _ => None,
            },
            Node::Info(info) => match seg {
                "title" => Some(Node::Str(&info.title)),
                "version" => Some(Node::Str(&info.version)),
                "description" => opt_str(&info.description),
                "termsOfService" => opt_str(&info.terms_of_service),
                "contact" => info.contact.as_ref().map(Node::Contact),
                "license" => info.license.as_ref().map(Node::License),
                "tags" => Some(Node::Tags(&info.tags)),
                "externalDocs" => info.external_docs.as_ref().map(Node::ExternalDocs),
                _ => None,
            },
            Node::Contact(c) => match seg {
                "name" => opt_str(&c.name),
                "url" => opt_str(&c.url),
                "email" => opt_str(&c.email),
                _ => None,
            },
            Node::License(l) => match seg {
                "name" => Some(Node::Str(&l.name)),
                "url" => opt_str(&l.url),
                _ => None,
            },
            Node::ExternalDocs(d) => match seg {
                "description" => opt_str(&d.description),
                "url" => Some(Node::Str(&d.url)),
                _ => None,
            },
            Node::Tags(tags) => index(tags, seg).map(Node::Tag),
            Node::Tag(tag) => match seg {
                "name" => Some(Node::Str(&tag.name)),
                "description" => opt_str(&tag.description),
                "externalDocs" => tag.external_docs.as_ref().map(Node::ExternalDocs),
                _ => None,
            },
            Node::Servers(servers) => servers.get(seg).map(Node::Server),
            Node::Server(s) => match seg {
                "host" => Some(Node::Str(&s.host)),
                "protocol" => Some(Node::Str(&s.protocol)),
                "protocolVersion" => opt_str(&s.protocol_version),
                "pathname" => opt_str(&s.pathname),
                "title" => opt_str(&s.title),
                "summary" => opt_str(&s.summary),
                "description" => opt_str(&s.description),
                "variables" => s.variables.as_ref().map(Node::Value),
                "security" => s.security.as_ref().map(Node::Value),
                "bindings" => s.bindings.as_ref().map(Node::Value),
                _ => None,
            },
            Node::Channels(channels) => channels.get(seg).map(Node::Channel),
            Node::Channel(ch) => match seg {
                "address" => opt_str(&ch.address),
                "messages" => Some(Node::Messages(&ch.messages)),
                "title" => opt_str(&ch.title),
                "summary" => opt_str(&ch.summary),
                "description" => opt_str(&ch.description),
                "servers" => Some(Node::References(&ch.servers)),
                "parameters" => ch.parameters.as_ref().map(Node::Value),
                "tags" => Some(Node::Tags(&ch.tags)),
                "externalDocs" => ch.external_docs.as_ref().map(Node::ExternalDocs),
                "bindings" => ch.bindings.as_ref().map(Node::Value),
                "publish" => ch.publish.as_ref().map(Node::LegacyOperation),
                "subscribe" => ch.subscribe.as_ref().map(Node::LegacyOperation),
                _ => None,
            },
            Node::LegacyOperation(op) => match seg {
                "summary" => opt_str(&op.summary),
                "description" => opt_str(&op.description),
                "message" => Some(Node::OneOf(&op.message)),
                _ => None,
            },
            Node::OneOf(one_of) => match seg {
                "oneOf" => Some(Node::References(&one_of.one_of)),
                _ => None,
            },
            Node::Messages(messages) => messages.get(seg).map(Node::Message),
            Node::ComponentMessages(messages) => messages.get(seg).map(|m| match m {
                ComponentMessage::Message(m) => Node::Message(m),
                ComponentMessage::Raw(v) => Node::Value(v),
            }),
            Node::Message(m) => match seg {
                "name" => opt_str(&m.name),
                "title" => opt_str(&m.title),
                "summary" => opt_str(&m.summary),
                "description" => opt_str(&m.description),
                "contentType" => opt_str(&m.content_type),
                "payload" => m.payload.as_ref().map(|p| match p {
                    RefOr::Ref(r) => Node::Reference(r),
                    RefOr::Object(schema) => Node::Value(schema),
                }),
                "tags" => Some(Node::Tags(&m.tags)),
                other => m.extensions.get(other).map(Node::Value),
            },
            Node::Operations(ops) => ops.get(seg).map(Node::Operation),
            Node::Operation(op) => match seg {
                "action" => Some(Node::Str(op.action.as_str())),
                "channel" => Some(Node::Reference(&op.channel)),
                "title" => opt_str(&op.title),
                "summary" => opt_str(&op.summary),
                "description" => opt_str(&op.description),
                "messages" => Some(Node::References(&op.messages)),
                "reply" => op.reply.as_ref().map(|r| match r {
                    RefOr::Ref(r) => Node::Reference(r),
                    RefOr::Object(reply) => Node::OperationReply(reply),
                }),
                "tags" => Some(Node::Tags(&op.tags)),
                "externalDocs" => op.external_docs.as_ref().map(Node::ExternalDocs),
                "security" => op.security.as_ref().map(Node::Value),
                "bindings" => op.bindings.as_ref().map(Node::Value),
                "traits" => op.traits.as_ref().map(Node::Value),
                _ => None,
            },
            Node::OperationReply(reply) => match seg {
                "address" => reply.address.as_ref().map(|a| match a {
                    RefOr::Ref(r) => Node::Reference(r),
                    RefOr::Object(addr) => Node::ReplyAddress(addr),
                }),
                "channel" => reply.channel.as_ref().map(Node::Reference),
                "messages" => Some(Node::References(&reply.messages)),
                _ => None,
            },
            Node::ReplyAddress(addr) => match seg {
                "location" => Some(Node::Str(&addr.location)),
                "description" => opt_str(&addr.description),
                _ => None,
            },
            Node::References(refs) => index(refs, seg).map(Node::Reference),
            Node::Reference(r) => match seg {
                "$ref" => Some(Node::Str(&r.ref_path)),
                _ => None,
            },
            Node::Components(c) => match seg {
                "schemas" => Some(Node::Table(&c.schemas)),
                "messages" => Some(Node::ComponentMessages(&c.messages)),
                other => c.tables.get(other).map(Node::Table),
            },
            Node::Table(table) => table.get(seg).map(Node::Value),
            Node::Value(value) => match value {
                Value::Object(map) => map.get(seg).map(Node::Value),
                Value::Array(items) => index(items, seg).map(Node::Value),
                _ => None,
            },
            Node::Str(_) => None,
        }
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Document(_) => "document",
            Node::Info(_) => "info",
            Node::Contact(_) => "contact",
            Node::License(_) => "license",
            Node::ExternalDocs(_) => "externalDocs",
            Node::Tags(_) => "tags",
            Node::Tag(_) => "tag",
            Node::Servers(_) => "servers",
            Node::Server(_) => "server",
            Node::Channels(_) => "channels",
            Node::Channel(_) => "channel",
            Node::LegacyOperation(_) => "legacyOperation",
            Node::OneOf(_) => "oneOf",
            Node::Messages(_) | Node::ComponentMessages(_) => "messages",
            Node::Message(_) => "message",
            Node::Operations(_) => "operations",
            Node::Operation(_) => "operation",
            Node::OperationReply(_) => "operationReply",
            Node::ReplyAddress(_) => "replyAddress",
            Node::References(_) => "references",
            Node::Reference(_) => "reference",
            Node::Components(_) => "components",
            Node::Table(_) => "table",
            Node::Value(_) => "value",
            Node::Str(_) => "string",
        }
    }

    pub fn as_value(&self) -> Option<&'a Value> {
        match *self {
            Node::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&'a Message> {
        match *self {
            Node::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&'a Channel> {
        match *self {
            Node::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&'a Operation> {
        match *self {
            Node::Operation(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Node::Document(n) => n.serialize(serializer),
            Node::Info(n) => n.serialize(serializer),
            Node::Contact(n) => n.serialize(serializer),
            Node::License(n) => n.serialize(serializer),
            Node::ExternalDocs(n) => n.serialize(serializer),
            Node::Tags(n) => n.serialize(serializer),
            Node::Tag(n) => n.serialize(serializer),
            Node::Servers(n) => n.serialize(serializer),
            Node::Server(n) => n.serialize(serializer),
            Node::Channels(n) => n.serialize(serializer),
            Node::Channel(n) => n.serialize(serializer),
            Node::LegacyOperation(n) => n.serialize(serializer),
            Node::OneOf(n) => n.serialize(serializer),
            Node::Messages(n) => n.serialize(serializer),
            Node::ComponentMessages(n) => n.serialize(serializer),
            Node::Message(n) => n.serialize(serializer),
            Node::Operations(n) => n.serialize(serializer),
            Node::Operation(n) => n.serialize(serializer),
            Node::OperationReply(n) => n.serialize(serializer),
            Node::ReplyAddress(n) => n.serialize(serializer),
            Node::References(n) => n.serialize(serializer),
            Node::Reference(n) => n.serialize(serializer),
            Node::Components(n) => n.serialize(serializer),
            Node::Table(n) => n.serialize(serializer),
            Node::Value(n) => n.serialize(serializer),
            Node::Str(n) => n.serialize(serializer),
        }
    }
}

/// Document types that can be viewed as a [`Node`]
pub trait AsNode {
    fn as_node(&self) -> Node<'_>;
}

macro_rules! as_node {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl AsNode for $ty {
            fn as_node(&self) -> Node<'_> {
                Node::$variant(self)
            }
        })+
    };
}

as_node!(
    AsyncApi => Document,
    Info => Info,
    Tag => Tag,
    Server => Server,
    Channel => Channel,
    Message => Message,
    Operation => Operation,
    OperationReply => OperationReply,
    OperationReplyAddress => ReplyAddress,
    Reference => Reference,
    Components => Components,
    Value => Value,
);
