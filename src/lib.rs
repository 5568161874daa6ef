//! # sio-asyncapi
//!
//! **sio-asyncapi** builds [AsyncAPI 3.0](https://www.asyncapi.com/docs/reference/specification/v3.0.0)
//! documents describing Socket.IO event APIs. Payload and acknowledgement
//! schemas are synthesized from handler signatures, so the document stays in
//! step with the handlers it describes.
//!
//! ## Architecture
//!
//! - **[`document`]** - the typed document, node views and [`AsyncApiDoc`], the builder
//! - **[`schema`]** - type descriptors, the type rewriter and JSON-Schema rendering
//! - **[`reference`]** - `#/...` pointers, [`RefOr`] and reference resolution
//! - **[`naming`]** - title, prefix and description conventions
//! - **[`linter`]** - reference and consistency checks over a built document
//! - **[`manifest`]** - declarative YAML/JSON description replayed through the builder
//! - **[`cli`]** - the `sio-asyncapi` command line
//! - **[`config`]** / **[`logging`]** - document settings and tracing setup
//!
//! ## Quick Start
//!
//! ```rust
//! use sio_asyncapi::{AsyncApiDoc, ChannelOptions, DocConfig, EventOptions, HandlerSignature, TypeDesc};
//!
//! let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
//! doc.add_channel("chat", ChannelOptions::new())?;
//!
//! let handler = HandlerSignature::new("on_message")
//!     .doc("Send a chat message.")
//!     .param("text", TypeDesc::string())
//!     .returns(TypeDesc::boolean());
//! doc.add_event("chat", "on_message", EventOptions::new().handler(handler))?;
//!
//! assert!(doc.resolve_ref("#/components/schemas/MessagePayload").is_ok());
//! assert!(doc.resolve_ref("#/channels/chat/messages/messageAck").is_ok());
//! println!("{}", doc.to_yaml()?);
//! # Ok::<(), sio_asyncapi::DocError>(())
//! ```
//!
//! ## Deriving Descriptors
//!
//! ```rust,ignore
//! use sio_asyncapi::{event_handler, Reflect};
//!
//! #[derive(Reflect)]
//! struct Room {
//!     name: String,
//!     members: Vec<String>,
//! }
//!
//! /// Join a room.
//! #[event_handler]
//! fn on_join(room: Room, nick: Option<String>) -> bool {
//!     true
//! }
//!
//! doc.add_event("rooms", "on_join", EventOptions::new().handler(on_join_signature()))?;
//! ```
//!
//! ## Sharing Synthesized Models
//!
//! Every document owns a [`TypeRegistry`] unless one is passed to
//! [`AsyncApiDoc::with_registry`]. Documents sharing a registry map the same
//! record type to the same model.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod linter;
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod reference;
pub mod schema;

pub use config::DocConfig;
pub use document::{
    Action, AsyncApi, AsyncApiDoc, ChannelOptions, ComponentKind, ComponentMessage, EventOptions,
    HandlerSignature, ModelSpec, Node, DEFAULT_CHANNEL, NO_SPEC,
};
pub use error::{DocError, Result};
pub use reference::{make_ref, RefOr, Reference, Target};
pub use schema::{
    ExternalType, FieldDesc, IdentifierCapability, ManagedRecord, RecordType, Reflect,
    SchemaModel, SchemaType, TypeDesc, TypeRegistry, UuidRecords,
};
pub use sio_asyncapi_macros::{event_handler, Reflect};
