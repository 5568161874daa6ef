#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end tests for document assembly through `AsyncApiDoc`

use serde_json::json;
use sio_asyncapi::{
    Action, AsyncApiDoc, ChannelOptions, DocConfig, DocError, EventOptions, HandlerSignature,
    ModelSpec, Node, RefOr, SchemaModel, SchemaType, TypeDesc, TypeRegistry,
};
use std::sync::Arc;

fn chat_doc() -> AsyncApiDoc {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    doc.add_channel("chat", ChannelOptions::new()).unwrap();
    let handler = HandlerSignature::new("on_message")
        .doc("Send a chat message.")
        .param("text", TypeDesc::string())
        .returns(TypeDesc::boolean());
    doc.add_event("chat", "on_message", EventOptions::new().handler(handler))
        .unwrap();
    doc
}

#[test]
fn test_event_with_handler_synthesizes_payload_and_ack() {
    let doc = chat_doc();
    let v = doc.to_value().unwrap();
    let schemas = &v["components"]["schemas"];

    assert_eq!(
        schemas["MessagePayload"],
        json!({
            "title": "MessagePayload",
            "type": "object",
            "properties": {"text": {"title": "Text", "type": "string"}},
            "required": ["text"]
        })
    );
    assert_eq!(
        schemas["MessageAck"],
        json!({
            "title": "MessageAck",
            "type": "object",
            "properties": {
                "success": {"title": "Success", "type": "boolean"},
                "error": {"title": "Error"},
                "data": {"title": "Data", "type": "boolean"}
            },
            "required": ["success", "error", "data"]
        })
    );

    let messages = &v["channels"]["chat"]["messages"];
    assert_eq!(messages["message"]["name"], json!("on_message"));
    assert_eq!(messages["message"]["title"], json!("on_message"));
    assert_eq!(messages["message"]["description"], json!("Send a chat message."));
    assert_eq!(
        messages["message"]["payload"],
        json!({"$ref": "#/components/schemas/MessagePayload"})
    );
    assert_eq!(messages["messageAck"]["name"], json!("on_message_ack"));
    assert_eq!(messages["messageAck"]["title"], json!("MessageAck"));
    assert_eq!(
        messages["messageAck"]["payload"],
        json!({"$ref": "#/components/schemas/MessageAck"})
    );

    let op = &v["operations"]["chat/message"];
    assert_eq!(op["action"], json!("receive"));
    assert_eq!(op["channel"], json!({"$ref": "#/channels/chat"}));
    assert_eq!(op["summary"], json!("message"));
    assert_eq!(
        op["messages"],
        json!([{"$ref": "#/channels/chat/messages/message"}])
    );
    assert_eq!(
        op["reply"],
        json!({
            "channel": {"$ref": "#/channels/chat"},
            "messages": [{"$ref": "#/channels/chat/messages/messageAck"}]
        })
    );
    doc.check_references().unwrap();
}

#[test]
fn test_duplicate_event_fails_and_leaves_document_unchanged() {
    let mut doc = chat_doc();
    let before = doc.spec().clone();

    let handler = HandlerSignature::new("on_message").param("body", TypeDesc::integer());
    let err = doc
        .add_event("chat", "on_message", EventOptions::new().handler(handler))
        .unwrap_err();
    assert!(
        matches!(err, DocError::DuplicateMessage { ref scope, ref message } if scope == "chat" && message == "message"),
        "unexpected error: {err}"
    );
    assert_eq!(doc.spec(), &before);
    assert_eq!(
        doc.spec().components.schemas["MessagePayload"]["properties"],
        json!({"text": {"title": "Text", "type": "string"}})
    );
}

#[test]
fn test_resolve_stored_schema_and_missing_one() {
    let doc = chat_doc();
    let node = doc
        .resolve_ref("#/components/schemas/MessagePayload")
        .unwrap();
    assert_eq!(
        node,
        Node::Value(&doc.spec().components.schemas["MessagePayload"])
    );

    let err = doc
        .resolve_ref("#/components/schemas/Missing")
        .unwrap_err();
    assert!(
        matches!(err, DocError::BrokenReference { ref segment, .. } if segment == "Missing"),
        "unexpected error: {err}"
    );
    assert!(matches!(
        doc.resolve_ref("components/schemas/MessagePayload"),
        Err(DocError::MalformedReference(_))
    ));
}

#[test]
fn test_resolve_typed_nodes() {
    let doc = chat_doc();
    let channel = doc.resolve_ref("#/channels/chat").unwrap();
    assert_eq!(channel.as_channel().unwrap().address.as_deref(), Some("chat"));

    let op = doc.resolve_ref("#/operations/chat~1message");
    assert!(op.is_err(), "segments are literal, '/' splits");

    let message = doc
        .resolve_ref("#/channels/chat/messages/messageAck")
        .unwrap();
    assert_eq!(message.as_message().unwrap().name.as_deref(), Some("on_message_ack"));

    let reference = doc.spec().channels["chat"].messages["message"]
        .payload
        .clone()
        .unwrap();
    let via_ref = doc.resolve_ref(&reference).unwrap();
    assert_eq!(via_ref.as_value().unwrap()["title"], json!("MessagePayload"));

    let passthrough = doc.resolve_ref(via_ref).unwrap();
    assert_eq!(passthrough, via_ref);
}

#[test]
fn test_handler_without_return_has_no_reply() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    doc.add_channel("/chat", ChannelOptions::new().title("Chat")).unwrap();
    let handler = HandlerSignature::new("on_typing")
        .param("user", TypeDesc::string())
        .returns(TypeDesc::null());
    doc.add_event(
        "/chat",
        "on_typing",
        EventOptions::new().handler(handler).action(Action::Send).tag("presence"),
    )
    .unwrap();

    let spec = doc.spec();
    assert!(spec.channels["chat"].messages.contains_key("typing"));
    assert!(!spec.channels["chat"].messages.contains_key("typingAck"));
    assert!(!spec.components.schemas.contains_key("TypingAck"));
    let op = &spec.operations["chat/typing"];
    assert_eq!(op.action, Action::Send);
    assert!(op.reply.is_none());
    assert_eq!(op.tags[0].name, "presence");
}

#[test]
fn test_explicit_models_win_over_synthesized_ones() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    doc.add_channel("chat", ChannelOptions::new()).unwrap();
    let payload = SchemaModel::new("ChatLine")
        .field("line", SchemaType::Leaf(TypeDesc::string()));
    let handler = HandlerSignature::new("on_line")
        .param("text", TypeDesc::string())
        .returns(TypeDesc::boolean());
    doc.add_event(
        "chat",
        "on_line",
        EventOptions::new()
            .handler(handler)
            .payload_model(payload)
            .ack_data_model(ModelSpec::NotProvided),
    )
    .unwrap();

    let spec = doc.spec();
    assert!(!spec.components.schemas.contains_key("LinePayload"));
    assert!(!spec.components.schemas.contains_key("LineAck"));
    let messages = &spec.channels["chat"].messages;
    assert_eq!(
        messages["line"].payload.as_ref().and_then(RefOr::reference).unwrap().pointer(),
        "#/components/schemas/ChatLine"
    );
    assert_eq!(
        messages["lineAck"].payload.as_ref().and_then(RefOr::reference).unwrap().pointer(),
        "#/components/schemas/NoSpec"
    );
}

#[test]
fn test_event_on_missing_channel_is_broken_reference() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    let err = doc
        .add_event("lobby", "on_enter", EventOptions::new())
        .unwrap_err();
    assert!(matches!(err, DocError::BrokenReference { ref pointer, .. } if pointer == "#/channels/lobby"));
    assert!(doc.spec().operations.is_empty());
}

#[test]
fn test_duplicate_channel_after_sanitizing() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    doc.add_channel("/chat", ChannelOptions::new()).unwrap();
    let err = doc.add_channel("chat/", ChannelOptions::new()).unwrap_err();
    assert!(matches!(err, DocError::DuplicateChannel(ref id) if id == "chat"));
}

#[test]
fn test_global_tags_are_upserted() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    doc.add_global_tag("chat", None);
    doc.add_global_tag("rooms", Some("Room management"));
    doc.add_global_tag("chat", Some("Chat events"));

    let v = doc.to_value().unwrap();
    assert_eq!(
        v["info"]["tags"],
        json!([
            {"name": "chat", "description": "Chat events"},
            {"name": "rooms", "description": "Room management"}
        ])
    );
}

#[test]
fn test_legacy_receiver_and_sender() {
    let mut doc = AsyncApiDoc::default_init(&DocConfig::default());
    let handler = HandlerSignature::new("on_get_rooms").doc("List rooms.\n    Paginated.");
    let ack = SchemaModel::new("RoomList").field(
        "rooms",
        SchemaType::Sequence(Box::new(SchemaType::Leaf(TypeDesc::string()))),
    );
    doc.add_new_receiver(&handler, "get_rooms", None, Some(ack.into()), Some(ModelSpec::NotProvided))
        .unwrap();
    doc.add_new_sender("room_created", None, Some("A room was created"))
        .unwrap();

    let v = doc.to_value().unwrap();
    let receiver = &v["components"]["messages"]["Get_Rooms"];
    assert_eq!(receiver["name"], json!("get_rooms"));
    assert_eq!(receiver["description"], json!("List rooms.\n   Paginated."));
    assert_eq!(receiver["payload"], json!({"$ref": "#/components/schemas/NoSpec"}));
    assert_eq!(receiver["x-ack"], json!({"$ref": "#/components/schemas/RoomList"}));

    let sender = &v["components"]["messages"]["room_created"];
    assert_eq!(sender["description"], json!("A room was created"));
    assert!(sender.get("payload").is_none());

    let root = &v["channels"]["/"];
    assert_eq!(
        root["publish"]["message"]["oneOf"],
        json!([{"$ref": "#/components/messages/Get_Rooms"}])
    );
    assert_eq!(
        root["subscribe"]["message"]["oneOf"],
        json!([{"$ref": "#/components/messages/room_created"}])
    );

    let err = doc.add_new_sender("room_created", None, None).unwrap_err();
    assert!(matches!(err, DocError::DuplicateMessage { ref scope, .. } if scope == "components"));
    doc.to_yaml().unwrap();
}

#[test]
fn test_shared_registry_yields_identical_models() {
    let registry = Arc::new(TypeRegistry::new());
    let config = DocConfig::default();
    let room = || {
        TypeDesc::record(sio_asyncapi::RecordType::new(
            "Room",
            vec![sio_asyncapi::FieldDesc::new("name", TypeDesc::string())],
        ))
    };

    let mut docs = Vec::new();
    for _ in 0..2 {
        let mut doc = AsyncApiDoc::with_registry(&config, Arc::clone(&registry));
        doc.add_channel("rooms", ChannelOptions::new()).unwrap();
        let handler = HandlerSignature::new("on_join").param("room", room());
        doc.add_event("rooms", "on_join", EventOptions::new().handler(handler))
            .unwrap();
        docs.push(doc);
    }

    assert_eq!(registry.len(), 1);
    assert_eq!(
        docs[0].spec().components.schemas["JoinPayload"],
        docs[1].spec().components.schemas["JoinPayload"]
    );
}

#[test]
fn test_yaml_output_omits_absent_fields() {
    let yaml = chat_doc().to_yaml().unwrap();
    assert!(yaml.starts_with("asyncapi: 3.0.0\n"));
    assert!(!yaml.contains("null"));
    assert!(!yaml.contains("x-ack"));
}

#[test]
fn test_documents_built_on_parallel_threads_share_one_registry() {
    fn slow_fields() -> Vec<sio_asyncapi::FieldDesc> {
        std::thread::sleep(std::time::Duration::from_millis(200));
        vec![sio_asyncapi::FieldDesc::new("name", TypeDesc::string())]
    }
    let registry = Arc::new(TypeRegistry::new());
    let config = DocConfig::default();
    let build = || {
        let mut doc = AsyncApiDoc::with_registry(&config, Arc::clone(&registry));
        doc.add_channel("rooms", ChannelOptions::new()).unwrap();
        let room = TypeDesc::record(sio_asyncapi::RecordType::deferred(
            "Room",
            "tests::Room",
            slow_fields,
        ));
        let handler = HandlerSignature::new("on_join").param("room", room);
        doc.add_event("rooms", "on_join", EventOptions::new().handler(handler))
            .unwrap();
        doc
    };

    let docs = std::thread::scope(|s| {
        let handles = [s.spawn(build), s.spawn(build)];
        handles.map(|h| h.join().unwrap())
    });

    for doc in &docs {
        assert!(doc.spec().channels["rooms"].messages["join"].payload.is_some());
        let schema = &doc.spec().components.schemas["JoinPayload"];
        assert_eq!(
            schema["properties"]["room"],
            json!({"$ref": "#/components/schemas/JoinPayload/definitions/RoomSchema"})
        );
        assert_eq!(
            schema["definitions"]["RoomSchema"]["properties"]["name"]["type"],
            json!("string")
        );
    }
    assert_eq!(registry.len(), 1);
}
