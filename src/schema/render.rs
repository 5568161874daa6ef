use super::rewrite::{SchemaModel, SchemaType, TypeRegistry};
use super::types::{Origin, Primitive, TypeDesc, TypeKey};
use crate::naming::titleize_field;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A leaf type has no document schema (opaque external type, unknown
    /// generic origin, stray repeat marker)
    #[error("cannot render field '{field}' of '{model}': no schema for type '{ty}'")]
    Unsupported {
        model: String,
        field: String,
        ty: String,
    },
}

fn describe(ty: &TypeDesc) -> String {
    match ty {
        TypeDesc::Primitive(p) => p.to_string(),
        TypeDesc::Declared(_) => "declared".to_string(),
        TypeDesc::Record(r) => r.name().to_string(),
        TypeDesc::External(e) => e.name.clone(),
        TypeDesc::Generic { origin, .. } => match origin {
            Origin::Other(name) => name.clone(),
            other => format!("{other:?}").to_lowercase(),
        },
        TypeDesc::Union(_) => "union".to_string(),
        TypeDesc::Repeat => "...".to_string(),
    }
}

fn leaf_schema(ty: &TypeDesc) -> Result<Value, String> {
    let schema = match ty {
        TypeDesc::Primitive(p) => match p {
            Primitive::String => json!({"type": "string"}),
            Primitive::Integer => json!({"type": "integer"}),
            Primitive::Number => json!({"type": "number"}),
            Primitive::Boolean => json!({"type": "boolean"}),
            Primitive::Null => json!({"type": "null"}),
            Primitive::Any => json!({}),
            Primitive::Uuid => json!({"type": "string", "format": "uuid"}),
            Primitive::DateTime => json!({"type": "string", "format": "date-time"}),
            Primitive::Bytes => json!({"type": "string", "format": "binary"}),
        },
        TypeDesc::Declared(schema) => schema.clone(),
        other => return Err(describe(other)),
    };
    Ok(schema)
}

/// Prefix a property schema with its title, the way generated models carry them
fn titled(schema: Value, field: &str) -> Value {
    match schema {
        Value::Object(obj) if !obj.contains_key("$ref") && !obj.contains_key("title") => {
            let mut out = Map::new();
            out.insert("title".to_string(), Value::String(titleize_field(field)));
            out.extend(obj);
            Value::Object(out)
        }
        other => other,
    }
}

fn model_pointer(name: &str) -> Value {
    json!({ "$ref": format!("#/definitions/{name}") })
}

/// Identity of a model while rendering: its record key, or its name for
/// models built by hand
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ModelId {
    Key(TypeKey),
    Name(String),
}

impl ModelId {
    fn of(model: &SchemaModel) -> Self {
        match &model.key {
            Some(key) => ModelId::Key(key.clone()),
            None => ModelId::Name(model.name.clone()),
        }
    }
}

/// Renders a [`SchemaModel`] into a JSON-Schema object.
///
/// Nested models are collected once per identity under the root's
/// `definitions` and referenced as `#/definitions/<Name>`; a back-edge to the
/// root itself is `#`. Distinct models sharing a name get numbered
/// definition names (`ItemSchema`, `ItemSchema2`, ...).
struct SchemaRenderer<'a> {
    registry: Option<&'a TypeRegistry>,
    root: ModelId,
    definitions: Map<String, Value>,
    assigned: HashMap<ModelId, String>,
    taken: HashSet<String>,
}

impl<'a> SchemaRenderer<'a> {
    fn model_body(&mut self, model: &SchemaModel) -> Result<Map<String, Value>, SchemaError> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &model.fields {
            let schema = self
                .render_type(&field.ty)
                .map_err(|ty| SchemaError::Unsupported {
                    model: model.name.clone(),
                    field: field.name.clone(),
                    ty,
                })?;
            properties.insert(field.name.clone(), titled(schema, &field.name));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut body = Map::new();
        body.insert("title".to_string(), Value::String(model.name.clone()));
        body.insert("type".to_string(), json!("object"));
        body.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            body.insert("required".to_string(), Value::Array(required));
        }
        Ok(body)
    }

    fn definition_name(&mut self, name: &str) -> String {
        let unique = if self.taken.contains(name) {
            (2..)
                .map(|n| format!("{name}{n}"))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };
        self.taken.insert(unique.clone());
        unique
    }

    /// Pointer to an already placed (or in-flight) model
    fn placed(&self, id: &ModelId) -> Option<Value> {
        if *id == self.root {
            return Some(json!({"$ref": "#"}));
        }
        self.assigned.get(id).map(|name| model_pointer(name))
    }

    fn nested_model(&mut self, model: &SchemaModel) -> Result<Value, String> {
        let id = ModelId::of(model);
        if let Some(pointer) = self.placed(&id) {
            return Ok(pointer);
        }
        let name = self.definition_name(&model.name);
        self.assigned.insert(id, name.clone());
        // Errors inside a nested model surface as the nested type's name
        let body = self.model_body(model).map_err(|e| match e {
            SchemaError::Unsupported { ty, .. } => ty,
        })?;
        self.definitions.insert(name.clone(), Value::Object(body));
        Ok(model_pointer(&name))
    }

    fn render_type(&mut self, ty: &SchemaType) -> Result<Value, String> {
        let schema = match ty {
            SchemaType::Leaf(desc) => leaf_schema(desc)?,
            SchemaType::Identifier(id_ref) => id_ref.schema(),
            SchemaType::Model(model) => self.nested_model(model)?,
            SchemaType::ModelRef { name, key } => match self.placed(&ModelId::Key(key.clone())) {
                Some(pointer) => pointer,
                None => {
                    let model: Arc<SchemaModel> = self
                        .registry
                        .and_then(|r| r.cached_model(key))
                        .ok_or_else(|| name.clone())?;
                    self.nested_model(&model)?
                }
            },
            SchemaType::Sequence(item) | SchemaType::VarTuple(item) => {
                json!({"type": "array", "items": self.render_type(item)?})
            }
            SchemaType::Set(item) => {
                json!({"type": "array", "items": self.render_type(item)?, "uniqueItems": true})
            }
            SchemaType::Mapping(_, value) => {
                json!({"type": "object", "additionalProperties": self.render_type(value)?})
            }
            SchemaType::Tuple(items) => {
                let rendered = items
                    .iter()
                    .map(|i| self.render_type(i))
                    .collect::<Result<Vec<_>, _>>()?;
                let n = rendered.len();
                json!({"type": "array", "items": rendered, "minItems": n, "maxItems": n})
            }
            SchemaType::Union(members) => {
                let non_null: Vec<&SchemaType> = members
                    .iter()
                    .filter(|m| !matches!(m, SchemaType::Leaf(d) if d.is_null()))
                    .collect();
                match non_null.as_slice() {
                    [] => json!({"type": "null"}),
                    [single] => self.render_type(single)?,
                    many => {
                        let any_of = many
                            .iter()
                            .map(|m| self.render_type(m))
                            .collect::<Result<Vec<_>, _>>()?;
                        json!({ "anyOf": any_of })
                    }
                }
            }
        };
        Ok(schema)
    }
}

/// Render `model` as a standalone JSON-Schema object.
///
/// `registry` is consulted for models that were only met as back-edges.
pub fn render_model(model: &SchemaModel, registry: Option<&TypeRegistry>) -> Result<Value, SchemaError> {
    let mut renderer = SchemaRenderer {
        registry,
        root: ModelId::of(model),
        definitions: Map::new(),
        assigned: HashMap::new(),
        taken: HashSet::from([model.name.clone()]),
    };
    let mut body = renderer.model_body(model)?;
    if !renderer.definitions.is_empty() {
        body.insert(
            "definitions".to_string(),
            Value::Object(std::mem::take(&mut renderer.definitions)),
        );
    }
    Ok(Value::Object(body))
}

/// Re-root the internal pointers of a rendered schema at `prefix`.
///
/// `#/definitions/X` becomes `#<prefix>/definitions/X` and `#` becomes
/// `#<prefix>`; pointers into the rest of the document are left alone.
pub fn add_ref_prepath(value: &mut Value, prefix: &str) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(r)) = obj.get_mut("$ref") {
                if r == "#" || r.starts_with("#/definitions/") {
                    *r = format!("#{prefix}{}", &r[1..]);
                }
            }
            for (key, v) in obj.iter_mut() {
                if key != "$ref" {
                    add_ref_prepath(v, prefix);
                }
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                add_ref_prepath(v, prefix);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{rewrite, FieldDesc, RecordType, UuidRecords};

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
    }

    #[test]
    fn test_render_flat_model() {
        let model = SchemaModel::new("MessagePayload")
            .field_auto("text", SchemaType::leaf(Primitive::String))
            .field_auto(
                "room",
                SchemaType::Union(vec![
                    SchemaType::leaf(Primitive::String),
                    SchemaType::leaf(Primitive::Null),
                ]),
            );
        let schema = render_model(&model, None).unwrap();
        assert_eq!(
            schema,
            json!({
                "title": "MessagePayload",
                "type": "object",
                "properties": {
                    "text": {"title": "Text", "type": "string"},
                    "room": {"title": "Room", "type": "string"}
                },
                "required": ["text"]
            })
        );
    }

    #[test]
    fn test_nested_models_go_to_definitions() {
        let reg = registry();
        let address = TypeDesc::record(RecordType::new(
            "Address",
            vec![FieldDesc::new("street", TypeDesc::string())],
        ));
        let model = SchemaModel::new("JoinPayload")
            .field("home", rewrite(&address, &reg, None))
            .field("others", rewrite(&TypeDesc::list(address.clone()), &reg, None));
        let schema = render_model(&model, Some(&reg)).unwrap();
        assert_eq!(schema["properties"]["home"], json!({"$ref": "#/definitions/AddressSchema"}));
        assert_eq!(
            schema["properties"]["others"]["items"],
            json!({"$ref": "#/definitions/AddressSchema"})
        );
        assert_eq!(
            schema["definitions"]["AddressSchema"]["properties"]["street"],
            json!({"title": "Street", "type": "string"})
        );
    }

    #[test]
    fn test_identifier_renders_as_string_format() {
        let reg = registry();
        let caps = UuidRecords::new().with_record("User", "id");
        let model = SchemaModel::new("KickPayload").field(
            "user",
            rewrite(&TypeDesc::external("User"), &reg, Some(&caps)),
        );
        let schema = render_model(&model, Some(&reg)).unwrap();
        assert_eq!(
            schema["properties"]["user"],
            json!({"title": "User", "type": "string", "format": "uuid"})
        );
    }

    #[test]
    fn test_unconvertible_type_is_reported() {
        let reg = registry();
        let model = SchemaModel::new("BadPayload")
            .field("conn", rewrite(&TypeDesc::external("Socket"), &reg, None));
        let err = render_model(&model, Some(&reg)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Unsupported {
                model: "BadPayload".into(),
                field: "conn".into(),
                ty: "Socket".into()
            }
        );
    }

    #[test]
    fn test_containers_and_unions() {
        let model = SchemaModel::new("Mixed")
            .field(
                "tags",
                SchemaType::Set(Box::new(SchemaType::leaf(Primitive::String))),
            )
            .field(
                "scores",
                SchemaType::Mapping(
                    Box::new(SchemaType::leaf(Primitive::String)),
                    Box::new(SchemaType::leaf(Primitive::Number)),
                ),
            )
            .field(
                "pair",
                SchemaType::Tuple(vec![
                    SchemaType::leaf(Primitive::Integer),
                    SchemaType::leaf(Primitive::Boolean),
                ]),
            )
            .field(
                "either",
                SchemaType::Union(vec![
                    SchemaType::leaf(Primitive::Integer),
                    SchemaType::leaf(Primitive::String),
                ]),
            );
        let schema = render_model(&model, None).unwrap();
        let props = &schema["properties"];
        assert_eq!(props["tags"]["uniqueItems"], json!(true));
        assert_eq!(props["scores"]["additionalProperties"], json!({"type": "number"}));
        assert_eq!(props["pair"]["minItems"], json!(2));
        assert_eq!(
            props["either"]["anyOf"],
            json!([{"type": "integer"}, {"type": "string"}])
        );
    }

    #[test]
    fn test_add_ref_prepath_only_touches_internal_pointers() {
        let mut schema = json!({
            "properties": {
                "a": {"$ref": "#/definitions/ASchema"},
                "b": {"items": [{"$ref": "#"}]},
                "c": {"$ref": "#/components/schemas/NoSpec"}
            }
        });
        add_ref_prepath(&mut schema, "/components/schemas/Root");
        assert_eq!(
            schema["properties"]["a"]["$ref"],
            json!("#/components/schemas/Root/definitions/ASchema")
        );
        assert_eq!(
            schema["properties"]["b"]["items"][0]["$ref"],
            json!("#/components/schemas/Root")
        );
        assert_eq!(
            schema["properties"]["c"]["$ref"],
            json!("#/components/schemas/NoSpec")
        );
    }

    #[test]
    fn test_same_named_records_get_distinct_definitions() {
        let reg = registry();
        let first = TypeDesc::record(
            RecordType::new("Item", vec![FieldDesc::new("x", TypeDesc::string())]).with_key("a::Item"),
        );
        let second = TypeDesc::record(
            RecordType::new("Item", vec![FieldDesc::new("y", TypeDesc::integer())]).with_key("b::Item"),
        );
        let model = SchemaModel::new("PairPayload")
            .field("a", rewrite(&first, &reg, None))
            .field("b", rewrite(&second, &reg, None))
            .field("again", rewrite(&first, &reg, None));
        let schema = render_model(&model, Some(&reg)).unwrap();

        assert_eq!(schema["properties"]["a"], json!({"$ref": "#/definitions/ItemSchema"}));
        assert_eq!(schema["properties"]["b"], json!({"$ref": "#/definitions/ItemSchema2"}));
        assert_eq!(schema["properties"]["again"], schema["properties"]["a"]);
        let defs = &schema["definitions"];
        assert_eq!(defs["ItemSchema"]["properties"]["x"]["type"], json!("string"));
        assert_eq!(defs["ItemSchema2"]["properties"]["y"]["type"], json!("integer"));
        assert_eq!(defs.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_back_edge_to_nested_model_points_at_its_definition() {
        fn node_fields() -> Vec<FieldDesc> {
            vec![FieldDesc::new("next", TypeDesc::optional(node()))]
        }
        fn node() -> TypeDesc {
            TypeDesc::record(RecordType::deferred("Node", "tests::Node", node_fields))
        }
        let reg = registry();
        let model = SchemaModel::new("ListPayload").field("head", rewrite(&node(), &reg, None));
        let schema = render_model(&model, Some(&reg)).unwrap();
        assert_eq!(schema["properties"]["head"], json!({"$ref": "#/definitions/NodeSchema"}));
        assert_eq!(
            schema["definitions"]["NodeSchema"]["properties"]["next"],
            json!({"$ref": "#/definitions/NodeSchema"})
        );
    }
}
