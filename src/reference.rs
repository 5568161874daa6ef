//! `$ref` pointers: construction, the reference-or-inline union and
//! resolution against a live document.
//!
//! Pointers have the fixed form `#/<segment>/<segment>/...`. Segments are
//! literal field names or map keys; there is no escaping.

use crate::document::{AsNode, Node};
use crate::error::{DocError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A symbolic link into the document, serialized as `{"$ref": "<pointer>"}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub ref_path: String,
}

impl Reference {
    pub fn new(pointer: impl Into<String>) -> Self {
        Reference {
            ref_path: pointer.into(),
        }
    }

    pub fn pointer(&self) -> &str {
        &self.ref_path
    }
}

/// Wrap a slash-separated document path into a pointer: `/a/b` -> `#/a/b`
pub fn make_ref(path: &str) -> Reference {
    Reference::new(format!("#{path}"))
}

/// A value that is either a `$ref` or the object itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref(Reference),
    Object(T),
}

impl<T> RefOr<T> {
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            RefOr::Ref(r) => Some(r),
            RefOr::Object(_) => None,
        }
    }

    pub fn object(&self) -> Option<&T> {
        match self {
            RefOr::Ref(_) => None,
            RefOr::Object(o) => Some(o),
        }
    }
}

impl<T> From<Reference> for RefOr<T> {
    fn from(r: Reference) -> Self {
        RefOr::Ref(r)
    }
}

/// What [`resolve`] accepts: a pointer to follow, or a node that is
/// already resolved and passes through untouched.
#[derive(Debug, Clone, Copy)]
pub enum Target<'p, 'a> {
    Pointer(&'p str),
    Node(Node<'a>),
}

impl<'p> From<&'p str> for Target<'p, '_> {
    fn from(pointer: &'p str) -> Self {
        Target::Pointer(pointer)
    }
}

impl<'p> From<&'p String> for Target<'p, '_> {
    fn from(pointer: &'p String) -> Self {
        Target::Pointer(pointer.as_str())
    }
}

impl<'p> From<&'p Reference> for Target<'p, '_> {
    fn from(r: &'p Reference) -> Self {
        Target::Pointer(&r.ref_path)
    }
}

impl<'a> From<Node<'a>> for Target<'_, 'a> {
    fn from(node: Node<'a>) -> Self {
        Target::Node(node)
    }
}

impl<'a, T: AsNode> From<&'a RefOr<T>> for Target<'a, 'a> {
    fn from(value: &'a RefOr<T>) -> Self {
        match value {
            RefOr::Ref(r) => Target::Pointer(&r.ref_path),
            RefOr::Object(o) => Target::Node(o.as_node()),
        }
    }
}

/// Split a pointer into its segments.
///
/// # Errors
///
/// [`DocError::MalformedReference`] if the pointer does not start with `#/`
pub fn segments(pointer: &str) -> Result<std::str::Split<'_, char>> {
    pointer
        .strip_prefix("#/")
        .map(|rest| rest.split('/'))
        .ok_or_else(|| DocError::MalformedReference(pointer.to_string()))
}

/// Resolve `target` starting from `root`.
///
/// Nodes pass through; pointers are walked one segment at a time. This is a
/// pure read of the current document state.
///
/// # Errors
///
/// - [`DocError::MalformedReference`] for pointers without the `#/` prefix
/// - [`DocError::BrokenReference`] naming the first segment that is absent
pub fn resolve<'a>(root: Node<'a>, target: Target<'_, 'a>) -> Result<Node<'a>> {
    let pointer = match target {
        Target::Node(node) => return Ok(node),
        Target::Pointer(p) => p,
    };
    let mut current = root;
    for seg in segments(pointer)? {
        current = current
            .child(seg)
            .ok_or_else(|| DocError::broken(pointer, seg))?;
    }
    Ok(current)
}

/// Every `$ref` string in `value`, paired with the JSON location of the
/// object holding it (`/channels/chat/messages/message/payload`).
pub fn collect_refs(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk_refs(value, String::new(), &mut out);
    out
}

fn walk_refs(value: &Value, location: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("$ref", Value::String(pointer)) => {
                        out.push((location.clone(), pointer.clone()));
                    }
                    _ => walk_refs(v, format!("{location}/{key}"), out),
                }
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                walk_refs(v, format!("{location}/{i}"), out);
            }
        }
        _ => {}
    }
}
