//! Type descriptors, their rewriting into schema models and the JSON-Schema
//! rendering of those models.
mod identifier;
mod render;
mod rewrite;
mod types;

pub use identifier::*;
pub use render::*;
pub use rewrite::*;
pub use types::*;
