//! The AsyncAPI document: typed node graph, node views for reference
//! resolution, handler descriptors and the builder that ties them together.
mod builder;
mod handler;
mod model;
mod node;

pub use builder::*;
pub use handler::*;
pub use model::*;
pub use node::*;
