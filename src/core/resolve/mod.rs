//! Reference resolution

pub mod resolver;

pub use resolver::{ReferenceResolver, ResolvableEntity};
