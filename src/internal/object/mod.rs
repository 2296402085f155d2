//! Object model shared across the pack modules: the type enumeration that
//! pack entry headers and the writer's per-type lists are keyed by.

pub mod types;

pub use types::ObjectType;
