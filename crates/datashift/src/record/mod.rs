//! The polymorphic record model.
//!
//! This module defines the universal record representation used between
//! sources and sinks:
//!
//! - [`Value`]: a tagged variant covering every scalar, array, and nested
//!   record shape a migrated field can take
//! - [`DataItem`]: an ordered, unique-name field collection (the record)
//! - [`TreeOptions`]/[`build_tree`]: projection of a record into a plain
//!   nested JSON tree with id normalization and null suppression rules
//!
//! Records are read-only snapshots once handed to a sink; the core never
//! caches them — backpressure is via pull on the record stream.

mod item;
mod tree;
mod value;

pub use item::DataItem;
pub use tree::{build_tree, TreeOptions};
pub use value::Value;
