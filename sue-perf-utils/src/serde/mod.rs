//! Utility module for serde of types.

pub mod tuple_map;
