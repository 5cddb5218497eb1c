#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod extractors;
mod fields;

pub use crate::extractors::map_fields;
pub use crate::fields::{FieldValue, MappedFields, names};

/// Tracing target for field-mapping events.
pub const TRACING_TARGET: &str = "docmill_mapper";
