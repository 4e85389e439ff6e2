//! Configuration expansion engine.
//!
//! # Responsibility
//! - Find configuration candidates in the registry, parse them, and register
//!   the definitions they declare until the registry stops growing.
//! - Enhance full configurations so sibling factory-method calls are
//!   intercepted.
//!
//! # Invariants
//! - Parsing, reading and enhancement are pluggable; the loop itself is not.
//! - A definition already marked full or lite is never a candidate again.

pub mod candidate;
pub mod catalog;
pub mod enhance;
pub mod metadata;
pub mod model;
pub mod naming;
pub mod parser;
pub mod processor;
pub mod reader;

pub use catalog::ClassCatalog;
pub use enhance::{Enhancer, SubclassEnhancer};
pub use metadata::{CachingMetadataReader, MetadataReader};
pub use model::{ConfigurationModel, ImportRegistry, IMPORT_REGISTRY};
pub use naming::{NameGenerator, CONFIGURATION_NAME_GENERATOR};
pub use processor::{ConfigurationExpansionProcessor, ExpansionReport, ExpansionState};
