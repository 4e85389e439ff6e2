//! Structural check deciding whether a definition needs expansion.

use crate::error::BootResult;
use crate::expansion::metadata::MetadataReader;
use crate::model::definition::{ComponentDefinition, ConfigurationMode};

/// Marks `definition` as a full or lite configuration when its class
/// metadata qualifies, and records the declared order.
///
/// Returns `false` for definitions produced by factory methods and for
/// classes that declare nothing to expand.
pub fn check_candidate(
    definition: &mut ComponentDefinition,
    reader: &dyn MetadataReader,
) -> BootResult<bool> {
    if definition.factory.is_some() {
        return Ok(false);
    }
    let metadata = reader.read(&definition.class)?;
    let mode = if metadata.configuration {
        ConfigurationMode::Full
    } else if metadata.component
        || !metadata.imports.is_empty()
        || !metadata.scans.is_empty()
        || !metadata.factory_methods.is_empty()
    {
        ConfigurationMode::Lite
    } else {
        return Ok(false);
    };
    definition.configuration = Some(mode);
    if let Some(order) = metadata.order {
        definition.order = Some(order);
    }
    Ok(true)
}
