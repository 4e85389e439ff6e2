//! Name generation for discovered definitions.

use crate::model::definition::ComponentDefinition;

/// Well-known singleton key of a user-supplied name generator.
pub const CONFIGURATION_NAME_GENERATOR: &str = "bootwire.internal.configurationNameGenerator";

pub trait NameGenerator: Send + Sync {
    fn generate(&self, definition: &ComponentDefinition) -> String;
}

/// Default for scanned components: the explicit component name, or the
/// short class name with its first letter lowercased.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShortNameGenerator;

impl NameGenerator for ShortNameGenerator {
    fn generate(&self, definition: &ComponentDefinition) -> String {
        let metadata = definition.class.metadata();
        match &metadata.component_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => decapitalize(metadata.short_name()),
        }
    }
}

/// Default for imported configurations: the fully qualified class name.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualifiedNameGenerator;

impl NameGenerator for QualifiedNameGenerator {
    fn generate(&self, definition: &ComponentDefinition) -> String {
        definition.class.user_class_name().to_string()
    }
}

/// Lowercases the first character unless the first two are both uppercase
/// (`URLParser` stays as is).
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    out.extend(first.to_lowercase());
    out.push_str(&name[first.len_utf8()..]);
    out
}
