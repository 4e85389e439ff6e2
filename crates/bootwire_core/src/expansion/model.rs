//! Parsed configuration models, the candidate set and the import side table.

use crate::error::{BootResult, ConfigurationError};
use crate::model::class::{ClassMetadata, ClassRef, FactoryMethodDecl, LOWEST_PRECEDENCE};
use crate::model::definition::ComponentDefinition;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Singleton key of the import side table.
pub const IMPORT_REGISTRY: &str = "bootwire.internal.importRegistry";

/// Result of parsing one configuration class.
#[derive(Debug, Clone)]
pub struct ConfigurationModel {
    pub class: ClassRef,
    pub metadata: Arc<ClassMetadata>,
    /// Registry name when the class was registered directly.
    pub component_name: Option<String>,
    /// Class names of the configurations that imported this one.
    pub imported_by: Vec<String>,
    pub factory_methods: Vec<FactoryMethodDecl>,
    /// Classes found by the declared package scans.
    pub scanned: Vec<ClassRef>,
}

impl ConfigurationModel {
    pub fn new(class: ClassRef, metadata: Arc<ClassMetadata>, component_name: Option<String>) -> Self {
        Self {
            factory_methods: metadata.factory_methods.clone(),
            class,
            metadata,
            component_name,
            imported_by: Vec::new(),
            scanned: Vec::new(),
        }
    }

    /// Configuration identity; one model per identity.
    pub fn identity(&self) -> &str {
        &self.metadata.class_name
    }

    pub fn is_imported(&self) -> bool {
        !self.imported_by.is_empty()
    }

    /// Full configurations must stay subclassable for interception.
    pub fn validate(&self) -> BootResult<()> {
        if !self.metadata.configuration {
            return Ok(());
        }
        if self.metadata.is_final {
            return Err(ConfigurationError::FinalConfigurationClass {
                class: self.identity().to_string(),
            }
            .into());
        }
        if let Some(method) = self
            .factory_methods
            .iter()
            .find(|method| !method.is_static && !method.overridable)
        {
            return Err(ConfigurationError::NonOverridableFactoryMethod {
                class: self.identity().to_string(),
                method: method.name.clone(),
            }
            .into());
        }
        Ok(())
    }
}

/// Definitions queued for the next parse, keyed by registry name.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: IndexMap<String, ComponentDefinition>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, definition: ComponentDefinition) {
        self.entries.insert(name.into(), definition);
    }

    /// Stable sort by declared order; unordered candidates sort last.
    pub fn sort_by_order(&mut self) {
        self.entries.sort_by(|_, left, _, right| {
            left.order
                .unwrap_or(LOWEST_PRECEDENCE)
                .cmp(&right.order.unwrap_or(LOWEST_PRECEDENCE))
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentDefinition)> {
        self.entries
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps an imported class name to the metadata of the class importing it.
#[derive(Debug, Clone, Default)]
pub struct ImportRegistry {
    importing: BTreeMap<String, Arc<ClassMetadata>>,
}

impl ImportRegistry {
    pub fn register(&mut self, imported: impl Into<String>, importing: Arc<ClassMetadata>) {
        self.importing.insert(imported.into(), importing);
    }

    pub fn importing_class_for(&self, imported: &str) -> Option<Arc<ClassMetadata>> {
        self.importing.get(imported).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.importing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateSet, ConfigurationModel};
    use crate::error::{BootError, ConfigurationError};
    use crate::model::class::{ComponentClass, FactoryMethodDecl};
    use crate::model::definition::ComponentDefinition;
    use crate::model::instance::Instance;
    use std::sync::Arc;

    #[test]
    fn candidates_sort_by_order_keeping_ties_stable() {
        let mut set = CandidateSet::new();
        for (name, order) in [("none", None), ("late", Some(10)), ("early", Some(-1)), ("tie", Some(10))] {
            let mut definition =
                ComponentDefinition::new(ComponentClass::builder("app.Config").build());
            definition.order = order;
            set.push(name, definition);
        }
        set.sort_by_order();
        assert_eq!(set.names(), vec!["early", "late", "tie", "none"]);
    }

    #[test]
    fn final_full_configuration_is_rejected() {
        let class = ComponentClass::builder("app.Sealed")
            .configuration()
            .final_class()
            .build();
        let model = ConfigurationModel::new(
            Arc::clone(&class),
            Arc::new(class.metadata().clone()),
            Some("sealed".to_string()),
        );
        assert_eq!(
            model.validate(),
            Err(BootError::InvalidConfiguration(
                ConfigurationError::FinalConfigurationClass {
                    class: "app.Sealed".to_string()
                }
            ))
        );
    }

    #[test]
    fn sealed_method_is_allowed_only_when_static_or_lite() {
        let target = ComponentClass::builder("app.Clock").build();
        let full = ComponentClass::builder("app.Full")
            .configuration()
            .factory_method(
                FactoryMethodDecl::new("clock", Arc::clone(&target)).sealed(),
                |_| Ok(Instance::object(0_u64)),
            )
            .build();
        let lite = ComponentClass::builder("app.Lite")
            .component()
            .factory_method(FactoryMethodDecl::new("clock", target).sealed(), |_| {
                Ok(Instance::object(0_u64))
            })
            .build();

        let full_model =
            ConfigurationModel::new(Arc::clone(&full), Arc::new(full.metadata().clone()), None);
        let lite_model =
            ConfigurationModel::new(Arc::clone(&lite), Arc::new(lite.metadata().clone()), None);
        assert!(matches!(
            full_model.validate(),
            Err(BootError::InvalidConfiguration(
                ConfigurationError::NonOverridableFactoryMethod { .. }
            ))
        ));
        assert!(lite_model.validate().is_ok());
    }
}
