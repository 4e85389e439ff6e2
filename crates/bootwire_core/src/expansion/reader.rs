//! Turns parsed models into registry definitions.
//!
//! # Responsibility
//! - Register imported configurations, scanned components and factory-method
//!   products.
//!
//! # Invariants
//! - Loading the same models twice registers nothing new.
//! - Existing names win, except scanned definitions replaced by a factory
//!   method when the override policy allows it.
//! - An imported configuration never adopts a name held by another class.

use crate::container::DefinitionRegistry;
use crate::error::{BootResult, ConfigurationError};
use crate::expansion::model::ConfigurationModel;
use crate::expansion::naming::NameGenerator;
use crate::model::class::FactoryMethodDecl;
use crate::model::definition::{ComponentDefinition, DefinitionSource, FactoryOwner};
use log::{debug, info};
use std::sync::Arc;

pub trait ConfigurationReader {
    fn load_definitions(
        &mut self,
        models: &[ConfigurationModel],
        registry: &mut dyn DefinitionRegistry,
    ) -> BootResult<usize>;
}

pub struct ModelDefinitionReader {
    import_names: Arc<dyn NameGenerator>,
    scan_names: Arc<dyn NameGenerator>,
    override_scanned: bool,
}

impl ModelDefinitionReader {
    pub fn new(
        import_names: Arc<dyn NameGenerator>,
        scan_names: Arc<dyn NameGenerator>,
        override_scanned: bool,
    ) -> Self {
        Self {
            import_names,
            scan_names,
            override_scanned,
        }
    }

    fn load_model(
        &self,
        model: &ConfigurationModel,
        registry: &mut dyn DefinitionRegistry,
    ) -> BootResult<usize> {
        let mut registered = 0;

        let owner_name = match &model.component_name {
            Some(name) => name.clone(),
            None => {
                let definition = ComponentDefinition::new(Arc::clone(&model.class))
                    .with_source(DefinitionSource::Imported);
                match registered_name_of(registry, model.identity()) {
                    Some(existing) => existing,
                    None => {
                        let name = self.import_names.generate(&definition);
                        match registry.definition(&name) {
                            Some(taken) if taken.class.user_class_name() != model.identity() => {
                                return Err(ConfigurationError::ImportNameTaken {
                                    name,
                                    imported: model.identity().to_string(),
                                    registered: taken.class.user_class_name().to_string(),
                                }
                                .into());
                            }
                            Some(_) => {}
                            None => {
                                registry.register_definition(&name, definition)?;
                                registered += 1;
                                debug!(
                                    "event=import_registered module=expand status=ok name={} class={}",
                                    name,
                                    model.identity()
                                );
                            }
                        }
                        name
                    }
                }
            }
        };

        for class in &model.scanned {
            let definition = ComponentDefinition::new(Arc::clone(class))
                .with_source(DefinitionSource::Scanned);
            let name = self.scan_names.generate(&definition);
            if registry.contains_definition(&name)
                || registered_name_of(registry, class.user_class_name()).is_some()
            {
                continue;
            }
            registry.register_definition(&name, definition)?;
            registered += 1;
            debug!(
                "event=scan_registered module=expand status=ok name={} class={}",
                name,
                class.name()
            );
        }

        for declaration in &model.factory_methods {
            if self.load_factory_method(model, &owner_name, declaration, registry)? {
                registered += 1;
            }
        }
        Ok(registered)
    }

    fn load_factory_method(
        &self,
        model: &ConfigurationModel,
        owner_name: &str,
        declaration: &FactoryMethodDecl,
        registry: &mut dyn DefinitionRegistry,
    ) -> BootResult<bool> {
        let name = declaration.component_name();
        if let Some(existing) = registry.definition(name) {
            let same_configuration = match existing.factory.as_ref().map(|f| &f.owner) {
                Some(FactoryOwner::Component(existing_owner)) => existing_owner == owner_name,
                Some(FactoryOwner::Static(class)) => {
                    class.user_class_name() == model.identity()
                }
                None => false,
            };
            let replaceable = (existing.source == DefinitionSource::Scanned
                && self.override_scanned)
                || existing.is_infrastructure();
            if same_configuration || !replaceable {
                debug!(
                    "event=factory_method_skipped module=expand status=skip name={} class={} method={}",
                    name,
                    model.identity(),
                    declaration.name
                );
                return Ok(false);
            }
            info!(
                "event=factory_method_override module=expand status=ok name={} class={} method={}",
                name,
                model.identity(),
                declaration.name
            );
        }

        let owner = if declaration.is_static {
            FactoryOwner::Static(Arc::clone(&model.class))
        } else {
            FactoryOwner::Component(owner_name.to_string())
        };
        let mut definition = ComponentDefinition::new(Arc::clone(&declaration.return_class))
            .with_source(DefinitionSource::FactoryMethod)
            .with_role(declaration.role)
            .with_scope(declaration.scope)
            .with_factory(owner, declaration.name.clone());
        definition.lazy_init = declaration.lazy_init;
        registry.register_definition(name, definition)?;
        Ok(true)
    }
}

impl ConfigurationReader for ModelDefinitionReader {
    fn load_definitions(
        &mut self,
        models: &[ConfigurationModel],
        registry: &mut dyn DefinitionRegistry,
    ) -> BootResult<usize> {
        let mut registered = 0;
        for model in models {
            registered += self.load_model(model, registry)?;
        }
        info!(
            "event=definitions_loaded module=expand status=ok models={} registered={} total={}",
            models.len(),
            registered,
            registry.definition_count()
        );
        Ok(registered)
    }
}

/// Name of a non-factory definition whose class is `class_name`.
fn registered_name_of(registry: &dyn DefinitionRegistry, class_name: &str) -> Option<String> {
    registry.definition_names().into_iter().find(|name| {
        registry.definition(name).is_some_and(|definition| {
            definition.factory.is_none() && definition.class.user_class_name() == class_name
        })
    })
}
