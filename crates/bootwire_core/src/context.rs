//! Bootstrap driver.
//!
//! # Responsibility
//! - Own one container and run the full bootstrap sequence against it:
//!   factory-level processors, lifecycle registration, singleton creation.
//!
//! # Invariants
//! - `refresh` runs at most once per context, successful or not.
//! - The expansion processor is always present as an infrastructure
//!   definition before processors are discovered.

use crate::container::{
    ComponentFactory, DefaultComponentFactory, DefinitionRegistry, DefinitionStore,
};
use crate::error::{BootError, BootResult};
use crate::expansion::{ClassCatalog, ConfigurationExpansionProcessor};
use crate::model::class::{Capability, ClassRef, ComponentClass};
use crate::model::definition::{ComponentDefinition, Role};
use crate::model::instance::Instance;
use crate::options::BootstrapOptions;
use crate::processor::{
    invoke_factory_post_processors, register_lifecycle_processors, ListenerRegistry,
    PostProcessor, RegistryPostProcessor,
};
use log::info;
use std::sync::Arc;

/// Definition name of the built-in expansion processor.
pub const CONFIGURATION_PROCESSOR: &str = "bootwire.internal.configurationProcessor";

pub struct BootstrapContext {
    factory: DefaultComponentFactory,
    options: BootstrapOptions,
    expansion: Arc<ConfigurationExpansionProcessor>,
    explicit: Vec<PostProcessor>,
    listeners: Arc<ListenerRegistry>,
    refreshed: bool,
}

impl BootstrapContext {
    pub fn new(catalog: ClassCatalog, options: BootstrapOptions) -> Self {
        let expansion = ConfigurationExpansionProcessor::new(Arc::new(catalog))
            .with_override_scanned(options.override_scanned_definitions);
        Self::with_expansion(expansion, options)
    }

    /// Uses a preconfigured expansion processor.
    pub fn with_expansion(
        expansion: ConfigurationExpansionProcessor,
        options: BootstrapOptions,
    ) -> Self {
        Self {
            factory: DefaultComponentFactory::new()
                .with_definition_overriding(options.allow_definition_overriding),
            options,
            expansion: Arc::new(expansion),
            explicit: Vec::new(),
            listeners: Arc::new(ListenerRegistry::new()),
            refreshed: false,
        }
    }

    pub fn register(&mut self, name: &str, class: ClassRef) -> BootResult<()> {
        self.register_definition(name, ComponentDefinition::new(class))
    }

    pub fn register_definition(
        &mut self,
        name: &str,
        definition: ComponentDefinition,
    ) -> BootResult<()> {
        self.factory.register_definition(name, definition)
    }

    /// Adds a processor that runs before discovered ones of its capability.
    pub fn add_post_processor(&mut self, processor: PostProcessor) {
        self.explicit.push(processor);
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    pub fn factory(&self) -> &DefaultComponentFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut DefaultComponentFactory {
        &mut self.factory
    }

    pub fn expansion(&self) -> &Arc<ConfigurationExpansionProcessor> {
        &self.expansion
    }

    pub fn component(&mut self, name: &str) -> BootResult<Instance> {
        self.factory.materialize(name, Capability::Component)
    }

    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.names()
    }

    pub fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    pub fn refresh(&mut self) -> BootResult<()> {
        if self.refreshed {
            return Err(BootError::AlreadyRefreshed);
        }
        self.refreshed = true;

        if !self.factory.contains_definition(CONFIGURATION_PROCESSOR) {
            let processor = Arc::clone(&self.expansion);
            let class = ComponentClass::builder("bootwire.internal.ConfigurationExpansionProcessor")
                .capability(Capability::RegistryProcessor)
                .capability(Capability::PriorityOrdered)
                .constructor(move || {
                    let processor: Arc<dyn RegistryPostProcessor> = processor.clone();
                    Ok(Instance::registry_processor(processor))
                })
                .build();
            self.factory.register_definition(
                CONFIGURATION_PROCESSOR,
                ComponentDefinition::new(class).with_role(Role::Infrastructure),
            )?;
        }

        invoke_factory_post_processors(&mut self.factory, &self.explicit)?;
        register_lifecycle_processors(&mut self.factory, Arc::clone(&self.listeners))?;
        let created = if self.options.instantiate_singletons {
            self.factory.instantiate_singletons()?
        } else {
            0
        };

        info!(
            "event=refresh module=context status=ok definitions={} singletons_created={} lifecycle_processors={} listeners={}",
            self.factory.definition_count(),
            created,
            self.factory.lifecycle_processor_count(),
            self.listeners.len()
        );
        Ok(())
    }
}
