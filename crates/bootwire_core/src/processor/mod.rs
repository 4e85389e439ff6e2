//! Processor contracts and their runners.
//!
//! # Responsibility
//! - Define the registry, factory and lifecycle processor capabilities.
//! - Run factory-level processors in tiered order and register lifecycle
//!   processors into the factory chain.
//!
//! # Invariants
//! - Tier order is priority, then ordered, then plain, for every family.
//! - A processor failure aborts the whole pass; there is no isolation.

pub mod invoke;
pub mod order;
pub mod register;

use crate::container::{ComponentFactory, DefinitionRegistry};
use crate::error::BootResult;
use crate::model::class::LOWEST_PRECEDENCE;
use crate::model::definition::ComponentDefinition;
use crate::model::instance::Instance;
use std::sync::Arc;

pub use invoke::invoke_factory_post_processors;
pub use order::Tier;
pub use register::{register_lifecycle_processors, ListenerRegistry};

/// Sort key inside a tier. Lower values run first.
pub trait Ordered {
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }
}

/// Metadata-level processor invoked once against the factory.
pub trait FactoryPostProcessor: Ordered + Send + Sync {
    fn post_process_factory(&self, factory: &mut dyn ComponentFactory) -> BootResult<()>;
}

/// Processor that may insert definitions before the metadata phase.
pub trait RegistryPostProcessor: FactoryPostProcessor {
    fn post_process_registry(&self, registry: &mut dyn DefinitionRegistry) -> BootResult<()>;
}

/// Hook invoked around instance construction.
pub trait LifecycleProcessor: Ordered + Send + Sync {
    /// Runs after construction, before initialization callbacks.
    fn post_process_properties(
        &self,
        _instance: &Instance,
        _name: &str,
        _factory: &dyn ComponentFactory,
    ) -> BootResult<()> {
        Ok(())
    }

    fn before_initialization(
        &self,
        instance: Instance,
        _name: &str,
        _factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        Ok(instance)
    }

    fn after_initialization(
        &self,
        instance: Instance,
        _name: &str,
        _factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        Ok(instance)
    }

    /// Secondary capability; processors returning `Some` are kept at the tail
    /// of the chain.
    fn merged_definition_hook(&self) -> Option<&dyn MergedDefinitionHook> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Sees the effective definition of every component before it is populated.
pub trait MergedDefinitionHook {
    fn post_process_merged_definition(&self, definition: &ComponentDefinition, name: &str);
}

/// A factory-level processor of either capability level.
#[derive(Clone)]
pub enum PostProcessor {
    Registry(Arc<dyn RegistryPostProcessor>),
    Factory(Arc<dyn FactoryPostProcessor>),
}

impl PostProcessor {
    pub fn post_process_factory(&self, factory: &mut dyn ComponentFactory) -> BootResult<()> {
        match self {
            Self::Registry(processor) => processor.post_process_factory(factory),
            Self::Factory(processor) => processor.post_process_factory(factory),
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            Self::Registry(processor) => processor.order(),
            Self::Factory(processor) => processor.order(),
        }
    }

    pub fn same_as(&self, other: &PostProcessor) -> bool {
        match (self, other) {
            (Self::Registry(left), Self::Registry(right)) => Arc::ptr_eq(left, right),
            (Self::Factory(left), Self::Factory(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }
}
