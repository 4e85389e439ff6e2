//! Materialized component instances.
//!
//! An [`Instance`] is what the factory hands out: a plain managed object, a
//! factory/registry processor, or a lifecycle processor. The variant is the
//! capability check; callers match on it instead of inspecting types.

use crate::container::ContainerId;
use crate::model::class::ClassMetadata;
use crate::processor::{
    FactoryPostProcessor, LifecycleProcessor, PostProcessor, RegistryPostProcessor,
};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Object managed by the container.
pub trait ManagedObject: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    fn factory_aware(&self) -> Option<&dyn FactoryAware> {
        None
    }

    fn import_aware(&self) -> Option<&dyn ImportAware> {
        None
    }
}

/// Receives the identity of the owning factory before property injection.
pub trait FactoryAware {
    fn set_factory(&self, container: ContainerId);

    fn injected_factory(&self) -> Option<ContainerId> {
        None
    }
}

/// Receives the metadata of the configuration class that imported it.
pub trait ImportAware {
    fn set_import_metadata(&self, importing: &ClassMetadata);
}

struct PlainObject<T>(T);

impl<T: Send + Sync + 'static> ManagedObject for PlainObject<T> {
    fn as_any(&self) -> &dyn Any {
        &self.0
    }
}

#[derive(Clone)]
pub enum Instance {
    Object(Arc<dyn ManagedObject>),
    PostProcessor(PostProcessor),
    Lifecycle(Arc<dyn LifecycleProcessor>),
}

impl Instance {
    /// Wraps any value as a plain managed object.
    pub fn object<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Object(Arc::new(PlainObject(value)))
    }

    pub fn managed(object: Arc<dyn ManagedObject>) -> Self {
        Self::Object(object)
    }

    pub fn registry_processor(processor: Arc<dyn RegistryPostProcessor>) -> Self {
        Self::PostProcessor(PostProcessor::Registry(processor))
    }

    pub fn factory_processor(processor: Arc<dyn FactoryPostProcessor>) -> Self {
        Self::PostProcessor(PostProcessor::Factory(processor))
    }

    pub fn lifecycle(processor: Arc<dyn LifecycleProcessor>) -> Self {
        Self::Lifecycle(processor)
    }

    pub fn as_object(&self) -> Option<&Arc<dyn ManagedObject>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object()?.as_any().downcast_ref::<T>()
    }

    pub fn is_lifecycle_processor(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }

    pub fn into_post_processor(self) -> Option<PostProcessor> {
        match self {
            Self::PostProcessor(processor) => Some(processor),
            _ => None,
        }
    }

    pub fn into_registry_processor(self) -> Option<Arc<dyn RegistryPostProcessor>> {
        match self {
            Self::PostProcessor(PostProcessor::Registry(processor)) => Some(processor),
            _ => None,
        }
    }

    pub fn into_lifecycle_processor(self) -> Option<Arc<dyn LifecycleProcessor>> {
        match self {
            Self::Lifecycle(processor) => Some(processor),
            _ => None,
        }
    }

    /// Identity comparison; two handles to the same allocation are the same.
    pub fn same_as(&self, other: &Instance) -> bool {
        match (self, other) {
            (Self::Object(left), Self::Object(right)) => Arc::ptr_eq(left, right),
            (Self::PostProcessor(left), Self::PostProcessor(right)) => left.same_as(right),
            (Self::Lifecycle(left), Self::Lifecycle(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::PostProcessor(PostProcessor::Registry(_)) => "registry_processor",
            Self::PostProcessor(PostProcessor::Factory(_)) => "factory_processor",
            Self::Lifecycle(_) => "lifecycle_processor",
        }
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instance({})", self.kind())
    }
}
