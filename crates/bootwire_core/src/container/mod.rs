//! Registry and factory contracts consumed by the bootstrap engine.
//!
//! # Responsibility
//! - Define the narrow interfaces through which the engine reads and grows
//!   the definition table and materializes components.
//! - Provide an in-memory reference container.
//!
//! # Invariants
//! - Each container carries one [`ContainerId`] issued at construction; its
//!   registry and factory views report the same id.
//! - Definition names enumerate in registration order.

mod default_factory;
mod scope;

pub use default_factory::DefaultComponentFactory;
pub use scope::MethodScope;

use crate::error::BootResult;
use crate::model::class::Capability;
use crate::model::definition::ComponentDefinition;
use crate::model::instance::Instance;
use crate::processor::LifecycleProcessor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Identity token of one container instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(Uuid);

impl ContainerId {
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read and in-place mutation access to the definition table.
pub trait DefinitionStore {
    fn container_id(&self) -> ContainerId;
    fn definition_names(&self) -> Vec<String>;
    fn definition(&self, name: &str) -> Option<&ComponentDefinition>;
    fn definition_mut(&mut self, name: &str) -> Option<&mut ComponentDefinition>;
    fn definition_count(&self) -> usize;
    fn contains_definition(&self, name: &str) -> bool;
}

/// Definition table that accepts insertions.
pub trait DefinitionRegistry: DefinitionStore {
    fn register_definition(&mut self, name: &str, definition: ComponentDefinition)
        -> BootResult<()>;

    /// Shared-singleton access, when the registry supports it.
    fn singletons(&mut self) -> Option<&mut dyn SingletonRegistry> {
        None
    }
}

pub trait SingletonRegistry {
    fn contains_singleton(&self, name: &str) -> bool;
    fn singleton(&self, name: &str) -> Option<Instance>;
    fn register_singleton(&mut self, name: &str, instance: Instance) -> BootResult<()>;
}

/// Factory view of a container.
pub trait ComponentFactory: DefinitionStore + SingletonRegistry {
    /// Registry view, or `None` when the table is sealed against insertion.
    fn as_registry(&mut self) -> Option<&mut dyn DefinitionRegistry>;

    /// Returns the component named `name`, creating it when needed.
    fn materialize(&mut self, name: &str, expected: Capability) -> BootResult<Instance>;

    /// Definition names whose class advertises `capability`, in registration
    /// order. `allow_eager_init = false` leaves out lazy factory-method
    /// definitions.
    fn names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;

    fn is_type_match(&self, name: &str, capability: Capability) -> bool;

    /// Appends to the lifecycle chain; a processor already present moves to
    /// the tail.
    fn add_lifecycle_processor(&mut self, processor: Arc<dyn LifecycleProcessor>);

    fn lifecycle_processor_count(&self) -> usize;

    fn lifecycle_processors(&self) -> Vec<Arc<dyn LifecycleProcessor>>;

    /// Drops derived per-definition data computed before definitions changed.
    fn clear_metadata_cache(&mut self);
}
