//! Bootstrap engine of a managed-object container.
//!
//! The crate discovers and orders registry, factory and lifecycle
//! processors against a mutable definition table, and expands configuration
//! definitions into the components they declare until the table stops
//! growing.

pub mod container;
pub mod context;
pub mod error;
pub mod expansion;
pub mod logging;
pub mod model;
pub mod options;
pub mod processor;

pub use container::{
    ComponentFactory, ContainerId, DefaultComponentFactory, DefinitionRegistry, DefinitionStore,
    MethodScope, SingletonRegistry,
};
pub use context::BootstrapContext;
pub use error::{BootError, BootResult, ConfigurationError, ProcessingPhase};
pub use expansion::{ClassCatalog, ConfigurationExpansionProcessor, ExpansionReport};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::class::{Capability, ClassMetadata, ClassRef, ComponentClass, FactoryMethodDecl};
pub use model::definition::{ComponentDefinition, Role, Scope};
pub use model::instance::{FactoryAware, ImportAware, Instance, ManagedObject};
pub use options::BootstrapOptions;
pub use processor::{
    FactoryPostProcessor, LifecycleProcessor, MergedDefinitionHook, Ordered, PostProcessor,
    RegistryPostProcessor,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
