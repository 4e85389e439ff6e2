//! Enhancement of full configuration definitions.
//!
//! # Responsibility
//! - Replace the class of every full configuration definition with an
//!   intercepting subclass so sibling factory-method calls return the
//!   managed component.
//! - Inject factory identity and import metadata into created instances.
//!
//! # Invariants
//! - A definition whose singleton already exists keeps its class; this is
//!   reported, never fatal.
//! - Enhancing an already intercepting class returns it unchanged.

use crate::container::{ComponentFactory, ContainerId};
use crate::error::{BootError, BootResult};
use crate::expansion::model::{ImportRegistry, IMPORT_REGISTRY};
use crate::model::class::{Capability, ClassRef, ComponentClass};
use crate::model::definition::PRESERVE_TARGET_CLASS_ATTRIBUTE;
use crate::model::instance::{FactoryAware, ImportAware, Instance, ManagedObject};
use crate::processor::{LifecycleProcessor, Ordered};
use log::{debug, info, trace, warn};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::sync::Arc;

/// Name suffix of generated intercepting subclasses.
pub const ENHANCED_CLASS_SUFFIX: &str = "$$Intercepted";

pub trait Enhancer: Send + Sync {
    /// Returns an intercepting subclass of `class`, or `class` itself when
    /// nothing needs to change.
    fn enhance(&self, class: &ClassRef) -> BootResult<ClassRef>;
}

/// Default enhancer: wraps each constructed instance so it can receive the
/// owning factory identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubclassEnhancer;

impl Enhancer for SubclassEnhancer {
    fn enhance(&self, class: &ClassRef) -> BootResult<ClassRef> {
        if class.intercepts_factory_methods() {
            return Ok(Arc::clone(class));
        }
        let constructor = class.constructor().cloned().ok_or_else(|| {
            BootError::NotInstantiable {
                class: class.name().to_string(),
                reason: "configuration class declares no constructor".to_string(),
            }
        })?;
        Ok(ComponentClass::intercepting_subclass(
            class,
            format!("{}{}", class.name(), ENHANCED_CLASS_SUFFIX),
            Arc::new(move || {
                let target = constructor()?;
                Ok(match target {
                    Instance::Object(_) => Instance::managed(Arc::new(EnhancedInstance::new(target))),
                    other => other,
                })
            }),
        ))
    }
}

/// Instance of an intercepting subclass.
pub struct EnhancedInstance {
    target: Instance,
    factory: OnceCell<ContainerId>,
}

impl EnhancedInstance {
    fn new(target: Instance) -> Self {
        Self {
            target,
            factory: OnceCell::new(),
        }
    }

    /// The wrapped user instance.
    pub fn target(&self) -> &Instance {
        &self.target
    }
}

impl ManagedObject for EnhancedInstance {
    fn as_any(&self) -> &dyn Any {
        match self.target.as_object() {
            Some(object) => object.as_any(),
            None => self,
        }
    }

    fn factory_aware(&self) -> Option<&dyn FactoryAware> {
        Some(self)
    }

    fn import_aware(&self) -> Option<&dyn ImportAware> {
        self.target.as_object()?.import_aware()
    }
}

impl FactoryAware for EnhancedInstance {
    fn set_factory(&self, container: ContainerId) {
        if self.factory.set(container).is_err() {
            trace!(
                "event=factory_already_injected module=enhance status=skip container={}",
                container
            );
        }
    }

    fn injected_factory(&self) -> Option<ContainerId> {
        self.factory.get().copied()
    }
}

/// Swaps the class of every eligible full configuration definition.
///
/// Returns the number of definitions whose class changed.
pub fn enhance_configuration_definitions(
    factory: &mut dyn ComponentFactory,
    enhancer: &dyn Enhancer,
) -> BootResult<usize> {
    let mut enhanced = 0;
    for name in factory.definition_names() {
        let Some(definition) = factory.definition(&name) else {
            continue;
        };
        if !definition.is_full_configuration() {
            continue;
        }
        if definition.class_locked {
            warn!(
                "event=enhancement_skipped module=enhance status=skip name={} reason=class_locked",
                name
            );
            continue;
        }
        if factory.contains_singleton(&name) {
            info!(
                "event=enhancement_skipped module=enhance status=skip name={} reason=singleton_exists",
                name
            );
            continue;
        }

        let original = Arc::clone(&definition.class);
        let replacement =
            enhancer
                .enhance(&original)
                .map_err(|err| BootError::EnhancementFailed {
                    definition: name.clone(),
                    class: original.name().to_string(),
                    reason: err.to_string(),
                })?;

        let Some(definition) = factory.definition_mut(&name) else {
            continue;
        };
        definition.set_attribute(PRESERVE_TARGET_CLASS_ATTRIBUTE, "true");
        if !Arc::ptr_eq(&replacement, &original) {
            trace!(
                "event=class_replaced module=enhance status=ok name={} from={} to={}",
                name,
                original.name(),
                replacement.name()
            );
            definition.class = replacement;
            enhanced += 1;
        }
    }
    if enhanced > 0 {
        factory.clear_metadata_cache();
    }
    debug!(
        "event=enhancement_pass module=enhance status=ok enhanced={}",
        enhanced
    );
    Ok(enhanced)
}

/// Injects the factory identity into enhanced configurations and import
/// metadata into import-aware instances.
pub struct ConfigurationAwareProcessor;

impl Ordered for ConfigurationAwareProcessor {}

impl LifecycleProcessor for ConfigurationAwareProcessor {
    fn post_process_properties(
        &self,
        instance: &Instance,
        name: &str,
        factory: &dyn ComponentFactory,
    ) -> BootResult<()> {
        let enhanced = factory
            .definition(name)
            .is_some_and(|definition| {
                definition
                    .class
                    .has_capability(Capability::EnhancedConfiguration)
            });
        if !enhanced {
            return Ok(());
        }
        if let Some(aware) = instance.as_object().and_then(|object| object.factory_aware()) {
            aware.set_factory(factory.container_id());
        }
        Ok(())
    }

    fn before_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        let Some(aware) = instance.as_object().and_then(|object| object.import_aware()) else {
            return Ok(instance);
        };
        let Some(definition) = factory.definition(name) else {
            return Ok(instance);
        };
        let importing = factory.singleton(IMPORT_REGISTRY).and_then(|registry| {
            registry
                .downcast_ref::<ImportRegistry>()
                .and_then(|imports| imports.importing_class_for(definition.class.user_class_name()))
        });
        if let Some(metadata) = importing {
            aware.set_import_metadata(&metadata);
        }
        Ok(instance)
    }
}
