//! In-memory reference container.
//!
//! # Responsibility
//! - Store definitions in registration order and cache singleton instances.
//! - Create components through constructors or factory methods, applying the
//!   lifecycle chain to every new instance.
//!
//! # Invariants
//! - A name in creation is never created again until the first creation
//!   finishes; re-entry is a circular reference.
//! - Effective definitions are snapshotted on first use and only recomputed
//!   after `clear_metadata_cache` or re-registration.
//! - Factory methods of an intercepting singleton run against the instance the
//!   class produced, before any lifecycle processor replaced it.

use crate::container::{
    ComponentFactory, ContainerId, DefinitionRegistry, DefinitionStore, MethodScope,
    SingletonRegistry,
};
use crate::error::{BootError, BootResult};
use crate::model::class::Capability;
use crate::model::definition::{ComponentDefinition, FactoryMethodRef, FactoryOwner};
use crate::model::instance::Instance;
use crate::processor::{LifecycleProcessor, PostProcessor};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct DefaultComponentFactory {
    id: ContainerId,
    definitions: IndexMap<String, ComponentDefinition>,
    effective: BTreeMap<String, ComponentDefinition>,
    singletons: IndexMap<String, Instance>,
    intercepting_targets: BTreeMap<String, Instance>,
    in_creation: IndexSet<String>,
    lifecycle_processors: Vec<Arc<dyn LifecycleProcessor>>,
    allow_definition_overriding: bool,
    sealed: bool,
    cache_clears: usize,
}

impl Default for DefaultComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultComponentFactory {
    pub fn new() -> Self {
        Self {
            id: ContainerId::issue(),
            definitions: IndexMap::new(),
            effective: BTreeMap::new(),
            singletons: IndexMap::new(),
            intercepting_targets: BTreeMap::new(),
            in_creation: IndexSet::new(),
            lifecycle_processors: Vec::new(),
            allow_definition_overriding: true,
            sealed: false,
            cache_clears: 0,
        }
    }

    pub fn with_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    /// Hides the registry view; insertions through `as_registry` stop.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of times derived definition data was dropped.
    pub fn metadata_cache_clears(&self) -> usize {
        self.cache_clears
    }

    pub fn singleton_names(&self) -> Vec<String> {
        self.singletons.keys().cloned().collect()
    }

    /// Creates every non-lazy singleton not created yet, in registration
    /// order.
    pub fn instantiate_singletons(&mut self) -> BootResult<usize> {
        let names: Vec<String> = self
            .definitions
            .iter()
            .filter(|(_, definition)| definition.is_singleton() && !definition.lazy_init)
            .map(|(name, _)| name.clone())
            .collect();
        let mut created = 0;
        for name in names {
            if self.singletons.contains_key(name.as_str()) {
                continue;
            }
            self.materialize(&name, Capability::Component)?;
            created += 1;
        }
        info!(
            "event=singletons_instantiated module=container status=ok created={} total={}",
            created,
            self.singletons.len()
        );
        Ok(created)
    }

    fn effective_definition(&mut self, name: &str) -> BootResult<ComponentDefinition> {
        if let Some(definition) = self.effective.get(name) {
            return Ok(definition.clone());
        }
        let definition = self
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| BootError::DefinitionNotFound(name.to_string()))?;
        self.effective.insert(name.to_string(), definition.clone());
        Ok(definition)
    }

    fn create(&mut self, name: &str, definition: &ComponentDefinition) -> BootResult<Instance> {
        let raw = match &definition.factory {
            Some(factory_ref) => self.invoke_factory_method(factory_ref)?,
            None => {
                let constructor = definition.class.constructor().cloned().ok_or_else(|| {
                    BootError::NotInstantiable {
                        class: definition.class.name().to_string(),
                        reason: "class declares no constructor".to_string(),
                    }
                })?;
                constructor()?
            }
        };

        let chain = self.lifecycle_processors.clone();
        for processor in &chain {
            if let Some(hook) = processor.merged_definition_hook() {
                hook.post_process_merged_definition(definition, name);
            }
        }
        for processor in &chain {
            processor.post_process_properties(&raw, name, &*self)?;
        }
        let mut instance = raw.clone();
        for processor in &chain {
            instance = processor.before_initialization(instance, name, &*self)?;
        }
        for processor in &chain {
            instance = processor.after_initialization(instance, name, &*self)?;
        }
        if definition.is_singleton() && definition.class.intercepts_factory_methods() {
            self.intercepting_targets.insert(name.to_string(), raw);
        }
        Ok(instance)
    }

    fn invoke_factory_method(&mut self, factory_ref: &FactoryMethodRef) -> BootResult<Instance> {
        let (class, owner) = match &factory_ref.owner {
            FactoryOwner::Component(owner_name) => {
                let exposed = self.materialize(owner_name, Capability::Component)?;
                let owner = self
                    .intercepting_targets
                    .get(owner_name.as_str())
                    .cloned()
                    .unwrap_or(exposed);
                let class = self.effective_definition(owner_name)?.class;
                (class, Some(owner))
            }
            FactoryOwner::Static(class) => (Arc::clone(class), None),
        };
        MethodScope::new(self, class, owner).invoke(&factory_ref.method)
    }
}

fn provides(instance: &Instance, capability: Capability) -> bool {
    match capability {
        Capability::RegistryProcessor => {
            matches!(instance, Instance::PostProcessor(PostProcessor::Registry(_)))
        }
        Capability::FactoryProcessor => matches!(instance, Instance::PostProcessor(_)),
        Capability::LifecycleProcessor | Capability::MergedDefinition => {
            instance.is_lifecycle_processor()
        }
        _ => true,
    }
}

fn ensure_provides(name: &str, instance: &Instance, expected: Capability) -> BootResult<()> {
    if provides(instance, expected) {
        Ok(())
    } else {
        Err(BootError::CapabilityMismatch {
            name: name.to_string(),
            expected,
        })
    }
}

impl DefinitionStore for DefaultComponentFactory {
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn definition_names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    fn definition_mut(&mut self, name: &str) -> Option<&mut ComponentDefinition> {
        self.definitions.get_mut(name)
    }

    fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    fn contains_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}

impl DefinitionRegistry for DefaultComponentFactory {
    fn register_definition(
        &mut self,
        name: &str,
        definition: ComponentDefinition,
    ) -> BootResult<()> {
        if self.definitions.contains_key(name) {
            if !self.allow_definition_overriding {
                return Err(BootError::DefinitionOverrideRejected(name.to_string()));
            }
            info!(
                "event=definition_override module=container status=ok name={} class={}",
                name,
                definition.class.name()
            );
        }
        debug!(
            "event=definition_registered module=container status=ok name={} class={} source={:?}",
            name,
            definition.class.name(),
            definition.source
        );
        self.effective.remove(name);
        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    fn singletons(&mut self) -> Option<&mut dyn SingletonRegistry> {
        Some(self)
    }
}

impl SingletonRegistry for DefaultComponentFactory {
    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    fn singleton(&self, name: &str) -> Option<Instance> {
        self.singletons.get(name).cloned()
    }

    fn register_singleton(&mut self, name: &str, instance: Instance) -> BootResult<()> {
        if self.singletons.contains_key(name) {
            return Err(BootError::DefinitionOverrideRejected(name.to_string()));
        }
        self.singletons.insert(name.to_string(), instance);
        Ok(())
    }
}

impl ComponentFactory for DefaultComponentFactory {
    fn as_registry(&mut self) -> Option<&mut dyn DefinitionRegistry> {
        if self.sealed {
            None
        } else {
            Some(self)
        }
    }

    fn materialize(&mut self, name: &str, expected: Capability) -> BootResult<Instance> {
        if let Some(existing) = self.singletons.get(name).cloned() {
            ensure_provides(name, &existing, expected)?;
            return Ok(existing);
        }
        let definition = self.effective_definition(name)?;
        if !self.in_creation.insert(name.to_string()) {
            return Err(BootError::CircularCreation(name.to_string()));
        }
        let created = self.create(name, &definition);
        self.in_creation.shift_remove(name);
        let instance = created?;
        ensure_provides(name, &instance, expected)?;
        if definition.is_singleton() {
            self.singletons.insert(name.to_string(), instance.clone());
        }
        debug!(
            "event=component_created module=container status=ok name={} kind={}",
            name,
            instance.kind()
        );
        Ok(instance)
    }

    fn names_for_capability(
        &self,
        capability: Capability,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        self.definitions
            .iter()
            .filter(|(_, definition)| include_non_singletons || definition.is_singleton())
            .filter(|(_, definition)| {
                allow_eager_init || !(definition.lazy_init && definition.factory.is_some())
            })
            .filter(|(_, definition)| definition.class.has_capability(capability))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn is_type_match(&self, name: &str, capability: Capability) -> bool {
        if let Some(definition) = self.definitions.get(name) {
            return definition.class.has_capability(capability);
        }
        self.singletons
            .get(name)
            .is_some_and(|instance| provides(instance, capability))
    }

    fn add_lifecycle_processor(&mut self, processor: Arc<dyn LifecycleProcessor>) {
        self.lifecycle_processors
            .retain(|existing| !Arc::ptr_eq(existing, &processor));
        self.lifecycle_processors.push(processor);
    }

    fn lifecycle_processor_count(&self) -> usize {
        self.lifecycle_processors.len()
    }

    fn lifecycle_processors(&self) -> Vec<Arc<dyn LifecycleProcessor>> {
        self.lifecycle_processors.clone()
    }

    fn clear_metadata_cache(&mut self) {
        self.effective.clear();
        self.cache_clears += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::DefaultComponentFactory;
    use crate::container::{
        ComponentFactory, DefinitionRegistry, DefinitionStore, SingletonRegistry,
    };
    use crate::error::BootError;
    use crate::model::class::{Capability, ComponentClass, FactoryMethodDecl};
    use crate::model::definition::{ComponentDefinition, FactoryOwner, Scope};
    use crate::model::instance::Instance;
    use crate::processor::{LifecycleProcessor, Ordered};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Noop;
    impl Ordered for Noop {}
    impl LifecycleProcessor for Noop {}

    fn counting_class(name: &str, counter: Arc<AtomicUsize>) -> ComponentDefinition {
        ComponentDefinition::new(
            ComponentClass::builder(name)
                .constructor(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Instance::object(name_tag()))
                })
                .build(),
        )
    }

    fn name_tag() -> String {
        "tag".to_string()
    }

    #[test]
    fn keeps_registration_order() {
        let mut factory = DefaultComponentFactory::new();
        for name in ["zeta", "alpha", "mid"] {
            factory
                .register_definition(
                    name,
                    ComponentDefinition::new(ComponentClass::builder("app.Thing").build()),
                )
                .expect("register definition");
        }
        assert_eq!(factory.definition_names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(factory.definition_count(), 3);
    }

    #[test]
    fn singletons_are_created_once_and_prototypes_every_time() {
        let singleton_count = Arc::new(AtomicUsize::new(0));
        let prototype_count = Arc::new(AtomicUsize::new(0));
        let mut factory = DefaultComponentFactory::new();
        factory
            .register_definition("single", counting_class("app.Single", singleton_count.clone()))
            .expect("register singleton");
        factory
            .register_definition(
                "proto",
                counting_class("app.Proto", prototype_count.clone()).with_scope(Scope::Prototype),
            )
            .expect("register prototype");

        for _ in 0..3 {
            factory
                .materialize("single", Capability::Component)
                .expect("materialize singleton");
            factory
                .materialize("proto", Capability::Component)
                .expect("materialize prototype");
        }
        assert_eq!(singleton_count.load(Ordering::SeqCst), 1);
        assert_eq!(prototype_count.load(Ordering::SeqCst), 3);
        assert!(factory.contains_singleton("single"));
        assert!(!factory.contains_singleton("proto"));
    }

    #[test]
    fn rejects_override_when_disabled() {
        let mut factory = DefaultComponentFactory::new().with_definition_overriding(false);
        let definition = ComponentDefinition::new(ComponentClass::builder("app.Thing").build());
        factory
            .register_definition("thing", definition.clone())
            .expect("first registration");
        let err = factory
            .register_definition("thing", definition)
            .expect_err("second registration must fail");
        assert_eq!(err, BootError::DefinitionOverrideRejected("thing".to_string()));
    }

    #[test]
    fn detects_circular_creation() {
        let target = ComponentClass::builder("app.Loop").build();
        let config = ComponentClass::builder("app.LoopConfig")
            .constructor(|| Ok(Instance::object(())))
            .factory_method(FactoryMethodDecl::new("looping", target.clone()), |scope| {
                scope.component("looping")
            })
            .build();
        let mut factory = DefaultComponentFactory::new();
        factory
            .register_definition("config", ComponentDefinition::new(config.clone()))
            .expect("register config");
        factory
            .register_definition(
                "looping",
                ComponentDefinition::new(target)
                    .with_factory(FactoryOwner::Component("config".to_string()), "looping"),
            )
            .expect("register looping");

        let err = factory
            .materialize("looping", Capability::Component)
            .expect_err("self reference must fail");
        assert_eq!(err, BootError::CircularCreation("looping".to_string()));
    }

    #[test]
    fn rejects_wrong_capability() {
        let mut factory = DefaultComponentFactory::new();
        factory
            .register_definition(
                "plain",
                ComponentDefinition::new(
                    ComponentClass::builder("app.Plain")
                        .constructor(|| Ok(Instance::object(0_u8)))
                        .build(),
                ),
            )
            .expect("register plain");
        let err = factory
            .materialize("plain", Capability::RegistryProcessor)
            .expect_err("object is not a registry processor");
        assert!(matches!(err, BootError::CapabilityMismatch { .. }));
    }

    #[test]
    fn re_adding_a_lifecycle_processor_moves_it_to_the_tail() {
        let mut factory = DefaultComponentFactory::new();
        let first: Arc<dyn LifecycleProcessor> = Arc::new(Noop);
        let second: Arc<dyn LifecycleProcessor> = Arc::new(Noop);
        factory.add_lifecycle_processor(first.clone());
        factory.add_lifecycle_processor(second.clone());
        factory.add_lifecycle_processor(first.clone());

        let chain = factory.lifecycle_processors();
        assert_eq!(chain.len(), 2);
        assert!(Arc::ptr_eq(&chain[0], &second));
        assert!(Arc::ptr_eq(&chain[1], &first));
    }

    #[test]
    fn sealed_factory_has_no_registry_view() {
        let mut factory = DefaultComponentFactory::new();
        assert!(factory.as_registry().is_some());
        factory.seal();
        assert!(factory.as_registry().is_none());
    }

    #[test]
    fn lazy_factory_method_definitions_need_eager_init() {
        let target = ComponentClass::builder("app.Listener")
            .capability(Capability::EventListener)
            .build();
        let mut factory = DefaultComponentFactory::new();
        factory
            .register_definition(
                "listener",
                ComponentDefinition::new(target)
                    .with_factory(FactoryOwner::Component("config".to_string()), "listener")
                    .lazy(),
            )
            .expect("register listener");

        assert!(factory
            .names_for_capability(Capability::EventListener, true, false)
            .is_empty());
        assert_eq!(
            factory.names_for_capability(Capability::EventListener, true, true),
            vec!["listener"]
        );
    }
}
