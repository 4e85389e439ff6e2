//! Lifecycle-processor registrar.
//!
//! # Responsibility
//! - Discover lifecycle processors and append them to the factory chain in
//!   tier order.
//! - Install the chain checker first and the listener detector last.
//!
//! # Invariants
//! - Processors exposing a merged-definition hook end up after every other
//!   discovered processor.
//! - The listener detector is the final entry of the chain.

use crate::container::ComponentFactory;
use crate::error::{BootError, BootResult};
use crate::model::class::Capability;
use crate::model::definition::ComponentDefinition;
use crate::model::instance::Instance;
use crate::processor::order::{classify, sort_ranked, Ranked, Tier};
use crate::processor::{LifecycleProcessor, MergedDefinitionHook, Ordered};
use indexmap::IndexSet;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

type RankedLifecycle = Ranked<Arc<dyn LifecycleProcessor>>;

/// Names of singleton event listeners detected during creation.
#[derive(Default)]
pub struct ListenerRegistry {
    names: Mutex<IndexSet<String>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str) {
        self.names.lock().insert(name.to_string());
    }

    pub fn remove(&self, name: &str) -> bool {
        self.names.lock().shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().contains(name)
    }

    /// Listener names in detection order.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}

/// Appends every discovered lifecycle processor to the factory chain.
pub fn register_lifecycle_processors(
    factory: &mut dyn ComponentFactory,
    listeners: Arc<ListenerRegistry>,
) -> BootResult<()> {
    let names = factory.names_for_capability(Capability::LifecycleProcessor, true, false);
    let checker = ProcessorChainChecker::new(&*factory, names.len());
    factory.add_lifecycle_processor(Arc::new(checker));

    let mut priority = Vec::new();
    let mut internal = Vec::new();
    let mut ordered_names = Vec::new();
    let mut plain_names = Vec::new();
    for name in names {
        match classify(&*factory, &name) {
            Tier::Priority => {
                let entry = materialize(factory, name, Tier::Priority)?;
                collect_internal(&entry, &mut internal);
                priority.push(entry);
            }
            Tier::Ordered => ordered_names.push(name),
            Tier::Plain => plain_names.push(name),
        }
    }

    sort_ranked(&mut priority);
    append(factory, &priority);

    let mut ordered = Vec::with_capacity(ordered_names.len());
    for name in ordered_names {
        let entry = materialize(factory, name, Tier::Ordered)?;
        collect_internal(&entry, &mut internal);
        ordered.push(entry);
    }
    sort_ranked(&mut ordered);
    append(factory, &ordered);

    let mut plain = Vec::with_capacity(plain_names.len());
    for name in plain_names {
        let entry = materialize(factory, name, Tier::Plain)?;
        collect_internal(&entry, &mut internal);
        plain.push(entry);
    }
    append(factory, &plain);

    sort_ranked(&mut internal);
    append(factory, &internal);

    factory.add_lifecycle_processor(Arc::new(ListenerDetector::new(listeners)));

    info!(
        "event=lifecycle_registered module=register status=ok priority={} ordered={} plain={} internal={} chain={}",
        priority.len(),
        ordered.len(),
        plain.len(),
        internal.len(),
        factory.lifecycle_processor_count()
    );
    Ok(())
}

fn materialize(
    factory: &mut dyn ComponentFactory,
    name: String,
    tier: Tier,
) -> BootResult<RankedLifecycle> {
    let processor = factory
        .materialize(&name, Capability::LifecycleProcessor)?
        .into_lifecycle_processor()
        .ok_or_else(|| BootError::CapabilityMismatch {
            name: name.clone(),
            expected: Capability::LifecycleProcessor,
        })?;
    Ok(Ranked {
        order: processor.order(),
        name,
        tier,
        processor,
    })
}

fn collect_internal(entry: &RankedLifecycle, internal: &mut Vec<RankedLifecycle>) {
    if entry.processor.merged_definition_hook().is_some() {
        internal.push(Ranked {
            name: entry.name.clone(),
            tier: entry.tier,
            order: entry.order,
            processor: Arc::clone(&entry.processor),
        });
    }
}

fn append(factory: &mut dyn ComponentFactory, entries: &[RankedLifecycle]) {
    for entry in entries {
        debug!(
            "event=lifecycle_processor_added module=register status=ok name={} tier={} type={}",
            entry.name,
            entry.tier.as_str(),
            entry.processor.type_name()
        );
        factory.add_lifecycle_processor(Arc::clone(&entry.processor));
    }
}

/// Flags components created while the chain is still incomplete.
struct ProcessorChainChecker {
    target_count: usize,
}

impl ProcessorChainChecker {
    /// Target covers the current chain, the checker and every discovered
    /// processor.
    fn new(factory: &dyn ComponentFactory, discovered: usize) -> Self {
        Self {
            target_count: factory.lifecycle_processor_count() + 1 + discovered,
        }
    }

    fn is_premature(
        &self,
        instance: &Instance,
        name: &str,
        factory: &dyn ComponentFactory,
    ) -> bool {
        let infrastructure = factory
            .definition(name)
            .is_some_and(ComponentDefinition::is_infrastructure);
        !instance.is_lifecycle_processor()
            && !infrastructure
            && factory.lifecycle_processor_count() < self.target_count
    }
}

impl Ordered for ProcessorChainChecker {}

impl LifecycleProcessor for ProcessorChainChecker {
    fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        if self.is_premature(&instance, name, factory) {
            info!(
                "event=lifecycle_not_eligible module=register status=warn name={} kind={} registered={} target={}",
                name,
                instance.kind(),
                factory.lifecycle_processor_count(),
                self.target_count
            );
        }
        Ok(instance)
    }
}

/// Records singleton event listeners once every other processor has run.
struct ListenerDetector {
    listeners: Arc<ListenerRegistry>,
    singleton_flags: Mutex<BTreeMap<String, bool>>,
}

impl ListenerDetector {
    fn new(listeners: Arc<ListenerRegistry>) -> Self {
        Self {
            listeners,
            singleton_flags: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Ordered for ListenerDetector {}

impl MergedDefinitionHook for ListenerDetector {
    fn post_process_merged_definition(&self, definition: &ComponentDefinition, name: &str) {
        if definition.class.has_capability(Capability::EventListener) {
            self.singleton_flags
                .lock()
                .insert(name.to_string(), definition.is_singleton());
        }
    }
}

impl LifecycleProcessor for ListenerDetector {
    fn after_initialization(
        &self,
        instance: Instance,
        name: &str,
        _factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        let flag = self.singleton_flags.lock().get(name).copied();
        match flag {
            Some(true) => {
                self.listeners.add(name);
                debug!(
                    "event=listener_detected module=register status=ok name={}",
                    name
                );
            }
            Some(false) => {
                self.listeners.remove(name);
                warn!(
                    "event=listener_skipped module=register status=warn name={} reason=not_singleton",
                    name
                );
            }
            None => {}
        }
        Ok(instance)
    }

    fn merged_definition_hook(&self) -> Option<&dyn MergedDefinitionHook> {
        Some(self)
    }
}
