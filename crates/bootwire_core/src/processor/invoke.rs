//! Registry- and factory-processor runner.
//!
//! # Responsibility
//! - Invoke explicit and discovered registry processors in tier order, then
//!   the metadata phase, then factory-only processors.
//!
//! # Invariants
//! - A discovered name is marked processed before it is materialized, so
//!   rediscovery during its own invocation never invokes it twice.
//! - The remainder tier repeats until a pass discovers no new names.
//! - Derived definition caches are cleared once every processor has run.

use crate::container::ComponentFactory;
use crate::error::{BootError, BootResult};
use crate::model::class::Capability;
use crate::processor::order::{classify, sort_ranked, Ranked, Tier};
use crate::processor::{PostProcessor, RegistryPostProcessor};
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Runs every factory-level processor once against `factory`.
///
/// `explicit` processors are supplied by the caller rather than discovered;
/// they run before discovered ones of the same capability.
pub fn invoke_factory_post_processors(
    factory: &mut dyn ComponentFactory,
    explicit: &[PostProcessor],
) -> BootResult<()> {
    let mut processed = BTreeSet::new();

    if factory.as_registry().is_some() {
        let mut registry_processors: Vec<Arc<dyn RegistryPostProcessor>> = Vec::new();
        let mut deferred: Vec<PostProcessor> = Vec::new();

        for processor in explicit {
            match processor {
                PostProcessor::Registry(registry_processor) => {
                    apply_to_registry(factory, "explicit", registry_processor)?;
                    registry_processors.push(Arc::clone(registry_processor));
                }
                PostProcessor::Factory(_) => deferred.push(processor.clone()),
            }
        }

        for capability in [Capability::PriorityOrdered, Capability::Ordered] {
            let names: Vec<String> = unprocessed_registry_processors(&*factory, &processed)
                .into_iter()
                .filter(|name| factory.is_type_match(name, capability))
                .collect();
            let batch = materialize_registry_batch(factory, names, &mut processed)?;
            run_registry_batch(factory, batch, &mut registry_processors)?;
        }

        let mut passes = 0;
        loop {
            let names = unprocessed_registry_processors(&*factory, &processed);
            if names.is_empty() {
                break;
            }
            passes += 1;
            debug!(
                "event=remainder_pass module=invoke status=start pass={} discovered={}",
                passes,
                names.len()
            );
            let batch = materialize_registry_batch(factory, names, &mut processed)?;
            run_registry_batch(factory, batch, &mut registry_processors)?;
        }

        for processor in &registry_processors {
            processor.post_process_factory(factory)?;
        }
        for processor in &deferred {
            processor.post_process_factory(factory)?;
        }
        info!(
            "event=registry_phase module=invoke status=ok registry_processors={} deferred={} remainder_passes={}",
            registry_processors.len(),
            deferred.len(),
            passes
        );
    } else {
        info!(
            "event=registry_phase module=invoke status=skipped reason=sealed explicit={}",
            explicit.len()
        );
        for processor in explicit {
            processor.post_process_factory(factory)?;
        }
    }

    let mut priority = Vec::new();
    let mut ordered_names = Vec::new();
    let mut plain_names = Vec::new();
    for name in factory.names_for_capability(Capability::FactoryProcessor, true, false) {
        if processed.contains(&name) {
            continue;
        }
        match classify(&*factory, &name) {
            Tier::Priority => {
                let processor = materialize_factory_processor(factory, &name)?;
                priority.push(rank(name, Tier::Priority, processor));
            }
            Tier::Ordered => ordered_names.push(name),
            Tier::Plain => plain_names.push(name),
        }
    }

    sort_ranked(&mut priority);
    run_factory_batch(factory, &priority)?;

    let mut ordered = Vec::with_capacity(ordered_names.len());
    for name in ordered_names {
        let processor = materialize_factory_processor(factory, &name)?;
        ordered.push(rank(name, Tier::Ordered, processor));
    }
    sort_ranked(&mut ordered);
    run_factory_batch(factory, &ordered)?;

    let mut plain = Vec::with_capacity(plain_names.len());
    for name in plain_names {
        let processor = materialize_factory_processor(factory, &name)?;
        plain.push(rank(name, Tier::Plain, processor));
    }
    run_factory_batch(factory, &plain)?;

    info!(
        "event=factory_phase module=invoke status=ok priority={} ordered={} plain={}",
        priority.len(),
        ordered.len(),
        plain.len()
    );

    factory.clear_metadata_cache();
    Ok(())
}

fn unprocessed_registry_processors(
    factory: &dyn ComponentFactory,
    processed: &BTreeSet<String>,
) -> Vec<String> {
    factory
        .names_for_capability(Capability::RegistryProcessor, true, false)
        .into_iter()
        .filter(|name| !processed.contains(name))
        .collect()
}

fn materialize_registry_batch(
    factory: &mut dyn ComponentFactory,
    names: Vec<String>,
    processed: &mut BTreeSet<String>,
) -> BootResult<Vec<Ranked<Arc<dyn RegistryPostProcessor>>>> {
    let mut batch = Vec::with_capacity(names.len());
    for name in names {
        processed.insert(name.clone());
        let tier = classify(&*factory, &name);
        let processor = factory
            .materialize(&name, Capability::RegistryProcessor)?
            .into_registry_processor()
            .ok_or_else(|| BootError::CapabilityMismatch {
                name: name.clone(),
                expected: Capability::RegistryProcessor,
            })?;
        batch.push(Ranked {
            order: processor.order(),
            name,
            tier,
            processor,
        });
    }
    sort_ranked(&mut batch);
    Ok(batch)
}

fn run_registry_batch(
    factory: &mut dyn ComponentFactory,
    batch: Vec<Ranked<Arc<dyn RegistryPostProcessor>>>,
    accumulated: &mut Vec<Arc<dyn RegistryPostProcessor>>,
) -> BootResult<()> {
    for entry in batch {
        debug!(
            "event=registry_processor module=invoke status=start name={} tier={} order={}",
            entry.name,
            entry.tier.as_str(),
            entry.order
        );
        apply_to_registry(factory, &entry.name, &entry.processor)?;
        accumulated.push(entry.processor);
    }
    Ok(())
}

fn apply_to_registry(
    factory: &mut dyn ComponentFactory,
    name: &str,
    processor: &Arc<dyn RegistryPostProcessor>,
) -> BootResult<()> {
    match factory.as_registry() {
        Some(registry) => processor.post_process_registry(registry),
        None => Err(BootError::processor(
            name,
            "registry view disappeared during the registry phase",
        )),
    }
}

fn materialize_factory_processor(
    factory: &mut dyn ComponentFactory,
    name: &str,
) -> BootResult<PostProcessor> {
    factory
        .materialize(name, Capability::FactoryProcessor)?
        .into_post_processor()
        .ok_or_else(|| BootError::CapabilityMismatch {
            name: name.to_string(),
            expected: Capability::FactoryProcessor,
        })
}

fn rank(name: String, tier: Tier, processor: PostProcessor) -> Ranked<PostProcessor> {
    Ranked {
        order: processor.order(),
        name,
        tier,
        processor,
    }
}

fn run_factory_batch(
    factory: &mut dyn ComponentFactory,
    batch: &[Ranked<PostProcessor>],
) -> BootResult<()> {
    for entry in batch {
        debug!(
            "event=factory_processor module=invoke status=start name={} tier={} order={}",
            entry.name,
            entry.tier.as_str(),
            entry.order
        );
        entry.processor.post_process_factory(factory)?;
    }
    Ok(())
}
