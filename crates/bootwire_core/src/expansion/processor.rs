//! Configuration expansion processor.
//!
//! # Responsibility
//! - Expand configuration definitions into the definitions they declare,
//!   repeating until no new candidate appears.
//! - Enhance full configurations during the factory phase.
//!
//! # Invariants
//! - The registry phase runs at most once per container, and never after
//!   the factory phase ran for it.
//! - Every configuration identity is materialized at most once per run.

use crate::container::{ComponentFactory, ContainerId, DefinitionRegistry};
use crate::error::{BootError, BootResult, ProcessingPhase};
use crate::expansion::candidate::check_candidate;
use crate::expansion::catalog::ClassCatalog;
use crate::expansion::enhance::{
    enhance_configuration_definitions, ConfigurationAwareProcessor, Enhancer, SubclassEnhancer,
};
use crate::expansion::metadata::{CachingMetadataReader, MetadataReader};
use crate::expansion::model::{CandidateSet, ConfigurationModel, IMPORT_REGISTRY};
use crate::expansion::naming::{
    NameGenerator, QualifiedNameGenerator, ShortNameGenerator, CONFIGURATION_NAME_GENERATOR,
};
use crate::expansion::parser::{default_parser_factory, ParserFactory};
use crate::expansion::reader::{ConfigurationReader, ModelDefinitionReader};
use crate::model::class::LOWEST_PRECEDENCE;
use crate::model::instance::Instance;
use crate::processor::{FactoryPostProcessor, Ordered, RegistryPostProcessor};
use indexmap::IndexSet;
use log::{debug, info, trace};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Stage of one expansion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionState {
    Scanning,
    Parsing,
    Materializing,
    Converged,
}

impl ExpansionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Parsing => "parsing",
            Self::Materializing => "materializing",
            Self::Converged => "converged",
        }
    }
}

/// Outcome of one expansion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionReport {
    pub iterations: usize,
    /// Configuration identities in the order they were materialized.
    pub parsed: Vec<String>,
    pub state: ExpansionState,
}

#[derive(Default)]
struct ProcessedContainers {
    registries: BTreeSet<ContainerId>,
    factories: BTreeSet<ContainerId>,
}

pub struct ConfigurationExpansionProcessor {
    catalog: Arc<ClassCatalog>,
    metadata_reader: Arc<dyn MetadataReader>,
    enhancer: Arc<dyn Enhancer>,
    parser_factory: ParserFactory,
    local_name_generator: Option<Arc<dyn NameGenerator>>,
    override_scanned: bool,
    processed: Mutex<ProcessedContainers>,
}

impl ConfigurationExpansionProcessor {
    pub fn new(catalog: Arc<ClassCatalog>) -> Self {
        Self {
            catalog,
            metadata_reader: Arc::new(CachingMetadataReader::new()),
            enhancer: Arc::new(SubclassEnhancer),
            parser_factory: default_parser_factory(),
            local_name_generator: None,
            override_scanned: true,
            processed: Mutex::new(ProcessedContainers::default()),
        }
    }

    pub fn with_metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.metadata_reader = reader;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn with_parser_factory(mut self, parser_factory: ParserFactory) -> Self {
        self.parser_factory = parser_factory;
        self
    }

    /// Fixes the name generator; a registered generator singleton is then
    /// ignored.
    pub fn with_name_generator(mut self, generator: Arc<dyn NameGenerator>) -> Self {
        self.local_name_generator = Some(generator);
        self
    }

    pub fn with_override_scanned(mut self, override_scanned: bool) -> Self {
        self.override_scanned = override_scanned;
        self
    }

    /// Runs the expansion loop against `registry` until it converges.
    pub fn process_config_definitions(
        &self,
        registry: &mut dyn DefinitionRegistry,
    ) -> BootResult<ExpansionReport> {
        let mut state = ExpansionState::Scanning;
        let mut candidates = CandidateSet::new();
        for name in registry.definition_names() {
            let Some(definition) = registry.definition_mut(&name) else {
                continue;
            };
            if let Some(mode) = definition.configuration {
                debug!(
                    "event=candidate_skipped module=expand status=skip name={} mode={:?}",
                    name, mode
                );
                continue;
            }
            if check_candidate(definition, &*self.metadata_reader)? {
                let snapshot = definition.clone();
                candidates.push(name, snapshot);
            }
        }
        if candidates.is_empty() {
            debug!("event=expansion module=expand status=skip reason=no_candidates");
            return Ok(ExpansionReport {
                iterations: 0,
                parsed: Vec::new(),
                state: ExpansionState::Converged,
            });
        }
        candidates.sort_by_order();

        let (import_names, scan_names) = match self.resolve_name_generator(registry) {
            Some(generator) => (Arc::clone(&generator), generator),
            None => (
                Arc::new(QualifiedNameGenerator) as Arc<dyn NameGenerator>,
                Arc::new(ShortNameGenerator) as Arc<dyn NameGenerator>,
            ),
        };
        let mut parser =
            (self.parser_factory)(Arc::clone(&self.catalog), Arc::clone(&self.metadata_reader));
        let mut reader = ModelDefinitionReader::new(import_names, scan_names, self.override_scanned);

        let mut already_parsed: IndexSet<String> = IndexSet::new();
        let mut previous: BTreeSet<String> = registry.definition_names().into_iter().collect();
        let mut iterations = 0;

        while !candidates.is_empty() {
            iterations += 1;
            state = transition(state, ExpansionState::Parsing, iterations);
            parser.parse(&candidates)?;
            parser.validate()?;

            let new_models: Vec<ConfigurationModel> = parser
                .models()
                .into_iter()
                .filter(|model| !already_parsed.contains(model.identity()))
                .collect();

            state = transition(state, ExpansionState::Materializing, iterations);
            reader.load_definitions(&new_models, registry)?;
            already_parsed.extend(new_models.iter().map(|model| model.identity().to_string()));
            candidates.clear();

            let current = registry.definition_names();
            if current.len() > previous.len() {
                for name in current.iter().filter(|name| !previous.contains(*name)) {
                    let Some(definition) = registry.definition_mut(name) else {
                        continue;
                    };
                    if check_candidate(definition, &*self.metadata_reader)?
                        && !already_parsed.contains(definition.class.user_class_name())
                    {
                        let snapshot = definition.clone();
                        candidates.push(name.clone(), snapshot);
                    }
                }
                candidates.sort_by_order();
            }
            previous = current.into_iter().collect();
        }
        state = transition(state, ExpansionState::Converged, iterations);

        if let Some(singletons) = registry.singletons() {
            if !singletons.contains_singleton(IMPORT_REGISTRY) {
                singletons
                    .register_singleton(IMPORT_REGISTRY, Instance::object(parser.import_registry()))?;
            }
        }
        self.metadata_reader.clear_cache();

        info!(
            "event=expansion module=expand status=ok iterations={} parsed={} definitions={}",
            iterations,
            already_parsed.len(),
            registry.definition_count()
        );
        Ok(ExpansionReport {
            iterations,
            parsed: already_parsed.into_iter().collect(),
            state,
        })
    }

    fn resolve_name_generator(
        &self,
        registry: &mut dyn DefinitionRegistry,
    ) -> Option<Arc<dyn NameGenerator>> {
        if let Some(local) = &self.local_name_generator {
            return Some(Arc::clone(local));
        }
        registry
            .singletons()?
            .singleton(CONFIGURATION_NAME_GENERATOR)?
            .downcast_ref::<Arc<dyn NameGenerator>>()
            .cloned()
    }

    fn mark(&self, phase: ProcessingPhase, container: ContainerId) -> BootResult<bool> {
        let mut processed = self.processed.lock();
        if processed.factories.contains(&container)
            || (phase == ProcessingPhase::Registry && processed.registries.contains(&container))
        {
            return Err(BootError::AlreadyProcessed { phase, container });
        }
        let registry_phase_ran = processed.registries.contains(&container);
        match phase {
            ProcessingPhase::Registry => processed.registries.insert(container),
            ProcessingPhase::Factory => processed.factories.insert(container),
        };
        Ok(registry_phase_ran)
    }
}

fn transition(from: ExpansionState, to: ExpansionState, iteration: usize) -> ExpansionState {
    trace!(
        "event=expansion_state module=expand status=ok from={} to={} iteration={}",
        from.as_str(),
        to.as_str(),
        iteration
    );
    to
}

impl Ordered for ConfigurationExpansionProcessor {
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }
}

impl FactoryPostProcessor for ConfigurationExpansionProcessor {
    fn post_process_factory(&self, factory: &mut dyn ComponentFactory) -> BootResult<()> {
        let registry_phase_ran = self.mark(ProcessingPhase::Factory, factory.container_id())?;
        if !registry_phase_ran {
            if let Some(registry) = factory.as_registry() {
                debug!("event=lazy_expansion module=expand status=start");
                self.process_config_definitions(registry)?;
            }
        }
        enhance_configuration_definitions(factory, &*self.enhancer)?;
        factory.add_lifecycle_processor(Arc::new(ConfigurationAwareProcessor));
        Ok(())
    }
}

impl RegistryPostProcessor for ConfigurationExpansionProcessor {
    fn post_process_registry(&self, registry: &mut dyn DefinitionRegistry) -> BootResult<()> {
        self.mark(ProcessingPhase::Registry, registry.container_id())?;
        self.process_config_definitions(registry)?;
        Ok(())
    }
}
