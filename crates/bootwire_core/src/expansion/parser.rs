//! Configuration parser.
//!
//! # Responsibility
//! - Turn candidate definitions into one [`ConfigurationModel`] per
//!   configuration identity, following imports recursively.
//! - Record which class imported which.
//!
//! # Invariants
//! - An explicitly registered configuration replaces an imported model of
//!   the same identity; a second import only merges `imported_by`.
//! - Models accumulate across `parse` calls on the same parser.

use crate::error::{BootResult, ConfigurationError};
use crate::expansion::catalog::ClassCatalog;
use crate::expansion::metadata::MetadataReader;
use crate::expansion::model::{CandidateSet, ConfigurationModel, ImportRegistry};
use crate::model::class::{ClassMetadata, ClassRef};
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

/// Builds a fresh parser for one expansion run.
pub type ParserFactory = Arc<
    dyn Fn(Arc<ClassCatalog>, Arc<dyn MetadataReader>) -> Box<dyn ConfigurationParser> + Send + Sync,
>;

pub trait ConfigurationParser {
    fn parse(&mut self, candidates: &CandidateSet) -> BootResult<()>;

    /// Structural validation of every model parsed so far.
    fn validate(&self) -> BootResult<()>;

    /// All models parsed so far, in parse order.
    fn models(&self) -> Vec<ConfigurationModel>;

    fn import_registry(&self) -> ImportRegistry;
}

pub fn default_parser_factory() -> ParserFactory {
    Arc::new(
        |catalog: Arc<ClassCatalog>, reader: Arc<dyn MetadataReader>| -> Box<dyn ConfigurationParser> {
            Box::new(ClassMetadataParser::new(catalog, reader))
        },
    )
}

pub struct ClassMetadataParser {
    catalog: Arc<ClassCatalog>,
    reader: Arc<dyn MetadataReader>,
    models: IndexMap<String, ConfigurationModel>,
    imports: ImportRegistry,
}

impl ClassMetadataParser {
    pub fn new(catalog: Arc<ClassCatalog>, reader: Arc<dyn MetadataReader>) -> Self {
        Self {
            catalog,
            reader,
            models: IndexMap::new(),
            imports: ImportRegistry::default(),
        }
    }

    fn process(
        &mut self,
        class: ClassRef,
        component_name: Option<String>,
        importer: Option<Arc<ClassMetadata>>,
        import_stack: &mut Vec<String>,
    ) -> BootResult<()> {
        let metadata = self.reader.read(&class)?;
        let identity = metadata.class_name.clone();

        if let Some(existing) = self.models.get_mut(&identity) {
            match &importer {
                Some(importing) => {
                    if existing.is_imported()
                        && !existing.imported_by.contains(&importing.class_name)
                    {
                        existing.imported_by.push(importing.class_name.clone());
                    }
                    return Ok(());
                }
                None => {
                    debug!(
                        "event=model_replaced module=expand status=ok class={} imported={}",
                        identity,
                        existing.is_imported()
                    );
                    self.models.shift_remove(&identity);
                }
            }
        }

        let mut model = ConfigurationModel::new(class, Arc::clone(&metadata), component_name);
        if let Some(importing) = &importer {
            model.imported_by.push(importing.class_name.clone());
        }
        for base_package in &metadata.scans {
            for scanned in self.catalog.scan(base_package) {
                let duplicate = scanned.name() == identity
                    || model
                        .scanned
                        .iter()
                        .any(|known| known.name() == scanned.name());
                if !duplicate {
                    model.scanned.push(scanned);
                }
            }
        }

        import_stack.push(identity.clone());
        for target in &metadata.imports {
            if import_stack.iter().any(|entry| entry == target) {
                let mut chain = import_stack.clone();
                chain.push(target.clone());
                return Err(ConfigurationError::CircularImport {
                    class: target.clone(),
                    chain,
                }
                .into());
            }
            let resolved = self.catalog.resolve(target).ok_or_else(|| {
                ConfigurationError::UnresolvableImport {
                    class: identity.clone(),
                    target: target.clone(),
                }
            })?;
            self.imports.register(target.clone(), Arc::clone(&metadata));
            self.process(resolved, None, Some(Arc::clone(&metadata)), import_stack)?;
        }
        import_stack.pop();

        self.models.insert(identity, model);
        Ok(())
    }
}

impl ConfigurationParser for ClassMetadataParser {
    fn parse(&mut self, candidates: &CandidateSet) -> BootResult<()> {
        for (name, definition) in candidates.iter() {
            let mut import_stack = Vec::new();
            self.process(
                Arc::clone(&definition.class),
                Some(name.to_string()),
                None,
                &mut import_stack,
            )?;
        }
        debug!(
            "event=candidates_parsed module=expand status=ok candidates={} models={}",
            candidates.len(),
            self.models.len()
        );
        Ok(())
    }

    fn validate(&self) -> BootResult<()> {
        self.models.values().try_for_each(ConfigurationModel::validate)
    }

    fn models(&self) -> Vec<ConfigurationModel> {
        self.models.values().cloned().collect()
    }

    fn import_registry(&self) -> ImportRegistry {
        self.imports.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassMetadataParser, ConfigurationParser};
    use crate::error::{BootError, ConfigurationError};
    use crate::expansion::catalog::ClassCatalog;
    use crate::expansion::metadata::CachingMetadataReader;
    use crate::expansion::model::CandidateSet;
    use crate::model::class::ComponentClass;
    use crate::model::definition::ComponentDefinition;
    use std::sync::Arc;

    fn parser(catalog: ClassCatalog) -> ClassMetadataParser {
        ClassMetadataParser::new(Arc::new(catalog), Arc::new(CachingMetadataReader::new()))
    }

    #[test]
    fn imports_are_parsed_before_the_importer_and_merged() {
        let shared = ComponentClass::builder("app.Shared").configuration().build();
        let left = ComponentClass::builder("app.Left")
            .configuration()
            .import("app.Shared")
            .build();
        let right = ComponentClass::builder("app.Right")
            .configuration()
            .import("app.Shared")
            .build();
        let catalog = ClassCatalog::new().with(shared).expect("catalog shared");
        let mut parser = parser(catalog);

        let mut candidates = CandidateSet::new();
        candidates.push("left", ComponentDefinition::new(left));
        candidates.push("right", ComponentDefinition::new(right));
        parser.parse(&candidates).expect("parse candidates");

        let models = parser.models();
        let identities: Vec<&str> = models.iter().map(|model| model.identity()).collect();
        assert_eq!(identities, vec!["app.Shared", "app.Left", "app.Right"]);
        assert_eq!(models[0].imported_by, vec!["app.Left", "app.Right"]);
        assert_eq!(
            parser
                .import_registry()
                .importing_class_for("app.Shared")
                .map(|metadata| metadata.class_name.clone()),
            Some("app.Right".to_string())
        );
    }

    #[test]
    fn explicit_registration_replaces_imported_model() {
        let shared = ComponentClass::builder("app.Shared").configuration().build();
        let root = ComponentClass::builder("app.Root")
            .configuration()
            .import("app.Shared")
            .build();
        let catalog = ClassCatalog::new()
            .with(Arc::clone(&shared))
            .expect("catalog shared");
        let mut parser = parser(catalog);

        let mut candidates = CandidateSet::new();
        candidates.push("root", ComponentDefinition::new(root));
        candidates.push("shared", ComponentDefinition::new(shared));
        parser.parse(&candidates).expect("parse candidates");

        let models = parser.models();
        let shared_model = models
            .iter()
            .find(|model| model.identity() == "app.Shared")
            .expect("shared model");
        assert!(!shared_model.is_imported());
        assert_eq!(shared_model.component_name.as_deref(), Some("shared"));
        assert_eq!(models.len(), 2);
    }

    #[test]
    fn importer_is_recorded_once_when_rewalked() {
        let shared = ComponentClass::builder("app.Shared").configuration().build();
        let mid = ComponentClass::builder("app.Mid")
            .configuration()
            .import("app.Shared")
            .build();
        let top = ComponentClass::builder("app.Top")
            .configuration()
            .import("app.Mid")
            .build();
        let catalog = ClassCatalog::new()
            .with(shared)
            .and_then(|catalog| catalog.with(Arc::clone(&mid)))
            .expect("catalog");
        let mut parser = parser(catalog);

        let mut candidates = CandidateSet::new();
        candidates.push("top", ComponentDefinition::new(top));
        candidates.push("mid", ComponentDefinition::new(mid));
        parser.parse(&candidates).expect("parse candidates");

        let models = parser.models();
        let shared_model = models
            .iter()
            .find(|model| model.identity() == "app.Shared")
            .expect("shared model");
        assert_eq!(shared_model.imported_by, vec!["app.Mid"]);
    }

    #[test]
    fn circular_import_is_reported_with_its_chain() {
        let first = ComponentClass::builder("app.First")
            .configuration()
            .import("app.Second")
            .build();
        let second = ComponentClass::builder("app.Second")
            .configuration()
            .import("app.First")
            .build();
        let catalog = ClassCatalog::new()
            .with(Arc::clone(&first))
            .and_then(|catalog| catalog.with(second))
            .expect("catalog");
        let mut parser = parser(catalog);

        let mut candidates = CandidateSet::new();
        candidates.push("first", ComponentDefinition::new(first));
        let err = parser.parse(&candidates).expect_err("cycle must fail");
        assert_eq!(
            err,
            BootError::InvalidConfiguration(ConfigurationError::CircularImport {
                class: "app.First".to_string(),
                chain: vec![
                    "app.First".to_string(),
                    "app.Second".to_string(),
                    "app.First".to_string()
                ],
            })
        );
    }

    #[test]
    fn unknown_import_is_unresolvable() {
        let root = ComponentClass::builder("app.Root")
            .configuration()
            .import("app.Missing")
            .build();
        let mut parser = parser(ClassCatalog::new());
        let mut candidates = CandidateSet::new();
        candidates.push("root", ComponentDefinition::new(root));
        let err = parser.parse(&candidates).expect_err("missing import must fail");
        assert!(matches!(
            err,
            BootError::InvalidConfiguration(ConfigurationError::UnresolvableImport { .. })
        ));
    }

    #[test]
    fn scans_are_recorded_on_the_model() {
        let root = ComponentClass::builder("app.Root")
            .configuration()
            .scan("app.web")
            .build();
        let catalog = ClassCatalog::new()
            .with(ComponentClass::builder("app.web.Controller").component().build())
            .expect("catalog");
        let mut parser = parser(catalog);
        let mut candidates = CandidateSet::new();
        candidates.push("root", ComponentDefinition::new(root));
        parser.parse(&candidates).expect("parse root");

        let models = parser.models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].scanned.len(), 1);
        assert_eq!(models[0].scanned[0].name(), "app.web.Controller");
    }
}
