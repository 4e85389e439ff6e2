//! Class catalog used for import resolution and package scanning.
//!
//! # Invariants
//! - Class names are dotted identifiers and unique within one catalog.
//! - Scan results follow catalog insertion order.

use crate::error::{BootResult, ConfigurationError};
use crate::model::class::ClassRef;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static CLASS_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_$]*)*$")
        .expect("valid class name regex")
});

#[derive(Debug, Default)]
pub struct ClassCatalog {
    classes: IndexMap<String, ClassRef>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `class` under its own name.
    ///
    /// # Errors
    /// - `InvalidClassName` when the name is not a dotted identifier.
    /// - `DuplicateClass` when the name is already present.
    pub fn register(&mut self, class: ClassRef) -> BootResult<()> {
        let name = class.name().to_string();
        if !CLASS_NAME_RE.is_match(&name) {
            return Err(ConfigurationError::InvalidClassName(name).into());
        }
        if self.classes.contains_key(&name) {
            return Err(ConfigurationError::DuplicateClass(name).into());
        }
        self.classes.insert(name, class);
        Ok(())
    }

    pub fn with(mut self, class: ClassRef) -> BootResult<Self> {
        self.register(class)?;
        Ok(self)
    }

    pub fn resolve(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).map(Arc::clone)
    }

    /// Components and configurations declared under `base_package`.
    pub fn scan(&self, base_package: &str) -> Vec<ClassRef> {
        let prefix = format!("{base_package}.");
        self.classes
            .values()
            .filter(|class| class.name().starts_with(&prefix))
            .filter(|class| class.metadata().component || class.metadata().configuration)
            .map(Arc::clone)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
