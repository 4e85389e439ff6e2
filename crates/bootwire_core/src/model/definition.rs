//! Component definition model.
//!
//! # Responsibility
//! - Describe how to build one managed component: class, role, scope and the
//!   optional factory method that produces it.
//! - Carry the expansion marks written by the candidate check.
//!
//! # Invariants
//! - Definitions are owned by the registry; the engine mutates them in place
//!   and never deletes them.
//! - `class_locked` definitions keep their class reference across enhancement.

use crate::model::class::ClassRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute set on enhanced configuration definitions.
pub const PRESERVE_TARGET_CLASS_ATTRIBUTE: &str = "preserve_target_class";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User-facing component.
    Application,
    /// Container-internal component, exempt from eligibility diagnostics.
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Singleton,
    Prototype,
}

/// How a definition entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionSource {
    Registered,
    Scanned,
    Imported,
    FactoryMethod,
}

/// Expansion mark written by the candidate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationMode {
    /// Declared configuration; eligible for enhancement.
    Full,
    /// Component that declares imports, scans or factory methods.
    Lite,
}

/// Owner of a factory method.
#[derive(Debug, Clone)]
pub enum FactoryOwner {
    /// Instance method on a named component.
    Component(String),
    /// Static method on a class; no owner instance.
    Static(ClassRef),
}

#[derive(Debug, Clone)]
pub struct FactoryMethodRef {
    pub owner: FactoryOwner,
    pub method: String,
}

/// Declarative description of one managed component.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    /// Source class; replaced in place by enhancement.
    pub class: ClassRef,
    pub role: Role,
    pub scope: Scope,
    pub lazy_init: bool,
    pub source: DefinitionSource,
    pub factory: Option<FactoryMethodRef>,
    pub configuration: Option<ConfigurationMode>,
    pub order: Option<i32>,
    pub class_locked: bool,
    /// Property bag passed through to the component.
    pub properties: BTreeMap<String, String>,
    /// Engine-owned attributes.
    pub attributes: BTreeMap<String, String>,
}

impl ComponentDefinition {
    pub fn new(class: ClassRef) -> Self {
        Self {
            class,
            role: Role::Application,
            scope: Scope::Singleton,
            lazy_init: false,
            source: DefinitionSource::Registered,
            factory: None,
            configuration: None,
            order: None,
            class_locked: false,
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_source(mut self, source: DefinitionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_factory(mut self, owner: FactoryOwner, method: impl Into<String>) -> Self {
        self.factory = Some(FactoryMethodRef {
            owner,
            method: method.into(),
        });
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    pub fn locked(mut self) -> Self {
        self.class_locked = true;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn is_infrastructure(&self) -> bool {
        self.role == Role::Infrastructure
    }

    pub fn is_full_configuration(&self) -> bool {
        self.configuration == Some(ConfigurationMode::Full)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
