//! Component class model.
//!
//! # Responsibility
//! - Describe a class the container can materialize: its declared metadata,
//!   advertised capabilities, constructor and factory-method bodies.
//! - Provide the intercepting-subclass shape produced by enhancement.
//!
//! # Invariants
//! - Capabilities are fixed at build time and checked at discovery, never
//!   re-derived from instances.
//! - An intercepting subclass keeps its parent as `superclass`; its metadata is
//!   the user class metadata.

use crate::container::MethodScope;
use crate::error::BootResult;
use crate::model::definition::{Role, Scope};
use crate::model::instance::Instance;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Order value that sorts last.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;
/// Order value that sorts first.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

pub type ClassRef = Arc<ComponentClass>;
pub type Constructor = Arc<dyn Fn() -> BootResult<Instance> + Send + Sync>;
pub type FactoryMethodBody = Arc<dyn Fn(&mut MethodScope<'_>) -> BootResult<Instance> + Send + Sync>;

/// Closed set of capabilities a class can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Component,
    RegistryProcessor,
    FactoryProcessor,
    LifecycleProcessor,
    MergedDefinition,
    PriorityOrdered,
    Ordered,
    EnhancedConfiguration,
    ImportAware,
    EventListener,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::RegistryProcessor => "registry_processor",
            Self::FactoryProcessor => "factory_processor",
            Self::LifecycleProcessor => "lifecycle_processor",
            Self::MergedDefinition => "merged_definition",
            Self::PriorityOrdered => "priority_ordered",
            Self::Ordered => "ordered",
            Self::EnhancedConfiguration => "enhanced_configuration",
            Self::ImportAware => "import_aware",
            Self::EventListener => "event_listener",
        }
    }

    /// Returns whether advertising `self` also satisfies `other`.
    fn implies(self, other: Capability) -> bool {
        if self == other || other == Self::Component {
            return true;
        }
        matches!(
            (self, other),
            (Self::RegistryProcessor, Self::FactoryProcessor)
                | (Self::MergedDefinition, Self::LifecycleProcessor)
                | (Self::PriorityOrdered, Self::Ordered)
        )
    }
}

/// Declared factory method on a configuration class.
#[derive(Debug, Clone)]
pub struct FactoryMethodDecl {
    pub name: String,
    /// Explicit component name; defaults to the method name.
    pub component_name: Option<String>,
    /// Declared return class, used for capability matching before creation.
    pub return_class: ClassRef,
    pub is_static: bool,
    pub overridable: bool,
    pub role: Role,
    pub scope: Scope,
    pub lazy_init: bool,
}

impl FactoryMethodDecl {
    pub fn new(name: impl Into<String>, return_class: ClassRef) -> Self {
        Self {
            name: name.into(),
            component_name: None,
            return_class,
            is_static: false,
            overridable: true,
            role: Role::Application,
            scope: Scope::Singleton,
            lazy_init: false,
        }
    }

    pub fn named(mut self, component_name: impl Into<String>) -> Self {
        self.component_name = Some(component_name.into());
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the method as not overridable by an intercepting subclass.
    pub fn sealed(mut self) -> Self {
        self.overridable = false;
        self
    }

    pub fn infrastructure(mut self) -> Self {
        self.role = Role::Infrastructure;
        self
    }

    pub fn prototype(mut self) -> Self {
        self.scope = Scope::Prototype;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_init = true;
        self
    }

    /// Registry name of the component this method produces.
    pub fn component_name(&self) -> &str {
        self.component_name.as_deref().unwrap_or(self.name.as_str())
    }
}

/// Declarative metadata of a user class.
#[derive(Debug, Clone, Default)]
pub struct ClassMetadata {
    pub class_name: String,
    /// Declared as a full configuration.
    pub configuration: bool,
    /// Declared as a scannable component.
    pub component: bool,
    pub component_name: Option<String>,
    pub is_final: bool,
    pub order: Option<i32>,
    /// Fully qualified names of imported classes.
    pub imports: Vec<String>,
    /// Base packages to scan.
    pub scans: Vec<String>,
    pub factory_methods: Vec<FactoryMethodDecl>,
}

impl ClassMetadata {
    pub fn factory_method(&self, name: &str) -> Option<&FactoryMethodDecl> {
        self.factory_methods.iter().find(|method| method.name == name)
    }

    /// Short class name without package prefix.
    pub fn short_name(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(self.class_name.as_str())
    }
}

/// A class the container can materialize.
pub struct ComponentClass {
    name: String,
    metadata: ClassMetadata,
    capabilities: BTreeSet<Capability>,
    constructor: Option<Constructor>,
    method_bodies: BTreeMap<String, FactoryMethodBody>,
    superclass: Option<ClassRef>,
    intercepts_factory_methods: bool,
}

impl ComponentClass {
    pub fn builder(name: impl Into<String>) -> ComponentClassBuilder {
        ComponentClassBuilder::new(name.into())
    }

    /// Builds the intercepting subclass of `parent` used by enhancement.
    pub fn intercepting_subclass(
        parent: &ClassRef,
        name: impl Into<String>,
        constructor: Constructor,
    ) -> ClassRef {
        let mut capabilities = parent.capabilities.clone();
        capabilities.insert(Capability::EnhancedConfiguration);
        Arc::new(Self {
            name: name.into(),
            metadata: parent.metadata.clone(),
            capabilities,
            constructor: Some(constructor),
            method_bodies: parent.method_bodies.clone(),
            superclass: Some(Arc::clone(parent)),
            intercepts_factory_methods: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the user class, looking through enhancement.
    pub fn user_class_name(&self) -> &str {
        &self.metadata.class_name
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities
            .iter()
            .any(|declared| declared.implies(capability))
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn factory_method(&self, name: &str) -> Option<&FactoryMethodDecl> {
        self.metadata.factory_method(name)
    }

    pub fn method_body(&self, name: &str) -> Option<&FactoryMethodBody> {
        self.method_bodies.get(name)
    }

    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    pub fn intercepts_factory_methods(&self) -> bool {
        self.intercepts_factory_methods
    }
}

impl Debug for ComponentClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentClass")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|parent| parent.name()),
            )
            .field("intercepts_factory_methods", &self.intercepts_factory_methods)
            .finish()
    }
}

/// Builder for [`ComponentClass`].
pub struct ComponentClassBuilder {
    class: ComponentClass,
}

impl ComponentClassBuilder {
    fn new(name: String) -> Self {
        let metadata = ClassMetadata {
            class_name: name.clone(),
            ..ClassMetadata::default()
        };
        let mut capabilities = BTreeSet::new();
        capabilities.insert(Capability::Component);
        Self {
            class: ComponentClass {
                name,
                metadata,
                capabilities,
                constructor: None,
                method_bodies: BTreeMap::new(),
                superclass: None,
                intercepts_factory_methods: false,
            },
        }
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.class.capabilities.insert(capability);
        self
    }

    pub fn configuration(mut self) -> Self {
        self.class.metadata.configuration = true;
        self
    }

    pub fn component(mut self) -> Self {
        self.class.metadata.component = true;
        self
    }

    pub fn component_named(mut self, name: impl Into<String>) -> Self {
        self.class.metadata.component = true;
        self.class.metadata.component_name = Some(name.into());
        self
    }

    pub fn final_class(mut self) -> Self {
        self.class.metadata.is_final = true;
        self
    }

    /// Declared order used when sorting expansion candidates.
    pub fn order(mut self, order: i32) -> Self {
        self.class.metadata.order = Some(order);
        self
    }

    pub fn import(mut self, class_name: impl Into<String>) -> Self {
        self.class.metadata.imports.push(class_name.into());
        self
    }

    pub fn scan(mut self, base_package: impl Into<String>) -> Self {
        self.class.metadata.scans.push(base_package.into());
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> BootResult<Instance> + Send + Sync + 'static,
    {
        self.class.constructor = Some(Arc::new(constructor));
        self
    }

    pub fn factory_method<F>(mut self, declaration: FactoryMethodDecl, body: F) -> Self
    where
        F: Fn(&mut MethodScope<'_>) -> BootResult<Instance> + Send + Sync + 'static,
    {
        self.class
            .method_bodies
            .insert(declaration.name.clone(), Arc::new(body));
        self.class.metadata.factory_methods.push(declaration);
        self
    }

    pub fn build(self) -> ClassRef {
        Arc::new(self.class)
    }
}
