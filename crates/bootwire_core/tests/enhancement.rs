use bootwire_core::expansion::enhance::{enhance_configuration_definitions, SubclassEnhancer};
use bootwire_core::expansion::{ClassCatalog, ConfigurationExpansionProcessor, Enhancer};
use bootwire_core::model::definition::PRESERVE_TARGET_CLASS_ATTRIBUTE;
use bootwire_core::{
    BootError, BootResult, BootstrapContext, BootstrapOptions, Capability, ClassMetadata,
    ClassRef, ComponentClass, ComponentDefinition, ComponentFactory, DefaultComponentFactory,
    DefinitionRegistry, DefinitionStore, FactoryMethodDecl, FactoryPostProcessor, ImportAware,
    Instance, LifecycleProcessor, ManagedObject, Ordered, RegistryPostProcessor,
};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counting_root(counter: Arc<AtomicUsize>) -> ClassRef {
    ComponentClass::builder("app.Root")
        .configuration()
        .constructor(|| Ok(Instance::object(())))
        .factory_method(
            FactoryMethodDecl::new("a", ComponentClass::builder("app.A").build()),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Instance::object("a".to_string()))
            },
        )
        .factory_method(
            FactoryMethodDecl::new("b", ComponentClass::builder("app.B").build()),
            |scope| {
                let a = scope.call("a")?;
                let text = a.downcast_ref::<String>().cloned().unwrap_or_default();
                Ok(Instance::object(format!("{text}+b")))
            },
        )
        .build()
}

fn no_singletons() -> BootstrapOptions {
    BootstrapOptions {
        instantiate_singletons: false,
        ..BootstrapOptions::default()
    }
}

#[test]
fn enhanced_configuration_creates_the_sibling_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut context = BootstrapContext::new(ClassCatalog::new(), no_singletons());
    context
        .register("root", counting_root(Arc::clone(&counter)))
        .expect("register root");
    context.refresh().expect("refresh");

    let b = context.component("b").expect("materialize b");
    assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("a+b"));
    context.component("a").expect("materialize a");
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let root = context.factory().definition("root").expect("root definition");
    assert!(root.class.intercepts_factory_methods());
    assert!(root.class.has_capability(Capability::EnhancedConfiguration));
    assert_eq!(root.class.user_class_name(), "app.Root");
    assert_eq!(
        root.class.superclass().map(|parent| parent.name()),
        Some("app.Root")
    );
    assert_eq!(root.attribute(PRESERVE_TARGET_CLASS_ATTRIBUTE), Some("true"));
}

#[test]
fn locked_configuration_runs_the_sibling_body_directly() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut context = BootstrapContext::new(ClassCatalog::new(), no_singletons());
    context
        .register_definition(
            "root",
            ComponentDefinition::new(counting_root(Arc::clone(&counter))).locked(),
        )
        .expect("register root");
    context.refresh().expect("refresh");

    context.component("b").expect("materialize b");
    context.component("a").expect("materialize a");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    let root = context.factory().definition("root").expect("root definition");
    assert!(!root.class.intercepts_factory_methods());
}

#[test]
fn existing_singleton_keeps_its_class() {
    let counter = Arc::new(AtomicUsize::new(0));
    let original = counting_root(counter);
    let processor = ConfigurationExpansionProcessor::new(Arc::new(ClassCatalog::new()));
    let mut factory = DefaultComponentFactory::new();
    factory
        .register_definition("root", ComponentDefinition::new(Arc::clone(&original)))
        .expect("register root");

    processor
        .post_process_registry(&mut factory)
        .expect("registry phase");
    factory
        .materialize("root", Capability::Component)
        .expect("materialize root early");
    processor
        .post_process_factory(&mut factory)
        .expect("factory phase tolerates the early singleton");

    let root = factory.definition("root").expect("root definition");
    assert!(Arc::ptr_eq(&root.class, &original));
}

#[test]
fn intercepted_call_requires_factory_injection() {
    let mut factory = DefaultComponentFactory::new();
    factory
        .register_definition(
            "root",
            ComponentDefinition::new(counting_root(Arc::new(AtomicUsize::new(0)))),
        )
        .expect("register root");
    ConfigurationExpansionProcessor::new(Arc::new(ClassCatalog::new()))
        .process_config_definitions(&mut factory)
        .expect("expand");
    let enhanced = enhance_configuration_definitions(&mut factory, &SubclassEnhancer)
        .expect("enhance definitions");
    assert_eq!(enhanced, 1);

    let err = factory
        .materialize("b", Capability::Component)
        .expect_err("self-call without injected factory");
    assert_eq!(
        err,
        BootError::FactoryNotInjected("app.Root$$Intercepted".to_string())
    );
}

struct Wrapped(Instance);

struct WrappingProcessor;

impl Ordered for WrappingProcessor {}

impl LifecycleProcessor for WrappingProcessor {
    fn after_initialization(
        &self,
        instance: Instance,
        _name: &str,
        _factory: &dyn ComponentFactory,
    ) -> BootResult<Instance> {
        match instance {
            Instance::Object(_) => Ok(Instance::object(Wrapped(instance))),
            other => Ok(other),
        }
    }
}

#[test]
fn wrapped_configuration_still_intercepts_sibling_calls() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut context = BootstrapContext::new(ClassCatalog::new(), no_singletons());
    context
        .register("root", counting_root(Arc::clone(&counter)))
        .expect("register root");
    context
        .register(
            "wrapper",
            ComponentClass::builder("app.Wrapper")
                .capability(Capability::LifecycleProcessor)
                .constructor(|| Ok(Instance::lifecycle(Arc::new(WrappingProcessor))))
                .build(),
        )
        .expect("register wrapper");
    context.refresh().expect("refresh");

    let b = context.component("b").expect("materialize b through wrapped root");
    assert!(b.downcast_ref::<Wrapped>().is_some());
    let root = context.component("root").expect("materialize root");
    assert!(root.downcast_ref::<Wrapped>().is_some());
    context.component("a").expect("materialize a");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

struct BrokenEnhancer;

impl Enhancer for BrokenEnhancer {
    fn enhance(&self, class: &ClassRef) -> BootResult<ClassRef> {
        Err(BootError::NotInstantiable {
            class: class.name().to_string(),
            reason: "class bytes unavailable".to_string(),
        })
    }
}

#[test]
fn enhancer_failure_names_the_definition() {
    let processor = ConfigurationExpansionProcessor::new(Arc::new(ClassCatalog::new()))
        .with_enhancer(Arc::new(BrokenEnhancer));
    let mut factory = DefaultComponentFactory::new();
    factory
        .register_definition(
            "root",
            ComponentDefinition::new(counting_root(Arc::new(AtomicUsize::new(0)))),
        )
        .expect("register root");

    let err = processor
        .post_process_factory(&mut factory)
        .expect_err("enhancement failure is fatal");
    match err {
        BootError::EnhancementFailed {
            definition, class, ..
        } => {
            assert_eq!(definition, "root");
            assert_eq!(class, "app.Root");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[derive(Default)]
struct ImportRecorder {
    importing: Mutex<Option<String>>,
}

struct SharedRecorder(Arc<ImportRecorder>);

impl ManagedObject for SharedRecorder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn import_aware(&self) -> Option<&dyn ImportAware> {
        Some(self)
    }
}

impl ImportAware for SharedRecorder {
    fn set_import_metadata(&self, importing: &ClassMetadata) {
        *self.0.importing.lock() = Some(importing.class_name.clone());
    }
}

#[test]
fn imported_configuration_learns_its_importer() {
    let recorder = Arc::new(ImportRecorder::default());
    let shared = Arc::clone(&recorder);
    let support = ComponentClass::builder("app.support.SupportConfig")
        .configuration()
        .constructor(move || Ok(Instance::managed(Arc::new(SharedRecorder(Arc::clone(&shared))))))
        .build();
    let root = ComponentClass::builder("app.Root")
        .configuration()
        .import("app.support.SupportConfig")
        .constructor(|| Ok(Instance::object(())))
        .build();
    let catalog = ClassCatalog::new().with(support).expect("build catalog");

    let mut context = BootstrapContext::new(catalog, BootstrapOptions::default());
    context.register("root", root).expect("register root");
    context.refresh().expect("refresh");

    assert_eq!(recorder.importing.lock().as_deref(), Some("app.Root"));
    let instance = context
        .component("app.support.SupportConfig")
        .expect("imported configuration");
    assert!(instance.downcast_ref::<SharedRecorder>().is_some());
}

#[test]
fn enhancer_keeps_intercepting_classes() {
    let class = counting_root(Arc::new(AtomicUsize::new(0)));
    let once = SubclassEnhancer.enhance(&class).expect("enhance");
    let twice = SubclassEnhancer.enhance(&once).expect("enhance again");
    assert!(Arc::ptr_eq(&once, &twice));
    assert!(!Arc::ptr_eq(&once, &class));
}
