//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `bootwire_core` linkage and run one demo bootstrap pass.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `bootwire [ABSOLUTE_LOG_DIR]`

use bootwire_core::{
    default_log_level, init_logging, BootResult, BootstrapContext, BootstrapOptions,
    ClassCatalog, ComponentClass, DefinitionStore, FactoryMethodDecl, Instance,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

struct Greeting(String);

fn demo_context() -> BootResult<BootstrapContext> {
    let support = ComponentClass::builder("demo.support.SupportConfig")
        .configuration()
        .constructor(|| Ok(Instance::object(())))
        .build();
    let config = ComponentClass::builder("demo.AppConfig")
        .configuration()
        .import("demo.support.SupportConfig")
        .constructor(|| Ok(Instance::object(())))
        .factory_method(
            FactoryMethodDecl::new("clock", ComponentClass::builder("demo.Clock").build()),
            |_| Ok(Instance::object(1_700_000_000_u64)),
        )
        .factory_method(
            FactoryMethodDecl::new("greeting", ComponentClass::builder("demo.Greeting").build()),
            |scope| {
                let clock = scope.call("clock")?;
                let seconds = clock.downcast_ref::<u64>().copied().unwrap_or_default();
                Ok(Instance::object(Greeting(format!("hello at {seconds}"))))
            },
        )
        .build();

    let catalog = ClassCatalog::new().with(support)?;
    let mut context = BootstrapContext::new(catalog, BootstrapOptions::default());
    context.register("appConfig", config)?;
    Ok(context)
}

fn run_demo() -> BootResult<()> {
    let mut context = demo_context()?;
    context.refresh()?;
    for name in context.factory().definition_names() {
        println!("definition {name}");
    }
    let greeting = context.component("greeting")?;
    if let Some(Greeting(text)) = greeting.downcast_ref::<Greeting>() {
        println!("greeting={text}");
    }
    info!("event=demo_complete module=context status=ok");
    Ok(())
}

fn main() -> ExitCode {
    if let Some(dir) = std::env::args().nth(1) {
        if let Err(err) = init_logging(default_log_level(), &PathBuf::from(dir)) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("bootwire_core ping={}", bootwire_core::ping());
    println!("bootwire_core version={}", bootwire_core::core_version());

    match run_demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bootstrap failed: {err}");
            ExitCode::FAILURE
        }
    }
}
