//! Execution scope of one factory-method body.

use crate::container::ComponentFactory;
use crate::error::{BootError, BootResult, ConfigurationError};
use crate::model::class::{Capability, ClassRef};
use crate::model::instance::Instance;
use log::trace;

/// Handle passed to factory-method bodies.
///
/// `call` is the self-call path: on a plain class it runs the sibling body
/// directly, on an intercepting class it routes through the factory so the
/// managed component is returned.
pub struct MethodScope<'a> {
    factory: &'a mut dyn ComponentFactory,
    class: ClassRef,
    owner: Option<Instance>,
}

impl<'a> MethodScope<'a> {
    pub(crate) fn new(
        factory: &'a mut dyn ComponentFactory,
        class: ClassRef,
        owner: Option<Instance>,
    ) -> Self {
        Self {
            factory,
            class,
            owner,
        }
    }

    /// Owning configuration instance; `None` for static methods.
    pub fn owner(&self) -> Option<&Instance> {
        self.owner.as_ref()
    }

    /// Looks up another managed component.
    pub fn component(&mut self, name: &str) -> BootResult<Instance> {
        self.factory.materialize(name, Capability::Component)
    }

    /// Invokes a sibling factory method declared on the same class.
    pub fn call(&mut self, method: &str) -> BootResult<Instance> {
        let declaration = self.class.factory_method(method).ok_or_else(|| {
            BootError::from(ConfigurationError::MissingFactoryMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
            })
        })?;
        if self.class.intercepts_factory_methods() && !declaration.is_static {
            let target = declaration.component_name().to_string();
            self.ensure_factory_injected()?;
            trace!(
                "event=self_call_intercepted module=container class={} method={} target={}",
                self.class.name(),
                method,
                target
            );
            return self.factory.materialize(&target, Capability::Component);
        }
        self.invoke(method)
    }

    /// Runs the body of `method` without interception.
    pub(crate) fn invoke(&mut self, method: &str) -> BootResult<Instance> {
        let body = self.class.method_body(method).cloned().ok_or_else(|| {
            BootError::from(ConfigurationError::MissingFactoryMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
            })
        })?;
        body(self)
    }

    fn ensure_factory_injected(&self) -> BootResult<()> {
        let injected = self
            .owner
            .as_ref()
            .and_then(Instance::as_object)
            .and_then(|object| object.factory_aware())
            .and_then(|aware| aware.injected_factory());
        if injected == Some(self.factory.container_id()) {
            Ok(())
        } else {
            Err(BootError::FactoryNotInjected(self.class.name().to_string()))
        }
    }
}
