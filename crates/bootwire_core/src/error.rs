//! Boundary error type for the bootstrap engine.
//!
//! # Responsibility
//! - Give callers one failure shape for the whole bootstrap subsystem.
//! - Keep structural configuration problems distinguishable from re-entrancy
//!   violations and processor failures.
//!
//! # Invariants
//! - Errors raised inside a processor pass through the engine unchanged.
//! - Every variant is fatal; non-fatal conditions are logged, never returned.

use crate::container::ContainerId;
use crate::model::class::Capability;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BootResult<T> = Result<T, BootError>;

/// Phase guarded by the processed-container bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
    Registry,
    Factory,
}

impl ProcessingPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Factory => "factory",
        }
    }
}

/// Malformed configuration declarations found while expanding candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    FinalConfigurationClass {
        class: String,
    },
    NonOverridableFactoryMethod {
        class: String,
        method: String,
    },
    CircularImport {
        class: String,
        chain: Vec<String>,
    },
    UnresolvableImport {
        class: String,
        target: String,
    },
    MissingFactoryMethod {
        class: String,
        method: String,
    },
    InvalidClassName(String),
    DuplicateClass(String),
    ImportNameTaken {
        name: String,
        imported: String,
        registered: String,
    },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FinalConfigurationClass { class } => write!(
                f,
                "configuration class `{class}` must not be final: its factory methods need interception"
            ),
            Self::NonOverridableFactoryMethod { class, method } => write!(
                f,
                "factory method `{method}` on configuration class `{class}` must be overridable or static"
            ),
            Self::CircularImport { class, chain } => write!(
                f,
                "circular import of `{class}` detected via [{}]",
                chain.join(" -> ")
            ),
            Self::UnresolvableImport { class, target } => {
                write!(f, "configuration class `{class}` imports unknown class `{target}`")
            }
            Self::MissingFactoryMethod { class, method } => {
                write!(f, "class `{class}` declares no factory method `{method}`")
            }
            Self::InvalidClassName(value) => write!(f, "class name is invalid: {value}"),
            Self::DuplicateClass(value) => write!(f, "class already in catalog: {value}"),
            Self::ImportNameTaken {
                name,
                imported,
                registered,
            } => write!(
                f,
                "imported configuration `{imported}` cannot use name `{name}`: already registered for class `{registered}`"
            ),
        }
    }
}

impl Error for ConfigurationError {}

/// Single fatal error type surfaced by the bootstrap engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    AlreadyProcessed {
        phase: ProcessingPhase,
        container: ContainerId,
    },
    InvalidConfiguration(ConfigurationError),
    EnhancementFailed {
        definition: String,
        class: String,
        reason: String,
    },
    DefinitionNotFound(String),
    CapabilityMismatch {
        name: String,
        expected: Capability,
    },
    NotInstantiable {
        class: String,
        reason: String,
    },
    CircularCreation(String),
    DefinitionOverrideRejected(String),
    FactoryNotInjected(String),
    AlreadyRefreshed,
    Processor {
        name: String,
        message: String,
    },
}

impl BootError {
    /// Convenience constructor for processor authors.
    pub fn processor(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processor {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Display for BootError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyProcessed { phase, container } => write!(
                f,
                "{} post-processing already ran against container {container}",
                phase.as_str()
            ),
            Self::InvalidConfiguration(err) => write!(f, "invalid configuration: {err}"),
            Self::EnhancementFailed {
                definition,
                class,
                reason,
            } => write!(
                f,
                "cannot load configuration class `{class}` for definition `{definition}`: {reason}"
            ),
            Self::DefinitionNotFound(name) => write!(f, "no component definition named `{name}`"),
            Self::CapabilityMismatch { name, expected } => write!(
                f,
                "component `{name}` does not provide capability `{}`",
                expected.as_str()
            ),
            Self::NotInstantiable { class, reason } => {
                write!(f, "class `{class}` cannot be instantiated: {reason}")
            }
            Self::CircularCreation(name) => {
                write!(f, "component `{name}` is already in creation (circular reference)")
            }
            Self::DefinitionOverrideRejected(name) => write!(
                f,
                "cannot register definition `{name}`: name is taken and overriding is disabled"
            ),
            Self::FactoryNotInjected(class) => write!(
                f,
                "factory has not been injected into enhanced configuration `{class}`"
            ),
            Self::AlreadyRefreshed => write!(f, "bootstrap context can only be refreshed once"),
            Self::Processor { name, message } => write!(f, "processor `{name}` failed: {message}"),
        }
    }
}

impl Error for BootError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfiguration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for BootError {
    fn from(value: ConfigurationError) -> Self {
        Self::InvalidConfiguration(value)
    }
}
