//! Bootstrap options.
//!
//! Callers decode these from JSON or build them in code; the core never
//! reads files or the environment itself.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapOptions {
    /// Registering an existing name replaces the definition instead of
    /// failing.
    pub allow_definition_overriding: bool,
    /// Create every non-lazy singleton at the end of refresh.
    pub instantiate_singletons: bool,
    /// Factory-method definitions may replace scan-discovered ones.
    pub override_scanned_definitions: bool,
    pub log_level: String,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            instantiate_singletons: true,
            override_scanned_definitions: true,
            log_level: default_log_level().to_string(),
        }
    }
}
