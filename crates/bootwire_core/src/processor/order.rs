//! Tier classification and in-tier ordering.

use crate::container::ComponentFactory;
use crate::model::class::Capability;

/// Invocation tier derived from the advertised capabilities of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Priority,
    Ordered,
    Plain,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Ordered => "ordered",
            Self::Plain => "plain",
        }
    }
}

/// Classifies one definition name without materializing it.
pub fn classify(factory: &dyn ComponentFactory, name: &str) -> Tier {
    if factory.is_type_match(name, Capability::PriorityOrdered) {
        Tier::Priority
    } else if factory.is_type_match(name, Capability::Ordered) {
        Tier::Ordered
    } else {
        Tier::Plain
    }
}

/// A materialized processor together with its sort key.
pub(crate) struct Ranked<P> {
    pub name: String,
    pub tier: Tier,
    pub order: i32,
    pub processor: P,
}

/// Stable sort: priority-tier entries first, then ascending order value.
pub(crate) fn sort_ranked<P>(entries: &mut [Ranked<P>]) {
    entries.sort_by_key(|entry| (entry.tier != Tier::Priority, entry.order));
}
