//! Component model shared by the container and the bootstrap engine.
//!
//! # Responsibility
//! - Define classes, definitions and instances as the engine sees them.
//! - Keep capability advertisement explicit and static.
//!
//! # Invariants
//! - A definition always references a resolved class.
//! - Instances expose capabilities only through their variant.

pub mod class;
pub mod definition;
pub mod instance;
