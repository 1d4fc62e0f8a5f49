//! Retargeting: binding clips authored for one naming scheme to the objects
//! of a concrete character.

pub mod resolver;
pub mod retargeter;

pub use resolver::TargetResolver;
pub use retargeter::{Retargeter, apply_root_lock};
