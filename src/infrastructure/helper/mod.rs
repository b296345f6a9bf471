//! Built-in experiment helpers
//!
//! The real platform integration lives outside this crate; these helpers
//! cover configurations without one and local setups with fixed groups.

mod delayed;
mod factory;
mod static_assignment;
mod unavailable;

pub use delayed::DelayedHelper;
pub use factory::build_helper;
pub use static_assignment::StaticAssignmentHelper;
pub use unavailable::UnavailableHelper;
