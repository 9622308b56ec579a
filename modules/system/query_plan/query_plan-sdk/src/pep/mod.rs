//! PEP (Policy Enforcement Point) helpers.
//!
//! - [`compiler::PlanCompiler`] - compiles access plans into `FilterTree`s
//! - [`enforcer::PlanEnforcer`] - fetches a plan from the PDP and compiles it

pub mod compiler;
pub mod enforcer;

pub use compiler::{PlanCompileError, PlanCompiler, compile};
pub use enforcer::{EnforcerError, PlanEnforcer};
