//! # RPL - Resolver
//!
//! Converts intermediate modules into a fully typed [CompilerInstance][rpl_ir::CompilerInstance].
//!
//! A [CompilerContext] collects modules and option values. Calling [CompilerContext::resolve]
//! evaluates every conditional, resolves the active structs, buffers, samplers, and every function
//! reachable from the entry points, and checks all language rules on the way.

mod context;
mod evaluator;
mod resolver;

pub use context::*;
pub use evaluator::*;
pub use resolver::{ResolveFailure, ResolverDiagnostic, ResolverError, ResolverNote};
