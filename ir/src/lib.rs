//! # RPL - Compiler Instance
//!
//! The IR library contains the definitions for the fully resolved and type checked form of a
//! shader family. The root is a [CompilerInstance].
//!
//! It also holds the static intrinsic type and function tables, and the [metadata] emitter which
//! projects an instance into the description consumed by the pipeline management layer.

mod intrinsics;
mod ir_expressions;
mod ir_functions;
mod ir_globals;
mod ir_module;
mod ir_types;

pub use rpl_ast::{BinaryOperator, BufferKind, SamplerKind, SettingValue, UnaryOperator};

pub use intrinsics::*;
pub use ir_expressions::*;
pub use ir_functions::*;
pub use ir_globals::*;
pub use ir_module::*;
pub use ir_types::*;

pub mod metadata;
