//! # RPL - Intermediate Module
//!
//! The AST library contains the definitions for the parsed but unresolved form of one RPL source file.
//! The root of an intermediate representation is a [Module] instance.
//!
//! Expressions are not a tree of owned nodes: every expression lives in [Module::expressions] and is
//! referenced by an [ExpressionIndex]. Lists of expressions and metadata strings are ranges into flat
//! storage arrays on the module. This keeps the whole module relocatable.

mod ast_declarations;
mod ast_expressions;
mod ast_globals;
mod ast_module;
mod builder;

pub use ast_declarations::*;
pub use ast_expressions::*;
pub use ast_globals::*;
pub use ast_module::*;
pub use builder::*;
