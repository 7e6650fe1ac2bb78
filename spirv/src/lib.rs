//! # RPL - SPIR-V Code Generator
//!
//! Serializes a resolved [CompilerInstance][rpl_ir::CompilerInstance] into a SPIR-V module.
//!
//! Buffers become descriptor bound blocks or one interface variable per flattened leaf, samplers
//! become combined image samplers, and every resolved function is emitted with structured control
//! flow. Each entry point is declared with the interface variables its call tree touches.

mod generator;

pub use generator::{generate, GeneratorError, GeneratorOptions};
