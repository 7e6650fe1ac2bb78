//! # RPL
//!
//! This is a meta crate that re-exports all the sub libraries

pub use rpl_ast as ast;
pub use rpl_ir as ir;
pub use rpl_resolver as resolver;
pub use rpl_spirv as spirv;
pub use rpl_text as text;

pub use rpl_ir::metadata::Metadata;
pub use rpl_ir::{EntryPoint, PipelineType, Stage};

mod compile;
pub use compile::*;
