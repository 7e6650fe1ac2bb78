//! # RPL - Source Location Types
//!
//! The text library contains the shared types for describing where compiler input came from.
//! * The [SourceLocation] struct identifies a line in one of the source files.
//! * The [SourceFiles] table owns the file names and gives meaning to [SourceLocation].
//! * The [CompileError] trait and [MessagePrinter] format diagnostics from every compilation step.

mod location;
pub use location::*;

mod errors;
pub use errors::*;
