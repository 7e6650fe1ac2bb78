use rpl_text::{CompileError, MessagePrinter, Severity, SourceLocation};

/// Failures while generating SPIR-V from an instance
///
/// A successfully resolved instance should never produce these except through a bug in an
/// earlier step.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("statement after the end of a block in function '{0}'")]
    CodeAfterTerminator(String, SourceLocation),

    #[error("function '{0}' can reach its end without returning a value")]
    MissingReturn(String, SourceLocation),

    #[error("'{0}' can not be used outside of a loop")]
    JumpOutsideLoop(&'static str, SourceLocation),

    #[error("invalid compiler instance: {0}")]
    InvalidInstance(String, SourceLocation),

    #[error("spir-v builder error: {0}")]
    Builder(#[from] rspirv::dr::Error),
}

impl GeneratorError {
    pub fn location(&self) -> SourceLocation {
        match self {
            GeneratorError::CodeAfterTerminator(_, loc)
            | GeneratorError::MissingReturn(_, loc)
            | GeneratorError::JumpOutsideLoop(_, loc)
            | GeneratorError::InvalidInstance(_, loc) => *loc,
            GeneratorError::Builder(_) => SourceLocation::UNKNOWN,
        }
    }
}

impl CompileError for GeneratorError {
    fn print(&self, w: &mut MessagePrinter) -> std::fmt::Result {
        w.write_message(&|f| write!(f, "{}", self), self.location(), Severity::Error)
    }
}

pub(super) type GenerateResult<T> = Result<T, GeneratorError>;
