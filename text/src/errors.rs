use crate::*;

/// Trait to be implemented by error types in each compilation step
pub trait CompileError {
    fn print(&self, w: &mut MessagePrinter) -> std::fmt::Result;
}

/// Formatter for printing compile errors with source references
pub struct MessagePrinter<'s, 'f> {
    source_files: &'s SourceFiles,
    formatter: &'s mut std::fmt::Formatter<'f>,
}

/// Error severity
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Severity {
    Error,
    Note,
}

impl<'s, 'f> MessagePrinter<'s, 'f> {
    pub fn write_message(
        &mut self,
        write: &dyn Fn(&mut std::fmt::Formatter) -> std::fmt::Result,
        loc: SourceLocation,
        sev: Severity,
    ) -> std::fmt::Result {
        let sev_str = match sev {
            Severity::Error => "error",
            Severity::Note => "note",
        };
        match self.source_files.get_file_location(loc) {
            FileLocation::Known(file_name, line) => {
                write!(self.formatter, "{}:{}: {}: ", file_name.0, line.0, sev_str)?;
            }
            FileLocation::Unknown => {
                write!(self.formatter, "{}: ", sev_str)?;
            }
        }
        write(self.formatter)?;
        writeln!(self.formatter)
    }
}

/// Extension trait for [CompileError]
pub trait CompileErrorExt {
    /// Return a type that can be used with [Display][std::fmt::Display]
    fn display<'p>(&'p self, source_files: &'p SourceFiles) -> CompileErrorPrinter<'p>;
}

impl<T: CompileError + Sized> CompileErrorExt for T {
    fn display<'p>(&'p self, source_files: &'p SourceFiles) -> CompileErrorPrinter<'p> {
        CompileErrorPrinter {
            error: self,
            source_files,
        }
    }
}

/// Helper type that allows errors to be printed with [Display][std::fmt::Display]
pub struct CompileErrorPrinter<'p> {
    error: &'p dyn CompileError,
    source_files: &'p SourceFiles,
}

impl<'a> std::fmt::Display for CompileErrorPrinter<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut message_printer = MessagePrinter {
            source_files: self.source_files,
            formatter: f,
        };
        self.error.print(&mut message_printer)
    }
}
