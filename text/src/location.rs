/// A source file identifier
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

/// A file used as an input
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub struct FileName(pub String);

impl From<&str> for FileName {
    fn from(name: &str) -> Self {
        FileName(name.to_string())
    }
}

/// A line number in a file
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub struct Line(pub u32);

/// Source file location
/// Requires [SourceFiles] to decode the file part
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: Line,
}

impl SourceLocation {
    /// Source location that represents an unknown source
    pub const UNKNOWN: SourceLocation = SourceLocation {
        file: FileId(u32::MAX),
        line: Line(0),
    };

    /// Create a location on a line of a file
    pub fn new(file: FileId, line: u32) -> Self {
        SourceLocation {
            file,
            line: Line(line),
        }
    }
}

/// Owns the names of all files that contributed to a compilation
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct SourceFiles {
    files: Vec<FileName>,
}

impl SourceFiles {
    /// Create a new file table with no files
    pub fn new() -> Self {
        SourceFiles { files: Vec::new() }
    }

    /// Add a file into the table
    pub fn add_file(&mut self, file_name: FileName) -> FileId {
        assert!(self.files.len() < u32::MAX as usize);
        let file_id = FileId(self.files.len() as u32);
        self.files.push(file_name);
        file_id
    }

    /// Get the name of a registered file
    pub fn get_file_name(&self, file_id: FileId) -> Option<&FileName> {
        self.files.get(file_id.0 as usize)
    }

    /// Get the number of registered files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files were registered
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get the full file location information from a source location
    pub fn get_file_location(&self, source_location: SourceLocation) -> FileLocation {
        match self.get_file_name(source_location.file) {
            Some(file_name) => FileLocation::Known(file_name.clone(), source_location.line),
            None => FileLocation::Unknown,
        }
    }
}

/// Fully qualified location
#[derive(PartialEq, Debug, Clone)]
pub enum FileLocation {
    Known(FileName, Line),
    Unknown,
}

impl std::fmt::Display for FileLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            FileLocation::Known(file_name, line) => write!(f, "{}:{}", file_name.0, line.0),
            FileLocation::Unknown => write!(f, "<unknown>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_file_location_display() {
        let mut files = SourceFiles::new();
        let first = files.add_file(FileName::from("first.rpl"));
        let second = files.add_file(FileName::from("second.rpl"));
        assert_eq!(first, FileId(0));
        assert_eq!(second, FileId(1));

        let loc = SourceLocation::new(second, 12);
        assert_eq!(files.get_file_location(loc).to_string(), "second.rpl:12");
        assert_eq!(
            files.get_file_location(SourceLocation::UNKNOWN).to_string(),
            "<unknown>"
        );
    }
}
