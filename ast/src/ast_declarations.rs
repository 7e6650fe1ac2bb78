use crate::{ExpressionIndex, ExpressionList};

/// Range of strings in [Module::meta_lists][crate::Module::meta_lists]
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
pub struct MetaList {
    pub first: u32,
    pub count: u32,
}

/// A named and typed field of a struct or buffer, a function argument, or a local variable
#[derive(PartialEq, Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub type_name: String,

    /// Compile time expressions for the size of each array dimension
    pub array_sizes: ExpressionList,

    /// Free form strings attached to the declaration for tooling
    pub meta: MetaList,

    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}

impl Declaration {
    /// Create a declaration with no array dimensions or metadata
    pub fn new(type_name: &str, name: &str) -> Self {
        Declaration {
            name: name.to_string(),
            type_name: type_name.to_string(),
            array_sizes: ExpressionList::default(),
            meta: MetaList::default(),
            conditional: None,
            line: 0,
        }
    }

    /// Set the array dimension expressions
    pub fn with_array_sizes(mut self, array_sizes: ExpressionList) -> Self {
        self.array_sizes = array_sizes;
        self
    }

    /// Set the attached metadata strings
    pub fn with_meta(mut self, meta: MetaList) -> Self {
        self.meta = meta;
        self
    }

    /// Only keep the declaration when the condition is true
    pub fn when(mut self, condition: ExpressionIndex) -> Self {
        self.conditional = Some(condition);
        self
    }

    /// Set the source line
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }
}

/// Value of a setting
#[derive(PartialEq, Debug, Clone)]
pub enum SettingValue {
    Flag(bool),
    Integer(i64),
    Floating(f64),
    String(String),
}

/// A named value that configures a pipeline or a sampler
#[derive(PartialEq, Debug, Clone)]
pub struct Setting {
    pub name: String,
    pub value: SettingValue,
    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}

impl Setting {
    pub fn new(name: &str, value: SettingValue) -> Self {
        Setting {
            name: name.to_string(),
            value,
            conditional: None,
            line: 0,
        }
    }

    pub fn flag(name: &str, value: bool) -> Self {
        Setting::new(name, SettingValue::Flag(value))
    }

    pub fn string(name: &str, value: &str) -> Self {
        Setting::new(name, SettingValue::String(value.to_string()))
    }

    /// Only keep the setting when the condition is true
    pub fn when(mut self, condition: ExpressionIndex) -> Self {
        self.conditional = Some(condition);
        self
    }

    /// Set the source line
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }
}

/// If an option may differ between instances of the same compiled shader family
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum OptionScope {
    Global,
    Instance,
}

/// Value of a compile time option
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum OptionValue {
    Flag(bool),
    Count(u64),
}

/// A compile time option declared by a module
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct OptionDeclaration {
    pub name: String,
    pub scope: OptionScope,

    /// Value used until the option is set on the compiler context
    pub value: OptionValue,

    pub line: u32,
}
