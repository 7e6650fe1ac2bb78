use crate::*;
use rpl_text::FileName;

/// Represents a full parsed source file
#[derive(PartialEq, Debug, Clone)]
pub struct Module {
    /// Name of the source file for diagnostics
    pub file_name: FileName,

    pub options: Vec<OptionDeclaration>,
    pub settings: Vec<Setting>,
    pub structs: Vec<StructDefinition>,
    pub buffers: Vec<BufferDefinition>,
    pub samplers: Vec<SamplerDefinition>,
    pub functions: Vec<FunctionDefinition>,

    /// Storage for every expression in the module
    pub expressions: Vec<Expression>,

    /// Storage for lists of expressions
    pub expression_lists: Vec<ExpressionIndex>,

    /// Storage for lists of metadata strings
    pub meta_lists: Vec<String>,
}

impl Module {
    /// Create an empty module
    pub fn new(file_name: FileName) -> Self {
        Module {
            file_name,
            options: Vec::new(),
            settings: Vec::new(),
            structs: Vec::new(),
            buffers: Vec::new(),
            samplers: Vec::new(),
            functions: Vec::new(),
            expressions: Vec::new(),
            expression_lists: Vec::new(),
            meta_lists: Vec::new(),
        }
    }

    /// Get an expression from the storage
    pub fn get_expression(&self, index: ExpressionIndex) -> Option<&Expression> {
        self.expressions.get(index.0 as usize)
    }

    /// Get the expressions in a list
    pub fn get_expression_list(&self, list: ExpressionList) -> Option<&[ExpressionIndex]> {
        let start = list.first as usize;
        let end = start.checked_add(list.count as usize)?;
        self.expression_lists.get(start..end)
    }

    /// Get the strings in a metadata list
    pub fn get_meta_list(&self, list: MetaList) -> Option<&[String]> {
        let start = list.first as usize;
        let end = start.checked_add(list.count as usize)?;
        self.meta_lists.get(start..end)
    }
}
