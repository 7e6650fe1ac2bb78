use crate::*;
use rpl_text::SourceFiles;

/// Kind of pipeline a shader family is compiled for
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
pub enum PipelineType {
    /// Vertex and fragment stages with fixed function rasterization
    #[default]
    ClassicGraphics,
}

/// The fully resolved form of one compiled shader family
///
/// Every node is stored in the arrays of the instance and addressed by id.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CompilerInstance {
    pub pipeline: PipelineType,

    /// Active pipeline settings in declaration order
    pub settings: Vec<Setting>,

    /// Structs in resolution order
    pub structs: Vec<Struct>,

    /// Buffers in declaration order
    pub buffers: Vec<Buffer>,

    /// Samplers in declaration order
    pub samplers: Vec<Sampler>,

    /// User functions in resolution order
    pub functions: Vec<Function>,

    /// Every function argument and local variable
    pub variables: Vec<Variable>,

    /// Storage for every resolved expression
    pub expressions: Vec<Expression>,

    pub entry_points: Vec<ResolvedEntryPoint>,

    /// Names of the source files referenced by locations
    pub files: SourceFiles,
}

impl CompilerInstance {
    pub fn get_struct(&self, id: StructId) -> &Struct {
        &self.structs[id.0 as usize]
    }

    pub fn get_buffer(&self, id: BufferId) -> &Buffer {
        &self.buffers[id.0 as usize]
    }

    pub fn get_sampler(&self, id: SamplerId) -> &Sampler {
        &self.samplers[id.0 as usize]
    }

    pub fn get_function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn get_variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    pub fn get_expression(&self, id: ExpressionId) -> &Expression {
        &self.expressions[id.0 as usize]
    }

    /// Find a struct by name
    pub fn find_struct(&self, name: &str) -> Option<StructId> {
        self.structs
            .iter()
            .position(|s| s.name == name)
            .map(|i| StructId(i as u32))
    }

    /// Find a buffer by name
    pub fn find_buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers
            .iter()
            .position(|b| b.name == name)
            .map(|i| BufferId(i as u32))
    }

    /// Find a sampler by name
    pub fn find_sampler(&self, name: &str) -> Option<SamplerId> {
        self.samplers
            .iter()
            .position(|s| s.name == name)
            .map(|i| SamplerId(i as u32))
    }

    /// Find a user function by name
    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|i| FunctionId(i as u32))
    }

    /// Find a setting by name
    pub fn find_setting(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    /// Add an expression to the storage
    pub fn add_expression(&mut self, expression: Expression) -> ExpressionId {
        let id = ExpressionId(self.expressions.len() as u32);
        self.expressions.push(expression);
        id
    }

    /// Add a variable to the storage
    pub fn add_variable(&mut self, variable: Variable) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(variable);
        id
    }

    /// Get the type of a value base type as a readable string
    pub fn get_type_name(&self, base: BaseType) -> &str {
        match base {
            BaseType::Vector(id) => id.get().name,
            BaseType::Matrix(id) => id.get().name,
            BaseType::Struct(id) => &self.get_struct(id).name,
        }
    }

    /// Describe an expression type for diagnostics
    pub fn describe_type(&self, ty: &ExpressionType) -> String {
        let mut name = match ty.kind {
            OutputKind::Void => "void".to_string(),
            OutputKind::Boolean => "boolean".to_string(),
            OutputKind::Base(base) => self.get_type_name(base).to_string(),
            OutputKind::Buffer(id) => format!("buffer {}", self.get_buffer(id).name),
        };
        for size in &ty.array_sizes {
            name += &format!("[{}]", size);
        }
        name
    }
}
