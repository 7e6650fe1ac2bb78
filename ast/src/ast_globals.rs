use crate::*;

/// A definition for a struct type
#[derive(PartialEq, Debug, Clone)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<Declaration>,
    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}

/// How a buffer is fed into or out of the pipeline
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum BufferKind {
    /// Per vertex input data
    VertexAttribute,

    /// Per instance input data
    InstancedAttribute,

    /// Uniform data shared between all instances
    Uniform,

    /// Read only storage data shared between all instances
    ReadOnlyStorage,

    /// Uniform data with one entry per instance
    InstancedUniform,

    /// Read only storage data with one entry per instance
    InstancedReadOnlyStorage,

    /// Data written by the vertex stage and read by the fragment stage
    VertexStageOutput,

    /// Color outputs of the fragment stage
    FragmentStageOutput,
}

impl BufferKind {
    /// Returns `true` if the buffer is fed by vertex input bindings
    pub fn is_attribute(&self) -> bool {
        matches!(
            self,
            BufferKind::VertexAttribute | BufferKind::InstancedAttribute
        )
    }

    /// Returns `true` if the buffer is a stage output
    pub fn is_stage_output(&self) -> bool {
        matches!(
            self,
            BufferKind::VertexStageOutput | BufferKind::FragmentStageOutput
        )
    }

    /// Returns `true` if the buffer is split into individual leaf declarations
    pub fn is_flattened(&self) -> bool {
        self.is_attribute() || self.is_stage_output()
    }

    /// Returns `true` if the buffer has one entry per drawn instance
    pub fn is_instanced(&self) -> bool {
        matches!(
            self,
            BufferKind::InstancedUniform | BufferKind::InstancedReadOnlyStorage
        )
    }

    /// Returns `true` for uniform and storage buffers bound through descriptors
    pub fn is_arbitrary(&self) -> bool {
        matches!(
            self,
            BufferKind::Uniform
                | BufferKind::ReadOnlyStorage
                | BufferKind::InstancedUniform
                | BufferKind::InstancedReadOnlyStorage
        )
    }
}

impl std::fmt::Display for BufferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            BufferKind::VertexAttribute => "vertex_attribute",
            BufferKind::InstancedAttribute => "instanced_attribute",
            BufferKind::Uniform => "uniform",
            BufferKind::ReadOnlyStorage => "read_only_storage",
            BufferKind::InstancedUniform => "instanced_uniform",
            BufferKind::InstancedReadOnlyStorage => "instanced_read_only_storage",
            BufferKind::VertexStageOutput => "vertex_stage_output",
            BufferKind::FragmentStageOutput => "fragment_stage_output",
        };
        write!(f, "{}", name)
    }
}

/// A definition for a buffer
#[derive(PartialEq, Debug, Clone)]
pub struct BufferDefinition {
    pub name: String,
    pub kind: BufferKind,
    pub fields: Vec<Declaration>,
    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum SamplerKind {
    Sampler2d,
}

/// A definition for a sampler
#[derive(PartialEq, Debug, Clone)]
pub struct SamplerDefinition {
    pub name: String,
    pub kind: SamplerKind,
    pub settings: Vec<Setting>,
    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}

/// A definition for a function
#[derive(PartialEq, Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,

    /// Name of the return type or `void`
    pub return_type_name: String,

    pub arguments: Vec<Declaration>,
    pub body: ExpressionIndex,
    pub conditional: Option<ExpressionIndex>,
    pub line: u32,
}
