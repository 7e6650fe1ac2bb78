use crate::*;
use rpl_text::SourceLocation;

/// Id to a resolved user function
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct FunctionId(pub u32);

/// Id to a function argument or local variable
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct VariableId(pub u32);

/// A pipeline stage
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Stage::Vertex => write!(f, "vertex"),
            Stage::Fragment => write!(f, "fragment"),
        }
    }
}

/// A function that is an externally visible entry of the compiled shader family
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct EntryPoint {
    pub function_name: String,
    pub stage: Stage,
}

impl EntryPoint {
    pub fn new(function_name: &str, stage: Stage) -> Self {
        EntryPoint {
            function_name: function_name.to_string(),
            stage,
        }
    }
}

/// An entry point after resolution
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct ResolvedEntryPoint {
    pub function: FunctionId,
    pub stage: Stage,
}

/// Built-in pipeline values accessed without a declaration
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum IntrinsicAccess {
    /// Clip space position written by the vertex stage
    VertexPosition,

    /// Index of the instance being drawn
    InstanceIndex,
}

/// A global accessed by a function, directly or through its callees
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum GlobalAccess {
    Buffer { id: BufferId, write: bool },
    Sampler(SamplerId),
    Intrinsic(IntrinsicAccess),
}

/// Get the stage required to access a buffer
///
/// Vertex stage outputs are written by the vertex stage and may be read by both stages.
pub fn buffer_required_stage(kind: BufferKind, write: bool) -> Option<Stage> {
    match kind {
        BufferKind::VertexAttribute
        | BufferKind::InstancedAttribute
        | BufferKind::InstancedUniform
        | BufferKind::InstancedReadOnlyStorage => Some(Stage::Vertex),
        BufferKind::Uniform | BufferKind::ReadOnlyStorage => None,
        BufferKind::VertexStageOutput if write => Some(Stage::Vertex),
        BufferKind::VertexStageOutput => None,
        BufferKind::FragmentStageOutput => Some(Stage::Fragment),
    }
}

/// Get the stage required by a global access
pub fn access_required_stage(access: GlobalAccess, buffers: &[Buffer]) -> Option<Stage> {
    match access {
        GlobalAccess::Buffer { id, write } => {
            buffer_required_stage(buffers[id.0 as usize].kind, write)
        }
        GlobalAccess::Sampler(_) => Some(Stage::Fragment),
        GlobalAccess::Intrinsic(_) => Some(Stage::Vertex),
    }
}

/// Returns `true` if a buffer can be accessed from a stage
pub fn is_buffer_accessible_from_stage(kind: BufferKind, write: bool, stage: Stage) -> bool {
    match kind {
        BufferKind::VertexStageOutput if !write => true,
        BufferKind::Uniform | BufferKind::ReadOnlyStorage if write => false,
        _ => buffer_required_stage(kind, write).map_or(true, |s| s == stage),
    }
}

/// A resolved user function
#[derive(PartialEq, Debug, Clone)]
pub struct Function {
    pub name: String,
    pub return_type: Option<BaseType>,
    pub arguments: Vec<VariableId>,

    /// Scope expression for the function body
    pub body: ExpressionId,

    /// Stage the function is bound to by the globals it accesses
    pub required_stage: Option<Stage>,

    /// Every global the function or its callees access
    pub accesses: Vec<GlobalAccess>,

    /// User functions called directly by this function
    pub callees: Vec<FunctionId>,

    pub location: SourceLocation,
}

/// Record an access in a list if it was not seen yet
///
/// A write to a buffer replaces an earlier read of the same buffer.
pub fn add_global_access(accesses: &mut Vec<GlobalAccess>, access: GlobalAccess) {
    if let GlobalAccess::Buffer { id, write } = access {
        for existing in accesses.iter_mut() {
            if let GlobalAccess::Buffer {
                id: existing_id,
                write: existing_write,
            } = existing
            {
                if *existing_id == id {
                    *existing_write |= write;
                    return;
                }
            }
        }
    }
    if !accesses.contains(&access) {
        accesses.push(access);
    }
}

impl Function {
    /// Record an access if it was not seen yet
    pub fn add_access(&mut self, access: GlobalAccess) {
        add_global_access(&mut self.accesses, access)
    }

    /// Returns `true` if the function or its callees read any global
    pub fn reads_globals(&self) -> bool {
        !self.accesses.is_empty()
    }

    /// Returns `true` if the function or its callees write a stage output
    pub fn writes_globals(&self) -> bool {
        self.accesses.iter().any(|a| match a {
            GlobalAccess::Buffer { write, .. } => *write,
            GlobalAccess::Intrinsic(IntrinsicAccess::VertexPosition) => true,
            _ => false,
        })
    }
}

/// A function argument or local variable
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub type_ref: TypeRef,
    pub writable: bool,
    pub location: SourceLocation,
}
