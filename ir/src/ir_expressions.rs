use crate::*;
use rpl_text::SourceLocation;

/// Id to a resolved expression
///
/// The same expression may be referenced from multiple places when an alias is used more than once.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct ExpressionId(pub u32);

/// A resolved expression
#[derive(PartialEq, Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub output: ExpressionType,
    pub location: SourceLocation,
}

/// One step of a field access on a structured value
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum AccessStep {
    /// Field of a struct or non-flattened buffer
    Field(u32),

    /// Component of a vector
    Component(u32),

    /// Column of a matrix
    Column(u32),
}

#[derive(PartialEq, Debug, Clone)]
pub enum ExpressionKind {
    /// Reference to a non-flattened buffer
    StructuredBufferReference(BufferId),

    /// Read or write of leaves in a flattened buffer
    ///
    /// Matrices in attribute buffers cover one leaf per column.
    FlattenedBufferAccess {
        buffer: BufferId,
        first_leaf: u32,
        leaf_count: u32,
    },

    VariableReference(VariableId),

    /// Chain of field, component, and column selections
    StructuredFieldAccess {
        input: ExpressionId,
        steps: Vec<AccessStep>,
    },

    ArrayIndex {
        array: ExpressionId,
        index: ExpressionId,
    },

    IntegerLiteral(i64),
    FloatingLiteral(f64),

    /// Declaration of a local variable, evaluating to the variable itself
    VariableDeclaration(VariableId),

    Binary(BinaryOperator, ExpressionId, ExpressionId),
    Unary(UnaryOperator, ExpressionId),

    Scope {
        statements: Vec<ExpressionId>,
        variables: Vec<VariableId>,
    },

    FunctionCall {
        function: FunctionId,
        arguments: Vec<ExpressionId>,
    },

    BuiltinCall {
        function: BuiltinId,
        arguments: Vec<ExpressionId>,
    },

    SamplerCall {
        sampler: SamplerId,
        coordinate: ExpressionId,
    },

    Constructor {
        target: BaseType,
        arguments: Vec<ExpressionId>,
    },

    If {
        condition: ExpressionId,
        true_branch: ExpressionId,
        false_branch: Option<ExpressionId>,
    },

    /// Loop with optional parts, an absent condition is always true
    For {
        init: Option<ExpressionId>,
        condition: Option<ExpressionId>,
        step: Option<ExpressionId>,
        body: ExpressionId,
    },

    While {
        condition: ExpressionId,
        body: ExpressionId,
    },

    Break,
    Continue,
    Return(Option<ExpressionId>),
}

impl ExpressionKind {
    /// Returns `true` if control never continues past the expression
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            ExpressionKind::Break | ExpressionKind::Continue | ExpressionKind::Return(_)
        )
    }
}
