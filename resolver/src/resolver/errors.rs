use crate::EvaluationError;
use rpl_ir::{BinaryOperator, Stage, UnaryOperator};
use rpl_text::*;

/// Marker for a failed resolution step, the diagnostic has already been recorded
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Failed;

pub type ResolveResult<T> = Result<T, Failed>;

/// A rule violation found while resolving
#[derive(PartialEq, Eq, Debug, Clone, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("array dimension {0} is out of range")]
    ArrayDimensionOutOfRange(String),

    #[error("'{0}' is larger than the maximum type size of {max} bytes", max = rpl_ir::MAX_TYPE_SIZE)]
    TypeTooLarge(String),

    #[error("multiple active definitions of {kind} '{name}'")]
    DuplicateActiveDefinition { kind: &'static str, name: String },

    #[error("'{name}' is already declared as a {existing}")]
    NameConflict { name: String, existing: &'static str },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("struct '{0}' contains itself")]
    RecursiveStruct(String),

    #[error("member '{member}' of buffer '{buffer}' has a size of {size} bytes which is not a multiple of 16")]
    MemberSizeNotMultipleOf16 {
        buffer: String,
        member: String,
        size: u32,
    },

    #[error("attribute '{field}' in buffer '{buffer}' can not be an array")]
    AttributeArray { buffer: String, field: String },

    #[error("fragment output '{field}' in buffer '{buffer}' must be a vector")]
    FragmentOutputNotVector { buffer: String, field: String },

    #[error("'{field}' in buffer '{buffer}' is an array of structs which can not be flattened")]
    FlattenedStructArray { buffer: String, field: String },

    #[error("unknown sampler setting '{0}'")]
    UnknownSamplerSetting(String),

    #[error("invalid value for sampler setting '{0}'")]
    InvalidSamplerSettingValue(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{0}' calls itself")]
    RecursiveFunction(String),

    #[error("entry point '{0}' must return void and take no arguments")]
    InvalidEntryPointSignature(String),

    #[error("entry point '{name}' is used for the {stage} stage but accesses globals of the {required} stage")]
    EntryPointStageMismatch {
        name: String,
        stage: Stage,
        required: Stage,
    },

    #[error("function '{0}' accesses globals of both the vertex and fragment stage")]
    StageConflict(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("flag option '{0}' can only be used in compile time conditions")]
    FlagOptionInExpression(String),

    #[error("instance option '{0}' can not be used in functions")]
    InstanceOptionInExpression(String),

    #[error("integer {0} does not fit in 32 bits")]
    IntegerOutOfRange(i64),

    #[error("buffer '{0}' can not be used as a value")]
    BufferUsedAsValue(String),

    #[error("type '{ty}' does not have a member '{member}'")]
    UnknownMember { ty: String, member: String },

    #[error("'{path}' in buffer '{buffer}' does not name a single value")]
    FlattenedPathIncomplete { buffer: String, path: String },

    #[error("type '{0}' can not be indexed")]
    IndexNonArray(String),

    #[error("array index must be 'i1' but is '{0}'")]
    IndexNotInteger(String),

    #[error("invalid operand types '{left}' and '{right}' for operator '{op}'")]
    BinaryOperandTypes {
        op: BinaryOperator,
        left: String,
        right: String,
    },

    #[error("invalid operand type '{operand}' for operator '{op}'")]
    UnaryOperandType { op: UnaryOperator, operand: String },

    #[error("left side of assignment is not writable")]
    AssignToReadOnly,

    #[error("condition must be a boolean but is '{0}'")]
    ConditionNotBoolean(String),

    #[error("'{name}' expects {expected} arguments but {found} were given")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of '{name}' must be '{expected}' but is '{found}'")]
    WrongArgumentType {
        name: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("invalid arguments for constructor of '{0}'")]
    InvalidConstructorArguments(String),

    #[error("function '{0}' returns void but a value is returned")]
    ReturnValueInVoidFunction(String),

    #[error("function '{0}' must return a value")]
    MissingReturnValue(String),

    #[error("function '{name}' returns '{expected}' but '{found}' is returned")]
    WrongReturnType {
        name: String,
        expected: String,
        found: String,
    },

    #[error("function '{0}' can not return an array or boolean")]
    InvalidReturnType(String),

    #[error("not all paths of function '{0}' return a value")]
    NotAllPathsReturn(String),

    #[error("statement is unreachable")]
    UnreachableStatement,

    #[error("break outside of a loop")]
    BreakOutsideLoop,

    #[error("continue outside of a loop")]
    ContinueOutsideLoop,

    #[error("conditional scopes and aliases are only valid as statements")]
    ConditionalOutsideStatement,

    #[error("variable '{0}' is already declared")]
    VariableAlreadyDeclared(String),

    #[error("alias '{0}' refers to itself")]
    RecursiveAlias(String),

    #[error("'{0}' does not produce a value")]
    NotAValue(String),
}

/// Additional information attached to a diagnostic
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ResolverNote {
    pub message: String,
    pub location: SourceLocation,
}

/// A single resolver error with its location
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ResolverDiagnostic {
    pub error: ResolverError,
    pub location: SourceLocation,
    pub notes: Vec<ResolverNote>,
}

/// Every diagnostic from a failed resolve pass
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ResolveFailure {
    pub diagnostics: Vec<ResolverDiagnostic>,

    /// Names of the files referenced by diagnostic locations
    pub files: SourceFiles,
}

impl ResolveFailure {
    /// Returns `true` if any diagnostic matches the predicate
    pub fn contains(&self, predicate: impl Fn(&ResolverError) -> bool) -> bool {
        self.diagnostics.iter().any(|d| predicate(&d.error))
    }
}

impl CompileError for ResolveFailure {
    fn print(&self, w: &mut MessagePrinter) -> std::fmt::Result {
        for diagnostic in &self.diagnostics {
            w.write_message(
                &|f| write!(f, "{}", diagnostic.error),
                diagnostic.location,
                Severity::Error,
            )?;
            for note in &diagnostic.notes {
                w.write_message(&|f| write!(f, "{}", note.message), note.location, Severity::Note)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.display(&self.files))
    }
}

impl std::error::Error for ResolveFailure {}
