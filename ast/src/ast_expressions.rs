use crate::Declaration;

/// Index of an expression in [Module::expressions][crate::Module::expressions]
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct ExpressionIndex(pub u32);

/// Range of expression indices in [Module::expression_lists][crate::Module::expression_lists]
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Default)]
pub struct ExpressionList {
    pub first: u32,
    pub count: u32,
}

impl ExpressionList {
    /// Returns `true` if the list has no entries
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A single unresolved expression
#[derive(PartialEq, Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub line: u32,
}

#[derive(PartialEq, Debug, Clone)]
pub enum ExpressionKind {
    /// Expression that does nothing
    ///
    /// When used as a condition it is always true
    Nope,
    Identifier(String),
    IntegerLiteral(i64),
    FloatingLiteral(f64),
    VariableDeclaration(Declaration),
    BinaryOperation(BinaryOperator, ExpressionIndex, ExpressionIndex),
    UnaryOperation(UnaryOperator, ExpressionIndex),
    Scope(ExpressionList),
    FunctionCall(String, ExpressionList),
    Constructor(String, ExpressionList),
    If {
        condition: ExpressionIndex,
        true_branch: ExpressionIndex,
        false_branch: Option<ExpressionIndex>,
    },
    For {
        init: ExpressionIndex,
        condition: ExpressionIndex,
        step: ExpressionIndex,
        body: ExpressionIndex,
    },
    While {
        condition: ExpressionIndex,
        body: ExpressionIndex,
    },
    /// Scope that is only compiled when the compile time condition is true
    ConditionalScope {
        condition: ExpressionIndex,
        body: ExpressionIndex,
    },
    /// Name for an expression that is only registered when the compile time condition is true
    ConditionalAlias {
        name: String,
        condition: Option<ExpressionIndex>,
        expression: ExpressionIndex,
    },
    Break,
    Continue,
    Return(Option<ExpressionIndex>),
}

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum BinaryOperator {
    FieldAccess,
    ArrayAccess,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Assign,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseLeftShift,
    BitwiseRightShift,
}

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum UnaryOperator {
    Negate,
    Not,
    BitwiseNot,
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::FieldAccess => ".",
            BinaryOperator::ArrayAccess => "[]",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulus => "%",
            BinaryOperator::Assign => "=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseLeftShift => "<<",
            BinaryOperator::BitwiseRightShift => ">>",
        };
        write!(f, "{}", symbol)
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let symbol = match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitwiseNot => "~",
        };
        write!(f, "{}", symbol)
    }
}
