use rpl_ast::{
    BinaryOperator, ExpressionIndex, ExpressionKind, Module, OptionScope, OptionValue,
    UnaryOperator,
};

/// Result of a compile time expression
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Floating(f64),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Floating(v) => write!(f, "{}", v),
        }
    }
}

/// An option registered on a compiler context with its current value
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ContextOption {
    pub name: String,
    pub scope: OptionScope,
    pub value: OptionValue,
}

/// Failures when evaluating compile time expressions
#[derive(PartialEq, Eq, Debug, Clone, thiserror::Error)]
pub enum EvaluationError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("instance option '{0}' is not allowed here")]
    InstanceOptionNotAllowed(String),

    #[error("{0} is not supported in compile time expressions")]
    Unsupported(&'static str),

    #[error("invalid operands for operator '{0}' in compile time expression")]
    InvalidBinaryOperands(BinaryOperator),

    #[error("invalid operand for operator '{0}' in compile time expression")]
    InvalidUnaryOperand(UnaryOperator),

    #[error("division by zero in compile time expression")]
    DivisionByZero,

    #[error("integer overflow in compile time expression")]
    Overflow,

    #[error("condition evaluates to a floating value")]
    FloatingCondition,

    #[error("compile time expression refers to a missing expression")]
    MissingExpression,
}

/// Evaluates compile time expressions of one module against the option table
pub struct Evaluator<'a> {
    pub module: &'a Module,
    pub options: &'a [ContextOption],

    /// Allow references to options with [OptionScope::Instance]
    pub instance_options_allowed: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        module: &'a Module,
        options: &'a [ContextOption],
        instance_options_allowed: bool,
    ) -> Self {
        Evaluator {
            module,
            options,
            instance_options_allowed,
        }
    }

    /// Evaluate an expression, an absent expression is `true`
    pub fn evaluate(&self, index: Option<ExpressionIndex>) -> Result<Value, EvaluationError> {
        let index = match index {
            Some(index) => index,
            None => return Ok(Value::Boolean(true)),
        };
        let expression = self
            .module
            .get_expression(index)
            .ok_or(EvaluationError::MissingExpression)?;
        match &expression.kind {
            ExpressionKind::Nope => Ok(Value::Boolean(true)),
            ExpressionKind::Identifier(name) => self.evaluate_option(name),
            ExpressionKind::IntegerLiteral(value) => Ok(Value::Integer(*value)),
            ExpressionKind::FloatingLiteral(value) => Ok(Value::Floating(*value)),
            ExpressionKind::BinaryOperation(op, left, right) => {
                self.evaluate_binary(*op, *left, *right)
            }
            ExpressionKind::UnaryOperation(op, operand) => {
                let value = self.evaluate(Some(*operand))?;
                evaluate_unary(*op, value)
            }
            ExpressionKind::FunctionCall(..) => Err(EvaluationError::Unsupported("function call")),
            ExpressionKind::Constructor(..) => Err(EvaluationError::Unsupported("constructor")),
            ExpressionKind::VariableDeclaration(_) => {
                Err(EvaluationError::Unsupported("variable declaration"))
            }
            ExpressionKind::Scope(_)
            | ExpressionKind::If { .. }
            | ExpressionKind::For { .. }
            | ExpressionKind::While { .. }
            | ExpressionKind::ConditionalScope { .. }
            | ExpressionKind::ConditionalAlias { .. }
            | ExpressionKind::Break
            | ExpressionKind::Continue
            | ExpressionKind::Return(_) => Err(EvaluationError::Unsupported("statement")),
        }
    }

    /// Evaluate a condition, an absent condition is `true`
    ///
    /// Non-zero integers are `true`.
    pub fn evaluate_conditional(
        &self,
        index: Option<ExpressionIndex>,
    ) -> Result<bool, EvaluationError> {
        match self.evaluate(index)? {
            Value::Boolean(value) => Ok(value),
            Value::Integer(value) => Ok(value != 0),
            Value::Floating(_) => Err(EvaluationError::FloatingCondition),
        }
    }

    fn evaluate_option(&self, name: &str) -> Result<Value, EvaluationError> {
        let option = match self.options.iter().find(|o| o.name == name) {
            Some(option) => option,
            None => return Err(EvaluationError::UnknownOption(name.to_string())),
        };
        if option.scope == OptionScope::Instance && !self.instance_options_allowed {
            return Err(EvaluationError::InstanceOptionNotAllowed(name.to_string()));
        }
        match option.value {
            OptionValue::Flag(value) => Ok(Value::Boolean(value)),
            OptionValue::Count(value) => i64::try_from(value)
                .map(Value::Integer)
                .map_err(|_| EvaluationError::Overflow),
        }
    }

    fn evaluate_binary(
        &self,
        op: BinaryOperator,
        left: ExpressionIndex,
        right: ExpressionIndex,
    ) -> Result<Value, EvaluationError> {
        match op {
            BinaryOperator::FieldAccess => return Err(EvaluationError::Unsupported("field access")),
            BinaryOperator::ArrayAccess => return Err(EvaluationError::Unsupported("array access")),
            BinaryOperator::Assign => return Err(EvaluationError::Unsupported("assignment")),
            _ => {}
        }

        let left = self.evaluate(Some(left))?;
        let right = self.evaluate(Some(right))?;
        let invalid = || EvaluationError::InvalidBinaryOperands(op);

        match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => match promote(left, right).ok_or_else(invalid)? {
                Promoted::Integer(l, r) => {
                    let result = match op {
                        BinaryOperator::Add => l.checked_add(r),
                        BinaryOperator::Subtract => l.checked_sub(r),
                        BinaryOperator::Multiply => l.checked_mul(r),
                        _ if r == 0 => return Err(EvaluationError::DivisionByZero),
                        _ => l.checked_div(r),
                    };
                    result.map(Value::Integer).ok_or(EvaluationError::Overflow)
                }
                Promoted::Floating(l, r) => Ok(Value::Floating(match op {
                    BinaryOperator::Add => l + r,
                    BinaryOperator::Subtract => l - r,
                    BinaryOperator::Multiply => l * r,
                    _ => l / r,
                })),
            },
            BinaryOperator::Modulus => match (left, right) {
                (Value::Integer(_), Value::Integer(0)) => Err(EvaluationError::DivisionByZero),
                (Value::Integer(l), Value::Integer(r)) => l
                    .checked_rem(r)
                    .map(Value::Integer)
                    .ok_or(EvaluationError::Overflow),
                _ => Err(invalid()),
            },
            BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessOrEqual
            | BinaryOperator::GreaterOrEqual => {
                let ordering = match promote(left, right).ok_or_else(invalid)? {
                    Promoted::Integer(l, r) => l.partial_cmp(&r),
                    Promoted::Floating(l, r) => l.partial_cmp(&r),
                };
                let result = match ordering {
                    Some(ordering) => match op {
                        BinaryOperator::Less => ordering.is_lt(),
                        BinaryOperator::Greater => ordering.is_gt(),
                        BinaryOperator::LessOrEqual => ordering.is_le(),
                        _ => ordering.is_ge(),
                    },
                    None => false,
                };
                Ok(Value::Boolean(result))
            }
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                let equal = match (left, right) {
                    (Value::Boolean(l), Value::Boolean(r)) => l == r,
                    _ => match promote(left, right).ok_or_else(invalid)? {
                        Promoted::Integer(l, r) => l == r,
                        Promoted::Floating(l, r) => l == r,
                    },
                };
                Ok(Value::Boolean(equal == (op == BinaryOperator::Equal)))
            }
            BinaryOperator::And | BinaryOperator::Or => match (left, right) {
                (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(match op {
                    BinaryOperator::And => l && r,
                    _ => l || r,
                })),
                _ => Err(invalid()),
            },
            BinaryOperator::BitwiseAnd
            | BinaryOperator::BitwiseOr
            | BinaryOperator::BitwiseXor
            | BinaryOperator::BitwiseLeftShift
            | BinaryOperator::BitwiseRightShift => match (left, right) {
                (Value::Integer(l), Value::Integer(r)) => {
                    let result = match op {
                        BinaryOperator::BitwiseAnd => Some(l & r),
                        BinaryOperator::BitwiseOr => Some(l | r),
                        BinaryOperator::BitwiseXor => Some(l ^ r),
                        BinaryOperator::BitwiseLeftShift => {
                            u32::try_from(r).ok().and_then(|r| l.checked_shl(r))
                        }
                        _ => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)),
                    };
                    result.map(Value::Integer).ok_or(EvaluationError::Overflow)
                }
                _ => Err(invalid()),
            },
            BinaryOperator::FieldAccess | BinaryOperator::ArrayAccess | BinaryOperator::Assign => {
                Err(invalid())
            }
        }
    }
}

enum Promoted {
    Integer(i64, i64),
    Floating(f64, f64),
}

/// Apply numeric promotion to a pair of values
fn promote(left: Value, right: Value) -> Option<Promoted> {
    match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(Promoted::Integer(l, r)),
        (Value::Integer(l), Value::Floating(r)) => Some(Promoted::Floating(l as f64, r)),
        (Value::Floating(l), Value::Integer(r)) => Some(Promoted::Floating(l, r as f64)),
        (Value::Floating(l), Value::Floating(r)) => Some(Promoted::Floating(l, r)),
        _ => None,
    }
}

fn evaluate_unary(op: UnaryOperator, value: Value) -> Result<Value, EvaluationError> {
    match (op, value) {
        (UnaryOperator::Negate, Value::Integer(v)) => v
            .checked_neg()
            .map(Value::Integer)
            .ok_or(EvaluationError::Overflow),
        (UnaryOperator::Negate, Value::Floating(v)) => Ok(Value::Floating(-v)),
        (UnaryOperator::Not, Value::Boolean(v)) => Ok(Value::Boolean(!v)),
        (UnaryOperator::BitwiseNot, Value::Integer(v)) => Ok(Value::Integer(!v)),
        _ => Err(EvaluationError::InvalidUnaryOperand(op)),
    }
}
