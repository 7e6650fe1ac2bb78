use super::errors::*;
use super::scopes::ResolveScope;
use super::Resolver;
use rpl_ast::ExpressionIndex;
use rpl_ir::{
    BinaryOperator, ExpressionId, ExpressionKind, ExpressionType, ItemType, MatrixId,
    UnaryOperator, VectorId,
};
use rpl_text::SourceLocation;

impl<'a> Resolver<'a> {
    pub(super) fn resolve_binary(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        op: BinaryOperator,
        left: ExpressionIndex,
        right: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let left = self.resolve_value(module, scope, left);
        let right = self.resolve_value(module, scope, right);
        let (left, right) = (left?, right?);

        let left_type = &self.instance.get_expression(left).output;
        let right_type = &self.instance.get_expression(right).output;
        match binary_output(op, left_type, right_type) {
            Some(output) => Ok(self.add_node(
                ExpressionKind::Binary(op, left, right),
                output,
                location,
            )),
            None => {
                let error = ResolverError::BinaryOperandTypes {
                    op,
                    left: self.instance.describe_type(left_type),
                    right: self.instance.describe_type(right_type),
                };
                Err(self.error(error, location))
            }
        }
    }

    pub(super) fn resolve_unary(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        op: UnaryOperator,
        operand: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let operand = self.resolve_value(module, scope, operand)?;
        let operand_type = &self.instance.get_expression(operand).output;
        match unary_output(op, operand_type) {
            Some(output) => Ok(self.add_node(
                ExpressionKind::Unary(op, operand),
                output,
                location,
            )),
            None => {
                let error = ResolverError::UnaryOperandType {
                    op,
                    operand: self.instance.describe_type(operand_type),
                };
                Err(self.error(error, location))
            }
        }
    }
}

/// Non-array operand shapes
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Operand {
    Boolean,
    Vector(VectorId),
    Matrix(MatrixId),
}

fn operand(ty: &ExpressionType) -> Option<Operand> {
    if ty.is_boolean() {
        Some(Operand::Boolean)
    } else if let Some(id) = ty.as_vector() {
        Some(Operand::Vector(id))
    } else {
        ty.as_matrix().map(Operand::Matrix)
    }
}

/// Result of a vector operation where a single component side is broadcast
fn broadcast(left: VectorId, right: VectorId) -> Option<VectorId> {
    let (l, r) = (left.get(), right.get());
    if l.item != r.item {
        None
    } else if left == right || r.components == 1 {
        Some(left)
    } else if l.components == 1 {
        Some(right)
    } else {
        None
    }
}

/// Get the type produced by a binary operator, `None` if the operands are invalid
pub(super) fn binary_output(
    op: BinaryOperator,
    left: &ExpressionType,
    right: &ExpressionType,
) -> Option<ExpressionType> {
    use Operand::*;

    let (left, right) = (operand(left)?, operand(right)?);
    let vector = |id: VectorId| Some(ExpressionType::vector(id));
    let matrix = |id: MatrixId| Some(ExpressionType::base(rpl_ir::BaseType::Matrix(id)));

    match op {
        BinaryOperator::And | BinaryOperator::Or => match (left, right) {
            (Boolean, Boolean) => Some(ExpressionType::BOOLEAN),
            _ => None,
        },
        BinaryOperator::Equal | BinaryOperator::NotEqual => match (left, right) {
            (Boolean, Boolean) => Some(ExpressionType::BOOLEAN),
            (Vector(l), Vector(r)) if l == r => Some(ExpressionType::BOOLEAN),
            _ => None,
        },
        BinaryOperator::Less
        | BinaryOperator::Greater
        | BinaryOperator::LessOrEqual
        | BinaryOperator::GreaterOrEqual => match (left, right) {
            (Vector(l), Vector(r)) if l == r && l.get().components == 1 => {
                Some(ExpressionType::BOOLEAN)
            }
            _ => None,
        },
        BinaryOperator::Add | BinaryOperator::Subtract => match (left, right) {
            (Vector(l), Vector(r)) => broadcast(l, r).and_then(vector),
            (Matrix(l), Matrix(r)) if l == r => matrix(l),
            _ => None,
        },
        BinaryOperator::Multiply => match (left, right) {
            (Vector(l), Vector(r)) => broadcast(l, r).and_then(vector),
            (Matrix(l), Matrix(r)) if l == r => matrix(l),
            (Matrix(m), Vector(v)) | (Vector(v), Matrix(m)) if v == m.get().column => vector(v),
            (Matrix(m), Vector(rpl_ir::F1)) | (Vector(rpl_ir::F1), Matrix(m)) => matrix(m),
            _ => None,
        },
        BinaryOperator::Divide => match (left, right) {
            (Vector(l), Vector(r)) => broadcast(l, r).and_then(vector),
            (Matrix(m), Vector(rpl_ir::F1)) => matrix(m),
            _ => None,
        },
        BinaryOperator::Modulus
        | BinaryOperator::BitwiseAnd
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::BitwiseLeftShift
        | BinaryOperator::BitwiseRightShift => match (left, right) {
            (Vector(l), Vector(r)) if l.get().item == ItemType::Int => {
                broadcast(l, r).and_then(vector)
            }
            _ => None,
        },
        BinaryOperator::FieldAccess | BinaryOperator::ArrayAccess | BinaryOperator::Assign => None,
    }
}

/// Get the type produced by a unary operator, `None` if the operand is invalid
pub(super) fn unary_output(
    op: UnaryOperator,
    operand_type: &ExpressionType,
) -> Option<ExpressionType> {
    let output = ExpressionType {
        writable: false,
        ..operand_type.clone()
    };
    match (op, operand(operand_type)?) {
        (UnaryOperator::Negate, Operand::Vector(_) | Operand::Matrix(_)) => Some(output),
        (UnaryOperator::Not, Operand::Boolean) => Some(output),
        (UnaryOperator::BitwiseNot, Operand::Vector(id)) if id.get().item == ItemType::Int => {
            Some(output)
        }
        _ => None,
    }
}
