use super::errors::*;
use super::functions::FunctionContext;
use super::Generator;
use rpl_ir as ir;
use rpl_ir::{BinaryOperator, ExpressionId, ExpressionType, ItemType, UnaryOperator};
use rpl_text::SourceLocation;
use rspirv::spirv::Word;

/// Shape of an operand
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum Shape {
    Boolean,
    Vector(ir::VectorId),
    Matrix(ir::MatrixId),
}

fn shape(ty: &ExpressionType) -> Option<Shape> {
    if ty.is_boolean() {
        Some(Shape::Boolean)
    } else if let Some(id) = ty.as_vector() {
        Some(Shape::Vector(id))
    } else {
        ty.as_matrix().map(Shape::Matrix)
    }
}

/// Right side of a matrix operation applied per column
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum ColumnOperand {
    /// Negate the left side, there is no right side
    Negate,

    /// Matching column of another matrix
    Matrix(Word),

    /// The same vector for every column
    Column(Word),
}

impl Generator<'_> {
    pub(super) fn emit_binary(
        &mut self,
        cx: &mut FunctionContext,
        op: BinaryOperator,
        left: ExpressionId,
        right: ExpressionId,
        output: &ExpressionType,
        location: SourceLocation,
    ) -> GenerateResult<Word> {
        let instance = self.instance;
        let left_shape = shape(&instance.get_expression(left).output);
        let right_shape = shape(&instance.get_expression(right).output);
        let output_shape = shape(output);

        // Both sides are evaluated, logical operators do not short circuit
        let l = self.emit_value(cx, left)?;
        let r = self.emit_value(cx, right)?;

        let invalid = || {
            GeneratorError::InvalidInstance(format!("invalid operands for '{}'", op), location)
        };

        match (left_shape, right_shape, output_shape) {
            (Some(Shape::Boolean), Some(Shape::Boolean), _) => {
                let ty = self.types.bool;
                Ok(match op {
                    BinaryOperator::And => self.builder.logical_and(ty, None, l, r)?,
                    BinaryOperator::Or => self.builder.logical_or(ty, None, l, r)?,
                    BinaryOperator::Equal => self.builder.logical_equal(ty, None, l, r)?,
                    BinaryOperator::NotEqual => self.builder.logical_not_equal(ty, None, l, r)?,
                    _ => return Err(invalid()),
                })
            }
            (Some(Shape::Vector(vector)), Some(Shape::Vector(_)), Some(Shape::Boolean)) => {
                self.emit_comparison(op, vector, l, r)?.ok_or_else(invalid)
            }
            (Some(Shape::Vector(lv)), Some(Shape::Vector(rv)), Some(Shape::Vector(out))) => {
                let l = if lv == out { l } else { self.splat(out, l)? };
                let r = if rv == out { r } else { self.splat(out, r)? };
                self.emit_arithmetic(op, out, l, r)?.ok_or_else(invalid)
            }
            (Some(Shape::Matrix(m)), Some(Shape::Matrix(_)), _) => {
                let ty = self.types.matrices[m.0 as usize];
                match op {
                    BinaryOperator::Add | BinaryOperator::Subtract => {
                        self.emit_per_column(m, op, l, ColumnOperand::Matrix(r))
                    }
                    BinaryOperator::Multiply => {
                        Ok(self.builder.matrix_times_matrix(ty, None, l, r)?)
                    }
                    _ => Err(invalid()),
                }
            }
            (Some(Shape::Matrix(m)), Some(Shape::Vector(ir::F1)), _) => {
                let ty = self.types.matrices[m.0 as usize];
                match op {
                    BinaryOperator::Multiply => {
                        Ok(self.builder.matrix_times_scalar(ty, None, l, r)?)
                    }
                    BinaryOperator::Divide => {
                        let column = self.splat(m.get().column, r)?;
                        self.emit_per_column(m, op, l, ColumnOperand::Column(column))
                    }
                    _ => Err(invalid()),
                }
            }
            (Some(Shape::Vector(ir::F1)), Some(Shape::Matrix(m)), _)
                if op == BinaryOperator::Multiply =>
            {
                let ty = self.types.matrices[m.0 as usize];
                Ok(self.builder.matrix_times_scalar(ty, None, r, l)?)
            }
            (Some(Shape::Matrix(_)), Some(Shape::Vector(v)), _)
                if op == BinaryOperator::Multiply =>
            {
                let ty = self.vector_type(v);
                Ok(self.builder.matrix_times_vector(ty, None, l, r)?)
            }
            (Some(Shape::Vector(v)), Some(Shape::Matrix(_)), _)
                if op == BinaryOperator::Multiply =>
            {
                let ty = self.vector_type(v);
                Ok(self.builder.vector_times_matrix(ty, None, l, r)?)
            }
            _ => Err(invalid()),
        }
    }

    /// Emit a comparison producing a single boolean
    ///
    /// Vector equality holds when every component is equal.
    fn emit_comparison(
        &mut self,
        op: BinaryOperator,
        vector: ir::VectorId,
        l: Word,
        r: Word,
    ) -> GenerateResult<Option<Word>> {
        let ty = self.bool_type_like(vector);
        let int = vector.get().item == ItemType::Int;
        let b = &mut self.builder;
        let value = match (op, int) {
            (BinaryOperator::Equal, true) => b.i_equal(ty, None, l, r)?,
            (BinaryOperator::Equal, false) => b.f_ord_equal(ty, None, l, r)?,
            (BinaryOperator::NotEqual, true) => b.i_not_equal(ty, None, l, r)?,
            (BinaryOperator::NotEqual, false) => b.f_unord_not_equal(ty, None, l, r)?,
            (BinaryOperator::Less, true) => b.s_less_than(ty, None, l, r)?,
            (BinaryOperator::Less, false) => b.f_ord_less_than(ty, None, l, r)?,
            (BinaryOperator::Greater, true) => b.s_greater_than(ty, None, l, r)?,
            (BinaryOperator::Greater, false) => b.f_ord_greater_than(ty, None, l, r)?,
            (BinaryOperator::LessOrEqual, true) => b.s_less_than_equal(ty, None, l, r)?,
            (BinaryOperator::LessOrEqual, false) => b.f_ord_less_than_equal(ty, None, l, r)?,
            (BinaryOperator::GreaterOrEqual, true) => b.s_greater_than_equal(ty, None, l, r)?,
            (BinaryOperator::GreaterOrEqual, false) => {
                b.f_ord_greater_than_equal(ty, None, l, r)?
            }
            _ => return Ok(None),
        };
        if vector.get().components == 1 {
            return Ok(Some(value));
        }

        let bool_type = self.types.bool;
        let reduced = match op {
            BinaryOperator::NotEqual => self.builder.any(bool_type, None, value)?,
            _ => self.builder.all(bool_type, None, value)?,
        };
        Ok(Some(reduced))
    }

    /// Emit a component-wise operator on two vectors of the same type
    fn emit_arithmetic(
        &mut self,
        op: BinaryOperator,
        vector: ir::VectorId,
        l: Word,
        r: Word,
    ) -> GenerateResult<Option<Word>> {
        let ty = self.vector_type(vector);
        let b = &mut self.builder;
        let value = match (op, vector.get().item) {
            (BinaryOperator::Add, ItemType::Float) => b.f_add(ty, None, l, r)?,
            (BinaryOperator::Add, ItemType::Int) => b.i_add(ty, None, l, r)?,
            (BinaryOperator::Subtract, ItemType::Float) => b.f_sub(ty, None, l, r)?,
            (BinaryOperator::Subtract, ItemType::Int) => b.i_sub(ty, None, l, r)?,
            (BinaryOperator::Multiply, ItemType::Float) => b.f_mul(ty, None, l, r)?,
            (BinaryOperator::Multiply, ItemType::Int) => b.i_mul(ty, None, l, r)?,
            (BinaryOperator::Divide, ItemType::Float) => b.f_div(ty, None, l, r)?,
            (BinaryOperator::Divide, ItemType::Int) => b.s_div(ty, None, l, r)?,
            (BinaryOperator::Modulus, ItemType::Int) => b.s_rem(ty, None, l, r)?,
            (BinaryOperator::BitwiseAnd, ItemType::Int) => b.bitwise_and(ty, None, l, r)?,
            (BinaryOperator::BitwiseOr, ItemType::Int) => b.bitwise_or(ty, None, l, r)?,
            (BinaryOperator::BitwiseXor, ItemType::Int) => b.bitwise_xor(ty, None, l, r)?,
            (BinaryOperator::BitwiseLeftShift, ItemType::Int) => {
                b.shift_left_logical(ty, None, l, r)?
            }
            (BinaryOperator::BitwiseRightShift, ItemType::Int) => {
                b.shift_right_arithmetic(ty, None, l, r)?
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Apply a float vector operator to every column of a matrix
    ///
    /// `op` is ignored when negating.
    fn emit_per_column(
        &mut self,
        matrix: ir::MatrixId,
        op: BinaryOperator,
        l: Word,
        r: ColumnOperand,
    ) -> GenerateResult<Word> {
        let info = matrix.get();
        let column_type = self.vector_type(info.column);

        let mut columns = Vec::with_capacity(info.columns as usize);
        for index in 0..info.columns {
            let lc = self
                .builder
                .composite_extract(column_type, None, l, [index])?;
            let rc = match r {
                ColumnOperand::Negate => {
                    columns.push(self.builder.f_negate(column_type, None, lc)?);
                    continue;
                }
                ColumnOperand::Matrix(r) => {
                    self.builder
                        .composite_extract(column_type, None, r, [index])?
                }
                ColumnOperand::Column(r) => r,
            };
            let column = match op {
                BinaryOperator::Add => self.builder.f_add(column_type, None, lc, rc)?,
                BinaryOperator::Subtract => self.builder.f_sub(column_type, None, lc, rc)?,
                _ => self.builder.f_div(column_type, None, lc, rc)?,
            };
            columns.push(column);
        }

        let ty = self.types.matrices[matrix.0 as usize];
        Ok(self.builder.composite_construct(ty, None, columns)?)
    }

    pub(super) fn emit_unary(
        &mut self,
        cx: &mut FunctionContext,
        op: UnaryOperator,
        operand: ExpressionId,
        output: &ExpressionType,
        location: SourceLocation,
    ) -> GenerateResult<Word> {
        let value = self.emit_value(cx, operand)?;
        match (op, shape(output)) {
            (UnaryOperator::Negate, Some(Shape::Vector(id))) => {
                let ty = self.vector_type(id);
                Ok(match id.get().item {
                    ItemType::Float => self.builder.f_negate(ty, None, value)?,
                    ItemType::Int => self.builder.s_negate(ty, None, value)?,
                })
            }
            (UnaryOperator::Negate, Some(Shape::Matrix(id))) => {
                self.emit_per_column(id, BinaryOperator::Subtract, value, ColumnOperand::Negate)
            }
            (UnaryOperator::Not, Some(Shape::Boolean)) => {
                let ty = self.types.bool;
                Ok(self.builder.logical_not(ty, None, value)?)
            }
            (UnaryOperator::BitwiseNot, Some(Shape::Vector(id))) => {
                let ty = self.vector_type(id);
                Ok(self.builder.not(ty, None, value)?)
            }
            _ => Err(GeneratorError::InvalidInstance(
                format!("invalid operand for '{}'", op),
                location,
            )),
        }
    }
}
