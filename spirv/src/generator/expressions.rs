use super::errors::*;
use super::functions::FunctionContext;
use super::globals::BufferVariables;
use super::Generator;
use rpl_ir as ir;
use rpl_ir::{
    AccessStep, BaseType, BinaryOperator, BuiltinOperation, ExpressionId, ExpressionKind,
    ItemType, MathFunction,
};
use rpl_text::SourceLocation;
use rspirv::dr::Operand;
use rspirv::spirv::{GLOp, StorageClass, Word};

/// A pointer to addressable storage
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) struct Place {
    pub pointer: Word,
    pub class: StorageClass,
}

fn step_index(step: &AccessStep) -> u32 {
    match step {
        AccessStep::Field(index) | AccessStep::Component(index) | AccessStep::Column(index) => {
            *index
        }
    }
}

impl Generator<'_> {
    /// Emit an expression that must produce a value
    pub(super) fn emit_value(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
    ) -> GenerateResult<Word> {
        match self.emit_expression(cx, id)? {
            Some(value) => Ok(value),
            None => Err(GeneratorError::InvalidInstance(
                "statement used as a value".to_string(),
                self.instance.get_expression(id).location,
            )),
        }
    }

    /// Emit an expression, returning its value if it has one
    pub(super) fn emit_expression(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
    ) -> GenerateResult<Option<Word>> {
        let instance = self.instance;
        let expression = instance.get_expression(id);
        let location = expression.location;

        let value = match &expression.kind {
            ExpressionKind::VariableReference(_)
            | ExpressionKind::VariableDeclaration(_)
            | ExpressionKind::FlattenedBufferAccess { .. }
            | ExpressionKind::StructuredFieldAccess { .. }
            | ExpressionKind::ArrayIndex { .. } => {
                let ty = self.expression_type(&expression.output, location)?;
                match self.emit_place(cx, id)? {
                    Some(place) => self.builder.load(ty, None, place.pointer, None, [])?,
                    None => self.emit_temporary_access(cx, id, ty)?,
                }
            }
            ExpressionKind::IntegerLiteral(value) => self.constant_int(*value as i32),
            ExpressionKind::FloatingLiteral(value) => self.constant_float(*value as f32),
            ExpressionKind::Binary(BinaryOperator::Assign, target, value) => {
                let place = self.place_or_error(cx, *target)?;
                let value = self.emit_value(cx, *value)?;
                self.builder.store(place.pointer, value, None, [])?;
                return Ok(None);
            }
            ExpressionKind::Binary(op, left, right) => {
                self.emit_binary(cx, *op, *left, *right, &expression.output, location)?
            }
            ExpressionKind::Unary(op, operand) => {
                self.emit_unary(cx, *op, *operand, &expression.output, location)?
            }
            ExpressionKind::FunctionCall {
                function,
                arguments,
            } => {
                let arguments = self.emit_arguments(cx, arguments)?;
                let return_type = self.expression_type(&expression.output, location)?;
                let callee = self.function_variant(*function, cx.stage);
                let result = self
                    .builder
                    .function_call(return_type, None, callee, arguments)?;
                if expression.output.is_void() {
                    return Ok(None);
                }
                result
            }
            ExpressionKind::BuiltinCall {
                function,
                arguments,
            } => return self.emit_builtin_call(cx, *function, arguments, location),
            ExpressionKind::SamplerCall {
                sampler,
                coordinate,
            } => self.emit_sampler_call(cx, *sampler, *coordinate, location)?,
            ExpressionKind::Constructor { target, arguments } => {
                self.emit_constructor(cx, *target, arguments)?
            }
            ExpressionKind::StructuredBufferReference(buffer) => {
                return Err(GeneratorError::InvalidInstance(
                    format!("buffer '{}' used as a value", instance.get_buffer(*buffer).name),
                    location,
                ))
            }
            ExpressionKind::Scope { .. }
            | ExpressionKind::If { .. }
            | ExpressionKind::For { .. }
            | ExpressionKind::While { .. }
            | ExpressionKind::Break
            | ExpressionKind::Continue
            | ExpressionKind::Return(_) => {
                self.emit_statement(cx, id)?;
                return Ok(None);
            }
        };
        Ok(Some(value))
    }

    fn emit_arguments(
        &mut self,
        cx: &mut FunctionContext,
        arguments: &[ExpressionId],
    ) -> GenerateResult<Vec<Word>> {
        arguments
            .iter()
            .map(|argument| self.emit_value(cx, *argument))
            .collect()
    }

    fn place_or_error(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
    ) -> GenerateResult<Place> {
        match self.emit_place(cx, id)? {
            Some(place) => Ok(place),
            None => Err(GeneratorError::InvalidInstance(
                "assignment to a temporary value".to_string(),
                self.instance.get_expression(id).location,
            )),
        }
    }

    /// Emit the address of an expression
    ///
    /// Returns `None` without emitting anything if the expression is not stored anywhere.
    pub(super) fn emit_place(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
    ) -> GenerateResult<Option<Place>> {
        let instance = self.instance;
        let expression = instance.get_expression(id);
        match &expression.kind {
            ExpressionKind::VariableReference(variable)
            | ExpressionKind::VariableDeclaration(variable) => Ok(Some(Place {
                pointer: self.local_variable(cx, *variable)?,
                class: StorageClass::Function,
            })),
            ExpressionKind::FlattenedBufferAccess {
                buffer,
                first_leaf,
                leaf_count: 1,
            } => self
                .leaf_place(*buffer, *first_leaf, cx, expression.location)
                .map(Some),
            ExpressionKind::StructuredFieldAccess { input, steps } => {
                self.emit_field_place(cx, id, *input, steps)
            }
            ExpressionKind::ArrayIndex { array, index } => {
                let base = match self.emit_place(cx, *array)? {
                    Some(place) => place,
                    None => self.spill(cx, *array)?,
                };
                let index = self.emit_value(cx, *index)?;
                let ty = self.expression_type(&expression.output, expression.location)?;
                let pointer_type = self.pointer_type(base.class, ty);
                let pointer = self
                    .builder
                    .access_chain(pointer_type, None, base.pointer, [index])?;
                Ok(Some(Place {
                    pointer,
                    class: base.class,
                }))
            }
            _ => Ok(None),
        }
    }

    fn leaf_place(
        &self,
        buffer: ir::BufferId,
        leaf: u32,
        cx: &FunctionContext,
        location: SourceLocation,
    ) -> GenerateResult<Place> {
        match self.leaf_variable(buffer, leaf, cx.stage) {
            Some((pointer, class)) => Ok(Place { pointer, class }),
            None => Err(GeneratorError::InvalidInstance(
                format!(
                    "no variable for leaf {} of buffer '{}'",
                    leaf,
                    self.instance.get_buffer(buffer).name
                ),
                location,
            )),
        }
    }

    fn emit_field_place(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
        input: ExpressionId,
        steps: &[AccessStep],
    ) -> GenerateResult<Option<Place>> {
        let instance = self.instance;
        let expression = instance.get_expression(id);
        let input_expression = instance.get_expression(input);

        let mut indexes = Vec::with_capacity(steps.len() + 2);
        let (base, steps) = match &input_expression.kind {
            ExpressionKind::StructuredBufferReference(buffer) => {
                match &self.buffers[buffer.0 as usize] {
                    BufferVariables::Block {
                        variable,
                        class,
                        instanced,
                    } => {
                        let base = Place {
                            pointer: *variable,
                            class: *class,
                        };
                        if *instanced {
                            let instance_index = self.load_instance_index(expression.location)?;
                            indexes.push(self.constant_int(0));
                            indexes.push(instance_index);
                        }
                        (base, steps)
                    }
                    _ => {
                        return Err(GeneratorError::InvalidInstance(
                            format!(
                                "buffer '{}' has no block variable",
                                instance.get_buffer(*buffer).name
                            ),
                            expression.location,
                        ))
                    }
                }
            }

            // Attribute matrices are stored as one variable per column
            ExpressionKind::FlattenedBufferAccess {
                buffer,
                first_leaf,
                leaf_count,
            } if *leaf_count > 1 => match steps.split_first() {
                Some((AccessStep::Column(column), rest)) => {
                    let base =
                        self.leaf_place(*buffer, first_leaf + column, cx, expression.location)?;
                    (base, rest)
                }
                _ => return Ok(None),
            },

            _ => match self.emit_place(cx, input)? {
                Some(base) => (base, steps),
                None => return Ok(None),
            },
        };

        for step in steps {
            indexes.push(self.constant_int(step_index(step) as i32));
        }
        if indexes.is_empty() {
            return Ok(Some(base));
        }

        let ty = self.expression_type(&expression.output, expression.location)?;
        let pointer_type = self.pointer_type(base.class, ty);
        let pointer = self
            .builder
            .access_chain(pointer_type, None, base.pointer, indexes)?;
        Ok(Some(Place {
            pointer,
            class: base.class,
        }))
    }

    fn load_instance_index(&mut self, location: SourceLocation) -> GenerateResult<Word> {
        match self.builtins.instance_index {
            Some(variable) => Ok(self
                .builder
                .load(self.types.int, None, variable, None, [])?),
            None => Err(GeneratorError::InvalidInstance(
                "instanced buffer accessed without the instance index".to_string(),
                location,
            )),
        }
    }

    /// Store a value in a new local so it can be indexed
    fn spill(&mut self, cx: &mut FunctionContext, id: ExpressionId) -> GenerateResult<Place> {
        let expression = self.instance.get_expression(id);
        let ty = self.expression_type(&expression.output, expression.location)?;
        let value = self.emit_value(cx, id)?;
        let local = self.declare_local(ty)?;
        self.builder.store(local, value, None, [])?;
        Ok(Place {
            pointer: local,
            class: StorageClass::Function,
        })
    }

    /// Emit an access on a value that has no place
    fn emit_temporary_access(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
        ty: Word,
    ) -> GenerateResult<Word> {
        let instance = self.instance;
        let expression = instance.get_expression(id);
        match &expression.kind {
            ExpressionKind::FlattenedBufferAccess {
                buffer,
                first_leaf,
                leaf_count,
            } => {
                let leaves = match &instance.get_buffer(*buffer).flattening {
                    Some(graph) => graph.get_leaves(*first_leaf, *leaf_count),
                    None => &[],
                };
                let mut columns = Vec::with_capacity(leaves.len());
                for (index, leaf) in leaves.iter().enumerate() {
                    let place = self.leaf_place(
                        *buffer,
                        first_leaf + index as u32,
                        cx,
                        expression.location,
                    )?;
                    let column_type = self.type_ref_type(&leaf.type_ref);
                    columns.push(
                        self.builder
                            .load(column_type, None, place.pointer, None, [])?,
                    );
                }
                Ok(self.builder.composite_construct(ty, None, columns)?)
            }
            ExpressionKind::StructuredFieldAccess { input, steps } => {
                let composite = self.emit_value(cx, *input)?;
                let indexes = steps.iter().map(step_index).collect::<Vec<_>>();
                Ok(self
                    .builder
                    .composite_extract(ty, None, composite, indexes)?)
            }
            _ => Err(GeneratorError::InvalidInstance(
                "value has no storage".to_string(),
                expression.location,
            )),
        }
    }

    fn emit_builtin_call(
        &mut self,
        cx: &mut FunctionContext,
        function: ir::BuiltinId,
        arguments: &[ExpressionId],
        location: SourceLocation,
    ) -> GenerateResult<Option<Word>> {
        let builtin = function.get();
        let values = self.emit_arguments(cx, arguments)?;
        let return_type = match builtin.return_type {
            Some(base) => self.base_type(base),
            None => self.types.void,
        };
        let item = match builtin.arguments.first() {
            Some(BaseType::Vector(id)) => id.get().item,
            _ => ItemType::Float,
        };

        let value = match (builtin.operation, values.as_slice()) {
            (BuiltinOperation::Math(math), _) => {
                let op = glsl_op(math, item);
                let operands = values.iter().map(|v| Operand::IdRef(*v)).collect::<Vec<_>>();
                self.builder
                    .ext_inst(return_type, None, self.glsl, op as u32, operands)?
            }
            (BuiltinOperation::Dot, [left, right]) => match builtin.arguments.first() {
                Some(BaseType::Vector(ir::F1)) => {
                    self.builder.f_mul(return_type, None, *left, *right)?
                }
                _ => self.builder.dot(return_type, None, *left, *right)?,
            },
            (BuiltinOperation::Transpose, [matrix]) => {
                self.builder.transpose(return_type, None, *matrix)?
            }
            (BuiltinOperation::IntToFloat, [value]) => {
                self.builder.convert_s_to_f(return_type, None, *value)?
            }
            (BuiltinOperation::FloatToInt, [value]) => {
                self.builder.convert_f_to_s(return_type, None, *value)?
            }
            (BuiltinOperation::WriteVertexPosition, [position]) => {
                match self.builtins.position {
                    Some(variable) => self.builder.store(variable, *position, None, [])?,
                    None => {
                        return Err(GeneratorError::InvalidInstance(
                            "vertex position written without a position output".to_string(),
                            location,
                        ))
                    }
                }
                return Ok(None);
            }
            _ => {
                return Err(GeneratorError::InvalidInstance(
                    format!("wrong argument count for '{}'", builtin.name),
                    location,
                ))
            }
        };
        Ok(Some(value))
    }

    fn emit_sampler_call(
        &mut self,
        cx: &mut FunctionContext,
        sampler: ir::SamplerId,
        coordinate: ExpressionId,
        location: SourceLocation,
    ) -> GenerateResult<Word> {
        let sampler_variable = match &self.samplers[sampler.0 as usize] {
            Some(sampler_variable) => *sampler_variable,
            None => {
                return Err(GeneratorError::InvalidInstance(
                    format!(
                        "sampler '{}' is not declared",
                        self.instance.get_sampler(sampler).name
                    ),
                    location,
                ))
            }
        };
        let coordinate = self.emit_value(cx, coordinate)?;
        let image = self.builder.load(
            sampler_variable.sampled_image_type,
            None,
            sampler_variable.variable,
            None,
            [],
        )?;
        let result_type = self.vector_type(ir::F4);
        Ok(self
            .builder
            .image_sample_implicit_lod(result_type, None, image, coordinate, None, [])?)
    }

    fn emit_constructor(
        &mut self,
        cx: &mut FunctionContext,
        target: BaseType,
        arguments: &[ExpressionId],
    ) -> GenerateResult<Word> {
        let values = self.emit_arguments(cx, arguments)?;
        let ty = self.base_type(target);

        if let BaseType::Vector(id) = target {
            let argument_types = arguments
                .iter()
                .map(|a| self.instance.get_expression(*a).output.as_vector())
                .collect::<Vec<_>>();
            match (values.as_slice(), argument_types.as_slice()) {
                // Conversion to the same type is the argument itself
                ([value], [Some(argument)]) if *argument == id => return Ok(*value),
                ([value], _) => return Ok(self.splat(id, *value)?),
                _ => {}
            }
        }

        Ok(self.builder.composite_construct(ty, None, values)?)
    }

    /// Broadcast a scalar to every component of a vector
    pub(super) fn splat(&mut self, id: ir::VectorId, scalar: Word) -> GenerateResult<Word> {
        let components = id.get().components;
        if components == 1 {
            return Ok(scalar);
        }
        let ty = self.vector_type(id);
        Ok(self
            .builder
            .composite_construct(ty, None, vec![scalar; components as usize])?)
    }
}

/// Pick the extended instruction for a math function
fn glsl_op(function: MathFunction, item: ItemType) -> GLOp {
    let int = item == ItemType::Int;
    match function {
        MathFunction::Sin => GLOp::Sin,
        MathFunction::Cos => GLOp::Cos,
        MathFunction::Tan => GLOp::Tan,
        MathFunction::Asin => GLOp::Asin,
        MathFunction::Acos => GLOp::Acos,
        MathFunction::Atan => GLOp::Atan,
        MathFunction::Atan2 => GLOp::Atan2,
        MathFunction::Sqrt => GLOp::Sqrt,
        MathFunction::InverseSqrt => GLOp::InverseSqrt,
        MathFunction::Pow => GLOp::Pow,
        MathFunction::Exp => GLOp::Exp,
        MathFunction::Log => GLOp::Log,
        MathFunction::Exp2 => GLOp::Exp2,
        MathFunction::Log2 => GLOp::Log2,
        MathFunction::Abs if int => GLOp::SAbs,
        MathFunction::Abs => GLOp::FAbs,
        MathFunction::Sign if int => GLOp::SSign,
        MathFunction::Sign => GLOp::FSign,
        MathFunction::Floor => GLOp::Floor,
        MathFunction::Ceil => GLOp::Ceil,
        MathFunction::Fract => GLOp::Fract,
        MathFunction::Round => GLOp::Round,
        MathFunction::Trunc => GLOp::Trunc,
        MathFunction::Min if int => GLOp::SMin,
        MathFunction::Min => GLOp::FMin,
        MathFunction::Max if int => GLOp::SMax,
        MathFunction::Max => GLOp::FMax,
        MathFunction::Clamp if int => GLOp::SClamp,
        MathFunction::Clamp => GLOp::FClamp,
        MathFunction::Mix => GLOp::FMix,
        MathFunction::Step => GLOp::Step,
        MathFunction::SmoothStep => GLOp::SmoothStep,
        MathFunction::Length => GLOp::Length,
        MathFunction::Distance => GLOp::Distance,
        MathFunction::Normalize => GLOp::Normalize,
        MathFunction::Reflect => GLOp::Reflect,
        MathFunction::Cross => GLOp::Cross,
        MathFunction::Determinant => GLOp::Determinant,
        MathFunction::Inverse => GLOp::MatrixInverse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_glsl_ops() {
        assert_eq!(glsl_op(MathFunction::Abs, ItemType::Int), GLOp::SAbs);
        assert_eq!(glsl_op(MathFunction::Abs, ItemType::Float), GLOp::FAbs);
        assert_eq!(glsl_op(MathFunction::Clamp, ItemType::Int), GLOp::SClamp);
        assert_eq!(glsl_op(MathFunction::Mix, ItemType::Float), GLOp::FMix);
        assert_eq!(glsl_op(MathFunction::Inverse, ItemType::Float), GLOp::MatrixInverse);
    }

    #[test]
    fn check_step_index() {
        assert_eq!(step_index(&AccessStep::Field(2)), 2);
        assert_eq!(step_index(&AccessStep::Column(3)), 3);
    }
}
