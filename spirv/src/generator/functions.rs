use super::errors::*;
use super::{FunctionVariant, Generator};
use rpl_ir as ir;
use rpl_ir::{ExpressionId, ExpressionKind, Stage};
use rspirv::spirv::{FunctionControl, LoopControl, SelectionControl, StorageClass, Word};
use std::collections::HashMap;

/// Every function starts with a block holding only its local variables
const VARIABLES_BLOCK: usize = 0;

/// Branch targets of the innermost loop
struct LoopTargets {
    merge: Word,
    continue_target: Word,

    /// Set when a break branches to the merge block
    broken: bool,
}

/// State of the function being emitted
pub(super) struct FunctionContext {
    pub function: ir::FunctionId,

    /// Stage the function runs in, picks between the sides of vertex stage outputs
    pub stage: Option<Stage>,

    /// `None` when no block is open, otherwise if the open block can be reached
    block: Option<bool>,

    locals: HashMap<ir::VariableId, Word>,
    loops: Vec<LoopTargets>,
}

impl FunctionContext {
    fn is_reachable(&self) -> bool {
        self.block == Some(true)
    }
}

impl Generator<'_> {
    pub(super) fn emit_function(
        &mut self,
        id: ir::FunctionId,
        variant: FunctionVariant,
    ) -> GenerateResult<()> {
        let instance = self.instance;
        let function = instance.get_function(id);

        let return_type = match function.return_type {
            Some(base) => self.base_type(base),
            None => self.types.void,
        };
        let argument_types = function
            .arguments
            .iter()
            .map(|v| self.type_ref_type(&instance.get_variable(*v).type_ref))
            .collect::<Vec<_>>();
        let function_type = self.function_type(return_type, argument_types.clone());

        let control = if !function.reads_globals() {
            FunctionControl::CONST
        } else if !function.writes_globals() {
            FunctionControl::PURE
        } else {
            FunctionControl::NONE
        };

        let spirv_id = variant.id;
        self.builder
            .begin_function(return_type, Some(spirv_id), control, function_type)?;
        self.debug_name(spirv_id, &function.name);

        let mut parameters = Vec::with_capacity(argument_types.len());
        for ty in &argument_types {
            parameters.push(self.builder.function_parameter(*ty)?);
        }

        let variables_label = self.builder.id();
        let code_label = self.builder.id();
        self.builder.begin_block(Some(variables_label))?;
        self.builder.select_block(None)?;
        self.builder.begin_block(Some(code_label))?;

        let mut cx = FunctionContext {
            function: id,
            stage: variant.stage,
            block: Some(true),
            locals: HashMap::new(),
            loops: Vec::new(),
        };

        // Arguments are copied into locals so they can be addressed like any variable
        for ((variable, parameter), ty) in function
            .arguments
            .iter()
            .zip(parameters)
            .zip(argument_types)
        {
            let local = self.declare_local(ty)?;
            self.debug_name(local, &instance.get_variable(*variable).name);
            self.builder.store(local, parameter, None, [])?;
            cx.locals.insert(*variable, local);
        }

        self.emit_statement(&mut cx, function.body)?;

        match cx.block {
            Some(true) if function.return_type.is_none() => self.builder.ret()?,
            Some(true) => {
                return Err(GeneratorError::MissingReturn(
                    function.name.clone(),
                    function.location,
                ))
            }
            Some(false) => self.builder.unreachable()?,
            None => {}
        }

        self.builder.select_block(Some(VARIABLES_BLOCK))?;
        self.builder.branch(code_label)?;
        self.builder.end_function()?;

        log::trace!(
            "emitted function {} as %{} for {:?} with {} locals",
            function.name,
            spirv_id,
            variant.stage,
            cx.locals.len()
        );
        Ok(())
    }

    /// Stages each function is emitted for, indexed by [ir::FunctionId]
    ///
    /// A function bound to a stage is emitted once for it. An unbound function that reads vertex
    /// stage outputs is emitted once for every stage whose entry points reach it, since each side
    /// reads different variables.
    pub(super) fn function_stages(&self) -> Vec<Vec<Option<Stage>>> {
        let instance = self.instance;

        let mut reached = vec![(false, false); instance.functions.len()];
        let mut pending = instance
            .entry_points
            .iter()
            .map(|entry_point| (entry_point.function, entry_point.stage))
            .collect::<Vec<_>>();
        while let Some((id, stage)) = pending.pop() {
            let (vertex, fragment) = &mut reached[id.0 as usize];
            let seen = match stage {
                Stage::Vertex => vertex,
                Stage::Fragment => fragment,
            };
            if *seen {
                continue;
            }
            *seen = true;
            let callees = &instance.get_function(id).callees;
            pending.extend(callees.iter().map(|callee| (*callee, stage)));
        }

        instance
            .functions
            .iter()
            .zip(reached)
            .map(|(function, (vertex, fragment))| {
                if function.required_stage.is_some() || !self.reads_vertex_outputs(function) {
                    return vec![function.required_stage];
                }
                let mut stages = Vec::new();
                if vertex {
                    stages.push(Some(Stage::Vertex));
                }
                if fragment {
                    stages.push(Some(Stage::Fragment));
                }
                if stages.is_empty() {
                    stages.push(None);
                }
                stages
            })
            .collect()
    }

    fn reads_vertex_outputs(&self, function: &ir::Function) -> bool {
        function.accesses.iter().any(|access| match access {
            ir::GlobalAccess::Buffer { id, .. } => {
                self.instance.get_buffer(*id).kind == ir::BufferKind::VertexStageOutput
            }
            _ => false,
        })
    }

    /// Id of the copy of a function to use from the given stage
    ///
    /// Falls back to the first copy when none was emitted for the stage.
    pub(super) fn function_variant(&self, id: ir::FunctionId, stage: Option<Stage>) -> Word {
        let variants = &self.function_variants[id.0 as usize];
        variants
            .iter()
            .find(|variant| variant.stage == stage)
            .unwrap_or(&variants[0])
            .id
    }

    /// Add a function local variable to the variables block
    pub(super) fn declare_local(&mut self, ty: Word) -> GenerateResult<Word> {
        let pointer = self.pointer_type(StorageClass::Function, ty);
        let current = self.builder.selected_block();
        self.builder.select_block(Some(VARIABLES_BLOCK))?;
        let variable = self
            .builder
            .variable(pointer, None, StorageClass::Function, None);
        self.builder.select_block(current)?;
        Ok(variable)
    }

    /// Get the local for a variable, declaring it on first use
    pub(super) fn local_variable(
        &mut self,
        cx: &mut FunctionContext,
        id: ir::VariableId,
    ) -> GenerateResult<Word> {
        if let Some(local) = cx.locals.get(&id) {
            return Ok(*local);
        }
        let variable = self.instance.get_variable(id);
        let ty = self.type_ref_type(&variable.type_ref);
        let local = self.declare_local(ty)?;
        self.debug_name(local, &variable.name);
        cx.locals.insert(id, local);
        Ok(local)
    }

    /// Terminate the open block with a branch
    ///
    /// Returns `true` if the target is reached from the block.
    fn close_block(&mut self, cx: &mut FunctionContext, target: Word) -> GenerateResult<bool> {
        let reached = match cx.block {
            Some(true) => {
                self.builder.branch(target)?;
                true
            }
            Some(false) => {
                self.builder.unreachable()?;
                false
            }
            None => false,
        };
        cx.block = None;
        Ok(reached)
    }

    fn open_block(
        &mut self,
        cx: &mut FunctionContext,
        label: Word,
        reachable: bool,
    ) -> GenerateResult<()> {
        self.builder.begin_block(Some(label))?;
        cx.block = Some(reachable);
        Ok(())
    }

    pub(super) fn emit_statement(
        &mut self,
        cx: &mut FunctionContext,
        id: ExpressionId,
    ) -> GenerateResult<()> {
        let instance = self.instance;
        let expression = instance.get_expression(id);

        if cx.block.is_none() {
            let name = instance.get_function(cx.function).name.clone();
            return Err(GeneratorError::CodeAfterTerminator(name, expression.location));
        }

        match &expression.kind {
            ExpressionKind::Scope { statements, .. } => {
                for statement in statements {
                    self.emit_statement(cx, *statement)?;
                }
            }
            ExpressionKind::VariableDeclaration(variable) => {
                self.local_variable(cx, *variable)?;
            }
            ExpressionKind::If {
                condition,
                true_branch,
                false_branch,
            } => self.emit_if(cx, *condition, *true_branch, *false_branch)?,
            ExpressionKind::For {
                init,
                condition,
                step,
                body,
            } => self.emit_loop(cx, *init, *condition, *step, *body)?,
            ExpressionKind::While { condition, body } => {
                self.emit_loop(cx, None, Some(*condition), None, *body)?
            }
            ExpressionKind::Break => {
                let reachable = cx.is_reachable();
                let merge = match cx.loops.last_mut() {
                    Some(targets) => {
                        targets.broken |= reachable;
                        targets.merge
                    }
                    None => {
                        return Err(GeneratorError::JumpOutsideLoop(
                            "break",
                            expression.location,
                        ))
                    }
                };
                self.close_block(cx, merge)?;
            }
            ExpressionKind::Continue => match cx.loops.last() {
                Some(targets) => {
                    let target = targets.continue_target;
                    self.close_block(cx, target)?;
                }
                None => {
                    return Err(GeneratorError::JumpOutsideLoop(
                        "continue",
                        expression.location,
                    ))
                }
            },
            ExpressionKind::Return(value) => {
                match value {
                    Some(value) => {
                        let value = self.emit_value(cx, *value)?;
                        self.builder.ret_value(value)?;
                    }
                    None => self.builder.ret()?,
                }
                cx.block = None;
            }
            _ => {
                self.emit_expression(cx, id)?;
            }
        }
        Ok(())
    }

    fn emit_if(
        &mut self,
        cx: &mut FunctionContext,
        condition: ExpressionId,
        true_branch: ExpressionId,
        false_branch: Option<ExpressionId>,
    ) -> GenerateResult<()> {
        let reachable = cx.is_reachable();
        let condition = self.emit_value(cx, condition)?;

        let true_label = self.builder.id();
        let merge_label = self.builder.id();
        let false_label = match false_branch {
            Some(_) => self.builder.id(),
            None => merge_label,
        };

        self.builder
            .selection_merge(merge_label, SelectionControl::NONE)?;
        self.builder
            .branch_conditional(condition, true_label, false_label, [])?;
        cx.block = None;

        self.open_block(cx, true_label, reachable)?;
        self.emit_statement(cx, true_branch)?;
        let mut merged = self.close_block(cx, merge_label)?;

        match false_branch {
            Some(false_branch) => {
                self.open_block(cx, false_label, reachable)?;
                self.emit_statement(cx, false_branch)?;
                merged |= self.close_block(cx, merge_label)?;
            }
            None => merged |= reachable,
        }

        self.open_block(cx, merge_label, merged)
    }

    /// Emit a structured loop
    ///
    /// The header tests the condition, the continue block runs the step and jumps back to the
    /// header.
    fn emit_loop(
        &mut self,
        cx: &mut FunctionContext,
        init: Option<ExpressionId>,
        condition: Option<ExpressionId>,
        step: Option<ExpressionId>,
        body: ExpressionId,
    ) -> GenerateResult<()> {
        if let Some(init) = init {
            self.emit_statement(cx, init)?;
        }

        let header_label = self.builder.id();
        let body_label = self.builder.id();
        let continue_label = self.builder.id();
        let merge_label = self.builder.id();

        let reachable = self.close_block(cx, header_label)?;
        self.open_block(cx, header_label, reachable)?;
        let condition = match condition {
            Some(condition) => Some(self.emit_value(cx, condition)?),
            None => None,
        };
        self.builder
            .loop_merge(merge_label, continue_label, LoopControl::NONE, [])?;
        match condition {
            Some(condition) => {
                self.builder
                    .branch_conditional(condition, body_label, merge_label, [])?
            }
            None => self.builder.branch(body_label)?,
        }
        cx.block = None;

        self.open_block(cx, body_label, reachable)?;
        cx.loops.push(LoopTargets {
            merge: merge_label,
            continue_target: continue_label,
            broken: false,
        });
        let body_result = self.emit_statement(cx, body);
        let targets = cx.loops.pop();
        body_result?;
        self.close_block(cx, continue_label)?;

        // The continue block must exist and branch back even when nothing reaches it
        self.open_block(cx, continue_label, true)?;
        if let Some(step) = step {
            self.emit_statement(cx, step)?;
        }
        self.close_block(cx, header_label)?;

        let broken = targets.map_or(false, |t| t.broken);
        self.open_block(cx, merge_label, reachable && (condition.is_some() || broken))
    }
}
