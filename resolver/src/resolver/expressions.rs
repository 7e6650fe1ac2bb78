use super::errors::*;
use super::functions::{Callee, Flow};
use super::scopes::{Alias, AliasState, ResolveScope, ScopeEntry};
use super::Resolver;
use bumpalo::collections::Vec as BumpVec;
use rpl_ast as ast;
use rpl_ast::{BinaryOperator, ExpressionIndex, ExpressionList};
use rpl_ir as ir;
use rpl_ir::{AccessStep, BaseType, ExpressionId, ExpressionKind, ExpressionType, OutputKind};
use rpl_text::SourceLocation;
use std::cell::Cell;

impl<'a> Resolver<'a> {
    /// Add a resolved node to the instance
    pub(super) fn add_node(
        &mut self,
        kind: ExpressionKind,
        output: ExpressionType,
        location: SourceLocation,
    ) -> ExpressionId {
        self.instance.add_expression(ir::Expression {
            kind,
            output,
            location,
        })
    }

    fn get_ast_expression(
        &mut self,
        module: usize,
        index: ExpressionIndex,
    ) -> ResolveResult<&'a ast::Expression> {
        let modules = self.modules;
        match modules[module].get_expression(index) {
            Some(expression) => Ok(expression),
            None => Err(self.error(
                crate::EvaluationError::MissingExpression,
                self.location(module, 0),
            )),
        }
    }

    fn get_ast_list(
        &mut self,
        module: usize,
        list: ExpressionList,
        line: u32,
    ) -> ResolveResult<&'a [ExpressionIndex]> {
        let modules = self.modules;
        match modules[module].get_expression_list(list) {
            Some(list) => Ok(list),
            None => Err(self.error(
                crate::EvaluationError::MissingExpression,
                self.location(module, line),
            )),
        }
    }

    /// Resolve a statement or list of statements inside a new scope
    pub(super) fn resolve_block(
        &mut self,
        module: usize,
        parent: &'a ResolveScope<'a>,
        index: ExpressionIndex,
        is_loop: bool,
    ) -> ResolveResult<(ExpressionId, Flow)> {
        let scope = ResolveScope::new_in(self.arena, Some(parent), is_loop);
        let expression = self.get_ast_expression(module, index)?;
        let location = self.location(module, expression.line);

        let (statements, flow) = match &expression.kind {
            ast::ExpressionKind::Scope(list) => {
                let list = self.get_ast_list(module, *list, expression.line)?;
                self.resolve_statements(module, scope, list)?
            }
            _ => match self.resolve_statement(module, scope, index)? {
                Some((id, flow)) => (vec![id], flow),
                None => (Vec::new(), Flow::Continues),
            },
        };

        let variables = scope.variables.borrow().iter().map(|(_, id)| *id).collect();
        let id = self.add_node(
            ExpressionKind::Scope {
                statements,
                variables,
            },
            ExpressionType::VOID,
            location,
        );
        Ok((id, flow))
    }

    /// Resolve statements in order, continuing after failures
    fn resolve_statements(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        list: &'a [ExpressionIndex],
    ) -> ResolveResult<(Vec<ExpressionId>, Flow)> {
        let mut statements = Vec::with_capacity(list.len());
        let mut flow = Flow::Continues;
        let mut reported_unreachable = false;
        let mut failed = false;
        for index in list {
            if flow != Flow::Continues && !reported_unreachable {
                let line = self.modules[module]
                    .get_expression(*index)
                    .map_or(0, |e| e.line);
                self.error(ResolverError::UnreachableStatement, self.location(module, line));
                reported_unreachable = true;
                failed = true;
            }
            match self.resolve_statement(module, scope, *index) {
                Ok(Some((id, statement_flow))) => {
                    statements.push(id);
                    if flow == Flow::Continues {
                        flow = statement_flow;
                    }
                }
                Ok(None) => {}
                Err(Failed) => failed = true,
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok((statements, flow))
        }
    }

    /// Resolve a single statement
    ///
    /// Returns `None` for statements that do not produce code.
    fn resolve_statement(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        index: ExpressionIndex,
    ) -> ResolveResult<Option<(ExpressionId, Flow)>> {
        let expression = self.get_ast_expression(module, index)?;
        let line = expression.line;
        let location = self.location(module, line);

        let resolved = match &expression.kind {
            ast::ExpressionKind::Nope => return Ok(None),
            ast::ExpressionKind::Scope(_) => self.resolve_block(module, scope, index, false)?,
            ast::ExpressionKind::ConditionalScope { condition, body } => {
                if !self.is_active(module, Some(*condition), false, line)? {
                    return Ok(None);
                }
                self.resolve_block(module, scope, *body, false)?
            }
            ast::ExpressionKind::ConditionalAlias {
                name,
                condition,
                expression,
            } => {
                if self.is_active(module, *condition, false, line)? {
                    self.declare_alias(scope, name, *expression, location)?;
                }
                return Ok(None);
            }
            ast::ExpressionKind::VariableDeclaration(declaration) => {
                if !self.is_active(module, declaration.conditional, false, line)? {
                    return Ok(None);
                }
                let id = self.declare_variable(module, scope, declaration, location)?;
                (id, Flow::Continues)
            }
            ast::ExpressionKind::If {
                condition,
                true_branch,
                false_branch,
            } => self.resolve_if(module, scope, *condition, *true_branch, *false_branch, location)?,
            ast::ExpressionKind::For {
                init,
                condition,
                step,
                body,
            } => self.resolve_for(module, scope, *init, *condition, *step, *body, location)?,
            ast::ExpressionKind::While { condition, body } => {
                let condition = self.resolve_condition(module, scope, *condition);
                let body = self.resolve_block(module, scope, *body, true);
                let (condition, (body, _)) = (condition?, body?);
                let id = self.add_node(
                    ExpressionKind::While { condition, body },
                    ExpressionType::VOID,
                    location,
                );
                (id, Flow::Continues)
            }
            ast::ExpressionKind::Break => {
                if !scope.in_loop() {
                    return Err(self.error(ResolverError::BreakOutsideLoop, location));
                }
                let id = self.add_node(ExpressionKind::Break, ExpressionType::VOID, location);
                (id, Flow::Jumps)
            }
            ast::ExpressionKind::Continue => {
                if !scope.in_loop() {
                    return Err(self.error(ResolverError::ContinueOutsideLoop, location));
                }
                let id = self.add_node(ExpressionKind::Continue, ExpressionType::VOID, location);
                (id, Flow::Jumps)
            }
            ast::ExpressionKind::Return(value) => {
                let id = self.resolve_return(module, scope, *value, location)?;
                (id, Flow::Returns)
            }
            _ => {
                let id = self.resolve_expression(module, scope, index)?;
                if let OutputKind::Buffer(buffer) = self.instance.get_expression(id).output.kind {
                    let name = self.instance.get_buffer(buffer).name.clone();
                    return Err(self.error(ResolverError::BufferUsedAsValue(name), location));
                }
                (id, Flow::Continues)
            }
        };
        Ok(Some(resolved))
    }

    fn resolve_if(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        condition: ExpressionIndex,
        true_branch: ExpressionIndex,
        false_branch: Option<ExpressionIndex>,
        location: SourceLocation,
    ) -> ResolveResult<(ExpressionId, Flow)> {
        let condition = self.resolve_condition(module, scope, condition);
        let true_branch = self.resolve_block(module, scope, true_branch, false);
        let false_branch = match false_branch {
            Some(index) => self.resolve_block(module, scope, index, false).map(Some),
            None => Ok(None),
        };
        let (condition, (true_branch, true_flow), false_branch) =
            (condition?, true_branch?, false_branch?);

        let flow = match false_branch {
            Some((_, false_flow)) => match (true_flow, false_flow) {
                (Flow::Returns, Flow::Returns) => Flow::Returns,
                (Flow::Continues, _) | (_, Flow::Continues) => Flow::Continues,
                _ => Flow::Jumps,
            },
            None => Flow::Continues,
        };

        let id = self.add_node(
            ExpressionKind::If {
                condition,
                true_branch,
                false_branch: false_branch.map(|(id, _)| id),
            },
            ExpressionType::VOID,
            location,
        );
        Ok((id, flow))
    }

    /// Resolve a for loop inside a wrapper scope that owns the init variables
    #[allow(clippy::too_many_arguments)]
    fn resolve_for(
        &mut self,
        module: usize,
        parent: &'a ResolveScope<'a>,
        init: ExpressionIndex,
        condition: ExpressionIndex,
        step: ExpressionIndex,
        body: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<(ExpressionId, Flow)> {
        let scope = ResolveScope::new_in(self.arena, Some(parent), false);

        let init = self
            .resolve_statement(module, scope, init)
            .map(|s| s.map(|(id, _)| id));
        let condition = if self.is_nope(module, condition) {
            Ok(None)
        } else {
            self.resolve_condition(module, scope, condition).map(Some)
        };
        let step = if self.is_nope(module, step) {
            Ok(None)
        } else {
            self.resolve_expression(module, scope, step).map(Some)
        };
        let body = self.resolve_block(module, scope, body, true);
        let (init, condition, step, (body, _)) = (init?, condition?, step?, body?);

        let for_id = self.add_node(
            ExpressionKind::For {
                init,
                condition,
                step,
                body,
            },
            ExpressionType::VOID,
            location,
        );

        let variables = scope.variables.borrow().iter().map(|(_, id)| *id).collect();
        let id = self.add_node(
            ExpressionKind::Scope {
                statements: vec![for_id],
                variables,
            },
            ExpressionType::VOID,
            location,
        );
        Ok((id, Flow::Continues))
    }

    fn is_nope(&self, module: usize, index: ExpressionIndex) -> bool {
        matches!(
            self.modules[module].get_expression(index),
            Some(ast::Expression {
                kind: ast::ExpressionKind::Nope,
                ..
            })
        )
    }

    fn resolve_return(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        value: Option<ExpressionIndex>,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let (name, return_type) = match self.function_stack.last() {
            Some(context) => (context.name.clone(), context.return_type),
            None => return Err(Failed),
        };

        let value = match (value, return_type) {
            (Some(_), None) => {
                return Err(self.error(ResolverError::ReturnValueInVoidFunction(name), location))
            }
            (None, Some(_)) => {
                return Err(self.error(ResolverError::MissingReturnValue(name), location))
            }
            (None, None) => None,
            (Some(index), Some(expected)) => {
                let id = self.resolve_value(module, scope, index)?;
                let output = &self.instance.get_expression(id).output;
                if output.is_boolean() || !output.array_sizes.is_empty() {
                    return Err(self.error(ResolverError::InvalidReturnType(name), location));
                }
                if output.as_base() != Some(expected) {
                    let error = ResolverError::WrongReturnType {
                        name,
                        expected: self.instance.get_type_name(expected).to_string(),
                        found: self.instance.describe_type(output),
                    };
                    return Err(self.error(error, location));
                }
                Some(id)
            }
        };

        Ok(self.add_node(ExpressionKind::Return(value), ExpressionType::VOID, location))
    }

    /// Resolve a loop or branch condition which must be a boolean
    fn resolve_condition(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        index: ExpressionIndex,
    ) -> ResolveResult<ExpressionId> {
        let id = self.resolve_value(module, scope, index)?;
        let expression = self.instance.get_expression(id);
        if expression.output.is_boolean() {
            Ok(id)
        } else {
            let found = self.instance.describe_type(&expression.output);
            let location = expression.location;
            Err(self.error(ResolverError::ConditionNotBoolean(found), location))
        }
    }

    /// Resolve an expression that must produce a boolean or value type
    pub(super) fn resolve_value(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        index: ExpressionIndex,
    ) -> ResolveResult<ExpressionId> {
        let id = self.resolve_expression(module, scope, index)?;
        let expression = self.instance.get_expression(id);
        let location = expression.location;
        match expression.output.kind {
            OutputKind::Base(_) | OutputKind::Boolean => Ok(id),
            OutputKind::Void => {
                let error = ResolverError::NotAValue("statement".to_string());
                Err(self.error(error, location))
            }
            OutputKind::Buffer(buffer) => {
                let name = self.instance.get_buffer(buffer).name.clone();
                Err(self.error(ResolverError::BufferUsedAsValue(name), location))
            }
        }
    }

    /// Resolve an expression
    pub(super) fn resolve_expression(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        index: ExpressionIndex,
    ) -> ResolveResult<ExpressionId> {
        let expression = self.get_ast_expression(module, index)?;
        let line = expression.line;
        let location = self.location(module, line);

        match &expression.kind {
            ast::ExpressionKind::Identifier(name) => {
                self.resolve_identifier(module, scope, name, location)
            }
            ast::ExpressionKind::IntegerLiteral(value) => {
                if i32::try_from(*value).is_err() {
                    return Err(self.error(ResolverError::IntegerOutOfRange(*value), location));
                }
                Ok(self.add_node(
                    ExpressionKind::IntegerLiteral(*value),
                    ExpressionType::vector(ir::I1),
                    location,
                ))
            }
            ast::ExpressionKind::FloatingLiteral(value) => Ok(self.add_node(
                ExpressionKind::FloatingLiteral(*value),
                ExpressionType::vector(ir::F1),
                location,
            )),
            ast::ExpressionKind::VariableDeclaration(declaration) => {
                self.declare_variable(module, scope, declaration, location)
            }
            ast::ExpressionKind::BinaryOperation(BinaryOperator::FieldAccess, left, right) => {
                self.resolve_field_access(module, scope, *left, *right, location)
            }
            ast::ExpressionKind::BinaryOperation(BinaryOperator::ArrayAccess, left, right) => {
                self.resolve_array_index(module, scope, *left, *right, location)
            }
            ast::ExpressionKind::BinaryOperation(BinaryOperator::Assign, left, right) => {
                self.resolve_assign(module, scope, *left, *right, location)
            }
            ast::ExpressionKind::BinaryOperation(op, left, right) => {
                self.resolve_binary(module, scope, *op, *left, *right, location)
            }
            ast::ExpressionKind::UnaryOperation(op, operand) => {
                self.resolve_unary(module, scope, *op, *operand, location)
            }
            ast::ExpressionKind::FunctionCall(name, arguments) => {
                self.resolve_call(module, scope, name, *arguments, location)
            }
            ast::ExpressionKind::Constructor(type_name, arguments) => {
                self.resolve_constructor(module, scope, type_name, *arguments, location)
            }
            ast::ExpressionKind::ConditionalScope { .. }
            | ast::ExpressionKind::ConditionalAlias { .. } => {
                Err(self.error(ResolverError::ConditionalOutsideStatement, location))
            }
            ast::ExpressionKind::Nope => {
                let error = ResolverError::NotAValue("empty expression".to_string());
                Err(self.error(error, location))
            }
            ast::ExpressionKind::Scope(_)
            | ast::ExpressionKind::If { .. }
            | ast::ExpressionKind::For { .. }
            | ast::ExpressionKind::While { .. }
            | ast::ExpressionKind::Break
            | ast::ExpressionKind::Continue
            | ast::ExpressionKind::Return(_) => {
                let error = ResolverError::NotAValue("statement".to_string());
                Err(self.error(error, location))
            }
        }
    }

    /// Register an alias in a scope without resolving its expression
    fn declare_alias(
        &mut self,
        scope: &'a ResolveScope<'a>,
        name: &'a str,
        expression: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<()> {
        if scope.declares(name) {
            let error = ResolverError::VariableAlreadyDeclared(name.to_string());
            return Err(self.error(error, location));
        }
        self.check_local_name(name, location)?;

        let alias = self.arena.alloc(Alias {
            name,
            expression,
            state: Cell::new(AliasState::Pending),
        });
        scope.aliases.borrow_mut().push(alias);
        Ok(())
    }

    /// Check that a local name does not hide a buffer or option
    fn check_local_name(&mut self, name: &str, location: SourceLocation) -> ResolveResult<()> {
        let existing = if self.instance.find_buffer(name).is_some() {
            Some("buffer")
        } else if self.options.iter().any(|o| o.name == name) {
            Some("option")
        } else {
            None
        };
        match existing {
            Some(existing) => Err(self.error(
                ResolverError::NameConflict {
                    name: name.to_string(),
                    existing,
                },
                location,
            )),
            None => Ok(()),
        }
    }

    fn declare_variable(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        declaration: &'a ast::Declaration,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let name = declaration.name.as_str();
        if scope.declares(name) {
            let error = ResolverError::VariableAlreadyDeclared(name.to_string());
            return Err(self.error(error, location));
        }
        self.check_local_name(name, location)?;

        let type_ref = self.resolve_type(
            module,
            &declaration.type_name,
            declaration.array_sizes,
            declaration.line,
        )?;
        let output = ExpressionType::value(&type_ref).with_writable(true);

        let id = self.instance.add_variable(ir::Variable {
            name: name.to_string(),
            type_ref,
            writable: true,
            location,
        });
        scope.variables.borrow_mut().push((name, id));

        Ok(self.add_node(ExpressionKind::VariableDeclaration(id), output, location))
    }

    /// Resolve a name used as a value
    fn resolve_identifier(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        name: &str,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        if let Some(buffer) = self.instance.find_buffer(name) {
            self.use_buffer(buffer);
            return Err(self.error(ResolverError::BufferUsedAsValue(name.to_string()), location));
        }

        match scope.find(name) {
            Some(ScopeEntry::Variable(id)) => {
                let variable = self.instance.get_variable(id);
                let output =
                    ExpressionType::value(&variable.type_ref).with_writable(variable.writable);
                return Ok(self.add_node(ExpressionKind::VariableReference(id), output, location));
            }
            Some(ScopeEntry::Alias(declaring_scope, alias)) => {
                return self.resolve_alias(module, declaring_scope, alias, location);
            }
            None => {}
        }

        if let Some(option) = self.options.iter().find(|o| o.name == name) {
            let error = match (option.scope, option.value) {
                (_, ast::OptionValue::Flag(_)) => {
                    ResolverError::FlagOptionInExpression(name.to_string())
                }
                (ast::OptionScope::Instance, _) => {
                    ResolverError::InstanceOptionInExpression(name.to_string())
                }
                (ast::OptionScope::Global, ast::OptionValue::Count(value)) => {
                    return match i32::try_from(value) {
                        Ok(value) => Ok(self.add_node(
                            ExpressionKind::IntegerLiteral(value as i64),
                            ExpressionType::vector(ir::I1),
                            location,
                        )),
                        Err(_) => Err(self.error(
                            ResolverError::IntegerOutOfRange(value.min(i64::MAX as u64) as i64),
                            location,
                        )),
                    };
                }
            };
            return Err(self.error(error, location));
        }

        if self.instance.find_sampler(name).is_some() {
            return Err(self.error(ResolverError::NotAValue(name.to_string()), location));
        }

        Err(self.error(ResolverError::UnknownIdentifier(name.to_string()), location))
    }

    /// Resolve an alias in the scope it was declared in
    fn resolve_alias(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        alias: &'a Alias<'a>,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        match alias.state.get() {
            AliasState::Resolved(id) => Ok(id),
            AliasState::Failed => Err(Failed),
            AliasState::Resolving => {
                let error = ResolverError::RecursiveAlias(alias.name.to_string());
                Err(self.error(error, location))
            }
            AliasState::Pending => {
                alias.state.set(AliasState::Resolving);
                let result = self.resolve_expression(module, scope, alias.expression);
                alias.state.set(match result {
                    Ok(id) => AliasState::Resolved(id),
                    Err(Failed) => AliasState::Failed,
                });
                result
            }
        }
    }

    /// Record a read of a buffer on the function being resolved
    fn use_buffer(&mut self, id: ir::BufferId) {
        let buffer = &mut self.instance.buffers[id.0 as usize];
        buffer.used = true;
        let instanced = buffer.kind.is_instanced();
        self.add_access(ir::GlobalAccess::Buffer { id, write: false });
        if instanced {
            self.add_access(ir::GlobalAccess::Intrinsic(
                ir::IntrinsicAccess::InstanceIndex,
            ));
        }
    }

    /// Resolve a chain of field accesses
    fn resolve_field_access(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        left: ExpressionIndex,
        right: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let modules = self.modules;
        let ast_module: &'a ast::Module = modules[module];

        // Collect the member names from the outermost access inwards
        let mut names = BumpVec::<&'a str>::new_in(self.arena);
        let mut root = left;
        let mut member = right;
        loop {
            match ast_module.get_expression(member).map(|e| &e.kind) {
                Some(ast::ExpressionKind::Identifier(name)) => names.push(name.as_str()),
                _ => {
                    let error = ResolverError::NotAValue("member access".to_string());
                    return Err(self.error(error, location));
                }
            }
            match ast_module.get_expression(root).map(|e| &e.kind) {
                Some(ast::ExpressionKind::BinaryOperation(BinaryOperator::FieldAccess, l, r)) => {
                    root = *l;
                    member = *r;
                }
                _ => break,
            }
        }
        names.reverse();

        let buffer = match ast_module.get_expression(root).map(|e| &e.kind) {
            Some(ast::ExpressionKind::Identifier(name)) => self.instance.find_buffer(name),
            _ => None,
        };

        let (input, output, remaining) = match buffer {
            Some(buffer) => self.resolve_buffer_root(buffer, &names, location)?,
            None => {
                let input = self.resolve_value(module, scope, root)?;
                let output = self.instance.get_expression(input).output.clone();
                (input, output, &names[..])
            }
        };

        self.resolve_member_steps(input, output, Vec::new(), remaining, location)
    }

    /// Start a member chain on a buffer
    ///
    /// Returns the first node, its type, and the names that are left to resolve.
    fn resolve_buffer_root<'n>(
        &mut self,
        id: ir::BufferId,
        names: &'n [&'a str],
        location: SourceLocation,
    ) -> ResolveResult<(ExpressionId, ExpressionType, &'n [&'a str])> {
        self.use_buffer(id);
        let buffer = self.instance.get_buffer(id);

        if let Some(graph) = &buffer.flattening {
            let walked = graph.walk(names.iter().copied());
            let (node, consumed) = match walked {
                Ok(walked) => walked,
                Err(ir::FlatteningWalkError::UnknownField(member)) => {
                    let error = ResolverError::UnknownMember {
                        ty: buffer.name.clone(),
                        member,
                    };
                    return Err(self.error(error, location));
                }
                Err(_) => {
                    let error = ResolverError::FlattenedPathIncomplete {
                        buffer: buffer.name.clone(),
                        path: names.join("."),
                    };
                    return Err(self.error(error, location));
                }
            };
            let (type_ref, first, count) = match &node.kind {
                ir::FlatteningNodeKind::Leaf {
                    type_ref,
                    first,
                    count,
                } => (type_ref.clone(), *first, *count),
                ir::FlatteningNodeKind::Struct(_) => return Err(Failed),
            };
            let output =
                ExpressionType::value(&type_ref).with_writable(buffer.kind.is_stage_output());
            let access = self.add_node(
                ExpressionKind::FlattenedBufferAccess {
                    buffer: id,
                    first_leaf: first,
                    leaf_count: count,
                },
                output.clone(),
                location,
            );
            return Ok((access, output, &names[consumed..]));
        }

        let (first, rest) = match names.split_first() {
            Some(split) => split,
            None => return Err(Failed),
        };
        let field = match buffer.find_field(first) {
            Some(field) => field,
            None => {
                let error = ResolverError::UnknownMember {
                    ty: buffer.name.clone(),
                    member: first.to_string(),
                };
                return Err(self.error(error, location));
            }
        };
        let output = ExpressionType::value(&buffer.fields[field].type_ref);
        let reference = self.add_node(
            ExpressionKind::StructuredBufferReference(id),
            ExpressionType {
                kind: OutputKind::Buffer(id),
                array_sizes: Vec::new(),
                writable: false,
            },
            location,
        );
        let access = self.add_node(
            ExpressionKind::StructuredFieldAccess {
                input: reference,
                steps: vec![AccessStep::Field(field as u32)],
            },
            output.clone(),
            location,
        );
        Ok((access, output, rest))
    }

    /// Apply field, component, and column selections by name
    fn resolve_member_steps(
        &mut self,
        input: ExpressionId,
        mut output: ExpressionType,
        mut steps: Vec<AccessStep>,
        names: &[&'a str],
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        for name in names {
            let step = match (output.array_sizes.is_empty(), output.kind) {
                (true, OutputKind::Base(BaseType::Struct(id))) => {
                    let sd = self.instance.get_struct(id);
                    sd.find_field(name).map(|field| {
                        let ty = ExpressionType::value(&sd.fields[field].type_ref);
                        (AccessStep::Field(field as u32), ty)
                    })
                }
                (true, OutputKind::Base(BaseType::Vector(id))) => {
                    let vector = id.get();
                    parse_index(name)
                        .filter(|i| vector.components > 1 && *i < vector.components)
                        .map(|i| (AccessStep::Component(i), ExpressionType::vector(id.scalar())))
                }
                (true, OutputKind::Base(BaseType::Matrix(id))) => {
                    let matrix = id.get();
                    parse_index(name)
                        .filter(|i| *i < matrix.columns)
                        .map(|i| (AccessStep::Column(i), ExpressionType::vector(matrix.column)))
                }
                _ => None,
            };

            match step {
                Some((step, ty)) => {
                    steps.push(step);
                    output = ty.with_writable(output.writable);
                }
                None => {
                    let error = ResolverError::UnknownMember {
                        ty: self.instance.describe_type(&output),
                        member: name.to_string(),
                    };
                    return Err(self.error(error, location));
                }
            }
        }

        if steps.is_empty() {
            return Ok(input);
        }

        // Merge into an existing access on the same input
        let (input, steps) = match &self.instance.get_expression(input).kind {
            ExpressionKind::StructuredFieldAccess {
                input: inner,
                steps: inner_steps,
            } => {
                let mut merged = inner_steps.clone();
                merged.extend(steps);
                (*inner, merged)
            }
            _ => (input, steps),
        };

        Ok(self.add_node(
            ExpressionKind::StructuredFieldAccess { input, steps },
            output,
            location,
        ))
    }

    fn resolve_array_index(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        array: ExpressionIndex,
        index: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let array = self.resolve_value(module, scope, array);
        let index = self.resolve_value(module, scope, index);
        let (array, index) = (array?, index?);

        let array_type = self.instance.get_expression(array).output.clone();
        if array_type.array_sizes.is_empty() {
            let error = ResolverError::IndexNonArray(self.instance.describe_type(&array_type));
            return Err(self.error(error, location));
        }

        let index_type = &self.instance.get_expression(index).output;
        if index_type.as_vector() != Some(ir::I1) {
            let error = ResolverError::IndexNotInteger(self.instance.describe_type(index_type));
            return Err(self.error(error, location));
        }

        let output = ExpressionType {
            kind: array_type.kind,
            array_sizes: array_type.array_sizes[1..].to_vec(),
            writable: array_type.writable,
        };
        Ok(self.add_node(ExpressionKind::ArrayIndex { array, index }, output, location))
    }

    fn resolve_assign(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        target: ExpressionIndex,
        value: ExpressionIndex,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let target = self.resolve_value(module, scope, target);
        let value = self.resolve_value(module, scope, value);
        let (target, value) = (target?, value?);

        let target_type = &self.instance.get_expression(target).output;
        let value_type = &self.instance.get_expression(value).output;
        if !target_type.writable {
            return Err(self.error(ResolverError::AssignToReadOnly, location));
        }
        if !target_type.same_value_type(value_type) {
            let error = ResolverError::BinaryOperandTypes {
                op: BinaryOperator::Assign,
                left: self.instance.describe_type(target_type),
                right: self.instance.describe_type(value_type),
            };
            return Err(self.error(error, location));
        }

        if let Some(buffer) = self.root_buffer(target) {
            self.add_access(ir::GlobalAccess::Buffer {
                id: buffer,
                write: true,
            });
        }

        Ok(self.add_node(
            ExpressionKind::Binary(BinaryOperator::Assign, target, value),
            ExpressionType::VOID,
            location,
        ))
    }

    /// Find the buffer an access chain starts from
    fn root_buffer(&self, mut id: ExpressionId) -> Option<ir::BufferId> {
        loop {
            match &self.instance.get_expression(id).kind {
                ExpressionKind::StructuredBufferReference(buffer) => return Some(*buffer),
                ExpressionKind::FlattenedBufferAccess { buffer, .. } => return Some(*buffer),
                ExpressionKind::StructuredFieldAccess { input, .. } => id = *input,
                ExpressionKind::ArrayIndex { array, .. } => id = *array,
                _ => return None,
            }
        }
    }

    /// Resolve every expression in a list, continuing after failures
    fn resolve_arguments(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        list: ExpressionList,
        line: u32,
    ) -> ResolveResult<Vec<ExpressionId>> {
        let list = self.get_ast_list(module, list, line)?;
        let mut arguments = Vec::with_capacity(list.len());
        let mut failed = false;
        for index in list {
            match self.resolve_value(module, scope, *index) {
                Ok(id) => arguments.push(id),
                Err(Failed) => failed = true,
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(arguments)
        }
    }

    fn resolve_call(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        name: &str,
        arguments: ExpressionList,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let arguments = self.resolve_arguments(module, scope, arguments, location.line.0);

        if let Some(sampler) = self.instance.find_sampler(name) {
            let arguments = arguments?;
            let expected = [ir::TypeRef::vector(ir::F2)];
            self.check_arguments(name, &expected, &arguments, location)?;

            self.instance.samplers[sampler.0 as usize].used = true;
            self.add_access(ir::GlobalAccess::Sampler(sampler));
            return Ok(self.add_node(
                ExpressionKind::SamplerCall {
                    sampler,
                    coordinate: arguments[0],
                },
                ExpressionType::vector(ir::F4),
                location,
            ));
        }

        let callee = self.resolve_function_by_name(name, location);
        let (callee, arguments) = (callee?, arguments?);

        match callee {
            Callee::Builtin(function) => {
                let builtin = function.get();
                let expected = builtin
                    .arguments
                    .iter()
                    .map(|base| ir::TypeRef::new(*base))
                    .collect::<Vec<_>>();
                self.check_arguments(name, &expected, &arguments, location)?;
                let output = return_output(builtin.return_type);
                Ok(self.add_node(
                    ExpressionKind::BuiltinCall {
                        function,
                        arguments,
                    },
                    output,
                    location,
                ))
            }
            Callee::User(function) => {
                let definition = self.instance.get_function(function);
                let output = return_output(definition.return_type);
                let expected = definition
                    .arguments
                    .iter()
                    .map(|v| self.instance.get_variable(*v).type_ref.clone())
                    .collect::<Vec<_>>();
                self.check_arguments(name, &expected, &arguments, location)?;
                Ok(self.add_node(
                    ExpressionKind::FunctionCall {
                        function,
                        arguments,
                    },
                    output,
                    location,
                ))
            }
        }
    }

    /// Check call arguments against the exact parameter types
    fn check_arguments(
        &mut self,
        name: &str,
        expected: &[ir::TypeRef],
        arguments: &[ExpressionId],
        location: SourceLocation,
    ) -> ResolveResult<()> {
        if expected.len() != arguments.len() {
            let error = ResolverError::WrongArgumentCount {
                name: name.to_string(),
                expected: expected.len(),
                found: arguments.len(),
            };
            return Err(self.error(error, location));
        }

        let mut failed = false;
        for (index, (expected, argument)) in expected.iter().zip(arguments).enumerate() {
            let output = &self.instance.get_expression(*argument).output;
            if output.as_type_ref().as_ref() != Some(expected) {
                let error = ResolverError::WrongArgumentType {
                    name: name.to_string(),
                    index: index + 1,
                    expected: self
                        .instance
                        .describe_type(&ExpressionType::value(expected)),
                    found: self.instance.describe_type(output),
                };
                self.error(error, location);
                failed = true;
            }
        }
        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    fn resolve_constructor(
        &mut self,
        module: usize,
        scope: &'a ResolveScope<'a>,
        type_name: &str,
        arguments: ExpressionList,
        location: SourceLocation,
    ) -> ResolveResult<ExpressionId> {
        let arguments = self.resolve_arguments(module, scope, arguments, location.line.0);
        let target = if let Some(id) = ir::find_vector_type(type_name) {
            Ok(BaseType::Vector(id))
        } else if let Some(id) = ir::find_matrix_type(type_name) {
            Ok(BaseType::Matrix(id))
        } else {
            self.resolve_use_struct(type_name, location)
                .map(BaseType::Struct)
        };
        let (target, arguments) = (target?, arguments?);

        let types = arguments
            .iter()
            .map(|id| &self.instance.get_expression(*id).output)
            .collect::<Vec<_>>();

        let valid = match target {
            BaseType::Vector(id) => {
                let vector = id.get();
                let components = types
                    .iter()
                    .map(|ty| {
                        ty.as_vector()
                            .filter(|v| v.get().item == vector.item)
                            .map(|v| v.get().components)
                    })
                    .collect::<Option<Vec<_>>>();
                match components.as_deref() {
                    Some([1]) => true,
                    Some(components) => components.iter().sum::<u32>() == vector.components,
                    None => false,
                }
            }
            BaseType::Matrix(id) => {
                let matrix = id.get();
                types.len() == matrix.columns as usize
                    && types.iter().all(|ty| ty.as_vector() == Some(matrix.column))
            }
            BaseType::Struct(id) => {
                let sd = self.instance.get_struct(id);
                types.len() == sd.fields.len()
                    && types.iter().zip(&sd.fields).all(|(ty, field)| {
                        ty.as_type_ref().as_ref() == Some(&field.type_ref)
                    })
            }
        };

        if !valid {
            let error = ResolverError::InvalidConstructorArguments(type_name.to_string());
            return Err(self.error(error, location));
        }

        Ok(self.add_node(
            ExpressionKind::Constructor { target, arguments },
            ExpressionType::base(target),
            location,
        ))
    }
}

/// Type of a call to a function with the given return type
fn return_output(return_type: Option<BaseType>) -> ExpressionType {
    match return_type {
        Some(base) => ExpressionType::base(base),
        None => ExpressionType::VOID,
    }
}

/// Parse a `_N` component or column selector
fn parse_index(name: &str) -> Option<u32> {
    name.strip_prefix('_')?.parse().ok()
}
