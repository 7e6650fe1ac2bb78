use super::errors::*;
use super::scopes::{FunctionContext, ResolveScope};
use super::Resolver;
use rpl_ast as ast;
use rpl_ir as ir;
use rpl_ir::{GlobalAccess, IntrinsicAccess, Stage};
use rpl_text::SourceLocation;

/// Memoized resolution state of a function name
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum FunctionState {
    Resolving,
    Resolved(ir::FunctionId),
    Failed,
}

/// Target of a call by name
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Callee {
    User(ir::FunctionId),
    Builtin(ir::BuiltinId),
}

/// How control leaves a statement
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Flow {
    /// Control may continue with the next statement
    Continues,

    /// Every path returns from the function
    Returns,

    /// Every path leaves through a return, break, or continue
    Jumps,
}

impl<'a> Resolver<'a> {
    /// Find the function for a call and record its accesses on the calling function
    ///
    /// Built-in functions take precedence over user functions.
    pub(super) fn resolve_function_by_name(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> ResolveResult<Callee> {
        if let Some(id) = ir::find_builtin_function(name) {
            if id.get().stage == Some(Stage::Vertex) {
                self.add_access(GlobalAccess::Intrinsic(IntrinsicAccess::VertexPosition));
            }
            return Ok(Callee::Builtin(id));
        }

        let id = self.resolve_function(name, location)?;

        let accesses = self.instance.get_function(id).accesses.clone();
        if let Some(context) = self.function_stack.last_mut() {
            for access in accesses {
                ir::add_global_access(&mut context.accesses, access);
            }
            if !context.callees.contains(&id) {
                context.callees.push(id);
            }
        }
        Ok(Callee::User(id))
    }

    /// Get a user function by name, resolving it on first use
    pub(super) fn resolve_function(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> ResolveResult<ir::FunctionId> {
        if let Some((_, state)) = self.functions.iter().find(|(n, _)| n == name) {
            return match *state {
                FunctionState::Resolved(id) => Ok(id),
                FunctionState::Failed => Err(Failed),
                FunctionState::Resolving => {
                    Err(self.error(ResolverError::RecursiveFunction(name.to_string()), location))
                }
            };
        }

        let found = match self.find_active::<ast::FunctionDefinition>(name, location) {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(self.error(ResolverError::UnknownFunction(name.to_string()), location)),
            Err(Failed) => Err(Failed),
        };
        let (module, fd) = match found {
            Ok(found) => found,
            Err(Failed) => {
                self.functions.push((name.to_string(), FunctionState::Failed));
                return Err(Failed);
            }
        };

        log::trace!("resolving function {}", name);

        self.functions.push((name.to_string(), FunctionState::Resolving));
        let result = self.resolve_function_definition(module, fd);

        let state = match result {
            Ok(id) => FunctionState::Resolved(id),
            Err(Failed) => FunctionState::Failed,
        };
        if let Some(entry) = self.functions.iter_mut().find(|(n, _)| n == name) {
            entry.1 = state;
        }
        result
    }

    fn resolve_function_definition(
        &mut self,
        module: usize,
        fd: &'a ast::FunctionDefinition,
    ) -> ResolveResult<ir::FunctionId> {
        let location = self.location(module, fd.line);
        self.check_global_name(&fd.name, "function", location)?;

        let return_type = if fd.return_type_name == "void" {
            None
        } else {
            let empty = ast::ExpressionList::default();
            Some(
                self.resolve_type(module, &fd.return_type_name, empty, fd.line)?
                    .base,
            )
        };

        self.function_stack.push(FunctionContext {
            name: fd.name.clone(),
            module,
            return_type,
            accesses: Vec::new(),
            callees: Vec::new(),
        });

        let body = self.resolve_function_body(module, fd, location);

        let context = self.function_stack.pop();
        let ((arguments, body), context) = match (body, context) {
            (Ok(body), Some(context)) => (body, context),
            _ => return Err(Failed),
        };

        let required_stage = self.compute_required_stage(&fd.name, &context.accesses, location)?;

        let id = ir::FunctionId(self.instance.functions.len() as u32);
        self.instance.functions.push(ir::Function {
            name: fd.name.clone(),
            return_type,
            arguments,
            body,
            required_stage,
            accesses: context.accesses,
            callees: context.callees,
            location,
        });

        log::trace!(
            "resolved function {} with required stage {:?}",
            fd.name,
            required_stage
        );
        Ok(id)
    }

    /// Declare the arguments and resolve the body of a function
    fn resolve_function_body(
        &mut self,
        module: usize,
        fd: &'a ast::FunctionDefinition,
        location: SourceLocation,
    ) -> ResolveResult<(Vec<ir::VariableId>, ir::ExpressionId)> {
        let root = ResolveScope::new_in(self.arena, None, false);

        let mut arguments = Vec::with_capacity(fd.arguments.len());
        let mut failed = false;
        for argument in &fd.arguments {
            let argument_location = self.location(module, argument.line);
            if root.declares(&argument.name) {
                self.error(
                    ResolverError::VariableAlreadyDeclared(argument.name.clone()),
                    argument_location,
                );
                failed = true;
                continue;
            }
            let type_ref = match self.resolve_type(
                module,
                &argument.type_name,
                argument.array_sizes,
                argument.line,
            ) {
                Ok(type_ref) => type_ref,
                Err(Failed) => {
                    failed = true;
                    continue;
                }
            };
            let id = self.instance.add_variable(ir::Variable {
                name: argument.name.clone(),
                type_ref,
                writable: false,
                location: argument_location,
            });
            root.variables.borrow_mut().push((argument.name.as_str(), id));
            arguments.push(id);
        }

        let (body, flow) = self.resolve_block(module, root, fd.body, false)?;
        if failed {
            return Err(Failed);
        }

        let returns_value = self
            .function_stack
            .last()
            .is_some_and(|context| context.return_type.is_some());
        if returns_value && flow != Flow::Returns {
            return Err(self.error(ResolverError::NotAllPathsReturn(fd.name.clone()), location));
        }

        Ok((arguments, body))
    }

    /// Get the stage a function is bound to by its accesses
    ///
    /// Reading vertex stage outputs does not bind a function, it sees the side of the stage it
    /// is called from.
    fn compute_required_stage(
        &mut self,
        name: &str,
        accesses: &[GlobalAccess],
        location: SourceLocation,
    ) -> ResolveResult<Option<Stage>> {
        let requires = |stage| {
            accesses
                .iter()
                .any(|a| ir::access_required_stage(*a, &self.instance.buffers) == Some(stage))
        };
        let vertex = requires(Stage::Vertex);
        let fragment = requires(Stage::Fragment);

        if vertex && fragment {
            let mut notes = self.access_notes(accesses, Stage::Vertex);
            notes.extend(self.access_notes(accesses, Stage::Fragment));
            return Err(self.error_with_notes(
                ResolverError::StageConflict(name.to_string()),
                location,
                notes,
            ));
        }

        Ok(if vertex {
            Some(Stage::Vertex)
        } else if fragment {
            Some(Stage::Fragment)
        } else {
            None
        })
    }

    /// Describe every access that binds a function to a stage
    fn access_notes(&self, accesses: &[GlobalAccess], stage: Stage) -> Vec<ResolverNote> {
        accesses
            .iter()
            .filter(|a| ir::access_required_stage(**a, &self.instance.buffers) == Some(stage))
            .map(|access| match access {
                GlobalAccess::Buffer { id, write } => {
                    let buffer = self.instance.get_buffer(*id);
                    ResolverNote {
                        message: format!(
                            "{} {} buffer '{}' which requires the {} stage",
                            if *write { "writes" } else { "reads" },
                            buffer.kind,
                            buffer.name,
                            stage
                        ),
                        location: buffer.location,
                    }
                }
                GlobalAccess::Sampler(id) => {
                    let sampler = self.instance.get_sampler(*id);
                    ResolverNote {
                        message: format!(
                            "samples '{}' which requires the {} stage",
                            sampler.name, stage
                        ),
                        location: sampler.location,
                    }
                }
                GlobalAccess::Intrinsic(intrinsic) => ResolverNote {
                    message: match intrinsic {
                        IntrinsicAccess::VertexPosition => format!(
                            "writes the vertex position which requires the {} stage",
                            stage
                        ),
                        IntrinsicAccess::InstanceIndex => format!(
                            "reads the instance index which requires the {} stage",
                            stage
                        ),
                    },
                    location: SourceLocation::UNKNOWN,
                },
            })
            .collect()
    }

    /// Resolve the entry point functions and everything they call
    pub(super) fn resolve_entry_points(
        &mut self,
        entry_points: &[ir::EntryPoint],
    ) -> ResolveResult<()> {
        let mut failed = false;
        for entry_point in entry_points {
            let name = &entry_point.function_name;
            let id = match self.resolve_function(name, SourceLocation::UNKNOWN) {
                Ok(id) => id,
                Err(Failed) => {
                    failed = true;
                    continue;
                }
            };

            let function = self.instance.get_function(id);
            let location = function.location;
            if function.return_type.is_some() || !function.arguments.is_empty() {
                self.error(
                    ResolverError::InvalidEntryPointSignature(name.clone()),
                    location,
                );
                failed = true;
                continue;
            }

            if let Some(required) = function.required_stage {
                if required != entry_point.stage {
                    let accesses = function.accesses.clone();
                    let notes = self.access_notes(&accesses, required);
                    self.error_with_notes(
                        ResolverError::EntryPointStageMismatch {
                            name: name.clone(),
                            stage: entry_point.stage,
                            required,
                        },
                        location,
                        notes,
                    );
                    failed = true;
                    continue;
                }
            }

            let resolved = ir::ResolvedEntryPoint {
                function: id,
                stage: entry_point.stage,
            };
            if !self.instance.entry_points.contains(&resolved) {
                self.instance.entry_points.push(resolved);
            }
        }

        if failed {
            Err(Failed)
        } else {
            Ok(())
        }
    }

    /// Record a global access on the function being resolved
    pub(super) fn add_access(&mut self, access: GlobalAccess) {
        if let Some(context) = self.function_stack.last_mut() {
            ir::add_global_access(&mut context.accesses, access);
        }
    }
}
