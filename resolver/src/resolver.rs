use crate::{ContextOption, Evaluator};
use bumpalo::Bump;
use rpl_ast as ast;
use rpl_ir as ir;
use rpl_text::{FileId, SourceLocation};

mod errors;
mod expressions;
mod flatten;
mod functions;
mod globals;
mod operators;
mod scopes;

pub use errors::{ResolveFailure, ResolverDiagnostic, ResolverError, ResolverNote};

use errors::{Failed, ResolveResult};
use functions::FunctionState;
use globals::StructState;
use scopes::FunctionContext;

/// Resolve a set of modules into a compiler instance
pub(crate) fn resolve<'a>(
    pipeline: ir::PipelineType,
    modules: &'a [&'a ast::Module],
    options: &'a [ContextOption],
    entry_points: &[ir::EntryPoint],
    arena: &'a Bump,
) -> Result<ir::CompilerInstance, ResolveFailure> {
    log::debug!(
        "resolving {} modules with {} options and {} entry points",
        modules.len(),
        options.len(),
        entry_points.len()
    );

    let mut resolver = Resolver::new(pipeline, modules, options, arena);

    // Every step continues after failures to report as many diagnostics as possible
    let _ = resolver.resolve_settings();
    let _ = resolver.resolve_all_structs();
    let _ = resolver.resolve_buffers();
    let _ = resolver.resolve_samplers();
    let _ = resolver.resolve_entry_points(entry_points);

    resolver.finish()
}

/// Binding slot counters for each buffer category
#[derive(Default)]
struct BindingCounters {
    attribute: u32,
    stable: u32,
    unstable: u32,
}

/// Location slot counters for each flattened buffer category
#[derive(Default)]
struct LocationCounters {
    attribute: u32,
    vertex_output: u32,
    fragment_output: u32,
}

/// State of a single resolve pass
pub(crate) struct Resolver<'a> {
    modules: &'a [&'a ast::Module],
    options: &'a [ContextOption],

    /// Working memory for scopes, aliases, and field chains
    arena: &'a Bump,

    instance: ir::CompilerInstance,

    /// File id of each module
    files: Vec<FileId>,

    diagnostics: Vec<ResolverDiagnostic>,

    structs: Vec<(String, StructState)>,
    functions: Vec<(String, FunctionState)>,

    /// Functions being resolved, the innermost is last
    function_stack: Vec<FunctionContext>,

    bindings: BindingCounters,
    locations: LocationCounters,
}

impl<'a> Resolver<'a> {
    fn new(
        pipeline: ir::PipelineType,
        modules: &'a [&'a ast::Module],
        options: &'a [ContextOption],
        arena: &'a Bump,
    ) -> Self {
        let mut instance = ir::CompilerInstance {
            pipeline,
            ..Default::default()
        };
        let files = modules
            .iter()
            .map(|module| instance.files.add_file(module.file_name.clone()))
            .collect();
        Resolver {
            modules,
            options,
            arena,
            instance,
            files,
            diagnostics: Vec::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            function_stack: Vec::new(),
            bindings: BindingCounters::default(),
            locations: LocationCounters::default(),
        }
    }

    /// Build the result of the pass
    fn finish(self) -> Result<ir::CompilerInstance, ResolveFailure> {
        if self.diagnostics.is_empty() {
            log::debug!(
                "resolved {} structs, {} buffers, {} samplers, {} functions",
                self.instance.structs.len(),
                self.instance.buffers.len(),
                self.instance.samplers.len(),
                self.instance.functions.len()
            );
            Ok(self.instance)
        } else {
            log::debug!("resolve failed with {} diagnostics", self.diagnostics.len());
            Err(ResolveFailure {
                diagnostics: self.diagnostics,
                files: self.instance.files,
            })
        }
    }

    /// Record a diagnostic
    fn error(&mut self, error: impl Into<ResolverError>, location: SourceLocation) -> Failed {
        self.error_with_notes(error, location, Vec::new())
    }

    /// Record a diagnostic with notes
    fn error_with_notes(
        &mut self,
        error: impl Into<ResolverError>,
        location: SourceLocation,
        notes: Vec<ResolverNote>,
    ) -> Failed {
        self.diagnostics.push(ResolverDiagnostic {
            error: error.into(),
            location,
            notes,
        });
        Failed
    }

    /// Location of a line in a module
    fn location(&self, module: usize, line: u32) -> SourceLocation {
        match self.files.get(module) {
            Some(file) => SourceLocation::new(*file, line),
            None => SourceLocation::UNKNOWN,
        }
    }

    fn evaluator(&self, module: usize, instance_options_allowed: bool) -> Evaluator<'a> {
        Evaluator::new(self.modules[module], self.options, instance_options_allowed)
    }

    /// Evaluate a conditional, recording a diagnostic on failure
    fn is_active(
        &mut self,
        module: usize,
        condition: Option<ast::ExpressionIndex>,
        instance_options_allowed: bool,
        line: u32,
    ) -> ResolveResult<bool> {
        match self
            .evaluator(module, instance_options_allowed)
            .evaluate_conditional(condition)
        {
            Ok(active) => Ok(active),
            Err(err) => Err(self.error(err, self.location(module, line))),
        }
    }

    /// Evaluate the array dimensions of a declaration
    fn evaluate_array_sizes(
        &mut self,
        module: usize,
        list: ast::ExpressionList,
        line: u32,
    ) -> ResolveResult<Vec<u32>> {
        let location = self.location(module, line);
        let indices = match self.modules[module].get_expression_list(list) {
            Some(indices) => indices,
            None => return Err(self.error(crate::EvaluationError::MissingExpression, location)),
        };

        let mut sizes = Vec::with_capacity(indices.len());
        let mut failed = false;
        for index in indices {
            match self.evaluator(module, false).evaluate(Some(*index)) {
                Ok(crate::Value::Integer(size)) if size > 0 && size <= u32::MAX as i64 => {
                    sizes.push(size as u32)
                }
                Ok(value) => {
                    self.error(
                        ResolverError::ArrayDimensionOutOfRange(value.to_string()),
                        location,
                    );
                    failed = true;
                }
                Err(err) => {
                    self.error(err, location);
                    failed = true;
                }
            }
        }

        if failed {
            Err(Failed)
        } else {
            Ok(sizes)
        }
    }
}
