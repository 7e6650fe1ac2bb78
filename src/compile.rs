use crate::*;
use text::CompileErrorExt;

/// Invoke the compiler to build intermediate modules into metadata and a SPIR-V module
pub fn compile(args: CompileArgs) -> Result<CompiledPipeline, CompileError> {
    let mut context = resolver::CompilerContext::new(args.pipeline);

    for module in args.modules {
        context.use_module(module)?;
    }
    for (name, value) in args.flags {
        context.set_option_flag(name, *value)?;
    }
    for (name, value) in args.counts {
        context.set_option_count(name, *value)?;
    }

    // Turn the intermediate modules into a typed instance
    let instance = match context.resolve(args.entry_points) {
        Ok(instance) => instance,
        Err(err) => return Err(CompileError::Text(format!("{}", err.display(&err.files)))),
    };

    let metadata = match ir::metadata::emit_metadata(&instance) {
        Ok(metadata) => metadata,
        Err(err) => {
            return Err(CompileError::Text(format!(
                "{}",
                err.display(&instance.files)
            )))
        }
    };

    let words = match spirv::generate(&instance, &args.generator_options) {
        Ok(words) => words,
        Err(err) => {
            return Err(CompileError::Text(format!(
                "{}",
                err.display(&instance.files)
            )))
        }
    };

    let stages = instance
        .entry_points
        .iter()
        .map(|entry_point| CompiledPipelineStage {
            stage: entry_point.stage,
            entry_point: instance.get_function(entry_point.function).name.clone(),
        })
        .collect();

    log::debug!(
        "compiled {} modules into {} words",
        args.modules.len(),
        words.len()
    );

    Ok(CompiledPipeline {
        words,
        stages,
        metadata,
    })
}

/// Output of a compiled shader family
pub struct CompiledPipeline {
    /// SPIR-V module as a list of words
    pub words: Vec<u32>,

    /// Data for each entry point in the module
    pub stages: Vec<CompiledPipelineStage>,

    /// Reflection metadata for the pipeline
    pub metadata: Metadata,
}

/// Output for an entry point in a compiled shader family
pub struct CompiledPipelineStage {
    pub stage: Stage,

    /// Name of the entry point in the module
    pub entry_point: String,
}

/// Error for [compile()]
#[derive(Debug)]
pub enum CompileError {
    /// Diagnostics from resolution or emission, formatted with file names
    Text(String),

    /// Options could not be configured
    Context(resolver::ContextError),
}

impl From<resolver::ContextError> for CompileError {
    fn from(err: resolver::ContextError) -> Self {
        CompileError::Context(err)
    }
}

/// Arguments for [compile()]
pub struct CompileArgs<'a> {
    modules: &'a [&'a ast::Module],
    entry_points: &'a [EntryPoint],
    pipeline: PipelineType,
    flags: &'a [(&'a str, bool)],
    counts: &'a [(&'a str, u64)],
    generator_options: spirv::GeneratorOptions,
}

impl<'a> CompileArgs<'a> {
    /// Create new args with required arguments
    pub fn new(modules: &'a [&'a ast::Module], entry_points: &'a [EntryPoint]) -> Self {
        CompileArgs {
            modules,
            entry_points,
            pipeline: PipelineType::default(),
            flags: &[],
            counts: &[],
            generator_options: spirv::GeneratorOptions::default(),
        }
    }

    pub fn pipeline(mut self, pipeline: PipelineType) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Set values for flag options
    pub fn flags(mut self, flags: &'a [(&'a str, bool)]) -> Self {
        self.flags = flags;
        self
    }

    /// Set values for count options
    pub fn counts(mut self, counts: &'a [(&'a str, u64)]) -> Self {
        self.counts = counts;
        self
    }

    /// Enable or disable debug names in the generated module
    pub fn debug_names(mut self, enabled: bool) -> Self {
        self.generator_options.debug_names = enabled;
        self
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompileError::Text(s) => write!(f, "{}", s),
            CompileError::Context(err) => write!(f, "{}", err),
        }
    }
}
