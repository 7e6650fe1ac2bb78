use bumpalo::Bump;
use rpl_ir as ir;
use rspirv::binary::Assemble;
use rspirv::dr::Builder;
use rspirv::spirv::{self, AddressingModel, Capability, MemoryModel, StorageClass, Word};
use std::collections::HashMap;

mod errors;
mod expressions;
mod functions;
mod globals;
mod operators;
mod types;

pub use errors::GeneratorError;

use errors::GenerateResult;
use globals::{BufferVariables, BuiltinVariables, SamplerVariable};
use types::FixedTypes;

/// Settings for a single [generate] call
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct GeneratorOptions {
    /// Emit names for types, variables, and functions
    pub debug_names: bool,

    /// Generator magic number written into the module header
    pub generator: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            debug_names: true,
            generator: 0,
        }
    }
}

/// Build a SPIR-V module for a resolved instance
///
/// Returns the module as a list of words, starting with the header.
pub fn generate(
    instance: &ir::CompilerInstance,
    options: &GeneratorOptions,
) -> Result<Vec<u32>, GeneratorError> {
    log::debug!(
        "generating spir-v for {} functions and {} entry points",
        instance.functions.len(),
        instance.entry_points.len()
    );

    let arena = Bump::new();
    let mut generator = Generator::new(instance, options, &arena);

    generator.emit_globals()?;

    // Ids are assigned before any body is emitted so calls can reference any function
    let stages = generator.function_stages();
    generator.function_variants = stages
        .into_iter()
        .map(|stages| {
            stages
                .into_iter()
                .map(|stage| FunctionVariant {
                    stage,
                    id: generator.builder.id(),
                })
                .collect()
        })
        .collect();

    for index in 0..instance.functions.len() {
        for variant in 0..generator.function_variants[index].len() {
            let variant = generator.function_variants[index][variant];
            generator.emit_function(ir::FunctionId(index as u32), variant)?;
        }
    }

    generator.emit_entry_points()?;

    let mut module = generator.builder.module();
    if let Some(header) = module.header.as_mut() {
        header.generator = options.generator;
    }
    let words = module.assemble();

    log::debug!(
        "generated {} words using {} bytes of working memory",
        words.len(),
        arena.allocated_bytes()
    );
    Ok(words)
}

/// Key for caching pointer types by storage class and pointee type
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
struct PointerKey {
    class: StorageClass,
    pointee: Word,
}

/// Copy of a function emitted for the stage it runs in
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
struct FunctionVariant {
    stage: Option<ir::Stage>,
    id: Word,
}

/// State of a single generate call
struct Generator<'a> {
    instance: &'a ir::CompilerInstance,
    options: &'a GeneratorOptions,

    /// Working memory released at the end of the call
    arena: &'a Bump,

    builder: Builder,

    /// GLSL.std.450 extended instruction set
    glsl: Word,

    types: FixedTypes,

    /// Type ids for resolved structs, indexed by [ir::StructId]
    structs: Vec<Option<Word>>,

    arrays: HashMap<ir::TypeRef, Word>,
    pointers: HashMap<PointerKey, Word>,
    function_types: HashMap<(Word, Vec<Word>), Word>,
    int_constants: HashMap<i32, Word>,
    float_constants: HashMap<u32, Word>,

    /// Variables for each buffer, indexed by [ir::BufferId]
    buffers: Vec<BufferVariables>,

    /// Variables for each used sampler, indexed by [ir::SamplerId]
    samplers: Vec<Option<SamplerVariable>>,

    builtins: BuiltinVariables,

    /// Emitted copies of each function, indexed by [ir::FunctionId]
    function_variants: Vec<Vec<FunctionVariant>>,
}

impl<'a> Generator<'a> {
    fn new(
        instance: &'a ir::CompilerInstance,
        options: &'a GeneratorOptions,
        arena: &'a Bump,
    ) -> Self {
        let mut builder = Builder::new();
        builder.set_version(1, 3);
        builder.capability(Capability::Shader);
        let glsl = builder.ext_inst_import("GLSL.std.450");
        builder.memory_model(AddressingModel::Logical, MemoryModel::GLSL450);

        let types = FixedTypes::new(&mut builder);

        Generator {
            instance,
            options,
            arena,
            builder,
            glsl,
            types,
            structs: vec![None; instance.structs.len()],
            arrays: HashMap::new(),
            pointers: HashMap::new(),
            function_types: HashMap::new(),
            int_constants: HashMap::new(),
            float_constants: HashMap::new(),
            buffers: Vec::new(),
            samplers: Vec::new(),
            builtins: BuiltinVariables::default(),
            function_variants: Vec::new(),
        }
    }

    /// Attach a debug name to an id if names are enabled
    fn debug_name(&mut self, id: Word, name: &str) {
        if self.options.debug_names {
            self.builder.name(id, name);
        }
    }

    /// Declare every entry point with the interface variables its call tree accesses
    fn emit_entry_points(&mut self) -> GenerateResult<()> {
        let instance = self.instance;
        for entry_point in &instance.entry_points {
            let function = instance.get_function(entry_point.function);
            let id = self.function_variant(entry_point.function, Some(entry_point.stage));
            let interface = self.entry_point_interface(function, entry_point.stage);

            let model = match entry_point.stage {
                ir::Stage::Vertex => spirv::ExecutionModel::Vertex,
                ir::Stage::Fragment => spirv::ExecutionModel::Fragment,
            };
            log::trace!(
                "entry point {} for {} stage with {} interface variables",
                function.name,
                entry_point.stage,
                interface.len()
            );
            self.builder
                .entry_point(model, id, function.name.as_str(), interface);

            if entry_point.stage == ir::Stage::Fragment {
                self.builder
                    .execution_mode(id, spirv::ExecutionMode::OriginUpperLeft, []);
            }
        }
        Ok(())
    }
}
