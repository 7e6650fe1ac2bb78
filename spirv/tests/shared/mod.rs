use rpl_ast::*;
use rpl_ir::{CompilerInstance, EntryPoint, PipelineType, Stage};
use rpl_resolver::CompilerContext;
use rpl_spirv::*;
use rspirv::dr;
use rspirv::spirv::{Decoration, FunctionControl, Op, Word};

pub const TEST_FILE: &str = "test.rpl";

#[allow(unused)]
pub fn vertex(name: &str) -> EntryPoint {
    EntryPoint::new(name, Stage::Vertex)
}

#[allow(unused)]
pub fn fragment(name: &str) -> EntryPoint {
    EntryPoint::new(name, Stage::Fragment)
}

#[track_caller]
pub fn check_resolves(module: &Module, entry_points: &[EntryPoint]) -> CompilerInstance {
    let mut context = CompilerContext::new(PipelineType::ClassicGraphics);
    if let Err(err) = context.use_module(module) {
        panic!("{}", err);
    }
    match context.resolve(entry_points) {
        Ok(instance) => instance,
        Err(err) => panic!("{}", err),
    }
}

/// Resolve and generate a module, returning the raw words
#[track_caller]
pub fn check_generates_words(
    module: &Module,
    entry_points: &[EntryPoint],
    options: &GeneratorOptions,
) -> Vec<u32> {
    let instance = check_resolves(module, entry_points);
    match generate(&instance, options) {
        Ok(words) => words,
        Err(err) => panic!("{}", err),
    }
}

/// Resolve and generate a module with default options and parse it back
#[track_caller]
pub fn check_generates(module: &Module, entry_points: &[EntryPoint]) -> dr::Module {
    let words = check_generates_words(module, entry_points, &GeneratorOptions::default());
    match dr::load_words(&words) {
        Ok(module) => module,
        Err(err) => panic!("generated module does not parse: {:?}", err),
    }
}

/// Find every global variable with a debug name
#[allow(unused)]
pub fn variables_named(module: &dr::Module, name: &str) -> Vec<Word> {
    let is_variable = |id: Word| {
        module
            .types_global_values
            .iter()
            .any(|i| i.class.opcode == Op::Variable && i.result_id == Some(id))
    };
    module
        .debug_names
        .iter()
        .filter(|i| i.class.opcode == Op::Name)
        .filter_map(|i| match i.operands.as_slice() {
            [dr::Operand::IdRef(id), dr::Operand::LiteralString(n)] if n == name => Some(*id),
            _ => None,
        })
        .filter(|id| is_variable(*id))
        .collect()
}

/// Find the single global variable with a debug name
#[track_caller]
#[allow(unused)]
pub fn variable_named(module: &dr::Module, name: &str) -> Word {
    match variables_named(module, name).as_slice() {
        [id] => *id,
        found => panic!("expected one variable named {}, found {}", name, found.len()),
    }
}

/// Find a function by its debug name
#[track_caller]
#[allow(unused)]
pub fn function_named<'m>(module: &'m dr::Module, name: &str) -> &'m dr::Function {
    let id = module
        .debug_names
        .iter()
        .find_map(|i| match i.operands.as_slice() {
            [dr::Operand::IdRef(id), dr::Operand::LiteralString(n)] if n == name => Some(*id),
            _ => None,
        });
    module
        .functions
        .iter()
        .find(|f| id.is_some() && f.def.as_ref().and_then(|d| d.result_id) == id)
        .unwrap_or_else(|| panic!("no function named {}", name))
}

/// Get the control flags of a function
#[allow(unused)]
pub fn function_control(function: &dr::Function) -> Option<FunctionControl> {
    match function.def.as_ref()?.operands.first()? {
        dr::Operand::FunctionControl(control) => Some(*control),
        _ => None,
    }
}

/// Get the literal value of a decoration on an id
#[allow(unused)]
pub fn decoration(module: &dr::Module, target: Word, decoration: Decoration) -> Option<u32> {
    module.annotations.iter().find_map(|instruction| {
        if instruction.class.opcode != Op::Decorate {
            return None;
        }
        match instruction.operands.as_slice() {
            [dr::Operand::IdRef(id), dr::Operand::Decoration(d), rest @ ..]
                if *id == target && *d == decoration =>
            {
                match rest {
                    [dr::Operand::LiteralBit32(value)] => Some(*value),
                    _ => Some(0),
                }
            }
            _ => None,
        }
    })
}

/// Count the instructions with an opcode across every function
#[allow(unused)]
pub fn count_ops(module: &dr::Module, op: Op) -> usize {
    module
        .functions
        .iter()
        .flat_map(|f| f.blocks.iter())
        .flat_map(|b| b.instructions.iter())
        .filter(|i| i.class.opcode == op)
        .count()
}

#[allow(unused)]
pub fn add_void_function(b: &mut ModuleBuilder, name: &str, statements: &[ExpressionIndex]) {
    let body = b.scope(statements);
    b.add_function(name, "void", Vec::new(), body, None);
}

#[allow(unused)]
pub fn path(b: &mut ModuleBuilder, buffer: &str, names: &[&str]) -> ExpressionIndex {
    let mut expression = b.identifier(buffer);
    for name in names {
        expression = b.field(expression, name);
    }
    expression
}

/// Vertex and fragment entry points reading attributes, a uniform, and a sampler
///
/// ```text
/// vertex_attribute Vertex { f3 position; f2 uv; }
/// vertex_stage_output Varyings { f2 uv; }
/// fragment_stage_output Output { f4 color; }
/// uniform Camera { f4x4 view_projection; }
/// uniform Unused { f4 tint; }
/// sampler2d albedo;
/// void vertex_main() {
///     Varyings.uv = Vertex.uv;
///     vertex_stage_output_position(Camera.view_projection * f4(Vertex.position, 1.0));
/// }
/// void fragment_main() {
///     Output.color = albedo(Varyings.uv);
/// }
/// ```
#[allow(unused)]
pub fn basic_pipeline() -> ModuleBuilder {
    let mut b = ModuleBuilder::new(TEST_FILE);

    let position = b.declaration("f3", "position", &[]);
    let uv = b.declaration("f2", "uv", &[]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![position, uv], None);

    let uv = b.declaration("f2", "uv", &[]);
    b.add_buffer("Varyings", BufferKind::VertexStageOutput, vec![uv], None);

    let color = b.declaration("f4", "color", &[]);
    b.add_buffer("Output", BufferKind::FragmentStageOutput, vec![color], None);

    let view_projection = b.declaration("f4x4", "view_projection", &[]);
    b.add_buffer("Camera", BufferKind::Uniform, vec![view_projection], None);

    let tint = b.declaration("f4", "tint", &[]);
    b.add_buffer("Unused", BufferKind::Uniform, vec![tint], None);

    b.add_sampler("albedo", Vec::new(), None);

    let target = path(&mut b, "Varyings", &["uv"]);
    let source = path(&mut b, "Vertex", &["uv"]);
    let copy = b.assign(target, source);

    let matrix = path(&mut b, "Camera", &["view_projection"]);
    let position = path(&mut b, "Vertex", &["position"]);
    let one = b.floating(1.0);
    let extended = b.construct("f4", &[position, one]);
    let transformed = b.binary(BinaryOperator::Multiply, matrix, extended);
    let write = b.call("vertex_stage_output_position", &[transformed]);
    add_void_function(&mut b, "vertex_main", &[copy, write]);

    let target = path(&mut b, "Output", &["color"]);
    let coordinate = path(&mut b, "Varyings", &["uv"]);
    let sample = b.call("albedo", &[coordinate]);
    let shade = b.assign(target, sample);
    add_void_function(&mut b, "fragment_main", &[shade]);

    b
}
