use rpl_ast::*;
use rpl_ir::{CompilerInstance, EntryPoint, PipelineType, Stage};
use rpl_resolver::*;
use rpl_text::*;

/// Name of the file every test module is created with
pub const TEST_FILE: &str = "test.rpl";

#[allow(unused)]
pub fn vertex(name: &str) -> EntryPoint {
    EntryPoint::new(name, Stage::Vertex)
}

#[allow(unused)]
pub fn fragment(name: &str) -> EntryPoint {
    EntryPoint::new(name, Stage::Fragment)
}

/// Resolve a module with default option values
pub fn resolve(
    module: &Module,
    entry_points: &[EntryPoint],
) -> Result<CompilerInstance, ResolveFailure> {
    resolve_with(module, &[], entry_points)
}

/// Resolve a module after setting flag options
pub fn resolve_with(
    module: &Module,
    flags: &[(&str, bool)],
    entry_points: &[EntryPoint],
) -> Result<CompilerInstance, ResolveFailure> {
    let mut context = CompilerContext::new(PipelineType::ClassicGraphics);
    if let Err(err) = context.use_module(module) {
        panic!("{}", err);
    }
    for (name, value) in flags {
        if let Err(err) = context.set_option_flag(name, *value) {
            panic!("{}", err);
        }
    }
    context.resolve(entry_points)
}

#[track_caller]
#[allow(unused)]
pub fn check_resolves(module: &Module, entry_points: &[EntryPoint]) -> CompilerInstance {
    match resolve(module, entry_points) {
        Ok(instance) => instance,
        Err(err) => panic!("{}", err),
    }
}

#[track_caller]
#[allow(unused)]
pub fn check_fail(module: &Module, entry_points: &[EntryPoint]) -> ResolveFailure {
    match resolve(module, entry_points) {
        Ok(_) => panic!("Expected resolve to fail"),
        Err(err) => err,
    }
}

#[track_caller]
#[allow(unused)]
pub fn check_fail_message(module: &Module, entry_points: &[EntryPoint], expected_message: &str) {
    let err = check_fail(module, entry_points);
    let error_print = err.display(&err.files).to_string();
    assert_eq!(
        error_print,
        expected_message,
        "\n{2}\n{0}{2}\n{1}",
        error_print,
        expected_message,
        "-".repeat(80)
    );
}

/// Add a void function with a body made of the given statements
#[allow(unused)]
pub fn add_void_function(b: &mut ModuleBuilder, name: &str, statements: &[ExpressionIndex]) {
    let body = b.scope(statements);
    b.add_function(name, "void", Vec::new(), body, None);
}

/// Build `buffer.field` with any number of nested names
#[allow(unused)]
pub fn path(b: &mut ModuleBuilder, buffer: &str, names: &[&str]) -> ExpressionIndex {
    let mut expression = b.identifier(buffer);
    for name in names {
        expression = b.field(expression, name);
    }
    expression
}

/// Module with attribute, output, uniform, and sampler globals used by a vertex and fragment entry
///
/// ```text
/// 1: vertex_attribute Vertex { f3 position; f2 uv; }
/// 2: vertex_stage_output Varyings { f2 uv; }
/// 3: fragment_stage_output Output { f4 color; }
/// 4: uniform Camera { f4x4 view_projection; }
/// 5: sampler2d albedo;
/// 6: void vertex_main() {
/// 7:     Varyings.uv = Vertex.uv;
/// 8:     vertex_stage_output_position(Camera.view_projection * f4(Vertex.position, 1.0));
///    }
/// 10: void fragment_main() {
/// 11:     Output.color = albedo(Varyings.uv);
///    }
/// ```
#[allow(unused)]
pub fn basic_pipeline() -> ModuleBuilder {
    let mut b = ModuleBuilder::new(TEST_FILE);

    let position = b.declaration("f3", "position", &[]);
    let uv = b.declaration("f2", "uv", &[]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![position, uv], None);

    b.at_line(2);
    let uv = b.declaration("f2", "uv", &[]);
    b.add_buffer("Varyings", BufferKind::VertexStageOutput, vec![uv], None);

    b.at_line(3);
    let color = b.declaration("f4", "color", &[]);
    b.add_buffer("Output", BufferKind::FragmentStageOutput, vec![color], None);

    b.at_line(4);
    let view_projection = b.declaration("f4x4", "view_projection", &[]);
    b.add_buffer("Camera", BufferKind::Uniform, vec![view_projection], None);

    b.at_line(5);
    b.add_sampler("albedo", Vec::new(), None);

    b.at_line(7);
    let target = path(&mut b, "Varyings", &["uv"]);
    let source = path(&mut b, "Vertex", &["uv"]);
    let copy = b.assign(target, source);

    b.at_line(8);
    let matrix = path(&mut b, "Camera", &["view_projection"]);
    let position = path(&mut b, "Vertex", &["position"]);
    let one = b.floating(1.0);
    let extended = b.construct("f4", &[position, one]);
    let transformed = b.binary(BinaryOperator::Multiply, matrix, extended);
    let write = b.call("vertex_stage_output_position", &[transformed]);

    b.at_line(6);
    add_void_function(&mut b, "vertex_main", &[copy, write]);

    b.at_line(11);
    let target = path(&mut b, "Output", &["color"]);
    let coordinate = path(&mut b, "Varyings", &["uv"]);
    let sample = b.call("albedo", &[coordinate]);
    let shade = b.assign(target, sample);

    b.at_line(10);
    add_void_function(&mut b, "fragment_main", &[shade]);

    b
}
