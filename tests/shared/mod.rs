use rpl::ast::*;
use rpl::*;
use rspirv::dr;

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

#[track_caller]
#[allow(unused)]
pub fn check_compiles(args: CompileArgs) -> CompiledPipeline {
    match rpl::compile(args) {
        Ok(compiled) => compiled,
        Err(err) => panic!("{}", err),
    }
}

#[track_caller]
#[allow(unused)]
pub fn check_fail_contains(args: CompileArgs, expected: &str) {
    match rpl::compile(args) {
        Ok(_) => panic!("Expected compile to fail"),
        Err(err) => {
            let message = err.to_string();
            assert!(
                message.contains(expected),
                "\n{}\ndoes not contain\n{}",
                message,
                expected
            );
        }
    }
}

/// Parse the generated words back into a module
#[track_caller]
#[allow(unused)]
pub fn load(compiled: &CompiledPipeline) -> dr::Module {
    match dr::load_words(&compiled.words) {
        Ok(module) => module,
        Err(err) => panic!("{:?}", err),
    }
}

/// Find the literal operand of a decoration on a target
#[allow(unused)]
pub fn decoration(
    module: &dr::Module,
    target: u32,
    decoration: rspirv::spirv::Decoration,
) -> Option<u32> {
    module.annotations.iter().find_map(|inst| {
        match (inst.operands.first(), inst.operands.get(1)) {
            (Some(dr::Operand::IdRef(id)), Some(dr::Operand::Decoration(d)))
                if *id == target && *d == decoration =>
            {
                match inst.operands.get(2) {
                    Some(dr::Operand::LiteralBit32(value)) => Some(*value),
                    _ => Some(0),
                }
            }
            _ => None,
        }
    })
}

/// Find the global variable with a debug name
#[track_caller]
#[allow(unused)]
pub fn variable_named(module: &dr::Module, name: &str) -> u32 {
    let variables = module
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == rspirv::spirv::Op::Variable)
        .filter_map(|inst| inst.result_id)
        .collect::<Vec<_>>();
    let found = module
        .debug_names
        .iter()
        .find_map(|inst| match (&inst.operands[0], &inst.operands[1]) {
            (dr::Operand::IdRef(id), dr::Operand::LiteralString(n))
                if n == name && variables.contains(id) =>
            {
                Some(*id)
            }
            _ => None,
        });
    match found {
        Some(id) => id,
        None => panic!("No variable named {}", name),
    }
}

/// Follow a dotted path from a buffer name
#[allow(unused)]
pub fn path(b: &mut ModuleBuilder, buffer: &str, names: &[&str]) -> ExpressionIndex {
    let mut expression = b.identifier(buffer);
    for name in names {
        expression = b.field(expression, name);
    }
    expression
}

/// Add a void function with a body made of the given statements
#[allow(unused)]
pub fn add_void_function(b: &mut ModuleBuilder, name: &str, statements: &[ExpressionIndex]) {
    let body = b.scope(statements);
    b.add_function(name, "void", Vec::new(), body, None);
}

/// Module that writes an attribute position to the vertex stage output position
///
/// ```text
/// 1: vertex_attribute Vertex { f3 position; }
/// 2: void main() {
/// 3:     vertex_stage_output_position(f4(Vertex.position, 1.0));
///    }
/// ```
#[allow(unused)]
pub fn position_module() -> Module {
    let mut b = ModuleBuilder::new(TEST_FILE);

    let position = b.declaration("f3", "position", &[]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![position], None);

    b.at_line(3);
    let position = path(&mut b, "Vertex", &["position"]);
    let one = b.floating(1.0);
    let extended = b.construct("f4", &[position, one]);
    let write = b.call("vertex_stage_output_position", &[extended]);

    b.at_line(2);
    add_void_function(&mut b, "main", &[write]);

    b.finish()
}
