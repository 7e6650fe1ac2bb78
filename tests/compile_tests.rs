mod shared;
use rpl::ast::*;
use rpl::ir::metadata::*;
use rpl::*;
use rspirv::spirv::{Decoration, Op};
use shared::*;

#[test]
fn check_position_round_trip() {
    let module = position_module();
    let modules = [&module];
    let entry_points = [vertex("main")];
    let compiled = check_compiles(CompileArgs::new(&modules, &entry_points));

    assert_eq!(compiled.stages.len(), 1);
    assert_eq!(compiled.stages[0].stage, Stage::Vertex);
    assert_eq!(compiled.stages[0].entry_point, "main");

    assert_eq!(compiled.metadata.buffers.len(), 1);
    let buffer = &compiled.metadata.buffers[0];
    assert_eq!(buffer.name, "Vertex");
    assert_eq!(buffer.binding, 0);
    assert_eq!(buffer.kind, MetaBufferKind::VertexAttribute);
    assert_eq!(
        buffer.contents,
        BufferContents::Attributes(vec![AttributeMetadata {
            name: "position".to_string(),
            location: 0,
            offset: 0,
            variable_type: MetaVariableType::F3,
        }])
    );

    let spirv = load(&compiled);
    let position = variable_named(&spirv, "Vertex.position");
    assert_eq!(decoration(&spirv, position, Decoration::Location), Some(0));
    assert_eq!(spirv.entry_points.len(), 1);
}

#[test]
fn check_position_from_fragment_stage() {
    let module = position_module();
    let modules = [&module];
    let entry_points = [fragment("main")];
    check_fail_contains(
        CompileArgs::new(&modules, &entry_points),
        "test.rpl:2: error: entry point 'main' is used for the fragment stage but accesses globals of the vertex stage",
    );
}

/// Module with a uniform buffer gated by `option_x > 2`
fn gated_module() -> Module {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("option_x", OptionScope::Global, OptionValue::Count(1));

    b.at_line(2);
    let option = b.identifier("option_x");
    let two = b.integer(2);
    let condition = b.binary(BinaryOperator::Greater, option, two);
    let value = b.declaration("f4", "value", &[]);
    b.add_struct("Gated", vec![value], Some(condition));

    b.at_line(3);
    let option = b.identifier("option_x");
    let two = b.integer(2);
    let condition = b.binary(BinaryOperator::Greater, option, two);
    let gated = b.declaration("Gated", "gated", &[]);
    b.add_buffer("Settings", BufferKind::Uniform, vec![gated], Some(condition));

    b.finish()
}

#[test]
fn check_conditional_gating() {
    let module = gated_module();
    let modules = [&module];

    let compiled = check_compiles(CompileArgs::new(&modules, &[]).counts(&[("option_x", 1)]));
    assert!(compiled.metadata.buffers.is_empty());

    let compiled = check_compiles(CompileArgs::new(&modules, &[]).counts(&[("option_x", 3)]));
    assert_eq!(compiled.metadata.buffers.len(), 1);
    assert_eq!(
        compiled.metadata.buffers[0].contents,
        BufferContents::Parameters(vec![ParameterMetadata {
            name: "gated.value".to_string(),
            offset: 0,
            variable_type: MetaVariableType::F4,
            total_count: 1,
            meta: Vec::new(),
        }])
    );

    let mut context = resolver::CompilerContext::default();
    context.use_module(&module).unwrap();
    let instance = context.resolve(&[]).unwrap();
    assert!(instance.find_struct("Gated").is_none());

    context.set_option_count("option_x", 3).unwrap();
    let instance = context.resolve(&[]).unwrap();
    assert!(instance.find_struct("Gated").is_some());
}

#[test]
fn check_unknown_option() {
    let module = gated_module();
    let modules = [&module];
    check_fail_contains(
        CompileArgs::new(&modules, &[]).flags(&[("option_y", true)]),
        "unknown option 'option_y'",
    );
    check_fail_contains(
        CompileArgs::new(&modules, &[]).flags(&[("option_x", true)]),
        "option 'option_x' is not a flag",
    );
}

/// Module with three uniform buffers where only the middle one is read
fn bindings_module(read: &str) -> Module {
    let mut b = ModuleBuilder::new(TEST_FILE);
    for (line, name) in ["First", "Second", "Third"].iter().enumerate() {
        b.at_line(line as u32 + 1);
        let value = b.declaration("f4", "value", &[]);
        b.add_buffer(name, BufferKind::Uniform, vec![value], None);
    }

    b.at_line(5);
    let value = path(&mut b, read, &["value"]);
    let write = b.call("vertex_stage_output_position", &[value]);

    b.at_line(4);
    add_void_function(&mut b, "main", &[write]);
    b.finish()
}

#[test]
fn check_binding_stability() {
    let entry_points = [vertex("main")];
    let bindings = |read: &str| {
        let module = bindings_module(read);
        let modules = [&module];
        let compiled = check_compiles(CompileArgs::new(&modules, &entry_points));
        let bindings = compiled
            .metadata
            .buffers
            .iter()
            .map(|b| (b.name.clone(), b.binding))
            .collect::<Vec<_>>();

        let spirv = load(&compiled);
        let variable = variable_named(&spirv, read);
        (bindings, decoration(&spirv, variable, Decoration::Binding))
    };

    let expected = vec![
        ("First".to_string(), 0),
        ("Second".to_string(), 1),
        ("Third".to_string(), 2),
    ];
    assert_eq!(bindings("First"), (expected.clone(), Some(0)));
    assert_eq!(bindings("Second"), (expected.clone(), Some(1)));
    assert_eq!(bindings("Third"), (expected, Some(2)));
}

#[test]
fn check_deterministic_output() {
    let module = position_module();
    let modules = [&module];
    let entry_points = [vertex("main")];

    let first = check_compiles(CompileArgs::new(&modules, &entry_points));
    let second = check_compiles(CompileArgs::new(&modules, &entry_points));
    assert_eq!(first.words, second.words);
    assert_eq!(first.metadata, second.metadata);

    let stripped = check_compiles(CompileArgs::new(&modules, &entry_points).debug_names(false));
    assert!(stripped.words.len() < first.words.len());
    assert_eq!(stripped.metadata, first.metadata);
}

#[test]
fn check_flattening_leaf_count() {
    let mut b = ModuleBuilder::new(TEST_FILE);

    let weights = b.declaration("f4", "weights", &[]);
    let bone = b.declaration("f4x4", "bone", &[]);
    b.add_struct("Skin", vec![weights, bone], None);

    b.at_line(2);
    let position = b.declaration("f3", "position", &[]);
    let skin = b.declaration("Skin", "skin", &[]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![position, skin], None);

    b.at_line(4);
    let bone = path(&mut b, "Vertex", &["skin", "bone"]);
    let position = path(&mut b, "Vertex", &["position"]);
    let one = b.floating(1.0);
    let extended = b.construct("f4", &[position, one]);
    let transformed = b.binary(BinaryOperator::Multiply, bone, extended);
    let write = b.call("vertex_stage_output_position", &[transformed]);

    b.at_line(3);
    add_void_function(&mut b, "main", &[write]);
    let module = b.finish();

    let modules = [&module];
    let entry_points = [vertex("main")];
    let compiled = check_compiles(CompileArgs::new(&modules, &entry_points));

    // One leaf for each vector and one for each matrix column
    let locations = match &compiled.metadata.buffers[0].contents {
        BufferContents::Attributes(attributes) => {
            attributes.iter().map(|a| a.location).collect::<Vec<_>>()
        }
        contents => panic!("unexpected contents {:?}", contents),
    };
    assert_eq!(locations, [0, 1, 2, 3, 4, 5]);

    let spirv = load(&compiled);
    let inputs = spirv
        .types_global_values
        .iter()
        .filter(|inst| inst.class.opcode == Op::Variable)
        .filter(|inst| {
            inst.result_id
                .and_then(|id| decoration(&spirv, id, Decoration::Location))
                .is_some()
        })
        .count();
    assert_eq!(inputs, 6);
}
