mod shared;
use rpl_ast::*;
use rpl_ir as ir;
use rpl_resolver::*;
use shared::*;

#[test]
fn check_struct_layout() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let scale = b.declaration("f1", "scale", &[]);
    let offset = b.declaration("f3", "offset", &[]);
    let weights = b.declaration("f2", "weights", &[3]);
    b.add_struct("Transform", vec![scale, offset, weights], None);
    let module = b.finish();

    // Structs are resolved even when nothing references them
    let instance = check_resolves(&module, &[]);
    let sd = instance.get_struct(instance.find_struct("Transform").unwrap());
    let offsets = sd.fields.iter().map(|f| f.offset).collect::<Vec<_>>();
    assert_eq!(offsets, [0, 16, 32]);
    assert_eq!((sd.size, sd.alignment), (64, 16));
}

#[test]
fn check_recursive_struct() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let next = b.declaration("Node", "next", &[]);
    b.add_struct("Node", vec![next], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::RecursiveStruct(name) if name == "Node")));
}

#[test]
fn check_unknown_type() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let field = b.declaration("f5", "value", &[]);
    b.add_struct("Broken", vec![field], None);
    let module = b.finish();

    check_fail_message(&module, &[], "test.rpl:1: error: unknown type 'f5'\n");
}

#[test]
fn check_invalid_array_dimension() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let field = b.declaration("f4", "values", &[0]);
    b.add_struct("Broken", vec![field], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::ArrayDimensionOutOfRange(v) if v == "0")));
}

/// Module with two definitions of `Light`, selected by the `USE_SPOT` and `USE_POINT` flags
fn conditional_structs() -> Module {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("USE_SPOT", OptionScope::Global, OptionValue::Flag(false));
    b.add_option("USE_POINT", OptionScope::Global, OptionValue::Flag(true));

    b.at_line(3);
    let spot = b.identifier("USE_SPOT");
    let direction = b.declaration("f4", "direction", &[]);
    b.add_struct("Light", vec![direction], Some(spot));

    b.at_line(4);
    let point = b.identifier("USE_POINT");
    let position = b.declaration("f4", "position", &[]);
    let radius = b.declaration("f4", "radius", &[]);
    b.add_struct("Light", vec![position, radius], Some(point));

    b.finish()
}

#[test]
fn check_single_active_definition() {
    let module = conditional_structs();

    let instance = resolve_with(&module, &[], &[]).unwrap();
    let light = instance.get_struct(instance.find_struct("Light").unwrap());
    assert_eq!(light.fields.len(), 2);

    let instance = resolve_with(&module, &[("USE_SPOT", true), ("USE_POINT", false)], &[]).unwrap();
    let light = instance.get_struct(instance.find_struct("Light").unwrap());
    assert_eq!(light.fields[0].name, "direction");

    let instance = resolve_with(&module, &[("USE_POINT", false)], &[]).unwrap();
    assert!(instance.find_struct("Light").is_none());

    let err = resolve_with(&module, &[("USE_SPOT", true)], &[]).unwrap_err();
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::DuplicateActiveDefinition { kind: "struct", name } if name == "Light"
    )));
    assert_eq!(err.diagnostics[0].notes.len(), 2);
}

#[test]
fn check_global_name_conflict() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let value = b.declaration("f4", "value", &[]);
    b.add_struct("Shared", vec![value.clone()], None);
    b.add_buffer("Shared", BufferKind::Uniform, vec![value], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::NameConflict { existing: "buffer", .. })));
    assert!(err.contains(|e| matches!(e, ResolverError::NameConflict { existing: "struct", .. })));

    let mut b = ModuleBuilder::new(TEST_FILE);
    let value = b.declaration("f4", "value", &[]);
    b.add_struct("f4", vec![value], None);
    let module = b.finish();
    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::NameConflict { existing: "built-in type", .. }
    )));
}

#[test]
fn check_member_size_rule() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let direction = b.declaration("f3", "direction", &[]);
    b.add_buffer("Lighting", BufferKind::Uniform, vec![direction], None);
    let module = b.finish();

    check_fail_message(
        &module,
        &[],
        "test.rpl:1: error: member 'direction' of buffer 'Lighting' has a size of 12 bytes which is not a multiple of 16\n",
    );

    // Nested struct members are checked too
    let mut b = ModuleBuilder::new(TEST_FILE);
    let color = b.declaration("f4", "color", &[]);
    let intensity = b.declaration("f1", "intensity", &[]);
    b.add_struct("Light", vec![color, intensity], None);
    let light = b.declaration("Light", "light", &[]);
    b.add_buffer("Lighting", BufferKind::ReadOnlyStorage, vec![light], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::MemberSizeNotMultipleOf16 { member, size: 4, .. } if member == "intensity"
    )));
}

#[test]
fn check_binding_slots() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("SHADOWS", OptionScope::Global, OptionValue::Flag(false));
    let value = b.declaration("f4", "value", &[]);
    let shadows = b.identifier("SHADOWS");
    b.add_buffer("Shadows", BufferKind::Uniform, vec![value.clone()], Some(shadows));
    b.add_buffer("Material", BufferKind::Uniform, vec![value.clone()], None);
    b.add_buffer("Lights", BufferKind::ReadOnlyStorage, vec![value.clone()], None);
    b.add_buffer("PerInstance", BufferKind::InstancedUniform, vec![value.clone()], None);
    b.add_buffer("Mesh", BufferKind::VertexAttribute, vec![value.clone()], None);
    b.add_buffer("Extra", BufferKind::InstancedAttribute, vec![value], None);
    b.add_sampler("albedo", Vec::new(), None);
    let module = b.finish();

    let instance = check_resolves(&module, &[]);
    let binding = |name: &str| instance.get_buffer(instance.find_buffer(name).unwrap()).binding;

    assert!(instance.find_buffer("Shadows").is_none());
    assert_eq!(binding("Material"), Some(0));
    assert_eq!(binding("Lights"), Some(1));
    assert_eq!(binding("PerInstance"), Some(0));
    assert_eq!(binding("Mesh"), Some(0));
    assert_eq!(binding("Extra"), Some(1));
    assert_eq!(instance.samplers[0].binding, 2);

    // Enabling a buffer shifts the slots after it
    let instance = resolve_with(&module, &[("SHADOWS", true)], &[]).unwrap();
    let binding = |name: &str| instance.get_buffer(instance.find_buffer(name).unwrap()).binding;
    assert_eq!(binding("Shadows"), Some(0));
    assert_eq!(binding("Material"), Some(1));
    assert_eq!(instance.samplers[0].binding, 3);
}

#[test]
fn check_flattening() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let position = b.declaration("f3", "position", &[]);
    let normal = b.declaration("f3", "normal", &[]);
    b.add_struct("Surface", vec![position, normal], None);

    let surface = b.declaration("Surface", "surface", &[]);
    let meta = b.meta(&["per_vertex"]);
    let transform = b.declaration("f4x4", "transform", &[]).with_meta(meta);
    let uv = b.declaration("f2", "uv", &[]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![surface, transform, uv], None);

    let color = b.declaration("f4", "color", &[]);
    let basis = b.declaration("f3x3", "basis", &[2]);
    let depth = b.declaration("f1", "depth", &[]);
    b.add_buffer("Varyings", BufferKind::VertexStageOutput, vec![color, basis, depth], None);
    let module = b.finish();

    let instance = check_resolves(&module, &[]);

    let graph = instance.buffers[0].flattening.as_ref().unwrap();
    let names = graph
        .leaves
        .iter()
        .map(|l| (l.readable_name.as_str(), l.location, l.offset))
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        [
            ("surface.position", 0, 0),
            ("surface.normal", 1, 16),
            ("transform._0", 2, 32),
            ("transform._1", 3, 48),
            ("transform._2", 4, 64),
            ("transform._3", 5, 80),
            ("uv", 6, 96),
        ]
    );
    assert_eq!(graph.leaves[3].meta, ["per_vertex"]);
    assert_eq!(graph.leaves[3].type_ref, ir::TypeRef::vector(ir::F4));

    let (node, _) = graph.walk(["transform"]).unwrap();
    assert!(matches!(
        node.kind,
        ir::FlatteningNodeKind::Leaf {
            first: 2,
            count: 4,
            ..
        }
    ));

    // Stage output matrices stay whole and take one location per column
    let graph = instance.buffers[1].flattening.as_ref().unwrap();
    let locations = graph
        .leaves
        .iter()
        .map(|l| (l.location, l.location_count()))
        .collect::<Vec<_>>();
    assert_eq!(locations, [(0, 1), (1, 6), (7, 1)]);
}

#[test]
fn check_flattening_errors() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let weights = b.declaration("f4", "weights", &[2]);
    b.add_buffer("Vertex", BufferKind::VertexAttribute, vec![weights], None);
    let module = b.finish();
    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::AttributeArray { field, .. } if field == "weights"
    )));

    let mut b = ModuleBuilder::new(TEST_FILE);
    let transform = b.declaration("f4x4", "transform", &[]);
    b.add_buffer("Output", BufferKind::FragmentStageOutput, vec![transform], None);
    let module = b.finish();
    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::FragmentOutputNotVector { .. })));

    let mut b = ModuleBuilder::new(TEST_FILE);
    let value = b.declaration("f4", "value", &[]);
    b.add_struct("Item", vec![value], None);
    let items = b.declaration("Item", "items", &[4]);
    b.add_buffer("Varyings", BufferKind::VertexStageOutput, vec![items], None);
    let module = b.finish();
    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::FlattenedStructArray { .. })));
}

#[test]
fn check_sampler_settings() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("QUALITY", OptionScope::Instance, OptionValue::Count(2));
    let quality = b.identifier("QUALITY");
    let two = b.integer(2);
    let high_quality = b.binary(BinaryOperator::GreaterOrEqual, quality, two);
    b.add_sampler(
        "albedo",
        vec![
            Setting::string("mag_filter", "nearest"),
            Setting::string("address_u", "clamp_to_edge"),
            Setting::string("min_filter", "nearest").when(high_quality),
        ],
        None,
    );
    let module = b.finish();

    let instance = check_resolves(&module, &[]);
    let settings = instance.samplers[0].settings;
    assert_eq!(settings.mag_filter, ir::SamplerFilter::Nearest);
    assert_eq!(settings.min_filter, ir::SamplerFilter::Nearest);
    assert_eq!(settings.address_u, ir::SamplerAddressMode::ClampToEdge);
    assert_eq!(settings.address_v, ir::SamplerAddressMode::Repeat);
}

#[test]
fn check_invalid_sampler_settings() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_sampler(
        "albedo",
        vec![
            Setting::string("lod_bias", "1"),
            Setting::string("mag_filter", "clamp_to_edge"),
            Setting::flag("min_filter", true),
        ],
        None,
    );
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert_eq!(err.diagnostics.len(), 3);
    assert!(err.contains(|e| matches!(e, ResolverError::UnknownSamplerSetting(_))));
    assert!(err.contains(
        |e| matches!(e, ResolverError::InvalidSamplerSettingValue(name) if name == "min_filter")
    ));
}

#[test]
fn check_instance_options_in_conditionals() {
    // Instance options are allowed in sampler conditionals but nowhere else
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("DETAIL", OptionScope::Instance, OptionValue::Flag(true));
    let detail = b.identifier("DETAIL");
    b.add_sampler("detail_map", Vec::new(), Some(detail));
    let module = b.finish();
    let instance = check_resolves(&module, &[]);
    assert_eq!(instance.samplers.len(), 1);

    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("DETAIL", OptionScope::Instance, OptionValue::Flag(true));
    let detail = b.identifier("DETAIL");
    let value = b.declaration("f4", "value", &[]);
    b.add_buffer("Detail", BufferKind::Uniform, vec![value], Some(detail));
    let module = b.finish();
    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::Evaluation(EvaluationError::InstanceOptionNotAllowed(_))
    )));
}

#[test]
fn check_options_in_functions() {
    let make = |scope: OptionScope, value: OptionValue| {
        let mut b = ModuleBuilder::new(TEST_FILE);
        b.add_option("COUNT", scope, value);
        let declaration = b.declaration("i1", "count", &[]);
        let local = b.declare(declaration);
        let option = b.identifier("COUNT");
        let init = b.assign(local, option);
        add_void_function(&mut b, "main", &[init]);
        b.finish()
    };

    let module = make(OptionScope::Global, OptionValue::Count(8));
    let instance = check_resolves(&module, &[fragment("main")]);
    assert!(instance
        .expressions
        .iter()
        .any(|e| e.kind == ir::ExpressionKind::IntegerLiteral(8)));

    let module = make(OptionScope::Global, OptionValue::Flag(true));
    let err = check_fail(&module, &[fragment("main")]);
    assert!(err.contains(|e| matches!(e, ResolverError::FlagOptionInExpression(_))));

    let module = make(OptionScope::Instance, OptionValue::Count(8));
    let err = check_fail(&module, &[fragment("main")]);
    assert!(err.contains(|e| matches!(e, ResolverError::InstanceOptionInExpression(_))));
}

#[test]
fn check_conditional_scope() {
    let make = || {
        let mut b = ModuleBuilder::new(TEST_FILE);
        b.add_option("DEBUG", OptionScope::Global, OptionValue::Flag(false));
        let missing = b.identifier("missing");
        let body = b.scope(&[missing]);
        let debug = b.identifier("DEBUG");
        let gated = b.conditional_scope(debug, body);
        add_void_function(&mut b, "main", &[gated]);
        b.finish()
    };
    let module = make();

    let instance = resolve_with(&module, &[], &[fragment("main")]).unwrap();
    let body = instance.get_expression(instance.functions[0].body);
    assert!(matches!(
        &body.kind,
        ir::ExpressionKind::Scope { statements, .. } if statements.is_empty()
    ));

    let err = resolve_with(&module, &[("DEBUG", true)], &[fragment("main")]).unwrap_err();
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::UnknownIdentifier(name) if name == "missing"
    )));
}

#[test]
fn check_conditional_function() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("FAST", OptionScope::Global, OptionValue::Flag(true));
    let fast = b.identifier("FAST");
    let slow = b.unary(UnaryOperator::Not, fast);
    let body = b.scope(&[]);
    b.add_function("main", "void", Vec::new(), body, Some(fast));
    let missing = b.identifier("missing");
    let body = b.scope(&[missing]);
    b.add_function("main", "void", Vec::new(), body, Some(slow));
    let module = b.finish();

    let instance = resolve_with(&module, &[], &[fragment("main")]).unwrap();
    assert_eq!(instance.functions.len(), 1);

    let err = resolve_with(&module, &[("FAST", false)], &[fragment("main")]).unwrap_err();
    assert!(err.contains(|e| matches!(e, ResolverError::UnknownIdentifier(_))));
}

#[test]
fn check_pipeline_settings() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("WIREFRAME", OptionScope::Global, OptionValue::Flag(false));
    let wireframe = b.identifier("WIREFRAME");
    b.add_setting(Setting::string("polygon_mode", "wireframe").when(wireframe));
    b.add_setting(Setting::flag("depth_test", true));
    let module = b.finish();

    let instance = check_resolves(&module, &[]);
    assert!(instance.find_setting("polygon_mode").is_none());
    assert_eq!(
        instance.find_setting("depth_test").map(|s| &s.value),
        Some(&SettingValue::Flag(true))
    );
}

#[test]
fn check_context_options() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    b.add_option("A", OptionScope::Global, OptionValue::Flag(false));
    b.add_option("N", OptionScope::Global, OptionValue::Count(1));
    let first = b.finish();

    let mut b = ModuleBuilder::new("other.rpl");
    b.add_option("A", OptionScope::Global, OptionValue::Flag(true));
    let second = b.finish();

    let mut context = CompilerContext::default();
    context.use_module(&first).unwrap();
    assert_eq!(
        context.use_module(&second),
        Err(ContextError::OptionAlreadyDeclared("A".to_string()))
    );
    assert_eq!(context.modules().len(), 1);

    assert_eq!(context.set_option_count("N", 4), Ok(()));
    assert_eq!(
        context.set_option_flag("N", true),
        Err(ContextError::NotAFlag("N".to_string()))
    );
    assert_eq!(
        context.set_option_count("A", 1),
        Err(ContextError::NotACount("A".to_string()))
    );
    assert_eq!(
        context.set_option_flag("B", true),
        Err(ContextError::UnknownOption("B".to_string()))
    );
    assert_eq!(context.options()[1].value, OptionValue::Count(4));
}

#[test]
fn check_multiple_modules() {
    let mut b = ModuleBuilder::new("common.rpl");
    let value = b.declaration("f4", "value", &[]);
    b.add_struct("Shared", vec![value], None);
    let common = b.finish();

    let mut b = ModuleBuilder::new("main.rpl");
    b.at_line(7);
    let shared = b.declaration("Shared", "shared", &[]);
    b.add_buffer("Material", BufferKind::Uniform, vec![shared], None);
    let undefined = b.declaration("Missing", "missing", &[]);
    b.add_buffer("Broken", BufferKind::Uniform, vec![undefined], None);
    let main = b.finish();

    let mut context = CompilerContext::default();
    context.use_module(&common).unwrap();
    context.use_module(&main).unwrap();
    let err = context.resolve(&[]).unwrap_err();
    assert_eq!(err.to_string(), "main.rpl:7: error: unknown type 'Missing'\n");

    // The context can be reused after a failure
    let err = context.resolve(&[]).unwrap_err();
    assert_eq!(err.diagnostics.len(), 1);
}

#[test]
fn check_oversized_types() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let values = b.declaration("f4", "values", &[268435456]);
    b.add_struct("Huge", vec![values], None);

    b.at_line(2);
    let first = b.declaration("f4", "first", &[67108864]);
    let second = b.declaration("f4", "second", &[67108864]);
    b.add_struct("Pair", vec![first, second], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::TypeTooLarge(name) if name == "values")));
    assert!(err.contains(|e| matches!(e, ResolverError::TypeTooLarge(name) if name == "Pair")));
}

#[test]
fn check_duplicate_buffer_after_failure() {
    let mut b = ModuleBuilder::new(TEST_FILE);
    let broken = b.declaration("f5", "color", &[]);
    b.add_buffer("Material", BufferKind::Uniform, vec![broken], None);

    b.at_line(2);
    let color = b.declaration("f4", "color", &[]);
    b.add_buffer("Material", BufferKind::Uniform, vec![color], None);
    let module = b.finish();

    let err = check_fail(&module, &[]);
    assert!(err.contains(|e| matches!(e, ResolverError::UnknownType(name) if name == "f5")));
    assert!(err.contains(|e| matches!(
        e,
        ResolverError::DuplicateActiveDefinition { kind: "buffer", name } if name == "Material"
    )));
}
