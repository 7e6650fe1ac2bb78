use rpl_ast::*;
use rpl_resolver::*;

fn options() -> Vec<ContextOption> {
    vec![
        ContextOption {
            name: "ENABLED".to_string(),
            scope: OptionScope::Global,
            value: OptionValue::Flag(true),
        },
        ContextOption {
            name: "COUNT".to_string(),
            scope: OptionScope::Global,
            value: OptionValue::Count(3),
        },
        ContextOption {
            name: "VARIANT".to_string(),
            scope: OptionScope::Instance,
            value: OptionValue::Count(1),
        },
    ]
}

/// Evaluate the last expression added by `build`
#[track_caller]
fn evaluate(
    build: impl FnOnce(&mut ModuleBuilder) -> ExpressionIndex,
) -> Result<Value, EvaluationError> {
    let mut b = ModuleBuilder::new("eval.rpl");
    let index = build(&mut b);
    let module = b.finish();
    let options = options();
    Evaluator::new(&module, &options, false).evaluate(Some(index))
}

#[test]
fn check_literals() {
    assert_eq!(evaluate(|b| b.integer(7)), Ok(Value::Integer(7)));
    assert_eq!(evaluate(|b| b.floating(0.5)), Ok(Value::Floating(0.5)));
    assert_eq!(evaluate(|b| b.nope()), Ok(Value::Boolean(true)));
}

#[test]
fn check_arithmetic() {
    let result = evaluate(|b| {
        let count = b.identifier("COUNT");
        let two = b.integer(2);
        let product = b.binary(BinaryOperator::Multiply, count, two);
        let one = b.integer(1);
        b.binary(BinaryOperator::Subtract, product, one)
    });
    assert_eq!(result, Ok(Value::Integer(5)));

    let result = evaluate(|b| {
        let one = b.integer(1);
        let half = b.floating(0.5);
        b.binary(BinaryOperator::Add, one, half)
    });
    assert_eq!(result, Ok(Value::Floating(1.5)));

    let result = evaluate(|b| {
        let seven = b.integer(7);
        let four = b.integer(4);
        b.binary(BinaryOperator::Modulus, seven, four)
    });
    assert_eq!(result, Ok(Value::Integer(3)));

    let result = evaluate(|b| {
        let one = b.integer(1);
        let four = b.integer(4);
        b.binary(BinaryOperator::BitwiseLeftShift, one, four)
    });
    assert_eq!(result, Ok(Value::Integer(16)));
}

#[test]
fn check_logic() {
    let result = evaluate(|b| {
        let enabled = b.identifier("ENABLED");
        let count = b.identifier("COUNT");
        let three = b.integer(3);
        let equal = b.binary(BinaryOperator::Equal, count, three);
        b.binary(BinaryOperator::And, enabled, equal)
    });
    assert_eq!(result, Ok(Value::Boolean(true)));

    let result = evaluate(|b| {
        let enabled = b.identifier("ENABLED");
        b.unary(UnaryOperator::Not, enabled)
    });
    assert_eq!(result, Ok(Value::Boolean(false)));

    let result = evaluate(|b| {
        let count = b.identifier("COUNT");
        let limit = b.floating(2.5);
        b.binary(BinaryOperator::Greater, count, limit)
    });
    assert_eq!(result, Ok(Value::Boolean(true)));
}

#[test]
fn check_errors() {
    assert_eq!(
        evaluate(|b| b.identifier("MISSING")),
        Err(EvaluationError::UnknownOption("MISSING".to_string()))
    );
    assert_eq!(
        evaluate(|b| b.identifier("VARIANT")),
        Err(EvaluationError::InstanceOptionNotAllowed("VARIANT".to_string()))
    );
    assert_eq!(
        evaluate(|b| {
            let one = b.integer(1);
            let zero = b.integer(0);
            b.binary(BinaryOperator::Divide, one, zero)
        }),
        Err(EvaluationError::DivisionByZero)
    );
    assert_eq!(
        evaluate(|b| {
            let max = b.integer(i64::MAX);
            let one = b.integer(1);
            b.binary(BinaryOperator::Add, max, one)
        }),
        Err(EvaluationError::Overflow)
    );
    assert_eq!(
        evaluate(|b| {
            let enabled = b.identifier("ENABLED");
            let one = b.integer(1);
            b.binary(BinaryOperator::Add, enabled, one)
        }),
        Err(EvaluationError::InvalidBinaryOperands(BinaryOperator::Add))
    );
    assert_eq!(
        evaluate(|b| b.call("sin_f1", &[])),
        Err(EvaluationError::Unsupported("function call"))
    );
}

#[test]
fn check_conditionals() {
    let mut b = ModuleBuilder::new("eval.rpl");
    let count = b.identifier("COUNT");
    let half = b.floating(0.5);
    let variant = b.identifier("VARIANT");
    let module = b.finish();
    let options = options();

    let evaluator = Evaluator::new(&module, &options, false);
    assert_eq!(evaluator.evaluate_conditional(None), Ok(true));
    assert_eq!(evaluator.evaluate_conditional(Some(count)), Ok(true));
    assert_eq!(
        evaluator.evaluate_conditional(Some(half)),
        Err(EvaluationError::FloatingCondition)
    );

    let evaluator = Evaluator::new(&module, &options, true);
    assert_eq!(evaluator.evaluate_conditional(Some(variant)), Ok(true));

    assert_eq!(
        evaluator.evaluate(Some(ExpressionIndex(100))),
        Err(EvaluationError::MissingExpression)
    );
}
